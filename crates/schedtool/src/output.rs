use std::fmt::Write;

use serde::Serialize;

use crate::commands::negotiate::NegotiationSummary;
use crate::commands::policy::PolicyReport;
use crate::commands::schedd::ScheddSessionSummary;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum OutputMode {
    Cli,
    Json,
}

pub trait Output {
    fn print_policy_reports(&self, reports: &[PolicyReport]);
    fn print_negotiation_summary(&self, summary: &NegotiationSummary);
    fn print_schedd_session(&self, summary: &ScheddSessionSummary);
    fn print_error(&self, error: anyhow::Error);
}

pub fn make_output(mode: OutputMode) -> Box<dyn Output> {
    match mode {
        OutputMode::Cli => Box::new(CliOutput),
        OutputMode::Json => Box::new(JsonOutput),
    }
}

pub struct CliOutput;

impl CliOutput {
    pub fn format_policy_report(report: &PolicyReport) -> String {
        let mut text = format!(
            "{}: {:?}",
            report.job.as_deref().unwrap_or("<unknown job>"),
            report.action
        );
        if let Some(firing) = &report.firing {
            let _ = write!(
                text,
                "\n  expression: {} (value {})\n  reason: {}\n  code: {:?} ({}), subcode {}",
                firing.expression,
                firing.value.as_i32(),
                firing.reason,
                firing.reason_code,
                firing.reason_code.as_i64(),
                firing.reason_subcode
            );
        }
        text
    }

    pub fn format_negotiation_summary(summary: &NegotiationSummary) -> String {
        let mut text = String::new();
        for offer in &summary.offers {
            let autocluster = offer
                .autocluster
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                text,
                "{} (autocluster {autocluster}): {}",
                offer.job,
                if offer.matched { "matched" } else { "rejected" }
            );
        }
        let _ = write!(
            text,
            "{} match(es), {} request(s) fetched in {} round trip(s)",
            summary.matched(),
            summary.requests_fetched,
            summary.round_trips
        );
        if summary.ended_early {
            text.push_str(", session ended by the negotiator");
        }
        text
    }
}

impl Output for CliOutput {
    fn print_policy_reports(&self, reports: &[PolicyReport]) {
        for report in reports {
            println!("{}", Self::format_policy_report(report));
        }
    }

    fn print_negotiation_summary(&self, summary: &NegotiationSummary) {
        println!("{}", Self::format_negotiation_summary(summary));
    }

    fn print_schedd_session(&self, summary: &ScheddSessionSummary) {
        println!(
            "Session with {} finished: {} request(s) sent, {} idle job(s) left",
            summary.peer, summary.sent, summary.remaining
        );
    }

    fn print_error(&self, error: anyhow::Error) {
        eprintln!("{error:?}");
    }
}

pub struct JsonOutput;

impl JsonOutput {
    fn print(&self, data: impl Serialize) {
        match serde_json::to_string_pretty(&data) {
            Ok(json) => println!("{json}"),
            Err(error) => log::error!("Cannot serialize output: {error}"),
        }
    }
}

impl Output for JsonOutput {
    fn print_policy_reports(&self, reports: &[PolicyReport]) {
        self.print(reports);
    }

    fn print_negotiation_summary(&self, summary: &NegotiationSummary) {
        self.print(summary);
    }

    fn print_schedd_session(&self, summary: &ScheddSessionSummary) {
        self.print(summary);
    }

    fn print_error(&self, error: anyhow::Error) {
        self.print(serde_json::json!({
            "error": format!("{error:?}"),
        }));
    }
}

#[cfg(test)]
mod tests {
    use schedcore::policy::{PolicyAction, PolicyMode, SystemPolicy};

    use super::CliOutput;
    use crate::commands::negotiate::{NegotiationSummary, Offer};
    use crate::commands::policy::evaluate_ads;

    #[test]
    fn test_format_policy_report() {
        let ads = schedcore::classad::JobAd::parse_many(
            "ClusterId = 7\nProcId = 1\nJobStatus = 2\nPeriodicRemove = true",
        )
        .unwrap();
        let reports = evaluate_ads(&ads, SystemPolicy::empty(), PolicyMode::PeriodicOnly, 0);
        assert_eq!(reports[0].action, PolicyAction::RemoveFromQueue);
        assert_eq!(
            CliOutput::format_policy_report(&reports[0]),
            "7.1: RemoveFromQueue\n  expression: PeriodicRemove (value 1)\n  \
             reason: The job attribute PeriodicRemove expression 'true' evaluated to TRUE\n  \
             code: JobPolicy (3), subcode 0"
        );
    }

    #[test]
    fn test_format_negotiation_summary() {
        let summary = NegotiationSummary {
            offers: vec![
                Offer {
                    job: "1.0".to_string(),
                    autocluster: Some(4),
                    matched: true,
                },
                Offer {
                    job: "2.0".to_string(),
                    autocluster: None,
                    matched: false,
                },
            ],
            requests_fetched: 2,
            round_trips: 1,
            ended_early: true,
        };
        assert_eq!(
            CliOutput::format_negotiation_summary(&summary),
            "1.0 (autocluster 4): matched\n2.0 (autocluster -): rejected\n\
             1 match(es), 2 request(s) fetched in 1 round trip(s), session ended by the negotiator"
        );
    }
}
