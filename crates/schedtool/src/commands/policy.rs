use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use schedcore::classad::{JobAd, attrs};
use schedcore::config::ParamSource;
use schedcore::policy::{FiringInfo, PolicyAction, PolicyMode, SystemPolicy, UserPolicy};

use crate::common::timeutils::{epoch_seconds, parse_timestamp};
use crate::output::Output;

#[derive(Parser)]
pub struct PolicyOpts {
    /// File with job ads, separated by blank lines
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub job: PathBuf,

    /// Which checks are evaluated
    #[arg(long, default_value_t = ModeArg::Periodic, value_enum)]
    pub mode: ModeArg,

    /// Evaluate as of this time (epoch seconds or RFC 3339) instead of now
    #[arg(long, value_parser = parse_timestamp)]
    pub now: Option<i64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Periodic checks only
    Periodic,
    /// Periodic checks followed by the on-exit checks, as if the jobs have just exited
    Exit,
}

impl From<ModeArg> for PolicyMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Periodic => PolicyMode::PeriodicOnly,
            ModeArg::Exit => PolicyMode::PeriodicThenExit,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PolicyReport {
    pub job: Option<String>,
    pub action: PolicyAction,
    pub firing: Option<FiringInfo>,
}

pub fn command_policy(
    opts: PolicyOpts,
    params: &dyn ParamSource,
    output: &dyn Output,
) -> anyhow::Result<()> {
    let ads = load_ads(&opts.job)?;
    let mode = opts.mode.into();
    let now = opts.now.unwrap_or_else(|| epoch_seconds(SystemTime::now()));
    let reports = evaluate_ads(&ads, SystemPolicy::load(params), mode, now);
    output.print_policy_reports(&reports);
    Ok(())
}

pub fn load_ads(path: &Path) -> anyhow::Result<Vec<JobAd>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read job ads from {}", path.display()))?;
    let ads = JobAd::parse_many(&text)
        .with_context(|| format!("Invalid job ad in {}", path.display()))?;
    log::debug!("Loaded {} job ad(s) from {}", ads.len(), path.display());
    Ok(ads)
}

pub fn evaluate_ads(
    ads: &[JobAd],
    system: SystemPolicy,
    mode: PolicyMode,
    now: i64,
) -> Vec<PolicyReport> {
    let mut policy = UserPolicy::new(Arc::new(system));
    ads.iter()
        .map(|ad| {
            let job = ad.job_id().map(|id| id.to_string());
            if mode == PolicyMode::PeriodicThenExit && !has_exit_attributes(ad) {
                log::warn!(
                    "Job {} has no exit status, evaluating periodic checks only",
                    job.as_deref().unwrap_or("<unknown>")
                );
                let action = policy.analyze_policy_at(ad, PolicyMode::PeriodicOnly, now);
                return report(job, action, &policy);
            }
            let action = policy.analyze_policy_at(ad, mode, now);
            if action == PolicyAction::UndefinedEvaluation {
                log::warn!(
                    "Policy of job {} could not be evaluated",
                    job.as_deref().unwrap_or("<unknown>")
                );
            }
            report(job, action, &policy)
        })
        .collect()
}

fn report(job: Option<String>, action: PolicyAction, policy: &UserPolicy) -> PolicyReport {
    PolicyReport {
        job,
        action,
        firing: policy.firing_info().cloned(),
    }
}

/// On-exit checks may only run for ads that carry the exit status.
fn has_exit_attributes(ad: &JobAd) -> bool {
    ad.contains(attrs::EXIT_BY_SIGNAL)
        && (ad.contains(attrs::EXIT_CODE) || ad.contains(attrs::EXIT_SIGNAL))
}
