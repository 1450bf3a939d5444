use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpStream;

use schedcore::config::ParamTable;
use schedcore::connection::Connection;
use schedcore::negotiate::{
    FromScheddMessage, REQUEST_LIST_SIZE_KNOB, ResourceRequest, ResourceRequestList,
    ScheddChannel, ToScheddMessage, USE_REQUEST_COUNTS_KNOB,
};
use schedcore::{AutoclusterId, Set};

use crate::output::Output;

#[derive(Parser)]
pub struct NegotiateOpts {
    /// Address of the scheduler
    #[arg(long, default_value = "127.0.0.1:9618")]
    pub schedd: String,

    /// Protocol version spoken by the scheduler
    #[arg(long, default_value_t = 1)]
    pub protocol: i32,

    /// Number of requests fetched per round trip
    /// (overrides NEGOTIATOR_RESOURCE_REQUEST_LIST_SIZE)
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Offer grouped requests only once (overrides USE_RESOURCE_REQUEST_COUNTS)
    #[arg(long)]
    pub no_counts: bool,

    /// Number of free slots, the session ends when all of them are matched
    #[arg(long, default_value_t = 100)]
    pub slots: u32,

    /// Autoclusters that no slot matches
    #[arg(long = "reject", value_name = "AUTOCLUSTER", value_delimiter = ',')]
    pub rejected: Vec<i32>,
}

#[derive(Serialize, Debug)]
pub struct Offer {
    pub job: String,
    pub autocluster: Option<i32>,
    pub matched: bool,
}

#[derive(Serialize, Debug, Default)]
pub struct NegotiationSummary {
    pub offers: Vec<Offer>,
    pub requests_fetched: u64,
    pub round_trips: u64,
    /// The negotiator ran out of slots before the scheduler ran out of jobs.
    pub ended_early: bool,
}

impl NegotiationSummary {
    pub fn matched(&self) -> usize {
        self.offers.iter().filter(|offer| offer.matched).count()
    }
}

/// Stand-in for the matchmaking of a negotiator: a pool of identical slots that
/// accept every job except those of the listed autoclusters.
pub struct Matchmaker {
    free_slots: u32,
    rejected: Set<AutoclusterId>,
}

impl Matchmaker {
    pub fn new(free_slots: u32, rejected: impl IntoIterator<Item = AutoclusterId>) -> Self {
        Matchmaker {
            free_slots,
            rejected: rejected.into_iter().collect(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.free_slots == 0
    }

    pub fn try_match(&mut self, request: &ResourceRequest) -> bool {
        if self.free_slots == 0 {
            return false;
        }
        if let Some(autocluster) = request.autocluster {
            if self.rejected.contains(&autocluster) {
                return false;
            }
        }
        self.free_slots -= 1;
        true
    }
}

pub async fn command_negotiate(
    opts: NegotiateOpts,
    params: &ParamTable,
    output: &dyn Output,
) -> anyhow::Result<()> {
    let mut params = params.clone();
    if let Some(batch_size) = opts.batch_size {
        params.set(REQUEST_LIST_SIZE_KNOB, batch_size.to_string());
    }
    if opts.no_counts {
        params.set(USE_REQUEST_COUNTS_KNOB, "false");
    }

    let socket = TcpStream::connect(&opts.schedd)
        .await
        .with_context(|| format!("Cannot connect to scheduler at {}", opts.schedd))?;
    let mut connection = Connection::<FromScheddMessage, ToScheddMessage>::init(socket)?;

    let mut list = ResourceRequestList::from_config(&params, opts.protocol);
    let mut matchmaker = Matchmaker::new(
        opts.slots,
        opts.rejected.iter().copied().map(AutoclusterId::new),
    );
    let summary = negotiate(&mut connection, &mut list, &mut matchmaker).await?;
    output.print_negotiation_summary(&summary);
    Ok(())
}

/// Offers requests to the matchmaker until the scheduler has no more jobs or
/// all slots are taken.
pub async fn negotiate<C: ScheddChannel>(
    channel: &mut C,
    list: &mut ResourceRequestList,
    matchmaker: &mut Matchmaker,
) -> anyhow::Result<NegotiationSummary> {
    let mut summary = NegotiationSummary::default();
    loop {
        if matchmaker.is_exhausted() {
            if list.needs_end_negotiate() {
                list.end_negotiate(channel).await?;
                summary.ended_early = true;
            }
            break;
        }
        let Some(request) = list.get_request(channel).await? else {
            break;
        };
        let matched = matchmaker.try_match(&request);
        if !matched {
            list.no_match_found();
        }
        log::debug!(
            "Job {} {}",
            request.job_id,
            if matched { "matched" } else { "did not match" }
        );
        summary.offers.push(Offer {
            job: request.job_id.to_string(),
            autocluster: request.autocluster.map(|id| id.as_num()),
            matched,
        });
    }
    summary.requests_fetched = list.requests_fetched();
    summary.round_trips = list.round_trips();
    Ok(summary)
}
