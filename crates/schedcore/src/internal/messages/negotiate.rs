use serde::{Deserialize, Serialize};

use crate::internal::classad::ad::JobAd;

/// Commands sent by the negotiator during a negotiation session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ToScheddMessage {
    /// Legacy request for a single job.
    SendJobInfo,
    /// Request for up to `count` resource requests.
    SendResourceRequestList { count: u32 },
    EndNegotiate,
}

/// Replies of the scheduler. A batched request is answered by up to `count`
/// `JobInfo` messages, terminated early by `NoMoreJobs`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FromScheddMessage {
    NoMoreJobs,
    JobInfo(JobAd),
}
