use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::internal::common::Set;
use crate::internal::common::ids::AutoclusterId;
use crate::internal::config::ParamSource;
use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};
use crate::internal::negotiate::channel::ScheddChannel;
use crate::internal::negotiate::request::ResourceRequest;

pub const DEFAULT_REQUEST_LIST_SIZE: u32 = 200;

pub const REQUEST_LIST_SIZE_KNOB: &str = "NEGOTIATOR_RESOURCE_REQUEST_LIST_SIZE";
pub const USE_REQUEST_COUNTS_KNOB: &str = "USE_RESOURCE_REQUEST_COUNTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchErrorKind {
    SendFailed,
    ReceiveFailed,
    /// The scheduler sent a request without `ClusterId`/`ProcId`.
    MalformedRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchStatus {
    Fetched(usize),
    NoMoreJobs,
}

/// Negotiator side of one negotiation session with a scheduler.
///
/// Requests are fetched in batches and returned in arrival order. Once the
/// caller reports that the last returned request did not match, the rest of its
/// autocluster is skipped for the remainder of the session.
pub struct ResourceRequestList {
    protocol_version: i32,
    batch_size: u32,
    use_counts: bool,

    pending: VecDeque<ResourceRequest>,
    rejected: Set<AutoclusterId>,
    clear_rejected_on_fetch: bool,

    cached: Option<ResourceRequest>,
    remaining_offers: u32,
    current_autocluster: Option<AutoclusterId>,

    schedd_done: bool,
    session_closed: bool,
    error: Option<FetchErrorKind>,

    requests_fetched: u64,
    round_trips: u64,
}

impl ResourceRequestList {
    /// Schedulers speaking a protocol version below 1 only understand
    /// one-job-at-a-time requests.
    pub fn new(protocol_version: i32) -> Self {
        ResourceRequestList {
            protocol_version,
            batch_size: DEFAULT_REQUEST_LIST_SIZE,
            use_counts: true,
            pending: VecDeque::new(),
            rejected: Set::default(),
            clear_rejected_on_fetch: false,
            cached: None,
            remaining_offers: 0,
            current_autocluster: None,
            schedd_done: false,
            session_closed: false,
            error: None,
            requests_fetched: 0,
            round_trips: 0,
        }
    }

    pub fn from_config(params: &dyn ParamSource, protocol_version: i32) -> Self {
        let batch_size = params
            .param_integer(REQUEST_LIST_SIZE_KNOB, DEFAULT_REQUEST_LIST_SIZE as i64)
            .clamp(0, u32::MAX as i64) as u32;
        let use_counts = params.param_boolean(USE_REQUEST_COUNTS_KNOB, true);
        let mut list = ResourceRequestList::new(protocol_version);
        list.configure(batch_size, use_counts);
        list
    }

    pub fn configure(&mut self, fetch_batch_size: u32, use_counts: bool) {
        self.batch_size = fetch_batch_size;
        self.use_counts = use_counts;
        log::debug!(
            "Resource request list: batch size {fetch_batch_size}, counts {use_counts}, protocol {}{}",
            self.protocol_version,
            if self.is_legacy() { " (one job at a time)" } else { "" }
        );
    }

    pub fn is_legacy(&self) -> bool {
        self.batch_size <= 1 || !self.use_counts || self.protocol_version < 1
    }

    /// Next request to match. `Ok(None)` means the scheduler has no more jobs.
    pub async fn get_request<C: ScheddChannel>(
        &mut self,
        channel: &mut C,
    ) -> crate::Result<Option<ResourceRequest>> {
        if let Some(kind) = self.error {
            return Err(crate::Error::ProtocolError(format!(
                "Negotiation session already failed ({kind:?})"
            )));
        }

        if self.use_counts && self.remaining_offers > 0 {
            if let Some(cached) = &self.cached {
                self.remaining_offers -= 1;
                self.current_autocluster = cached.autocluster;
                return Ok(Some(cached.clone()));
            }
        }
        self.cached = None;
        self.remaining_offers = 0;

        loop {
            let request = match self.pending.pop_front() {
                Some(request) => request,
                None => {
                    if self.schedd_done || self.session_closed {
                        return Ok(None);
                    }
                    self.fetch_requests(channel).await?;
                    continue;
                }
            };

            if let Some(autocluster) = request.autocluster {
                if self.rejected.contains(&autocluster) {
                    log::trace!(
                        "Skipping job {} of rejected autocluster {autocluster}",
                        request.job_id
                    );
                    continue;
                }
            }

            if self.use_counts && request.count > 1 {
                self.remaining_offers = request.count - 1;
                self.cached = Some(request.clone());
            }
            self.current_autocluster = request.autocluster;
            return Ok(Some(request));
        }
    }

    /// The most recently returned request did not match any resource.
    pub fn no_match_found(&mut self) {
        self.remaining_offers = 0;
        self.cached = None;
        if self.is_legacy() {
            return;
        }
        if let Some(autocluster) = self.current_autocluster {
            if self.rejected.insert(autocluster) {
                log::debug!("Rejecting autocluster {autocluster} for the rest of the session");
            }
        }
    }

    /// Forget rejected autoclusters; takes effect on the next wire fetch.
    pub fn clear_rejected_autoclusters(&mut self) {
        self.clear_rejected_on_fetch = true;
    }

    /// Fetches one batch ahead of the matchmaking loop.
    pub async fn prefetch<C: ScheddChannel>(
        &mut self,
        channel: &mut C,
    ) -> crate::Result<PrefetchStatus> {
        if self.schedd_done || self.session_closed {
            return Ok(PrefetchStatus::NoMoreJobs);
        }
        let fetched = self.fetch_requests(channel).await?;
        if fetched == 0 && self.schedd_done {
            Ok(PrefetchStatus::NoMoreJobs)
        } else {
            Ok(PrefetchStatus::Fetched(fetched))
        }
    }

    /// The scheduler keeps the session open until it has answered `NoMoreJobs`
    /// or received `EndNegotiate`.
    pub fn needs_end_negotiate(&self) -> bool {
        !self.schedd_done && !self.session_closed
    }

    pub async fn end_negotiate<C: ScheddChannel>(&mut self, channel: &mut C) -> crate::Result<()> {
        self.session_closed = true;
        if let Err(error) = channel.send(ToScheddMessage::EndNegotiate).await {
            return Err(self.fail(FetchErrorKind::SendFailed, error));
        }
        log::debug!("Negotiation session ended");
        Ok(())
    }

    pub fn had_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_code(&self) -> Option<FetchErrorKind> {
        self.error
    }

    pub fn requests_fetched(&self) -> u64 {
        self.requests_fetched
    }

    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn remaining_offers(&self) -> u32 {
        self.remaining_offers
    }

    pub fn is_rejected(&self, autocluster: AutoclusterId) -> bool {
        self.rejected.contains(&autocluster)
    }

    async fn fetch_requests<C: ScheddChannel>(&mut self, channel: &mut C) -> crate::Result<usize> {
        if self.clear_rejected_on_fetch {
            self.rejected.clear();
            self.clear_rejected_on_fetch = false;
        }

        let (message, expected) = if self.is_legacy() {
            (ToScheddMessage::SendJobInfo, 1)
        } else {
            (
                ToScheddMessage::SendResourceRequestList {
                    count: self.batch_size,
                },
                self.batch_size as usize,
            )
        };
        self.round_trips += 1;
        if let Err(error) = channel.send(message).await {
            return Err(self.fail(FetchErrorKind::SendFailed, error));
        }

        let mut fetched = 0;
        while fetched < expected {
            match channel.receive().await {
                Ok(FromScheddMessage::NoMoreJobs) => {
                    self.schedd_done = true;
                    break;
                }
                Ok(FromScheddMessage::JobInfo(ad)) => match ResourceRequest::from_ad(ad) {
                    Ok(request) => {
                        self.pending.push_back(request);
                        fetched += 1;
                    }
                    Err(error) => return Err(self.fail(FetchErrorKind::MalformedRequest, error)),
                },
                Err(error) => return Err(self.fail(FetchErrorKind::ReceiveFailed, error)),
            }
        }
        self.requests_fetched += fetched as u64;
        log::debug!(
            "Fetched {fetched} resource request(s) in round trip {}{}",
            self.round_trips,
            if self.schedd_done { ", schedd has no more jobs" } else { "" }
        );
        Ok(fetched)
    }

    fn fail(&mut self, kind: FetchErrorKind, error: crate::Error) -> crate::Error {
        log::error!("Negotiation with schedd failed ({kind:?}): {error}");
        self.error = Some(kind);
        error
    }
}
