use std::collections::VecDeque;

use crate::internal::classad::ad::JobAd;
use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};
use crate::internal::negotiate::channel::ScheddChannel;

/// In-memory scheduler that hands out the given ads verbatim, in order.
pub struct MockSchedd {
    ads: VecDeque<JobAd>,
    replies: VecDeque<FromScheddMessage>,
    sent: Vec<ToScheddMessage>,
    sends_before_failure: Option<usize>,
    receives_before_failure: Option<usize>,
}

impl MockSchedd {
    pub fn new(ads: Vec<JobAd>) -> MockSchedd {
        MockSchedd {
            ads: ads.into(),
            replies: Default::default(),
            sent: Vec::new(),
            sends_before_failure: None,
            receives_before_failure: None,
        }
    }

    /// The first `count` sends succeed, the following ones fail.
    pub fn fail_sends_after(mut self, count: usize) -> MockSchedd {
        self.sends_before_failure = Some(count);
        self
    }

    /// The connection drops after `count` replies were received.
    pub fn drop_after_replies(mut self, count: usize) -> MockSchedd {
        self.receives_before_failure = Some(count);
        self
    }

    pub fn sent(&self) -> &[ToScheddMessage] {
        &self.sent
    }

    /// Number of job requests (batched or not) the negotiator made.
    pub fn request_count(&self) -> usize {
        self.sent
            .iter()
            .filter(|msg| !matches!(msg, ToScheddMessage::EndNegotiate))
            .count()
    }

    pub fn remaining_ads(&self) -> usize {
        self.ads.len()
    }
}

impl ScheddChannel for MockSchedd {
    async fn send(&mut self, message: ToScheddMessage) -> crate::Result<()> {
        if let Some(count) = self.sends_before_failure {
            if count == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }
            self.sends_before_failure = Some(count - 1);
        }
        match &message {
            ToScheddMessage::SendJobInfo => self.replies.push_back(match self.ads.pop_front() {
                Some(ad) => FromScheddMessage::JobInfo(ad),
                None => FromScheddMessage::NoMoreJobs,
            }),
            ToScheddMessage::SendResourceRequestList { count } => {
                for _ in 0..*count {
                    match self.ads.pop_front() {
                        Some(ad) => self.replies.push_back(FromScheddMessage::JobInfo(ad)),
                        None => {
                            self.replies.push_back(FromScheddMessage::NoMoreJobs);
                            break;
                        }
                    }
                }
            }
            ToScheddMessage::EndNegotiate => {}
        }
        self.sent.push(message);
        Ok(())
    }

    async fn receive(&mut self) -> crate::Result<FromScheddMessage> {
        if let Some(count) = self.receives_before_failure {
            if count == 0 {
                return Err(crate::Error::ProtocolError("Schedd closed the connection".into()));
            }
            self.receives_before_failure = Some(count - 1);
        }
        self.replies
            .pop_front()
            .ok_or_else(|| crate::Error::ProtocolError("No reply pending".into()))
    }
}
