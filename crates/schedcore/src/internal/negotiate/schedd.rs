use std::collections::VecDeque;

use crate::connection::Connection;
use crate::internal::classad::ad::JobAd;
use crate::internal::classad::attrs;
use crate::internal::classad::status::JobStatus;
use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};

/// Idle jobs of a scheduler in priority order, as offered to the negotiator.
#[derive(Debug, Clone, Default)]
pub struct ScheddQueue {
    jobs: VecDeque<JobAd>,
}

impl ScheddQueue {
    /// Keeps only idle jobs (or jobs without a status).
    pub fn new(jobs: Vec<JobAd>) -> Self {
        let jobs = jobs
            .into_iter()
            .filter(|ad| match ad.eval_integer(attrs::JOB_STATUS, 0) {
                Some(status) => JobStatus::from_i64(status) == Some(JobStatus::Idle),
                None => true,
            })
            .collect();
        ScheddQueue { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn next_job(&mut self) -> Option<JobAd> {
        self.jobs.pop_front()
    }

    /// Up to `count` request ads, one per autocluster, each carrying
    /// `ResourceRequestCount` with the number of queued jobs it stands for.
    pub fn next_requests(&mut self, count: usize) -> Vec<JobAd> {
        let mut requests = Vec::new();
        while requests.len() < count {
            let Some(mut ad) = self.jobs.pop_front() else {
                break;
            };
            let mut instances = 1;
            if let Some(autocluster) = ad.autocluster() {
                let before = self.jobs.len();
                self.jobs.retain(|job| job.autocluster() != Some(autocluster));
                instances += before - self.jobs.len();
            }
            ad.insert(attrs::RESOURCE_REQUEST_COUNT, instances as i64);
            requests.push(ad);
        }
        requests
    }

    /// Replies to one negotiator command; `None` for `EndNegotiate`.
    pub fn reply(&mut self, message: &ToScheddMessage) -> Option<Vec<FromScheddMessage>> {
        match message {
            ToScheddMessage::SendJobInfo => Some(vec![match self.next_job() {
                Some(ad) => FromScheddMessage::JobInfo(ad),
                None => FromScheddMessage::NoMoreJobs,
            }]),
            ToScheddMessage::SendResourceRequestList { count } => {
                let count = *count as usize;
                let mut replies: Vec<_> = self
                    .next_requests(count)
                    .into_iter()
                    .map(FromScheddMessage::JobInfo)
                    .collect();
                if replies.len() < count {
                    replies.push(FromScheddMessage::NoMoreJobs);
                }
                Some(replies)
            }
            ToScheddMessage::EndNegotiate => None,
        }
    }
}

/// Serves one negotiation session until the negotiator ends it, the queue is
/// exhausted or the connection is closed. Returns the number of ads sent.
pub async fn serve_negotiation(
    connection: &mut Connection<ToScheddMessage, FromScheddMessage>,
    queue: &mut ScheddQueue,
) -> crate::Result<usize> {
    let mut sent = 0;
    loop {
        let message = match connection.receive().await {
            Some(message) => message?,
            None => {
                log::debug!("Negotiator closed the connection");
                break;
            }
        };
        log::debug!("Negotiator requested {message:?}");
        let Some(replies) = queue.reply(&message) else {
            log::debug!("Negotiator ended the session");
            break;
        };
        let mut finished = false;
        for reply in replies {
            match &reply {
                FromScheddMessage::JobInfo(_) => sent += 1,
                FromScheddMessage::NoMoreJobs => finished = true,
            }
            connection.send(reply).await?;
        }
        if finished {
            log::debug!("No more jobs, {sent} request(s) sent");
            break;
        }
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::ScheddQueue;
    use crate::internal::classad::ad::JobAd;
    use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};

    fn job(cluster: i32, autocluster: i32) -> JobAd {
        JobAd::parse(&format!(
            "ClusterId = {cluster}\nProcId = 0\nAutoClusterId = {autocluster}\nJobStatus = 1"
        ))
        .unwrap()
    }

    #[test]
    fn test_only_idle_jobs() {
        let mut running = job(3, 1);
        running.insert("JobStatus", 2);
        let queue = ScheddQueue::new(vec![job(1, 1), running, job(2, 1)]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_requests_grouped_by_autocluster() {
        let mut queue = ScheddQueue::new(vec![job(1, 10), job(2, 20), job(3, 10), job(4, 30)]);
        let requests = queue.next_requests(2);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].eval_integer("ClusterId", 0), Some(1));
        assert_eq!(requests[0].eval_integer("ResourceRequestCount", 0), Some(2));
        assert_eq!(requests[1].eval_integer("ClusterId", 0), Some(2));
        assert_eq!(requests[1].eval_integer("ResourceRequestCount", 0), Some(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_reply_terminates_short_batch() {
        let mut queue = ScheddQueue::new(vec![job(1, 10)]);
        let replies = queue
            .reply(&ToScheddMessage::SendResourceRequestList { count: 5 })
            .unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1], FromScheddMessage::NoMoreJobs);
        assert_eq!(
            queue.reply(&ToScheddMessage::SendJobInfo).unwrap(),
            vec![FromScheddMessage::NoMoreJobs]
        );
        assert!(queue.reply(&ToScheddMessage::EndNegotiate).is_none());
    }

    #[test]
    fn test_legacy_reply_sends_plain_ad() {
        let mut queue = ScheddQueue::new(vec![job(1, 10), job(2, 10)]);
        let replies = queue.reply(&ToScheddMessage::SendJobInfo).unwrap();
        match &replies[..] {
            [FromScheddMessage::JobInfo(ad)] => assert!(!ad.contains("ResourceRequestCount")),
            other => panic!("Unexpected reply {other:?}"),
        }
        assert_eq!(queue.len(), 1);
    }
}
