use crate::internal::classad::ad::JobAd;
use crate::internal::classad::attrs;
use crate::internal::classad::status::JobStatus;
use crate::internal::classad::value::Value;

pub struct JobBuilder {
    ad: JobAd,
}

impl JobBuilder {
    /// Idle job `cluster.proc`.
    pub fn new(cluster: i32, proc: i32) -> JobBuilder {
        let mut ad = JobAd::new();
        ad.insert(attrs::CLUSTER_ID, cluster);
        ad.insert(attrs::PROC_ID, proc);
        ad.insert(attrs::JOB_STATUS, JobStatus::Idle.as_i64());
        JobBuilder { ad }
    }

    /// Ad parsed from text, without any implicit attributes.
    pub fn parse(text: &str) -> JobBuilder {
        JobBuilder {
            ad: JobAd::parse(text).unwrap(),
        }
    }

    pub fn status(mut self, status: JobStatus) -> JobBuilder {
        self.ad.insert(attrs::JOB_STATUS, status.as_i64());
        self
    }

    pub fn autocluster(mut self, id: i32) -> JobBuilder {
        self.ad.insert(attrs::AUTO_CLUSTER_ID, id);
        self
    }

    pub fn count(mut self, count: i64) -> JobBuilder {
        self.ad.insert(attrs::RESOURCE_REQUEST_COUNT, count);
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> JobBuilder {
        self.ad.insert(name, value);
        self
    }

    pub fn expr(mut self, name: &str, text: &str) -> JobBuilder {
        self.ad.assign_expr(name, text).unwrap();
        self
    }

    pub fn without(mut self, name: &str) -> JobBuilder {
        self.ad.remove(name);
        self
    }

    pub fn build(self) -> JobAd {
        self.ad
    }
}

/// Jobs `1.0`, `2.0`, ... with the given autoclusters.
pub fn jobs_in_autoclusters(autoclusters: &[i32]) -> Vec<JobAd> {
    autoclusters
        .iter()
        .enumerate()
        .map(|(i, ac)| JobBuilder::new(i as i32 + 1, 0).autocluster(*ac).build())
        .collect()
}
