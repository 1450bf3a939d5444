use crate::internal::classad::ad::JobAd;
use crate::internal::classad::attrs;
use crate::internal::common::ids::{AutoclusterId, JobId};

/// One job (or a group of identical jobs) offered by the scheduler for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub ad: JobAd,
    pub job_id: JobId,
    /// Requests without an autocluster are never rejected as a group.
    pub autocluster: Option<AutoclusterId>,
    /// Number of identical instances this ad stands for (`ResourceRequestCount`).
    pub count: u32,
}

impl ResourceRequest {
    /// Fails when the ad lacks `ClusterId` or `ProcId`, which means the session
    /// is out of sync with the scheduler.
    pub fn from_ad(ad: JobAd) -> crate::Result<Self> {
        let job_id = ad.job_id().ok_or_else(|| {
            crate::Error::ProtocolError(format!(
                "Resource request without {} or {}",
                attrs::CLUSTER_ID,
                attrs::PROC_ID
            ))
        })?;
        let count = ad
            .eval_integer(attrs::RESOURCE_REQUEST_COUNT, 0)
            .filter(|count| *count > 0)
            .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
            .unwrap_or(1);
        Ok(ResourceRequest {
            autocluster: ad.autocluster(),
            ad,
            job_id,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceRequest;
    use crate::internal::classad::ad::JobAd;
    use crate::internal::common::ids::AutoclusterId;

    #[test]
    fn test_from_ad() {
        let ad = JobAd::parse("ClusterId = 4\nProcId = 2\nAutoClusterId = 9\nResourceRequestCount = 3")
            .unwrap();
        let request = ResourceRequest::from_ad(ad).unwrap();
        assert_eq!(request.job_id.to_string(), "4.2");
        assert_eq!(request.autocluster, Some(AutoclusterId::new(9)));
        assert_eq!(request.count, 3);
    }

    #[test]
    fn test_defaults() {
        let ad = JobAd::parse("ClusterId = 4\nProcId = 2\nResourceRequestCount = -5").unwrap();
        let request = ResourceRequest::from_ad(ad).unwrap();
        assert_eq!(request.autocluster, None);
        assert_eq!(request.count, 1);
    }

    #[test]
    fn test_missing_ids() {
        assert!(ResourceRequest::from_ad(JobAd::parse("ProcId = 2").unwrap()).is_err());
        assert!(ResourceRequest::from_ad(JobAd::parse("ClusterId = 2").unwrap()).is_err());
    }
}
