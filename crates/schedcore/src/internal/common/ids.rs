use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

define_id_type!(ClusterId, i32);
define_id_type!(ProcId, i32);
define_id_type!(AutoclusterId, i32);

/// Identifies one job in a scheduler queue (`cluster.proc`).
#[derive(Default, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobId {
    cluster: ClusterId,
    proc: ProcId,
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.cluster, self.proc)
    }
}

impl Debug for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl JobId {
    #[inline]
    pub fn new(cluster: ClusterId, proc: ProcId) -> Self {
        Self { cluster, proc }
    }

    #[inline]
    pub fn cluster(&self) -> ClusterId {
        self.cluster
    }

    #[inline]
    pub fn proc(&self) -> ProcId {
        self.proc
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoclusterId, ClusterId, JobId, ProcId};

    #[test]
    fn test_id_display() {
        assert_eq!(ClusterId::new(42).to_string(), "42");
        assert_eq!(ProcId::new(-1).to_string(), "-1");
        assert_eq!(format!("{:>4}", AutoclusterId::new(7)), "   7");
        assert_eq!(format!("{:?}", ClusterId::new(42)), "ClusterId(42)");
    }

    #[test]
    fn test_job_id_display() {
        let id = JobId::new(ClusterId::new(12), ProcId::new(3));
        assert_eq!(id.to_string(), "12.3");
        assert_eq!(format!("{id:?}"), "12.3");
    }

    #[test]
    fn test_job_id_ordering() {
        let a = JobId::new(1.into(), 5.into());
        let b = JobId::new(2.into(), 0.into());
        assert!(a < b);
    }
}
