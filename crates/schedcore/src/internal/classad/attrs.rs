//! Names of job attributes read by the negotiator and the policy evaluator.

pub const JOB_STATUS: &str = "JobStatus";
pub const CLUSTER_ID: &str = "ClusterId";
pub const PROC_ID: &str = "ProcId";
pub const AUTO_CLUSTER_ID: &str = "AutoClusterId";
pub const RESOURCE_REQUEST_COUNT: &str = "ResourceRequestCount";

pub const PERIODIC_HOLD: &str = "PeriodicHold";
pub const PERIODIC_RELEASE: &str = "PeriodicRelease";
pub const PERIODIC_REMOVE: &str = "PeriodicRemove";
pub const PERIODIC_VACATE: &str = "PeriodicVacate";
pub const ON_EXIT_HOLD: &str = "OnExitHold";
pub const ON_EXIT_REMOVE: &str = "OnExitRemove";
pub const TIMER_REMOVE: &str = "TimerRemove";

pub const PERIODIC_HOLD_REASON: &str = "PeriodicHoldReason";
pub const PERIODIC_HOLD_SUBCODE: &str = "PeriodicHoldSubCode";
pub const PERIODIC_RELEASE_REASON: &str = "PeriodicReleaseReason";
pub const PERIODIC_RELEASE_SUBCODE: &str = "PeriodicReleaseSubCode";
pub const PERIODIC_REMOVE_REASON: &str = "PeriodicRemoveReason";
pub const PERIODIC_REMOVE_SUBCODE: &str = "PeriodicRemoveSubCode";
pub const PERIODIC_VACATE_REASON: &str = "PeriodicVacateReason";
pub const PERIODIC_VACATE_SUBCODE: &str = "PeriodicVacateSubCode";
pub const ON_EXIT_HOLD_REASON: &str = "OnExitHoldReason";
pub const ON_EXIT_HOLD_SUBCODE: &str = "OnExitHoldSubCode";
pub const ON_EXIT_REMOVE_REASON: &str = "OnExitRemoveReason";
pub const ON_EXIT_REMOVE_SUBCODE: &str = "OnExitRemoveSubCode";

pub const HOLD_REASON_CODE: &str = "HoldReasonCode";
pub const EXIT_BY_SIGNAL: &str = "ExitBySignal";
pub const EXIT_CODE: &str = "ExitCode";
pub const EXIT_SIGNAL: &str = "ExitSignal";

pub const ALLOWED_JOB_DURATION: &str = "AllowedJobDuration";
pub const ALLOWED_EXECUTE_DURATION: &str = "AllowedExecuteDuration";
pub const JOB_CURRENT_START_DATE: &str = "JobCurrentStartDate";
pub const JOB_CURRENT_START_EXECUTING_DATE: &str = "JobCurrentStartExecutingDate";
pub const JOB_CURRENT_FINISH_TRANSFER_OUTPUT_DATE: &str = "JobCurrentFinishTransferOutputDate";
