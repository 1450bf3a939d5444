use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::internal::classad::attrs;

/// Named checks that can decide a job transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyCheck {
    AllowedJobDuration,
    AllowedExecuteDuration,
    PeriodicVacate,
    TimerRemove,
    PeriodicHold,
    PeriodicRelease,
    PeriodicRemove,
    OnExitHold,
    OnExitRemove,
}

impl PolicyCheck {
    pub const PERIODIC_WITH_SYSTEM_FALLBACK: [PolicyCheck; 4] = [
        PolicyCheck::PeriodicHold,
        PolicyCheck::PeriodicRelease,
        PolicyCheck::PeriodicRemove,
        PolicyCheck::PeriodicVacate,
    ];

    /// Job attribute holding the check.
    pub fn attr_name(&self) -> &'static str {
        match self {
            PolicyCheck::AllowedJobDuration => attrs::ALLOWED_JOB_DURATION,
            PolicyCheck::AllowedExecuteDuration => attrs::ALLOWED_EXECUTE_DURATION,
            PolicyCheck::PeriodicVacate => attrs::PERIODIC_VACATE,
            PolicyCheck::TimerRemove => attrs::TIMER_REMOVE,
            PolicyCheck::PeriodicHold => attrs::PERIODIC_HOLD,
            PolicyCheck::PeriodicRelease => attrs::PERIODIC_RELEASE,
            PolicyCheck::PeriodicRemove => attrs::PERIODIC_REMOVE,
            PolicyCheck::OnExitHold => attrs::ON_EXIT_HOLD,
            PolicyCheck::OnExitRemove => attrs::ON_EXIT_REMOVE,
        }
    }

    /// Companion attribute with a user supplied reason string.
    pub fn reason_attr(&self) -> Option<&'static str> {
        match self {
            PolicyCheck::PeriodicVacate => Some(attrs::PERIODIC_VACATE_REASON),
            PolicyCheck::PeriodicHold => Some(attrs::PERIODIC_HOLD_REASON),
            PolicyCheck::PeriodicRelease => Some(attrs::PERIODIC_RELEASE_REASON),
            PolicyCheck::PeriodicRemove => Some(attrs::PERIODIC_REMOVE_REASON),
            PolicyCheck::OnExitHold => Some(attrs::ON_EXIT_HOLD_REASON),
            PolicyCheck::OnExitRemove => Some(attrs::ON_EXIT_REMOVE_REASON),
            _ => None,
        }
    }

    pub fn subcode_attr(&self) -> Option<&'static str> {
        match self {
            PolicyCheck::PeriodicVacate => Some(attrs::PERIODIC_VACATE_SUBCODE),
            PolicyCheck::PeriodicHold => Some(attrs::PERIODIC_HOLD_SUBCODE),
            PolicyCheck::PeriodicRelease => Some(attrs::PERIODIC_RELEASE_SUBCODE),
            PolicyCheck::PeriodicRemove => Some(attrs::PERIODIC_REMOVE_SUBCODE),
            PolicyCheck::OnExitHold => Some(attrs::ON_EXIT_HOLD_SUBCODE),
            PolicyCheck::OnExitRemove => Some(attrs::ON_EXIT_REMOVE_SUBCODE),
            _ => None,
        }
    }

    /// Configuration knob with the system-wide variant of the check.
    pub fn system_knob(&self) -> Option<&'static str> {
        match self {
            PolicyCheck::PeriodicHold => Some("SYSTEM_PERIODIC_HOLD"),
            PolicyCheck::PeriodicRelease => Some("SYSTEM_PERIODIC_RELEASE"),
            PolicyCheck::PeriodicRemove => Some("SYSTEM_PERIODIC_REMOVE"),
            PolicyCheck::PeriodicVacate => Some("SYSTEM_PERIODIC_VACATE"),
            _ => None,
        }
    }
}

impl Display for PolicyCheck {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attr_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiringSource {
    /// Expression stored in the job ad.
    JobAttribute,
    /// Administrator configured `SYSTEM_PERIODIC_*` expression.
    SystemMacro,
    /// Built-in wall clock limit (`AllowedJobDuration`, `AllowedExecuteDuration`).
    DurationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiringValue {
    True,
    False,
    Undefined,
}

impl FiringValue {
    pub fn as_i32(&self) -> i32 {
        match self {
            FiringValue::True => 1,
            FiringValue::False => 0,
            FiringValue::Undefined => -1,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FiringValue::True => "TRUE",
            FiringValue::False => "FALSE",
            FiringValue::Undefined => "UNDEFINED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldReasonCode {
    UserRequest,
    JobPolicy,
    SystemPolicy,
    JobDurationExceeded,
    JobExecuteExceeded,
}

impl HoldReasonCode {
    pub fn as_i64(&self) -> i64 {
        match self {
            HoldReasonCode::UserRequest => 1,
            HoldReasonCode::JobPolicy => 3,
            HoldReasonCode::SystemPolicy => 26,
            HoldReasonCode::JobDurationExceeded => 46,
            HoldReasonCode::JobExecuteExceeded => 47,
        }
    }
}

/// Explanation of the last decision made by the policy evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiringInfo {
    pub check: PolicyCheck,
    pub source: FiringSource,
    /// Attribute or knob name, e.g. `PeriodicHold` or `SYSTEM_PERIODIC_HOLD`.
    pub expression: String,
    pub value: FiringValue,
    pub reason: String,
    pub reason_code: HoldReasonCode,
    pub reason_subcode: i64,
}

impl FiringInfo {
    pub(crate) fn default_reason(
        source: FiringSource,
        name: &str,
        text: &str,
        value: FiringValue,
    ) -> String {
        let origin = match source {
            FiringSource::SystemMacro => "system macro",
            _ => "job attribute",
        };
        format!(
            "The {origin} {name} expression '{text}' evaluated to {}",
            value.label()
        )
    }
}
