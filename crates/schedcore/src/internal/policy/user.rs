use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::internal::classad::ad::JobAd;
use crate::internal::classad::attrs;
use crate::internal::classad::expr::EvalContext;
use crate::internal::classad::status::JobStatus;
use crate::internal::classad::value::Value;
use crate::internal::policy::firing::{
    FiringInfo, FiringSource, FiringValue, HoldReasonCode, PolicyCheck,
};
use crate::internal::policy::system::SystemPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAction {
    StaysInQueue,
    RemoveFromQueue,
    HoldInQueue,
    ReleaseFromHold,
    VacateFromRunning,
    /// The job ad is malformed; the caller should log it and skip the job.
    UndefinedEvaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Periodic checks only (housekeeping timer).
    PeriodicOnly,
    /// Periodic checks followed by on-exit checks, right after the job exited.
    PeriodicThenExit,
}

/// Decides the next lifecycle transition of a job and remembers why.
///
/// The evaluator never modifies the job ad. The explanation of the last
/// decision stays available until the next call to [`UserPolicy::analyze_policy`].
pub struct UserPolicy {
    system: Arc<SystemPolicy>,
    firing: Option<FiringInfo>,
}

impl UserPolicy {
    pub fn new(system: Arc<SystemPolicy>) -> Self {
        UserPolicy {
            system,
            firing: None,
        }
    }

    /// Replaces the system-wide policy, e.g. after the configuration was reloaded.
    pub fn reconfigure(&mut self, system: Arc<SystemPolicy>) {
        self.system = system;
    }

    pub fn system_policy(&self) -> &SystemPolicy {
        &self.system
    }

    pub fn analyze_policy(&mut self, ad: &JobAd, mode: PolicyMode) -> PolicyAction {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.analyze_policy_at(ad, mode, now)
    }

    /// Evaluates the policy as if the current time was `now` (seconds since the epoch).
    ///
    /// # Panics
    /// In [`PolicyMode::PeriodicThenExit`] the ad must contain `ExitBySignal` and at
    /// least one of `ExitCode`/`ExitSignal`. Calling it on an ad without them is a
    /// programming error.
    pub fn analyze_policy_at(&mut self, ad: &JobAd, mode: PolicyMode, now: i64) -> PolicyAction {
        self.firing = None;

        let Some(status) = ad
            .eval_integer(attrs::JOB_STATUS, now)
            .and_then(JobStatus::from_i64)
        else {
            log::debug!("Job ad has no usable {}", attrs::JOB_STATUS);
            return PolicyAction::UndefinedEvaluation;
        };

        if status == JobStatus::Removed {
            return match mode {
                PolicyMode::PeriodicOnly => PolicyAction::StaysInQueue,
                PolicyMode::PeriodicThenExit => PolicyAction::RemoveFromQueue,
            };
        }

        if matches!(status, JobStatus::Running | JobStatus::Suspended) {
            if let Some(info) = check_durations(ad, now) {
                return self.fire(info, PolicyAction::HoldInQueue);
            }
            if mode == PolicyMode::PeriodicOnly {
                if let Some(info) = self.evaluate_check(ad, PolicyCheck::PeriodicVacate, now) {
                    return self.fire(info, PolicyAction::VacateFromRunning);
                }
            }
        }

        if let Some(expr) = ad.lookup(attrs::TIMER_REMOVE) {
            let value = expr.evaluate(&EvalContext::new(ad, now));
            let deadline = match value {
                Value::Integer(_) | Value::Real(_) => value.as_integer(),
                _ => None,
            };
            match deadline {
                Some(deadline) if deadline >= 0 && deadline < now => {
                    let info = job_firing(ad, PolicyCheck::TimerRemove, FiringValue::True, now);
                    return self.fire(info, PolicyAction::RemoveFromQueue);
                }
                Some(_) => {}
                None => {
                    let info =
                        job_firing(ad, PolicyCheck::TimerRemove, FiringValue::Undefined, now);
                    return self.fire(info, PolicyAction::UndefinedEvaluation);
                }
            }
        }

        if !matches!(status, JobStatus::Held | JobStatus::Completed) {
            if let Some(info) = self.evaluate_check(ad, PolicyCheck::PeriodicHold, now) {
                return self.fire(info, PolicyAction::HoldInQueue);
            }
        }

        if status == JobStatus::Held && !held_by_user(ad, now) {
            if let Some(info) = self.evaluate_check(ad, PolicyCheck::PeriodicRelease, now) {
                return self.fire(info, PolicyAction::ReleaseFromHold);
            }
        }

        if let Some(info) = self.evaluate_check(ad, PolicyCheck::PeriodicRemove, now) {
            return self.fire(info, PolicyAction::RemoveFromQueue);
        }

        if mode == PolicyMode::PeriodicOnly {
            return PolicyAction::StaysInQueue;
        }

        check_exit_attributes(ad);

        if let Some(info) = self.evaluate_check(ad, PolicyCheck::OnExitHold, now) {
            return self.fire(info, PolicyAction::HoldInQueue);
        }

        // A missing OnExitRemove counts as undefined, which removes the job
        let value = ad
            .lookup(attrs::ON_EXIT_REMOVE)
            .map(|expr| expr.evaluate(&EvalContext::new(ad, now)))
            .unwrap_or(Value::Undefined);
        match value.as_number() {
            Some(v) if v == 0.0 => {
                let info = job_firing(ad, PolicyCheck::OnExitRemove, FiringValue::False, now);
                self.fire(info, PolicyAction::StaysInQueue)
            }
            Some(_) => {
                let info = job_firing(ad, PolicyCheck::OnExitRemove, FiringValue::True, now);
                self.fire(info, PolicyAction::RemoveFromQueue)
            }
            None => {
                let info = job_firing(ad, PolicyCheck::OnExitRemove, FiringValue::Undefined, now);
                self.fire(info, PolicyAction::RemoveFromQueue)
            }
        }
    }

    /// Name of the expression behind the last decision, e.g. `PeriodicHold`
    /// or `SYSTEM_PERIODIC_HOLD`.
    pub fn firing_expression(&self) -> Option<&str> {
        self.firing.as_ref().map(|info| info.expression.as_str())
    }

    /// 1 (true), 0 (false) or -1 (undefined, or nothing fired).
    pub fn firing_expression_value(&self) -> i32 {
        self.firing
            .as_ref()
            .map(|info| info.value.as_i32())
            .unwrap_or(-1)
    }

    /// Reason text, hold reason code and subcode of the last decision.
    pub fn firing_reason(&self) -> Option<(&str, HoldReasonCode, i64)> {
        self.firing
            .as_ref()
            .map(|info| (info.reason.as_str(), info.reason_code, info.reason_subcode))
    }

    pub fn firing_info(&self) -> Option<&FiringInfo> {
        self.firing.as_ref()
    }

    fn fire(&mut self, info: FiringInfo, action: PolicyAction) -> PolicyAction {
        log::debug!(
            "Policy decision {action:?} by {} ({:?}): {}",
            info.expression,
            info.source,
            info.reason
        );
        self.firing = Some(info);
        action
    }

    /// Evaluates a boolean check. A check defined in the job ad is authoritative,
    /// the system-wide expressions apply only when the attribute is absent.
    fn evaluate_check(&self, ad: &JobAd, check: PolicyCheck, now: i64) -> Option<FiringInfo> {
        if ad.contains(check.attr_name()) {
            return match ad.eval_attr(check.attr_name(), now).as_bool() {
                Some(true) => Some(job_firing(ad, check, FiringValue::True, now)),
                _ => None,
            };
        }
        let knob = self.system.find_firing(check, ad, now)?;
        let ctx = EvalContext::new(ad, now);
        let reason = knob.eval_reason(&ctx).unwrap_or_else(|| {
            FiringInfo::default_reason(
                FiringSource::SystemMacro,
                &knob.knob,
                &knob.expr.to_string(),
                FiringValue::True,
            )
        });
        Some(FiringInfo {
            check,
            source: FiringSource::SystemMacro,
            expression: knob.knob.clone(),
            value: FiringValue::True,
            reason,
            reason_code: HoldReasonCode::SystemPolicy,
            reason_subcode: knob.eval_subcode(&ctx),
        })
    }
}

fn job_firing(ad: &JobAd, check: PolicyCheck, value: FiringValue, now: i64) -> FiringInfo {
    let name = check.attr_name();
    let custom_reason = check
        .reason_attr()
        .and_then(|attr| ad.eval_string(attr, now))
        .filter(|reason| !reason.is_empty());
    let reason = custom_reason.unwrap_or_else(|| {
        let text = ad
            .lookup(name)
            .map(|expr| expr.to_string())
            .unwrap_or_else(|| "undefined".to_string());
        FiringInfo::default_reason(FiringSource::JobAttribute, name, &text, value)
    });
    let subcode = check
        .subcode_attr()
        .and_then(|attr| ad.eval_integer(attr, now))
        .unwrap_or(0);
    FiringInfo {
        check,
        source: FiringSource::JobAttribute,
        expression: name.to_string(),
        value,
        reason,
        reason_code: HoldReasonCode::JobPolicy,
        reason_subcode: subcode,
    }
}

fn held_by_user(ad: &JobAd, now: i64) -> bool {
    ad.eval_integer(attrs::HOLD_REASON_CODE, now) == Some(HoldReasonCode::UserRequest.as_i64())
}

fn duration_firing(check: PolicyCheck, allowed: i64) -> FiringInfo {
    let (kind, code) = match check {
        PolicyCheck::AllowedExecuteDuration => ("execute", HoldReasonCode::JobExecuteExceeded),
        _ => ("job", HoldReasonCode::JobDurationExceeded),
    };
    let limit = humantime::format_duration(Duration::from_secs(allowed.max(0) as u64));
    FiringInfo {
        check,
        source: FiringSource::DurationLimit,
        expression: check.attr_name().to_string(),
        value: FiringValue::True,
        reason: format!("The job exceeded allowed {kind} duration of {limit}"),
        reason_code: code,
        reason_subcode: 0,
    }
}

fn check_durations(ad: &JobAd, now: i64) -> Option<FiringInfo> {
    let start = ad.eval_integer(attrs::JOB_CURRENT_START_DATE, now);

    if let (Some(allowed), Some(start)) = (ad.eval_integer(attrs::ALLOWED_JOB_DURATION, now), start)
    {
        if allowed >= 0 && now.saturating_sub(start) > allowed {
            return Some(duration_firing(PolicyCheck::AllowedJobDuration, allowed));
        }
    }

    let allowed = ad.eval_integer(attrs::ALLOWED_EXECUTE_DURATION, now)?;
    let executing = ad.eval_integer(attrs::JOB_CURRENT_START_EXECUTING_DATE, now)?;
    // A start-executing date older than the job start belongs to a previous run
    if allowed < 0 || start.is_some_and(|start| executing < start) {
        return None;
    }
    let begin = match ad.eval_integer(attrs::JOB_CURRENT_FINISH_TRANSFER_OUTPUT_DATE, now) {
        Some(finished) if finished > executing => finished,
        _ => executing,
    };
    if now.saturating_sub(begin) > allowed {
        return Some(duration_firing(PolicyCheck::AllowedExecuteDuration, allowed));
    }
    None
}

fn check_exit_attributes(ad: &JobAd) {
    if !ad.contains(attrs::EXIT_BY_SIGNAL) {
        panic!(
            "Exit policy evaluated for a job without {}",
            attrs::EXIT_BY_SIGNAL
        );
    }
    if !ad.contains(attrs::EXIT_CODE) && !ad.contains(attrs::EXIT_SIGNAL) {
        panic!(
            "Exit policy evaluated for a job without {} and {}",
            attrs::EXIT_CODE,
            attrs::EXIT_SIGNAL
        );
    }
}
