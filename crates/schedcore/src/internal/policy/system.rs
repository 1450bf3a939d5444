use crate::internal::classad::ad::JobAd;
use crate::internal::classad::expr::{EvalContext, Expr};
use crate::internal::classad::value::Value;
use crate::internal::config::ParamSource;
use crate::internal::policy::firing::PolicyCheck;

/// One administrator configured expression with its optional companions.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemPolicyExpr {
    /// Knob the expression was read from, e.g. `SYSTEM_PERIODIC_HOLD_MEMORY`.
    pub knob: String,
    pub expr: Expr,
    pub subcode: Option<Expr>,
    pub reason: Option<Expr>,
}

impl SystemPolicyExpr {
    pub fn new(knob: &str, expr: Expr) -> Self {
        SystemPolicyExpr {
            knob: knob.to_string(),
            expr,
            subcode: None,
            reason: None,
        }
    }

    pub(crate) fn fires(&self, ctx: &EvalContext) -> bool {
        self.expr.evaluate(ctx).as_bool() == Some(true)
    }

    pub(crate) fn eval_reason(&self, ctx: &EvalContext) -> Option<String> {
        match self.reason.as_ref()?.evaluate(ctx) {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub(crate) fn eval_subcode(&self, ctx: &EvalContext) -> i64 {
        self.subcode
            .as_ref()
            .and_then(|expr| expr.evaluate(ctx).as_integer())
            .unwrap_or(0)
    }
}

/// System-wide periodic policy, shared by all jobs.
///
/// For each kind, the single `SYSTEM_PERIODIC_<KIND>` expression comes first,
/// followed by the tagged expressions listed in `SYSTEM_PERIODIC_<KIND>_NAMES`
/// in listed order. The first expression that evaluates to true fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPolicy {
    hold: Vec<SystemPolicyExpr>,
    release: Vec<SystemPolicyExpr>,
    remove: Vec<SystemPolicyExpr>,
    vacate: Vec<SystemPolicyExpr>,
}

impl SystemPolicy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads all system policy knobs. Expressions that fail to parse are
    /// logged and skipped.
    pub fn load(params: &dyn ParamSource) -> Self {
        let mut policy = SystemPolicy::empty();
        for check in PolicyCheck::PERIODIC_WITH_SYSTEM_FALLBACK {
            let Some(knob) = check.system_knob() else {
                continue;
            };
            let exprs = load_kind(params, knob);
            if !exprs.is_empty() {
                log::debug!("Loaded {} expression(s) for {knob}", exprs.len());
            }
            if let Some(slot) = policy.slot_mut(check) {
                *slot = exprs;
            }
        }
        policy
    }

    pub fn expressions(&self, check: PolicyCheck) -> &[SystemPolicyExpr] {
        match check {
            PolicyCheck::PeriodicHold => &self.hold,
            PolicyCheck::PeriodicRelease => &self.release,
            PolicyCheck::PeriodicRemove => &self.remove,
            PolicyCheck::PeriodicVacate => &self.vacate,
            _ => &[],
        }
    }

    /// Fails for checks that have no system-wide variant.
    pub fn add(&mut self, check: PolicyCheck, expr: SystemPolicyExpr) -> crate::Result<()> {
        let slot = self.slot_mut(check).ok_or_else(|| {
            crate::Error::ConfigError(format!("{check} has no system-wide variant"))
        })?;
        slot.push(expr);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.hold.is_empty()
            && self.release.is_empty()
            && self.remove.is_empty()
            && self.vacate.is_empty()
    }

    /// First system expression for `check` that is true for the ad.
    pub(crate) fn find_firing(
        &self,
        check: PolicyCheck,
        ad: &JobAd,
        now: i64,
    ) -> Option<&SystemPolicyExpr> {
        let ctx = EvalContext::new(ad, now);
        self.expressions(check).iter().find(|expr| expr.fires(&ctx))
    }

    fn slot_mut(&mut self, check: PolicyCheck) -> Option<&mut Vec<SystemPolicyExpr>> {
        match check {
            PolicyCheck::PeriodicHold => Some(&mut self.hold),
            PolicyCheck::PeriodicRelease => Some(&mut self.release),
            PolicyCheck::PeriodicRemove => Some(&mut self.remove),
            PolicyCheck::PeriodicVacate => Some(&mut self.vacate),
            _ => None,
        }
    }
}

fn load_kind(params: &dyn ParamSource, knob: &str) -> Vec<SystemPolicyExpr> {
    let mut exprs = Vec::new();
    if let Some(expr) = load_expr(params, knob) {
        exprs.push(expr);
    }
    if let Some(names) = params.param(&format!("{knob}_NAMES")) {
        for tag in names
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tag| !tag.is_empty())
        {
            let tagged = format!("{knob}_{}", tag.to_ascii_uppercase());
            match load_expr(params, &tagged) {
                Some(expr) => exprs.push(expr),
                None => log::debug!("{knob}_NAMES lists {tag}, but {tagged} is not usable"),
            }
        }
    }
    exprs
}

fn load_expr(params: &dyn ParamSource, knob: &str) -> Option<SystemPolicyExpr> {
    let expr = match params.param_expr(knob)? {
        Ok(expr) => expr,
        Err(error) => {
            log::warn!("Ignoring {knob}: {error}");
            return None;
        }
    };
    let mut policy = SystemPolicyExpr::new(knob, expr);
    policy.subcode = load_companion(params, &format!("{knob}_SUBCODE"));
    policy.reason = load_companion(params, &format!("{knob}_REASON"));
    Some(policy)
}

fn load_companion(params: &dyn ParamSource, knob: &str) -> Option<Expr> {
    match params.param_expr(knob)? {
        Ok(expr) => Some(expr),
        Err(error) => {
            log::warn!("Ignoring {knob}: {error}");
            None
        }
    }
}
