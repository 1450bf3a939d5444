use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::internal::classad::attrs;
use crate::internal::classad::expr::{EvalContext, Expr};
use crate::internal::classad::parser::{parse_assignment, parse_expr};
use crate::internal::classad::value::Value;
use crate::internal::common::Map;
use crate::internal::common::ids::{AutoclusterId, JobId};

/// Attribute set describing one job.
///
/// Names are case-insensitive; the spelling used at insertion time is kept
/// for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAd {
    attributes: Map<String, (String, Expr)>,
}

impl JobAd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `Name = expr` entries separated by newlines or `;`.
    /// The whole ad may be wrapped in `[ ... ]`; lines starting with `#` are ignored.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut text = text.trim();
        if let Some(inner) = text.strip_prefix('[') {
            text = inner.strip_suffix(']').ok_or_else(|| {
                crate::Error::ParseError("Job ad starts with '[' but has no closing ']'".into())
            })?;
        }
        let mut ad = JobAd::new();
        for statement in split_statements(text) {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with('#') {
                continue;
            }
            let (name, expr) = parse_assignment(statement)?;
            ad.insert_expr(&name, expr);
        }
        Ok(ad)
    }

    /// Parses several ads separated by blank lines.
    pub fn parse_many(text: &str) -> crate::Result<Vec<Self>> {
        let mut ads = Vec::new();
        let mut current = String::new();
        for line in text.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !current.trim().is_empty() {
                    ads.push(JobAd::parse(&current)?);
                }
                current.clear();
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        Ok(ads)
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.insert_expr(name, Expr::Literal(value.into()));
    }

    pub fn insert_expr(&mut self, name: &str, expr: Expr) {
        self.attributes
            .insert(name.to_ascii_lowercase(), (name.to_string(), expr));
    }

    /// Parses `text` as an expression and stores it under `name`.
    pub fn assign_expr(&mut self, name: &str, text: &str) -> crate::Result<()> {
        let expr = parse_expr(text)?;
        self.insert_expr(name, expr);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Expr> {
        self.attributes
            .remove(&name.to_ascii_lowercase())
            .map(|(_, expr)| expr)
    }

    pub fn lookup(&self, name: &str) -> Option<&Expr> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(|(_, expr)| expr)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes sorted by (case-insensitive) name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        let mut entries: Vec<_> = self.attributes.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(_, (name, expr))| (name.as_str(), expr))
    }

    /// Evaluates attribute `name`; a missing attribute is `Undefined`.
    pub fn eval_attr(&self, name: &str, now: i64) -> Value {
        match self.lookup(name) {
            Some(expr) => expr.evaluate(&EvalContext::new(self, now)),
            None => Value::Undefined,
        }
    }

    pub fn eval_integer(&self, name: &str, now: i64) -> Option<i64> {
        self.eval_attr(name, now).as_integer()
    }

    pub fn eval_bool(&self, name: &str, now: i64) -> Option<bool> {
        self.eval_attr(name, now).as_bool()
    }

    pub fn eval_string(&self, name: &str, now: i64) -> Option<String> {
        match self.eval_attr(name, now) {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// `ClusterId.ProcId` of the job, if both attributes are integers.
    pub fn job_id(&self) -> Option<JobId> {
        let cluster = self.eval_integer(attrs::CLUSTER_ID, 0)?;
        let proc = self.eval_integer(attrs::PROC_ID, 0)?;
        Some(JobId::new(
            i32::try_from(cluster).ok()?.into(),
            i32::try_from(proc).ok()?.into(),
        ))
    }

    pub fn autocluster(&self) -> Option<AutoclusterId> {
        let id = self.eval_integer(attrs::AUTO_CLUSTER_ID, 0)?;
        i32::try_from(id).ok().map(AutoclusterId::new)
    }
}

/// Splits on newlines and `;` that are not inside a string literal.
fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' | '\n' if !in_string => {
                statements.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&text[start..]);
    statements
}

impl Display for JobAd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (name, expr) in self.iter() {
            writeln!(f, "{name} = {expr}")?;
        }
        Ok(())
    }
}
