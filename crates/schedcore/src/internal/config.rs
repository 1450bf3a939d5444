use std::path::Path;

use crate::internal::classad::expr::Expr;
use crate::internal::classad::parser::parse_expr;
use crate::internal::common::Map;

/// Environment variables with this prefix override configuration knobs,
/// e.g. `_CONDOR_SYSTEM_PERIODIC_HOLD`.
pub const CONDOR_ENV_PREFIX: &str = "_CONDOR_";

/// Source of configuration knobs. Knob names are case-insensitive.
pub trait ParamSource {
    fn param(&self, name: &str) -> Option<String>;

    fn param_integer(&self, name: &str, default: i64) -> i64 {
        match self.param(name) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                log::warn!("Invalid integer value '{value}' of {name}, using default {default}");
                default
            }),
            None => default,
        }
    }

    fn param_boolean(&self, name: &str, default: bool) -> bool {
        match self.param(name) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => true,
                "false" | "f" | "0" | "no" => false,
                _ => {
                    log::warn!("Invalid boolean value '{value}' of {name}, using default {default}");
                    default
                }
            },
            None => default,
        }
    }

    /// Knob parsed as an expression; `None` when the knob is not set.
    fn param_expr(&self, name: &str) -> Option<crate::Result<Expr>> {
        self.param(name).map(|text| parse_expr(&text))
    }
}

/// In-memory knob table, usually loaded from a TOML file.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    values: Map<String, String>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a flat TOML table. Strings are taken verbatim (so they may hold
    /// expressions), other scalars are converted to their textual form.
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        let mut params = ParamTable::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(v) => v.to_string(),
                toml::Value::Float(v) => v.to_string(),
                toml::Value::Boolean(v) => v.to_string(),
                other => {
                    return Err(crate::Error::ConfigError(format!(
                        "Knob {key} has unsupported value type {}",
                        other.type_str()
                    )));
                }
            };
            params.set(&key, value);
        }
        Ok(params)
    }

    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::ConfigError(format!(
                "Cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        let params = Self::from_toml_str(&text)?;
        log::debug!(
            "Loaded {} knob(s) from {}",
            params.values.len(),
            path.display()
        );
        Ok(params)
    }

    /// Applies `_CONDOR_<KNOB>` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    pub fn with_overrides(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        for (key, value) in vars {
            if let Some(knob) = key.strip_prefix(CONDOR_ENV_PREFIX) {
                if !knob.is_empty() {
                    log::debug!("Knob {knob} overridden from environment");
                    self.set(knob, value);
                }
            }
        }
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_ascii_uppercase(), value.into());
    }

    pub fn unset(&mut self, name: &str) {
        self.values.remove(&name.to_ascii_uppercase());
    }
}

impl ParamSource for ParamTable {
    fn param(&self, name: &str) -> Option<String> {
        self.values.get(&name.to_ascii_uppercase()).cloned()
    }
}
