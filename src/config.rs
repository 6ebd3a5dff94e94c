//! Typed configuration values and the layered override source.
//!
//! Every module variable is resolved to a [`ConfigValue`]. Raw strings only enter
//! through [`Overrides`] (process environment plus the project `.env` file) and
//! are coerced against the declared [`ValueType`] of their [`KeySpec`].

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use strum::Display;
use tracing::debug;

use crate::config_file::load_env_file;
use crate::error::{DeployError, Result};

/// Environment variable that switches the orchestrator into CI behaviour.
pub const CI_FLAG: &str = "GITHUB_ACTIONS";
/// Subscription id used to derive backend names.
pub const SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";

// ============================================================================
// Value types
// ============================================================================

/// Semantic type of a configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    String,
    Bool,
    Int,
    List,
    Map,
}

/// A resolved configuration value, ready to be rendered into a variable file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
    /// Ordered map; rendering keeps insertion order
    Map(Vec<(String, ConfigValue)>),
}

impl ConfigValue {
    /// Convert a captured Terraform output value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Null or an empty string. Upstream outputs in this state count as missing.
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

// ============================================================================
// Key catalogue entries
// ============================================================================

/// Built-in default of a configuration key, expressible in a `const`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
    List(&'static [&'static str]),
    Map(&'static [(&'static str, &'static str)]),
}

impl DefaultValue {
    pub fn to_value(self) -> ConfigValue {
        match self {
            Self::Null => ConfigValue::Null,
            Self::Bool(b) => ConfigValue::Bool(b),
            Self::Int(i) => ConfigValue::Int(i),
            Self::Str(s) => ConfigValue::Str(s.to_string()),
            Self::List(items) => {
                ConfigValue::List(items.iter().map(|s| ConfigValue::from(*s)).collect())
            }
            Self::Map(entries) => ConfigValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), ConfigValue::from(*v)))
                    .collect(),
            ),
        }
    }
}

/// A recognized configuration key: its override name, type and default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpec {
    pub name: &'static str,
    pub ty: ValueType,
    pub default: DefaultValue,
}

impl KeySpec {
    pub const fn string(name: &'static str, default: Option<&'static str>) -> Self {
        let default = match default {
            Some(s) => DefaultValue::Str(s),
            None => DefaultValue::Null,
        };
        Self {
            name,
            ty: ValueType::String,
            default,
        }
    }

    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            ty: ValueType::Bool,
            default: DefaultValue::Bool(default),
        }
    }

    pub const fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            ty: ValueType::Int,
            default: DefaultValue::Int(default),
        }
    }

    pub const fn list(name: &'static str, default: &'static [&'static str]) -> Self {
        Self {
            name,
            ty: ValueType::List,
            default: DefaultValue::List(default),
        }
    }

    pub const fn map(name: &'static str, default: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            name,
            ty: ValueType::Map,
            default: DefaultValue::Map(default),
        }
    }

    pub fn default_value(&self) -> ConfigValue {
        self.default.to_value()
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Blank and `null` (any case) mean "explicitly no value".
pub fn is_null_sentinel(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Parse the accepted boolean spellings, case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Coerce a raw override string to the declared type.
///
/// The null sentinel always yields [`ConfigValue::Null`], whatever the type.
pub fn coerce(name: &str, raw: &str, ty: ValueType) -> Result<ConfigValue> {
    if is_null_sentinel(raw) {
        return Ok(ConfigValue::Null);
    }

    match ty {
        ValueType::String => Ok(ConfigValue::Str(raw.to_string())),
        ValueType::Bool => parse_bool(raw)
            .map(ConfigValue::Bool)
            .ok_or_else(|| DeployError::config(format!("Invalid boolean for {name}: '{raw}'"))),
        ValueType::Int => raw
            .trim()
            .parse::<i64>()
            .map(ConfigValue::Int)
            .map_err(|_| DeployError::config(format!("Invalid integer for {name}: '{raw}'"))),
        ValueType::List => Ok(ConfigValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(ConfigValue::from)
                .collect(),
        )),
        ValueType::Map => coerce_map(name, raw),
    }
}

fn coerce_map(name: &str, raw: &str) -> Result<ConfigValue> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| DeployError::config(format!("Invalid JSON for {name}: {e}")))?;

    let Value::Object(object) = parsed else {
        return Err(DeployError::config(format!("Expected JSON object for {name}")));
    };

    let mut entries = Vec::with_capacity(object.len());
    for (key, value) in &object {
        let scalar = match value {
            Value::String(s) => ConfigValue::Str(s.clone()),
            Value::Bool(_) | Value::Number(_) | Value::Null => ConfigValue::from_json(value),
            Value::Array(_) | Value::Object(_) => {
                return Err(DeployError::config(format!(
                    "Expected flat JSON object for {name}, but '{key}' is nested"
                )));
            }
        };
        entries.push((key.clone(), scalar));
    }
    Ok(ConfigValue::Map(entries))
}

// ============================================================================
// Override source
// ============================================================================

/// Explicit overrides, threaded through every resolution call.
///
/// Built once at startup from the process environment and the project `.env`
/// file. Process environment wins over file entries. Nothing here is written back
/// into the process environment; child processes receive the file entries through
/// [`Overrides::child_env`].
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: HashMap<String, String>,
    file_entries: Vec<(String, String)>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment
    pub fn from_process_env() -> Self {
        Self {
            values: std::env::vars().collect(),
            file_entries: Vec::new(),
        }
    }

    /// Layer entries from an env file underneath the current values.
    ///
    /// A missing file is not an error.
    pub fn with_env_file(mut self, path: &Path) -> Result<Self> {
        let entries = load_env_file(path)?;
        debug!(path = %path.display(), count = entries.len(), "Loaded env file");
        for (key, value) in entries {
            if !self.values.contains_key(&key) {
                self.values.insert(key.clone(), value.clone());
                self.file_entries.push((key, value));
            }
        }
        Ok(self)
    }

    /// Builder used by callers that assemble overrides by hand
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Present, non-blank and not the null sentinel
    pub fn get_explicit(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|raw| !is_null_sentinel(raw))
    }

    /// `None` when the key is absent; `Some(Null)` for the sentinel.
    pub fn lookup(&self, spec: &KeySpec) -> Result<Option<ConfigValue>> {
        self.get(spec.name)
            .map(|raw| coerce(spec.name, raw, spec.ty))
            .transpose()
    }

    /// Override if present, otherwise the built-in default.
    pub fn setting(&self, spec: &KeySpec) -> Result<ConfigValue> {
        Ok(self.lookup(spec)?.unwrap_or_else(|| spec.default_value()))
    }

    /// String setting, with null treated as absent
    pub fn setting_str(&self, spec: &KeySpec) -> Result<Option<String>> {
        Ok(match self.setting(spec)? {
            ConfigValue::Str(s) if !s.trim().is_empty() => Some(s),
            ConfigValue::Null | ConfigValue::Str(_) => None,
            other => Some(crate::tfvars::render_value(&other)),
        })
    }

    /// CI mode needs the literal `true`; other boolean spellings do not count.
    pub fn is_ci(&self) -> bool {
        self.get(CI_FLAG).is_some_and(|v| v.trim() == "true")
    }

    /// Entries that came from the env file, for child process environments
    pub fn child_env(&self) -> &[(String, String)] {
        &self.file_entries
    }
}
