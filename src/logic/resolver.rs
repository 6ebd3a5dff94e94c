//! Configuration resolver
//!
//! Turns a module's dispatch record into the ordered variable list written to
//! its `terraform.tfvars`.
//!
//! # Resolution Rules
//!
//! | Source              | Value |
//! |---------------------|-------|
//! | `Setting`           | override, else built-in default |
//! | `SettingOrOutput`   | override, else upstream output, else default (or `DependencyError` when required) |
//! | `Output`            | upstream output, else `DependencyError` |
//! | `Backend`           | resolved backend naming, `null` when nothing is configured |
//!
//! A null-sentinel override (`""` or `null`) yields `null` for plain settings
//! and falls through to the upstream output for derived ones.
//!
//! Pure apart from reading `outputs.json` files: nothing is written and no
//! tool is invoked.

use crate::backend;
use crate::config::{ConfigValue, KeySpec, Overrides, coerce};
use crate::error::{DeployError, Result};
use crate::modules::{BackendField, Module, ModuleSpec, OutputRef, Source};
use crate::outputs::OutputStore;

/// Resolved variables of one module, in variable-file order
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub module: Module,
    pub values: Vec<(String, ConfigValue)>,
}

impl ResolvedConfig {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// String variable, `None` when absent, null or blank
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(ConfigValue::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Rendered variable file contents
    pub fn to_tfvars(&self) -> String {
        crate::tfvars::render(&self.values)
    }
}

/// Resolve every variable of `module`.
///
/// # Errors
///
/// - `Config` when an override cannot be coerced to its declared type
/// - `Dependency` when a required upstream output was never captured
pub fn resolve(module: Module, overrides: &Overrides, outputs: &OutputStore) -> Result<ResolvedConfig> {
    resolve_spec(module.spec(), overrides, outputs)
}

/// Resolve against an explicit dispatch record
pub fn resolve_spec(
    spec: &ModuleSpec,
    overrides: &Overrides,
    outputs: &OutputStore,
) -> Result<ResolvedConfig> {
    let mut values = Vec::with_capacity(spec.vars.len());
    for var in spec.vars {
        let value = match var.source {
            Source::Setting(key) => overrides.setting(&key)?,
            Source::SettingOrOutput {
                setting,
                output,
                required,
            } => setting_or_output(spec.module, &setting, output, required, overrides, outputs)?,
            Source::Output(output) => upstream(output, outputs)
                .ok_or_else(|| DeployError::dependency(output.module, output.key, spec.module, None))?,
            Source::Backend(field) => backend_value(field, overrides)?,
        };
        values.push((var.name.to_string(), value));
    }

    Ok(ResolvedConfig {
        module: spec.module,
        values,
    })
}

fn setting_or_output(
    needed_by: Module,
    setting: &KeySpec,
    output: OutputRef,
    required: bool,
    overrides: &Overrides,
    outputs: &OutputStore,
) -> Result<ConfigValue> {
    if let Some(raw) = overrides.get_explicit(setting.name) {
        return coerce(setting.name, raw, setting.ty);
    }
    if let Some(value) = upstream(output, outputs) {
        return Ok(value);
    }
    if required {
        return Err(DeployError::dependency(
            output.module,
            output.key,
            needed_by,
            Some(setting.name),
        ));
    }
    Ok(setting.default_value())
}

/// Captured upstream value; null or blank counts as missing
fn upstream(output: OutputRef, outputs: &OutputStore) -> Option<ConfigValue> {
    outputs
        .read(output.module, output.key)
        .map(|value| ConfigValue::from_json(&value))
        .filter(|value| !value.is_unset())
}

fn backend_value(field: BackendField, overrides: &Overrides) -> Result<ConfigValue> {
    Ok(match field {
        BackendField::Container => ConfigValue::Str(backend::container_name(overrides)?),
        BackendField::ResourceGroup => backend::resolve_backend_names(overrides)?
            .map(|names| ConfigValue::Str(names.resource_group_name))
            .unwrap_or(ConfigValue::Null),
        BackendField::StorageAccount => backend::resolve_backend_names(overrides)?
            .map(|names| ConfigValue::Str(names.storage_account_name))
            .unwrap_or(ConfigValue::Null),
    })
}
