//! Remote state backend coordinates.
//!
//! Every module except the backend bootstrap keeps its state in one shared
//! Azure storage container under the key `<module>.tfstate`. The account and
//! resource group come from explicit settings, from the bootstrap module's
//! outputs, or are derived from the subscription id.
//!
//! Derived names use only the last six characters of the subscription id, so two
//! subscriptions sharing that suffix derive the same backend names. Set the
//! explicit names when that matters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Overrides, SUBSCRIPTION_ID};
use crate::defaults;
use crate::error::{DeployError, Result};
use crate::modules::Module;
use crate::outputs::OutputStore;

/// Length of the subscription-derived suffix
pub const SUFFIX_LEN: usize = 6;

/// Where a module's remote state lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCoordinates {
    pub resource_group_name: String,
    pub storage_account_name: String,
    pub container_name: String,
    pub key: String,
}

impl BackendCoordinates {
    /// Pairs passed as `-backend-config=<key>=<value>`
    pub fn config_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("resource_group_name", self.resource_group_name.as_str()),
            ("storage_account_name", self.storage_account_name.as_str()),
            ("container_name", self.container_name.as_str()),
            ("key", self.key.as_str()),
        ]
    }
}

/// State key of a module
pub fn state_key(module: Module) -> String {
    format!("{}.tfstate", module.dir_name())
}

/// Backend resource group and storage account names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNames {
    pub resource_group_name: String,
    pub storage_account_name: String,
}

/// Last six characters of the subscription id with separators removed
pub fn subscription_suffix(subscription_id: &str) -> Option<String> {
    let compact: Vec<char> = subscription_id
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    if compact.is_empty() {
        return None;
    }
    let start = compact.len().saturating_sub(SUFFIX_LEN);
    Some(compact[start..].iter().collect())
}

/// Explicitly configured names, when both are set
pub fn explicit_names(overrides: &Overrides) -> Result<Option<BackendNames>> {
    let rg = overrides.setting_str(&defaults::BACKEND_RESOURCE_GROUP_NAME)?;
    let sa = overrides.setting_str(&defaults::BACKEND_STORAGE_ACCOUNT_NAME)?;
    Ok(match (rg, sa) {
        (Some(resource_group_name), Some(storage_account_name)) => Some(BackendNames {
            resource_group_name,
            storage_account_name,
        }),
        _ => None,
    })
}

/// Explicit names win; otherwise derive from the subscription id.
///
/// `None` when neither is available.
pub fn resolve_backend_names(overrides: &Overrides) -> Result<Option<BackendNames>> {
    if let Some(names) = explicit_names(overrides)? {
        return Ok(Some(names));
    }

    let Some(suffix) = overrides.get_explicit(SUBSCRIPTION_ID).and_then(subscription_suffix) else {
        return Ok(None);
    };

    let rg_prefix = overrides
        .setting_str(&defaults::BACKEND_RESOURCE_GROUP_NAME_PREFIX)?
        .unwrap_or_default();
    let sa_prefix = overrides
        .setting_str(&defaults::BACKEND_STORAGE_ACCOUNT_NAME_PREFIX)?
        .unwrap_or_default();

    Ok(Some(BackendNames {
        resource_group_name: format!("{rg_prefix}-{suffix}"),
        storage_account_name: format!("{sa_prefix}{suffix}"),
    }))
}

/// Configured container name; null falls back to the default
pub fn container_name(overrides: &Overrides) -> Result<String> {
    Ok(overrides
        .setting_str(&defaults::BACKEND_CONTAINER_NAME)?
        .unwrap_or_else(|| "tfstate".to_string()))
}

/// Resolves backend coordinates per module
pub struct BackendResolver<'a> {
    overrides: &'a Overrides,
    outputs: &'a OutputStore,
    ci: bool,
}

impl<'a> BackendResolver<'a> {
    pub fn new(overrides: &'a Overrides, outputs: &'a OutputStore) -> Self {
        Self {
            overrides,
            outputs,
            ci: overrides.is_ci(),
        }
    }

    /// Backend for `module`, or `None` for local state.
    ///
    /// The bootstrap module always uses local state. In CI the explicit backend
    /// names are mandatory.
    pub fn resolve(&self, module: Module) -> Result<Option<BackendCoordinates>> {
        if module == Module::Backend {
            return Ok(None);
        }

        let key = state_key(module);

        if self.ci {
            let names = explicit_names(self.overrides)?.ok_or_else(|| {
                DeployError::config(format!(
                    "{} and {} must be set in CI",
                    defaults::BACKEND_RESOURCE_GROUP_NAME.name,
                    defaults::BACKEND_STORAGE_ACCOUNT_NAME.name
                ))
            })?;
            return Ok(Some(BackendCoordinates {
                resource_group_name: names.resource_group_name,
                storage_account_name: names.storage_account_name,
                container_name: container_name(self.overrides)?,
                key,
            }));
        }

        let recorded = self.outputs.load(Module::Backend);
        let from_outputs = recorded.as_ref().and_then(|set| {
            Some(BackendNames {
                resource_group_name: set.get_str("backend_resource_group_name")?.to_string(),
                storage_account_name: set.get_str("backend_storage_account_name")?.to_string(),
            })
        });

        let names = match from_outputs {
            Some(names) => names,
            None => match resolve_backend_names(self.overrides)? {
                Some(names) => names,
                None => {
                    debug!(module = %module, "No backend configured, using local state");
                    return Ok(None);
                }
            },
        };

        let container_name = match recorded
            .as_ref()
            .and_then(|set| set.get_str("backend_container_name"))
        {
            Some(name) => name.to_string(),
            None => container_name(self.overrides)?,
        };

        Ok(Some(BackendCoordinates {
            resource_group_name: names.resource_group_name,
            storage_account_name: names.storage_account_name,
            container_name,
            key,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CI_FLAG;
    use crate::outputs::OutputSet;

    const SUBSCRIPTION: &str = "11112222-3333-4444-5555-666677778888";

    #[test]
    fn test_subscription_suffix() {
        assert_eq!(subscription_suffix(SUBSCRIPTION).as_deref(), Some("778888"));
        assert_eq!(subscription_suffix("ab-c").as_deref(), Some("abc"));
        assert_eq!(subscription_suffix(" - "), None);
    }

    #[test]
    fn test_derived_names_from_subscription() {
        let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);
        let names = resolve_backend_names(&overrides).unwrap().unwrap();
        assert_eq!(names.storage_account_name, "stmlopstfstate778888");
        assert_eq!(names.resource_group_name, "rg-mlops-cancer-tfstate-778888");
    }

    #[test]
    fn test_explicit_names_win() {
        let overrides = Overrides::new()
            .with(SUBSCRIPTION_ID, SUBSCRIPTION)
            .with("BACKEND_RESOURCE_GROUP_NAME", "rg-state")
            .with("BACKEND_STORAGE_ACCOUNT_NAME", "ststate");
        let names = resolve_backend_names(&overrides).unwrap().unwrap();
        assert_eq!(names.resource_group_name, "rg-state");
        assert_eq!(names.storage_account_name, "ststate");
    }

    #[test]
    fn test_no_configuration_means_local_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let overrides = Overrides::new();
        let resolver = BackendResolver::new(&overrides, &store);
        assert_eq!(resolver.resolve(Module::Networking).unwrap(), None);
    }

    #[test]
    fn test_ci_requires_explicit_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let overrides = Overrides::new()
            .with(CI_FLAG, "true")
            .with(SUBSCRIPTION_ID, SUBSCRIPTION);
        let resolver = BackendResolver::new(&overrides, &store);
        let err = resolver.resolve(Module::Networking).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[test]
    fn test_bootstrap_outputs_are_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let mut set = OutputSet::new();
        set.insert("backend_resource_group_name", "rg-from-outputs");
        set.insert("backend_storage_account_name", "stfromoutputs");
        set.insert("backend_container_name", "state");
        store.write(Module::Backend, &set).unwrap();

        let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);
        let resolver = BackendResolver::new(&overrides, &store);
        let coordinates = resolver.resolve(Module::KeyVault).unwrap().unwrap();
        assert_eq!(coordinates.resource_group_name, "rg-from-outputs");
        assert_eq!(coordinates.storage_account_name, "stfromoutputs");
        assert_eq!(coordinates.container_name, "state");
        assert_eq!(coordinates.key, "04_key_vault.tfstate");
    }

    #[test]
    fn test_backend_module_uses_local_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);
        let resolver = BackendResolver::new(&overrides, &store);
        assert_eq!(resolver.resolve(Module::Backend).unwrap(), None);
    }
}
