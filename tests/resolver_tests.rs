//! Resolver Tests
//!
//! Variable resolution against real output files on disk.

mod common;

use common::Project;
use mlops_infra::config::{ConfigValue, Overrides};
use mlops_infra::modules::Module;
use mlops_infra::{DeployError, resolve};

// =============================================================================
// Upstream outputs
// =============================================================================

#[test]
fn test_cold_start_names_the_missing_module() {
    let project = Project::new();
    let err = resolve(Module::StorageAccount, &Overrides::new(), &project.store()).unwrap_err();

    match &err {
        DeployError::Dependency {
            module,
            output,
            needed_by,
            hint,
        } => {
            assert_eq!(*module, Module::ResourceGroup);
            assert_eq!(output, "resource_group_name");
            assert_eq!(*needed_by, Module::StorageAccount);
            assert_eq!(*hint, Some("RESOURCE_GROUP_NAME"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("01_resource_group"));
    assert!(message.contains("RESOURCE_GROUP_NAME"));
}

#[test]
fn test_chained_outputs_flow_downstream() {
    let project = Project::new();
    project.seed_outputs(
        Module::ResourceGroup,
        &[("resource_group_name", "rg-x"), ("resource_group_location", "eastus2")],
    );

    let resolved = resolve(Module::Networking, &Overrides::new(), &project.store()).unwrap();
    assert_eq!(resolved.get_str("resource_group_name"), Some("rg-x"));
    assert_eq!(resolved.get_str("location"), Some("eastus2"));
    assert_eq!(resolved.get("vnet_name"), Some(&ConfigValue::Null));
    assert_eq!(
        resolved.get("address_space"),
        Some(&ConfigValue::List(vec!["10.40.0.0/16".into()]))
    );
}

#[test]
fn test_location_falls_back_to_default() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);

    let resolved = resolve(Module::KeyVault, &Overrides::new(), &project.store()).unwrap();
    assert_eq!(resolved.get_str("location"), Some("eastus2"));
}

#[test]
fn test_blank_upstream_value_counts_as_missing() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "  ")]);

    let err = resolve(Module::Observability, &Overrides::new(), &project.store()).unwrap_err();
    assert!(err.is_dependency());
}

#[test]
fn test_output_only_variable_has_no_hint() {
    let project = Project::new();
    project.seed_outputs(Module::ContainerRegistry, &[("acr_id", "/acr")]);

    let err = resolve(Module::AcrRbac, &Overrides::new(), &project.store()).unwrap_err();
    match err {
        DeployError::Dependency { module, hint, .. } => {
            assert_eq!(module, Module::AmlCompute);
            assert_eq!(hint, None);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Defaults and overrides
// =============================================================================

#[test]
fn test_defaults_only_module() {
    let project = Project::new();
    let resolved = resolve(Module::ResourceGroup, &Overrides::new(), &project.store()).unwrap();

    assert_eq!(
        resolved.to_tfvars(),
        "resource_group_name = null\nresource_group_name_prefix = \"rg-mlops-cancer\"\nlocation = \"eastus2\"\n"
    );
}

#[test]
fn test_override_beats_upstream_output() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let overrides = Overrides::new().with("RESOURCE_GROUP_NAME", "rg-override");

    let resolved = resolve(Module::StorageAccount, &overrides, &project.store()).unwrap();
    assert_eq!(resolved.get_str("resource_group_name"), Some("rg-override"));
}

#[test]
fn test_null_override_falls_through_to_output() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let overrides = Overrides::new()
        .with("RESOURCE_GROUP_NAME", "null")
        .with("STORAGE_ACCOUNT_NAME", "");

    let resolved = resolve(Module::StorageAccount, &overrides, &project.store()).unwrap();
    assert_eq!(resolved.get_str("resource_group_name"), Some("rg-x"));
    assert_eq!(resolved.get("storage_account_name"), Some(&ConfigValue::Null));
}

#[test]
fn test_list_override_drops_empty_tokens() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let overrides = Overrides::new().with("CONTAINER_NAMES", "a, b,,c");

    let resolved = resolve(Module::StorageAccount, &overrides, &project.store()).unwrap();
    assert_eq!(
        resolved.get("container_names"),
        Some(&ConfigValue::List(vec!["a".into(), "b".into(), "c".into()]))
    );
    assert!(resolved.to_tfvars().contains("container_names = [\"a\", \"b\", \"c\"]\n"));
}

#[test]
fn test_typed_overrides() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let overrides = Overrides::new()
        .with("KEY_VAULT_ENABLE_RBAC", "No")
        .with("KEY_VAULT_SOFT_DELETE_RETENTION_DAYS", " 90 ");

    let resolved = resolve(Module::KeyVault, &overrides, &project.store()).unwrap();
    assert_eq!(resolved.get("enable_rbac_authorization"), Some(&ConfigValue::Bool(false)));
    assert_eq!(resolved.get("soft_delete_retention_days"), Some(&ConfigValue::Int(90)));
}

#[test]
fn test_bad_override_is_a_config_error() {
    let project = Project::new();
    let overrides = Overrides::new().with("SUBNET_PREFIXES", "{\"aml\": [\"10.0.0.0/24\"]}");
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);

    let err = resolve(Module::Networking, &overrides, &project.store()).unwrap_err();
    assert!(matches!(err, DeployError::Config(_)));
}

// =============================================================================
// Backend bootstrap variables
// =============================================================================

#[test]
fn test_backend_names_derive_from_subscription() {
    let project = Project::new();
    let overrides = Overrides::new().with("AZURE_SUBSCRIPTION_ID", "11112222-3333-4444-5555-666677778888");

    let resolved = resolve(Module::Backend, &overrides, &project.store()).unwrap();
    assert_eq!(
        resolved.get_str("backend_resource_group_name"),
        Some("rg-mlops-cancer-tfstate-778888")
    );
    assert_eq!(resolved.get_str("storage_account_name"), Some("stmlopstfstate778888"));
    assert_eq!(resolved.get_str("container_name"), Some("tfstate"));
}

#[test]
fn test_backend_names_null_without_subscription() {
    let project = Project::new();
    let resolved = resolve(Module::Backend, &Overrides::new(), &project.store()).unwrap();
    assert_eq!(resolved.get("backend_resource_group_name"), Some(&ConfigValue::Null));
    assert_eq!(resolved.get("storage_account_name"), Some(&ConfigValue::Null));
}
