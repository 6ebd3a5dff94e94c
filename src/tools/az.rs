//! Type-safe arguments for the az control-plane calls the orchestrator makes.
//!
//! Lookups (`show`, `list`, key retrieval) are read-only and capture stdout.
//! Everything else mutates cloud resources and is skipped in dry-run mode.

use std::path::PathBuf;

use crate::tool_runner::Tool;
use crate::tool_traits::{REDACTED, ToolArgs};

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Existence checks
// ============================================================================

/// Arguments for `az group show --name <name>`.
#[derive(Debug, Clone)]
pub struct GroupShowArgs {
    pub name: String,
}

impl ToolArgs for GroupShowArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "group show"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&["group", "show", "--name", &self.name])
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// Arguments for `az storage account show`.
#[derive(Debug, Clone)]
pub struct StorageAccountShowArgs {
    pub resource_group: String,
    pub name: String,
}

impl ToolArgs for StorageAccountShowArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "storage account show"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&[
            "storage",
            "account",
            "show",
            "--resource-group",
            &self.resource_group,
            "--name",
            &self.name,
        ])
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

// ============================================================================
// Backend container
// ============================================================================

/// Arguments for reading the first storage account key as plain text.
#[derive(Debug, Clone)]
pub struct StorageAccountKeyArgs {
    pub resource_group: String,
    pub account_name: String,
}

impl ToolArgs for StorageAccountKeyArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "storage account keys list"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&[
            "storage",
            "account",
            "keys",
            "list",
            "--resource-group",
            &self.resource_group,
            "--account-name",
            &self.account_name,
            "--query",
            "[0].value",
            "-o",
            "tsv",
        ])
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// Arguments for `az storage container create`.
#[derive(Debug, Clone)]
pub struct ContainerCreateArgs {
    pub name: String,
    pub account_name: String,
    pub account_key: String,
}

impl ContainerCreateArgs {
    fn args(&self, key: &str) -> Vec<String> {
        strings(&[
            "storage",
            "container",
            "create",
            "--name",
            &self.name,
            "--account-name",
            &self.account_name,
            "--account-key",
            key,
        ])
    }
}

impl ToolArgs for ContainerCreateArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "storage container create"
    }

    fn to_cli_args(&self) -> Vec<String> {
        self.args(&self.account_key)
    }

    fn display_args(&self) -> Vec<String> {
        self.args(REDACTED)
    }

    /// Output is a small JSON status; keep it out of the terminal.
    fn captures_output(&self) -> bool {
        true
    }
}

// ============================================================================
// Role assignments
// ============================================================================

/// Arguments for looking up the id of an existing role assignment.
#[derive(Debug, Clone)]
pub struct RoleAssignmentListArgs {
    pub assignee: String,
    pub scope: String,
}

impl ToolArgs for RoleAssignmentListArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "role assignment list"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&[
            "role",
            "assignment",
            "list",
            "--assignee",
            &self.assignee,
            "--scope",
            &self.scope,
            "--query",
            "[0].id",
            "-o",
            "tsv",
        ])
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

// ============================================================================
// Post-deploy actions
// ============================================================================

/// Arguments for `az rest --method post --url <url>`.
#[derive(Debug, Clone)]
pub struct RestPostArgs {
    pub url: String,
}

impl ToolArgs for RestPostArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "rest"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&["rest", "--method", "post", "--url", &self.url])
    }
}

/// Arguments for `az datafactory pipeline create-run`.
#[derive(Debug, Clone)]
pub struct PipelineRunArgs {
    pub resource_group: String,
    pub factory_name: String,
    pub pipeline_name: String,
}

impl ToolArgs for PipelineRunArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "datafactory pipeline create-run"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&[
            "datafactory",
            "pipeline",
            "create-run",
            "--resource-group",
            &self.resource_group,
            "--factory-name",
            &self.factory_name,
            "--name",
            &self.pipeline_name,
        ])
    }
}

/// Arguments for `az acr build`, run from the project root.
#[derive(Debug, Clone)]
pub struct AcrBuildArgs {
    pub registry: String,
    /// `repository:tag`
    pub image: String,
    /// Dockerfile path relative to the build context
    pub dockerfile: PathBuf,
}

impl ToolArgs for AcrBuildArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "acr build"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "acr".to_string(),
            "build".to_string(),
            "--registry".to_string(),
            self.registry.clone(),
            "--image".to_string(),
            self.image.clone(),
            "-f".to_string(),
            self.dockerfile.display().to_string(),
            ".".to_string(),
        ]
    }
}

/// Arguments for `az acr login --name <name>`, which hands docker a registry token.
#[derive(Debug, Clone)]
pub struct AcrLoginArgs {
    pub name: String,
}

impl ToolArgs for AcrLoginArgs {
    fn tool(&self) -> Tool {
        Tool::Az
    }

    fn verb(&self) -> &'static str {
        "acr login"
    }

    fn to_cli_args(&self) -> Vec<String> {
        strings(&["acr", "login", "--name", &self.name])
    }
}
