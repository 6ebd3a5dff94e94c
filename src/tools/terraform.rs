//! Type-safe arguments for Terraform verbs.
//!
//! - `InitArgs` for `terraform init`
//! - `ApplyArgs` / `DestroyArgs` for `terraform apply|destroy -auto-approve`
//! - `ImportArgs` for `terraform import`
//! - `OutputArgs` for `terraform output -json`
//! - `StateListArgs` for `terraform state list`
//!
//! Mutating verbs always carry `-input=false`: tools run in their own process
//! group, so a prompt could never be answered and would stop the child.

use std::path::Path;

use crate::backend::BackendCoordinates;
use crate::modules::LOCAL_STATE_FILE;
use crate::tool_runner::Tool;
use crate::tool_traits::ToolArgs;

/// Fail instead of prompting for missing input
pub const NO_INPUT: &str = "-input=false";

// ============================================================================
// Init
// ============================================================================

/// How init treats state that already exists under a different backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMigration {
    /// Copy local `terraform.tfstate` into the remote backend without asking
    MigrateState,
    /// Point at the remote backend, ignoring previous backend settings
    Reconfigure,
}

/// Arguments for `terraform init`.
#[derive(Debug, Clone, PartialEq)]
pub struct InitArgs {
    pub upgrade: bool,
    pub backend: Option<BackendCoordinates>,
    pub migration: BackendMigration,
}

impl InitArgs {
    /// Init for a module directory.
    ///
    /// With a remote backend, local state left in `module_dir` is migrated;
    /// otherwise the backend is reconfigured.
    pub fn for_module(module_dir: &Path, backend: Option<BackendCoordinates>) -> Self {
        let migration = if module_dir.join(LOCAL_STATE_FILE).is_file() {
            BackendMigration::MigrateState
        } else {
            BackendMigration::Reconfigure
        };
        Self {
            upgrade: true,
            backend,
            migration,
        }
    }
}

impl ToolArgs for InitArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "init"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["init".to_string(), NO_INPUT.to_string()];
        if self.upgrade {
            args.push("-upgrade".to_string());
        }
        if let Some(ref backend) = self.backend {
            match self.migration {
                BackendMigration::MigrateState => {
                    args.push("-migrate-state".to_string());
                    args.push("-force-copy".to_string());
                }
                BackendMigration::Reconfigure => args.push("-reconfigure".to_string()),
            }
            for (key, value) in backend.config_pairs() {
                args.push(format!("-backend-config={key}={value}"));
            }
        }
        args
    }
}

// ============================================================================
// Apply / Destroy
// ============================================================================

/// Arguments for `terraform apply -auto-approve`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyArgs;

impl ToolArgs for ApplyArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "apply"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["apply".to_string(), NO_INPUT.to_string(), "-auto-approve".to_string()]
    }
}

/// Arguments for `terraform destroy -auto-approve`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyArgs;

impl ToolArgs for DestroyArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "destroy"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["destroy".to_string(), NO_INPUT.to_string(), "-auto-approve".to_string()]
    }
}

// ============================================================================
// Import
// ============================================================================

/// Arguments for `terraform import <address> <id>`.
#[derive(Debug, Clone)]
pub struct ImportArgs {
    /// Resource address inside the module
    pub address: String,
    /// Cloud resource id to adopt
    pub id: String,
}

impl ToolArgs for ImportArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "import"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "import".to_string(),
            NO_INPUT.to_string(),
            self.address.clone(),
            self.id.clone(),
        ]
    }
}

// ============================================================================
// Read-only verbs
// ============================================================================

/// Arguments for `terraform output -json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputArgs;

impl ToolArgs for OutputArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "output"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["output".to_string(), "-json".to_string()]
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// Arguments for `terraform state list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateListArgs;

impl ToolArgs for StateListArgs {
    fn tool(&self) -> Tool {
        Tool::Terraform
    }

    fn verb(&self) -> &'static str {
        "state list"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["state".to_string(), "list".to_string()]
    }

    fn captures_output(&self) -> bool {
        true
    }

    fn is_mutating(&self) -> bool {
        false
    }
}
