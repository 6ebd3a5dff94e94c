//! Backend bootstrap
//!
//! Outside CI the `00_backend` module is applied like any other module, with
//! local state. In CI the backend is expected to exist already: when the
//! configured resource group and storage account are both found, the state
//! container is ensured and the bootstrap outputs are written from
//! configuration instead of applying.
//!
//! # Design
//!
//! - Existence checks go through [`check_exists`]; a failed query counts as absent
//! - The storage key never reaches the log (see `ContainerCreateArgs::display_args`)
//! - Dry runs perform the checks but neither create the container nor write outputs

use std::fmt;

use tracing::{info, warn};

use crate::backend::{self, BackendNames};
use crate::config::Overrides;
use crate::error::{DeployError, Result};
use crate::modules::Module;
use crate::outputs::{OutputSet, OutputStore};
use crate::reconcile::{Lookup, check_exists};
use crate::tool_runner::{Invocation, ToolRunner, run_checked};
use crate::tools::az::{ContainerCreateArgs, GroupShowArgs, StorageAccountKeyArgs, StorageAccountShowArgs};

// ============================================================================
// Bootstrap decision
// ============================================================================

/// How the backend module is handled in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendBootstrap {
    /// Apply `00_backend` with Terraform
    Apply,
    /// Pre-existing backend adopted; outputs written from configuration
    Adopted {
        names: BackendNames,
        container: String,
    },
}

impl fmt::Display for BackendBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply with Terraform"),
            Self::Adopted { names, container } => write!(
                f,
                "adopted {}/{}/{}",
                names.resource_group_name, names.storage_account_name, container
            ),
        }
    }
}

/// Decide whether `00_backend` needs an apply, adopting an existing backend in CI.
///
/// # Errors
///
/// Fails when the account key cannot be read, the container cannot be created,
/// or the outputs cannot be written. Missing resources are not errors; they
/// fall back to [`BackendBootstrap::Apply`].
pub fn bootstrap_backend(
    runner: &dyn ToolRunner,
    overrides: &Overrides,
    outputs: &OutputStore,
) -> Result<BackendBootstrap> {
    if !overrides.is_ci() {
        return Ok(BackendBootstrap::Apply);
    }
    let Some(names) = backend::explicit_names(overrides)? else {
        return Ok(BackendBootstrap::Apply);
    };
    let container = backend::container_name(overrides)?;

    if !backend_exists(runner, &names) {
        info!(
            "Backend {}/{} not found, creating it",
            names.resource_group_name, names.storage_account_name
        );
        return Ok(BackendBootstrap::Apply);
    }

    ensure_container(runner, &names, &container)?;

    if runner.is_dry_run() {
        info!("[dry-run] would write {} outputs", Module::Backend);
    } else {
        outputs.write(Module::Backend, &backend_outputs(&names, &container))?;
    }
    info!(
        "Using existing backend {}/{}",
        names.resource_group_name, names.storage_account_name
    );
    Ok(BackendBootstrap::Adopted { names, container })
}

fn backend_exists(runner: &dyn ToolRunner, names: &BackendNames) -> bool {
    let group = check_exists(
        runner,
        &GroupShowArgs {
            name: names.resource_group_name.clone(),
        },
    );
    if !confirmed(group, "resource group") {
        return false;
    }
    let account = check_exists(
        runner,
        &StorageAccountShowArgs {
            resource_group: names.resource_group_name.clone(),
            name: names.storage_account_name.clone(),
        },
    );
    confirmed(account, "storage account")
}

fn confirmed(lookup: Lookup<String>, what: &str) -> bool {
    match lookup {
        Lookup::Present(_) => true,
        Lookup::Absent => false,
        Lookup::QueryFailed(reason) => {
            warn!("Backend {} lookup failed ({}); treating as absent", what, reason);
            false
        }
    }
}

/// Read the account key and create the state container (idempotent on the az side).
pub fn ensure_container(runner: &dyn ToolRunner, names: &BackendNames, container: &str) -> Result<()> {
    let key_args = StorageAccountKeyArgs {
        resource_group: names.resource_group_name.clone(),
        account_name: names.storage_account_name.clone(),
    };
    let key = run_checked(runner, &Invocation::new(&key_args))?
        .stdout
        .trim()
        .to_string();
    if key.is_empty() {
        return Err(DeployError::control_plane(format!(
            "unable to read the storage account key for backend {}",
            names.storage_account_name
        )));
    }

    let create = ContainerCreateArgs {
        name: container.to_string(),
        account_name: names.storage_account_name.clone(),
        account_key: key,
    };
    run_checked(runner, &Invocation::new(&create))?;
    Ok(())
}

/// Outputs `00_backend` would have produced
pub fn backend_outputs(names: &BackendNames, container: &str) -> OutputSet {
    let mut set = OutputSet::new();
    set.insert("backend_resource_group_name", names.resource_group_name.as_str());
    set.insert("backend_storage_account_name", names.storage_account_name.as_str());
    set.insert("backend_container_name", container);
    set
}
