//! Import-or-create reconciliation for out-of-band role assignments.
//!
//! Role assignments are sometimes created by hand or by an earlier, partially
//! failed run. Terraform cannot see them, so a plain apply would try to create a
//! duplicate and fail. Before applying a module that owns such a binding the
//! reconciler imports the existing assignment into state.
//!
//! Lookups never abort the run: a failed `state list` counts as "not tracked",
//! a failed `az` query counts as "not found". Only a failed `terraform import`
//! is fatal.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{DeployError, Result};
use crate::tool_runner::{Invocation, ToolRunner, run_checked};
use crate::tool_traits::ToolArgs;
use crate::tools::az::RoleAssignmentListArgs;
use crate::tools::terraform::{ImportArgs, StateListArgs};

/// Result of an existence query against the control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Present(T),
    Absent,
    /// The query itself failed; callers treat this as absent
    QueryFailed(String),
}

impl<T> Lookup<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent | Self::QueryFailed(_) => None,
        }
    }
}

/// What [`ensure_imported`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// State already tracks the address
    AlreadyTracked,
    /// An existing assignment was imported under the address
    Imported(String),
    /// No assignment exists; apply will create it
    NotFound,
    /// The lookup failed; apply proceeds as if nothing exists
    LookupFailed(String),
}

/// Run a read-only existence check.
///
/// Exit 0 means present (with trimmed stdout). A nonzero exit whose stderr says
/// the resource was not found means absent; any other failure is reported as
/// `QueryFailed`.
pub fn check_exists<T: ToolArgs>(runner: &dyn ToolRunner, args: &T) -> Lookup<String> {
    let invocation = Invocation::new(args);
    match runner.run(&invocation) {
        Ok(output) if output.success => Lookup::Present(output.stdout.trim().to_string()),
        Ok(output) => {
            let stderr = output.stderr.to_ascii_lowercase();
            if stderr.contains("not found") || stderr.contains("could not be found") {
                Lookup::Absent
            } else {
                Lookup::QueryFailed(output.stderr.trim().to_string())
            }
        }
        Err(e) => Lookup::QueryFailed(e.to_string()),
    }
}

/// Whether `terraform state list` in `module_dir` contains `address` exactly.
///
/// A failed listing (no state yet, backend not initialised) counts as false.
pub fn state_tracks(runner: &dyn ToolRunner, module_dir: &Path, address: &str) -> bool {
    let invocation = Invocation::new(&StateListArgs).in_dir(module_dir);
    match runner.run(&invocation) {
        Ok(output) if output.success => output.stdout.lines().any(|line| line.trim() == address),
        Ok(output) => {
            debug!(
                dir = %module_dir.display(),
                code = ?output.exit_code,
                "state list failed, treating address as untracked"
            );
            false
        }
        Err(e) => {
            debug!(dir = %module_dir.display(), "state list failed: {}", e);
            false
        }
    }
}

/// Id of the assignment binding `principal_id` at `scope`.
///
/// The query returns at most one id; empty output means absent.
pub fn find_role_assignment(runner: &dyn ToolRunner, principal_id: &str, scope: &str) -> Lookup<String> {
    let args = RoleAssignmentListArgs {
        assignee: principal_id.to_string(),
        scope: scope.to_string(),
    };
    let invocation = Invocation::new(&args);
    match runner.run(&invocation) {
        Ok(output) if output.success => {
            let id = output.stdout.trim();
            if id.is_empty() {
                Lookup::Absent
            } else {
                Lookup::Present(id.to_string())
            }
        }
        Ok(output) => Lookup::QueryFailed(
            DeployError::reconciliation(format!(
                "role assignment lookup exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ))
            .to_string(),
        ),
        Err(e) => Lookup::QueryFailed(DeployError::reconciliation(e.to_string()).to_string()),
    }
}

/// Make sure an existing assignment for (principal, scope) is tracked under
/// `address` before apply.
///
/// Running this twice against an unchanged state listing imports at most once.
///
/// # Errors
///
/// Returns `ExternalTool` only when `terraform import` itself fails.
pub fn ensure_imported(
    runner: &dyn ToolRunner,
    module_dir: &Path,
    address: &str,
    principal_id: &str,
    scope: &str,
) -> Result<ReconcileOutcome> {
    if state_tracks(runner, module_dir, address) {
        debug!(address, "Already tracked in state");
        return Ok(ReconcileOutcome::AlreadyTracked);
    }

    match find_role_assignment(runner, principal_id, scope) {
        Lookup::Present(id) => {
            info!("Importing existing role assignment into {}", address);
            let import = ImportArgs {
                address: address.to_string(),
                id: id.clone(),
            };
            run_checked(runner, &Invocation::new(&import).in_dir(module_dir))?;
            Ok(ReconcileOutcome::Imported(id))
        }
        Lookup::Absent => {
            debug!(address, "No existing role assignment, apply will create it");
            Ok(ReconcileOutcome::NotFound)
        }
        Lookup::QueryFailed(reason) => {
            warn!("{}; continuing as if none exists", reason);
            Ok(ReconcileOutcome::LookupFailed(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_runner::ToolOutput;
    use crate::tools::az::GroupShowArgs;
    use std::cell::RefCell;

    /// Answers by verb; records every call
    struct Scripted {
        answers: Vec<(&'static str, ToolOutput)>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl Scripted {
        fn new(answers: Vec<(&'static str, ToolOutput)>) -> Self {
            Self {
                answers,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn verbs(&self) -> Vec<&'static str> {
            self.calls.borrow().iter().map(|call| call.verb).collect()
        }
    }

    impl ToolRunner for Scripted {
        fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(self
                .answers
                .iter()
                .find(|(verb, _)| *verb == invocation.verb)
                .map(|(_, output)| output.clone())
                .unwrap_or_else(|| ToolOutput::ok("")))
        }
    }

    const ADDRESS: &str = "azurerm_role_assignment.acr_pull";

    #[test]
    fn test_tracked_address_is_left_alone() {
        let runner = Scripted::new(vec![(
            "state list",
            ToolOutput::ok(format!("data.azurerm_client_config.current\n{ADDRESS}\n")),
        )]);
        let outcome = ensure_imported(&runner, Path::new("."), ADDRESS, "p", "s").unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyTracked);
        assert_eq!(runner.verbs(), vec!["state list"]);
    }

    #[test]
    fn test_prefix_match_is_not_tracked() {
        let runner = Scripted::new(vec![(
            "state list",
            ToolOutput::ok(format!("{ADDRESS}_old\n")),
        )]);
        assert!(!state_tracks(&runner, Path::new("."), ADDRESS));
    }

    #[test]
    fn test_existing_assignment_is_imported() {
        let runner = Scripted::new(vec![
            ("state list", ToolOutput::failed(1, "No state file was found!")),
            ("role assignment list", ToolOutput::ok("/subscriptions/s/ra/1\n")),
        ]);
        let outcome = ensure_imported(&runner, Path::new("mod"), ADDRESS, "p", "s").unwrap();
        assert_eq!(outcome, ReconcileOutcome::Imported("/subscriptions/s/ra/1".into()));
        assert_eq!(runner.verbs(), vec!["state list", "role assignment list", "import"]);
        let calls = runner.calls.borrow();
        assert_eq!(calls[2].args, vec!["import", "-input=false", ADDRESS, "/subscriptions/s/ra/1"]);
        assert_eq!(calls[2].cwd.as_deref(), Some(Path::new("mod")));
    }

    #[test]
    fn test_missing_assignment_leaves_state_untouched() {
        let runner = Scripted::new(vec![("state list", ToolOutput::ok(""))]);
        let outcome = ensure_imported(&runner, Path::new("."), ADDRESS, "p", "s").unwrap();
        assert_eq!(outcome, ReconcileOutcome::NotFound);
        assert!(!runner.verbs().contains(&"import"));
    }

    #[test]
    fn test_failed_lookup_is_not_fatal() {
        let runner = Scripted::new(vec![(
            "role assignment list",
            ToolOutput::failed(1, "AADSTS700082: token expired"),
        )]);
        let outcome = ensure_imported(&runner, Path::new("."), ADDRESS, "p", "s").unwrap();
        assert!(matches!(outcome, ReconcileOutcome::LookupFailed(reason) if reason.contains("AADSTS700082")));
    }

    #[test]
    fn test_failed_import_is_fatal() {
        let runner = Scripted::new(vec![
            ("role assignment list", ToolOutput::ok("/ra/1")),
            ("import", ToolOutput::failed(1, "Error: resource already managed")),
        ]);
        let err = ensure_imported(&runner, Path::new("."), ADDRESS, "p", "s").unwrap_err();
        assert!(matches!(err, DeployError::ExternalTool { verb: "import", .. }));
    }

    #[test]
    fn test_check_exists_distinguishes_absent_from_failure() {
        let args = GroupShowArgs { name: "rg".into() };

        let present = Scripted::new(vec![("group show", ToolOutput::ok("{}\n"))]);
        assert!(check_exists(&present, &args).is_present());

        let absent = Scripted::new(vec![(
            "group show",
            ToolOutput::failed(3, "ERROR: Resource group 'rg' could not be found."),
        )]);
        assert_eq!(check_exists(&absent, &args), Lookup::Absent);

        let failed = Scripted::new(vec![("group show", ToolOutput::failed(1, "Please run 'az login'"))]);
        assert!(matches!(check_exists(&failed, &args), Lookup::QueryFailed(_)));
    }
}
