//! Type-safe tool argument contracts.
//!
//! Every Terraform or az call the orchestrator makes is a struct implementing
//! [`ToolArgs`]. The struct is the contract: flag spelling lives in exactly one
//! `to_cli_args` implementation instead of ad-hoc string vectors at call sites.
//!
//! # Design Goals
//!
//! 1. **Compile-Time Safety**: a verb cannot be invoked with the wrong fields.
//! 2. **Single Source of Truth**: one constructor per tool verb.
//! 3. **Safe Logging**: secrets are redacted from the logged command line.

use crate::tool_runner::Tool;

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `tool()`: which executable runs the command.
/// - `verb()`: short name used in logs and error messages (e.g. `"apply"`).
/// - `to_cli_args()`: arguments exactly as passed to the executable.
///
/// # Invariants
///
/// - `display_args()` has the same shape as `to_cli_args()` with secret values masked.
/// - Read-only commands return `false` from `is_mutating()`; they still run
///   in dry-run mode so the preview reflects real state.
///
/// # Example
///
/// ```ignore
/// use mlops_infra::tools::terraform::ImportArgs;
///
/// let args = ImportArgs {
///     address: "azurerm_role_assignment.acr_pull".into(),
///     id: "/subscriptions/.../roleAssignments/abc".into(),
/// };
/// let cli_args = args.to_cli_args(); // ["import", "-input=false", "azurerm_role_assignment.acr_pull", "/subscriptions/..."]
/// ```
pub trait ToolArgs {
    /// Executable that runs this command
    fn tool(&self) -> Tool;

    /// Short verb for logs and errors
    fn verb(&self) -> &'static str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Arguments as they may appear in logs.
    fn display_args(&self) -> Vec<String> {
        self.to_cli_args()
    }

    /// Whether stdout must be captured instead of streamed to the terminal.
    fn captures_output(&self) -> bool {
        false
    }

    /// Whether the command changes cloud or state resources.
    fn is_mutating(&self) -> bool {
        true
    }
}

/// Mask used in place of secret argument values
pub const REDACTED: &str = "***";
