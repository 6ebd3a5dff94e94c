//! Error handling module for the deployment orchestrator
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fallible library operation returns [`Result`], so callers can tell a bad
//! setting apart from a missing upstream module or a failed Terraform run.

use std::path::PathBuf;

use thiserror::Error;

use crate::modules::Module;
use crate::stage::StageTransitionError;
use crate::tool_runner::Tool;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum DeployError {
    /// A setting could not be coerced, or required CI configuration is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// A module needs an output that its upstream module never captured
    #[error(
        "{needed_by} requires output '{output}' from {module}; deploy {module} first{}",
        .hint.map(|key| format!(" or set {key}")).unwrap_or_default()
    )]
    Dependency {
        module: Module,
        output: String,
        needed_by: Module,
        hint: Option<&'static str>,
    },

    /// Terraform (or a mutating az call) exited nonzero
    #[error("{tool} {verb} failed in {} (exit code {}){}",
        .dir.display(),
        .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
        stderr_suffix(.stderr)
    )]
    ExternalTool {
        tool: Tool,
        verb: &'static str,
        dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// A control-plane lookup failed; callers treat this as "not found"
    #[error("Reconciliation lookup failed: {0}")]
    Reconciliation(String),

    /// An executable could not be located
    #[error("{tool} executable not found: {detail}")]
    ToolNotFound { tool: Tool, detail: String },

    /// The control plane returned something unusable
    #[error("Control plane error: {0}")]
    ControlPlane(String),

    /// Module stage machine rejected a transition
    #[error("Stage transition error: {0}")]
    InvalidTransition(#[from] StageTransitionError),

    /// IO errors (variable files, output files, job definitions)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, DeployError>;

// Convenient error constructors
impl DeployError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dependency error for an upstream output read
    pub fn dependency(
        module: Module,
        output: impl Into<String>,
        needed_by: Module,
        hint: Option<&'static str>,
    ) -> Self {
        Self::Dependency {
            module,
            output: output.into(),
            needed_by,
            hint,
        }
    }

    /// Create a reconciliation error
    pub fn reconciliation(msg: impl Into<String>) -> Self {
        Self::Reconciliation(msg.into())
    }

    /// Create a control plane error
    pub fn control_plane(msg: impl Into<String>) -> Self {
        Self::ControlPlane(msg.into())
    }

    /// True for errors caused by a missing upstream module.
    ///
    /// The destroy traversal uses this to decide between skipping a module and aborting.
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency { .. })
    }
}
