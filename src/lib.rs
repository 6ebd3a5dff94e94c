//! mlops-infra Library
//!
//! Staged Terraform deployment for the MLOps platform: module ordering,
//! layered variable resolution, remote backend wiring, output propagation and
//! role-assignment reconciliation.

pub mod backend;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod defaults;
pub mod destroy;
pub mod error;
pub mod logic;
pub mod modules;
pub mod orchestrator;
pub mod outputs;
pub mod preflight;
pub mod process_guard;
pub mod reconcile;
pub mod stage;
pub mod tfvars;
pub mod tool_runner;
pub mod tool_traits;
pub mod tools;

// Re-export main types for convenience
pub use backend::{BackendCoordinates, BackendResolver};
pub use config::{ConfigValue, KeySpec, Overrides, ValueType};
pub use destroy::DestroyOptions;
pub use error::{DeployError, Result};
pub use logic::resolver::{ResolvedConfig, resolve};
pub use modules::{DEPLOY_ORDER, DESTROY_ORDER, Module, ModuleSpec, ProjectLayout};
pub use orchestrator::{DeployOptions, Orchestrator};
pub use outputs::{OutputSet, OutputStore};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use reconcile::{Lookup, ReconcileOutcome, ensure_imported};
pub use stage::{ModuleRun, ModuleStage, RunReport, StageTransitionError};
pub use tool_runner::{Invocation, ProcessRunner, Tool, ToolOutput, ToolRunner};
pub use tool_traits::ToolArgs;
