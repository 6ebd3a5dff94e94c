//! Pre-flight checks before a run
//!
//! Verifies, before any module is touched:
//! - Terraform can be located
//! - The Terraform directory and every planned module directory exist
//!
//! A missing `az` is only warned about; it is needed for reconciliation,
//! the CI backend bootstrap and the trailing actions, which report their own
//! error if they run.

use std::path::PathBuf;

use tracing::warn;

use crate::error::{DeployError, Result};
use crate::modules::{Module, ProjectLayout};
use crate::tool_runner::{ProcessRunner, Tool};

/// Result of the environment verification
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub missing_terraform: Option<String>,
    pub missing_dirs: Vec<PathBuf>,
}

impl PreflightReport {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_terraform.is_none() && self.missing_dirs.is_empty()
    }

    /// First problem as an error
    pub fn into_result(self) -> Result<()> {
        if let Some(detail) = self.missing_terraform {
            return Err(DeployError::ToolNotFound {
                tool: Tool::Terraform,
                detail,
            });
        }
        if !self.missing_dirs.is_empty() {
            let dirs: Vec<String> = self
                .missing_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect();
            return Err(DeployError::config(format!(
                "module directories not found: {}",
                dirs.join(", ")
            )));
        }
        Ok(())
    }
}

/// Check the tools and directories a run over `plan` needs
pub fn verify(runner: &ProcessRunner, layout: &ProjectLayout, plan: &[Module]) -> PreflightReport {
    let mut report = PreflightReport::default();

    if let Err(e) = runner.executable(Tool::Terraform) {
        report.missing_terraform = Some(match e {
            DeployError::ToolNotFound { detail, .. } => detail,
            other => other.to_string(),
        });
    }
    if let Err(e) = runner.executable(Tool::Az) {
        warn!("{}", e);
    }

    if !layout.terraform_dir.is_dir() {
        report.missing_dirs.push(layout.terraform_dir.clone());
        return report;
    }
    report.missing_dirs.extend(
        plan.iter()
            .map(|&module| layout.module_dir(module))
            .filter(|dir| !dir.is_dir()),
    );
    report
}
