//! Per-module stage machine
//!
//! Every module a run visits carries a [`ModuleRun`] that records which stage it
//! reached. Transitions are validated so the orchestrator cannot, for example,
//! capture outputs for a module that never applied.
//!
//! # Stage Flow
//!
//! ```text
//! deploy:   Pending → Configured → BackendResolved → (Reconciled) → Applied → OutputsCaptured
//! destroy:  Pending → Configured → BackendResolved → Destroyed → OutputsRemoved
//! adopted:  Pending → Configured → BackendResolved → OutputsCaptured
//!
//! Pending may go straight to Skipped (destroy with missing upstream outputs).
//! Configuration stages may fail with ConfigFailed, tool stages with ApplyFailed.
//! ```
//!
//! The adopted path is the CI backend bootstrap, which writes outputs for a
//! pre-existing backend without applying.

use std::fmt;

use strum::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, info};

use crate::modules::Module;

/// Lifecycle stage of one module within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ModuleStage {
    Pending,
    /// Variables resolved and written
    Configured,
    /// Backend coordinates known (or local state chosen)
    BackendResolved,
    /// Out-of-band role assignment reconciled with state
    Reconciled,
    Applied,
    OutputsCaptured,
    Destroyed,
    OutputsRemoved,
    /// Upstream outputs missing on destroy
    Skipped,
    ConfigFailed,
    ApplyFailed,
}

impl ModuleStage {
    /// No further transition is possible
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::OutputsCaptured
                | Self::OutputsRemoved
                | Self::Skipped
                | Self::ConfigFailed
                | Self::ApplyFailed
        )
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Self::ConfigFailed | Self::ApplyFailed)
    }

    /// Stages reachable from this one
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Configured, Self::Skipped, Self::ConfigFailed],
            Self::Configured => &[Self::BackendResolved, Self::ConfigFailed],
            Self::BackendResolved => &[
                Self::Reconciled,
                Self::Applied,
                Self::Destroyed,
                Self::OutputsCaptured,
                Self::ApplyFailed,
            ],
            Self::Reconciled => &[Self::Applied, Self::ApplyFailed],
            Self::Applied => &[Self::OutputsCaptured, Self::ApplyFailed],
            Self::Destroyed => &[Self::OutputsRemoved, Self::ApplyFailed],
            Self::OutputsCaptured
            | Self::OutputsRemoved
            | Self::Skipped
            | Self::ConfigFailed
            | Self::ApplyFailed => &[],
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.successors().contains(&to)
    }

    /// Human-readable description of this stage
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Configured => "variables written",
            Self::BackendResolved => "backend resolved",
            Self::Reconciled => "role assignment reconciled",
            Self::Applied => "applied",
            Self::OutputsCaptured => "outputs captured",
            Self::Destroyed => "destroyed",
            Self::OutputsRemoved => "destroyed, outputs removed",
            Self::Skipped => "skipped",
            Self::ConfigFailed => "configuration failed",
            Self::ApplyFailed => "terraform failed",
        }
    }
}

/// Errors that can occur during stage transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageTransitionError {
    #[error("{module}: cannot move from {from} to {to}")]
    Invalid {
        module: Module,
        from: ModuleStage,
        to: ModuleStage,
    },

    #[error("{module}: already finished at {from}")]
    FromTerminal { module: Module, from: ModuleStage },
}

/// Stage tracking for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRun {
    module: Module,
    stage: ModuleStage,
    history: Vec<ModuleStage>,
}

impl ModuleRun {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            stage: ModuleStage::Pending,
            history: vec![ModuleStage::Pending],
        }
    }

    #[inline]
    pub fn module(&self) -> Module {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ModuleStage {
        self.stage
    }

    /// Every stage visited, starting with `Pending`
    pub fn history(&self) -> &[ModuleStage] {
        &self.history
    }

    /// Whether the given stage was passed through at some point
    pub fn visited(&self, stage: ModuleStage) -> bool {
        self.history.contains(&stage)
    }

    /// Move to `to`, which must be a direct successor of the current stage.
    pub fn transition_to(&mut self, to: ModuleStage) -> Result<(), StageTransitionError> {
        if self.stage.is_terminal() {
            return Err(StageTransitionError::FromTerminal {
                module: self.module,
                from: self.stage,
            });
        }
        if !self.stage.can_transition_to(to) {
            return Err(StageTransitionError::Invalid {
                module: self.module,
                from: self.stage,
                to,
            });
        }

        if to.is_failure() {
            debug!(module = %self.module, from = %self.stage, "Module failed");
        } else {
            info!(module = %self.module, "{} → {}", self.module, to.description());
        }
        self.stage = to;
        self.history.push(to);
        Ok(())
    }

    /// Record a failure at the current stage.
    ///
    /// Configuration stages fail with `ConfigFailed`, everything after the
    /// backend is resolved fails with `ApplyFailed`. Already-terminal runs are
    /// left alone.
    pub fn fail(&mut self) {
        let failure = match self.stage {
            ModuleStage::Pending | ModuleStage::Configured => ModuleStage::ConfigFailed,
            _ => ModuleStage::ApplyFailed,
        };
        if self.stage.can_transition_to(failure) {
            self.stage = failure;
            self.history.push(failure);
        }
    }
}

/// Final stages of every module a run visited
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    runs: Vec<ModuleRun>,
    dry_run: bool,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            runs: Vec::new(),
            dry_run,
        }
    }

    pub fn push(&mut self, run: ModuleRun) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[ModuleRun] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Final stage of `module`, if it was visited
    pub fn stage_of(&self, module: Module) -> Option<ModuleStage> {
        self.runs
            .iter()
            .find(|run| run.module == module)
            .map(ModuleRun::stage)
    }

    /// The module that stopped the run
    pub fn failed(&self) -> Option<&ModuleRun> {
        self.runs.iter().find(|run| run.stage.is_failure())
    }

    pub fn skipped(&self) -> Vec<Module> {
        self.runs
            .iter()
            .filter(|run| run.stage == ModuleStage::Skipped)
            .map(|run| run.module)
            .collect()
    }

    pub fn succeeded(&self) -> bool {
        self.failed().is_none()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run, no changes were made:")?;
        }
        for run in &self.runs {
            writeln!(f, "  {:<34} {}", run.module.dir_name(), run.stage.description())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_deploy_path() {
        let mut run = ModuleRun::new(Module::AcrRbac);
        for stage in [
            ModuleStage::Configured,
            ModuleStage::BackendResolved,
            ModuleStage::Reconciled,
            ModuleStage::Applied,
            ModuleStage::OutputsCaptured,
        ] {
            run.transition_to(stage).unwrap();
        }
        assert_eq!(run.stage(), ModuleStage::OutputsCaptured);
        assert_eq!(run.history().len(), 6);
        assert!(run.visited(ModuleStage::Reconciled));
    }

    #[test]
    fn test_destroy_path() {
        let mut run = ModuleRun::new(Module::Networking);
        run.transition_to(ModuleStage::Configured).unwrap();
        run.transition_to(ModuleStage::BackendResolved).unwrap();
        run.transition_to(ModuleStage::Destroyed).unwrap();
        run.transition_to(ModuleStage::OutputsRemoved).unwrap();
        assert!(run.stage().is_terminal());
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut run = ModuleRun::new(Module::KeyVault);
        let err = run.transition_to(ModuleStage::Applied).unwrap_err();
        assert_eq!(
            err,
            StageTransitionError::Invalid {
                module: Module::KeyVault,
                from: ModuleStage::Pending,
                to: ModuleStage::Applied,
            }
        );
        assert_eq!(run.stage(), ModuleStage::Pending);
    }

    #[test]
    fn test_terminal_stages_have_no_successors() {
        for stage in ModuleStage::iter() {
            assert_eq!(stage.is_terminal(), stage.successors().is_empty(), "{stage}");
        }
    }

    #[test]
    fn test_no_transition_after_skip() {
        let mut run = ModuleRun::new(Module::AcrRbac);
        run.transition_to(ModuleStage::Skipped).unwrap();
        assert!(matches!(
            run.transition_to(ModuleStage::Configured),
            Err(StageTransitionError::FromTerminal { .. })
        ));
    }

    #[test]
    fn test_fail_picks_failure_kind() {
        let mut early = ModuleRun::new(Module::StorageAccount);
        early.fail();
        assert_eq!(early.stage(), ModuleStage::ConfigFailed);

        let mut late = ModuleRun::new(Module::StorageAccount);
        late.transition_to(ModuleStage::Configured).unwrap();
        late.transition_to(ModuleStage::BackendResolved).unwrap();
        late.fail();
        assert_eq!(late.stage(), ModuleStage::ApplyFailed);

        // failing twice keeps the first failure
        late.fail();
        assert_eq!(late.history().last(), Some(&ModuleStage::ApplyFailed));
        assert_eq!(late.history().len(), 4);
    }

    #[test]
    fn test_report_summary() {
        let mut report = RunReport::new(false);
        let mut ok = ModuleRun::new(Module::ResourceGroup);
        ok.transition_to(ModuleStage::Configured).unwrap();
        let mut skipped = ModuleRun::new(Module::AcrRbac);
        skipped.transition_to(ModuleStage::Skipped).unwrap();
        report.push(ok);
        report.push(skipped);

        assert!(report.succeeded());
        assert_eq!(report.skipped(), vec![Module::AcrRbac]);
        assert_eq!(report.stage_of(Module::ResourceGroup), Some(ModuleStage::Configured));
        assert_eq!(report.stage_of(Module::Backend), None);
        let text = report.to_string();
        assert!(text.contains("01_resource_group"));
        assert!(text.contains("skipped"));
    }
}
