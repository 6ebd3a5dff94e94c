//! Destroy traversal
//!
//! The inverse of a deploy: modules are visited in reverse dependency order and
//! their variables are re-resolved exactly as a deploy would resolve them.
//! A module whose upstream outputs are gone (because an upstream module was
//! destroyed earlier, or never deployed) is skipped with a warning and the
//! traversal continues. Every other failure stops the run.
//!
//! After a successful destroy the module's `outputs.json` is deleted, so later
//! modules in the same run see it as absent.

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::modules::{self, Module};
use crate::orchestrator::Orchestrator;
use crate::stage::{ModuleRun, ModuleStage};
use crate::tool_runner::{Invocation, run_checked};
use crate::tools::terraform::DestroyArgs;

/// What a destroy run covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Destroy exactly this module
    pub only: Option<Module>,
    /// Also destroy `00_backend` at the end of a full run
    pub include_backend: bool,
}

impl DestroyOptions {
    pub fn plan(&self) -> Vec<Module> {
        modules::destroy_plan(self.include_backend, self.only)
    }
}

impl Orchestrator<'_> {
    /// Destroy the planned modules in reverse order.
    pub fn destroy(&mut self, options: &DestroyOptions) -> Result<()> {
        let plan = options.plan();
        info!("Destroying {} module(s)", plan.len());
        for module in plan {
            self.destroy_module(module)?;
        }

        let skipped = self.report.skipped();
        if !skipped.is_empty() {
            let names: Vec<String> = skipped.iter().map(|m| m.dir_name()).collect();
            warn!("Skipped {} module(s): {}", skipped.len(), names.join(", "));
        }
        Ok(())
    }

    /// Destroy one module, skipping it when its upstream outputs are missing.
    pub fn destroy_module(&mut self, module: Module) -> Result<()> {
        let mut run = ModuleRun::new(module);
        let result = self.destroy_stages(module, &mut run);
        if let Err(ref e) = result {
            run.fail();
            error!(module = %module, "Destroy failed at {}: {}", run.stage().description(), e);
        }
        self.report.push(run);
        result
    }

    fn destroy_stages(&mut self, module: Module, run: &mut ModuleRun) -> Result<()> {
        let dir = self.layout.module_dir(module);

        match self.configure(module) {
            Ok(_) => run.transition_to(ModuleStage::Configured)?,
            Err(e) if e.is_dependency() => {
                warn!("Skipping {}: {}", module, e);
                run.transition_to(ModuleStage::Skipped)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let backend = if module == Module::Backend {
            None
        } else {
            self.remote_backend(module)?
        };
        run.transition_to(ModuleStage::BackendResolved)?;

        self.init(&dir, backend)?;
        run_checked(self.runner, &Invocation::new(&DestroyArgs).in_dir(&dir))?;
        run.transition_to(ModuleStage::Destroyed)?;

        if self.runner.is_dry_run() {
            debug!(module = %module, "Dry run, outputs kept");
            return Ok(());
        }
        if self.outputs.remove(module)? {
            debug!(module = %module, "Removed outputs");
        }
        run.transition_to(ModuleStage::OutputsRemoved)?;
        Ok(())
    }
}
