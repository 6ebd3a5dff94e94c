//! Module deployment orchestrator
//!
//! Drives Terraform through the fixed module order. For every module:
//!
//! ```text
//! resolve variables → write terraform.tfvars → resolve backend → init
//!     → (import existing role assignment) → apply → capture outputs → post-apply hook
//! ```
//!
//! Any failure stops the run; there is no retry and no rollback. Each module's
//! final stage is recorded in the [`RunReport`], which survives a failed run.
//! The inverse traversal lives in [`crate::destroy`].

use std::path::Path;

use tracing::{debug, error, info};

use crate::backend::{BackendCoordinates, BackendResolver};
use crate::config::Overrides;
use crate::error::{DeployError, Result};
use crate::logic::postdeploy::{self, ImageKind, TriggerOutcome};
use crate::logic::predeploy::{self, BackendBootstrap};
use crate::logic::resolver::{self, ResolvedConfig};
use crate::modules::{self, Module, PostApply, ProjectLayout, RoleBinding};
use crate::outputs::OutputStore;
use crate::reconcile::{self, ReconcileOutcome};
use crate::stage::{ModuleRun, ModuleStage, RunReport};
use crate::tfvars;
use crate::tool_runner::{Invocation, ToolRunner, run_checked};
use crate::tools::terraform::{ApplyArgs, InitArgs};

/// What a deploy run covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Deploy exactly this module, without checking upstream modules
    pub only: Option<Module>,
    /// Only refresh the AML training job definition
    pub job_config_only: bool,
    /// Build the training image in the registry after the modules
    pub build_train_image: bool,
    /// Build the training image with local docker and push it
    pub docker_build_train_image: bool,
    /// Build the inference image with local docker and push it
    pub docker_build_infer_image: bool,
    /// Do not start the master pipeline after Data Factory modules deploy
    pub skip_adf_run: bool,
}

impl DeployOptions {
    /// Modules this run deploys, in order.
    ///
    /// Refreshing the job definition or building an image on their own deploys
    /// nothing unless a single module is also selected.
    pub fn plan(&self, ci: bool) -> Vec<Module> {
        if self.only.is_none() && self.has_image_or_job_action() {
            return Vec::new();
        }
        modules::deploy_plan(ci, self.only)
    }

    fn has_image_or_job_action(&self) -> bool {
        self.job_config_only
            || self.build_train_image
            || self.docker_build_train_image
            || self.docker_build_infer_image
    }
}

/// Sequential driver for deploy and destroy runs
pub struct Orchestrator<'a> {
    pub(crate) layout: &'a ProjectLayout,
    pub(crate) overrides: &'a Overrides,
    pub(crate) runner: &'a dyn ToolRunner,
    pub(crate) outputs: OutputStore,
    pub(crate) report: RunReport,
}

impl<'a> Orchestrator<'a> {
    pub fn new(layout: &'a ProjectLayout, overrides: &'a Overrides, runner: &'a dyn ToolRunner) -> Self {
        Self {
            layout,
            overrides,
            runner,
            outputs: OutputStore::new(&layout.terraform_dir),
            report: RunReport::new(runner.is_dry_run()),
        }
    }

    pub fn outputs(&self) -> &OutputStore {
        &self.outputs
    }

    /// Stages reached so far, including the failing module of an aborted run
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    pub fn is_ci(&self) -> bool {
        self.overrides.is_ci()
    }

    fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    // ========================================================================
    // Deploy
    // ========================================================================

    /// Deploy the planned modules, then run the trailing actions.
    pub fn deploy(&mut self, options: &DeployOptions) -> Result<()> {
        let plan = options.plan(self.is_ci());
        if !plan.is_empty() {
            info!("Deploying {} module(s)", plan.len());
        }
        for &module in &plan {
            self.deploy_module(module)?;
        }

        if options.job_config_only {
            postdeploy::refresh_train_job(self.layout, self.overrides, &self.outputs)?;
        }
        if options.build_train_image {
            postdeploy::build_train_image(self.runner, self.layout, self.overrides, &self.outputs)?;
        }
        let local_builds = [
            (options.docker_build_train_image, ImageKind::Train),
            (options.docker_build_infer_image, ImageKind::Inference),
        ];
        for kind in local_builds.into_iter().filter_map(|(wanted, kind)| wanted.then_some(kind)) {
            let image =
                postdeploy::docker_build_image(self.runner, self.layout, self.overrides, &self.outputs, kind)?;
            info!("Pushed {}", image);
        }
        if plan.is_empty() {
            return Ok(());
        }

        let synced = postdeploy::sync_workspace_keys(self.runner, &self.outputs)?;
        debug!("AML workspace key sync {}", synced);

        if options.skip_adf_run {
            debug!("ADF master pipeline run disabled");
        } else if plan.iter().any(|m| m.is_data_factory()) {
            if let TriggerOutcome::Triggered = postdeploy::run_master_pipeline(self.runner, &self.outputs)? {
                info!("Started ADF master pipeline run");
            }
        }
        Ok(())
    }

    /// Deploy one module; its dependencies are not checked beyond the outputs it reads.
    pub fn deploy_module(&mut self, module: Module) -> Result<()> {
        let mut run = ModuleRun::new(module);
        let result = self.deploy_stages(module, &mut run);
        if let Err(ref e) = result {
            run.fail();
            error!(module = %module, "Deploy failed at {}: {}", run.stage().description(), e);
        }
        self.report.push(run);
        result
    }

    fn deploy_stages(&mut self, module: Module, run: &mut ModuleRun) -> Result<()> {
        let dir = self.layout.module_dir(module);
        let resolved = self.configure(module)?;
        run.transition_to(ModuleStage::Configured)?;

        let backend = if module == Module::Backend {
            let bootstrap = predeploy::bootstrap_backend(self.runner, self.overrides, &self.outputs)?;
            if let BackendBootstrap::Adopted { .. } = bootstrap {
                run.transition_to(ModuleStage::BackendResolved)?;
                run.transition_to(ModuleStage::OutputsCaptured)?;
                return Ok(());
            }
            None
        } else {
            self.remote_backend(module)?
        };
        run.transition_to(ModuleStage::BackendResolved)?;

        self.init(&dir, backend)?;

        if let Some(binding) = module.spec().role_binding {
            self.reconcile(module, &dir, &binding, &resolved)?;
            run.transition_to(ModuleStage::Reconciled)?;
        }

        run_checked(self.runner, &Invocation::new(&ApplyArgs).in_dir(&dir))?;
        run.transition_to(ModuleStage::Applied)?;

        if self.is_dry_run() {
            debug!(module = %module, "Dry run, outputs not captured");
            return Ok(());
        }
        let captured = self.outputs.capture(module, self.runner)?;
        debug!(module = %module, count = captured.len(), "Captured outputs");
        run.transition_to(ModuleStage::OutputsCaptured)?;

        self.post_apply(module)
    }

    // ========================================================================
    // Shared steps
    // ========================================================================

    /// Resolve and write the module's variable file
    pub(crate) fn configure(&self, module: Module) -> Result<ResolvedConfig> {
        let resolved = resolver::resolve(module, self.overrides, &self.outputs)?;
        tfvars::write(&self.layout.tfvars_path(module), &resolved.values)?;
        Ok(resolved)
    }

    /// Remote backend of a non-bootstrap module
    pub(crate) fn remote_backend(&self, module: Module) -> Result<Option<BackendCoordinates>> {
        let backend = BackendResolver::new(self.overrides, &self.outputs).resolve(module)?;
        match &backend {
            Some(b) => info!(
                "Using remote backend: rg={} sa={} container={} key={}",
                b.resource_group_name, b.storage_account_name, b.container_name, b.key
            ),
            None => debug!(module = %module, "Using local state"),
        }
        Ok(backend)
    }

    pub(crate) fn init(&self, dir: &Path, backend: Option<BackendCoordinates>) -> Result<()> {
        let args = InitArgs::for_module(dir, backend);
        run_checked(self.runner, &Invocation::new(&args).in_dir(dir))?;
        Ok(())
    }

    fn reconcile(
        &self,
        module: Module,
        dir: &Path,
        binding: &RoleBinding,
        resolved: &ResolvedConfig,
    ) -> Result<ReconcileOutcome> {
        let principal = resolved.get_str(binding.principal_var).ok_or_else(|| {
            DeployError::config(format!("{module}: {} is not set", binding.principal_var))
        })?;
        let scope = resolved.get_str(binding.scope_var).ok_or_else(|| {
            DeployError::config(format!("{module}: {} is not set", binding.scope_var))
        })?;

        let outcome = reconcile::ensure_imported(self.runner, dir, binding.address, principal, scope)?;
        debug!(module = %module, ?outcome, "Reconciled role assignment");
        Ok(outcome)
    }

    fn post_apply(&self, module: Module) -> Result<()> {
        match module.spec().post_apply {
            PostApply::None => Ok(()),
            PostApply::RefreshTrainJob => {
                postdeploy::refresh_train_job(self.layout, self.overrides, &self.outputs)
            }
        }
    }
}
