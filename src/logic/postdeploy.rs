//! Trailing actions after modules deploy
//!
//! - Refresh the AML training job definition from registry outputs
//! - Build the training image in the registry (`az acr build`)
//! - Build and push the training or inference image with local docker
//! - Resync the AML workspace keys
//! - Start a run of the Data Factory master pipeline
//!
//! The last two are best effort: when the outputs they need were never
//! captured they are skipped with a warning rather than failing the run.

use std::fmt;
use std::fs;

use tracing::{info, warn};

use crate::config::Overrides;
use crate::defaults;
use crate::error::{DeployError, Result};
use crate::modules::{Module, ProjectLayout};
use crate::outputs::OutputStore;
use crate::tool_runner::{Invocation, ToolRunner, run_checked};
use crate::tools::az::{AcrBuildArgs, AcrLoginArgs, PipelineRunArgs, RestPostArgs};
use crate::tools::docker::{DockerBuildArgs, DockerPushArgs};

/// Repository of the training image inside the registry
pub const TRAIN_IMAGE_REPOSITORY: &str = "mlops-cancer-train";

/// Repository of the inference image inside the registry
pub const INFER_IMAGE_REPOSITORY: &str = "mlops-cancer-infer";

/// API version of the workspace key resync endpoint
const RESYNC_API_VERSION: &str = "2024-04-01";

// ============================================================================
// Outcome
// ============================================================================

/// Result of a best-effort trailing action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Triggered,
    /// Skipped because the named outputs are missing
    Skipped(String),
}

impl fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered => write!(f, "triggered"),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

fn output_str(outputs: &OutputStore, module: Module, key: &str) -> Option<String> {
    outputs
        .read(module, key)
        .and_then(|value| value.as_str().map(str::to_string))
        .filter(|s| !s.trim().is_empty())
}

fn image_tag(overrides: &Overrides) -> Result<String> {
    Ok(overrides
        .setting_str(&defaults::AML_TRAIN_IMAGE_TAG)?
        .unwrap_or_else(|| "latest".to_string()))
}

// ============================================================================
// Training job definition
// ============================================================================

/// Replace the values of every `image:` and `compute:` line, keeping indentation.
pub fn rewrite_job_yaml(text: &str, image: &str, compute: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let stripped = line.trim_start();
        let indent = &line[..line.len() - stripped.len()];
        if stripped.starts_with("image:") {
            lines.push(format!("{indent}image: {image}"));
        } else if stripped.starts_with("compute:") {
            lines.push(format!("{indent}compute: azureml:{compute}"));
        } else {
            lines.push(line.to_string());
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Point `train.yml` at the registry's training image and the configured compute.
///
/// # Errors
///
/// - `Config` when the job file is missing or the registry outputs were never captured
pub fn refresh_train_job(layout: &ProjectLayout, overrides: &Overrides, outputs: &OutputStore) -> Result<()> {
    let path = layout.train_job_path();
    if !path.is_file() {
        return Err(DeployError::config(format!(
            "AML job definition not found at {}",
            path.display()
        )));
    }

    let login_server = output_str(outputs, Module::ContainerRegistry, "acr_login_server")
        .ok_or_else(|| {
            DeployError::config(format!(
                "acr_login_server not found; deploy {} first",
                Module::ContainerRegistry
            ))
        })?;
    let compute = overrides
        .setting_str(&defaults::AML_COMPUTE_NAME)?
        .unwrap_or_else(|| "cpu-cluster".to_string());
    let image = format!("{login_server}/{TRAIN_IMAGE_REPOSITORY}:{}", image_tag(overrides)?);

    let text = fs::read_to_string(&path)?;
    fs::write(&path, rewrite_job_yaml(&text, &image, &compute))?;
    info!("Updated {} (image {}, compute {})", path.display(), image, compute);
    Ok(())
}

// ============================================================================
// Training image
// ============================================================================

/// Build and push the training image with the registry's build service.
pub fn build_train_image(
    runner: &dyn ToolRunner,
    layout: &ProjectLayout,
    overrides: &Overrides,
    outputs: &OutputStore,
) -> Result<()> {
    let registry = output_str(outputs, Module::ContainerRegistry, "acr_name").ok_or_else(|| {
        DeployError::config(format!(
            "acr_name not found; deploy {} first",
            Module::ContainerRegistry
        ))
    })?;

    let args = AcrBuildArgs {
        registry,
        image: format!("{TRAIN_IMAGE_REPOSITORY}:{}", image_tag(overrides)?),
        dockerfile: layout.train_dockerfile(),
    };
    run_checked(runner, &Invocation::new(&args).in_dir(&layout.root))?;
    Ok(())
}

/// Images that can be built locally and pushed to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Train,
    Inference,
}

impl ImageKind {
    pub fn repository(self) -> &'static str {
        match self {
            Self::Train => TRAIN_IMAGE_REPOSITORY,
            Self::Inference => INFER_IMAGE_REPOSITORY,
        }
    }

    pub fn dockerfile(self, layout: &ProjectLayout) -> std::path::PathBuf {
        match self {
            Self::Train => layout.train_dockerfile(),
            Self::Inference => layout.infer_dockerfile(),
        }
    }
}

/// Build an image with local docker, log in to the registry and push it.
///
/// Both images carry the training image tag. Returns the pushed image
/// reference.
///
/// # Errors
///
/// - `Config` when `acr_login_server` or `acr_name` was never captured
/// - `Tool` when any of the three commands fails
pub fn docker_build_image(
    runner: &dyn ToolRunner,
    layout: &ProjectLayout,
    overrides: &Overrides,
    outputs: &OutputStore,
    kind: ImageKind,
) -> Result<String> {
    let login_server = output_str(outputs, Module::ContainerRegistry, "acr_login_server");
    let registry = output_str(outputs, Module::ContainerRegistry, "acr_name");
    let (Some(login_server), Some(registry)) = (login_server, registry) else {
        return Err(DeployError::config(format!(
            "ACR outputs not found; deploy {} first",
            Module::ContainerRegistry
        )));
    };

    let image = format!("{login_server}/{}:{}", kind.repository(), image_tag(overrides)?);
    info!("Building {} locally", image);

    let build = DockerBuildArgs {
        tag: image.clone(),
        dockerfile: kind.dockerfile(layout),
    };
    run_checked(runner, &Invocation::new(&build).in_dir(&layout.root))?;
    run_checked(runner, &Invocation::new(&AcrLoginArgs { name: registry }).in_dir(&layout.root))?;
    let push = DockerPushArgs { image: image.clone() };
    run_checked(runner, &Invocation::new(&push).in_dir(&layout.root))?;
    Ok(image)
}

// ============================================================================
// Workspace keys
// ============================================================================

/// Subscription segment of an ARM resource id
pub fn subscription_from_resource_id(id: &str) -> Option<&str> {
    let (_, rest) = id.split_once("/subscriptions/")?;
    let subscription = rest.split('/').next()?;
    (!subscription.is_empty()).then_some(subscription)
}

/// Management endpoint that resyncs a workspace's keys
pub fn resync_keys_url(subscription: &str, resource_group: &str, workspace: &str) -> String {
    format!(
        "https://management.azure.com/subscriptions/{subscription}/resourceGroups/{resource_group}\
         /providers/Microsoft.MachineLearningServices/workspaces/{workspace}\
         /resyncKeys?api-version={RESYNC_API_VERSION}"
    )
}

/// Ask the ML workspace to resync keys of its attached resources.
///
/// Missing resource group or workspace outputs skip the resync with a
/// warning instead of failing the run, so a partial `--select` deploy can
/// still finish. An id without a subscription segment is still an error.
pub fn sync_workspace_keys(runner: &dyn ToolRunner, outputs: &OutputStore) -> Result<TriggerOutcome> {
    let resource_group = output_str(outputs, Module::ResourceGroup, "resource_group_name");
    let resource_group_id = output_str(outputs, Module::ResourceGroup, "resource_group_id");
    let workspace = output_str(outputs, Module::MlWorkspace, "aml_workspace_name");

    let (Some(resource_group), Some(resource_group_id), Some(workspace)) =
        (resource_group, resource_group_id, workspace)
    else {
        let reason = format!(
            "outputs of {} and {} are required",
            Module::ResourceGroup,
            Module::MlWorkspace
        );
        warn!("Skipping AML workspace key sync: {}", reason);
        return Ok(TriggerOutcome::Skipped(reason));
    };

    let subscription = subscription_from_resource_id(&resource_group_id).ok_or_else(|| {
        DeployError::control_plane(format!(
            "resource group id '{resource_group_id}' has no subscription segment"
        ))
    })?;

    let args = RestPostArgs {
        url: resync_keys_url(subscription, &resource_group, &workspace),
    };
    run_checked(runner, &Invocation::new(&args))?;
    Ok(TriggerOutcome::Triggered)
}

// ============================================================================
// Data Factory
// ============================================================================

/// Start a run of the master pipeline.
pub fn run_master_pipeline(runner: &dyn ToolRunner, outputs: &OutputStore) -> Result<TriggerOutcome> {
    let resource_group = output_str(outputs, Module::ResourceGroup, "resource_group_name");
    let factory = output_str(outputs, Module::DataFactory, "data_factory_name");
    let pipeline = output_str(outputs, Module::AdfPipelineMaster, "pipeline_name");

    let (Some(resource_group), Some(factory_name), Some(pipeline_name)) = (resource_group, factory, pipeline)
    else {
        let reason = "missing outputs".to_string();
        warn!("Skipping ADF master pipeline run ({})", reason);
        return Ok(TriggerOutcome::Skipped(reason));
    };

    let args = PipelineRunArgs {
        resource_group,
        factory_name,
        pipeline_name,
    };
    run_checked(runner, &Invocation::new(&args))?;
    Ok(TriggerOutcome::Triggered)
}
