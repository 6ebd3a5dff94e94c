use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::destroy::DestroyOptions;
use crate::modules::Module;
use crate::orchestrator::DeployOptions;

/// mlops-infra - staged Terraform deployment for the MLOps platform
#[derive(Parser)]
#[command(name = "mlops-infra")]
#[command(about = "Deploy and destroy the MLOps platform's Terraform modules in order")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log what would be executed without making changes.
    ///
    /// Mutating Terraform and az calls (init, apply, destroy, import, create)
    /// are skipped and logged. Read-only queries (state list, output, show)
    /// still run so the preview is realistic. Variable files are still written.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Project root containing `terraform/`, `pipelines/` and `.env`
    #[arg(long, global = true, default_value = ".")]
    pub project_root: PathBuf,

    /// Terraform module directory (default: <project-root>/terraform)
    #[arg(long, global = true)]
    pub terraform_dir: Option<PathBuf>,

    /// Env file layered under the process environment (default: <project-root>/.env)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy all modules, or a single one
    Deploy {
        #[command(flatten)]
        select: ModuleSelection,

        /// Update the AML training job YAML from registry outputs
        #[arg(long)]
        aml_job_config_only: bool,

        /// Build and push the training image in ACR (no local Docker)
        #[arg(long)]
        acr_build_train_image: bool,

        /// Build the training image with local Docker and push it to ACR
        #[arg(long)]
        docker_build_train_image: bool,

        /// Build the inference image with local Docker and push it to ACR
        #[arg(long)]
        docker_build_infer_image: bool,

        /// Skip triggering the ADF master pipeline after deploy
        #[arg(long)]
        skip_adf_run: bool,
    },
    /// Destroy all modules in reverse order, or a single one
    Destroy {
        #[command(flatten)]
        select: ModuleSelection,

        /// Also destroy the Terraform backend resources
        #[arg(long)]
        destroy_backend: bool,
    },
    /// Print the resolved terraform.tfvars of a module without running anything
    Vars {
        /// Module directory name or ordinal (e.g. 03_storage_account or 03)
        #[arg(value_parser = parse_module)]
        module: Module,
    },
    /// List the deploy and destroy order
    Modules,
}

/// `--<module>-only` flags; at most one may be given
#[derive(Args, Debug, Default, Clone)]
#[group(id = "only", multiple = false)]
pub struct ModuleSelection {
    /// Only the Terraform backend
    #[arg(long)]
    pub backend_only: bool,
    /// Only the resource group
    #[arg(long)]
    pub rg_only: bool,
    /// Only the networking resources
    #[arg(long)]
    pub networking_only: bool,
    /// Only the storage account
    #[arg(long)]
    pub storage_only: bool,
    /// Only the key vault
    #[arg(long)]
    pub keyvault_only: bool,
    /// Only Log Analytics + App Insights
    #[arg(long)]
    pub observability_only: bool,
    /// Only the container registry
    #[arg(long)]
    pub acr_only: bool,
    /// Only the data factory
    #[arg(long)]
    pub datafactory_only: bool,
    /// Only the ADF linked services
    #[arg(long)]
    pub adf_links_only: bool,
    /// Only the ADF HTTP pipeline
    #[arg(long)]
    pub adf_pipeline_only: bool,
    /// Only the ADF bronze->silver data flow
    #[arg(long)]
    pub adf_dataflow_only: bool,
    /// Only the ADF silver pipeline
    #[arg(long)]
    pub adf_silver_pipeline_only: bool,
    /// Only the ADF silver->gold data flow
    #[arg(long)]
    pub adf_gold_dataflow_only: bool,
    /// Only the ADF gold pipeline
    #[arg(long)]
    pub adf_gold_pipeline_only: bool,
    /// Only the ADF master pipeline
    #[arg(long)]
    pub adf_master_pipeline_only: bool,
    /// Only the Azure ML workspace
    #[arg(long)]
    pub aml_only: bool,
    /// Only the AML storage account (non-HNS)
    #[arg(long)]
    pub aml_storage_only: bool,
    /// Only the AML compute cluster
    #[arg(long)]
    pub aml_compute_only: bool,
    /// Only the AcrPull assignment for the AML compute identity
    #[arg(long)]
    pub acr_rbac_only: bool,
    /// Only the Storage Blob Data Contributor assignment for the AML compute identity
    #[arg(long)]
    pub storage_rbac_only: bool,
}

impl ModuleSelection {
    /// The selected module, if any flag was given
    pub fn module(&self) -> Option<Module> {
        let flags = [
            (self.backend_only, Module::Backend),
            (self.rg_only, Module::ResourceGroup),
            (self.networking_only, Module::Networking),
            (self.storage_only, Module::StorageAccount),
            (self.keyvault_only, Module::KeyVault),
            (self.observability_only, Module::Observability),
            (self.acr_only, Module::ContainerRegistry),
            (self.datafactory_only, Module::DataFactory),
            (self.adf_links_only, Module::AdfLinkedServices),
            (self.adf_pipeline_only, Module::AdfPipelineHttp),
            (self.adf_dataflow_only, Module::AdfDataflowBronzeSilver),
            (self.adf_silver_pipeline_only, Module::AdfPipelineSilver),
            (self.adf_gold_dataflow_only, Module::AdfDataflowSilverGold),
            (self.adf_gold_pipeline_only, Module::AdfPipelineGold),
            (self.adf_master_pipeline_only, Module::AdfPipelineMaster),
            (self.aml_only, Module::MlWorkspace),
            (self.aml_storage_only, Module::AmlStorageAccount),
            (self.aml_compute_only, Module::AmlCompute),
            (self.acr_rbac_only, Module::AcrRbac),
            (self.storage_rbac_only, Module::StorageRbac),
        ];
        flags.into_iter().find(|(set, _)| *set).map(|(_, module)| module)
    }
}

/// Accept a full directory name or its two-digit ordinal
fn parse_module(raw: &str) -> Result<Module, String> {
    if let Ok(module) = Module::from_str(raw) {
        return Ok(module);
    }
    Module::all()
        .find(|m| raw.parse::<u8>().is_ok_and(|n| n == m.ordinal()))
        .ok_or_else(|| format!("unknown module '{raw}' (see `mlops-infra modules`)"))
}

impl Commands {
    /// Deploy options, if this is a deploy command
    pub fn deploy_options(&self) -> Option<DeployOptions> {
        match self {
            Commands::Deploy {
                select,
                aml_job_config_only,
                acr_build_train_image,
                docker_build_train_image,
                docker_build_infer_image,
                skip_adf_run,
            } => Some(DeployOptions {
                only: select.module(),
                job_config_only: *aml_job_config_only,
                build_train_image: *acr_build_train_image,
                docker_build_train_image: *docker_build_train_image,
                docker_build_infer_image: *docker_build_infer_image,
                skip_adf_run: *skip_adf_run,
            }),
            _ => None,
        }
    }

    /// Destroy options, if this is a destroy command
    pub fn destroy_options(&self) -> Option<DestroyOptions> {
        match self {
            Commands::Destroy {
                select,
                destroy_backend,
            } => Some(DestroyOptions {
                only: select.module(),
                include_backend: *destroy_backend,
            }),
            _ => None,
        }
    }
}
