//! Module catalogue and dispatch table.
//!
//! Each Terraform root module under `terraform/` is described by a static
//! [`ModuleSpec`]: the ordered variables it receives and where each value comes
//! from, the role assignment it must reconcile before apply, and any hook that
//! runs after it is applied. The orchestrator iterates these records generically.

use std::path::{Path, PathBuf};

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config::KeySpec;
use crate::defaults as d;

/// Variable file written into every module directory
pub const TFVARS_FILE: &str = "terraform.tfvars";
/// Captured `terraform output -json`
pub const OUTPUTS_FILE: &str = "outputs.json";
/// Local state left behind before a module moves to the remote backend
pub const LOCAL_STATE_FILE: &str = "terraform.tfstate";

// ============================================================================
// Module identifiers
// ============================================================================

/// Terraform root modules, in ordinal order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
pub enum Module {
    #[strum(serialize = "00_backend")]
    Backend,
    #[strum(serialize = "01_resource_group")]
    ResourceGroup,
    #[strum(serialize = "02_networking")]
    Networking,
    #[strum(serialize = "03_storage_account")]
    StorageAccount,
    #[strum(serialize = "04_key_vault")]
    KeyVault,
    #[strum(serialize = "05_log_analytics_app_insights")]
    Observability,
    #[strum(serialize = "06_container_registry")]
    ContainerRegistry,
    #[strum(serialize = "07_data_factory")]
    DataFactory,
    #[strum(serialize = "08_adf_linked_services")]
    AdfLinkedServices,
    #[strum(serialize = "09_adf_pipeline_http")]
    AdfPipelineHttp,
    #[strum(serialize = "10_adf_dataflow_bronze_silver")]
    AdfDataflowBronzeSilver,
    #[strum(serialize = "11_adf_pipeline_silver_dataflow")]
    AdfPipelineSilver,
    #[strum(serialize = "12_adf_dataflow_silver_gold")]
    AdfDataflowSilverGold,
    #[strum(serialize = "13_adf_pipeline_gold_dataflow")]
    AdfPipelineGold,
    #[strum(serialize = "14_adf_pipeline_master")]
    AdfPipelineMaster,
    #[strum(serialize = "15_machine_learning_workspace")]
    MlWorkspace,
    #[strum(serialize = "16_aml_storage_account")]
    AmlStorageAccount,
    #[strum(serialize = "17_aml_compute")]
    AmlCompute,
    #[strum(serialize = "18_acr_rbac")]
    AcrRbac,
    #[strum(serialize = "19_storage_rbac")]
    StorageRbac,
}

impl Module {
    /// Directory name under `terraform/`, also the identifier used in state keys
    pub fn dir_name(self) -> String {
        self.to_string()
    }

    /// Two-digit ordinal prefix
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Modules 07-14 make up the Data Factory pipeline
    pub fn is_data_factory(self) -> bool {
        (Module::DataFactory..=Module::AdfPipelineMaster).contains(&self)
    }

    /// Human-readable description for logs and the summary
    pub fn description(self) -> &'static str {
        match self {
            Module::Backend => "Remote state backend",
            Module::ResourceGroup => "Resource group",
            Module::Networking => "Virtual network",
            Module::StorageAccount => "Data lake storage account",
            Module::KeyVault => "Key vault",
            Module::Observability => "Log Analytics and Application Insights",
            Module::ContainerRegistry => "Container registry",
            Module::DataFactory => "Data Factory",
            Module::AdfLinkedServices => "Data Factory linked services",
            Module::AdfPipelineHttp => "HTTP ingest pipeline",
            Module::AdfDataflowBronzeSilver => "Bronze to silver data flow",
            Module::AdfPipelineSilver => "Silver data flow pipeline",
            Module::AdfDataflowSilverGold => "Silver to gold data flow",
            Module::AdfPipelineGold => "Gold data flow pipeline",
            Module::AdfPipelineMaster => "Master pipeline",
            Module::MlWorkspace => "Machine learning workspace",
            Module::AmlStorageAccount => "ML workspace storage account",
            Module::AmlCompute => "ML compute cluster",
            Module::AcrRbac => "AcrPull role assignment for ML compute",
            Module::StorageRbac => "Blob contributor role assignment for ML compute",
        }
    }

    /// Dispatch record for this module
    pub fn spec(self) -> &'static ModuleSpec {
        // MODULE_SPECS is declared in ordinal order
        &MODULE_SPECS[self as usize]
    }

    pub fn all() -> impl Iterator<Item = Module> {
        Module::iter()
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Deploy order after the backend bootstrap
pub const DEPLOY_ORDER: &[Module] = &[
    Module::ResourceGroup,
    Module::Networking,
    Module::StorageAccount,
    Module::KeyVault,
    Module::Observability,
    Module::ContainerRegistry,
    Module::AmlStorageAccount,
    Module::MlWorkspace,
    Module::AmlCompute,
    Module::AcrRbac,
    Module::StorageRbac,
    Module::DataFactory,
    Module::AdfLinkedServices,
    Module::AdfPipelineHttp,
    Module::AdfDataflowBronzeSilver,
    Module::AdfPipelineSilver,
    Module::AdfDataflowSilverGold,
    Module::AdfPipelineGold,
    Module::AdfPipelineMaster,
];

/// Destroy order, backend excluded
pub const DESTROY_ORDER: &[Module] = &[
    Module::AdfPipelineMaster,
    Module::AdfPipelineGold,
    Module::AdfDataflowSilverGold,
    Module::AdfPipelineSilver,
    Module::AdfDataflowBronzeSilver,
    Module::AdfPipelineHttp,
    Module::AdfLinkedServices,
    Module::DataFactory,
    Module::StorageRbac,
    Module::AcrRbac,
    Module::AmlCompute,
    Module::MlWorkspace,
    Module::AmlStorageAccount,
    Module::ContainerRegistry,
    Module::Observability,
    Module::KeyVault,
    Module::StorageAccount,
    Module::Networking,
    Module::ResourceGroup,
];

/// Modules a deploy run visits.
///
/// Outside CI the backend is bootstrapped first. In CI the backend is expected to
/// pre-exist and is only visited when selected explicitly.
pub fn deploy_plan(ci: bool, only: Option<Module>) -> Vec<Module> {
    if let Some(module) = only {
        return vec![module];
    }
    let mut plan = Vec::with_capacity(DEPLOY_ORDER.len() + 1);
    if !ci {
        plan.push(Module::Backend);
    }
    plan.extend_from_slice(DEPLOY_ORDER);
    plan
}

/// Modules a destroy run visits; the backend goes last and only on request.
pub fn destroy_plan(include_backend: bool, only: Option<Module>) -> Vec<Module> {
    if let Some(module) = only {
        return vec![module];
    }
    let mut plan = DESTROY_ORDER.to_vec();
    if include_backend {
        plan.push(Module::Backend);
    }
    plan
}

// ============================================================================
// Project layout
// ============================================================================

/// Paths of the project tree the orchestrator works in
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub terraform_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let terraform_dir = root.join("terraform");
        Self {
            root,
            terraform_dir,
        }
    }

    pub fn with_terraform_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.terraform_dir = dir.into();
        self
    }

    pub fn module_dir(&self, module: Module) -> PathBuf {
        self.terraform_dir.join(module.dir_name())
    }

    pub fn tfvars_path(&self, module: Module) -> PathBuf {
        self.module_dir(module).join(TFVARS_FILE)
    }

    pub fn local_state_path(&self, module: Module) -> PathBuf {
        self.module_dir(module).join(LOCAL_STATE_FILE)
    }

    /// AML training job definition refreshed after the registry deploys
    pub fn train_job_path(&self) -> PathBuf {
        self.root.join("pipelines").join("aml").join("jobs").join("train.yml")
    }

    pub fn train_dockerfile(&self) -> PathBuf {
        Path::new("docker").join("train").join("Dockerfile")
    }

    pub fn infer_dockerfile(&self) -> PathBuf {
        Path::new("docker").join("inference").join("Dockerfile")
    }
}

// ============================================================================
// Dispatch records
// ============================================================================

/// A named output of another module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRef {
    pub module: Module,
    pub key: &'static str,
}

impl OutputRef {
    pub const fn new(module: Module, key: &'static str) -> Self {
        Self { module, key }
    }
}

/// Backend coordinates the bootstrap module receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendField {
    ResourceGroup,
    StorageAccount,
    Container,
}

/// Where a module variable gets its value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    /// Override, else built-in default
    Setting(KeySpec),
    /// Override, else upstream output, else (when not required) the default
    SettingOrOutput {
        setting: KeySpec,
        output: OutputRef,
        required: bool,
    },
    /// Upstream output only; always required
    Output(OutputRef),
    /// Resolved backend naming
    Backend(BackendField),
}

/// One line of a module's variable file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarSpec {
    pub name: &'static str,
    pub source: Source,
}

const fn setting(name: &'static str, key: KeySpec) -> VarSpec {
    VarSpec {
        name,
        source: Source::Setting(key),
    }
}

const fn output(name: &'static str, module: Module, key: &'static str) -> VarSpec {
    VarSpec {
        name,
        source: Source::Output(OutputRef::new(module, key)),
    }
}

const fn backend(name: &'static str, field: BackendField) -> VarSpec {
    VarSpec {
        name,
        source: Source::Backend(field),
    }
}

const RG_NAME: VarSpec = VarSpec {
    name: "resource_group_name",
    source: Source::SettingOrOutput {
        setting: d::RESOURCE_GROUP_NAME,
        output: OutputRef::new(Module::ResourceGroup, "resource_group_name"),
        required: true,
    },
};

const RG_LOCATION: VarSpec = VarSpec {
    name: "location",
    source: Source::SettingOrOutput {
        setting: d::LOCATION,
        output: OutputRef::new(Module::ResourceGroup, "resource_group_location"),
        required: false,
    },
};

const DATA_FACTORY_ID: VarSpec = output("data_factory_id", Module::DataFactory, "data_factory_id");

/// Role assignment created outside Terraform that must be imported before apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBinding {
    /// Terraform resource address inside the module
    pub address: &'static str,
    /// Variable holding the principal id
    pub principal_var: &'static str,
    /// Variable holding the scope resource id
    pub scope_var: &'static str,
}

/// Action run right after a module applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostApply {
    None,
    /// Point the AML training job at the registry's image and compute
    RefreshTrainJob,
}

/// Dispatch record of one module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleSpec {
    pub module: Module,
    pub vars: &'static [VarSpec],
    pub role_binding: Option<RoleBinding>,
    pub post_apply: PostApply,
}

impl ModuleSpec {
    const fn new(module: Module, vars: &'static [VarSpec]) -> Self {
        Self {
            module,
            vars,
            role_binding: None,
            post_apply: PostApply::None,
        }
    }

    const fn reconciling(mut self, binding: RoleBinding) -> Self {
        self.role_binding = Some(binding);
        self
    }

    const fn then(mut self, hook: PostApply) -> Self {
        self.post_apply = hook;
        self
    }

    /// Modules whose outputs this module reads
    pub fn upstream(&self) -> Vec<Module> {
        let mut modules: Vec<Module> = self
            .vars
            .iter()
            .filter_map(|var| match var.source {
                Source::SettingOrOutput { output, .. } | Source::Output(output) => {
                    Some(output.module)
                }
                Source::Setting(_) | Source::Backend(_) => None,
            })
            .collect();
        modules.sort();
        modules.dedup();
        modules
    }
}

const BACKEND_VARS: &[VarSpec] = &[
    backend("backend_resource_group_name", BackendField::ResourceGroup),
    setting("backend_resource_group_name_prefix", d::BACKEND_RESOURCE_GROUP_NAME_PREFIX),
    setting("location", d::LOCATION),
    backend("storage_account_name", BackendField::StorageAccount),
    setting("storage_account_name_prefix", d::BACKEND_STORAGE_ACCOUNT_NAME_PREFIX),
    backend("container_name", BackendField::Container),
];

const RESOURCE_GROUP_VARS: &[VarSpec] = &[
    setting("resource_group_name", d::RESOURCE_GROUP_NAME),
    setting("resource_group_name_prefix", d::RESOURCE_GROUP_NAME_PREFIX),
    setting("location", d::LOCATION),
];

const NETWORKING_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("vnet_name", d::VNET_NAME),
    setting("vnet_name_prefix", d::VNET_NAME_PREFIX),
    setting("address_space", d::ADDRESS_SPACE),
    setting("subnet_prefixes", d::SUBNET_PREFIXES),
];

const STORAGE_ACCOUNT_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("storage_account_name", d::STORAGE_ACCOUNT_NAME),
    setting("storage_account_name_prefix", d::STORAGE_ACCOUNT_NAME_PREFIX),
    setting("account_replication_type", d::ACCOUNT_REPLICATION_TYPE),
    setting("account_tier", d::ACCOUNT_TIER),
    setting("public_network_access_enabled", d::PUBLIC_NETWORK_ACCESS_ENABLED),
    setting("is_hns_enabled", d::IS_HNS_ENABLED),
    setting("container_names", d::CONTAINER_NAMES),
    setting("storage_blob_contributor_object_id", d::STORAGE_BLOB_CONTRIBUTOR_OBJECT_ID),
];

const KEY_VAULT_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("key_vault_name", d::KEY_VAULT_NAME),
    setting("key_vault_name_prefix", d::KEY_VAULT_NAME_PREFIX),
    setting("sku_name", d::KEY_VAULT_SKU_NAME),
    setting("enable_rbac_authorization", d::KEY_VAULT_ENABLE_RBAC),
    setting("public_network_access_enabled", d::KEY_VAULT_PUBLIC_NETWORK_ACCESS_ENABLED),
    setting("soft_delete_retention_days", d::KEY_VAULT_SOFT_DELETE_RETENTION_DAYS),
    setting("purge_protection_enabled", d::KEY_VAULT_PURGE_PROTECTION_ENABLED),
    setting("key_vault_admin_object_id", d::KEY_VAULT_ADMIN_OBJECT_ID),
];

const OBSERVABILITY_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("log_analytics_name", d::LOG_ANALYTICS_NAME),
    setting("log_analytics_name_prefix", d::LOG_ANALYTICS_NAME_PREFIX),
    setting("sku", d::LOG_ANALYTICS_SKU),
    setting("retention_in_days", d::LOG_ANALYTICS_RETENTION_IN_DAYS),
    setting("app_insights_name", d::APP_INSIGHTS_NAME),
    setting("app_insights_name_prefix", d::APP_INSIGHTS_NAME_PREFIX),
    setting("application_type", d::APP_INSIGHTS_APPLICATION_TYPE),
];

const CONTAINER_REGISTRY_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("acr_name", d::ACR_NAME),
    setting("acr_name_prefix", d::ACR_NAME_PREFIX),
    setting("sku", d::ACR_SKU),
    setting("admin_enabled", d::ACR_ADMIN_ENABLED),
    setting("public_network_access_enabled", d::ACR_PUBLIC_NETWORK_ACCESS_ENABLED),
];

const DATA_FACTORY_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("data_factory_name", d::DATA_FACTORY_NAME),
    setting("data_factory_name_prefix", d::DATA_FACTORY_NAME_PREFIX),
];

const ADF_LINKED_SERVICES_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    setting("http_linked_service_name", d::HTTP_LINKED_SERVICE_NAME),
    setting("http_linked_service_name_prefix", d::HTTP_LINKED_SERVICE_NAME_PREFIX),
    setting("http_base_url", d::HTTP_BASE_URL),
    setting("http_authentication_type", d::HTTP_AUTHENTICATION_TYPE),
    setting("http_enable_certificate_validation", d::HTTP_ENABLE_CERTIFICATE_VALIDATION),
    setting("integration_runtime_name", d::INTEGRATION_RUNTIME_NAME),
    setting("adls_linked_service_name", d::ADLS_LINKED_SERVICE_NAME),
    setting("adls_linked_service_name_prefix", d::ADLS_LINKED_SERVICE_NAME_PREFIX),
    output("storage_dfs_endpoint", Module::StorageAccount, "primary_dfs_endpoint"),
    output(
        "storage_account_key",
        Module::StorageAccount,
        "storage_account_primary_access_key",
    ),
    setting("description", d::LINKED_SERVICE_DESCRIPTION),
];

const ADF_PIPELINE_HTTP_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    output(
        "http_linked_service_name",
        Module::AdfLinkedServices,
        "http_linked_service_name",
    ),
    output(
        "adls_linked_service_name",
        Module::AdfLinkedServices,
        "adls_linked_service_name",
    ),
    setting("pipeline_name", d::ADF_PIPELINE_NAME),
    setting("pipeline_name_prefix", d::ADF_PIPELINE_NAME_PREFIX),
    setting("http_dataset_name", d::HTTP_DATASET_NAME),
    setting("http_dataset_name_prefix", d::HTTP_DATASET_NAME_PREFIX),
    setting("sink_dataset_name", d::SINK_DATASET_NAME),
    setting("sink_dataset_name_prefix", d::SINK_DATASET_NAME_PREFIX),
    setting("http_relative_url", d::HTTP_RELATIVE_URL),
    setting("sink_file_system", d::SINK_FILE_SYSTEM),
    setting("sink_folder", d::SINK_FOLDER),
    setting("sink_file", d::SINK_FILE),
];

const ADF_DATAFLOW_BRONZE_SILVER_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    output(
        "adls_linked_service_name",
        Module::AdfLinkedServices,
        "adls_linked_service_name",
    ),
    setting("dataflow_name", d::ADF_DATAFLOW_NAME),
    setting("dataflow_name_prefix", d::ADF_DATAFLOW_NAME_PREFIX),
    setting("bronze_source_dataset_name", d::BRONZE_SOURCE_DATASET_NAME),
    setting("bronze_source_dataset_name_prefix", d::BRONZE_SOURCE_DATASET_NAME_PREFIX),
    setting("source_container", d::BRONZE_SOURCE_CONTAINER),
    setting("source_folder", d::BRONZE_SOURCE_FOLDER),
    setting("source_file", d::BRONZE_SOURCE_FILE),
    setting("sink_container", d::SILVER_SINK_CONTAINER),
    setting("sink_folder", d::SILVER_SINK_FOLDER),
    setting("sink_format", d::SILVER_SINK_FORMAT),
];

const ADF_PIPELINE_SILVER_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    output("dataflow_name", Module::AdfDataflowBronzeSilver, "dataflow_name"),
    setting("pipeline_name", d::ADF_SILVER_PIPELINE_NAME),
    setting("pipeline_name_prefix", d::ADF_SILVER_PIPELINE_NAME_PREFIX),
    setting("compute_type", d::ADF_DATAFLOW_COMPUTE_TYPE),
    setting("core_count", d::ADF_DATAFLOW_CORE_COUNT),
    setting("trace_level", d::ADF_DATAFLOW_TRACE_LEVEL),
];

const ADF_DATAFLOW_SILVER_GOLD_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    output(
        "adls_linked_service_name",
        Module::AdfLinkedServices,
        "adls_linked_service_name",
    ),
    setting("dataflow_name", d::ADF_GOLD_DATAFLOW_NAME),
    setting("dataflow_name_prefix", d::ADF_GOLD_DATAFLOW_NAME_PREFIX),
    setting("silver_source_dataset_name", d::SILVER_SOURCE_DATASET_NAME),
    setting("silver_source_dataset_name_prefix", d::SILVER_SOURCE_DATASET_NAME_PREFIX),
    setting("source_container", d::SILVER_SOURCE_CONTAINER),
    setting("source_folder", d::SILVER_SOURCE_FOLDER),
    setting("sink_container", d::GOLD_SINK_CONTAINER),
    setting("sink_folder", d::GOLD_SINK_FOLDER),
    setting("sink_format", d::GOLD_SINK_FORMAT),
];

const ADF_PIPELINE_GOLD_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    output("dataflow_name", Module::AdfDataflowSilverGold, "dataflow_name"),
    setting("pipeline_name", d::ADF_GOLD_PIPELINE_NAME),
    setting("pipeline_name_prefix", d::ADF_GOLD_PIPELINE_NAME_PREFIX),
    setting("compute_type", d::ADF_DATAFLOW_COMPUTE_TYPE),
    setting("core_count", d::ADF_DATAFLOW_CORE_COUNT),
    setting("trace_level", d::ADF_DATAFLOW_TRACE_LEVEL),
];

const ADF_PIPELINE_MASTER_VARS: &[VarSpec] = &[
    DATA_FACTORY_ID,
    setting("pipeline_name", d::ADF_MASTER_PIPELINE_NAME),
    setting("pipeline_name_prefix", d::ADF_MASTER_PIPELINE_NAME_PREFIX),
    output("ingest_pipeline_name", Module::AdfPipelineHttp, "pipeline_name"),
    output("silver_pipeline_name", Module::AdfPipelineSilver, "pipeline_name"),
    output("gold_pipeline_name", Module::AdfPipelineGold, "pipeline_name"),
];

const ML_WORKSPACE_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("workspace_name", d::AML_WORKSPACE_NAME),
    setting("workspace_name_prefix", d::AML_WORKSPACE_NAME_PREFIX),
    output("storage_account_id", Module::AmlStorageAccount, "storage_account_id"),
    output("key_vault_id", Module::KeyVault, "key_vault_id"),
    output("application_insights_id", Module::Observability, "app_insights_id"),
    output("container_registry_id", Module::ContainerRegistry, "acr_id"),
    setting("public_network_access_enabled", d::AML_PUBLIC_NETWORK_ACCESS_ENABLED),
];

const AML_STORAGE_ACCOUNT_VARS: &[VarSpec] = &[
    RG_NAME,
    RG_LOCATION,
    setting("storage_account_name", d::AML_STORAGE_ACCOUNT_NAME),
    setting("storage_account_name_prefix", d::AML_STORAGE_ACCOUNT_NAME_PREFIX),
    setting("account_replication_type", d::AML_STORAGE_ACCOUNT_REPLICATION_TYPE),
    setting("account_tier", d::AML_STORAGE_ACCOUNT_TIER),
    setting("public_network_access_enabled", d::AML_STORAGE_PUBLIC_NETWORK_ACCESS_ENABLED),
];

const AML_COMPUTE_VARS: &[VarSpec] = &[
    output("workspace_id", Module::MlWorkspace, "aml_workspace_id"),
    output("location", Module::MlWorkspace, "aml_workspace_location"),
    setting("compute_name", d::AML_COMPUTE_NAME),
    setting("vm_size", d::AML_COMPUTE_VM_SIZE),
    setting("vm_priority", d::AML_COMPUTE_VM_PRIORITY),
    setting("min_instances", d::AML_COMPUTE_MIN_INSTANCES),
    setting("max_instances", d::AML_COMPUTE_MAX_INSTANCES),
    setting("idle_time_before_scaledown", d::AML_COMPUTE_IDLE_TIME),
];

const ACR_RBAC_VARS: &[VarSpec] = &[
    output("acr_id", Module::ContainerRegistry, "acr_id"),
    output("compute_principal_id", Module::AmlCompute, "compute_principal_id"),
];

const STORAGE_RBAC_VARS: &[VarSpec] = &[
    output("storage_account_id", Module::StorageAccount, "storage_account_id"),
    output("compute_principal_id", Module::AmlCompute, "compute_principal_id"),
];

/// Dispatch table, indexed by module ordinal
pub static MODULE_SPECS: [ModuleSpec; 20] = [
    ModuleSpec::new(Module::Backend, BACKEND_VARS),
    ModuleSpec::new(Module::ResourceGroup, RESOURCE_GROUP_VARS),
    ModuleSpec::new(Module::Networking, NETWORKING_VARS),
    ModuleSpec::new(Module::StorageAccount, STORAGE_ACCOUNT_VARS),
    ModuleSpec::new(Module::KeyVault, KEY_VAULT_VARS),
    ModuleSpec::new(Module::Observability, OBSERVABILITY_VARS),
    ModuleSpec::new(Module::ContainerRegistry, CONTAINER_REGISTRY_VARS)
        .then(PostApply::RefreshTrainJob),
    ModuleSpec::new(Module::DataFactory, DATA_FACTORY_VARS),
    ModuleSpec::new(Module::AdfLinkedServices, ADF_LINKED_SERVICES_VARS),
    ModuleSpec::new(Module::AdfPipelineHttp, ADF_PIPELINE_HTTP_VARS),
    ModuleSpec::new(Module::AdfDataflowBronzeSilver, ADF_DATAFLOW_BRONZE_SILVER_VARS),
    ModuleSpec::new(Module::AdfPipelineSilver, ADF_PIPELINE_SILVER_VARS),
    ModuleSpec::new(Module::AdfDataflowSilverGold, ADF_DATAFLOW_SILVER_GOLD_VARS),
    ModuleSpec::new(Module::AdfPipelineGold, ADF_PIPELINE_GOLD_VARS),
    ModuleSpec::new(Module::AdfPipelineMaster, ADF_PIPELINE_MASTER_VARS),
    ModuleSpec::new(Module::MlWorkspace, ML_WORKSPACE_VARS),
    ModuleSpec::new(Module::AmlStorageAccount, AML_STORAGE_ACCOUNT_VARS),
    ModuleSpec::new(Module::AmlCompute, AML_COMPUTE_VARS),
    ModuleSpec::new(Module::AcrRbac, ACR_RBAC_VARS)
        .reconciling(RoleBinding {
            address: "azurerm_role_assignment.acr_pull",
            principal_var: "compute_principal_id",
            scope_var: "acr_id",
        }),
    ModuleSpec::new(Module::StorageRbac, STORAGE_RBAC_VARS)
        .reconciling(RoleBinding {
            address: "azurerm_role_assignment.storage_blob_contributor",
            principal_var: "compute_principal_id",
            scope_var: "storage_account_id",
        }),
];
