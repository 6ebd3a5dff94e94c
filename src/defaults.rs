//! Catalogue of recognized settings and their built-in defaults.
//!
//! Each constant names the environment/`.env` key that overrides it. A `None`
//! string default means the Terraform module generates the name from its prefix.

use crate::config::KeySpec;

// ============================================================================
// 00 Backend
// ============================================================================

pub const BACKEND_RESOURCE_GROUP_NAME: KeySpec =
    KeySpec::string("BACKEND_RESOURCE_GROUP_NAME", None);
pub const BACKEND_RESOURCE_GROUP_NAME_PREFIX: KeySpec =
    KeySpec::string("BACKEND_RESOURCE_GROUP_NAME_PREFIX", Some("rg-mlops-cancer-tfstate"));
pub const BACKEND_STORAGE_ACCOUNT_NAME: KeySpec =
    KeySpec::string("BACKEND_STORAGE_ACCOUNT_NAME", None);
pub const BACKEND_STORAGE_ACCOUNT_NAME_PREFIX: KeySpec =
    KeySpec::string("BACKEND_STORAGE_ACCOUNT_NAME_PREFIX", Some("stmlopstfstate"));
pub const BACKEND_CONTAINER_NAME: KeySpec =
    KeySpec::string("BACKEND_CONTAINER_NAME", Some("tfstate"));

// ============================================================================
// 01 Resource group / 02 Networking
// ============================================================================

pub const RESOURCE_GROUP_NAME: KeySpec = KeySpec::string("RESOURCE_GROUP_NAME", None);
pub const RESOURCE_GROUP_NAME_PREFIX: KeySpec =
    KeySpec::string("RESOURCE_GROUP_NAME_PREFIX", Some("rg-mlops-cancer"));
pub const LOCATION: KeySpec = KeySpec::string("LOCATION", Some("eastus2"));

pub const VNET_NAME: KeySpec = KeySpec::string("VNET_NAME", None);
pub const VNET_NAME_PREFIX: KeySpec = KeySpec::string("VNET_NAME_PREFIX", Some("vnet-mlops-cancer"));
pub const ADDRESS_SPACE: KeySpec = KeySpec::list("ADDRESS_SPACE", &["10.40.0.0/16"]);
pub const SUBNET_PREFIXES: KeySpec = KeySpec::map(
    "SUBNET_PREFIXES",
    &[
        ("default", "10.40.1.0/24"),
        ("private_endpoints", "10.40.2.0/24"),
        ("aml", "10.40.3.0/24"),
        ("adf", "10.40.4.0/24"),
    ],
);

// ============================================================================
// 03 Storage account
// ============================================================================

pub const STORAGE_ACCOUNT_NAME: KeySpec = KeySpec::string("STORAGE_ACCOUNT_NAME", None);
pub const STORAGE_ACCOUNT_NAME_PREFIX: KeySpec =
    KeySpec::string("STORAGE_ACCOUNT_NAME_PREFIX", Some("stmlopscancer"));
pub const ACCOUNT_REPLICATION_TYPE: KeySpec =
    KeySpec::string("ACCOUNT_REPLICATION_TYPE", Some("LRS"));
pub const ACCOUNT_TIER: KeySpec = KeySpec::string("ACCOUNT_TIER", Some("Standard"));
pub const PUBLIC_NETWORK_ACCESS_ENABLED: KeySpec =
    KeySpec::boolean("PUBLIC_NETWORK_ACCESS_ENABLED", true);
pub const IS_HNS_ENABLED: KeySpec = KeySpec::boolean("IS_HNS_ENABLED", true);
pub const CONTAINER_NAMES: KeySpec =
    KeySpec::list("CONTAINER_NAMES", &["bronze", "silver", "gold"]);
pub const STORAGE_BLOB_CONTRIBUTOR_OBJECT_ID: KeySpec =
    KeySpec::string("STORAGE_BLOB_CONTRIBUTOR_OBJECT_ID", None);

// ============================================================================
// 04 Key vault
// ============================================================================

pub const KEY_VAULT_NAME: KeySpec = KeySpec::string("KEY_VAULT_NAME", None);
pub const KEY_VAULT_NAME_PREFIX: KeySpec =
    KeySpec::string("KEY_VAULT_NAME_PREFIX", Some("kvmlopscancer"));
pub const KEY_VAULT_SKU_NAME: KeySpec = KeySpec::string("KEY_VAULT_SKU_NAME", Some("standard"));
pub const KEY_VAULT_ENABLE_RBAC: KeySpec = KeySpec::boolean("KEY_VAULT_ENABLE_RBAC", true);
pub const KEY_VAULT_PUBLIC_NETWORK_ACCESS_ENABLED: KeySpec =
    KeySpec::boolean("KEY_VAULT_PUBLIC_NETWORK_ACCESS_ENABLED", true);
pub const KEY_VAULT_SOFT_DELETE_RETENTION_DAYS: KeySpec =
    KeySpec::int("KEY_VAULT_SOFT_DELETE_RETENTION_DAYS", 7);
pub const KEY_VAULT_PURGE_PROTECTION_ENABLED: KeySpec =
    KeySpec::boolean("KEY_VAULT_PURGE_PROTECTION_ENABLED", false);
pub const KEY_VAULT_ADMIN_OBJECT_ID: KeySpec = KeySpec::string("KEY_VAULT_ADMIN_OBJECT_ID", None);

// ============================================================================
// 05 Observability / 06 Container registry
// ============================================================================

pub const LOG_ANALYTICS_NAME: KeySpec = KeySpec::string("LOG_ANALYTICS_NAME", None);
pub const LOG_ANALYTICS_NAME_PREFIX: KeySpec =
    KeySpec::string("LOG_ANALYTICS_NAME_PREFIX", Some("law-mlops-cancer"));
pub const LOG_ANALYTICS_SKU: KeySpec = KeySpec::string("LOG_ANALYTICS_SKU", Some("PerGB2018"));
pub const LOG_ANALYTICS_RETENTION_IN_DAYS: KeySpec =
    KeySpec::int("LOG_ANALYTICS_RETENTION_IN_DAYS", 30);
pub const APP_INSIGHTS_NAME: KeySpec = KeySpec::string("APP_INSIGHTS_NAME", None);
pub const APP_INSIGHTS_NAME_PREFIX: KeySpec =
    KeySpec::string("APP_INSIGHTS_NAME_PREFIX", Some("appi-mlops-cancer"));
pub const APP_INSIGHTS_APPLICATION_TYPE: KeySpec =
    KeySpec::string("APP_INSIGHTS_APPLICATION_TYPE", Some("web"));

pub const ACR_NAME: KeySpec = KeySpec::string("ACR_NAME", None);
pub const ACR_NAME_PREFIX: KeySpec = KeySpec::string("ACR_NAME_PREFIX", Some("acrmlopscancer"));
pub const ACR_SKU: KeySpec = KeySpec::string("ACR_SKU", Some("Basic"));
pub const ACR_ADMIN_ENABLED: KeySpec = KeySpec::boolean("ACR_ADMIN_ENABLED", true);
pub const ACR_PUBLIC_NETWORK_ACCESS_ENABLED: KeySpec =
    KeySpec::boolean("ACR_PUBLIC_NETWORK_ACCESS_ENABLED", true);

// ============================================================================
// 07-14 Data Factory
// ============================================================================

pub const DATA_FACTORY_NAME: KeySpec = KeySpec::string("DATA_FACTORY_NAME", None);
pub const DATA_FACTORY_NAME_PREFIX: KeySpec =
    KeySpec::string("DATA_FACTORY_NAME_PREFIX", Some("adf-mlops-cancer"));

pub const HTTP_LINKED_SERVICE_NAME: KeySpec = KeySpec::string("HTTP_LINKED_SERVICE_NAME", None);
pub const HTTP_LINKED_SERVICE_NAME_PREFIX: KeySpec =
    KeySpec::string("HTTP_LINKED_SERVICE_NAME_PREFIX", Some("ls-http-mlops-cancer"));
pub const HTTP_BASE_URL: KeySpec =
    KeySpec::string("HTTP_BASE_URL", Some("https://raw.githubusercontent.com"));
pub const HTTP_AUTHENTICATION_TYPE: KeySpec =
    KeySpec::string("HTTP_AUTHENTICATION_TYPE", Some("Anonymous"));
pub const HTTP_ENABLE_CERTIFICATE_VALIDATION: KeySpec =
    KeySpec::boolean("HTTP_ENABLE_CERTIFICATE_VALIDATION", true);
pub const INTEGRATION_RUNTIME_NAME: KeySpec = KeySpec::string("INTEGRATION_RUNTIME_NAME", None);
pub const ADLS_LINKED_SERVICE_NAME: KeySpec = KeySpec::string("ADLS_LINKED_SERVICE_NAME", None);
pub const ADLS_LINKED_SERVICE_NAME_PREFIX: KeySpec =
    KeySpec::string("ADLS_LINKED_SERVICE_NAME_PREFIX", Some("ls-adls-mlops-cancer"));
pub const LINKED_SERVICE_DESCRIPTION: KeySpec = KeySpec::string(
    "LINKED_SERVICE_DESCRIPTION",
    Some("Linked services for HTTP source and ADLS Gen2 sink"),
);

pub const ADF_PIPELINE_NAME: KeySpec = KeySpec::string("ADF_PIPELINE_NAME", None);
pub const ADF_PIPELINE_NAME_PREFIX: KeySpec =
    KeySpec::string("ADF_PIPELINE_NAME_PREFIX", Some("pl-mlops-cancer-http"));
pub const HTTP_DATASET_NAME: KeySpec = KeySpec::string("HTTP_DATASET_NAME", None);
pub const HTTP_DATASET_NAME_PREFIX: KeySpec =
    KeySpec::string("HTTP_DATASET_NAME_PREFIX", Some("ds_http_mlopscancer"));
pub const SINK_DATASET_NAME: KeySpec = KeySpec::string("SINK_DATASET_NAME", None);
pub const SINK_DATASET_NAME_PREFIX: KeySpec =
    KeySpec::string("SINK_DATASET_NAME_PREFIX", Some("ds_adls_bronze_mlopscancer"));
pub const HTTP_RELATIVE_URL: KeySpec = KeySpec::string(
    "HTTP_RELATIVE_URL",
    Some("Ch3rry-Pi3-AI/MLOps-Cancer-Diagnosis/refs/heads/main/data/breast-cancer.data"),
);
pub const SINK_FILE_SYSTEM: KeySpec = KeySpec::string("SINK_FILE_SYSTEM", Some("bronze"));
pub const SINK_FOLDER: KeySpec = KeySpec::string("SINK_FOLDER", Some("breast_cancer/raw"));
pub const SINK_FILE: KeySpec = KeySpec::string("SINK_FILE", Some("breast_cancer.csv"));

pub const ADF_DATAFLOW_NAME: KeySpec = KeySpec::string("ADF_DATAFLOW_NAME", None);
pub const ADF_DATAFLOW_NAME_PREFIX: KeySpec =
    KeySpec::string("ADF_DATAFLOW_NAME_PREFIX", Some("df-mlops-cancer-bronze-silver"));
pub const BRONZE_SOURCE_DATASET_NAME: KeySpec =
    KeySpec::string("BRONZE_SOURCE_DATASET_NAME", None);
pub const BRONZE_SOURCE_DATASET_NAME_PREFIX: KeySpec =
    KeySpec::string("BRONZE_SOURCE_DATASET_NAME_PREFIX", Some("ds_bronze_mlopscancer"));
pub const BRONZE_SOURCE_CONTAINER: KeySpec =
    KeySpec::string("BRONZE_SOURCE_CONTAINER", Some("bronze"));
pub const BRONZE_SOURCE_FOLDER: KeySpec =
    KeySpec::string("BRONZE_SOURCE_FOLDER", Some("breast_cancer/raw"));
pub const BRONZE_SOURCE_FILE: KeySpec =
    KeySpec::string("BRONZE_SOURCE_FILE", Some("breast_cancer.csv"));
pub const SILVER_SINK_CONTAINER: KeySpec = KeySpec::string("SILVER_SINK_CONTAINER", Some("silver"));
pub const SILVER_SINK_FOLDER: KeySpec =
    KeySpec::string("SILVER_SINK_FOLDER", Some("breast_cancer/clean"));
pub const SILVER_SINK_FORMAT: KeySpec = KeySpec::string("SILVER_SINK_FORMAT", Some("parquet"));

pub const ADF_SILVER_PIPELINE_NAME: KeySpec = KeySpec::string("ADF_SILVER_PIPELINE_NAME", None);
pub const ADF_SILVER_PIPELINE_NAME_PREFIX: KeySpec = KeySpec::string(
    "ADF_SILVER_PIPELINE_NAME_PREFIX",
    Some("pl-mlops-cancer-silver-dataflow"),
);
pub const ADF_DATAFLOW_COMPUTE_TYPE: KeySpec =
    KeySpec::string("ADF_DATAFLOW_COMPUTE_TYPE", Some("General"));
pub const ADF_DATAFLOW_CORE_COUNT: KeySpec = KeySpec::int("ADF_DATAFLOW_CORE_COUNT", 8);
pub const ADF_DATAFLOW_TRACE_LEVEL: KeySpec =
    KeySpec::string("ADF_DATAFLOW_TRACE_LEVEL", Some("None"));

pub const ADF_GOLD_DATAFLOW_NAME: KeySpec = KeySpec::string("ADF_GOLD_DATAFLOW_NAME", None);
pub const ADF_GOLD_DATAFLOW_NAME_PREFIX: KeySpec =
    KeySpec::string("ADF_GOLD_DATAFLOW_NAME_PREFIX", Some("df-mlops-cancer-silver-gold"));
pub const SILVER_SOURCE_DATASET_NAME: KeySpec =
    KeySpec::string("SILVER_SOURCE_DATASET_NAME", None);
pub const SILVER_SOURCE_DATASET_NAME_PREFIX: KeySpec =
    KeySpec::string("SILVER_SOURCE_DATASET_NAME_PREFIX", Some("ds_silver_mlopscancer"));
pub const SILVER_SOURCE_CONTAINER: KeySpec =
    KeySpec::string("SILVER_SOURCE_CONTAINER", Some("silver"));
pub const SILVER_SOURCE_FOLDER: KeySpec =
    KeySpec::string("SILVER_SOURCE_FOLDER", Some("breast_cancer/clean"));
pub const GOLD_SINK_CONTAINER: KeySpec = KeySpec::string("GOLD_SINK_CONTAINER", Some("gold"));
pub const GOLD_SINK_FOLDER: KeySpec =
    KeySpec::string("GOLD_SINK_FOLDER", Some("breast_cancer/features"));
pub const GOLD_SINK_FORMAT: KeySpec = KeySpec::string("GOLD_SINK_FORMAT", Some("parquet"));

pub const ADF_GOLD_PIPELINE_NAME: KeySpec = KeySpec::string("ADF_GOLD_PIPELINE_NAME", None);
pub const ADF_GOLD_PIPELINE_NAME_PREFIX: KeySpec = KeySpec::string(
    "ADF_GOLD_PIPELINE_NAME_PREFIX",
    Some("pl-mlops-cancer-gold-dataflow"),
);
pub const ADF_MASTER_PIPELINE_NAME: KeySpec = KeySpec::string("ADF_MASTER_PIPELINE_NAME", None);
pub const ADF_MASTER_PIPELINE_NAME_PREFIX: KeySpec =
    KeySpec::string("ADF_MASTER_PIPELINE_NAME_PREFIX", Some("pl-mlops-cancer-master"));

// ============================================================================
// 15-17 Machine learning
// ============================================================================

pub const AML_WORKSPACE_NAME: KeySpec = KeySpec::string("AML_WORKSPACE_NAME", None);
pub const AML_WORKSPACE_NAME_PREFIX: KeySpec =
    KeySpec::string("AML_WORKSPACE_NAME_PREFIX", Some("mlw-mlops-cancer"));
pub const AML_PUBLIC_NETWORK_ACCESS_ENABLED: KeySpec =
    KeySpec::boolean("AML_PUBLIC_NETWORK_ACCESS_ENABLED", true);

pub const AML_STORAGE_ACCOUNT_NAME: KeySpec = KeySpec::string("AML_STORAGE_ACCOUNT_NAME", None);
pub const AML_STORAGE_ACCOUNT_NAME_PREFIX: KeySpec =
    KeySpec::string("AML_STORAGE_ACCOUNT_NAME_PREFIX", Some("stmlopscancerml"));
pub const AML_STORAGE_ACCOUNT_REPLICATION_TYPE: KeySpec =
    KeySpec::string("AML_STORAGE_ACCOUNT_REPLICATION_TYPE", Some("LRS"));
pub const AML_STORAGE_ACCOUNT_TIER: KeySpec =
    KeySpec::string("AML_STORAGE_ACCOUNT_TIER", Some("Standard"));
pub const AML_STORAGE_PUBLIC_NETWORK_ACCESS_ENABLED: KeySpec =
    KeySpec::boolean("AML_STORAGE_PUBLIC_NETWORK_ACCESS_ENABLED", true);

pub const AML_COMPUTE_NAME: KeySpec = KeySpec::string("AML_COMPUTE_NAME", Some("cpu-cluster"));
pub const AML_TRAIN_IMAGE_TAG: KeySpec = KeySpec::string("AML_TRAIN_IMAGE_TAG", Some("0.1.0"));
pub const AML_COMPUTE_VM_SIZE: KeySpec =
    KeySpec::string("AML_COMPUTE_VM_SIZE", Some("Standard_DS3_v2"));
pub const AML_COMPUTE_VM_PRIORITY: KeySpec =
    KeySpec::string("AML_COMPUTE_VM_PRIORITY", Some("Dedicated"));
pub const AML_COMPUTE_MIN_INSTANCES: KeySpec = KeySpec::int("AML_COMPUTE_MIN_INSTANCES", 0);
pub const AML_COMPUTE_MAX_INSTANCES: KeySpec = KeySpec::int("AML_COMPUTE_MAX_INSTANCES", 2);
pub const AML_COMPUTE_IDLE_TIME: KeySpec = KeySpec::string("AML_COMPUTE_IDLE_TIME", Some("PT2M"));
