//! Orchestrator Tests
//!
//! Deploy and destroy runs against a scripted tool runner. Every test builds a
//! throw-away project tree, so the output and variable files written by the
//! orchestrator can be inspected afterwards.

mod common;

use common::{Project, ScriptedRunner, outputs_json};
use mlops_infra::config::{CI_FLAG, Overrides, SUBSCRIPTION_ID};
use mlops_infra::modules::Module;
use mlops_infra::stage::ModuleStage;
use mlops_infra::tool_runner::ToolOutput;
use mlops_infra::{DeployError, DeployOptions, DestroyOptions, Orchestrator};

const SUBSCRIPTION: &str = "11112222-3333-4444-5555-666677778888";

fn only(module: Module) -> DeployOptions {
    DeployOptions {
        only: Some(module),
        ..DeployOptions::default()
    }
}

// =============================================================================
// Scoped deploys
// =============================================================================

#[test]
fn test_scoped_deploy_runs_exactly_one_module() {
    let project = Project::new();
    project.seed_outputs(
        Module::ResourceGroup,
        &[("resource_group_name", "rg-x"), ("resource_group_location", "eastus2")],
    );
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::Networking)).unwrap();

    assert_eq!(
        runner.terraform_calls(),
        vec![
            ("02_networking".to_string(), "init"),
            ("02_networking".to_string(), "apply"),
            ("02_networking".to_string(), "output"),
        ]
    );
    let tfvars = project.tfvars(Module::Networking);
    assert!(tfvars.starts_with("resource_group_name = \"rg-x\"\nlocation = \"eastus2\"\n"));

    let report = orchestrator.report();
    assert_eq!(report.runs().len(), 1);
    assert_eq!(report.stage_of(Module::Networking), Some(ModuleStage::OutputsCaptured));
}

#[test]
fn test_outputs_are_captured_verbatim() {
    let project = Project::new();
    let json = outputs_json(&[
        ("resource_group_name", "rg-mlops-cancer-dev"),
        ("resource_group_location", "eastus2"),
    ]);
    let runner = ScriptedRunner::new().with_outputs(Module::ResourceGroup, &json);
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::ResourceGroup)).unwrap();

    let written = std::fs::read_to_string(project.store().path(Module::ResourceGroup)).unwrap();
    assert_eq!(written, format!("{}\n", json.trim_end()));
    assert_eq!(
        project.store().read(Module::ResourceGroup, "resource_group_name"),
        Some(serde_json::json!("rg-mlops-cancer-dev"))
    );
}

#[test]
fn test_cold_start_scoped_deploy_names_missing_module() {
    let project = Project::new();
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let err = orchestrator.deploy(&only(Module::StorageAccount)).unwrap_err();

    assert!(err.to_string().contains("01_resource_group"));
    assert!(runner.calls().is_empty());
    assert_eq!(
        orchestrator.report().stage_of(Module::StorageAccount),
        Some(ModuleStage::ConfigFailed)
    );
}

// =============================================================================
// Backend wiring
// =============================================================================

#[test]
fn test_each_module_gets_its_own_state_key() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::KeyVault)).unwrap();

    let init = runner
        .calls()
        .into_iter()
        .find(|inv| inv.verb == "init")
        .unwrap();
    assert_eq!(
        init.args,
        vec![
            "init",
            "-input=false",
            "-upgrade",
            "-reconfigure",
            "-backend-config=resource_group_name=rg-mlops-cancer-tfstate-778888",
            "-backend-config=storage_account_name=stmlopstfstate778888",
            "-backend-config=container_name=tfstate",
            "-backend-config=key=04_key_vault.tfstate",
        ]
    );
}

#[test]
fn test_local_state_is_migrated() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    std::fs::write(project.layout.local_state_path(Module::Networking), "{}").unwrap();
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::Networking)).unwrap();

    let init = runner.calls().into_iter().find(|inv| inv.verb == "init").unwrap();
    assert_eq!(&init.args[..5], ["init", "-input=false", "-upgrade", "-migrate-state", "-force-copy"]);
    assert!(init.args.contains(&"-backend-config=key=02_networking.tfstate".to_string()));

    let apply = runner.calls().into_iter().find(|inv| inv.verb == "apply").unwrap();
    assert!(apply.args.contains(&"-input=false".to_string()));
}

#[test]
fn test_ci_without_backend_names_is_fatal() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new()
        .with(CI_FLAG, "true")
        .with(SUBSCRIPTION_ID, SUBSCRIPTION);

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let err = orchestrator.deploy(&only(Module::Networking)).unwrap_err();

    assert!(matches!(err, DeployError::Config(_)));
    assert!(runner.terraform_calls().is_empty());
    assert_eq!(
        orchestrator.report().stage_of(Module::Networking),
        Some(ModuleStage::ConfigFailed)
    );
}

#[test]
fn test_ci_plan_skips_backend_bootstrap() {
    let project = Project::new();
    let runner = ScriptedRunner::new().on_verb("apply", ToolOutput::failed(1, "stop here"));
    let overrides = Overrides::new()
        .with(CI_FLAG, "true")
        .with("BACKEND_RESOURCE_GROUP_NAME", "rg-state")
        .with("BACKEND_STORAGE_ACCOUNT_NAME", "ststate");

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    assert!(orchestrator.deploy(&DeployOptions::default()).is_err());

    assert_eq!(orchestrator.report().runs()[0].module(), Module::ResourceGroup);
    assert_eq!(orchestrator.report().stage_of(Module::Backend), None);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_apply_failure_aborts_the_run() {
    let project = Project::new();
    let runner = ScriptedRunner::new().on_module(
        Module::Backend,
        "apply",
        ToolOutput::failed(1, "Error: storage account name already taken"),
    );
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let err = orchestrator.deploy(&DeployOptions::default()).unwrap_err();

    match err {
        DeployError::ExternalTool { verb, code, stderr, .. } => {
            assert_eq!(verb, "apply");
            assert_eq!(code, Some(1));
            assert!(stderr.contains("already taken"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let report = orchestrator.report();
    assert_eq!(report.runs().len(), 1);
    assert_eq!(report.failed().map(|run| run.module()), Some(Module::Backend));
    assert_eq!(report.stage_of(Module::Backend), Some(ModuleStage::ApplyFailed));
    assert!(!project.store().exists(Module::Backend));
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn test_role_assignment_is_imported_before_apply() {
    let project = Project::new();
    project.seed_outputs(Module::ContainerRegistry, &[("acr_id", "/subscriptions/s/acr")]);
    project.seed_outputs(Module::AmlCompute, &[("compute_principal_id", "principal-1")]);
    let runner = ScriptedRunner::new()
        .on_verb("role assignment list", ToolOutput::ok("/subscriptions/s/ra/1\n"));
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::AcrRbac)).unwrap();

    let verbs: Vec<&str> = runner.calls().iter().map(|inv| inv.verb).collect();
    assert_eq!(
        verbs,
        vec!["init", "state list", "role assignment list", "import", "apply", "output"]
    );
    let lookup = runner
        .calls()
        .into_iter()
        .find(|inv| inv.verb == "role assignment list")
        .unwrap();
    assert!(lookup.joined_args().contains("--assignee principal-1 --scope /subscriptions/s/acr"));
    assert!(orchestrator.report().runs()[0].visited(ModuleStage::Reconciled));
}

// =============================================================================
// Trailing actions
// =============================================================================

#[test]
fn test_data_factory_deploy_starts_master_pipeline() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    project.seed_outputs(Module::AdfPipelineMaster, &[("pipeline_name", "pl-master")]);
    let runner = ScriptedRunner::new().with_outputs(
        Module::DataFactory,
        &outputs_json(&[("data_factory_name", "adf-x"), ("data_factory_id", "/adf/x")]),
    );
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::DataFactory)).unwrap();
    assert_eq!(runner.count_verb("datafactory pipeline create-run"), 1);
}

#[test]
fn test_skip_adf_run() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    project.seed_outputs(Module::DataFactory, &[("data_factory_name", "adf-x")]);
    project.seed_outputs(Module::AdfPipelineMaster, &[("pipeline_name", "pl-master")]);
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DeployOptions {
        skip_adf_run: true,
        ..only(Module::DataFactory)
    };
    orchestrator.deploy(&options).unwrap();
    assert_eq!(runner.count_verb("datafactory pipeline create-run"), 0);
}

#[test]
fn test_registry_deploy_refreshes_train_job() {
    let project = Project::new();
    project.seed_outputs(Module::ResourceGroup, &[("resource_group_name", "rg-x")]);
    let job = project.layout.train_job_path();
    std::fs::create_dir_all(job.parent().unwrap()).unwrap();
    std::fs::write(&job, "environment:\n  image: placeholder\ncompute: azureml:old\n").unwrap();

    let runner = ScriptedRunner::new().with_outputs(
        Module::ContainerRegistry,
        &outputs_json(&[("acr_login_server", "acrx.azurecr.io"), ("acr_name", "acrx")]),
    );
    let overrides = Overrides::new().with("AML_TRAIN_IMAGE_TAG", "1.2.3");

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::ContainerRegistry)).unwrap();

    assert_eq!(
        std::fs::read_to_string(&job).unwrap(),
        "environment:\n  image: acrx.azurecr.io/mlops-cancer-train:1.2.3\ncompute: azureml:cpu-cluster\n"
    );
}

#[test]
fn test_job_config_only_runs_no_terraform() {
    let project = Project::new();
    project.seed_outputs(Module::ContainerRegistry, &[("acr_login_server", "acrx.azurecr.io")]);
    let job = project.layout.train_job_path();
    std::fs::create_dir_all(job.parent().unwrap()).unwrap();
    std::fs::write(&job, "image: x\n").unwrap();
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DeployOptions {
        job_config_only: true,
        ..DeployOptions::default()
    };
    orchestrator.deploy(&options).unwrap();

    assert!(runner.calls().is_empty());
    assert!(std::fs::read_to_string(&job).unwrap().contains("acrx.azurecr.io"));
}

#[test]
fn test_docker_builds_push_after_registry_login() {
    let project = Project::new();
    project.seed_outputs(
        Module::ContainerRegistry,
        &[("acr_login_server", "acrx.azurecr.io"), ("acr_name", "acrx")],
    );
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new().with("AML_TRAIN_IMAGE_TAG", "1.2.3");

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DeployOptions {
        docker_build_train_image: true,
        docker_build_infer_image: true,
        ..DeployOptions::default()
    };
    orchestrator.deploy(&options).unwrap();

    let calls: Vec<(String, String)> = runner
        .calls()
        .iter()
        .map(|inv| (inv.tool.to_string(), inv.joined_args()))
        .collect();
    let expected = [
        ("docker", "build -t acrx.azurecr.io/mlops-cancer-train:1.2.3 -f docker/train/Dockerfile ."),
        ("az", "acr login --name acrx"),
        ("docker", "push acrx.azurecr.io/mlops-cancer-train:1.2.3"),
        ("docker", "build -t acrx.azurecr.io/mlops-cancer-infer:1.2.3 -f docker/inference/Dockerfile ."),
        ("az", "acr login --name acrx"),
        ("docker", "push acrx.azurecr.io/mlops-cancer-infer:1.2.3"),
    ];
    assert_eq!(calls.len(), expected.len());
    for ((tool, args), (want_tool, want_args)) in calls.iter().zip(expected) {
        assert_eq!(tool, want_tool);
        assert_eq!(args, want_args);
    }
    assert!(
        runner
            .calls()
            .iter()
            .all(|inv| inv.cwd.as_deref() == Some(project.layout.root.as_path()))
    );
}

#[test]
fn test_docker_build_without_registry_outputs_fails() {
    let project = Project::new();
    project.seed_outputs(Module::ContainerRegistry, &[("acr_login_server", "acrx.azurecr.io")]);
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DeployOptions {
        docker_build_infer_image: true,
        ..DeployOptions::default()
    };
    let err = orchestrator.deploy(&options).unwrap_err();

    assert!(matches!(err, DeployError::Config(_)));
    assert!(err.to_string().contains("ACR outputs not found"));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_failed_image_build_is_not_pushed() {
    let project = Project::new();
    project.seed_outputs(
        Module::ContainerRegistry,
        &[("acr_login_server", "acrx.azurecr.io"), ("acr_name", "acrx")],
    );
    let runner = ScriptedRunner::new().on_verb("build", ToolOutput::failed(1, "build failed"));
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DeployOptions {
        docker_build_train_image: true,
        ..DeployOptions::default()
    };
    assert!(orchestrator.deploy(&options).is_err());
    assert_eq!(runner.count_verb("build"), 1);
    assert_eq!(runner.count_verb("acr login"), 0);
    assert_eq!(runner.count_verb("push"), 0);
}

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn test_dry_run_writes_tfvars_but_not_outputs() {
    let project = Project::new();
    let runner = ScriptedRunner::dry_run();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.deploy(&only(Module::ResourceGroup)).unwrap();

    assert!(project.tfvars(Module::ResourceGroup).contains("location = \"eastus2\""));
    assert!(!project.store().exists(Module::ResourceGroup));
    assert_eq!(runner.count_verb("output"), 0);
    assert_eq!(
        orchestrator.report().stage_of(Module::ResourceGroup),
        Some(ModuleStage::Applied)
    );
}

// =============================================================================
// Destroy
// =============================================================================

#[test]
fn test_destroy_skips_modules_with_missing_outputs() {
    let project = Project::new();
    project.seed_outputs(
        Module::ResourceGroup,
        &[("resource_group_name", "rg-x"), ("resource_group_location", "eastus2")],
    );
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.destroy(&DestroyOptions::default()).unwrap();

    let report = orchestrator.report();
    assert_eq!(report.stage_of(Module::AcrRbac), Some(ModuleStage::Skipped));
    assert_eq!(report.stage_of(Module::AdfPipelineMaster), Some(ModuleStage::Skipped));
    assert_eq!(report.stage_of(Module::Networking), Some(ModuleStage::OutputsRemoved));
    assert_eq!(report.stage_of(Module::ResourceGroup), Some(ModuleStage::OutputsRemoved));
    assert_eq!(report.stage_of(Module::Backend), None);
    assert!(report.succeeded());

    // the resource group went last and its outputs are gone
    assert_eq!(report.runs().last().map(|run| run.module()), Some(Module::ResourceGroup));
    assert!(!project.store().exists(Module::ResourceGroup));
    assert_eq!(runner.count_verb("apply"), 0);
}

#[test]
fn test_destroy_skip_is_not_an_error() {
    let project = Project::new();
    project.seed_outputs(Module::ContainerRegistry, &[("acr_id", "/acr")]);
    project.seed_outputs(Module::AmlCompute, &[("compute_principal_id", "p")]);
    project.store().remove(Module::AmlCompute).unwrap();
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new();

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    orchestrator.destroy_module(Module::AcrRbac).unwrap();

    assert_eq!(orchestrator.report().stage_of(Module::AcrRbac), Some(ModuleStage::Skipped));
    assert!(runner.calls().is_empty());
    assert!(project.store().exists(Module::ContainerRegistry));
}

#[test]
fn test_destroy_backend_runs_last_with_local_state() {
    let project = Project::new();
    let runner = ScriptedRunner::new();
    let overrides = Overrides::new().with(SUBSCRIPTION_ID, SUBSCRIPTION);

    let mut orchestrator = Orchestrator::new(&project.layout, &overrides, &runner);
    let options = DestroyOptions {
        only: Some(Module::Backend),
        include_backend: true,
    };
    orchestrator.destroy(&options).unwrap();

    let init = runner.calls().into_iter().find(|inv| inv.verb == "init").unwrap();
    assert_eq!(init.args, vec!["init", "-input=false", "-upgrade"]);
    assert_eq!(runner.count_verb("destroy"), 1);
    assert!(project.tfvars(Module::Backend).contains("storage_account_name = \"stmlopstfstate778888\""));
}
