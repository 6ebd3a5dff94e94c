//! Shared fixtures: a throw-away project tree and a scripted tool runner.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;

use mlops_infra::modules::{Module, ProjectLayout};
use mlops_infra::outputs::{OutputSet, OutputStore};
use mlops_infra::tool_runner::{Invocation, ToolOutput, ToolRunner};
use mlops_infra::Result;
use tempfile::TempDir;

type Matcher = Box<dyn Fn(&Invocation) -> bool>;

/// Records every invocation and answers from a list of rules.
///
/// The first matching rule wins; unmatched calls succeed with empty output
/// (an empty object for `terraform output -json`).
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(Matcher, ToolOutput)>,
    calls: RefCell<Vec<Invocation>>,
    dry_run: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn on(mut self, matcher: impl Fn(&Invocation) -> bool + 'static, output: ToolOutput) -> Self {
        self.rules.push((Box::new(matcher), output));
        self
    }

    /// Answer `verb` in any directory
    pub fn on_verb(self, verb: &'static str, output: ToolOutput) -> Self {
        self.on(move |inv| inv.verb == verb, output)
    }

    /// Answer `verb` only inside `module`'s directory
    pub fn on_module(self, module: Module, verb: &'static str, output: ToolOutput) -> Self {
        let dir = module.dir_name();
        self.on(
            move |inv| inv.verb == verb && inv.cwd.as_ref().is_some_and(|cwd| cwd.ends_with(&dir)),
            output,
        )
    }

    /// `terraform output -json` of `module` returns `json`
    pub fn with_outputs(self, module: Module, json: &str) -> Self {
        self.on_module(module, "output", ToolOutput::ok(json))
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// `(module dir, verb)` of every Terraform call, in order
    pub fn terraform_calls(&self) -> Vec<(String, &'static str)> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.tool == mlops_infra::Tool::Terraform)
            .map(|inv| {
                let dir = inv
                    .cwd
                    .as_ref()
                    .and_then(|cwd| cwd.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (dir, inv.verb)
            })
            .collect()
    }

    pub fn count_verb(&self, verb: &str) -> usize {
        self.calls.borrow().iter().filter(|inv| inv.verb == verb).count()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        if self.dry_run && invocation.mutating {
            return Ok(ToolOutput::skipped());
        }
        Ok(self
            .rules
            .iter()
            .find(|(matcher, _)| matcher(invocation))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| {
                if invocation.verb == "output" {
                    ToolOutput::ok("{}")
                } else {
                    ToolOutput::ok("")
                }
            }))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A project tree with every module directory present
pub struct Project {
    pub dir: TempDir,
    pub layout: ProjectLayout,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        for module in Module::all() {
            fs::create_dir_all(layout.module_dir(module)).expect("module dir");
        }
        Self { dir, layout }
    }

    pub fn store(&self) -> OutputStore {
        OutputStore::new(&self.layout.terraform_dir)
    }

    /// Pretend `module` was deployed with these string outputs
    pub fn seed_outputs(&self, module: Module, pairs: &[(&str, &str)]) {
        let mut set = OutputSet::new();
        for (key, value) in pairs {
            set.insert(*key, *value);
        }
        self.store().write(module, &set).expect("write outputs");
    }

    pub fn tfvars(&self, module: Module) -> String {
        fs::read_to_string(self.layout.tfvars_path(module)).unwrap_or_default()
    }
}

/// Output JSON in `terraform output -json` shape
pub fn outputs_json(pairs: &[(&str, &str)]) -> String {
    let mut set = OutputSet::new();
    for (key, value) in pairs {
        set.insert(*key, *value);
    }
    set.to_pretty_json().expect("serialize outputs")
}
