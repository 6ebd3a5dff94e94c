//! Per-module output files.
//!
//! After a module applies, `terraform output -json` is stored verbatim in
//! `<module>/outputs.json`. Later modules read single values from it. A missing
//! file, a missing key, or an entry without a `value` envelope all read as absent.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{DeployError, Result};
use crate::modules::{Module, OUTPUTS_FILE};
use crate::tool_runner::{Invocation, ToolRunner, run_checked};
use crate::tools::terraform::OutputArgs;

/// Parsed contents of one module's output file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSet(Map<String, Value>);

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `terraform output -json` text
    pub fn parse(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(DeployError::control_plane(
                "terraform output -json did not return an object",
            )),
        }
    }

    /// Envelope `value` as `{"value": value}` under `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let mut envelope = Map::new();
        envelope.insert("value".to_string(), value.into());
        self.0.insert(name.into(), Value::Object(envelope));
    }

    /// The enveloped value of `name`, if any
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)?.as_object()?.get("value")
    }

    /// Enveloped value as a non-empty string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str().filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

/// Output files under the Terraform directory
#[derive(Debug, Clone)]
pub struct OutputStore {
    terraform_dir: PathBuf,
}

impl OutputStore {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
        }
    }

    pub fn module_dir(&self, module: Module) -> PathBuf {
        self.terraform_dir.join(module.dir_name())
    }

    pub fn path(&self, module: Module) -> PathBuf {
        self.module_dir(module).join(OUTPUTS_FILE)
    }

    /// Load a module's outputs; unreadable or invalid files count as absent
    pub fn load(&self, module: Module) -> Option<OutputSet> {
        let path = self.path(module);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(module = %module, "Cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        match OutputSet::parse(&text) {
            Ok(set) => Some(set),
            Err(e) => {
                warn!(module = %module, "Ignoring invalid {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Read one output value. Never fails.
    pub fn read(&self, module: Module, key: &str) -> Option<Value> {
        self.load(module)?.get(key).cloned()
    }

    pub fn exists(&self, module: Module) -> bool {
        self.path(module).is_file()
    }

    /// Run `terraform output -json` in the module directory and persist it verbatim.
    pub fn capture(&self, module: Module, runner: &dyn ToolRunner) -> Result<OutputSet> {
        let dir = self.module_dir(module);
        let invocation = Invocation::new(&OutputArgs).in_dir(&dir);
        let output = run_checked(runner, &invocation)?;
        let set = OutputSet::parse(&output.stdout)?;
        self.persist_raw(module, &output.stdout)?;
        info!(module = %module, outputs = set.len(), "Captured outputs");
        Ok(set)
    }

    /// Write raw output text plus a trailing newline
    pub fn persist_raw(&self, module: Module, raw: &str) -> Result<()> {
        let path = self.path(module);
        ensure_parent(&path)?;
        fs::write(&path, format!("{}\n", raw.trim_end()))?;
        debug!(path = %path.display(), "Wrote outputs");
        Ok(())
    }

    /// Write an output set assembled by the orchestrator itself
    pub fn write(&self, module: Module, outputs: &OutputSet) -> Result<()> {
        let path = self.path(module);
        ensure_parent(&path)?;
        fs::write(&path, format!("{}\n", outputs.to_pretty_json()?))?;
        debug!(path = %path.display(), "Wrote outputs");
        Ok(())
    }

    /// Delete a module's output file; returns whether one existed
    pub fn remove(&self, module: Module) -> Result<bool> {
        match fs::remove_file(self.path(module)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
