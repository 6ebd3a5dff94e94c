//! Type-safe tool execution.
//!
//! Every Terraform, az and docker call goes through a [`ToolRunner`]. Production code
//! uses [`ProcessRunner`], which:
//!
//! - resolves the executable once (`TERRAFORM_EXE` / `AZ_EXE` / `DOCKER_EXE` overrides, then PATH)
//! - spawns the child in a new process group, with stdin closed, and registers its PID for cleanup
//! - forwards env-file entries into the child environment
//! - in dry-run mode logs mutating commands instead of running them
//!
//! Tests substitute a scripted runner to observe the exact invocations.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use strum::Display;
use tracing::{debug, info};

use crate::config::Overrides;
use crate::error::{DeployError, Result};
use crate::process_guard::{CommandProcessGroup, RegisteredChild};
use crate::tool_traits::ToolArgs;

/// External executables the orchestrator drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Tool {
    #[strum(serialize = "terraform")]
    Terraform,
    #[strum(serialize = "az")]
    Az,
    #[strum(serialize = "docker")]
    Docker,
}

impl Tool {
    /// Environment variable overriding executable discovery
    pub fn override_var(self) -> &'static str {
        match self {
            Tool::Terraform => "TERRAFORM_EXE",
            Tool::Az => "AZ_EXE",
            Tool::Docker => "DOCKER_EXE",
        }
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// A fully-built tool call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool: Tool,
    pub verb: &'static str,
    pub args: Vec<String>,
    /// Arguments safe to log
    pub display_args: Vec<String>,
    /// Working directory; `None` inherits the orchestrator's
    pub cwd: Option<PathBuf>,
    pub capture: bool,
    pub mutating: bool,
}

impl Invocation {
    pub fn new<T: ToolArgs>(args: &T) -> Self {
        Self {
            tool: args.tool(),
            verb: args.verb(),
            args: args.to_cli_args(),
            display_args: args.display_args(),
            cwd: None,
            capture: args.captures_output(),
            mutating: args.is_mutating(),
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Loggable command line
    pub fn command_line(&self) -> String {
        let mut line = self.tool.to_string();
        for arg in &self.display_args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Arguments joined by spaces, useful for matching in tests
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }
}

// ============================================================================
// Output
// ============================================================================

/// Result of one tool execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Captured standard output (empty when streamed).
    pub stdout: String,
    /// Captured standard error (empty when streamed).
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
    /// True when the command was only logged.
    pub dry_run: bool,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
            ..Self::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            dry_run: true,
            ..Self::default()
        }
    }

    /// Turn a nonzero exit into [`DeployError::ExternalTool`]
    pub fn ensure_success(&self, invocation: &Invocation) -> Result<()> {
        if self.success {
            return Ok(());
        }
        Err(DeployError::ExternalTool {
            tool: invocation.tool,
            verb: invocation.verb,
            dir: invocation.cwd.clone().unwrap_or_else(|| PathBuf::from(".")),
            code: self.exit_code,
            stderr: self.stderr.clone(),
        })
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Executes tool invocations.
///
/// `run` returns `Ok` for any completed process, whatever its exit code; `Err`
/// means the process could not be started at all.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;

    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Run and require exit code 0
pub fn run_checked(runner: &dyn ToolRunner, invocation: &Invocation) -> Result<ToolOutput> {
    let output = runner.run(invocation)?;
    output.ensure_success(invocation)?;
    Ok(output)
}

/// Spawns real processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    terraform: Option<PathBuf>,
    az: Option<PathBuf>,
    docker: Option<PathBuf>,
    child_env: Vec<(String, String)>,
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new(overrides: &Overrides, dry_run: bool) -> Self {
        Self {
            terraform: locate(Tool::Terraform, overrides).ok(),
            az: locate(Tool::Az, overrides).ok(),
            docker: locate(Tool::Docker, overrides).ok(),
            child_env: overrides.child_env().to_vec(),
            dry_run,
        }
    }

    /// Resolved executable, or the reason discovery failed
    pub fn executable(&self, tool: Tool) -> Result<&Path> {
        let found = match tool {
            Tool::Terraform => self.terraform.as_deref(),
            Tool::Az => self.az.as_deref(),
            Tool::Docker => self.docker.as_deref(),
        };
        found.ok_or_else(|| DeployError::ToolNotFound {
            tool,
            detail: format!(
                "install {tool} or set {} to its full path",
                tool.override_var()
            ),
        })
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        if self.dry_run && invocation.mutating {
            info!("[dry-run] would run: {}", invocation.command_line());
            return Ok(ToolOutput::skipped());
        }

        let exe = self.executable(invocation.tool)?;
        match &invocation.cwd {
            Some(dir) => info!("$ {} (in {})", invocation.command_line(), dir.display()),
            None => info!("$ {}", invocation.command_line()),
        }

        let mut cmd = Command::new(exe);
        cmd.args(&invocation.args)
            .envs(self.child_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            // never the terminal's foreground group, so a read would stop the child
            .stdin(Stdio::null())
            .in_new_process_group();
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        if invocation.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let child = cmd.spawn()?;
        let registered = RegisteredChild::new(child.id());
        let output = child.wait_with_output()?;
        drop(registered);

        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
            dry_run: false,
        };
        debug!(
            tool = %invocation.tool,
            verb = invocation.verb,
            code = ?result.exit_code,
            "Tool finished"
        );
        Ok(result)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

// ============================================================================
// Executable discovery
// ============================================================================

/// Find a tool executable: explicit override, then PATH, then known install paths.
pub fn locate(tool: Tool, overrides: &Overrides) -> Result<PathBuf> {
    if let Some(explicit) = overrides.get_explicit(tool.override_var()) {
        let path = PathBuf::from(explicit.trim());
        if path.is_file() {
            return Ok(path);
        }
        return Err(DeployError::ToolNotFound {
            tool,
            detail: format!("{} points at missing {}", tool.override_var(), path.display()),
        });
    }

    if let Ok(found) = which::which(tool.to_string()) {
        return Ok(match tool {
            Tool::Terraform => unwrap_chocolatey_shim(found),
            Tool::Az | Tool::Docker => found,
        });
    }

    fallback_locations(tool)
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| DeployError::ToolNotFound {
            tool,
            detail: "not found on PATH".to_string(),
        })
}

/// The Chocolatey shim swallows signals; prefer the real binary beside it.
fn unwrap_chocolatey_shim(found: PathBuf) -> PathBuf {
    let normalized = found.to_string_lossy().to_ascii_lowercase().replace('\\', "/");
    if normalized.ends_with("/chocolatey/bin/terraform.exe") {
        if let Some(root) = found.parent().and_then(Path::parent) {
            let real = root.join("lib").join("terraform").join("tools").join("terraform.exe");
            if real.is_file() {
                return real;
            }
        }
    }
    found
}

fn fallback_locations(tool: Tool) -> Vec<PathBuf> {
    match tool {
        Tool::Terraform | Tool::Docker => Vec::new(),
        Tool::Az => vec![
            PathBuf::from(r"C:\Program Files\Microsoft SDKs\Azure\CLI2\wbin\az.cmd"),
            PathBuf::from(r"C:\Program Files (x86)\Microsoft SDKs\Azure\CLI2\wbin\az.cmd"),
        ],
    }
}
