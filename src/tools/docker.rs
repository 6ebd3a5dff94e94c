//! Type-safe arguments for local image builds pushed to the registry.
//!
//! Both verbs change state outside the process (local image cache, remote
//! registry) so dry runs skip them.

use std::path::PathBuf;

use crate::tool_runner::Tool;
use crate::tool_traits::ToolArgs;

/// Arguments for `docker build -t <tag> -f <dockerfile> .`
#[derive(Debug, Clone)]
pub struct DockerBuildArgs {
    /// Fully qualified `registry/repository:tag`
    pub tag: String,
    /// Dockerfile path relative to the build context
    pub dockerfile: PathBuf,
}

impl ToolArgs for DockerBuildArgs {
    fn tool(&self) -> Tool {
        Tool::Docker
    }

    fn verb(&self) -> &'static str {
        "build"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "build".to_string(),
            "-t".to_string(),
            self.tag.clone(),
            "-f".to_string(),
            self.dockerfile.display().to_string(),
            ".".to_string(),
        ]
    }
}

/// Arguments for `docker push <image>`
#[derive(Debug, Clone)]
pub struct DockerPushArgs {
    pub image: String,
}

impl ToolArgs for DockerPushArgs {
    fn tool(&self) -> Tool {
        Tool::Docker
    }

    fn verb(&self) -> &'static str {
        "push"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["push".to_string(), self.image.clone()]
    }
}
