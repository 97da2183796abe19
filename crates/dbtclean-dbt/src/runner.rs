//! dbt project runner
//!
//! The manifest reader never talks to dbt directly; it asks a
//! [`ProjectRunner`] for the JSON lines of `dbt ls`. [`DbtCommandRunner`]
//! shells out to the dbt executable, [`StaticRunner`] serves canned output
//! for tests.

use crate::definition::{ManifestError, ResourceType};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Something that can list the resources of a dbt project
#[async_trait::async_trait]
pub trait ProjectRunner: Send + Sync {
    /// Runner name for logging
    fn name(&self) -> &'static str;

    /// List all resources of one type, one JSON document per entry
    async fn list(&self, resource_type: ResourceType) -> Result<Vec<String>, ManifestError>;
}

/// Runs `dbt ls -q --output json --resource-type <type>`
#[derive(Debug, Clone)]
pub struct DbtCommandRunner {
    executable: String,
    project_dir: Option<PathBuf>,
    profiles_dir: Option<PathBuf>,
    target: Option<String>,
}

impl DbtCommandRunner {
    /// Create a runner for the given dbt executable
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            project_dir: None,
            profiles_dir: None,
            target: None,
        }
    }

    /// Pass `--project-dir`
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// Pass `--profiles-dir`
    pub fn with_profiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profiles_dir = Some(dir.into());
        self
    }

    /// Pass `--target`
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Arguments for one listing invocation
    pub fn args(&self, resource_type: ResourceType) -> Vec<String> {
        let mut args: Vec<String> = ["ls", "-q", "--output", "json", "--resource-type"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(resource_type.as_str().to_string());

        if let Some(dir) = &self.project_dir {
            args.push("--project-dir".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(dir) = &self.profiles_dir {
            args.push("--profiles-dir".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(target) = &self.target {
            args.push("--target".to_string());
            args.push(target.clone());
        }

        args
    }
}

#[async_trait::async_trait]
impl ProjectRunner for DbtCommandRunner {
    fn name(&self) -> &'static str {
        "dbt"
    }

    async fn list(&self, resource_type: ResourceType) -> Result<Vec<String>, ManifestError> {
        let args = self.args(resource_type);
        tracing::debug!(executable = %self.executable, args = ?args, "invoking dbt");

        let output = tokio::process::Command::new(&self.executable)
            .args(&args)
            .output()
            .await
            .map_err(|e| ManifestError::ExtractionFailed {
                resource_type,
                detail: format!("could not run '{}': {}", self.executable, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // dbt reports most errors on stdout
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(ManifestError::ExtractionFailed {
                resource_type,
                detail: format!(
                    "'{}' exited with {}: {}",
                    self.executable,
                    output.status.code().map_or("signal".to_string(), |c| c.to_string()),
                    detail
                ),
            });
        }

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Runner that returns predefined output
///
/// Each resource type maps either to its lines or to a failure message.
/// Every call is recorded so tests can assert on invocation order.
#[derive(Clone, Default)]
pub struct StaticRunner {
    outputs: HashMap<ResourceType, Result<Vec<String>, String>>,
    calls: Arc<RwLock<Vec<ResourceType>>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these lines for a resource type
    pub fn with_lines<I, S>(mut self, resource_type: ResourceType, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs
            .insert(resource_type, Ok(lines.into_iter().map(Into::into).collect()));
        self
    }

    /// Fail the listing of a resource type
    pub fn with_failure(mut self, resource_type: ResourceType, detail: impl Into<String>) -> Self {
        self.outputs.insert(resource_type, Err(detail.into()));
        self
    }

    /// Resource types listed so far, in call order
    pub async fn calls(&self) -> Vec<ResourceType> {
        self.calls.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ProjectRunner for StaticRunner {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn list(&self, resource_type: ResourceType) -> Result<Vec<String>, ManifestError> {
        self.calls.write().await.push(resource_type);

        match self.outputs.get(&resource_type) {
            Some(Ok(lines)) => Ok(lines.clone()),
            Some(Err(detail)) => Err(ManifestError::ExtractionFailed {
                resource_type,
                detail: detail.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}
