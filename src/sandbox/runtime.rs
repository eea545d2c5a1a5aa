//! The container runtime boundary.
//!
//! The lifecycle manager only ever talks to a runtime through
//! [`SandboxRuntime`], so tests can substitute an in-memory fake and the
//! Docker daemon stays behind [`super::DockerRuntime`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Everything a runtime needs to create and start one sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Unique sandbox name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Main process argv.
    pub command: Vec<String>,
    /// Environment variables, in insertion order.
    pub env: Vec<(String, String)>,
    /// Operator-facing labels.
    pub labels: HashMap<String, String>,
}

impl LaunchSpec {
    /// Looks up an environment variable by exact name.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One running sandbox as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SandboxSummary {
    /// Sandbox name.
    pub name: String,
    /// Runtime's own status text, e.g. "Up 3 minutes".
    pub status: String,
}

/// Failures a runtime reports. Mapped onto [`crate::error::SandboxError`] by
/// the manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// No sandbox with that name.
    #[error("no such sandbox")]
    NotFound,

    /// Nothing to do, e.g. stopping an already stopped sandbox.
    #[error("sandbox already in the requested state")]
    NotModified,

    /// The name is already taken by another sandbox. Nothing was created.
    #[error("{0}")]
    Conflict(String),

    /// The runtime understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    /// The runtime could not be reached or answered garbage.
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

/// A container runtime able to host sandboxes.
///
/// Implementations hold no per-sandbox state; the runtime itself is the only
/// source of truth for existence and liveness.
pub trait SandboxRuntime: Send + Sync {
    /// Creates and starts a sandbox, returning the runtime's handle for it.
    ///
    /// A name that is already in use fails with [`RuntimeError::Conflict`]
    /// and leaves the existing sandbox untouched.
    fn create_and_start(
        &self,
        spec: &LaunchSpec,
    ) -> impl Future<Output = Result<String, RuntimeError>> + Send;

    /// Returns the combined stdout and stderr produced so far.
    fn fetch_output(&self, name: &str) -> impl Future<Output = Result<String, RuntimeError>> + Send;

    /// Returns whether the sandbox is running. Unknown names are not running.
    fn is_running(&self, name: &str) -> impl Future<Output = Result<bool, RuntimeError>> + Send;

    /// Stops the sandbox, killing it after `grace`.
    fn stop(
        &self,
        name: &str,
        grace: Duration,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Deletes a stopped sandbox.
    fn delete(&self, name: &str) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Lists running sandboxes whose name starts with `prefix`.
    fn list(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<SandboxSummary>, RuntimeError>> + Send;
}
