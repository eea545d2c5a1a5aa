//! Sandbox lifecycle management.
//!
//! [`SandboxManager`] owns naming, creation and teardown of sandboxes. It keeps
//! no record of what it launched: every query goes to the runtime, which is
//! the only source of truth for existence and liveness.
//!
//! Every runtime call is bounded by [`ProvisionerConfig::call_timeout`] (stop
//! by [`ProvisionerConfig::stop_timeout`]) and is never retried.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::SandboxError;

use super::ProvisionerConfig;
use super::name;
use super::runtime::{LaunchSpec, RuntimeError, SandboxRuntime, SandboxSummary};

/// Main-process argv prefix; the rendered workload is appended as the final
/// argument.
pub const WORKLOAD_SHELL: &[&str] = &["pwsh", "-NoLogo", "-NonInteractive", "-Command"];

/// Variables the proxy endpoint is exported as. Tools disagree on case, so
/// both spellings are set.
pub const PROXY_ENV_VARS: &[&str] = &[
    "ALL_PROXY",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "all_proxy",
    "http_proxy",
    "https_proxy",
];

/// Label carrying the realm a sandbox works on.
pub const REALM_LABEL: &str = "mailbox-provisioner.realm";

/// Label marking sandboxes created by this service.
pub const MANAGED_LABEL: &str = "mailbox-provisioner.managed";

/// A launched sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sandbox {
    /// Unique name, used for every later operation.
    pub name: String,
    /// Opaque id returned by the runtime.
    pub runtime_handle: String,
    /// Launch time.
    pub created_at: DateTime<Utc>,
}

/// Creates, inspects and removes sandboxes through a [`SandboxRuntime`].
#[derive(Debug, Clone)]
pub struct SandboxManager<R> {
    runtime: R,
    config: ProvisionerConfig,
}

impl<R: SandboxRuntime> SandboxManager<R> {
    /// Creates a manager over `runtime`.
    #[must_use]
    pub fn new(runtime: R, config: ProvisionerConfig) -> Self {
        Self { runtime, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Launches a sandbox running `workload` as its main process.
    ///
    /// When `proxy` is given it is exported to the sandbox under every name in
    /// [`PROXY_ENV_VARS`]. On failure, whatever the runtime left behind is
    /// removed on a best-effort basis before the error is returned, unless the
    /// runtime reports the name as taken by an existing sandbox.
    ///
    /// # Errors
    ///
    /// [`SandboxError::LaunchFailed`] if the runtime refuses, or
    /// [`SandboxError::RuntimeTimeout`] if it does not answer in time.
    #[instrument(skip(self, workload, proxy), fields(proxied = proxy.is_some()))]
    pub async fn launch(
        &self,
        realm: &str,
        workload: &str,
        proxy: Option<&str>,
    ) -> Result<Sandbox, SandboxError> {
        let created_at = Utc::now();
        let name = name::generate(&self.config.name_prefix, realm, created_at);
        let spec = self.launch_spec(&name, realm, workload, proxy);

        debug!(%name, image = %spec.image, "Launching sandbox");

        let outcome = self
            .bounded("create_and_start", self.runtime.create_and_start(&spec))
            .await;

        match outcome {
            Ok(Ok(runtime_handle)) => {
                info!(%name, "Sandbox launched");
                Ok(Sandbox {
                    name,
                    runtime_handle,
                    created_at,
                })
            }
            Ok(Err(e @ RuntimeError::Conflict(_))) => {
                // The name belongs to someone else's sandbox; leave it alone.
                warn!(%name, error = %e, "Sandbox name already in use");
                Err(SandboxError::LaunchFailed {
                    name,
                    reason: e.to_string(),
                })
            }
            Ok(Err(e)) => {
                warn!(%name, error = %e, "Sandbox launch failed");
                self.discard_partial(&name).await;
                Err(SandboxError::LaunchFailed {
                    name,
                    reason: e.to_string(),
                })
            }
            Err(timeout) => {
                warn!(%name, "Sandbox launch timed out");
                self.discard_partial(&name).await;
                Err(timeout)
            }
        }
    }

    /// Returns the sandbox's combined output so far.
    ///
    /// # Errors
    ///
    /// [`SandboxError::NotFound`] for an unknown name,
    /// [`SandboxError::RuntimeTimeout`] or [`SandboxError::Runtime`] otherwise.
    #[instrument(skip(self))]
    pub async fn fetch_output(&self, name: &str) -> Result<String, SandboxError> {
        match self
            .bounded("fetch_output", self.runtime.fetch_output(name))
            .await?
        {
            Ok(output) => {
                debug!(bytes = output.len(), "Fetched sandbox output");
                Ok(output)
            }
            Err(RuntimeError::NotFound) => Err(SandboxError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(query_failed("fetch_output", e)),
        }
    }

    /// Returns whether the sandbox is running. Unknown names are not running.
    ///
    /// # Errors
    ///
    /// [`SandboxError::RuntimeTimeout`] or [`SandboxError::Runtime`].
    #[instrument(skip(self))]
    pub async fn is_running(&self, name: &str) -> Result<bool, SandboxError> {
        match self
            .bounded("is_running", self.runtime.is_running(name))
            .await?
        {
            Ok(running) => Ok(running),
            Err(RuntimeError::NotFound) => Ok(false),
            Err(e) => Err(query_failed("is_running", e)),
        }
    }

    /// Stops and deletes a sandbox. Stopping an already stopped sandbox is
    /// not an error.
    ///
    /// # Errors
    ///
    /// [`SandboxError::NotFound`] for an unknown name,
    /// [`SandboxError::RemovalFailed`] if the runtime refuses, or
    /// [`SandboxError::RuntimeTimeout`].
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<(), SandboxError> {
        let stop = self.runtime.stop(name, self.config.stop_grace);
        match self
            .bounded_by("stop", self.config.stop_timeout(), stop)
            .await?
        {
            Ok(()) => debug!("Sandbox stopped"),
            Err(RuntimeError::NotModified) => debug!("Sandbox was already stopped"),
            Err(RuntimeError::NotFound) => {
                return Err(SandboxError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(removal_failed(name, e)),
        }

        match self.bounded("delete", self.runtime.delete(name)).await? {
            Ok(()) => {}
            Err(RuntimeError::NotFound) => debug!("Sandbox vanished before delete"),
            Err(e) => return Err(removal_failed(name, e)),
        }

        info!("Sandbox removed");
        Ok(())
    }

    /// Lists running sandboxes created under the configured name prefix.
    ///
    /// # Errors
    ///
    /// [`SandboxError::RuntimeTimeout`] or [`SandboxError::Runtime`].
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<SandboxSummary>, SandboxError> {
        let prefix = format!("{}-", self.config.name_prefix);
        let sandboxes = self
            .bounded("list", self.runtime.list(&prefix))
            .await?
            .map_err(|e| query_failed("list", e))?;
        debug!(count = sandboxes.len(), "Listed active sandboxes");
        Ok(sandboxes)
    }

    fn launch_spec(
        &self,
        name: &str,
        realm: &str,
        workload: &str,
        proxy: Option<&str>,
    ) -> LaunchSpec {
        let mut command: Vec<String> = WORKLOAD_SHELL.iter().map(|s| (*s).to_string()).collect();
        command.push(workload.to_string());

        let env: Vec<(String, String)> = proxy
            .map(|endpoint| {
                PROXY_ENV_VARS
                    .iter()
                    .map(|var| ((*var).to_string(), endpoint.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let labels = HashMap::from([
            (REALM_LABEL.to_string(), realm.to_string()),
            (MANAGED_LABEL.to_string(), "true".to_string()),
        ]);

        LaunchSpec {
            name: name.to_string(),
            image: self.config.image.clone(),
            command,
            env,
            labels,
        }
    }

    /// Best-effort removal after a failed launch. Never fails.
    async fn discard_partial(&self, name: &str) {
        match self.bounded("delete", self.runtime.delete(name)).await {
            Ok(Ok(())) => debug!(%name, "Removed partially created sandbox"),
            Ok(Err(RuntimeError::NotFound)) => {}
            Ok(Err(e)) => warn!(%name, error = %e, "Failed to remove partial sandbox"),
            Err(e) => warn!(%name, error = %e, "Failed to remove partial sandbox"),
        }
    }

    /// Runs one runtime call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RuntimeError>>,
    ) -> Result<Result<T, RuntimeError>, SandboxError> {
        self.bounded_by(operation, self.config.call_timeout, call).await
    }

    async fn bounded_by<T>(
        &self,
        operation: &'static str,
        timeout: Duration,
        call: impl Future<Output = Result<T, RuntimeError>>,
    ) -> Result<Result<T, RuntimeError>, SandboxError> {
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| SandboxError::RuntimeTimeout { operation, timeout })
    }
}

fn query_failed(operation: &'static str, e: RuntimeError) -> SandboxError {
    SandboxError::Runtime {
        operation,
        reason: e.to_string(),
    }
}

fn removal_failed(name: &str, e: RuntimeError) -> SandboxError {
    SandboxError::RemovalFailed {
        name: name.to_string(),
        reason: e.to_string(),
    }
}
