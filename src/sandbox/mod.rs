//! Container sandboxes hosting the provisioning workload.
//!
//! Each request gets a fresh, uniquely named sandbox whose main process is the
//! rendered workload. The container runtime is reached only through
//! [`SandboxRuntime`]; [`DockerRuntime`] implements it for a local Docker
//! daemon.
//!
//! # Example
//!
//! ```no_run
//! use mailbox_provisioner::sandbox::{DockerRuntime, ProvisionerConfig, SandboxManager};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SandboxManager::new(DockerRuntime::connect()?, ProvisionerConfig::default());
//!
//! let sandbox = manager
//!     .launch("contoso.com", "Write-Host hello", None)
//!     .await?;
//! let output = manager.fetch_output(&sandbox.name).await?;
//! println!("{output}");
//!
//! manager.remove(&sandbox.name).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod docker;
mod manager;
pub mod name;
mod runtime;

pub use config::{DEFAULT_COUNT, DEFAULT_IMAGE, DEFAULT_NAME_PREFIX, MAX_COUNT, ProvisionerConfig};
pub use docker::DockerRuntime;
pub use manager::{
    MANAGED_LABEL, PROXY_ENV_VARS, REALM_LABEL, Sandbox, SandboxManager, WORKLOAD_SHELL,
};
pub use runtime::{LaunchSpec, RuntimeError, SandboxRuntime, SandboxSummary};
