//! Mailbox Provisioner - Container-isolated shared mailbox provisioning.
//!
//! Each request runs a device-code authenticated PowerShell workload inside
//! its own short-lived sandbox. The workload only prints text, so progress is
//! recovered by re-parsing the sandbox's cumulative log on every status query.
//!
//! # Components
//!
//! - [`identifiers`] - deterministic candidate mailbox names
//! - [`workload`] - renders the in-sandbox script
//! - [`sandbox`] - sandbox lifecycle on a container runtime
//! - [`status`] - log to workflow phase parser
//! - [`service`] - stateless facade composing the above
//! - [`server`] - MCP tools over stdio
//!
//! # Example
//!
//! ```no_run
//! use mailbox_provisioner::sandbox::{DockerRuntime, ProvisionerConfig};
//! use mailbox_provisioner::{ProvisionRequest, Provisioner, system};
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let runtime = DockerRuntime::connect().map_err(|e| miette::miette!("{e}"))?;
//!     let config = ProvisionerConfig::default();
//!
//!     // Validate the container runtime
//!     system::check_all(runtime.client(), config.call_timeout).await?;
//!
//!     let provisioner = Provisioner::new(runtime, config);
//!     let ticket = provisioner
//!         .create(&ProvisionRequest::new("contoso.com", "Jane Doe", "Initial-Passw0rd"))
//!         .await?;
//!
//!     let report = provisioner.status(&ticket.sandbox_name).await?;
//!     println!("{}: {}", report.sandbox_name, report.phase);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod identifiers;
pub mod sandbox;
pub mod server;
pub mod service;
pub mod status;
pub mod system;
pub mod workload;

// Re-export commonly used types
pub use error::{Error, Result};
pub use sandbox::{ProvisionerConfig, SandboxManager, SandboxRuntime};
pub use service::{ProvisionRequest, ProvisionTicket, Provisioner, StatusReport};
pub use status::{Phase, WorkloadResult};
