//! Mailbox Provisioner - Entry Point
//!
//! This is the main entry point for the MCP server binary.

use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use mailbox_provisioner::sandbox::{
    DEFAULT_IMAGE, DEFAULT_NAME_PREFIX, DockerRuntime, ProvisionerConfig,
};
use mailbox_provisioner::{Provisioner, server, system};

/// Mailbox Provisioner - Shared mailbox creation in isolated sandboxes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Skip container runtime checks (NOT RECOMMENDED - failures surface on first request)
    #[arg(long, default_value = "false")]
    skip_checks: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Image every sandbox is started from
    #[arg(long, env = "MP_IMAGE", default_value = DEFAULT_IMAGE)]
    image: String,

    /// Prefix of generated sandbox names
    #[arg(long, env = "MP_NAME_PREFIX", default_value = DEFAULT_NAME_PREFIX)]
    name_prefix: String,

    /// Upper bound in seconds on every container runtime call
    #[arg(
        long,
        env = "MP_CALL_TIMEOUT_SECS",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    call_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    // MCP requires that logs go to stderr (stdout is for JSON-RPC)
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("Mailbox Provisioner v{}", env!("CARGO_PKG_VERSION"));

    let runtime = DockerRuntime::connect().into_diagnostic()?;

    // Check runtime requirements unless skipped
    if args.skip_checks {
        warn!("Skipping container runtime checks (--skip-checks). This is NOT recommended!");
    } else {
        info!("Checking container runtime...");

        let timeout = Duration::from_secs(args.call_timeout_secs);
        match system::check_all(runtime.client(), timeout).await {
            Ok(reqs) => {
                info!(
                    "Container runtime ready: engine {}, API v{}, os {}",
                    reqs.engine_version, reqs.api_version, reqs.os
                );
                if !reqs.is_satisfied() {
                    warn!("Daemon is not a Linux engine; the sandbox image may not run");
                }
            }
            Err(e) => {
                error!("Container runtime check failed");
                return Err(e.into());
            }
        }
    }

    let config = ProvisionerConfig::default()
        .with_image(args.image)
        .with_name_prefix(args.name_prefix)
        .with_call_timeout(Duration::from_secs(args.call_timeout_secs));

    info!(image = %config.image, prefix = %config.name_prefix, "Provisioner configured");

    // Run the MCP server
    server::run(Provisioner::new(runtime, config))
        .await
        .map_err(Into::into)
}
