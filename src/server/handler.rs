//! MCP server handler implementation.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, SandboxError, ServerError};
use crate::sandbox::{DockerRuntime, SandboxSummary};
use crate::service::{ProvisionRequest, Provisioner};

/// Identifies one sandbox.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SandboxRef {
    /// Sandbox name returned by `create_mailboxes`.
    pub sandbox_name: String,
}

#[derive(Serialize)]
struct Removed<'a> {
    sandbox_name: &'a str,
    removed: bool,
}

#[derive(Serialize)]
struct Listing {
    sandboxes: Vec<SandboxSummary>,
}

/// The MCP server for mailbox provisioning.
#[derive(Clone)]
pub struct MailboxServer {
    provisioner: Arc<Provisioner<DockerRuntime>>,
    tool_router: ToolRouter<Self>,
}

impl MailboxServer {
    /// Create a new server over a shared provisioner.
    #[must_use]
    pub fn new(provisioner: Arc<Provisioner<DockerRuntime>>) -> Self {
        Self {
            provisioner,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MailboxServer {
    #[tool(
        description = "Start provisioning shared mailboxes for a domain in a fresh isolated sandbox. \
                       Returns the sandbox name and the device-login URL. Poll sandbox_status for \
                       the authentication code, then complete sign-in at the URL."
    )]
    async fn create_mailboxes(
        &self,
        Parameters(request): Parameters<ProvisionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ticket = self.provisioner.create(&request).await.map_err(to_mcp)?;
        Ok(CallToolResult::success(vec![Content::json(ticket)?]))
    }

    #[tool(
        description = "Report a sandbox's phase (starting, waiting_for_auth, creating_mailboxes, \
                       completed, auth_timeout, error, failed), its authentication code once \
                       issued, created and failed addresses, and the full log. Safe to poll."
    )]
    async fn sandbox_status(
        &self,
        Parameters(target): Parameters<SandboxRef>,
    ) -> Result<CallToolResult, McpError> {
        let sandbox_name = target.sandbox_name;
        let report = self
            .provisioner
            .status(&sandbox_name)
            .await
            .map_err(to_mcp)?;
        debug!(sandbox = %sandbox_name, phase = %report.phase, "Status polled");
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(description = "Stop and delete a sandbox. Results already reported stay valid.")]
    async fn remove_sandbox(
        &self,
        Parameters(target): Parameters<SandboxRef>,
    ) -> Result<CallToolResult, McpError> {
        let sandbox_name = target.sandbox_name;
        self.provisioner
            .remove(&sandbox_name)
            .await
            .map_err(to_mcp)?;
        Ok(CallToolResult::success(vec![Content::json(Removed {
            sandbox_name: &sandbox_name,
            removed: true,
        })?]))
    }

    #[tool(description = "List running provisioning sandboxes.")]
    async fn list_sandboxes(&self) -> Result<CallToolResult, McpError> {
        let sandboxes = self.provisioner.list().await.map_err(to_mcp)?;
        Ok(CallToolResult::success(vec![Content::json(Listing {
            sandboxes,
        })?]))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for MailboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Mailbox Provisioner - creates shared mailboxes in isolated sandboxes. \
                 Call create_mailboxes, poll sandbox_status until an auth code appears, \
                 have the operator enter it at the device-login URL, then keep polling \
                 until the phase is terminal and call remove_sandbox."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Maps crate errors onto MCP error classes.
fn to_mcp(error: Error) -> McpError {
    match &error {
        Error::Validation(_) => McpError::invalid_params(error.to_string(), None),
        Error::Sandbox(SandboxError::NotFound { .. }) => {
            McpError::resource_not_found(error.to_string(), None)
        }
        _ => {
            warn!(error = %error, "Tool call failed");
            McpError::internal_error(error.to_string(), None)
        }
    }
}

/// Run the MCP server.
///
/// This function starts the server with stdio transport and waits for it to complete.
///
/// # Errors
///
/// Returns error if server initialization or transport fails.
pub async fn run(provisioner: Provisioner<DockerRuntime>) -> crate::error::Result<()> {
    info!("Starting Mailbox Provisioner server");
    debug!("Using stdio transport");

    let server = MailboxServer::new(Arc::new(provisioner));

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| ServerError::InitializationFailed(e.to_string()))?;

    info!("Server initialized, waiting for requests");

    service
        .waiting()
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}
