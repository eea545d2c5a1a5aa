//! MCP server implementation.
//!
//! This module provides the MCP server that exposes provisioning as tools.

mod handler;

pub use handler::{MailboxServer, SandboxRef, run};
