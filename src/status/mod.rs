//! Workflow status derived from a sandbox's cumulative log.
//!
//! The workload only prints free-form text, so the status of a run is
//! recomputed from the whole log on every query. Parsing is stateless,
//! idempotent and infallible: missing or malformed markers simply leave the
//! run in [`Phase::Starting`] with empty result sets.
//!
//! # Example
//!
//! ```
//! use mailbox_provisioner::status::{Phase, parse};
//!
//! let result = parse("AUTH_CODE: ABC12345\n", true);
//! assert_eq!(result.phase, Phase::WaitingForAuth);
//! assert_eq!(result.auth_code.as_deref(), Some("ABC12345"));
//! ```

pub mod auth_code;
pub mod markers;
mod parser;

pub use parser::{LogSignals, PHASE_RULES, PhaseRule, parse, strip_ansi};

use serde::{Deserialize, Serialize};

/// One state of the workflow status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Sandbox running, no marker seen yet.
    Starting,
    /// Device code issued, operator has not finished sign-in.
    WaitingForAuth,
    /// Signed in, mailboxes are being created.
    CreatingMailboxes,
    /// Sandbox stopped after producing results.
    Completed,
    /// Operator did not finish sign-in in time.
    AuthTimeout,
    /// The workload reported an unrecoverable error.
    Error,
    /// Sandbox stopped without producing any results.
    Failed,
}

impl Phase {
    /// Stable wire name of the phase.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::WaitingForAuth => "waiting_for_auth",
            Self::CreatingMailboxes => "creating_mailboxes",
            Self::Completed => "completed",
            Self::AuthTimeout => "auth_timeout",
            Self::Error => "error",
            Self::Failed => "failed",
        }
    }

    /// Returns true once the phase can no longer change on its own.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::AuthTimeout | Self::Error | Self::Failed
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status view of one workload, derived from its log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadResult {
    /// Current phase.
    pub phase: Phase,
    /// Device-login code, once printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Addresses confirmed created, in log order.
    pub succeeded: Vec<String>,
    /// Addresses confirmed not created, in log order.
    pub failed: Vec<String>,
}
