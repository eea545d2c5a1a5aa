//! Configuration for the provisioner and its sandboxes.

use std::time::Duration;

/// Image used when none is configured. Ships `pwsh` and can install the
/// Exchange Online module at startup.
pub const DEFAULT_IMAGE: &str = "mcr.microsoft.com/powershell:latest";

/// Prefix shared by every sandbox name.
pub const DEFAULT_NAME_PREFIX: &str = "mailbox-creator";

/// Mailboxes created when a request does not say.
pub const DEFAULT_COUNT: usize = 10;

/// Largest accepted mailbox count.
pub const MAX_COUNT: usize = 100;

/// Configuration for the provisioner.
///
/// Use the builder methods to customize behavior.
///
/// # Example
///
/// ```
/// use mailbox_provisioner::ProvisionerConfig;
/// use std::time::Duration;
///
/// let config = ProvisionerConfig::default()
///     .with_image("registry.local/pwsh-exo:3.4")
///     .with_name_prefix("mbx")
///     .with_call_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_count, 100);
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Image every sandbox is started from.
    pub image: String,

    /// Prefix of generated sandbox names; also the `list` filter.
    pub name_prefix: String,

    /// Upper bound on any single runtime call. Stop gets
    /// [`stop_timeout`](Self::stop_timeout) instead.
    pub call_timeout: Duration,

    /// Grace period before a stopping sandbox is killed. The runtime may use
    /// all of it before answering a stop request.
    pub stop_grace: Duration,

    /// Largest accepted mailbox count.
    pub max_count: usize,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            call_timeout: Duration::from_secs(30),
            stop_grace: Duration::from_secs(10),
            max_count: MAX_COUNT,
        }
    }
}

impl ProvisionerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sandbox image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the sandbox name prefix.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Sets the bound on each runtime call.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the stop grace period.
    #[must_use]
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Bound on a stop call: the grace period the runtime may wait out, plus
    /// the usual call timeout on top.
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        self.call_timeout.saturating_add(self.stop_grace)
    }

    /// Sets the largest accepted mailbox count.
    #[must_use]
    pub fn with_max_count(mut self, max: usize) -> Self {
        self.max_count = max;
        self
    }
}
