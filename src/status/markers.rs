//! Log-line vocabulary shared by the workload renderer and the status parser.

/// Prefix of the line carrying the device-login code.
pub const AUTH_CODE: &str = "AUTH_CODE:";

/// Explicit authentication-success marker.
pub const AUTH_SUCCESS: &str = "AUTH_SUCCESS:";

/// The operator did not finish sign-in within the window.
pub const AUTH_TIMEOUT: &str = "AUTH_TIMEOUT:";

/// Unrecoverable workload error.
pub const ERROR: &str = "ERROR:";

/// Prefix of a line reporting one created mailbox; the address follows.
pub const CREATED: &str = "SUCCESS: Created mailbox";

/// Prefix of a line reporting one mailbox that could not be created.
pub const NOT_CREATED: &str = "FAILED: Could not create";

/// Opens every section banner the workload prints, e.g. `=== CREATING MAILBOXES ===`.
pub const BANNER_OPEN: &str = "===";

/// Banner printed once every mailbox has been attempted.
pub const FINISHED_BANNER: &str = "=== MAILBOX CREATION COMPLETED ===";

/// Phrases the Exchange Online module prints only after a successful sign-in.
///
/// The module's banner wording changes between releases, so any one of these
/// counts as authentication success even without [`AUTH_SUCCESS`].
pub const POST_AUTH_BANNERS: &[&str] = &[
    "REST API backed Exchange Online cmdlets",
    "Get-Help Connect-ExchangeOnline",
    "aka.ms/exops-docs",
    "exocmdletpreview@service.microsoft.com",
];

/// Uppercase tokens that fit the auth-code shape but are banner words.
pub const AUTH_CODE_DENYLIST: &[&str] = &[
    "MICROSOFT",
    "EXCHANGE",
    "POWERSHELL",
    "MAILBOXES",
    "COMPLETED",
    "CREATING",
    "STARTING",
    "CONNECTED",
    "DEVICELOGIN",
    "EXOPSDOCS",
];

/// Inclusive length bounds for an accepted auth code.
pub const AUTH_CODE_LEN: std::ops::RangeInclusive<usize> = 6..=12;
