//! The ordered phase rule table and log scanning.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::markers;
use super::{Phase, WorkloadResult, auth_code};

/// Everything the phase rules look at, extracted in one scan of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSignals {
    /// `AUTH_TIMEOUT:` seen.
    pub auth_timeout: bool,
    /// `AUTH_SUCCESS:` or a post-authentication banner seen.
    pub auth_succeeded: bool,
    /// `AUTH_CODE:` seen.
    pub auth_code_issued: bool,
    /// Work-finished banner seen.
    pub finished: bool,
    /// `ERROR:` seen.
    pub error: bool,
    /// Addresses from `SUCCESS: Created mailbox` lines.
    pub succeeded: Vec<String>,
    /// Addresses from `FAILED: Could not create` lines.
    pub failed: Vec<String>,
}

impl LogSignals {
    /// Scans cumulative log text. ANSI escapes are removed first.
    #[must_use]
    pub fn scan(log: &str) -> Self {
        let log = strip_ansi(log);
        let log = log.as_ref();

        let (succeeded, failed) = result_sets(log);

        Self {
            auth_timeout: log.contains(markers::AUTH_TIMEOUT),
            auth_succeeded: log.contains(markers::AUTH_SUCCESS)
                || markers::POST_AUTH_BANNERS
                    .iter()
                    .any(|banner| log.contains(banner)),
            auth_code_issued: log.contains(markers::AUTH_CODE),
            finished: regexes().finished.is_match(log),
            error: log.contains(markers::ERROR),
            succeeded,
            failed,
        }
    }

    /// Returns true if any result line was seen.
    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.succeeded.is_empty() || !self.failed.is_empty()
    }
}

/// A phase and the condition under which it applies.
#[derive(Clone, Copy)]
pub struct PhaseRule {
    /// Phase reported when the rule matches.
    pub phase: Phase,
    applies: fn(&LogSignals, bool) -> bool,
}

impl PhaseRule {
    /// Evaluates the rule against scanned signals and sandbox liveness.
    #[must_use]
    pub fn applies(&self, signals: &LogSignals, running: bool) -> bool {
        (self.applies)(signals, running)
    }
}

impl std::fmt::Debug for PhaseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseRule")
            .field("phase", &self.phase)
            .finish()
    }
}

/// Phase rules, checked top to bottom; the first match wins.
///
/// Liveness only participates in `Completed` and `Failed`: log text alone can
/// never prove a sandbox has stopped.
pub const PHASE_RULES: &[PhaseRule] = &[
    PhaseRule {
        phase: Phase::AuthTimeout,
        applies: |s, _| s.auth_timeout,
    },
    PhaseRule {
        phase: Phase::Completed,
        applies: |s, running| !running && (s.finished || s.has_results()),
    },
    PhaseRule {
        phase: Phase::CreatingMailboxes,
        applies: |s, _| s.auth_succeeded,
    },
    PhaseRule {
        phase: Phase::WaitingForAuth,
        applies: |s, _| s.auth_code_issued,
    },
    PhaseRule {
        phase: Phase::Error,
        applies: |s, _| s.error,
    },
    PhaseRule {
        phase: Phase::Failed,
        applies: |_, running| !running,
    },
];

/// Derives the workload status from cumulative log text and sandbox liveness.
///
/// Never fails; an empty or unrecognized log yields [`Phase::Starting`] while
/// the sandbox runs and [`Phase::Failed`] once it has stopped.
#[must_use]
pub fn parse(log: &str, running: bool) -> WorkloadResult {
    let signals = LogSignals::scan(log);

    let phase = PHASE_RULES
        .iter()
        .find(|rule| rule.applies(&signals, running))
        .map_or(Phase::Starting, |rule| rule.phase);

    WorkloadResult {
        phase,
        auth_code: auth_code::extract(&strip_ansi(log)),
        succeeded: signals.succeeded,
        failed: signals.failed,
    }
}

/// Removes ANSI CSI escape sequences (colours, cursor movement).
#[must_use]
pub fn strip_ansi(log: &str) -> Cow<'_, str> {
    if log.contains('\u{1b}') {
        regexes().ansi.replace_all(log, "")
    } else {
        Cow::Borrowed(log)
    }
}

/// Collects created and not-created addresses line by line.
///
/// Order of first appearance is kept; repeats within one set are dropped.
/// An address may appear in both sets.
fn result_sets(log: &str) -> (Vec<String>, Vec<String>) {
    let re = regexes();
    let mut succeeded: Vec<String> = Vec::new();
    let mut failed: Vec<String> = Vec::new();

    for line in log.lines() {
        if let Some(address) = capture(&re.created, line) {
            if !succeeded.iter().any(|a| a == address) {
                succeeded.push(address.to_string());
            }
        } else if let Some(address) = capture(&re.not_created, line) {
            if !failed.iter().any(|a| a == address) {
                failed.push(address.to_string());
            }
        }
    }

    (succeeded, failed)
}

fn capture<'h>(re: &Regex, line: &'h str) -> Option<&'h str> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

struct Regexes {
    ansi: Regex,
    finished: Regex,
    created: Regex,
    not_created: Regex,
}

static REGEXES: OnceLock<Regexes> = OnceLock::new();

fn regexes() -> &'static Regexes {
    REGEXES.get_or_init(|| {
        // Patterns are constants covered by the unit tests below.
        #[allow(clippy::expect_used)]
        let build = |pattern: &str| Regex::new(pattern).expect("status pattern must compile");

        let address = r"([\w.+'-]+@[\w-]+(?:\.[\w-]+)+)";
        Regexes {
            ansi: build(r"\x1b\[[0-9;?]*[ -/]*[@-~]"),
            finished: build(r"(?m)^[ \t]*===[A-Z ]* COMPLETED ===[ \t]*\r?$"),
            created: build(&format!(
                r"{}\s+{address}",
                regex::escape(markers::CREATED)
            )),
            not_created: build(&format!(
                r"{}\s+{address}",
                regex::escape(markers::NOT_CREATED)
            )),
        }
    })
}
