//! Device-login code extraction.
//!
//! Patterns are tried from most to least structured. Within a pattern every
//! match is considered in log order, and the first candidate that passes the
//! length bounds and the denylist is returned.

use std::sync::OnceLock;

use regex::Regex;

use super::markers::{AUTH_CODE_DENYLIST, AUTH_CODE_LEN, BANNER_OPEN};

/// Extraction patterns in priority order. Capture group 1 is the code. The
/// flag says whether the pattern may match on a `===` section banner; the
/// loose ones may not, since banners carry realm names and other uppercase
/// words.
const PATTERNS: &[(&str, &str, bool)] = &[
    ("marker", r"AUTH_CODE:[ \t]*([A-Z0-9]+)", true),
    (
        "device-login banner",
        r"(?i:enter the code)[ \t]+([A-Z0-9]+)[ \t]+(?i:to authenticate)",
        true,
    ),
    ("code label", r"\b(?i:code):[ \t]*([A-Z0-9]+)\b", false),
    ("bare token", r"\b([A-Z0-9]{9})\b", false),
];

struct Pattern {
    label: &'static str,
    regex: Regex,
    on_banners: bool,
}

static COMPILED: OnceLock<Vec<Pattern>> = OnceLock::new();

fn compiled() -> &'static [Pattern] {
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|&(label, pattern, on_banners)| {
                // Patterns are constants covered by the unit tests below.
                #[allow(clippy::expect_used)]
                let regex = Regex::new(pattern).expect("auth code pattern must compile");
                Pattern {
                    label,
                    regex,
                    on_banners,
                }
            })
            .collect()
    })
}

fn is_banner(line: &str) -> bool {
    line.trim_start().starts_with(BANNER_OPEN)
}

/// Returns true if `candidate` is an acceptable code.
#[must_use]
pub fn is_plausible(candidate: &str) -> bool {
    AUTH_CODE_LEN.contains(&candidate.len())
        && !AUTH_CODE_DENYLIST
            .iter()
            .any(|word| word.eq_ignore_ascii_case(candidate))
}

/// Extracts the device-login code from cumulative log text.
#[must_use]
pub fn extract(log: &str) -> Option<String> {
    compiled().iter().find_map(|pattern| {
        log.lines()
            .filter(|line| pattern.on_banners || !is_banner(line))
            .flat_map(|line| pattern.regex.captures_iter(line))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|candidate| is_plausible(candidate))
            .map(|code| {
                tracing::trace!(pattern = pattern.label, "Extracted auth code");
                code.to_string()
            })
    })
}
