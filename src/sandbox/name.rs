//! Sandbox naming.
//!
//! Names take the form `{prefix}-{realm}-{YYYYMMDD-HHMMSS}-{suffix}`. The
//! timestamp only has second resolution, so a six hex digit random suffix
//! keeps two launches for the same realm within one second apart.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Length of the random disambiguator.
const SUFFIX_LEN: usize = 6;

/// Used when a realm sanitizes to nothing.
const EMPTY_REALM: &str = "realm";

/// Reduces a realm to characters every container runtime accepts in a name.
///
/// Lowercases, maps every character outside `[a-z0-9]` to `-`, collapses runs
/// of `-` and trims them from both ends.
#[must_use]
pub fn sanitize_realm(realm: &str) -> String {
    let mut out = String::with_capacity(realm.len());
    for c in realm.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        EMPTY_REALM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Generates a fresh sandbox name.
#[must_use]
pub fn generate(prefix: &str, realm: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}-{}-{}-{}",
        sanitize_realm(realm),
        now.format("%Y%m%d-%H%M%S"),
        &suffix[..SUFFIX_LEN]
    )
}
