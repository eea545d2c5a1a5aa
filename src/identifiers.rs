//! Candidate account identifier generation.
//!
//! Identifiers are produced by walking a fixed table of naming rules in
//! priority order. Each base rule is immediately followed by its numbered
//! variants (`jane.doe`, `jane.doe1` … `jane.doe9`, then the next rule), so the
//! first few identifiers are always the most natural ones.
//!
//! Generation is pure: the same name parts and count always produce the same
//! list in the same order.
//!
//! # Example
//!
//! ```
//! use mailbox_provisioner::identifiers::generate;
//!
//! let ids = generate("Jane", "Doe", 3);
//! assert_eq!(ids, vec!["jane.doe", "jane.doe1", "jane.doe2"]);
//! ```

use std::collections::HashSet;

/// Characters allowed between name fragments.
const SEPARATORS: &[char] = &['.', '_', '-'];

/// Highest numeric suffix appended to a base identifier.
const MAX_NUMBERED_SUFFIX: u32 = 9;

/// Length of the truncated first-name fragment used by the truncation rules.
const TRUNCATED_LEN: usize = 3;

/// Normalized name parts that rules are applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    first: String,
    last: String,
}

impl NameParts {
    /// Normalizes raw name parts to lowercase ASCII alphanumerics.
    ///
    /// Spaces, apostrophes and hyphens inside a part are dropped, so
    /// `"O'Neil"` becomes `"oneil"` and `"Van Dyke"` becomes `"vandyke"`.
    #[must_use]
    pub fn new(first: &str, last: &str) -> Self {
        Self {
            first: normalize(first),
            last: normalize(last),
        }
    }

    /// Normalized first part.
    #[must_use]
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Normalized last part.
    #[must_use]
    pub fn last(&self) -> &str {
        &self.last
    }

    fn first_initial(&self) -> &str {
        prefix(&self.first, 1)
    }

    fn last_initial(&self) -> &str {
        prefix(&self.last, 1)
    }

    fn first_truncated(&self) -> &str {
        prefix(&self.first, TRUNCATED_LEN)
    }
}

/// A single naming rule.
#[derive(Clone, Copy)]
pub struct NamingRule {
    /// Short label used in logs and tests.
    pub label: &'static str,
    apply: fn(&NameParts) -> String,
}

impl NamingRule {
    /// Applies the rule to the given name parts.
    #[must_use]
    pub fn apply(&self, parts: &NameParts) -> String {
        (self.apply)(parts)
    }
}

impl std::fmt::Debug for NamingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingRule")
            .field("label", &self.label)
            .finish()
    }
}

/// Base naming rules in priority order.
pub const RULES: &[NamingRule] = &[
    NamingRule {
        label: "first.last",
        apply: |p| format!("{}.{}", p.first, p.last),
    },
    NamingRule {
        label: "f.last",
        apply: |p| format!("{}.{}", p.first_initial(), p.last),
    },
    NamingRule {
        label: "first.l",
        apply: |p| format!("{}.{}", p.first, p.last_initial()),
    },
    NamingRule {
        label: "firstlast",
        apply: |p| format!("{}{}", p.first, p.last),
    },
    NamingRule {
        label: "flast",
        apply: |p| format!("{}{}", p.first_initial(), p.last),
    },
    NamingRule {
        label: "firstl",
        apply: |p| format!("{}{}", p.first, p.last_initial()),
    },
    NamingRule {
        label: "last.first",
        apply: |p| format!("{}.{}", p.last, p.first),
    },
    NamingRule {
        label: "lastfirst",
        apply: |p| format!("{}{}", p.last, p.first),
    },
    NamingRule {
        label: "first_last",
        apply: |p| format!("{}_{}", p.first, p.last),
    },
    NamingRule {
        label: "first-last",
        apply: |p| format!("{}-{}", p.first, p.last),
    },
    NamingRule {
        label: "last.f",
        apply: |p| format!("{}.{}", p.last, p.first_initial()),
    },
    NamingRule {
        label: "lastf",
        apply: |p| format!("{}{}", p.last, p.first_initial()),
    },
    NamingRule {
        label: "fir.last",
        apply: |p| format!("{}.{}", p.first_truncated(), p.last),
    },
    NamingRule {
        label: "firlast",
        apply: |p| format!("{}{}", p.first_truncated(), p.last),
    },
    NamingRule {
        label: "first",
        apply: |p| p.first.clone(),
    },
    NamingRule {
        label: "last",
        apply: |p| p.last.clone(),
    },
];

/// Generates up to `count` unique identifiers for the given name parts.
///
/// Duplicates are detected case-insensitively and the first occurrence wins.
/// Fewer than `count` identifiers are returned when the rule table runs out;
/// `count == 0` returns an empty list.
#[must_use]
pub fn generate(first: &str, last: &str, count: usize) -> Vec<String> {
    let parts = NameParts::new(first, last);
    let mut seen = HashSet::new();
    let mut identifiers = Vec::with_capacity(count.min(max_candidates()));

    if count == 0 {
        return identifiers;
    }

    for candidate in candidates(&parts) {
        if seen.insert(candidate.to_ascii_lowercase()) {
            identifiers.push(candidate);
            if identifiers.len() == count {
                break;
            }
        }
    }

    identifiers
}

/// Upper bound on the identifiers one name can produce.
fn max_candidates() -> usize {
    RULES.len() * (MAX_NUMBERED_SUFFIX as usize + 1)
}

/// Lazily yields every candidate in priority order, skipping malformed ones.
fn candidates(parts: &NameParts) -> impl Iterator<Item = String> + '_ {
    RULES
        .iter()
        .map(move |rule| rule.apply(parts))
        .filter(|base| is_well_formed(base))
        .flat_map(|base| {
            let numbered = (1..=MAX_NUMBERED_SUFFIX).map({
                let base = base.clone();
                move |n| format!("{base}{n}")
            });
            std::iter::once(base).chain(numbered)
        })
}

/// A candidate is usable if it is non-empty and does not start or end with a separator.
fn is_well_formed(candidate: &str) -> bool {
    !candidate.is_empty()
        && !candidate.starts_with(SEPARATORS)
        && !candidate.ends_with(SEPARATORS)
}

fn normalize(part: &str) -> String {
    part.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Returns at most the first `len` characters; empty input yields an empty fragment.
fn prefix(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_spaces() {
        let parts = NameParts::new("Mary-Kate", "O'Neil Van Dyke");
        assert_eq!(parts.first(), "marykate");
        assert_eq!(parts.last(), "oneilvandyke");
    }

    #[test]
    fn test_first_rule_is_dotted_full_name() {
        let parts = NameParts::new("Jane", "Doe");
        assert_eq!(RULES[0].apply(&parts), "jane.doe");
        assert_eq!(RULES[0].label, "first.last");
    }

    #[test]
    fn test_numbered_variants_follow_their_base() {
        let ids = generate("Jane", "Doe", 11);
        assert_eq!(ids[0], "jane.doe");
        assert_eq!(ids[9], "jane.doe9");
        assert_eq!(ids[10], "j.doe");
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(generate("Jane", "Doe", 0).is_empty());
    }

    #[test]
    fn test_empty_first_part_degrades() {
        let ids = generate("", "Doe", 5);
        assert_eq!(ids, vec!["doe", "doe1", "doe2", "doe3", "doe4"]);
    }

    #[test]
    fn test_both_parts_empty_yields_nothing() {
        assert!(generate("", "  ", 10).is_empty());
    }

    #[test]
    fn test_prefix_handles_short_strings() {
        assert_eq!(prefix("", 1), "");
        assert_eq!(prefix("al", 3), "al");
        assert_eq!(prefix("alice", 3), "ali");
    }

    #[test]
    fn test_well_formed_rejects_dangling_separators() {
        assert!(!is_well_formed(".doe"));
        assert!(!is_well_formed("jane."));
        assert!(!is_well_formed(""));
        assert!(is_well_formed("jane.doe"));
    }
}
