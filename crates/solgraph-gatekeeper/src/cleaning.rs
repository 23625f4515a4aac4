//! Name cleaning and identifier protection
//!
//! Extraction engines decorate names with list markers, quotes, label prefixes
//! and stray punctuation. Cleaning removes that decoration, but it must never
//! touch identifiers whose shape carries meaning: `ATTCH-0200000-17` trimmed of
//! its edge punctuation and markers is still the same code, never `0200000-17`.

use regex::Regex;
use std::sync::LazyLock;

use crate::GatekeeperError;

/// List markers: `1.`, `2)`, `a)`, `(iv)`, `(3)`, bullets
static ENUMERATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}[.)]\s+|[a-z][.)]\s+|\((?:[ivxlc]{1,6}|[a-z]|\d{1,3})\)\s*|[•·▪◦*–-]\s*)")
        .unwrap()
});

/// Upper-case label prefixes: `ITEM:`, `NOTE: `, `REQ - `
///
/// A hyphen joined to the next word (`MIL-STD`, `GSA-Schedule`) is not a label.
static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,6}(?::\s*|\s+[-–]\s+)").unwrap());

const WRAPPING_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('“', '”'),
    ('‘', '’'),
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('<', '>'),
];

fn is_edge_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '-' | '–' | '—' | '*' | '•' | '_' | '/' | '\\' | '#' | '|' | '~'
    )
}

/// Compiled protected identifier patterns
#[derive(Debug, Clone)]
pub struct IdentifierProtector {
    patterns: Vec<Regex>,
}

impl IdentifierProtector {
    /// Compile a list of patterns
    pub fn new(patterns: &[String]) -> Result<Self, GatekeeperError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| GatekeeperError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether a name matches any protected shape
    pub fn is_protected(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Return the protected form of a raw name, if it has one
    ///
    /// The raw name is tried trimmed, then with wrapping quotes or brackets
    /// removed. No other normalization happens before this check.
    pub fn protected_form(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if self.is_protected(trimmed) {
            return Some(trimmed.to_string());
        }
        let unwrapped = strip_wrapping(trimmed).trim();
        if unwrapped != trimmed && self.is_protected(unwrapped) {
            return Some(unwrapped.to_string());
        }
        None
    }
}

/// Remove one layer of matching quotes or brackets that wrap the whole string
fn strip_wrapping(s: &str) -> &str {
    for &(open, close) in WRAPPING_PAIRS {
        let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) else {
            continue;
        };
        if open == close || closes_at_end(inner, open, close) {
            return inner;
        }
    }
    s
}

/// Whether the opening bracket stripped before `inner` pairs with the one
/// stripped after it (rejects `(a) foo (b)`)
fn closes_at_end(inner: &str, open: char, close: char) -> bool {
    let mut depth = 0usize;
    for c in inner.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        }
    }
    depth == 0
}

/// Text after a label prefix, if the label is followed by a word
fn strip_label(name: &str) -> Option<&str> {
    let m = LABEL_PREFIX.find(name)?;
    let rest = &name[m.end()..];
    rest.chars()
        .next()
        .is_some_and(char::is_alphabetic)
        .then_some(rest)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply the first cleaning step that changes the name
fn clean_step(name: &str) -> Option<String> {
    let collapsed = collapse_whitespace(name);
    if collapsed != name {
        return Some(collapsed);
    }

    let unwrapped = strip_wrapping(name);
    if unwrapped.len() != name.len() {
        return Some(unwrapped.to_string());
    }

    if let Some(m) = ENUMERATION_MARKER.find(name) {
        return Some(name[m.end()..].to_string());
    }
    if let Some(rest) = strip_label(name) {
        return Some(rest.to_string());
    }

    let trimmed = name.trim_matches(is_edge_punctuation);
    if trimmed.len() != name.len() {
        return Some(trimmed.to_string());
    }

    None
}

/// Clean a name step by step, stopping early once `stop` accepts it
pub fn clean_until(name: &str, stop: impl Fn(&str) -> bool) -> String {
    let mut current = name.to_string();
    while !stop(&current) {
        match clean_step(&current) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// Clean a non-protected name
///
/// Steps run until none of them changes the name, so cleaning an
/// already-clean name is a no-op.
pub fn clean_name(name: &str) -> String {
    clean_until(name, |_| false)
}
