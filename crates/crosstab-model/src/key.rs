use std::collections::HashSet;

use crate::value::clean;

/// Derives a stable machine key from a display label.
///
/// The label is cleaned, Unicode-lowercased, and every run of
/// non-alphanumeric characters collapses into a single `_` (leading/trailing
/// runs are dropped). Keys survive cosmetic label edits like added spaces or
/// punctuation, which is what lets cached tables keep matching stored chart
/// configs.
///
/// An all-symbol label derives the empty key; callers that need a non-empty
/// key should go through [`derive_key_or`] or [`UniqueKeySet`].
pub fn derive_key(label: &str) -> String {
    // Lowercase before the collapse scan: a few code points lowercase to
    // more than one char (U+0130 becomes `i` plus a combining dot), and any
    // non-alphanumeric chars in the expansion must fold into separators too.
    let lowered = clean(label).to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// [`derive_key`], falling back to `fallback` when the label derives empty.
pub fn derive_key_or(label: &str, fallback: &str) -> String {
    let key = derive_key(label);
    if key.is_empty() {
        fallback.to_string()
    } else {
        key
    }
}

/// Allocates unique keys for a batch of labels.
///
/// Distinct labels can derive the same key (`"US"` and `"U.S."` both derive
/// `us`), and downstream consumers index series points by key, so collisions
/// within one table get numeric suffixes: `us`, `us_2`, `us_3`.
#[derive(Debug, Default)]
pub struct UniqueKeySet {
    used: HashSet<String>,
}

impl UniqueKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a key for `label` (with `fallback` standing in for all-symbol
    /// labels) that is unique among the keys this set has handed out.
    pub fn allocate(&mut self, label: &str, fallback: &str) -> String {
        let base = derive_key_or(label, fallback);
        let mut key = base.clone();
        if self.used.contains(&key) {
            let mut suffix = 2usize;
            loop {
                key = format!("{base}_{suffix}");
                if !self.used.contains(&key) {
                    break;
                }
                suffix += 1;
            }
        }
        self.used.insert(key.clone());
        key
    }
}
