use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One resolved cohort's identity in a series: stable key, display label
/// (after any caller overrides), and member row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMeta {
    pub key: String,
    pub label: String,
    pub n: usize,
}

impl GroupMeta {
    pub fn new(key: impl Into<String>, label: impl Into<String>, n: usize) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            n,
        }
    }
}

/// Pairwise chi-square result for one answer option.
///
/// `pair` holds the two cohort keys in resolution order; the statistic is
/// symmetric, so the order is cosmetic. `significant` is tied to the fixed
/// p < 0.05 threshold while `p_value` carries the exact level for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Significance {
    pub pair: [String; 2],
    pub chi_square: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// One answer option's row in a series table.
///
/// Cohort values are flattened to top-level fields keyed by cohort key, the
/// shape charting components consume directly: percent in `[0, 100]` for
/// percent questions, average rank for ranking questions. A cohort key is
/// absent (not zero) when that cohort's denominator was zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Stable option key, derived from the option label.
    pub option: String,
    /// Human-readable option label.
    pub option_display: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub significance: Vec<Significance>,
    /// Top-N default flag: whether this option starts out visible before any
    /// user interaction.
    pub default_selected: bool,
}

impl SeriesPoint {
    /// This option's value for one cohort, if the cohort had a nonzero
    /// denominator.
    pub fn value(&self, cohort_key: &str) -> Option<f64> {
        self.values.get(cohort_key).copied()
    }
}

/// The full output of one series computation: one point per answer option
/// plus the resolved cohort metadata, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesTable {
    pub data: Vec<SeriesPoint>,
    pub groups: Vec<GroupMeta>,
}

impl SeriesTable {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.groups.is_empty()
    }

    pub fn point(&self, option_key: &str) -> Option<&SeriesPoint> {
        self.data.iter().find(|p| p.option == option_key)
    }

    pub fn group(&self, key: &str) -> Option<&GroupMeta> {
        self.groups.iter().find(|g| g.key == key)
    }
}
