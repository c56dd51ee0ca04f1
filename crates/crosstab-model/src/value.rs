use serde::{Deserialize, Serialize};

/// A single cell from an uploaded survey response table.
///
/// Upload pipelines keep cells loosely typed: numeric columns can arrive as
/// text (`"4"`, `" 42 "`, `"\"3\""`), checkbox columns as numbers, booleans or
/// marker strings. The accessors below define the canonical coercions that
/// every aggregation path shares, so a rating of `4` and a rating of `"4"`
/// always tally identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum RawValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Strips layout noise from a label or raw text cell: surrounding
/// whitespace, plus one layer of wrapping double quotes (CSV exports
/// frequently leave them in).
///
/// This is the normalization applied before every textual comparison in the
/// engine (segment values, filter targets, option labels, product names).
/// Returns a subslice of the input; never allocates.
pub fn clean_label(s: &str) -> &str {
    clean(s)
}

pub(crate) fn clean(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// Renders a numeric cell the way respondents typed it: whole numbers without
/// a trailing `.0`, everything else via the default float formatting.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl RawValue {
    /// Returns `true` when the cell carries no answer.
    ///
    /// Text cells count as empty when they clean down to nothing, so `"  "`
    /// and `"\"\""` are skipped exactly like a missing cell.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => clean(s).is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the cell, if one exists.
    ///
    /// Text is parsed after cleaning (`" \"4\" "` reads as `4.0`). Booleans
    /// and empty cells have no numeric reading, and non-finite numbers are
    /// rejected so ratings/ranks never see `NaN`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            RawValue::Text(s) => clean(s).parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Canonical text reading of the cell, used for group discovery and
    /// display labels.
    pub fn clean_text(&self) -> String {
        match self {
            RawValue::Empty => String::new(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => clean(s).to_string(),
            RawValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }

    /// Case-sensitive equality against a target string, with both sides
    /// cleaned first. This is the matching rule for segment values, filter
    /// values and single-select options.
    pub fn text_matches(&self, target: &str) -> bool {
        let target = clean(target);
        match self {
            RawValue::Empty => target.is_empty(),
            RawValue::Number(n) => format_number(*n) == target,
            RawValue::Text(s) => clean(s) == target,
            RawValue::Bool(b) => (if *b { "true" } else { "false" }) == target,
        }
    }

    /// Truthiness rule for checkbox-style columns (multi-select options,
    /// ranking membership). Accepts `true`, the number `1`, and the cleaned
    /// markers `"1"`, `"true"`, `"yes"` (markers case-insensitive).
    pub fn is_checked(&self) -> bool {
        match self {
            RawValue::Empty => false,
            RawValue::Number(n) => *n == 1.0,
            RawValue::Text(s) => {
                let s = clean(s);
                s == "1" || s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
            }
            RawValue::Bool(b) => *b,
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}
