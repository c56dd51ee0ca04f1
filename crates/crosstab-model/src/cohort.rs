use serde::{Deserialize, Serialize};

/// One cohort-membership predicate: rows whose `column` matches `value`.
///
/// `column` is either a raw segment-column name (value = a literal cell
/// value) or a question id (value = one of that question's option labels).
/// Question ids win when a name is both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDef {
    pub column: String,
    pub value: String,
}

impl SegmentDef {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// How a list of [`SegmentDef`]s turns into cohorts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// Each segment is its own cohort, shown side by side.
    #[default]
    Compare,
    /// The segments act as one combined filter (AND across columns, OR
    /// within a column) and collapse into a single `Overall` cohort.
    Filter,
}

/// A cohort specification, in either of the two shapes the UI produces.
///
/// `serde(untagged)`: the legacy shape (`{segmentColumn, groups}`) predates
/// the segment-list shape (`{segments, mode}`) and both still arrive from
/// stored chart configs; the required fields disambiguate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CohortSpec {
    #[serde(rename_all = "camelCase")]
    Legacy {
        segment_column: String,
        groups: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Segments {
        segments: Vec<SegmentDef>,
        #[serde(default)]
        mode: SegmentMode,
    },
}

impl CohortSpec {
    pub fn legacy(segment_column: impl Into<String>, groups: Vec<String>) -> Self {
        CohortSpec::Legacy {
            segment_column: segment_column.into(),
            groups,
        }
    }

    pub fn compare(segments: Vec<SegmentDef>) -> Self {
        CohortSpec::Segments {
            segments,
            mode: SegmentMode::Compare,
        }
    }

    pub fn filter(segments: Vec<SegmentDef>) -> Self {
        CohortSpec::Segments {
            segments,
            mode: SegmentMode::Filter,
        }
    }
}

/// An ad-hoc named cohort built from boolean filters: AND across distinct
/// filter columns, OR within one column's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSet {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub filters: Vec<SegmentDef>,
}

impl ComparisonSet {
    pub fn new(id: impl Into<String>, label: impl Into<String>, filters: Vec<SegmentDef>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            filters,
        }
    }

    /// Sets without filters match nothing and are excluded from aggregation.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }
}

/// A named group of products compared against each other on row-level data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBucket {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub products: Vec<String>,
}

impl ProductBucket {
    pub fn new(id: impl Into<String>, label: impl Into<String>, products: Vec<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            products,
        }
    }

    /// Buckets without products match nothing and are excluded from
    /// aggregation.
    pub fn has_products(&self) -> bool {
        !self.products.is_empty()
    }
}

/// Display ordering requested by the caller.
///
/// The engine always emits options in question order; this value is part of
/// the request's identity (the caller memoizes on it) and is applied by the
/// presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Original,
    ValueDesc,
    ValueAsc,
    Alpha,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn untagged_spec_shapes_deserialize() {
        let legacy: CohortSpec = serde_json::from_str(
            r#"{"segmentColumn":"Gender","groups":["Female","Male"]}"#,
        )
        .unwrap();
        assert_eq!(
            legacy,
            CohortSpec::legacy("Gender", vec!["Female".into(), "Male".into()])
        );

        let segments: CohortSpec = serde_json::from_str(
            r#"{"segments":[{"column":"Country","value":"US"}]}"#,
        )
        .unwrap();
        assert_eq!(
            segments,
            CohortSpec::compare(vec![SegmentDef::new("Country", "US")])
        );

        let filtered: CohortSpec = serde_json::from_str(
            r#"{"segments":[{"column":"Country","value":"US"}],"mode":"filter"}"#,
        )
        .unwrap();
        assert_eq!(
            filtered,
            CohortSpec::filter(vec![SegmentDef::new("Country", "US")])
        );
    }

    #[test]
    fn comparison_set_filters_default_empty() {
        let set: ComparisonSet =
            serde_json::from_str(r#"{"id":"cs1","label":"Young US"}"#).unwrap();
        assert_eq!(set, ComparisonSet::new("cs1", "Young US", vec![]));
        assert!(!set.has_filters());
    }

    #[test]
    fn sort_order_wire_names() {
        assert_eq!(
            serde_json::to_string(&SortOrder::ValueDesc).unwrap(),
            r#""valueDesc""#
        );
        let back: SortOrder = serde_json::from_str(r#""alpha""#).unwrap();
        assert_eq!(back, SortOrder::Alpha);
    }
}
