use ahash::{AHashMap, AHashSet};
use crosstab_model::{
    clean_label, CohortSpec, ComparisonSet, Dataset, ProductBucket, QuestionDef, QuestionKind,
    SegmentDef, SegmentMode, UniqueKeySet,
};
use smallvec::SmallVec;

use crate::diag::debug_once;
use crate::tally::option_columns;

pub(crate) const OVERALL_LABEL: &str = "Overall";

/// Fallback key stem for cohorts whose label derives to an empty key.
pub(crate) const COHORT_KEY_FALLBACK: &str = "group";

/// One cohort ready for tallying: stable key, display label, and the dataset
/// row indices of its members, in row order.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedCohort {
    pub key: String,
    pub label: String,
    pub rows: Vec<u32>,
    /// Synthetic whole-dataset (or whole-filter) cohort. Its value is
    /// preferred as an option's representative value for default selection.
    pub is_overall: bool,
}

/// A compiled [`SegmentDef`]: column lookups resolved once, before any row
/// loop.
enum Predicate {
    /// Cleaned equality against one raw column.
    Equals { col: usize, target: String },
    /// Truthy marker in any of a multi-select option's columns.
    AnyChecked { cols: SmallVec<[usize; 2]> },
    /// Matches nothing (unknown column, unusable question, missing option).
    Never,
}

impl Predicate {
    fn matches(&self, dataset: &Dataset, row: usize) -> bool {
        match self {
            Predicate::Equals { col, target } => dataset.value(row, *col).text_matches(target),
            Predicate::AnyChecked { cols } => {
                cols.iter().any(|&col| dataset.value(row, col).is_checked())
            }
            Predicate::Never => false,
        }
    }
}

fn compile_predicate(dataset: &Dataset, def: &SegmentDef) -> Predicate {
    // Question ids win over raw column names on collisions.
    if let Some(question) = dataset.question(&def.column) {
        return compile_question_predicate(dataset, question, &def.value);
    }
    match dataset.column_index(&def.column) {
        Some(col) => Predicate::Equals {
            col,
            target: clean_label(&def.value).to_string(),
        },
        None => {
            debug_once("filter references unknown column", def.column.clone());
            Predicate::Never
        }
    }
}

/// Consumer-question predicates: single/scale match the source column's value
/// against the option label; multi matches a truthy marker in the named
/// option's columns. Ranking and free-text questions have no row-membership
/// reading, so they match nothing.
fn compile_question_predicate(
    dataset: &Dataset,
    question: &QuestionDef,
    option: &str,
) -> Predicate {
    match question.kind {
        QuestionKind::Single | QuestionKind::Scale => {
            let col = question
                .single_source_column
                .as_deref()
                .and_then(|name| dataset.column_index(name));
            match col {
                Some(col) => Predicate::Equals {
                    col,
                    target: clean_label(option).to_string(),
                },
                None => {
                    debug_once("question source column missing", question.qid.clone());
                    Predicate::Never
                }
            }
        }
        QuestionKind::Multi => {
            let target = clean_label(option);
            let Some(option_def) = question
                .columns
                .iter()
                .find(|c| clean_label(&c.option_label) == target)
            else {
                debug_once(
                    "filter references unknown option",
                    format!("{}: {option}", question.qid),
                );
                return Predicate::Never;
            };
            let cols = option_columns(dataset, &question.qid, option_def);
            if cols.is_empty() {
                Predicate::Never
            } else {
                Predicate::AnyChecked { cols }
            }
        }
        QuestionKind::Ranking | QuestionKind::Text => {
            debug_once("question kind unusable as a filter", question.qid.clone());
            Predicate::Never
        }
    }
}

/// The shared AND-across-columns / OR-within-a-column combinator.
///
/// Segment filter mode, comparison sets and product buckets must agree on
/// these semantics, so they all funnel through here: defs are grouped by
/// `column` (first-appearance order), and a row is kept only if every column
/// group has at least one matching value. With no defs at all the AND is
/// vacuous and every row passes; callers that want "no filters means no
/// rows" check for that before calling.
pub(crate) fn filter_rows(dataset: &Dataset, defs: &[SegmentDef]) -> Vec<u32> {
    let mut groups: Vec<(&str, Vec<Predicate>)> = Vec::new();
    for def in defs {
        let pred = compile_predicate(dataset, def);
        match groups.iter_mut().find(|(col, _)| *col == def.column) {
            Some((_, preds)) => preds.push(pred),
            None => groups.push((def.column.as_str(), vec![pred])),
        }
    }

    (0..dataset.row_count() as u32)
        .filter(|&row| {
            groups
                .iter()
                .all(|(_, preds)| preds.iter().any(|p| p.matches(dataset, row as usize)))
        })
        .collect()
}

fn all_rows(dataset: &Dataset) -> Vec<u32> {
    (0..dataset.row_count() as u32).collect()
}

fn overall_cohort(keys: &mut UniqueKeySet, rows: Vec<u32>) -> ResolvedCohort {
    ResolvedCohort {
        key: keys.allocate(OVERALL_LABEL, COHORT_KEY_FALLBACK),
        label: OVERALL_LABEL.to_string(),
        rows,
        is_overall: true,
    }
}

/// Resolves a [`CohortSpec`] into ordered cohorts.
pub(crate) fn resolve_cohorts(dataset: &Dataset, spec: &CohortSpec) -> Vec<ResolvedCohort> {
    match spec {
        CohortSpec::Legacy {
            segment_column,
            groups,
        } => resolve_legacy(dataset, segment_column, groups),
        CohortSpec::Segments {
            segments,
            mode: SegmentMode::Compare,
        } => resolve_compare(dataset, segments),
        CohortSpec::Segments {
            segments,
            mode: SegmentMode::Filter,
        } => {
            let mut keys = UniqueKeySet::new();
            vec![overall_cohort(&mut keys, filter_rows(dataset, segments))]
        }
    }
}

/// Legacy shape: a synthetic `Overall` cohort first, then one cohort per
/// listed segment value. Duplicate listed values are ignored after the
/// first; rows with an empty segment cell belong to no listed group.
fn resolve_legacy(dataset: &Dataset, segment_column: &str, groups: &[String]) -> Vec<ResolvedCohort> {
    let mut keys = UniqueKeySet::new();
    let mut cohorts = vec![overall_cohort(&mut keys, all_rows(dataset))];

    let col = dataset.column_index(segment_column);
    if col.is_none() && !groups.is_empty() {
        debug_once("segment column missing from dataset", segment_column.to_string());
    }

    // Cleaned value -> cohort slot, one pass over the rows afterwards.
    let mut slots: AHashMap<String, usize> = AHashMap::with_capacity(groups.len());
    for value in groups {
        let cleaned = clean_label(value);
        if slots.contains_key(cleaned) {
            continue;
        }
        slots.insert(cleaned.to_string(), cohorts.len());
        cohorts.push(ResolvedCohort {
            key: keys.allocate(value, COHORT_KEY_FALLBACK),
            label: cleaned.to_string(),
            rows: Vec::new(),
            is_overall: false,
        });
    }

    if let Some(col) = col {
        for row in 0..dataset.row_count() {
            let text = dataset.value(row, col).clean_text();
            if text.is_empty() {
                continue;
            }
            if let Some(&slot) = slots.get(text.as_str()) {
                cohorts[slot].rows.push(row as u32);
            }
        }
    }

    cohorts
}

/// Compare mode: each segment is its own cohort, side by side.
fn resolve_compare(dataset: &Dataset, segments: &[SegmentDef]) -> Vec<ResolvedCohort> {
    let mut keys = UniqueKeySet::new();
    segments
        .iter()
        .map(|def| {
            let pred = compile_predicate(dataset, def);
            let rows = (0..dataset.row_count() as u32)
                .filter(|&row| pred.matches(dataset, row as usize))
                .collect();
            ResolvedCohort {
                key: keys.allocate(&def.value, COHORT_KEY_FALLBACK),
                label: clean_label(&def.value).to_string(),
                rows,
                is_overall: false,
            }
        })
        .collect()
}

/// One cohort per comparison set, via the shared AND/OR combinator. A set
/// without filters yields zero rows (the aggregation entry point excludes
/// such sets before resolution).
pub(crate) fn resolve_comparison_sets(
    dataset: &Dataset,
    sets: &[&ComparisonSet],
) -> Vec<ResolvedCohort> {
    let mut keys = UniqueKeySet::new();
    sets.iter()
        .map(|set| {
            let rows = if set.has_filters() {
                filter_rows(dataset, &set.filters)
            } else {
                Vec::new()
            };
            ResolvedCohort {
                key: keys.allocate(&set.label, COHORT_KEY_FALLBACK),
                label: clean_label(&set.label).to_string(),
                rows,
                is_overall: false,
            }
        })
        .collect()
}

/// One cohort per product bucket: rows whose cleaned product-column value is
/// one of the bucket's products. A dataset without a usable product column
/// yields zero rows per bucket.
pub(crate) fn resolve_product_buckets(
    dataset: &Dataset,
    buckets: &[&ProductBucket],
) -> Vec<ResolvedCohort> {
    let col = match dataset.product_column() {
        Some(name) => {
            let idx = dataset.column_index(name);
            if idx.is_none() {
                debug_once("product column missing from dataset", name.to_string());
            }
            idx
        }
        None => {
            if !buckets.is_empty() {
                debug_once(
                    "product buckets unusable",
                    "dataset has no product column".to_string(),
                );
            }
            None
        }
    };

    let mut keys = UniqueKeySet::new();
    buckets
        .iter()
        .map(|bucket| {
            let rows = match col {
                Some(col) => {
                    let members: AHashSet<&str> =
                        bucket.products.iter().map(|p| clean_label(p)).collect();
                    (0..dataset.row_count() as u32)
                        .filter(|&row| {
                            members.contains(dataset.value(row as usize, col).clean_text().as_str())
                        })
                        .collect()
                }
                None => Vec::new(),
            };
            ResolvedCohort {
                key: keys.allocate(&bucket.label, COHORT_KEY_FALLBACK),
                label: clean_label(&bucket.label).to_string(),
                rows,
                is_overall: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstab_model::{OptionColumn, RawValue};
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        let columns = ["Country", "Age", "Feature: Sync", "Plan"]
            .map(String::from)
            .to_vec();
        let rows = vec![
            vec!["US".into(), "18-24".into(), RawValue::Number(1.0), "Pro".into()],
            vec!["US".into(), "25-34".into(), RawValue::Empty, "Free".into()],
            vec!["CA".into(), "18-24".into(), "yes".into(), "Pro".into()],
            vec!["DE".into(), "18-24".into(), "0".into(), "Free".into()],
            vec![" \"US\" ".into(), "35-44".into(), RawValue::Bool(true), "Pro".into()],
        ];
        let questions = vec![
            QuestionDef::single("q_plan", "Plan", "Plan"),
            QuestionDef::multi(
                "q_features",
                "Features used",
                vec![OptionColumn::new("Feature: Sync", "Sync")],
            ),
        ];
        Dataset::new(columns, rows, questions, vec!["Country".into(), "Age".into()]).unwrap()
    }

    fn row_sets(cohorts: &[ResolvedCohort]) -> Vec<(String, Vec<u32>)> {
        cohorts
            .iter()
            .map(|c| (c.key.clone(), c.rows.clone()))
            .collect()
    }

    #[test]
    fn legacy_mode_puts_overall_first_and_dedupes_groups() {
        let ds = dataset();
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::legacy(
                "Country",
                vec!["US".into(), "CA".into(), "\"US\"".into()],
            ),
        );
        assert_eq!(
            row_sets(&cohorts),
            vec![
                ("overall".to_string(), vec![0, 1, 2, 3, 4]),
                ("us".to_string(), vec![0, 1, 4]),
                ("ca".to_string(), vec![2]),
            ]
        );
        assert!(cohorts[0].is_overall);
        assert!(!cohorts[1].is_overall);
        assert_eq!(cohorts[1].label, "US");
    }

    #[test]
    fn compare_mode_resolves_each_segment_separately() {
        let ds = dataset();
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::compare(vec![
                SegmentDef::new("Age", "18-24"),
                SegmentDef::new("Country", "US"),
            ]),
        );
        assert_eq!(
            row_sets(&cohorts),
            vec![
                ("18_24".to_string(), vec![0, 2, 3]),
                ("us".to_string(), vec![0, 1, 4]),
            ]
        );
    }

    #[test]
    fn empty_compare_list_resolves_to_zero_cohorts() {
        let ds = dataset();
        assert!(resolve_cohorts(&ds, &CohortSpec::compare(vec![])).is_empty());
    }

    #[test]
    fn filter_mode_ands_across_columns_ors_within() {
        let ds = dataset();
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::filter(vec![
                SegmentDef::new("Country", "US"),
                SegmentDef::new("Country", "CA"),
                SegmentDef::new("Age", "18-24"),
            ]),
        );
        assert_eq!(row_sets(&cohorts), vec![("overall".to_string(), vec![0, 2])]);
        assert!(cohorts[0].is_overall);
    }

    #[test]
    fn empty_filter_list_imposes_no_constraint() {
        let ds = dataset();
        let cohorts = resolve_cohorts(&ds, &CohortSpec::filter(vec![]));
        assert_eq!(row_sets(&cohorts), vec![("overall".to_string(), vec![0, 1, 2, 3, 4])]);
    }

    #[test]
    fn question_predicates_beat_raw_columns() {
        let ds = dataset();
        // "q_plan" is a question id; matching goes through its source column.
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::compare(vec![SegmentDef::new("q_plan", "Pro")]),
        );
        assert_eq!(row_sets(&cohorts), vec![("pro".to_string(), vec![0, 2, 4])]);

        // Multi-select option predicate: truthy markers across the option's
        // columns.
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::compare(vec![SegmentDef::new("q_features", "Sync")]),
        );
        assert_eq!(row_sets(&cohorts), vec![("sync".to_string(), vec![0, 2, 4])]);
    }

    #[test]
    fn unknown_columns_and_options_match_nothing() {
        let ds = dataset();
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::compare(vec![
                SegmentDef::new("Nonexistent", "x"),
                SegmentDef::new("q_features", "Nonexistent option"),
            ]),
        );
        assert_eq!(
            row_sets(&cohorts),
            vec![
                ("x".to_string(), vec![]),
                ("nonexistent_option".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn comparison_sets_use_the_same_combinator() {
        let ds = dataset();
        let young_na = ComparisonSet::new(
            "cs1",
            "Young North America",
            vec![
                SegmentDef::new("Country", "US"),
                SegmentDef::new("Country", "CA"),
                SegmentDef::new("Age", "18-24"),
            ],
        );
        let empty = ComparisonSet::new("cs2", "No filters", vec![]);
        let cohorts = resolve_comparison_sets(&ds, &[&young_na, &empty]);
        assert_eq!(
            row_sets(&cohorts),
            vec![
                ("young_north_america".to_string(), vec![0, 2]),
                ("no_filters".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn product_buckets_match_cleaned_membership() {
        let ds = dataset().with_product_column("Plan");
        let paid = ProductBucket::new("b1", "Paid", vec!["\"Pro\"".into(), "Team".into()]);
        let free = ProductBucket::new("b2", "Free tier", vec!["Free".into()]);
        let cohorts = resolve_product_buckets(&ds, &[&paid, &free]);
        assert_eq!(
            row_sets(&cohorts),
            vec![
                ("paid".to_string(), vec![0, 2, 4]),
                ("free_tier".to_string(), vec![1, 3]),
            ]
        );
    }

    #[test]
    fn product_buckets_without_a_product_column_are_empty() {
        let ds = dataset();
        let paid = ProductBucket::new("b1", "Paid", vec!["Pro".into()]);
        let cohorts = resolve_product_buckets(&ds, &[&paid]);
        assert_eq!(row_sets(&cohorts), vec![("paid".to_string(), vec![])]);
    }

    #[test]
    fn colliding_cohort_labels_get_unique_keys() {
        let ds = dataset();
        let cohorts = resolve_cohorts(
            &ds,
            &CohortSpec::compare(vec![
                SegmentDef::new("Country", "US"),
                SegmentDef::new("Country", "\"US\""),
            ]),
        );
        let keys: Vec<&str> = cohorts.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["us", "us_2"]);
    }
}
