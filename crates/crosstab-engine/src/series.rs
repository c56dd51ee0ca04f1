use std::collections::BTreeMap;

use crosstab_model::{
    CohortSpec, ComparisonSet, Dataset, GroupMeta, ProductBucket, QuestionDef, SeriesPoint,
    SeriesTable, Significance, SortOrder,
};
use serde::Serialize;

use crate::resolve::{
    resolve_cohorts, resolve_comparison_sets, resolve_product_buckets, ResolvedCohort,
};
use crate::significance::test_pair;
use crate::tally::{cohort_tallies, plan_question, OptionTally};

/// How many options start out visible before any user interaction.
const DEFAULT_SELECTED_LIMIT: usize = 8;

/// Builds the option-by-cohort series for one question.
///
/// `overrides` maps cohort keys to replacement display labels; keys always
/// derive from the original labels so an override never changes identity.
/// `_sort_order` is part of the request's identity (see
/// [`series_cache_key`]) but never changes engine output: options are always
/// emitted in question order, and display ordering is a presentation
/// concern.
pub fn build_series(
    dataset: &Dataset,
    question: &QuestionDef,
    spec: &CohortSpec,
    _sort_order: SortOrder,
    overrides: Option<&BTreeMap<String, String>>,
) -> SeriesTable {
    let cohorts = resolve_cohorts(dataset, spec);
    build_table(dataset, question, &cohorts, overrides)
}

/// Builds a series comparing ad-hoc comparison sets side by side. Sets
/// without filters are excluded entirely, not shown as empty cohorts.
pub fn build_series_from_comparison_sets(
    dataset: &Dataset,
    question: &QuestionDef,
    sets: &[ComparisonSet],
    _sort_order: SortOrder,
) -> SeriesTable {
    let usable: Vec<&ComparisonSet> = sets.iter().filter(|s| s.has_filters()).collect();
    let cohorts = resolve_comparison_sets(dataset, &usable);
    build_table(dataset, question, &cohorts, None)
}

/// Builds a series comparing product buckets side by side. Buckets without
/// products are excluded entirely.
pub fn build_series_from_product_buckets(
    dataset: &Dataset,
    question: &QuestionDef,
    buckets: &[ProductBucket],
    _sort_order: SortOrder,
) -> SeriesTable {
    let usable: Vec<&ProductBucket> = buckets.iter().filter(|b| b.has_products()).collect();
    let cohorts = resolve_product_buckets(dataset, &usable);
    build_table(dataset, question, &cohorts, None)
}

fn build_table(
    dataset: &Dataset,
    question: &QuestionDef,
    cohorts: &[ResolvedCohort],
    overrides: Option<&BTreeMap<String, String>>,
) -> SeriesTable {
    if cohorts.is_empty() || cohorts.iter().all(|c| c.rows.is_empty()) {
        return SeriesTable::default();
    }

    let plan = plan_question(dataset, question);

    let tallies: Vec<Vec<OptionTally>> = cohorts
        .iter()
        .map(|cohort| cohort_tallies(dataset, &plan, &cohort.rows))
        .collect();

    let groups: Vec<GroupMeta> = cohorts
        .iter()
        .map(|cohort| {
            let label = overrides
                .and_then(|m| m.get(&cohort.key))
                .cloned()
                .unwrap_or_else(|| cohort.label.clone());
            GroupMeta::new(cohort.key.clone(), label, cohort.rows.len())
        })
        .collect();

    // Pairwise testing needs at least two real cohorts; a lone `Overall`
    // (or `Overall` plus a single group it contains) produces no pairs.
    let test_pairs =
        !plan.ranking && cohorts.iter().filter(|c| !c.is_overall).count() >= 2;

    let mut data: Vec<SeriesPoint> = plan
        .options
        .iter()
        .enumerate()
        .map(|(opt_idx, option)| {
            let mut values = BTreeMap::new();
            for (cohort, cohort_tally) in cohorts.iter().zip(&tallies) {
                if let Some(value) = cohort_tally[opt_idx].value() {
                    values.insert(cohort.key.clone(), value);
                }
            }

            let mut significance = Vec::new();
            if test_pairs {
                for i in 0..cohorts.len() {
                    for j in (i + 1)..cohorts.len() {
                        let (Some(a), Some(b)) =
                            (tallies[i][opt_idx].share(), tallies[j][opt_idx].share())
                        else {
                            continue;
                        };
                        let Some(test) = test_pair(a, b) else {
                            continue;
                        };
                        significance.push(Significance {
                            pair: [cohorts[i].key.clone(), cohorts[j].key.clone()],
                            chi_square: test.chi_square,
                            p_value: test.p_value,
                            significant: test.significant,
                        });
                    }
                }
            }

            SeriesPoint {
                option: option.key.clone(),
                option_display: option.display.clone(),
                values,
                significance,
                default_selected: false,
            }
        })
        .collect();

    mark_default_selected(&mut data, cohorts, plan.ranking);

    SeriesTable { data, groups }
}

/// Marks the options that start out visible: all of them for ranking
/// questions, otherwise the top [`DEFAULT_SELECTED_LIMIT`] by representative
/// value (the `Overall` cohort's value when it has one, else the mean of the
/// option's present values). Options without any value sort last; ties keep
/// original option order.
fn mark_default_selected(data: &mut [SeriesPoint], cohorts: &[ResolvedCohort], ranking: bool) {
    if ranking {
        for point in data.iter_mut() {
            point.default_selected = true;
        }
        return;
    }

    let overall_key = cohorts
        .iter()
        .find(|c| c.is_overall)
        .map(|c| c.key.as_str());

    let representative: Vec<Option<f64>> = data
        .iter()
        .map(|point| {
            if let Some(value) = overall_key.and_then(|key| point.value(key)) {
                return Some(value);
            }
            let present: Vec<f64> = point.values.values().copied().collect();
            (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64)
        })
        .collect();

    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| match (representative[a], representative[b]) {
        (Some(va), Some(vb)) => vb.total_cmp(&va),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    for &idx in order.iter().take(DEFAULT_SELECTED_LIMIT) {
        data[idx].default_selected = true;
    }
}

/// Canonical serialization of a request's identity, for caller-side
/// memoization.
///
/// The engine never caches; this only guarantees that every call site
/// (chart rendering, export) derives the same key for the same request.
/// `spec` is whichever cohort specification the request used (a
/// [`CohortSpec`], a comparison-set list, a bucket list).
pub fn series_cache_key<S: Serialize>(
    dataset_id: &str,
    qid: &str,
    spec: &S,
    sort_order: SortOrder,
    overrides: Option<&BTreeMap<String, String>>,
) -> String {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct RequestIdentity<'a, S> {
        dataset: &'a str,
        qid: &'a str,
        cohorts: &'a S,
        sort_order: SortOrder,
        #[serde(skip_serializing_if = "Option::is_none")]
        overrides: Option<&'a BTreeMap<String, String>>,
    }

    let identity = RequestIdentity {
        dataset: dataset_id,
        qid,
        cohorts: spec,
        sort_order,
        overrides,
    };
    match serde_json::to_string(&identity) {
        Ok(key) => key,
        Err(err) => {
            debug_assert!(false, "request identity failed to serialize: {err}");
            format!("{dataset_id}:{qid}:opaque")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstab_model::SegmentDef;
    use pretty_assertions::assert_eq;

    #[test]
    fn cache_keys_are_stable_and_disambiguate_requests() {
        let spec = CohortSpec::compare(vec![SegmentDef::new("Country", "US")]);
        let a = series_cache_key("ds1", "q1", &spec, SortOrder::Original, None);
        let b = series_cache_key("ds1", "q1", &spec, SortOrder::Original, None);
        assert_eq!(a, b);

        assert_ne!(
            a,
            series_cache_key("ds1", "q1", &spec, SortOrder::ValueDesc, None)
        );
        assert_ne!(a, series_cache_key("ds1", "q2", &spec, SortOrder::Original, None));

        let overrides = BTreeMap::from([("us".to_string(), "United States".to_string())]);
        assert_ne!(
            a,
            series_cache_key("ds1", "q1", &spec, SortOrder::Original, Some(&overrides))
        );
    }

    #[test]
    fn cache_key_covers_comparison_set_requests() {
        let sets = vec![ComparisonSet::new(
            "cs1",
            "Young US",
            vec![SegmentDef::new("Country", "US")],
        )];
        let key = series_cache_key("ds1", "q1", &sets, SortOrder::Original, None);
        assert!(key.contains("\"cs1\""));
        assert!(key.contains("\"sortOrder\":\"original\""));
    }
}
