use crosstab_engine::{
    build_series_from_comparison_sets, ComparisonSet, Dataset, QuestionDef, SegmentDef, SortOrder,
};
use pretty_assertions::assert_eq;

fn survey() -> Dataset {
    let rows = vec![
        vec!["US".into(), "18-24".into(), "Red".into()],
        vec!["US".into(), "25-34".into(), "Blue".into()],
        vec!["CA".into(), "18-24".into(), "Blue".into()],
        vec!["CA".into(), "35-44".into(), "Red".into()],
        vec!["UK".into(), "18-24".into(), "Red".into()],
        vec!["US".into(), "18-24".into(), "Blue".into()],
    ];
    Dataset::new(
        vec!["Country".into(), "Age".into(), "Color".into()],
        rows,
        vec![
            QuestionDef::single("q_color", "Favorite color", "Color"),
            QuestionDef::single("q_age", "Age bracket", "Age"),
        ],
        vec!["Country".into(), "Age".into()],
    )
    .expect("dataset")
}

fn series(ds: &Dataset, qid: &str, sets: &[ComparisonSet]) -> crosstab_engine::SeriesTable {
    build_series_from_comparison_sets(
        ds,
        ds.question(qid).expect("question"),
        sets,
        SortOrder::Original,
    )
}

#[test]
fn filters_or_within_a_column_and_and_across_columns() {
    let ds = survey();
    let sets = vec![ComparisonSet::new(
        "cs1",
        "Young North America",
        vec![
            SegmentDef::new("Country", "US"),
            SegmentDef::new("Country", "CA"),
            SegmentDef::new("Age", "18-24"),
        ],
    )];

    let table = series(&ds, "q_color", &sets);
    // (US or CA) and 18-24: rows 0, 2, 5.
    let group = table.group("young_north_america").expect("group");
    assert_eq!(group.n, 3);
    assert_eq!(group.label, "Young North America");

    let red = table.point("red").expect("red");
    assert!((red.value("young_north_america").expect("value") - 100.0 / 3.0).abs() < 1e-9);
    let blue = table.point("blue").expect("blue");
    assert!((blue.value("young_north_america").expect("value") - 200.0 / 3.0).abs() < 1e-9);
}

#[test]
fn filterless_sets_are_dropped_not_emptied() {
    let ds = survey();
    let sets = vec![
        ComparisonSet::new("cs1", "US only", vec![SegmentDef::new("Country", "US")]),
        ComparisonSet::new("cs2", "Everything", vec![]),
    ];

    let table = series(&ds, "q_color", &sets);
    let keys: Vec<&str> = table.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["us_only"]);
}

#[test]
fn sets_compare_side_by_side_with_significance() {
    let ds = survey();
    let sets = vec![
        ComparisonSet::new("cs1", "US", vec![SegmentDef::new("Country", "US")]),
        ComparisonSet::new("cs2", "CA", vec![SegmentDef::new("Country", "CA")]),
    ];

    let table = series(&ds, "q_color", &sets);
    assert_eq!(table.group("us").expect("us").n, 3);
    assert_eq!(table.group("ca").expect("ca").n, 2);

    let red = table.point("red").expect("red");
    assert!((red.value("us").expect("us") - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(red.value("ca"), Some(50.0));

    // {1,2;1,1}: chi = 5 * (1-2)^2 / (3*2*2*3).
    assert_eq!(red.significance.len(), 1);
    let sig = &red.significance[0];
    assert_eq!(sig.pair, ["us".to_string(), "ca".to_string()]);
    assert!((sig.chi_square - 5.0 / 36.0).abs() < 1e-9, "got {}", sig.chi_square);
    assert!(!sig.significant);
}

#[test]
fn filters_may_target_question_answers() {
    let ds = survey();
    let sets = vec![ComparisonSet::new(
        "cs1",
        "Red fans",
        vec![SegmentDef::new("q_color", "Red")],
    )];

    let table = series(&ds, "q_age", &sets);
    // Rows 0, 3 and 4 answered Red.
    assert_eq!(table.group("red_fans").expect("group").n, 3);
    let young = table.point("18_24").expect("18-24");
    assert!((young.value("red_fans").expect("value") - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(table.point("25_34").expect("25-34").value("red_fans"), Some(0.0));
}

#[test]
fn nothing_usable_yields_an_empty_table() {
    let ds = survey();
    let sets = vec![
        ComparisonSet::new("cs1", "A", vec![]),
        ComparisonSet::new("cs2", "B", vec![]),
    ];

    let table = series(&ds, "q_color", &sets);
    assert!(table.is_empty());
    assert!(table.groups.is_empty());
}

#[test]
fn unmatched_filters_keep_the_cohort_with_zero_members() {
    let ds = survey();
    let sets = vec![
        ComparisonSet::new("cs1", "US", vec![SegmentDef::new("Country", "US")]),
        ComparisonSet::new("cs2", "Germany", vec![SegmentDef::new("Country", "DE")]),
    ];

    let table = series(&ds, "q_color", &sets);
    let germany = table.group("germany").expect("germany");
    assert_eq!(germany.n, 0);
    let red = table.point("red").expect("red");
    assert_eq!(red.value("germany"), None);
    // No significance against an empty cohort.
    assert!(red.significance.is_empty());
}
