use ahash::AHashSet;
use crosstab_model::{
    clean_label, Dataset, GatePolarity, OptionColumn, QuestionDef, QuestionKind, UniqueKeySet,
};
use smallvec::SmallVec;

use crate::diag::debug_once;

/// Fallback key stem for options whose label derives to an empty key.
pub(crate) const OPTION_KEY_FALLBACK: &str = "option";

/// Per-option aggregation result for one cohort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum OptionTally {
    /// Percent questions: matching rows over eligible rows.
    Share { numerator: u32, denominator: u32 },
    /// Ranking questions: accumulated rank positions over ranking rows.
    Rank { sum: f64, count: u32 },
}

impl OptionTally {
    /// The charted value: percent in `[0, 100]`, or mean rank (lower is
    /// better). `None` when the denominator (or rank count) is zero; a zero
    /// denominator never fabricates a value.
    pub fn value(&self) -> Option<f64> {
        match *self {
            OptionTally::Share {
                numerator,
                denominator,
            } => (denominator > 0).then(|| numerator as f64 / denominator as f64 * 100.0),
            OptionTally::Rank { sum, count } => (count > 0).then(|| sum / count as f64),
        }
    }

    /// Numerator/denominator for significance testing. Rank accumulators
    /// have no proportion to compare.
    pub fn share(&self) -> Option<(u32, u32)> {
        match *self {
            OptionTally::Share {
                numerator,
                denominator,
            } => Some((numerator, denominator)),
            OptionTally::Rank { .. } => None,
        }
    }
}

/// How rows are matched against one answer option.
enum OptionMatcher {
    /// Single/scale: the source column's cleaned text equals this
    /// (pre-cleaned) target.
    ValueEquals { target: String },
    /// Multi: a truthy marker in any of the option's columns.
    AnyChecked { cols: SmallVec<[usize; 2]> },
    /// Ranking: the first numeric value among the option's columns is the
    /// row's rank for it.
    RankValue { cols: SmallVec<[usize; 2]> },
}

pub(crate) struct PlannedOption {
    pub key: String,
    pub display: String,
    matcher: OptionMatcher,
}

/// A question with every column lookup resolved to dense indices, computed
/// once per series build and shared across cohorts.
pub(crate) struct QuestionPlan {
    pub options: Vec<PlannedOption>,
    pub ranking: bool,
    /// Single/scale source column, read once per row for all options.
    source_col: Option<usize>,
    /// Gate rating column + polarity for gated follow-up questions.
    gate: Option<(Option<usize>, GatePolarity)>,
    /// Non-gated multi: denominator counts only rows that answered at least
    /// one option of the question.
    shown_denominator: bool,
}

/// Resolves an option's header plus alternate headers to column indices.
/// Missing columns contribute zero matches and a one-time debug log.
pub(crate) fn option_columns(
    dataset: &Dataset,
    qid: &str,
    option: &OptionColumn,
) -> SmallVec<[usize; 2]> {
    let mut cols = SmallVec::new();
    for header in std::iter::once(option.header.as_str())
        .chain(option.alternate_headers.iter().map(String::as_str))
    {
        if header.is_empty() {
            continue;
        }
        match dataset.column_index(header) {
            Some(idx) => cols.push(idx),
            None => debug_once(
                "option column missing from dataset",
                format!("{qid}: {header}"),
            ),
        }
    }
    cols
}

pub(crate) fn plan_question(dataset: &Dataset, question: &QuestionDef) -> QuestionPlan {
    let mut keys = UniqueKeySet::new();

    let source_col = match question.kind {
        QuestionKind::Single | QuestionKind::Scale => match question.single_source_column.as_deref()
        {
            Some(name) => {
                let col = dataset.column_index(name);
                if col.is_none() {
                    debug_once(
                        "question source column missing",
                        format!("{}: {name}", question.qid),
                    );
                }
                col
            }
            None => {
                debug_once("question has no source column", question.qid.clone());
                None
            }
        },
        _ => None,
    };

    let options = match question.kind {
        QuestionKind::Single | QuestionKind::Scale => {
            if question.columns.is_empty() {
                discover_options(dataset, source_col, &mut keys)
            } else {
                question
                    .columns
                    .iter()
                    .map(|c| {
                        let display = clean_label(&c.option_label).to_string();
                        PlannedOption {
                            key: keys.allocate(&c.option_label, OPTION_KEY_FALLBACK),
                            matcher: OptionMatcher::ValueEquals {
                                target: display.clone(),
                            },
                            display,
                        }
                    })
                    .collect()
            }
        }
        QuestionKind::Multi => question
            .columns
            .iter()
            .map(|c| PlannedOption {
                key: keys.allocate(&c.option_label, OPTION_KEY_FALLBACK),
                display: clean_label(&c.option_label).to_string(),
                matcher: OptionMatcher::AnyChecked {
                    cols: option_columns(dataset, &question.qid, c),
                },
            })
            .collect(),
        QuestionKind::Ranking => question
            .columns
            .iter()
            .map(|c| PlannedOption {
                key: keys.allocate(&c.option_label, OPTION_KEY_FALLBACK),
                display: clean_label(&c.option_label).to_string(),
                matcher: OptionMatcher::RankValue {
                    cols: option_columns(dataset, &question.qid, c),
                },
            })
            .collect(),
        // Free text is never charted.
        QuestionKind::Text => Vec::new(),
    };

    let gate = question.gate.as_ref().map(|g| {
        let col = dataset.column_index(&g.rating_column);
        if col.is_none() {
            debug_once(
                "gate rating column missing",
                format!("{}: {}", question.qid, g.rating_column),
            );
        }
        (col, g.polarity)
    });

    QuestionPlan {
        options,
        ranking: question.kind == QuestionKind::Ranking,
        source_col,
        gate,
        shown_denominator: question.kind == QuestionKind::Multi && question.gate.is_none(),
    }
}

/// Options for a single/scale question without a declared option list:
/// distinct cleaned values of the source column, in first-appearance order
/// over the whole dataset (option identity must not depend on the cohort).
fn discover_options(
    dataset: &Dataset,
    source_col: Option<usize>,
    keys: &mut UniqueKeySet,
) -> Vec<PlannedOption> {
    let Some(col) = source_col else {
        return Vec::new();
    };
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut options = Vec::new();
    for row in 0..dataset.row_count() {
        let text = dataset.value(row, col).clean_text();
        if text.is_empty() || seen.contains(&text) {
            continue;
        }
        seen.insert(text.clone());
        options.push(PlannedOption {
            key: keys.allocate(&text, OPTION_KEY_FALLBACK),
            display: text.clone(),
            matcher: OptionMatcher::ValueEquals { target: text },
        });
    }
    options
}

/// Tallies every option of a planned question over one cohort's rows.
///
/// One pass over the rows for percent questions (numerators and the shown
/// denominator accumulate together); one pass per option for ranking
/// questions. Gating shrinks the row set once, up front.
pub(crate) fn cohort_tallies(
    dataset: &Dataset,
    plan: &QuestionPlan,
    rows: &[u32],
) -> Vec<OptionTally> {
    // Gated follow-ups only consider rows inside the sentiment band;
    // missing or non-numeric ratings drop out of numerator and denominator.
    let gated_rows;
    let eligible: &[u32] = match plan.gate {
        Some((col, polarity)) => {
            gated_rows = match col {
                Some(col) => rows
                    .iter()
                    .copied()
                    .filter(|&row| {
                        dataset
                            .value(row as usize, col)
                            .as_number()
                            .is_some_and(|rating| polarity.admits(rating))
                    })
                    .collect::<Vec<u32>>(),
                None => Vec::new(),
            };
            &gated_rows
        }
        None => rows,
    };

    if plan.ranking {
        return plan
            .options
            .iter()
            .map(|opt| {
                let mut sum = 0.0;
                let mut count = 0u32;
                if let OptionMatcher::RankValue { cols } = &opt.matcher {
                    for &row in eligible {
                        let rank = cols
                            .iter()
                            .find_map(|&c| dataset.value(row as usize, c).as_number());
                        if let Some(rank) = rank {
                            if rank >= 1.0 {
                                sum += rank;
                                count += 1;
                            }
                        }
                    }
                }
                OptionTally::Rank { sum, count }
            })
            .collect();
    }

    let mut numerators = vec![0u32; plan.options.len()];
    let mut answered_any = 0u32;
    for &row in eligible {
        let row = row as usize;
        let row_text = plan.source_col.map(|col| dataset.value(row, col).clean_text());
        let mut any = false;
        for (i, opt) in plan.options.iter().enumerate() {
            let hit = match &opt.matcher {
                OptionMatcher::ValueEquals { target } => {
                    row_text.as_deref() == Some(target.as_str())
                }
                OptionMatcher::AnyChecked { cols } => {
                    cols.iter().any(|&c| dataset.value(row, c).is_checked())
                }
                OptionMatcher::RankValue { .. } => false,
            };
            if hit {
                numerators[i] += 1;
                any = true;
            }
        }
        if any {
            answered_any += 1;
        }
    }

    let denominator = if plan.shown_denominator {
        answered_any
    } else {
        eligible.len() as u32
    };
    numerators
        .into_iter()
        .map(|numerator| OptionTally::Share {
            numerator,
            denominator,
        })
        .collect()
}
