use std::collections::HashMap;

use thiserror::Error;

use crate::question::QuestionDef;
use crate::value::RawValue;

/// Errors raised while assembling a [`Dataset`].
///
/// These are ingestion bugs, not data conditions: they surface at the
/// construction boundary so aggregation code can assume a well-formed table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("duplicate column name: {0:?}")]
    DuplicateColumn(String),
    #[error("duplicate question id: {0:?}")]
    DuplicateQuestion(String),
}

/// A dense, immutable survey response table.
///
/// Rows are respondent records (or respondent×product records for row-level
/// data); columns are the raw upload headers. Questions carry the metadata
/// that binds answer options to columns. The engine only ever reads from
/// this; one `Dataset` serves arbitrarily many series computations.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<RawValue>>,
    questions: Vec<QuestionDef>,
    question_index: HashMap<String, usize>,
    segment_columns: Vec<String>,
    product_column: Option<String>,
}

impl Dataset {
    /// Builds a dataset, rejecting duplicate column names and duplicate
    /// question ids. Ragged rows are padded with [`RawValue::Empty`] (or
    /// truncated) to the column count.
    pub fn new(
        columns: Vec<String>,
        mut rows: Vec<Vec<RawValue>>,
        questions: Vec<QuestionDef>,
        segment_columns: Vec<String>,
    ) -> Result<Self, DatasetError> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if column_index.insert(name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        let mut question_index = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            if question_index.insert(q.qid.clone(), i).is_some() {
                return Err(DatasetError::DuplicateQuestion(q.qid.clone()));
            }
        }

        let width = columns.len();
        for row in &mut rows {
            if row.len() != width {
                row.resize(width, RawValue::Empty);
            }
        }

        Ok(Self {
            columns,
            column_index,
            rows,
            questions,
            question_index,
            segment_columns,
            product_column: None,
        })
    }

    /// Names the column holding the evaluated product for row-level data.
    /// Product-bucket cohorts match nothing without it.
    pub fn with_product_column(mut self, column: impl Into<String>) -> Self {
        self.product_column = Some(column.into());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    /// Cell accessor. `row` must be below [`row_count`](Self::row_count) and
    /// `col` below the column count; rows are padded at construction so every
    /// in-range pair is present.
    pub fn value(&self, row: usize, col: usize) -> &RawValue {
        &self.rows[row][col]
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn questions(&self) -> &[QuestionDef] {
        &self.questions
    }

    pub fn question(&self, qid: &str) -> Option<&QuestionDef> {
        self.question_index.get(qid).map(|&i| &self.questions[i])
    }

    pub fn segment_columns(&self) -> &[String] {
        &self.segment_columns
    }

    pub fn product_column(&self) -> Option<&str> {
        self.product_column.as_deref()
    }
}
