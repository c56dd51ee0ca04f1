use serde::{Deserialize, Serialize};

/// Answer-structure class of a survey question. Drives how numerators and
/// denominators are computed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// One answer per respondent, stored as option text in a single column.
    Single,
    /// One raw column per option, holding a truthy marker when chosen.
    Multi,
    /// Numeric rating question; aggregates like single-select over the
    /// distinct rating values.
    Scale,
    /// One raw column per option, holding the rank position (1 = best).
    Ranking,
    /// Free text; carried in the model but never charted.
    Text,
}

/// Whether a question was asked once per respondent or once per
/// respondent×product row.
///
/// Metadata for consumers assembling row-level datasets; the engine treats
/// every dataset row as one record either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionLevel {
    #[default]
    Respondent,
    Row,
}

/// Maps one answer option to the raw column(s) that record it.
///
/// Multi-select and ranking exports commonly spread one logical option over a
/// primary header plus renamed duplicates from merged uploads; all of them
/// count toward the same option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionColumn {
    pub header: String,
    pub option_label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_headers: Vec<String>,
}

impl OptionColumn {
    pub fn new(header: impl Into<String>, option_label: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            option_label: option_label.into(),
            alternate_headers: Vec::new(),
        }
    }

    /// Option declared by label only, for single-select questions whose
    /// options are enumerated rather than discovered (no backing column of
    /// its own).
    pub fn labeled(option_label: impl Into<String>) -> Self {
        Self::new("", option_label)
    }

    pub fn with_alternates(mut self, alternate_headers: Vec<String>) -> Self {
        self.alternate_headers = alternate_headers;
        self
    }
}

/// Which sentiment band a gated follow-up question was asked of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolarity {
    /// Asked of respondents who rated 4-5.
    Positive,
    /// Asked of respondents who rated 1-3.
    Negative,
}

impl GatePolarity {
    /// Reads the label convention used by question inference: a follow-up
    /// question's label carries a `(positive)` or `(negative)` qualifier
    /// (case-insensitive). Returns `None` when the label has neither.
    pub fn from_label_qualifier(label: &str) -> Option<Self> {
        let folded = label.to_lowercase();
        if folded.contains("(positive)") {
            Some(GatePolarity::Positive)
        } else if folded.contains("(negative)") {
            Some(GatePolarity::Negative)
        } else {
            None
        }
    }

    /// Whether a sentiment rating falls inside this polarity's band.
    pub fn admits(self, rating: f64) -> bool {
        match self {
            GatePolarity::Positive => (4.0..=5.0).contains(&rating),
            GatePolarity::Negative => (1.0..=3.0).contains(&rating),
        }
    }
}

/// Marks a question as a gated follow-up: only respondents whose rating in
/// `rating_column` falls in the polarity's band were asked it, so only those
/// rows are eligible for its denominator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentGate {
    pub rating_column: String,
    pub polarity: GatePolarity,
}

impl SentimentGate {
    pub fn new(rating_column: impl Into<String>, polarity: GatePolarity) -> Self {
        Self {
            rating_column: rating_column.into(),
            polarity,
        }
    }
}

/// Metadata for one survey question, produced by the ingestion/inference
/// collaborator and consumed by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDef {
    /// Unique question id within a dataset.
    pub qid: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Scale question rendered as a Likert battery. Presentation metadata;
    /// the math is identical to any scale question.
    #[serde(default)]
    pub is_likert: bool,
    #[serde(default)]
    pub level: QuestionLevel,
    /// For single/scale questions: the raw column holding the chosen option
    /// text (or the rating value).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_source_column: Option<String>,
    /// Per-option column mapping for multi/ranking questions. For
    /// single/scale questions this may enumerate the options up front
    /// (headers unused); when empty, options are discovered from the data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<OptionColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<SentimentGate>,
}

impl QuestionDef {
    fn new(qid: impl Into<String>, label: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            qid: qid.into(),
            label: label.into(),
            kind,
            is_likert: false,
            level: QuestionLevel::default(),
            single_source_column: None,
            columns: Vec::new(),
            gate: None,
        }
    }

    pub fn single(
        qid: impl Into<String>,
        label: impl Into<String>,
        source_column: impl Into<String>,
    ) -> Self {
        let mut q = Self::new(qid, label, QuestionKind::Single);
        q.single_source_column = Some(source_column.into());
        q
    }

    pub fn scale(
        qid: impl Into<String>,
        label: impl Into<String>,
        source_column: impl Into<String>,
    ) -> Self {
        let mut q = Self::new(qid, label, QuestionKind::Scale);
        q.single_source_column = Some(source_column.into());
        q
    }

    pub fn multi(
        qid: impl Into<String>,
        label: impl Into<String>,
        columns: Vec<OptionColumn>,
    ) -> Self {
        let mut q = Self::new(qid, label, QuestionKind::Multi);
        q.columns = columns;
        q
    }

    pub fn ranking(
        qid: impl Into<String>,
        label: impl Into<String>,
        columns: Vec<OptionColumn>,
    ) -> Self {
        let mut q = Self::new(qid, label, QuestionKind::Ranking);
        q.columns = columns;
        q
    }

    pub fn free_text(
        qid: impl Into<String>,
        label: impl Into<String>,
        source_column: impl Into<String>,
    ) -> Self {
        let mut q = Self::new(qid, label, QuestionKind::Text);
        q.single_source_column = Some(source_column.into());
        q
    }

    pub fn with_options(mut self, columns: Vec<OptionColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_gate(mut self, gate: SentimentGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_level(mut self, level: QuestionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn likert(mut self) -> Self {
        self.is_likert = true;
        self
    }

    /// Whether this question's denominator is gated on a sentiment band.
    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }
}
