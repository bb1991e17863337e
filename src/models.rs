use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InsightError;

/// One student's exam record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub exam_name: String,
    pub exam_date: String,
    /// Index 0 is question 1.
    pub scores: Vec<f64>,
    pub total: f64,
}

impl ScoreRow {
    /// Builds a row; a missing total is derived as the sum of the scores.
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        scores: Vec<f64>,
        total: Option<f64>,
    ) -> Self {
        let total = total.unwrap_or_else(|| scores.iter().sum());
        Self {
            student_id: student_id.into(),
            name: name.into(),
            class_name: String::new(),
            exam_name: String::new(),
            exam_date: String::new(),
            scores,
            total,
        }
    }

    pub fn with_exam(
        mut self,
        class_name: impl Into<String>,
        exam_name: impl Into<String>,
        exam_date: impl Into<String>,
    ) -> Self {
        self.class_name = class_name.into();
        self.exam_name = exam_name.into();
        self.exam_date = exam_date.into();
        self
    }

    /// Score for a 1-based question number, 0 when out of range.
    pub fn score_for(&self, question: u32) -> f64 {
        question
            .checked_sub(1)
            .and_then(|idx| self.scores.get(idx as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

/// A rectangular batch of score rows sharing one question count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreTable {
    question_count: usize,
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn new(question_count: usize, rows: Vec<ScoreRow>) -> Result<Self, InsightError> {
        if let Some(row) = rows.iter().find(|row| row.scores.len() != question_count) {
            return Err(InsightError::RaggedRow {
                student_id: row.student_id.clone(),
                expected: question_count,
                found: row.scores.len(),
            });
        }
        Ok(Self {
            question_count,
            rows,
        })
    }

    /// Infers the question count from the first row.
    pub fn from_rows(rows: Vec<ScoreRow>) -> Result<Self, InsightError> {
        let question_count = rows.first().map(|row| row.scores.len()).unwrap_or(0);
        Self::new(question_count, rows)
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Highest attainable total for one student in this batch.
    pub fn max_total(&self, full_marks_per_question: f64) -> f64 {
        self.question_count as f64 * full_marks_per_question
    }
}

/// A node of the knowledge-point catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Question key (as authored) to raw, untrusted labels.
pub type RawKnowledgeMap = BTreeMap<String, Vec<String>>;

/// Question number to 1–2 canonical knowledge point names.
pub type CleanedKnowledgeMap = BTreeMap<u32, Vec<String>>;

/// Knowledge map as handed over by the extraction step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "questions", rename_all = "snake_case")]
pub enum KnowledgeMapInput {
    /// Extraction has not produced a mapping yet.
    #[default]
    Unresolved,
    Resolved(RawKnowledgeMap),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MasteryTier {
    #[serde(rename = "需关注")]
    NeedsAttention,
    #[serde(rename = "一般")]
    Fair,
    #[serde(rename = "良好")]
    Good,
    #[serde(rename = "优秀")]
    Excellent,
}

impl MasteryTier {
    /// Tier for an average score relative to the per-question full marks.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            MasteryTier::Excellent
        } else if ratio >= 0.8 {
            MasteryTier::Good
        } else if ratio >= 0.6 {
            MasteryTier::Fair
        } else {
            MasteryTier::NeedsAttention
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MasteryTier::NeedsAttention => "需关注",
            MasteryTier::Fair => "一般",
            MasteryTier::Good => "良好",
            MasteryTier::Excellent => "优秀",
        }
    }
}

impl fmt::Display for MasteryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePointStat {
    pub knowledge_point: String,
    pub question_numbers: Vec<u32>,
    pub coverage_percent: u32,
    pub average_score: f64,
    pub mastery_level: MasteryTier,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question: u32,
    pub average: f64,
    pub zero_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub total_students: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStudent {
    pub id: String,
    pub name: String,
    pub total: f64,
    pub weak_questions: Vec<u32>,
    pub reason: String,
    pub advice: String,
    #[serde(default)]
    pub weak_knowledge_points: Vec<String>,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub class_stats: ClassStats,
    pub knowledge_points: Vec<KnowledgePointStat>,
    pub questions: Vec<QuestionStat>,
    pub focus_students: Vec<FocusStudent>,
    /// Raw labels that matched nothing in the catalog.
    pub unknown_labels: Vec<String>,
}
