//! Core domain types for Mriynyk requests and learning artifacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MriynykError;

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

/// School grade covered by the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grade {
    Eighth,
    Ninth,
}

impl Grade {
    /// Numeric value as stored in the corpus `grade` column.
    pub fn value(self) -> u8 {
        match self {
            Self::Eighth => 8,
            Self::Ninth => 9,
        }
    }
}

impl TryFrom<u8> for Grade {
    type Error = MriynykError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Eighth),
            9 => Ok(Self::Ninth),
            other => Err(MriynykError::validation(format!(
                "unsupported grade {other}: expected 8 or 9"
            ))),
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.value()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Grade {
    type Err = MriynykError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| MriynykError::validation(format!("invalid grade '{s}'")))?;
        Self::try_from(value)
    }
}

// ---------------------------------------------------------------------------
// Discipline
// ---------------------------------------------------------------------------

/// School subject. The label is the exact value of the corpus
/// `discipline` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discipline {
    #[serde(rename = "Українська мова", alias = "ukrainian_language")]
    UkrainianLanguage,
    #[serde(rename = "Історія України", alias = "ukrainian_history")]
    UkrainianHistory,
    #[serde(rename = "Алгебра", alias = "algebra")]
    Algebra,
}

impl Discipline {
    pub const ALL: [Discipline; 3] = [
        Self::UkrainianLanguage,
        Self::UkrainianHistory,
        Self::Algebra,
    ];

    /// Corpus label for this discipline.
    pub fn label(self) -> &'static str {
        match self {
            Self::UkrainianLanguage => "Українська мова",
            Self::UkrainianHistory => "Історія України",
            Self::Algebra => "Алгебра",
        }
    }

    /// ASCII identifier used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            Self::UkrainianLanguage => "ukrainian-language",
            Self::UkrainianHistory => "ukrainian-history",
            Self::Algebra => "algebra",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Discipline {
    type Err = MriynykError;

    /// Accepts either the slug (`algebra`, `ukrainian_history`) or the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        let normalized = needle.to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|d| d.slug() == normalized || d.label() == needle)
            .ok_or_else(|| MriynykError::validation(format!("unknown discipline '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A curriculum topic label, scoped to a (grade, discipline) pair.
///
/// Label equality is the join key; there is no other identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(pub String);

impl Topic {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Embedding vector as returned by the embedding provider.
pub type EmbeddingVector = Vec<f32>;

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One assembled corpus page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Passage body.
    pub text: String,
    /// Exercise texts in the order they appear in the metadata.
    pub exercises: Vec<String>,
    /// Book page number recovered from the row metadata, if any.
    pub page_number: Option<u32>,
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// A single generated quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option_index: u32,
}

/// Generated learning artifact: explanation plus quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub markdown_text: String,
    pub quiz_questions: Vec<QuizQuestion>,
}

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// Inbound topic request as received from the request boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRequest {
    #[serde(alias = "year")]
    pub grade: Grade,
    #[serde(alias = "subject")]
    pub discipline: Discipline,
    #[serde(alias = "question", alias = "topic")]
    pub query: String,
    #[serde(default)]
    pub student_info: String,
}

/// Outbound response for a topic request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResponse {
    pub result: String,
    pub quiz_questions: Vec<QuizQuestion>,
}

impl From<Workbook> for TopicResponse {
    fn from(workbook: Workbook) -> Self {
        Self {
            result: workbook.markdown_text,
            quiz_questions: workbook.quiz_questions,
        }
    }
}
