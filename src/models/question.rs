// src/models/question.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::exam::Difficulty;

/// A single assessable item belonging to a question group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Owning question group (topic).
    pub group_id: i64,

    pub kind: QuestionKind,

    pub text: String,

    /// Maximum marks awarded for this question.
    pub marks: f64,

    /// Answer options. Empty for subjective kinds.
    pub options: Vec<QuestionOption>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    pub is_correct: bool,
}

/// Question type as stored in the `questions.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    LongAnswer,
}

impl QuestionKind {
    /// Objective kinds are auto-marked from their options.
    pub fn is_objective(self) -> bool {
        matches!(self, Self::Mcq | Self::MultipleChoice | Self::TrueFalse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::ShortAnswer => "short_answer",
            Self::LongAnswer => "long_answer",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(Self::Mcq),
            "multiple_choice" => Ok(Self::MultipleChoice),
            "true_false" => Ok(Self::TrueFalse),
            "short_answer" => Ok(Self::ShortAnswer),
            "long_answer" => Ok(Self::LongAnswer),
            other => Err(format!("unknown question kind '{}'", other)),
        }
    }
}

impl Question {
    /// Checks the option invariant for the question's kind.
    ///
    /// Objective questions need at least one option flagged correct;
    /// subjective questions must not carry options at all.
    pub fn validate_options(&self) -> Result<(), validator::ValidationError> {
        if self.kind.is_objective() {
            if self.options.is_empty() {
                return Err(validator::ValidationError::new("options_cannot_be_empty"));
            }
            if !self.options.iter().any(|o| o.is_correct) {
                return Err(validator::ValidationError::new("no_correct_option"));
            }
        } else if !self.options.is_empty() {
            return Err(validator::ValidationError::new("subjective_has_options"));
        }
        if !self.marks.is_finite() || self.marks < 0.0 {
            return Err(validator::ValidationError::new("invalid_marks"));
        }
        Ok(())
    }

    /// Rough difficulty guess from how long the question text is.
    pub fn text_difficulty(&self) -> Difficulty {
        let len = self.text.chars().count();
        if len < 100 {
            Difficulty::Easy
        } else if len > 200 {
            Difficulty::Hard
        } else {
            Difficulty::Medium
        }
    }
}
