// src/models/attempt.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest allowed gap between a stored percentage and the one derived
/// from score and total marks.
pub const PERCENTAGE_TOLERANCE: f64 = 0.05;

/// One student's recorded session against one exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub exam_id: i64,
    pub student: Student,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    pub answers: Vec<AttemptAnswer>,

    /// Raw marks obtained.
    pub score: Option<f64>,
    pub total_marks: Option<f64>,

    /// Stored percentage, when the writer recorded one.
    pub percentage: Option<f64>,

    pub result_status: ResultStatus,

    /// Marks entered by staff, keyed by question id.
    pub manual_marks: BTreeMap<i64, f64>,

    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Active,
    Submitted,
    Expired,
    Terminated,
}

/// Statuses that feed analytics.
pub const TERMINAL_STATUSES: [AttemptStatus; 2] = [AttemptStatus::Submitted, AttemptStatus::Expired];

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Submitted => "submitted",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "submitted" => Ok(Self::Submitted),
            "expired" => Ok(Self::Expired),
            "terminated" => Ok(Self::Terminated),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

/// Whether an attempt's score is final or still waiting on manual marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Draft,
    Published,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(format!("unknown result status '{}'", other)),
        }
    }
}

/// A recorded answer to one question.
/// Stored as an element of the `answers` JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: i64,

    /// Seconds spent on the question.
    #[serde(default)]
    pub time_spent_secs: f64,

    pub response: AnswerResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerResponse {
    /// Auto-marked when the attempt was submitted.
    Objective {
        #[serde(default)]
        selected: Vec<String>,
        is_correct: bool,
    },
    /// Marked by staff after submission.
    Subjective {
        #[serde(default)]
        text: String,
        #[serde(default)]
        awarded_marks: Option<f64>,
    },
}

impl AnswerResponse {
    /// Ungraded subjective answers are not correct.
    pub fn is_correct(&self, max_marks: f64) -> bool {
        match self {
            Self::Objective { is_correct, .. } => *is_correct,
            Self::Subjective { awarded_marks, .. } => {
                awarded_marks.is_some_and(|m| m >= max_marks)
            }
        }
    }

    /// Marks this response earns on its own, before any manual override.
    pub fn earned_marks(&self, max_marks: f64) -> f64 {
        match self {
            Self::Objective { is_correct: true, .. } => max_marks,
            Self::Objective { is_correct: false, .. } => 0.0,
            Self::Subjective { awarded_marks, .. } => awarded_marks.unwrap_or(0.0).min(max_marks),
        }
    }
}

impl Attempt {
    /// Stored percentage if present, else derived from score and total marks.
    pub fn resolved_percentage(&self) -> f64 {
        if let Some(p) = self.percentage {
            return p;
        }
        self.derived_percentage().unwrap_or(0.0)
    }

    fn derived_percentage(&self) -> Option<f64> {
        match (self.score, self.total_marks) {
            (Some(score), Some(total)) if total > 0.0 => Some(score / total * 100.0),
            _ => None,
        }
    }

    /// False only when both forms are present and disagree.
    pub fn percentage_consistent(&self) -> bool {
        match (self.percentage, self.derived_percentage()) {
            (Some(stored), Some(derived)) => (stored - derived).abs() <= PERCENTAGE_TOLERANCE,
            _ => true,
        }
    }

    /// Ordering key for "most recent" views.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.submitted_at.unwrap_or(self.started_at)
    }

    /// Whole minutes between start and submission.
    pub fn completion_minutes(&self) -> Option<i64> {
        self.submitted_at
            .map(|submitted| (submitted - self.started_at).num_minutes().max(0))
    }

    pub fn answer_for(&self, question_id: i64) -> Option<&AttemptAnswer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// A recorded manual mark decides correctness (full marks only);
    /// otherwise the response does.
    pub fn answer_is_correct(&self, answer: &AttemptAnswer, max_marks: f64) -> bool {
        match self.manual_marks.get(&answer.question_id) {
            Some(mark) => *mark >= max_marks,
            None => answer.response.is_correct(max_marks),
        }
    }
}

/// DTO for staff entering marks on an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMarksRequest {
    /// Key: question id (as a JSON object key). Value: marks awarded.
    #[validate(length(min = 1, message = "At least one mark must be provided"))]
    pub marks: BTreeMap<i64, f64>,
}

/// Result payload of a marking update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSummary {
    pub score: f64,
    pub passed: bool,
    pub total_marks: f64,
    pub marks_obtained: f64,
}
