// src/models/question_group.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named bucket of questions used for topic-wise breakdowns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionGroup {
    pub id: i64,
    pub exam_id: i64,
    pub name: String,

    /// Free-form label (e.g., "Easy", "Hard"). Defaults to "Medium".
    pub difficulty: String,

    /// Display order within the exam.
    pub position: i32,
}
