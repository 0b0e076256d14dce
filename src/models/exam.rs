// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// Opening of the exam window.
    pub start_date: DateTime<Utc>,

    /// Close of the exam window (inclusive).
    pub end_date: DateTime<Utc>,

    /// Time allowed per attempt, in minutes.
    pub duration_minutes: i32,

    pub total_marks: f64,

    /// Minimum percentage (0-100) an attempt needs to pass.
    pub passing_percentage: f64,

    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an exam relative to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Draft,
    Active,
    Completed,
}

/// Coarse difficulty label shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Exam {
    /// Status is never stored; it is recomputed from the window on every call.
    pub fn status_at(&self, now: DateTime<Utc>) -> ExamStatus {
        if now < self.start_date {
            ExamStatus::Draft
        } else if now <= self.end_date {
            ExamStatus::Active
        } else {
            ExamStatus::Completed
        }
    }

    /// Listing difficulty, derived from how long the exam runs.
    pub fn difficulty(&self) -> Difficulty {
        if self.duration_minutes > 120 {
            Difficulty::Hard
        } else if self.duration_minutes > 60 {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }
}

/// Exam header embedded in analytics and results responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamHeader {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration: i32,
    pub passing_percentage: f64,
    pub status: ExamStatus,
    pub total_questions: usize,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ExamHeader {
    pub fn new(exam: &Exam, total_questions: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: exam.id,
            name: exam.name.clone(),
            description: exam.description.clone(),
            duration: exam.duration_minutes,
            passing_percentage: exam.passing_percentage,
            status: exam.status_at(now),
            total_questions,
            start_date: exam.start_date,
            end_date: exam.end_date,
        }
    }
}

/// One row of the exam listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamListItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: ExamStatus,
    pub difficulty: Difficulty,
    pub duration: i32,
    pub total_questions: usize,
    pub total_students: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub pass_rate: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Set once the window has closed.
    pub completed_at: Option<DateTime<Utc>>,
}
