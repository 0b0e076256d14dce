// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptAnswer, AttemptStatus, ResultStatus, Student},
        exam::Exam,
        question::{Question, QuestionKind, QuestionOption},
        question_group::QuestionGroup,
    },
    store::ExamStore,
};

const EXAM_COLUMNS: &str = "\
    id, name, description, start_date, end_date, duration_minutes, \
    total_marks, passing_percentage, created_at";

const ATTEMPT_COLUMNS: &str = "\
    a.id, a.exam_id, a.user_id, u.name AS student_name, u.email AS student_email, \
    a.started_at, a.submitted_at, a.status, a.answers, a.score, a.total_marks, \
    a.percentage, a.result_status, a.manual_marks, a.modified_by, a.modified_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct mirroring the `questions` table.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    group_id: i64,
    kind: String,
    text: String,
    marks: f64,
    options: Json<Vec<QuestionOption>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<QuestionKind>()
            .map_err(|e| AppError::InternalServerError(format!("question {}: {}", row.id, e)))?;
        Ok(Question {
            id: row.id,
            group_id: row.group_id,
            kind,
            text: row.text,
            marks: row.marks,
            options: row.options.0,
            created_at: row.created_at,
        })
    }
}

/// Helper struct for an attempt joined with its student.
#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    exam_id: i64,
    user_id: i64,
    student_name: String,
    student_email: String,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    status: String,
    answers: Json<Vec<AttemptAnswer>>,
    score: Option<f64>,
    total_marks: Option<f64>,
    percentage: Option<f64>,
    result_status: String,
    manual_marks: Json<BTreeMap<i64, f64>>,
    modified_by: Option<String>,
    modified_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| AppError::InternalServerError(format!("attempt {}: {}", row.id, e));
        let status = row.status.parse::<AttemptStatus>().map_err(corrupt)?;
        let result_status = row.result_status.parse::<ResultStatus>().map_err(corrupt)?;

        Ok(Attempt {
            id: row.id,
            exam_id: row.exam_id,
            student: Student {
                id: row.user_id,
                name: row.student_name,
                email: row.student_email,
            },
            started_at: row.started_at,
            submitted_at: row.submitted_at,
            status,
            answers: row.answers.0,
            score: row.score,
            total_marks: row.total_marks,
            percentage: row.percentage,
            result_status,
            manual_marks: row.manual_marks.0,
            modified_by: row.modified_by,
            modified_at: row.modified_at,
        })
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams ORDER BY start_date DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exams: {:?}", e);
            AppError::from(e)
        })?;

        Ok(exams)
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(exam)
    }

    async fn question_groups(&self, exam_id: i64) -> Result<Vec<QuestionGroup>, AppError> {
        let groups = sqlx::query_as::<_, QuestionGroup>(
            r#"
            SELECT id, exam_id, name, difficulty, position
            FROM question_groups
            WHERE exam_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn questions_in_groups(&self, group_ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, group_id, kind, text, marks, options, created_at
            FROM questions
            WHERE group_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn questions_by_ids(&self, question_ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, group_id, kind, text, marks, options, created_at
            FROM questions
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn attempts_for_exam(
        &self,
        exam_id: i64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<Attempt>, AppError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS}
             FROM exam_attempts a
             JOIN users u ON u.id = a.user_id
             WHERE a.exam_id = $1 AND a.status = ANY($2)
             ORDER BY a.id"
        ))
        .bind(exam_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempts for exam {}: {:?}", exam_id, e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Attempt::try_from).collect()
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS}
             FROM exam_attempts a
             JOIN users u ON u.id = a.user_id
             WHERE a.id = $1"
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Attempt::try_from).transpose()
    }

    async fn save_marked_attempt(&self, attempt: &Attempt) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE exam_attempts SET
                answers = $1,
                score = $2,
                total_marks = $3,
                percentage = $4,
                result_status = $5,
                manual_marks = $6,
                modified_by = $7,
                modified_at = $8
            WHERE id = $9
            "#,
        )
        .bind(Json(&attempt.answers))
        .bind(attempt.score)
        .bind(attempt.total_marks)
        .bind(attempt.percentage)
        .bind(attempt.result_status.as_str())
        .bind(Json(&attempt.manual_marks))
        .bind(&attempt.modified_by)
        .bind(attempt.modified_at)
        .bind(attempt.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save marks for attempt {}: {:?}", attempt.id, e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Attempt not found".to_string()));
        }

        Ok(())
    }
}
