// src/store/mod.rs

//! Persistence seam for exams, questions and attempts.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptStatus},
        exam::Exam,
        question::Question,
        question_group::QuestionGroup,
    },
};

pub use memory::MemoryExamStore;
pub use postgres::PgExamStore;

/// Read access to the exam collections plus the one write the marking flow needs.
///
/// Any backend failure surfaces as `AppError::InternalServerError`.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError>;

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError>;

    /// Groups of one exam, in display order.
    async fn question_groups(&self, exam_id: i64) -> Result<Vec<QuestionGroup>, AppError>;

    /// Questions belonging to any of the given groups, ordered by id.
    async fn questions_in_groups(&self, group_ids: &[i64]) -> Result<Vec<Question>, AppError>;

    /// Questions with the given ids, ordered by id. Unknown ids are skipped.
    async fn questions_by_ids(&self, question_ids: &[i64]) -> Result<Vec<Question>, AppError>;

    /// Attempts of one exam whose status is in `statuses`.
    async fn attempts_for_exam(
        &self,
        exam_id: i64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<Attempt>, AppError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError>;

    /// Persists the outcome of manual marking in a single write.
    /// Returns `NotFound` if the attempt vanished in the meantime.
    async fn save_marked_attempt(&self, attempt: &Attempt) -> Result<(), AppError>;
}

/// Loads the groups and questions of one exam.
pub async fn load_exam_questions(
    store: &dyn ExamStore,
    exam_id: i64,
) -> Result<(Vec<QuestionGroup>, Vec<Question>), AppError> {
    let groups = store.question_groups(exam_id).await?;
    if groups.is_empty() {
        return Ok((groups, Vec::new()));
    }
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let questions = store.questions_in_groups(&group_ids).await?;
    Ok((groups, questions))
}
