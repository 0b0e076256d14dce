// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptStatus},
        exam::Exam,
        question::Question,
        question_group::QuestionGroup,
    },
    store::ExamStore,
};

#[derive(Default)]
struct Collections {
    exams: BTreeMap<i64, Exam>,
    groups: BTreeMap<i64, QuestionGroup>,
    questions: BTreeMap<i64, Question>,
    attempts: BTreeMap<i64, Attempt>,
}

/// In-process store for tests and local demos.
/// Reads see a consistent snapshot under the lock.
#[derive(Default)]
pub struct MemoryExamStore {
    data: RwLock<Collections>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_exam(&self, exam: Exam) {
        self.data.write().await.exams.insert(exam.id, exam);
    }

    pub async fn insert_group(&self, group: QuestionGroup) {
        self.data.write().await.groups.insert(group.id, group);
    }

    /// Rejects questions whose options break the kind's invariant.
    pub async fn insert_question(&self, question: Question) -> Result<(), AppError> {
        question
            .validate_options()
            .map_err(|e| AppError::BadRequest(format!("question {}: {}", question.id, e)))?;
        self.data.write().await.questions.insert(question.id, question);
        Ok(())
    }

    pub async fn insert_attempt(&self, attempt: Attempt) {
        self.data.write().await.attempts.insert(attempt.id, attempt);
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let data = self.data.read().await;
        let mut exams: Vec<Exam> = data.exams.values().cloned().collect();
        exams.sort_by(|a, b| b.start_date.cmp(&a.start_date).then_with(|| b.id.cmp(&a.id)));
        Ok(exams)
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.data.read().await.exams.get(&exam_id).cloned())
    }

    async fn question_groups(&self, exam_id: i64) -> Result<Vec<QuestionGroup>, AppError> {
        let data = self.data.read().await;
        let mut groups: Vec<QuestionGroup> = data
            .groups
            .values()
            .filter(|g| g.exam_id == exam_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| (g.position, g.id));
        Ok(groups)
    }

    async fn questions_in_groups(&self, group_ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .questions
            .values()
            .filter(|q| group_ids.contains(&q.group_id))
            .cloned()
            .collect())
    }

    async fn questions_by_ids(&self, question_ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .questions
            .values()
            .filter(|q| question_ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn attempts_for_exam(
        &self,
        exam_id: i64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<Attempt>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id && statuses.contains(&a.status))
            .cloned()
            .collect())
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.data.read().await.attempts.get(&attempt_id).cloned())
    }

    async fn save_marked_attempt(&self, attempt: &Attempt) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        let slot = data
            .attempts
            .get_mut(&attempt.id)
            .ok_or(AppError::NotFound("Attempt not found".to_string()))?;
        *slot = attempt.clone();
        Ok(())
    }
}
