// src/handlers/analytics.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    config::Config,
    error::{AppError, parse_id},
    models::{attempt::TERMINAL_STATUSES, exam::ExamHeader},
    services::analytics::{self, ExamAnalytics},
    store::{ExamStore, load_exam_questions},
};

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub exam: ExamHeader,
    #[serde(flatten)]
    pub analytics: ExamAnalytics,
}

/// Computes the full analytics rollup for one exam.
///
/// * Loads the exam (404 if absent), its question groups and questions.
/// * Only submitted or expired attempts are considered.
/// * Nothing is cached: every call recomputes from the store.
pub async fn get_exam_analytics(
    State(store): State<Arc<dyn ExamStore>>,
    State(config): State<Config>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam_id = parse_id(&id, "exam")?;

    let exam = store
        .find_exam(exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let attempts = store.attempts_for_exam(exam_id, &TERMINAL_STATUSES).await?;
    let (groups, questions) = load_exam_questions(store.as_ref(), exam_id).await?;

    tracing::debug!(
        exam_id,
        attempts = attempts.len(),
        groups = groups.len(),
        questions = questions.len(),
        "Aggregating exam analytics"
    );

    let analytics = analytics::aggregate(&exam, &groups, &questions, &attempts, &config.analytics);

    Ok(Json(AnalyticsResponse {
        success: true,
        exam: ExamHeader::new(&exam, questions.len(), Utc::now()),
        analytics,
    }))
}
