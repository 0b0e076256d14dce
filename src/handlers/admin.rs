// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, parse_id},
    models::attempt::UpdateMarksRequest,
    services::marking::apply_manual_marks,
    store::{ExamStore, load_exam_questions},
    utils::jwt::Claims,
};

/// Enters manual marks on a submitted attempt and publishes its result.
/// Staff only.
///
/// * Re-scores every exam question (manual mark, else auto-marked result).
///   An exam with no groups falls back to the questions the attempt answered.
/// * Writes the re-scored attempt back in one update.
pub async fn update_marks(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMarksRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let attempt_id = parse_id(&id, "attempt")?;
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    payload.validate()?;

    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let exam = store
        .find_exam(attempt.exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let (_, mut questions) = load_exam_questions(store.as_ref(), exam.id).await?;
    if questions.is_empty() {
        // Exams without groups: score the questions the attempt answered.
        let answered: Vec<i64> = attempt.answers.iter().map(|a| a.question_id).collect();
        questions = store.questions_by_ids(&answered).await?;
    }

    let (marked, summary) = apply_manual_marks(
        &attempt,
        &exam,
        &questions,
        &payload.marks,
        &claims.sub,
        Utc::now(),
    )?;

    store.save_marked_attempt(&marked).await?;

    tracing::info!(
        attempt_id,
        exam_id = exam.id,
        modified_by = %claims.sub,
        percentage = summary.score,
        "Marks updated and result published"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Marks updated and result published successfully",
        "data": summary,
    })))
}
