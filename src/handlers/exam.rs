// src/handlers/exam.rs

use std::{collections::HashSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::{AppError, parse_id},
    models::{
        attempt::TERMINAL_STATUSES,
        exam::{ExamHeader, ExamListItem, ExamStatus},
    },
    services::analytics::{self, ScoreSummary, StudentResult, StudentSummary},
    store::{ExamStore, load_exam_questions},
};

#[derive(Debug, Serialize)]
pub struct ExamListResponse {
    pub success: bool,
    pub exams: Vec<ExamListItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultsResponse {
    pub success: bool,
    pub exam: ExamHeader,
    pub summary: ScoreSummary,
    pub student_results: Vec<StudentResult>,
    pub students: Vec<StudentSummary>,
}

/// Lists every exam with its clock-derived status and real score statistics.
pub async fn list_exams(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let exams = store.list_exams().await?;

    let mut items = Vec::with_capacity(exams.len());
    for exam in exams {
        let (_, questions) = load_exam_questions(store.as_ref(), exam.id).await?;
        let attempts = store.attempts_for_exam(exam.id, &TERMINAL_STATUSES).await?;

        let summary = analytics::summarize(&exam, &attempts);
        let students: HashSet<i64> = attempts.iter().map(|a| a.student.id).collect();
        let status = exam.status_at(now);

        items.push(ExamListItem {
            id: exam.id,
            name: exam.name.clone(),
            description: exam.description.clone(),
            status,
            difficulty: exam.difficulty(),
            duration: exam.duration_minutes,
            total_questions: questions.len(),
            total_students: students.len(),
            average_score: summary.average_score,
            highest_score: summary.highest_score,
            lowest_score: summary.lowest_score,
            pass_rate: summary.pass_rate,
            start_date: exam.start_date,
            end_date: exam.end_date,
            completed_at: (status == ExamStatus::Completed).then_some(exam.end_date),
        });
    }

    Ok(Json(ExamListResponse {
        success: true,
        exams: items,
    }))
}

/// Results for one exam: one row per attempt (newest first) and the same
/// rows grouped per student with their best attempt.
pub async fn get_exam_results(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam_id = parse_id(&id, "exam")?;

    let exam = store
        .find_exam(exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let (_, questions) = load_exam_questions(store.as_ref(), exam_id).await?;
    let attempts = store.attempts_for_exam(exam_id, &TERMINAL_STATUSES).await?;

    let student_results = analytics::student_results(&exam, &questions, &attempts);
    let students = analytics::student_summaries(&student_results);

    Ok(Json(ExamResultsResponse {
        success: true,
        exam: ExamHeader::new(&exam, questions.len(), Utc::now()),
        summary: analytics::summarize(&exam, &attempts),
        student_results,
        students,
    }))
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}
