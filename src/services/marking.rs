// src/services/marking.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerResponse, Attempt, MarksSummary, ResultStatus},
        exam::Exam,
        question::Question,
    },
    services::grading::{is_passing, round_to},
};

/// Re-scores a terminal attempt with staff-entered marks.
///
/// Returns a new attempt value (the input is left untouched) with subjective
/// answers carrying their awarded marks, score and percentage recomputed and
/// the result published. Persisting it is the caller's single write.
pub fn apply_manual_marks(
    attempt: &Attempt,
    exam: &Exam,
    questions: &[Question],
    marks: &BTreeMap<i64, f64>,
    modified_by: &str,
    now: DateTime<Utc>,
) -> Result<(Attempt, MarksSummary), AppError> {
    if !attempt.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Attempt {} is {} and cannot be marked yet",
            attempt.id, attempt.status
        )));
    }
    if questions.is_empty() {
        return Err(AppError::NotFound("No questions found for this exam".to_string()));
    }
    if marks.is_empty() {
        return Err(AppError::BadRequest("Invalid marks data".to_string()));
    }

    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    for (question_id, value) in marks {
        let question = by_id.get(question_id).ok_or_else(|| {
            AppError::BadRequest(format!("Question {} is not part of this exam", question_id))
        })?;
        if !value.is_finite() || *value < 0.0 {
            return Err(AppError::BadRequest(format!(
                "Marks for question {} must be a non-negative number",
                question_id
            )));
        }
        if *value > question.marks {
            return Err(AppError::BadRequest(format!(
                "Marks for question {} exceed the maximum of {}",
                question_id, question.marks
            )));
        }
    }

    let answers = attempt
        .answers
        .iter()
        .map(|answer| {
            let mut answer = answer.clone();
            if let (AnswerResponse::Subjective { awarded_marks, .. }, Some(value)) =
                (&mut answer.response, marks.get(&answer.question_id))
            {
                *awarded_marks = Some(*value);
            }
            answer
        })
        .collect();

    // Earlier overrides stay in force unless this request replaces them.
    let mut manual_marks = attempt.manual_marks.clone();
    manual_marks.extend(marks.iter().map(|(k, v)| (*k, *v)));

    let mut updated = Attempt {
        answers,
        ..attempt.clone()
    };

    let mut total_marks = 0.0;
    let mut obtained = 0.0;
    for question in questions {
        total_marks += question.marks;
        obtained += match manual_marks.get(&question.id) {
            Some(value) => value.min(question.marks),
            None => updated
                .answer_for(question.id)
                .map(|a| a.response.earned_marks(question.marks))
                .unwrap_or(0.0),
        };
    }

    let percentage = if total_marks > 0.0 { obtained / total_marks * 100.0 } else { 0.0 };
    let passed = is_passing(percentage, exam.passing_percentage);

    updated.score = Some(obtained);
    updated.total_marks = Some(total_marks);
    updated.percentage = Some(percentage);
    updated.manual_marks = manual_marks;
    updated.result_status = ResultStatus::Published;
    updated.modified_by = Some(modified_by.to_string());
    updated.modified_at = Some(now);

    let summary = MarksSummary {
        score: round_to(percentage, 2),
        passed,
        total_marks,
        marks_obtained: obtained,
    };

    Ok((updated, summary))
}
