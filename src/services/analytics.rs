// src/services/analytics.rs

//! Attempt-to-statistics rollup for a single exam.
//!
//! Everything here is a pure function of the loaded records: no store
//! access, no clock. Callers load the exam, its groups, questions and
//! terminal attempts and pass them in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::AnalyticsSettings,
    models::{
        attempt::{Attempt, AttemptStatus, ResultStatus},
        exam::{Difficulty, Exam},
        question::Question,
        question_group::QuestionGroup,
    },
    services::grading::{Grade, ScoreBucket, is_passing, letter_grade, round_to, score_bucket},
};

/// Characters of question text kept in the per-question table.
const QUESTION_TEXT_PREVIEW: usize = 80;

/// Headline numbers over a set of terminal attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub participants: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub pass_count: usize,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub range: &'static str,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicBreakdown {
    pub topic: String,
    pub questions: usize,
    pub average_score: f64,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
    pub question_id: i64,
    pub question_no: usize,
    pub question_text: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub correct_answers: u32,
    pub total_attempts: u32,
    pub percentage: f64,
    /// Average minutes spent per answer.
    pub avg_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub attempt_id: i64,
    pub student_id: i64,
    pub name: String,
    pub score: f64,
    /// Minutes from start to submission.
    pub completion_time: i64,
    pub submitted_at: DateTime<Utc>,
    pub grade: Grade,
}

/// The derived aggregate. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnalytics {
    pub summary: ScoreSummary,
    pub score_distribution: Vec<BucketCount>,
    pub topic_breakdown: Vec<TopicBreakdown>,
    pub question_analysis: Vec<QuestionAnalysis>,
    pub recent_submissions: Vec<RecentSubmission>,
}

/// One row of the per-exam student results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub attempt_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub percentage: f64,
    pub correct_answers: usize,
    pub wrong_answers: usize,
    pub time_spent: i64,
    pub submitted_at: DateTime<Utc>,
    pub status: AttemptStatus,
    pub result_status: ResultStatus,
    pub is_passed: bool,
    pub grade: Grade,
}

/// All terminal attempts of one student, with the best one picked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: i64,
    pub name: String,
    pub email: String,
    pub total_attempts: usize,
    pub best_attempt: StudentResult,
    pub attempts: Vec<StudentResult>,
}

#[derive(Default)]
struct TopicTally {
    correct: u32,
    answered: u32,
}

#[derive(Default)]
struct QuestionTally {
    correct: u32,
    attempts: u32,
    time_secs: f64,
}

fn terminal(attempts: &[Attempt]) -> impl Iterator<Item = &Attempt> {
    attempts.iter().filter(|a| a.status.is_terminal())
}

fn ratio_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Runs the full rollup for one exam.
pub fn aggregate(
    exam: &Exam,
    groups: &[QuestionGroup],
    questions: &[Question],
    attempts: &[Attempt],
    settings: &AnalyticsSettings,
) -> ExamAnalytics {
    let mut groups: Vec<&QuestionGroup> = groups.iter().collect();
    groups.sort_by_key(|g| (g.position, g.id));

    let mut questions: Vec<&Question> = questions
        .iter()
        .filter(|q| groups.iter().any(|g| g.id == q.group_id))
        .collect();
    questions.sort_by_key(|q| q.id);

    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, *q)).collect();

    let mut topic_totals: HashMap<i64, TopicTally> = HashMap::new();
    let mut question_totals: HashMap<i64, QuestionTally> = HashMap::new();

    for attempt in terminal(attempts) {
        for answer in &attempt.answers {
            let Some(question) = by_id.get(&answer.question_id) else {
                continue;
            };
            let correct = attempt.answer_is_correct(answer, question.marks);

            let topic = topic_totals.entry(question.group_id).or_default();
            topic.answered += 1;
            if correct {
                topic.correct += 1;
            }

            let tally = question_totals.entry(question.id).or_default();
            tally.attempts += 1;
            if correct {
                tally.correct += 1;
            }
            if answer.time_spent_secs.is_finite() && answer.time_spent_secs > 0.0 {
                tally.time_secs += answer.time_spent_secs;
            }
        }
    }

    let topic_breakdown = groups
        .iter()
        .map(|group| {
            let tally = topic_totals.remove(&group.id).unwrap_or_default();
            TopicBreakdown {
                topic: topic_name(group),
                questions: questions.iter().filter(|q| q.group_id == group.id).count(),
                average_score: ratio_percent(f64::from(tally.correct), f64::from(tally.answered)).round(),
                difficulty: if group.difficulty.is_empty() {
                    "Medium".to_string()
                } else {
                    group.difficulty.clone()
                },
            }
        })
        .collect();

    let group_names: HashMap<i64, String> = groups.iter().map(|g| (g.id, topic_name(g))).collect();

    let question_analysis = questions
        .iter()
        .take(settings.question_analysis_limit)
        .enumerate()
        .map(|(index, question)| {
            let tally = question_totals.remove(&question.id).unwrap_or_default();
            let attempts = f64::from(tally.attempts);
            let avg_minutes = if tally.attempts > 0 { tally.time_secs / attempts / 60.0 } else { 0.0 };
            QuestionAnalysis {
                question_id: question.id,
                question_no: index + 1,
                question_text: preview(&question.text),
                topic: group_names.get(&question.group_id).cloned().unwrap_or_default(),
                difficulty: question.text_difficulty(),
                correct_answers: tally.correct,
                total_attempts: tally.attempts,
                percentage: round_to(ratio_percent(f64::from(tally.correct), attempts), 1),
                avg_time: round_to(avg_minutes, 1),
            }
        })
        .collect();

    ExamAnalytics {
        summary: summarize(exam, attempts),
        score_distribution: score_distribution(attempts),
        topic_breakdown,
        question_analysis,
        recent_submissions: recent_submissions(attempts, settings.recent_submissions_limit),
    }
}

fn topic_name(group: &QuestionGroup) -> String {
    if group.name.trim().is_empty() {
        "General".to_string()
    } else {
        group.name.clone()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(QUESTION_TEXT_PREVIEW).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Terminal attempts whose stored percentage disagrees with score/total marks.
/// The stored value still wins; these are only reported.
pub fn inconsistent_percentages(attempts: &[Attempt]) -> Vec<i64> {
    terminal(attempts)
        .filter(|a| !a.percentage_consistent())
        .map(|a| a.id)
        .collect()
}

/// Average, extremes and pass rate over the terminal attempts.
pub fn summarize(exam: &Exam, attempts: &[Attempt]) -> ScoreSummary {
    for attempt_id in inconsistent_percentages(attempts) {
        tracing::warn!(
            exam_id = exam.id,
            attempt_id,
            "Stored percentage disagrees with score/total marks"
        );
    }

    let scores: Vec<f64> = terminal(attempts).map(Attempt::resolved_percentage).collect();
    if scores.is_empty() {
        return ScoreSummary {
            participants: 0,
            average_score: 0.0,
            highest_score: 0.0,
            lowest_score: 0.0,
            pass_count: 0,
            pass_rate: 0.0,
        };
    }

    let total: f64 = scores.iter().sum();
    let highest = scores.iter().copied().fold(f64::MIN, f64::max);
    let lowest = scores.iter().copied().fold(f64::MAX, f64::min);
    let pass_count = scores
        .iter()
        .filter(|&&p| is_passing(p, exam.passing_percentage))
        .count();
    let n = scores.len() as f64;

    ScoreSummary {
        participants: scores.len(),
        average_score: round_to(total / n, 2),
        highest_score: round_to(highest, 1),
        lowest_score: round_to(lowest, 1),
        pass_count,
        pass_rate: round_to(ratio_percent(pass_count as f64, n), 1),
    }
}

/// Six fixed buckets, lowest first. Counts always sum to the number of terminal attempts.
pub fn score_distribution(attempts: &[Attempt]) -> Vec<BucketCount> {
    let mut counts = [0usize; ScoreBucket::ALL.len()];
    let mut total = 0usize;
    for attempt in terminal(attempts) {
        counts[score_bucket(attempt.resolved_percentage()).index()] += 1;
        total += 1;
    }

    ScoreBucket::ALL
        .iter()
        .map(|bucket| {
            let count = counts[bucket.index()];
            BucketCount {
                range: bucket.label(),
                count,
                percentage: round_to(ratio_percent(count as f64, total as f64), 1),
            }
        })
        .collect()
}

/// The `limit` most recent terminal attempts, newest first.
pub fn recent_submissions(attempts: &[Attempt], limit: usize) -> Vec<RecentSubmission> {
    let mut recent: Vec<&Attempt> = terminal(attempts).collect();
    recent.sort_by(|a, b| {
        b.last_activity()
            .cmp(&a.last_activity())
            .then_with(|| b.id.cmp(&a.id))
    });

    recent
        .into_iter()
        .take(limit)
        .map(|attempt| {
            let score = attempt.resolved_percentage();
            RecentSubmission {
                attempt_id: attempt.id,
                student_id: attempt.student.id,
                name: display_name(&attempt.student.name),
                score: round_to(score, 1),
                completion_time: attempt.completion_minutes().unwrap_or(0),
                submitted_at: attempt.last_activity(),
                grade: letter_grade(score),
            }
        })
        .collect()
}

fn display_name(name: &str) -> String {
    if name.trim().is_empty() {
        "Student".to_string()
    } else {
        name.to_string()
    }
}

/// Per-student rows for the exam results table, newest first.
pub fn student_results(exam: &Exam, questions: &[Question], attempts: &[Attempt]) -> Vec<StudentResult> {
    let marks: HashMap<i64, f64> = questions.iter().map(|q| (q.id, q.marks)).collect();
    // Used when the submission time was never recorded.
    let fallback_minutes = (f64::from(exam.duration_minutes) * 0.8).floor() as i64;

    let mut rows: Vec<&Attempt> = terminal(attempts).collect();
    rows.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()).then_with(|| b.id.cmp(&a.id)));

    rows.into_iter()
        .map(|attempt| {
            let percentage = attempt.resolved_percentage();
            let correct = attempt
                .answers
                .iter()
                .filter(|a| {
                    let max = marks.get(&a.question_id).copied().unwrap_or(1.0);
                    attempt.answer_is_correct(a, max)
                })
                .count();

            StudentResult {
                attempt_id: attempt.id,
                student_id: attempt.student.id,
                student_name: display_name(&attempt.student.name),
                student_email: attempt.student.email.clone(),
                percentage: round_to(percentage, 1),
                correct_answers: correct,
                wrong_answers: attempt.answers.len() - correct,
                time_spent: attempt.completion_minutes().unwrap_or(fallback_minutes),
                submitted_at: attempt.last_activity(),
                status: attempt.status,
                result_status: attempt.result_status,
                is_passed: is_passing(percentage, exam.passing_percentage),
                grade: letter_grade(percentage),
            }
        })
        .collect()
}

/// Groups result rows by student, ordered by name.
///
/// The best attempt is the highest percentage; on a tie the row seen first
/// (the more recent one, given `student_results` ordering) is kept.
pub fn student_summaries(rows: &[StudentResult]) -> Vec<StudentSummary> {
    let mut by_student: HashMap<i64, StudentSummary> = HashMap::new();

    for row in rows {
        match by_student.get_mut(&row.student_id) {
            Some(summary) => {
                summary.total_attempts += 1;
                if row.percentage > summary.best_attempt.percentage {
                    summary.best_attempt = row.clone();
                }
                summary.attempts.push(row.clone());
            }
            None => {
                by_student.insert(
                    row.student_id,
                    StudentSummary {
                        student_id: row.student_id,
                        name: row.student_name.clone(),
                        email: row.student_email.clone(),
                        total_attempts: 1,
                        best_attempt: row.clone(),
                        attempts: vec![row.clone()],
                    },
                );
            }
        }
    }

    let mut students: Vec<StudentSummary> = by_student.into_values().collect();
    students.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    students
}
