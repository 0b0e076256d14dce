// tests/api_tests.rs

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use exam_portal_backend::{
    config::{AnalyticsSettings, Config},
    models::{
        attempt::{AnswerResponse, Attempt, AttemptAnswer, AttemptStatus, ResultStatus, Student},
        exam::Exam,
        question::{Question, QuestionKind, QuestionOption},
        question_group::QuestionGroup,
    },
    routes,
    state::AppState,
    store::MemoryExamStore,
    utils::jwt::sign_jwt,
};

const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port, backed by the in-memory store.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app(store: Arc<MemoryExamStore>) -> String {
    let config = Config {
        database_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        analytics: AnalyticsSettings::default(),
    };

    let state = AppState { store, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn exam_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    (now - Duration::days(2), now - Duration::days(1))
}

fn objective_answer(question_id: i64, correct: bool, secs: f64) -> AttemptAnswer {
    AttemptAnswer {
        question_id,
        time_spent_secs: secs,
        response: AnswerResponse::Objective {
            selected: vec![if correct { "4" } else { "5" }.to_string()],
            is_correct: correct,
        },
    }
}

fn attempt(id: i64, status: AttemptStatus, percentage: f64, answers: Vec<AttemptAnswer>) -> Attempt {
    let (start, _) = exam_window();
    Attempt {
        id,
        exam_id: 1,
        student: Student {
            id: 100 + id,
            name: format!("Student {}", id),
            email: format!("s{}@example.com", id),
        },
        started_at: start + Duration::minutes(id),
        submitted_at: Some(start + Duration::minutes(id + 25)),
        status,
        answers,
        score: None,
        total_marks: None,
        percentage: Some(percentage),
        result_status: ResultStatus::Published,
        manual_marks: BTreeMap::new(),
        modified_by: None,
        modified_at: None,
    }
}

/// One completed exam with two topics:
/// * Arithmetic: question 10 (mcq, 1 mark), answered by six attempts, four correctly.
/// * Essays: question 20 (long answer, 4 marks), ungraded in attempt 6.
async fn seeded_store() -> Arc<MemoryExamStore> {
    let store = Arc::new(MemoryExamStore::new());
    let (start, end) = exam_window();

    store
        .insert_exam(Exam {
            id: 1,
            name: "Maths final".to_string(),
            description: "End of term".to_string(),
            start_date: start,
            end_date: end,
            duration_minutes: 90,
            total_marks: 5.0,
            passing_percentage: 50.0,
            created_at: start - Duration::days(10),
        })
        .await;

    store
        .insert_group(QuestionGroup { id: 1, exam_id: 1, name: "Arithmetic".to_string(), difficulty: "Easy".to_string(), position: 0 })
        .await;
    store
        .insert_group(QuestionGroup { id: 2, exam_id: 1, name: "Essays".to_string(), difficulty: String::new(), position: 1 })
        .await;

    store
        .insert_question(Question {
            id: 10,
            group_id: 1,
            kind: QuestionKind::Mcq,
            text: "What is 2 + 2?".to_string(),
            marks: 1.0,
            options: vec![
                QuestionOption { text: "4".to_string(), is_correct: true },
                QuestionOption { text: "5".to_string(), is_correct: false },
            ],
            created_at: start,
        })
        .await
        .unwrap();
    store
        .insert_question(Question {
            id: 20,
            group_id: 2,
            kind: QuestionKind::LongAnswer,
            text: "Explain why division by zero is undefined.".to_string(),
            marks: 4.0,
            options: Vec::new(),
            created_at: start,
        })
        .await
        .unwrap();

    let scores = [95.0, 85.0, 72.0, 64.0, 30.0];
    for (i, score) in scores.iter().enumerate() {
        let id = i as i64 + 1;
        let answers = vec![objective_answer(10, id <= 4, 60.0)];
        store.insert_attempt(attempt(id, AttemptStatus::Submitted, *score, answers)).await;
    }

    let mut draft = attempt(
        6,
        AttemptStatus::Expired,
        0.0,
        vec![
            objective_answer(10, false, 120.0),
            AttemptAnswer {
                question_id: 20,
                time_spent_secs: 300.0,
                response: AnswerResponse::Subjective {
                    text: "Because no number times zero gives a non-zero result.".to_string(),
                    awarded_marks: None,
                },
            },
        ],
    );
    draft.score = Some(0.0);
    draft.total_marks = Some(5.0);
    draft.result_status = ResultStatus::Draft;
    store.insert_attempt(draft).await;

    // Still in progress: never counted.
    store.insert_attempt(attempt(7, AttemptStatus::Active, 100.0, vec![objective_answer(10, true, 5.0)])).await;

    store
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;

    let body: serde_json::Value = reqwest::get(&format!("{}/api/health", address))
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn analytics_for_missing_exam_is_404() {
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;

    let response = reqwest::get(&format!("{}/api/exams/999/analytics", address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Exam not found");
}

#[tokio::test]
async fn analytics_rejects_malformed_id() {
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;

    let response = reqwest::get(&format!("{}/api/exams/not-an-id/analytics", address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn analytics_rolls_up_terminal_attempts() {
    let address = spawn_app(seeded_store().await).await;

    let response = reqwest::get(&format!("{}/api/exams/1/analytics", address))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["exam"]["status"], "completed");
    assert_eq!(body["exam"]["totalQuestions"], 2);

    let summary = &body["summary"];
    assert_eq!(summary["participants"], 6);
    assert_eq!(summary["passCount"], 4);
    assert_eq!(summary["passRate"], 66.7);
    assert_eq!(summary["highestScore"], 95.0);
    assert_eq!(summary["lowestScore"], 0.0);

    let distribution = body["scoreDistribution"].as_array().unwrap();
    assert_eq!(distribution.len(), 6);
    let counts: Vec<u64> = distribution.iter().map(|b| b["count"].as_u64().unwrap()).collect();
    assert_eq!(counts, [2, 0, 1, 1, 1, 1]);
    assert_eq!(distribution[0]["range"], "0-49");
    assert_eq!(distribution[0]["percentage"], 33.3);

    let topics = body["topicBreakdown"].as_array().unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0]["topic"], "Arithmetic");
    assert_eq!(topics[0]["averageScore"], 67.0);
    assert_eq!(topics[0]["difficulty"], "Easy");
    assert_eq!(topics[1]["topic"], "Essays");
    assert_eq!(topics[1]["averageScore"], 0.0);
    assert_eq!(topics[1]["difficulty"], "Medium");

    let questions = body["questionAnalysis"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["questionNo"], 1);
    assert_eq!(questions[0]["correctAnswers"], 4);
    assert_eq!(questions[0]["totalAttempts"], 6);
    assert_eq!(questions[0]["percentage"], 66.7);
    assert_eq!(questions[0]["avgTime"], 1.2);
    assert_eq!(questions[0]["difficulty"], "Easy");
    assert_eq!(questions[1]["avgTime"], 5.0);

    let recent = body["recentSubmissions"].as_array().unwrap();
    let ids: Vec<i64> = recent.iter().map(|r| r["attemptId"].as_i64().unwrap()).collect();
    assert_eq!(ids, [6, 5, 4, 3, 2]);
    assert_eq!(recent[0]["grade"], "F");
    assert_eq!(recent[4]["grade"], "B+");
    assert_eq!(recent[4]["completionTime"], 25);
}

#[tokio::test]
async fn analytics_is_idempotent() {
    let address = spawn_app(seeded_store().await).await;
    let url = format!("{}/api/exams/1/analytics", address);

    let first: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    let second: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn exam_without_groups_has_empty_breakdowns() {
    let store = Arc::new(MemoryExamStore::new());
    let (start, end) = exam_window();
    store
        .insert_exam(Exam {
            id: 5,
            name: "Empty".to_string(),
            description: String::new(),
            start_date: start,
            end_date: end,
            duration_minutes: 30,
            total_marks: 0.0,
            passing_percentage: 40.0,
            created_at: start,
        })
        .await;
    let address = spawn_app(store).await;

    let body: serde_json::Value = reqwest::get(&format!("{}/api/exams/5/analytics", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["topicBreakdown"], serde_json::json!([]));
    assert_eq!(body["questionAnalysis"], serde_json::json!([]));
    assert_eq!(body["summary"]["participants"], 0);
    for bucket in body["scoreDistribution"].as_array().unwrap() {
        assert_eq!(bucket["count"], 0);
        assert_eq!(bucket["percentage"], 0.0);
    }
}

#[tokio::test]
async fn exam_listing_uses_real_statistics() {
    let address = spawn_app(seeded_store().await).await;

    let body: serde_json::Value = reqwest::get(&format!("{}/api/exams", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    let exams = body["exams"].as_array().unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["status"], "completed");
    assert_eq!(exams[0]["difficulty"], "Medium");
    assert_eq!(exams[0]["totalQuestions"], 2);
    assert_eq!(exams[0]["totalStudents"], 6);
    assert_eq!(exams[0]["highestScore"], 95.0);
    assert_eq!(exams[0]["passRate"], 66.7);
    assert!(exams[0]["completedAt"].is_string());
}

#[tokio::test]
async fn results_list_terminal_attempts() {
    let address = spawn_app(seeded_store().await).await;

    let body: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/results", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let rows = body["studentResults"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["attemptId"], 6);
    assert_eq!(rows[0]["resultStatus"], "draft");
    assert_eq!(rows[0]["wrongAnswers"], 2);
    assert_eq!(rows[5]["studentName"], "Student 1");
    assert_eq!(rows[5]["isPassed"], true);

    let students = body["students"].as_array().unwrap();
    assert_eq!(students.len(), 6);
    assert_eq!(students[0]["name"], "Student 1");
    assert_eq!(students[0]["totalAttempts"], 1);
    assert_eq!(students[0]["bestAttempt"]["attemptId"], 1);
    assert_eq!(students[5]["bestAttempt"]["resultStatus"], "draft");
}

#[tokio::test]
async fn marking_requires_a_token() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();

    let response = client
        .put(&format!("{}/api/admin/attempts/6/marks", address))
        .json(&serde_json::json!({ "marks": { "20": 4 } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn students_cannot_mark() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("106", "student", JWT_SECRET, 600).unwrap();

    let response = client
        .put(&format!("{}/api/admin/attempts/6/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "20": 4 } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn teacher_marks_publish_the_result() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("teacher@example.com", "teacher", JWT_SECRET, 600).unwrap();

    let response = client
        .put(&format!("{}/api/admin/attempts/6/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "20": 4 } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["marksObtained"], 4.0);
    assert_eq!(body["data"]["totalMarks"], 5.0);
    assert_eq!(body["data"]["score"], 80.0);
    assert_eq!(body["data"]["passed"], true);

    let results: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/results", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let marked = &results["studentResults"][0];
    assert_eq!(marked["attemptId"], 6);
    assert_eq!(marked["resultStatus"], "published");
    assert_eq!(marked["percentage"], 80.0);
    assert_eq!(marked["correctAnswers"], 1);

    let analytics: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/analytics", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analytics["topicBreakdown"][1]["averageScore"], 100.0);
    assert_eq!(analytics["summary"]["passCount"], 5);
}

#[tokio::test]
async fn marking_a_running_attempt_conflicts() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("admin@example.com", "admin", JWT_SECRET, 600).unwrap();

    let response = client
        .put(&format!("{}/api/admin/attempts/7/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "10": 1 } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn marking_validates_the_body() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("admin@example.com", "admin", JWT_SECRET, 600).unwrap();
    let url = format!("{}/api/admin/attempts/6/marks", address);

    for body in [
        serde_json::json!({ "marks": {} }),
        serde_json::json!({ "marks": { "20": 7 } }),
        serde_json::json!({ "marks": { "99": 1 } }),
        serde_json::json!({ "points": 3 }),
    ] {
        let response = client
            .put(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400, "body {} should be rejected", body);
        let err: serde_json::Value = response.json().await.unwrap();
        assert_eq!(err["success"], false);
    }
}

#[tokio::test]
async fn marking_unknown_attempt_is_404() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("admin@example.com", "admin", JWT_SECRET, 600).unwrap();

    let response = client
        .put(&format!("{}/api/admin/attempts/404/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "20": 1 } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn remarking_keeps_earlier_overrides() {
    let address = spawn_app(seeded_store().await).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("teacher@example.com", "teacher", JWT_SECRET, 600).unwrap();
    let url = format!("{}/api/admin/attempts/6/marks", address);

    let first: serde_json::Value = client
        .put(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "10": 1, "20": 2 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["data"]["marksObtained"], 3.0);

    let second: serde_json::Value = client
        .put(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "20": 4 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["data"]["marksObtained"], 5.0);
    assert_eq!(second["data"]["score"], 100.0);

    let results: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/results", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results["studentResults"][0]["attemptId"], 6);
    assert_eq!(results["studentResults"][0]["correctAnswers"], 2);
    assert_eq!(results["studentResults"][0]["percentage"], 100.0);

    let analytics: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/analytics", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analytics["questionAnalysis"][0]["correctAnswers"], 5);
    assert_eq!(analytics["topicBreakdown"][0]["averageScore"], 83.0);
}

#[tokio::test]
async fn drifted_stored_percentage_is_served_as_stored() {
    let store = seeded_store().await;
    let mut drifted = attempt(
        8,
        AttemptStatus::Submitted,
        98.0,
        vec![objective_answer(10, true, 30.0)],
    );
    drifted.score = Some(1.0);
    drifted.total_marks = Some(5.0);
    store.insert_attempt(drifted).await;
    let address = spawn_app(store).await;

    let body: serde_json::Value = reqwest::get(&format!("{}/api/exams/1/analytics", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["summary"]["participants"], 7);
    assert_eq!(body["summary"]["highestScore"], 98.0);
    assert_eq!(body["recentSubmissions"][0]["attemptId"], 8);
    assert_eq!(body["recentSubmissions"][0]["grade"], "A");
}

#[tokio::test]
async fn ungrouped_exam_is_marked_from_answered_questions() {
    let store = Arc::new(MemoryExamStore::new());
    let (start, end) = exam_window();
    store
        .insert_exam(Exam {
            id: 5,
            name: "Loose questions".to_string(),
            description: String::new(),
            start_date: start,
            end_date: end,
            duration_minutes: 30,
            total_marks: 5.0,
            passing_percentage: 40.0,
            created_at: start,
        })
        .await;
    store
        .insert_question(Question {
            id: 50,
            group_id: 99,
            kind: QuestionKind::ShortAnswer,
            text: "Name a prime above 10.".to_string(),
            marks: 5.0,
            options: Vec::new(),
            created_at: start,
        })
        .await
        .unwrap();

    let mut answered = attempt(
        60,
        AttemptStatus::Submitted,
        0.0,
        vec![AttemptAnswer {
            question_id: 50,
            time_spent_secs: 40.0,
            response: AnswerResponse::Subjective { text: "13".to_string(), awarded_marks: None },
        }],
    );
    answered.exam_id = 5;
    let mut blank = attempt(61, AttemptStatus::Submitted, 0.0, Vec::new());
    blank.exam_id = 5;
    store.insert_attempt(answered).await;
    store.insert_attempt(blank).await;

    let address = spawn_app(store).await;
    let client = reqwest::Client::new();
    let token = sign_jwt("admin@example.com", "admin", JWT_SECRET, 600).unwrap();

    let response = client
        .put(&format!("{}/api/admin/attempts/60/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "50": 5 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalMarks"], 5.0);
    assert_eq!(body["data"]["score"], 100.0);

    let response = client
        .put(&format!("{}/api/admin/attempts/61/marks", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "marks": { "50": 5 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
