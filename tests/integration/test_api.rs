//! Backend API integration tests
//!
//! Drive the full router with in-process requests. Course generation uses a
//! local generator so no network access is needed.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use learn2earn_course::{
    create_router, AppState, Catalog, Config, Course, CourseGenerator, CourseSession,
    Difficulty, GeneratedCourse, GeneratedModule, Result,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

/// Builds a course about whatever topic it is asked for.
struct TopicGenerator;

#[async_trait]
impl CourseGenerator for TopicGenerator {
    async fn generate(&self, prompt: &str, _schema: &Value) -> Result<GeneratedCourse> {
        let topic = prompt
            .split('"')
            .nth(1)
            .unwrap_or("Anything")
            .to_string();

        Ok(GeneratedCourse {
            title: topic.clone(),
            description: format!("A short course about {topic}"),
            icon: "📚".to_string(),
            difficulty: Difficulty::Beginner,
            duration: "15 min".to_string(),
            modules: (1..=5)
                .map(|i| GeneratedModule {
                    title: format!("{topic} {i}"),
                    theory: "<h3>Intro</h3><p onclick=\"x()\">Read me</p>".to_string(),
                    task: "Print the number".to_string(),
                    starter_code: "# your code".to_string(),
                    solution: format!("n = {i}\nprint(n)"),
                    expected_output: i.to_string(),
                    hint: "Use print".to_string(),
                })
                .collect(),
        })
    }
}

fn router() -> Router {
    let catalog = Catalog::builtin().expect("built-in courses should load");
    create_router(AppState::new(
        Config::default(),
        catalog,
        Arc::new(TopicGenerator),
    ))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Tests registration followed by lookups in different letter case.
#[tokio::test]
async fn test_student_registration_flow() {
    let router = router();
    let address = "0x7567D83B7B8D80ADDCB281A71D54FC7B3364FFED";

    let (status, body) = send(&router, Method::GET, &format!("/api/students/{address}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registered"], false);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/students/register",
        Some(json!({ "address": address })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["address"], address.to_lowercase());

    let (_, body) = send(&router, Method::GET, &format!("/api/students/{address}"), None).await;
    assert_eq!(body["registered"], true);
    assert_eq!(body["address"], address.to_lowercase());
}

/// Tests that a course served by the API can be played to completion.
#[tokio::test]
async fn test_served_course_is_playable() {
    let router = router();

    let (status, body) = send(&router, Method::GET, "/api/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .expect("course list")
        .iter()
        .filter_map(|c| c["id"].as_str())
        .collect();
    assert!(ids.contains(&"python-basics"));
    assert!(ids.contains(&"solidity-basics"));

    let (status, body) = send(&router, Method::GET, "/api/courses/solidity-basics", None).await;
    assert_eq!(status, StatusCode::OK);

    let course: Course = serde_json::from_value(body).expect("course should deserialize");
    assert!(!course.free_navigation());

    let mut session = CourseSession::new(Arc::new(course.clone()), ());
    for (index, module) in course.modules.iter().enumerate() {
        session.go_to(index).expect("module should unlock");
        assert!(session.run(&module.solution).passed(), "module {index}");
    }
    assert!(session.is_complete());
}

/// Tests generating a course and fetching it back from the cache.
#[tokio::test]
async fn test_generate_and_fetch_course() {
    let router = router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/generate-course",
        Some(json!({ "prompt": "Rust Ownership" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let course_id = body["courseId"].as_str().expect("courseId").to_string();
    assert!(course_id.starts_with("ai-rust-ownership-"));
    assert_eq!(body["course"]["modules"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["course"]["source"], "generated");
    let theory = body["course"]["modules"][0]["theory"].as_str().unwrap_or_default();
    assert!(!theory.contains("onclick"));

    let (status, cached) = send(
        &router,
        Method::GET,
        &format!("/api/generated-course/{course_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["courseId"], course_id);
    assert!(cached["createdAt"].is_string());

    // Generated courses are not part of the fixed catalog.
    let (status, _) = send(&router, Method::GET, &format!("/api/courses/{course_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Tests the error bodies of rejected requests.
#[tokio::test]
async fn test_error_responses() {
    let router = router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/students/register",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Address required");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/generate-course",
        Some(json!({ "prompt": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Prompt is required");

    let (status, body) = send(&router, Method::GET, "/api/generated-course/ai-missing-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course not found");
}
