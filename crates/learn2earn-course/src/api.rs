//! HTTP API for the Learn2Earn backend.
//!
//! The backend serves the course catalog, keeps an in-memory list of
//! registered wallets and generates AI courses on request.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Liveness check
//! - `POST /api/students/register` - Register a wallet address
//! - `GET /api/students/:address` - Registration status of an address
//! - `GET /api/courses` - Catalog listing
//! - `GET /api/courses/:id` - Full catalog course
//! - `POST /api/generate-course` - Generate a course from a prompt
//! - `GET /api/generated-course/:id` - Previously generated course
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use learn2earn_course::{create_router, AppState, Catalog, Config, GeminiGenerator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let generator = GeminiGenerator::from_config(&config.generator)?;
//! let state = AppState::new(config, Catalog::builtin()?, Arc::new(generator));
//!
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::course::{Course, CourseSummary};
use crate::generator::{generate_course, CourseGenerator};
use crate::registry::{CachedCourse, GeneratedCourseCache, StudentRegistry};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Human-readable status line.
    pub message: String,
    /// Contract that records completions.
    pub contract_address: String,
    /// Reward granted per completed course.
    pub reward_label: String,
    /// Number of fixed courses served.
    pub course_count: usize,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

/// Request body for student registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// Wallet address.
    #[serde(default)]
    pub address: Option<String>,
}

/// Response body for student registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Whether the address was stored.
    pub success: bool,
    /// Human-readable result.
    pub message: String,
    /// Stored (lower-cased) address.
    pub address: String,
}

/// Response body for a registration lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentResponse {
    /// Lower-cased address.
    pub address: String,
    /// Whether the address registered.
    pub registered: bool,
}

/// Request body for course generation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateCourseRequest {
    /// Topic to build a course about.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Response body for course generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseResponse {
    /// Id under which the course was cached.
    pub course_id: String,
    /// The generated course.
    pub course: Course,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Backend configuration.
    pub config: Config,
    /// Fixed courses.
    pub catalog: Arc<Catalog>,
    /// Registered wallets.
    pub students: Arc<StudentRegistry>,
    /// Generated courses by id.
    pub generated: Arc<GeneratedCourseCache>,
    /// Course generator.
    pub generator: Arc<dyn CourseGenerator>,
}

impl AppState {
    /// Creates state with empty registries.
    #[must_use]
    pub fn new(config: Config, catalog: Catalog, generator: Arc<dyn CourseGenerator>) -> Self {
        Self {
            config,
            catalog: Arc::new(catalog),
            students: Arc::new(StudentRegistry::new()),
            generated: Arc::new(GeneratedCourseCache::new()),
            generator,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// Request body is missing a required field.
    BadRequest(String),
    /// Requested resource does not exist.
    NotFound(String),
    /// Upstream or internal failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// Routes live under `/api`, with permissive CORS for the browser front end
/// and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/students/register", post(handle_register))
        .route("/students/:address", get(handle_student))
        .route("/courses", get(handle_courses))
        .route("/courses/:id", get(handle_course))
        .route("/generate-course", post(handle_generate_course))
        .route("/generated-course/:id", get(handle_generated_course));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/health`.
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Learn2Earn backend is running".to_string(),
        contract_address: state.config.contract.address.clone(),
        reward_label: state.config.reward_label.clone(),
        course_count: state.catalog.len(),
        timestamp: Utc::now(),
    })
}

/// Handler for `POST /api/students/register`.
async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Some(address) = request.address.filter(|a| !a.trim().is_empty()) else {
        warn!("Registration without address");
        return Err(ApiError::BadRequest("Address required".to_string()));
    };

    let address = state.students.register(&address).await;
    info!(%address, "Student registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "Student registered successfully".to_string(),
        address,
    }))
}

/// Handler for `GET /api/students/:address`.
async fn handle_student(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Json<StudentResponse> {
    let registered = state.students.is_registered(&address).await;
    Json(StudentResponse {
        address: address.to_lowercase(),
        registered,
    })
}

/// Handler for `GET /api/courses`.
async fn handle_courses(State(state): State<Arc<AppState>>) -> Json<Vec<CourseSummary>> {
    Json(state.catalog.summaries())
}

/// Handler for `GET /api/courses/:id`.
async fn handle_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Course>, ApiError> {
    state
        .catalog
        .get(&id)
        .map(|course| Json(Course::clone(&course)))
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

/// Handler for `POST /api/generate-course`.
async fn handle_generate_course(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateCourseRequest>,
) -> Result<Json<GenerateCourseResponse>, ApiError> {
    let Some(prompt) = request.prompt.filter(|p| !p.trim().is_empty()) else {
        warn!("Course generation without prompt");
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    };

    info!(%prompt, "Generating course");
    let course = generate_course(state.generator.as_ref(), &prompt)
        .await
        .map_err(|e| {
            error!(error = %e, "Course generation failed");
            ApiError::Internal("Failed to generate course".to_string())
        })?;

    let entry = state.generated.insert(course).await;
    Ok(Json(GenerateCourseResponse {
        course_id: entry.course_id,
        course: entry.course,
    }))
}

/// Handler for `GET /api/generated-course/:id`.
async fn handle_generated_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CachedCourse>, ApiError> {
    state
        .generated
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}
