//! Learn2Earn courses.
//!
//! This crate turns playground runs into course progress. It provides:
//! - Course and module data with loading, validation and sanitized theory ([`course`])
//! - The catalog of built-in and file-based courses ([`catalog`])
//! - The session controller that gates navigation and claims rewards ([`session`])
//! - AI course generation ([`generator`])
//! - Configuration ([`config`]) and errors ([`error`])
//! - The HTTP backend ([`api`]) and its in-memory registries ([`registry`])

pub mod api;
pub mod catalog;
pub mod config;
pub mod course;
pub mod error;
pub mod generator;
pub mod registry;
pub mod sanitize;
pub mod session;

pub use api::{create_router, AppState, ErrorResponse, HealthResponse};
pub use catalog::Catalog;
pub use config::{Config, ContractConfig, GeneratorConfig, CONFIG_FILE_NAME};
pub use course::{Course, CourseSource, CourseSummary, Difficulty, Module, MAX_COURSE_SIZE};
pub use error::{CourseError, GenerationErrorKind, Result};
pub use generator::{
    course_schema, generate_course, generation_prompt, CourseGenerator, GeminiGenerator,
    GeneratedCourse, GeneratedModule,
};
pub use registry::{CachedCourse, GeneratedCourseCache, StudentRegistry};
pub use sanitize::sanitize_theory;
pub use session::{CourseSession, RunOutcome, SessionHooks, SessionState, SessionStatus};
