//! AI course generation.
//!
//! A [`CourseGenerator`] turns a topic into a five-module course using a
//! structured-output language model. [`GeminiGenerator`] talks to the Gemini
//! `generateContent` API; tests plug in their own implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::GeneratorConfig;
use crate::course::{Course, CourseSource, Difficulty, Module};
use crate::error::{CourseError, GenerationErrorKind, Result};

/// Number of modules every generated course must have.
pub const GENERATED_MODULE_COUNT: usize = 5;

/// Maximum length of the topic slug inside a course id.
const SLUG_MAX_LEN: usize = 30;

/// Module as returned by the model.
///
/// Ids are reassigned on conversion, so whatever the model put there is
/// ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedModule {
    /// Module title.
    pub title: String,
    /// Theory HTML, sanitized on conversion.
    pub theory: String,
    /// Exercise description.
    pub task: String,
    /// Initial editor contents.
    #[serde(default)]
    pub starter_code: String,
    /// Reference solution.
    #[serde(default)]
    pub solution: String,
    /// Expected program output.
    pub expected_output: String,
    /// Hint text.
    #[serde(default)]
    pub hint: String,
}

/// Course as returned by the model, before it gets an id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCourse {
    /// Course title.
    pub title: String,
    /// Brief description.
    #[serde(default)]
    pub description: String,
    /// Single emoji.
    #[serde(default)]
    pub icon: String,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Estimated duration.
    #[serde(default)]
    pub duration: String,
    /// Modules in order.
    pub modules: Vec<GeneratedModule>,
}

impl GeneratedCourse {
    /// Converts into a free-navigation [`Course`] with the given id.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidGeneratedCourse` unless there are exactly
    /// five modules.
    pub fn into_course(self, id: impl Into<String>) -> Result<Course> {
        if self.modules.len() != GENERATED_MODULE_COUNT {
            return Err(CourseError::invalid_generated(format!(
                "expected {GENERATED_MODULE_COUNT} modules, got {}",
                self.modules.len()
            )));
        }

        let modules = (1..)
            .zip(self.modules)
            .map(|(id, m)| Module {
                id,
                title: m.title,
                theory: m.theory,
                task: m.task,
                starter_code: m.starter_code,
                solution: m.solution,
                expected_output: m.expected_output,
                hint: m.hint,
            })
            .collect();

        let course = Course {
            id: id.into(),
            title: self.title,
            description: self.description,
            icon: self.icon,
            difficulty: self.difficulty,
            duration: self.duration,
            modules,
            source: CourseSource::Generated,
        };
        course.validate()?;
        Ok(course.sanitized())
    }
}

/// A structured-output model that writes courses.
#[async_trait]
pub trait CourseGenerator: Send + Sync {
    /// Asks the model for a course matching `schema`.
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<GeneratedCourse>;
}

/// JSON schema the model's answer must follow.
pub fn course_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "Course title" },
            "description": { "type": "string", "description": "Brief course description" },
            "icon": { "type": "string", "description": "Single emoji representing the course" },
            "difficulty": { "type": "string", "enum": ["Beginner", "Intermediate", "Advanced"] },
            "duration": { "type": "string", "description": "Estimated duration like \"25 min\"" },
            "modules": {
                "type": "array",
                "minItems": GENERATED_MODULE_COUNT,
                "maxItems": GENERATED_MODULE_COUNT,
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "number" },
                        "title": { "type": "string", "description": "Module title" },
                        "theory": {
                            "type": "string",
                            "description": "Educational content with HTML formatting, includes h3, h4, p, ul, li, code, pre tags"
                        },
                        "task": { "type": "string", "description": "Coding exercise description" },
                        "starterCode": { "type": "string", "description": "Initial code for the exercise with helpful comments" },
                        "solution": { "type": "string", "description": "Complete solution code" },
                        "expectedOutput": { "type": "string", "description": "Expected output when solution runs" },
                        "hint": { "type": "string", "description": "Helpful hint for completing the exercise" }
                    },
                    "required": ["id", "title", "theory", "task", "starterCode", "solution", "expectedOutput", "hint"]
                }
            }
        },
        "required": ["title", "description", "icon", "difficulty", "duration", "modules"]
    })
}

/// Instruction text sent to the model for `topic`.
pub fn generation_prompt(topic: &str) -> String {
    format!(
        "Create an interactive coding course about \"{topic}\" with exactly {GENERATED_MODULE_COUNT} progressive modules.

Each module must include:
1. Educational theory with HTML formatting (h3, h4, p, ul, li, code, pre tags)
2. A hands-on coding exercise
3. Starter code with comments to guide students
4. A complete solution
5. Expected output
6. A helpful hint

Make it educational, engaging, and progressively more challenging. Focus on practical, hands-on learning."
    )
}

/// Course id for a generated course: `ai-<slug>-<millis>`.
///
/// # Example
///
/// ```
/// use learn2earn_course::generator::course_id_for;
///
/// assert_eq!(course_id_for("Rust Traits!", 1700), "ai-rust-traits--1700");
/// ```
pub fn course_id_for(topic: &str, unix_millis: i64) -> String {
    let lowered = topic.to_lowercase();
    let slug = match Regex::new(r"[^a-z0-9]+") {
        Ok(re) => re.replace_all(&lowered, "-").into_owned(),
        Err(_) => lowered,
    };
    let slug: String = slug.chars().take(SLUG_MAX_LEN).collect();
    format!("ai-{slug}-{unix_millis}")
}

/// Generates a course about `topic` and gives it a fresh id.
///
/// # Errors
///
/// Returns the generator's error, or `CourseError::InvalidGeneratedCourse`
/// if the answer does not have exactly five modules.
#[instrument(skip(generator))]
pub async fn generate_course<G>(generator: &G, topic: &str) -> Result<Course>
where
    G: CourseGenerator + ?Sized,
{
    let id = course_id_for(topic, Utc::now().timestamp_millis());
    let generated = generator
        .generate(&generation_prompt(topic), &course_schema())
        .await?;
    let course = generated.into_course(id)?;
    info!(course_id = %course.id, title = %course.title, "Generated course");
    Ok(course)
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// [`CourseGenerator`] backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    http: reqwest::Client,
    config: GeneratorConfig,
    api_key: Option<String>,
}

impl GeminiGenerator {
    /// Creates a generator from `config`, reading the API key from the
    /// environment.
    ///
    /// A missing key is reported when a course is requested, not here.
    ///
    /// # Errors
    ///
    /// Returns a generation error if the HTTP client cannot be built.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!(var = %config.api_key_env, "Generator API key not set");
        }
        Self::with_api_key(config, api_key)
    }

    /// Creates a generator with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns a generation error if the HTTP client cannot be built.
    pub fn with_api_key(config: &GeneratorConfig, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CourseError::generation(GenerationErrorKind::Other, e.to_string()))?;
        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl CourseGenerator for GeminiGenerator {
    #[instrument(skip(self, prompt, schema), fields(model = %self.config.model))]
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<GeneratedCourse> {
        let Some(api_key) = &self.api_key else {
            return Err(CourseError::generation(
                GenerationErrorKind::Authentication,
                format!("environment variable {} is not set", self.config.api_key_env),
            ));
        };

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        });

        debug!(url = %self.url(), "Calling generation API");
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseError::generation(GenerationErrorKind::Network, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Generation API returned an error");
            return Err(CourseError::generation(
                GenerationErrorKind::from_status(status.as_u16()),
                format!("API returned {status}: {text}"),
            ));
        }

        let response: GenerateContentResponse = response.json().await.map_err(|e| {
            CourseError::generation(GenerationErrorKind::InvalidResponse, e.to_string())
        })?;
        parse_candidate(response)
    }
}

fn parse_candidate(response: GenerateContentResponse) -> Result<GeneratedCourse> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| {
            CourseError::generation(GenerationErrorKind::InvalidResponse, "response has no candidates")
        })?;

    serde_json::from_str(&text).map_err(|e| {
        CourseError::generation(
            GenerationErrorKind::InvalidResponse,
            format!("candidate is not course JSON: {e}"),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub fn generated(modules: usize) -> GeneratedCourse {
        GeneratedCourse {
            title: "Rust Traits".to_string(),
            description: "Shared behaviour".to_string(),
            icon: "🦀".to_string(),
            difficulty: Difficulty::Intermediate,
            duration: "25 min".to_string(),
            modules: (1..=modules)
                .map(|i| GeneratedModule {
                    title: format!("Part {i}"),
                    theory: "<p>Traits</p><img src=x onerror=alert(1)>".to_string(),
                    task: "Print the answer".to_string(),
                    starter_code: String::new(),
                    solution: format!("print({i})"),
                    expected_output: i.to_string(),
                    hint: String::new(),
                })
                .collect(),
        }
    }

    /// Returns a fixed course.
    pub struct FixedGenerator(pub usize);

    #[async_trait]
    impl CourseGenerator for FixedGenerator {
        async fn generate(&self, prompt: &str, schema: &Value) -> Result<GeneratedCourse> {
            assert!(prompt.contains("exactly 5 progressive modules"));
            assert_eq!(schema["properties"]["modules"]["minItems"], 5);
            Ok(generated(self.0))
        }
    }

    /// Always fails.
    pub struct FailingGenerator;

    #[async_trait]
    impl CourseGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<GeneratedCourse> {
            Err(CourseError::generation(GenerationErrorKind::Server, "overloaded"))
        }
    }

    #[test]
    fn test_course_id_slug() {
        assert_eq!(course_id_for("Python for Data Science", 42), "ai-python-for-data-science-42");
        assert_eq!(
            course_id_for("A very long topic about many different things at once", 1),
            "ai-a-very-long-topic-about-many-d-1"
        );
    }

    #[test]
    fn test_schema_requires_five_modules() {
        let schema = course_schema();
        assert_eq!(schema["modules"], Value::Null);
        assert_eq!(schema["properties"]["modules"]["minItems"], 5);
        assert_eq!(schema["properties"]["modules"]["maxItems"], 5);
    }

    #[test]
    fn test_prompt_mentions_topic() {
        let prompt = generation_prompt("Solidity events");
        assert!(prompt.starts_with("Create an interactive coding course about \"Solidity events\""));
        assert!(prompt.contains("A helpful hint"));
    }

    #[test]
    fn test_into_course_assigns_ids_and_sanitizes() {
        let course = generated(5).into_course("ai-rust-1").unwrap();
        assert_eq!(course.source, CourseSource::Generated);
        assert!(course.free_navigation());
        let ids: Vec<_> = course.modules.iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
        assert_eq!(course.modules[0].theory, "<p>Traits</p>");
    }

    #[test]
    fn test_into_course_rejects_wrong_module_count() {
        let err = generated(4).into_course("ai-rust-1").unwrap_err();
        assert!(matches!(err, CourseError::InvalidGeneratedCourse { .. }));
        assert!(err.to_string().contains("expected 5 modules, got 4"));
    }

    #[test]
    fn test_parse_candidate_reads_first_part() {
        let course = serde_json::json!({
            "title": "T",
            "difficulty": "beginner",
            "modules": [{ "id": 1, "title": "M", "theory": "", "task": "", "expectedOutput": "1" }]
        });
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": course.to_string() }] } }]
        }))
        .unwrap();

        let parsed = parse_candidate(response).unwrap();
        assert_eq!(parsed.title, "T");
        assert_eq!(parsed.modules.len(), 1);
    }

    #[test]
    fn test_parse_candidate_empty_is_invalid_response() {
        let response = GenerateContentResponse { candidates: Vec::new() };
        let err = parse_candidate(response).unwrap_err();
        assert!(matches!(
            err,
            CourseError::GenerationError {
                kind: GenerationErrorKind::InvalidResponse,
                ..
            }
        ));
    }

    #[test]
    fn test_url_joins_endpoint_and_model() {
        let config = GeneratorConfig {
            endpoint: "https://api.example.com/v1/".to_string(),
            model: "m-1".to_string(),
            ..GeneratorConfig::default()
        };
        let generator = GeminiGenerator::with_api_key(&config, None).unwrap();
        assert_eq!(generator.url(), "https://api.example.com/v1/models/m-1:generateContent");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_authentication_error() {
        let generator = GeminiGenerator::with_api_key(&GeneratorConfig::default(), None).unwrap();
        let err = generator.generate("p", &course_schema()).await.unwrap_err();
        assert!(matches!(
            err,
            CourseError::GenerationError {
                kind: GenerationErrorKind::Authentication,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_generate_course_uses_ai_prefix() {
        let course = generate_course(&FixedGenerator(5), "Rust Traits").await.unwrap();
        assert!(course.id.starts_with("ai-rust-traits-"));
        assert_eq!(course.len(), 5);
    }

    #[tokio::test]
    async fn test_generate_course_propagates_failure() {
        let err = generate_course(&FailingGenerator, "Rust").await.unwrap_err();
        assert!(err.is_transient());
    }
}
