//! Course and module data.
//!
//! A [`Course`] is an ordered list of [`Module`]s plus display metadata.
//! Courses are immutable once loaded; sessions share them through `Arc`.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CourseError, Result};
use crate::sanitize::sanitize_theory;

/// Maximum allowed course file size in bytes (256KB).
pub const MAX_COURSE_SIZE: u64 = 256 * 1024;

/// One step of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// 1-based position within the course.
    pub id: u32,
    /// Module title.
    pub title: String,
    /// Theory text as sanitized HTML.
    pub theory: String,
    /// What the learner has to do.
    pub task: String,
    /// Code placed in the editor when the module opens.
    #[serde(default)]
    pub starter_code: String,
    /// Reference solution.
    #[serde(default)]
    pub solution: String,
    /// Output a correct program prints.
    pub expected_output: String,
    /// Hint shown on request.
    #[serde(default)]
    pub hint: String,
}

/// Course difficulty label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    /// Entry level (default).
    #[default]
    Beginner,
    /// Some prior knowledge expected.
    Intermediate,
    /// Experienced learners.
    Advanced,
}

impl Difficulty {
    /// Parses a string into a `Difficulty`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid difficulty '{s}': expected one of 'Beginner', 'Intermediate', 'Advanced'"
            ))
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Where a course came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSource {
    /// Embedded in the binary.
    #[default]
    Builtin,
    /// Loaded from the courses directory.
    File,
    /// Produced by the AI generator.
    Generated,
}

impl CourseSource {
    /// Returns `true` if learners may jump to any module at any time.
    ///
    /// # Examples
    ///
    /// ```
    /// use learn2earn_course::CourseSource;
    ///
    /// assert!(CourseSource::Generated.free_navigation());
    /// assert!(!CourseSource::Builtin.free_navigation());
    /// ```
    #[must_use]
    pub const fn free_navigation(self) -> bool {
        matches!(self, Self::Generated)
    }
}

/// An ordered set of modules with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Stable course identifier, also used on-chain.
    pub id: String,
    /// Course title.
    pub title: String,
    /// Short description for listings.
    #[serde(default)]
    pub description: String,
    /// Emoji shown next to the title.
    #[serde(default)]
    pub icon: String,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Estimated duration, e.g. `5 min`.
    #[serde(default)]
    pub duration: String,
    /// Modules in order.
    pub modules: Vec<Module>,
    /// Origin of the course.
    #[serde(default)]
    pub source: CourseSource,
}

/// Listing entry for a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    /// Course identifier.
    pub id: String,
    /// Course title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Emoji icon.
    pub icon: String,
    /// Difficulty label.
    pub difficulty: Difficulty,
    /// Estimated duration.
    pub duration: String,
    /// Number of modules.
    pub module_count: usize,
    /// Whether modules can be visited in any order.
    pub free_navigation: bool,
}

impl Course {
    /// Loads a course from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::CourseNotFound` if the file doesn't exist,
    /// `CourseError::CourseTooLarge` above 256KB,
    /// `CourseError::CourseEncodingError` if the file is not UTF-8,
    /// `CourseError::CourseParseError` for invalid JSON and
    /// `CourseError::InvalidCourse` if the modules are malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CourseError::course_not_found(path)
            } else {
                CourseError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_COURSE_SIZE {
            return Err(CourseError::course_too_large(path, file_size / 1024));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                CourseError::course_encoding(path)
            } else {
                CourseError::Io(e)
            }
        })?;

        let course = Self::from_json(&content, CourseSource::File)
            .map_err(|e| match e {
                CourseError::Json(e) => CourseError::course_parse(path, e.to_string()),
                other => other,
            })?;
        debug!(course_id = %course.id, path = %path.display(), "Loaded course file");
        Ok(course)
    }

    /// Parses, validates and sanitizes a course from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Json` for invalid JSON and
    /// `CourseError::InvalidCourse` if the modules are malformed.
    pub fn from_json(json: &str, source: CourseSource) -> Result<Self> {
        let mut course: Self = serde_json::from_str(json)?;
        course.source = source;
        course.validate()?;
        Ok(course.sanitized())
    }

    /// Checks the course invariants.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidCourse` when the id is empty, there are
    /// no modules, or module ids are not `1..=n` in order.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CourseError::invalid_course("<unnamed>", "course id must not be empty"));
        }
        if self.modules.is_empty() {
            return Err(CourseError::invalid_course(&self.id, "course has no modules"));
        }
        for (position, module) in (1..).zip(&self.modules) {
            if module.id != position {
                return Err(CourseError::invalid_course(
                    &self.id,
                    format!("module ids must be sequential: expected {position}, found {}", module.id),
                ));
            }
        }
        Ok(())
    }

    /// Returns the course with every theory text sanitized.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for module in &mut self.modules {
            module.theory = sanitize_theory(&module.theory);
        }
        self
    }

    /// Module at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ModuleIndexOutOfRange` past the last module.
    pub fn module(&self, index: usize) -> Result<&Module> {
        self.modules.get(index).ok_or(CourseError::ModuleIndexOutOfRange {
            index,
            len: self.modules.len(),
        })
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if the course has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether modules can be visited in any order.
    pub const fn free_navigation(&self) -> bool {
        self.source.free_navigation()
    }

    /// Share of modules in `completed`, between 0.0 and 1.0.
    pub fn completion_ratio(&self, completed: &BTreeSet<usize>) -> f64 {
        if self.modules.is_empty() {
            return 0.0;
        }
        let done = completed.range(..self.modules.len()).count();
        // Module counts are tiny
        #[allow(clippy::cast_precision_loss)]
        let ratio = done as f64 / self.modules.len() as f64;
        ratio
    }

    /// Returns `true` if every module index is in `completed`.
    pub fn is_complete(&self, completed: &BTreeSet<usize>) -> bool {
        !self.modules.is_empty() && (0..self.modules.len()).all(|i| completed.contains(&i))
    }

    /// Listing entry for this course.
    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            difficulty: self.difficulty,
            duration: self.duration.clone(),
            module_count: self.modules.len(),
            free_navigation: self.free_navigation(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    pub fn module(id: u32, expected: &str) -> Module {
        Module {
            id,
            title: format!("Module {id}"),
            theory: "<p>Theory</p>".to_string(),
            task: "Print it".to_string(),
            starter_code: "# start\n".to_string(),
            solution: format!("print(\"{expected}\")"),
            expected_output: expected.to_string(),
            hint: "Use print()".to_string(),
        }
    }

    pub fn course(source: CourseSource, modules: usize) -> Course {
        Course {
            id: "test-course".to_string(),
            title: "Test Course".to_string(),
            description: "A course for tests".to_string(),
            icon: "🧪".to_string(),
            difficulty: Difficulty::Beginner,
            duration: "5 min".to_string(),
            modules: (1..=modules)
                .map(|i| module(u32::try_from(i).unwrap(), &format!("step {i}")))
                .collect(),
            source,
        }
    }

    fn write_temp(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_difficulty_case_insensitive() {
        let d: Difficulty = serde_json::from_str("\"ADVANCED\"").unwrap();
        assert_eq!(d, Difficulty::Advanced);
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"Advanced\"");
    }

    #[test]
    fn test_invalid_difficulty_error() {
        let err = serde_json::from_str::<Difficulty>("\"expert\"").unwrap_err();
        assert!(err.to_string().contains("invalid difficulty 'expert'"));
    }

    #[test]
    fn test_module_out_of_range() {
        let course = course(CourseSource::Builtin, 2);
        assert_eq!(course.module(1).unwrap().id, 2);
        let err = course.module(2).unwrap_err();
        assert!(matches!(err, CourseError::ModuleIndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_completion_ratio_and_is_complete() {
        let course = course(CourseSource::Builtin, 4);
        let mut done = BTreeSet::new();
        assert!((course.completion_ratio(&done) - 0.0).abs() < f64::EPSILON);
        done.insert(0);
        done.insert(2);
        assert!((course.completion_ratio(&done) - 0.5).abs() < f64::EPSILON);
        assert!(!course.is_complete(&done));
        done.extend([1, 3]);
        assert!(course.is_complete(&done));
    }

    #[test]
    fn test_validate_rejects_non_sequential_ids() {
        let mut course = course(CourseSource::File, 3);
        course.modules[2].id = 7;
        let err = course.validate().unwrap_err();
        assert!(err.to_string().contains("expected 3, found 7"));
    }

    #[test]
    fn test_validate_rejects_empty_course() {
        let course = course(CourseSource::File, 0);
        assert!(matches!(course.validate(), Err(CourseError::InvalidCourse { .. })));
    }

    #[test]
    fn test_from_json_sanitizes_theory() {
        let mut course = course(CourseSource::Builtin, 1);
        course.modules[0].theory = "<p>ok</p><script>bad()</script>".to_string();
        let json = serde_json::to_string(&course).unwrap();

        let loaded = Course::from_json(&json, CourseSource::Generated).unwrap();
        assert_eq!(loaded.modules[0].theory, "<p>ok</p>");
        assert_eq!(loaded.source, CourseSource::Generated);
        assert!(loaded.free_navigation());
    }

    #[test]
    fn test_summary_counts_modules() {
        let summary = course(CourseSource::Builtin, 3).summary();
        assert_eq!(summary.module_count, 3);
        assert!(!summary.free_navigation);
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    #[test]
    fn test_load_valid_course() {
        let json = serde_json::to_vec(&course(CourseSource::Builtin, 2)).unwrap();
        let path = write_temp("test_course_valid.json", &json);

        let loaded = Course::load(&path).unwrap();
        assert_eq!(loaded.id, "test-course");
        assert_eq!(loaded.source, CourseSource::File);
        assert_eq!(loaded.len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_nonexistent_course() {
        let err = Course::load("/nonexistent/path/course.json").unwrap_err();
        assert!(
            matches!(&err, CourseError::CourseNotFound { path } if path.to_string_lossy().contains("course.json")),
            "Expected CourseNotFound, got: {err:?}"
        );
    }

    #[test]
    fn test_load_course_too_large() {
        let content = "x".repeat(300 * 1024);
        let path = write_temp("test_course_large.json", content.as_bytes());

        let err = Course::load(&path).unwrap_err();
        assert!(
            matches!(&err, CourseError::CourseTooLarge { size_kb, .. } if *size_kb >= 299),
            "Expected CourseTooLarge, got: {err:?}"
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_course_invalid_encoding() {
        let path = write_temp("test_course_invalid_utf8.json", &[0x80, 0x81, 0xFF, 0xFE]);

        let err = Course::load(&path).unwrap_err();
        assert!(matches!(err, CourseError::CourseEncodingError { .. }));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_course_invalid_json() {
        let path = write_temp("test_course_invalid.json", b"{ \"id\": ");

        let err = Course::load(&path).unwrap_err();
        assert!(
            matches!(&err, CourseError::CourseParseError { path: p, .. } if *p == path),
            "Expected CourseParseError, got: {err:?}"
        );

        std::fs::remove_file(&path).ok();
    }
}
