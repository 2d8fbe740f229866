//! Course catalog.
//!
//! The catalog holds the built-in courses embedded in the binary plus any
//! course files found in the configured courses directory.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::course::{Course, CourseSource, CourseSummary};
use crate::error::{CourseError, Result};

const BUILTIN_COURSES: &[(&str, &str)] = &[
    ("python-basics", include_str!("../courses/python-basics.json")),
    ("solidity-basics", include_str!("../courses/solidity-basics.json")),
    (
        "solidity-functions",
        include_str!("../courses/solidity-functions.json"),
    ),
    (
        "smart-contract-dev",
        include_str!("../courses/smart-contract-dev.json"),
    ),
];

/// Fixed courses available for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: Vec<Arc<Course>>,
}

impl Catalog {
    /// Catalog with only the built-in courses.
    ///
    /// # Errors
    ///
    /// Returns an error if embedded course data is malformed.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::default();
        for (id, json) in BUILTIN_COURSES {
            let course = Course::from_json(json, CourseSource::Builtin)
                .map_err(|e| CourseError::invalid_course(*id, e.to_string()))?;
            catalog.insert(course)?;
        }
        Ok(catalog)
    }

    /// Built-in courses plus every `*.json` file in `courses_dir`.
    ///
    /// Files are loaded in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read, a course file is
    /// invalid, or two courses share an id.
    pub fn load(courses_dir: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin()?;
        let Some(dir) = courses_dir else {
            return Ok(catalog);
        };

        let entries = std::fs::read_dir(dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CourseError::course_not_found(dir)
            } else {
                CourseError::Io(e)
            }
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            catalog.insert(Course::load(&path)?)?;
        }
        info!(courses = catalog.len(), dir = %dir.display(), "Course catalog loaded");
        Ok(catalog)
    }

    /// Adds a course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidCourse` if the id is already taken.
    pub fn insert(&mut self, course: Course) -> Result<()> {
        if self.get(&course.id).is_some() {
            return Err(CourseError::invalid_course(&course.id, "duplicate course id"));
        }
        debug!(course_id = %course.id, source = ?course.source, "Registered course");
        self.courses.push(Arc::new(course));
        Ok(())
    }

    /// Course with the given id.
    pub fn get(&self, id: &str) -> Option<Arc<Course>> {
        self.courses.iter().find(|c| c.id == id).cloned()
    }

    /// Course with the given id, or `CourseError::UnknownCourse`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::UnknownCourse` if no course has that id.
    pub fn require(&self, id: &str) -> Result<Arc<Course>> {
        self.get(id).ok_or_else(|| CourseError::unknown_course(id))
    }

    /// Listing entries in catalog order.
    pub fn summaries(&self) -> Vec<CourseSummary> {
        self.courses.iter().map(|c| c.summary()).collect()
    }

    /// Iterates over the courses in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Course>> {
        self.courses.iter()
    }

    /// Number of courses.
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
