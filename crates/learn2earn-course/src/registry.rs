//! In-memory registries shared by the HTTP handlers.
//!
//! Nothing here persists; a restart forgets every student and generated
//! course.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::course::Course;

/// Wallet addresses that registered through the backend.
#[derive(Debug, Default)]
pub struct StudentRegistry {
    addresses: RwLock<BTreeSet<String>>,
}

impl StudentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `address` lower-cased and returns the stored form.
    pub async fn register(&self, address: &str) -> String {
        let address = address.trim().to_lowercase();
        let inserted = self.addresses.write().await.insert(address.clone());
        debug!(%address, inserted, "Student registered");
        address
    }

    /// Returns `true` if `address` registered, ignoring case.
    pub async fn is_registered(&self, address: &str) -> bool {
        self.addresses
            .read()
            .await
            .contains(&address.trim().to_lowercase())
    }

    /// Number of registered students.
    pub async fn len(&self) -> usize {
        self.addresses.read().await.len()
    }

    /// Returns `true` if nobody registered yet.
    pub async fn is_empty(&self) -> bool {
        self.addresses.read().await.is_empty()
    }
}

/// A generated course with its cache metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCourse {
    /// The course itself, flattened into the JSON body.
    #[serde(flatten)]
    pub course: Course,
    /// Course id, repeated for clients that expect it.
    pub course_id: String,
    /// When the course was generated.
    pub created_at: DateTime<Utc>,
}

/// Generated courses by id.
#[derive(Debug, Default)]
pub struct GeneratedCourseCache {
    courses: RwLock<HashMap<String, CachedCourse>>,
}

impl GeneratedCourseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches `course` under its id and returns the cached entry.
    pub async fn insert(&self, course: Course) -> CachedCourse {
        let entry = CachedCourse {
            course_id: course.id.clone(),
            course,
            created_at: Utc::now(),
        };
        self.courses
            .write()
            .await
            .insert(entry.course_id.clone(), entry.clone());
        debug!(course_id = %entry.course_id, "Cached generated course");
        entry
    }

    /// Cached course with the given id.
    pub async fn get(&self, id: &str) -> Option<CachedCourse> {
        self.courses.read().await.get(id).cloned()
    }

    /// Number of cached courses.
    pub async fn len(&self) -> usize {
        self.courses.read().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.courses.read().await.is_empty()
    }
}
