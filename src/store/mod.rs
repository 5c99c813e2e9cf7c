//! Read-only access to the showcase data store.
//!
//! The MCP layer never talks to a database directly. It is handed an
//! [`ShowcaseStore`] trait object at startup and only uses the query
//! capabilities listed there: point lookup by id, equality and array
//! containment filters, case-insensitive substring search over title OR
//! description, newest-first ordering, limit/offset pagination and
//! count-only queries. Nothing in this module writes.
//!
//! # Implementations
//!
//! - [`PostgrestStore`]: the production store, a PostgREST endpoint over HTTP
//! - [`InMemoryStore`]: rows held in memory, loaded from a JSON snapshot or
//!   built up in tests

pub mod memory;
pub mod postgrest;

pub use memory::InMemoryStore;
pub use postgrest::PostgrestStore;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A showcased project row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Project title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Screenshot image URL.
    #[serde(default)]
    pub screenshot_url: Option<String>,
    /// Source repository URL.
    #[serde(default)]
    pub repo_url: Option<String>,
    /// Deployed application URL.
    #[serde(default)]
    pub live_url: Option<String>,
    /// Whether the owner is looking for contributors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub looking_for_contributors: bool,
    /// Free-form tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Id of the owning profile.
    pub user_id: String,
}

/// A user profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile id (same as the identity provider's user id).
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub username: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Short biography.
    #[serde(default)]
    pub bio: Option<String>,
    /// GitHub profile URL.
    #[serde(default)]
    pub github_url: Option<String>,
    /// Twitter/X profile URL.
    #[serde(default)]
    pub twitter_url: Option<String>,
    /// LinkedIn profile URL.
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Facebook profile URL.
    #[serde(default)]
    pub facebook_url: Option<String>,
    /// Substack URL.
    #[serde(default)]
    pub substack_url: Option<String>,
    /// Personal website URL.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A project joined with its owner's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithAuthor {
    /// The project row.
    #[serde(flatten)]
    pub project: Project,
    /// The owner's profile, if it still exists.
    #[serde(default)]
    pub author: Option<Profile>,
}

/// The id and title of a project, as listed on a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Project id.
    pub id: String,
    /// Project title.
    pub title: String,
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of rows.
    pub limit: usize,
    /// Number of rows to skip.
    pub offset: usize,
}

impl Page {
    /// Creates a page starting at `offset`.
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The first `limit` rows.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self::new(limit, 0)
    }
}

/// Filters for listing projects. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectQuery {
    /// Only projects whose tag array contains this tag.
    pub tag: Option<String>,
    /// Only projects with this contributor flag.
    pub looking_for_contributors: Option<bool>,
    /// Case-insensitive substring matched against title OR description.
    pub search: Option<String>,
    /// Pagination.
    pub page: Page,
}

impl ProjectQuery {
    /// An unfiltered query over `page`.
    #[must_use]
    pub const fn page(page: Page) -> Self {
        Self {
            tag: None,
            looking_for_contributors: None,
            search: None,
            page,
        }
    }
}

/// Errors raised by store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The HTTP request to the store failed (connect, timeout, body read).
    #[error("store request failed")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status} for table '{table}'")]
    Status {
        /// Table that was queried.
        table: &'static str,
        /// HTTP status code.
        status: u16,
        /// Database error code reported in the response body, if any.
        db_code: Option<String>,
    },

    /// The store's response body did not match the expected rows.
    #[error("failed to decode rows from table '{table}'")]
    Decode {
        /// Table that was queried.
        table: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A count query came back without a usable total.
    #[error("count query on table '{table}' returned no total")]
    MissingCount {
        /// Table that was counted.
        table: &'static str,
    },

    /// A snapshot file could not be read.
    #[error("failed to read store snapshot: {path}")]
    SnapshotRead {
        /// Path to the snapshot.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file could not be parsed.
    #[error("failed to parse store snapshot: {path}")]
    SnapshotParse {
        /// Path to the snapshot.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The store is not accepting queries.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only queries the MCP server needs from the data store.
///
/// Implementations must be cheap to share across requests; the server holds
/// one instance behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait ShowcaseStore: Send + Sync {
    /// Lists projects matching `query`, newest first, joined with their authors.
    async fn list_projects(&self, query: &ProjectQuery)
        -> Result<Vec<ProjectWithAuthor>, StoreError>;

    /// Fetches one project joined with its author.
    async fn get_project(&self, id: &str) -> Result<Option<ProjectWithAuthor>, StoreError>;

    /// Counts projects, optionally only those with the given contributor flag.
    async fn count_projects(
        &self,
        looking_for_contributors: Option<bool>,
    ) -> Result<u64, StoreError>;

    /// Returns the tag array of every project.
    async fn project_tags(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Counts likes on a project.
    async fn count_likes(&self, project_id: &str) -> Result<u64, StoreError>;

    /// Counts comments on a project.
    async fn count_comments(&self, project_id: &str) -> Result<u64, StoreError>;

    /// Lists profiles, newest first.
    async fn list_profiles(&self, page: Page) -> Result<Vec<Profile>, StoreError>;

    /// Fetches one profile.
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Lists the projects owned by a profile, newest first.
    async fn projects_by_owner(&self, profile_id: &str) -> Result<Vec<ProjectRef>, StoreError>;

    /// Returns the owning profile id of a project.
    async fn project_owner(&self, project_id: &str) -> Result<Option<String>, StoreError>;
}

/// Deserialises `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_tolerates_null_columns() {
        let project: Project = serde_json::from_value(json!({
            "id": "p1",
            "title": "Agent",
            "description": null,
            "looking_for_contributors": null,
            "tags": null,
            "created_at": "2024-05-01T10:00:00+00:00",
            "user_id": "u1"
        }))
        .unwrap();

        assert!(project.tags.is_empty());
        assert!(!project.looking_for_contributors);
        assert!(project.description.is_none());
        assert!(project.updated_at.is_none());
    }

    #[test]
    fn project_with_author_flattens_row() {
        let row: ProjectWithAuthor = serde_json::from_value(json!({
            "id": "p1",
            "title": "Agent",
            "tags": ["ai"],
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "user_id": "u1",
            "author": {
                "id": "u1",
                "username": "ada",
                "created_at": "2024-01-01T00:00:00+00:00"
            }
        }))
        .unwrap();

        assert_eq!(row.project.id, "p1");
        assert_eq!(row.project.tags, vec!["ai".to_string()]);
        assert_eq!(
            row.author.and_then(|a| a.username),
            Some("ada".to_string())
        );
    }

    #[test]
    fn missing_author_is_none() {
        let row: ProjectWithAuthor = serde_json::from_value(json!({
            "id": "p1",
            "title": "Agent",
            "created_at": "2024-05-01T10:00:00Z",
            "user_id": "u1",
            "author": null
        }))
        .unwrap();
        assert!(row.author.is_none());
    }

    #[test]
    fn store_error_hides_credentials() {
        let err = StoreError::Status {
            table: "projects",
            status: 401,
            db_code: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("projects"));
    }
}
