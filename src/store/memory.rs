//! In-memory store.
//!
//! Holds project, profile, like and comment rows in memory and answers the
//! same queries as the PostgREST store with the same semantics: newest-first
//! ordering, limit/offset pagination, tag containment, contributor-flag
//! equality and case-insensitive substring search.
//!
//! It backs the `fixture` store backend (a JSON snapshot loaded at startup)
//! and is the test double for the dispatcher.
//!
//! # Snapshot Format
//!
//! ```json
//! {
//!   "projects": [ { "id": "...", "title": "...", "created_at": "...", "user_id": "..." } ],
//!   "profiles": [ { "id": "...", "username": "...", "created_at": "..." } ],
//!   "likes":    [ { "project_id": "..." } ],
//!   "comments": [ { "project_id": "..." } ]
//! }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    Page, Profile, Project, ProjectQuery, ProjectRef, ProjectWithAuthor, ShowcaseStore,
    StoreError,
};

/// A like or comment, reduced to the project it belongs to.
#[derive(Debug, Deserialize)]
struct Engagement {
    project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Snapshot {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    profiles: Vec<Profile>,
    #[serde(default)]
    likes: Vec<Engagement>,
    #[serde(default)]
    comments: Vec<Engagement>,
}

/// A store answering queries from rows held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    projects: Vec<Project>,
    profiles: Vec<Profile>,
    /// Project id of every like.
    likes: Vec<String>,
    /// Project id of every comment.
    comments: Vec<String>,
    /// When set, every query fails with [`StoreError::Unavailable`].
    failing: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not match the
    /// snapshot format.
    pub fn from_snapshot(path: &Path) -> Result<Self, StoreError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| StoreError::SnapshotRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_snapshot_str(&contents).map_err(|source| StoreError::SnapshotParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a store from snapshot JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the snapshot format.
    pub fn from_snapshot_str(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self {
            projects: snapshot.projects,
            profiles: snapshot.profiles,
            likes: snapshot.likes.into_iter().map(|l| l.project_id).collect(),
            comments: snapshot.comments.into_iter().map(|c| c.project_id).collect(),
            failing: AtomicBool::new(false),
        })
    }

    /// Adds a project row.
    #[must_use]
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    /// Adds a profile row.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Adds a like on `project_id`.
    #[must_use]
    pub fn with_like(mut self, project_id: impl Into<String>) -> Self {
        self.likes.push(project_id.into());
        self
    }

    /// Adds a comment on `project_id`.
    #[must_use]
    pub fn with_comment(mut self, project_id: impl Into<String>) -> Self {
        self.comments.push(project_id.into());
        self
    }

    /// Makes every subsequent query fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of project rows.
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Number of profile rows.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(
                "in-memory store is set to fail".to_string(),
            ));
        }
        Ok(())
    }

    fn author_of(&self, project: &Project) -> Option<Profile> {
        self.profiles
            .iter()
            .find(|p| p.id == project.user_id)
            .cloned()
    }

    fn with_author(&self, project: &Project) -> ProjectWithAuthor {
        ProjectWithAuthor {
            project: project.clone(),
            author: self.author_of(project),
        }
    }

    /// Projects sorted newest first. Equal timestamps keep insertion order.
    fn projects_newest_first(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.projects.iter().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

fn matches_query(project: &Project, query: &ProjectQuery, search_lower: Option<&str>) -> bool {
    if let Some(tag) = &query.tag {
        if !project.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some(flag) = query.looking_for_contributors {
        if project.looking_for_contributors != flag {
            return false;
        }
    }
    if let Some(term) = search_lower {
        if !contains_ignore_case(Some(&project.title), term)
            && !contains_ignore_case(project.description.as_deref(), term)
        {
            return false;
        }
    }
    true
}

fn count_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl ShowcaseStore for InMemoryStore {
    async fn list_projects(
        &self,
        query: &ProjectQuery,
    ) -> Result<Vec<ProjectWithAuthor>, StoreError> {
        self.check()?;
        let search_lower = query.search.as_deref().map(str::to_lowercase);

        Ok(self
            .projects_newest_first()
            .into_iter()
            .filter(|p| matches_query(p, query, search_lower.as_deref()))
            .skip(query.page.offset)
            .take(query.page.limit)
            .map(|p| self.with_author(p))
            .collect())
    }

    async fn get_project(&self, id: &str) -> Result<Option<ProjectWithAuthor>, StoreError> {
        self.check()?;
        Ok(self
            .projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| self.with_author(p)))
    }

    async fn count_projects(
        &self,
        looking_for_contributors: Option<bool>,
    ) -> Result<u64, StoreError> {
        self.check()?;
        let n = self
            .projects
            .iter()
            .filter(|p| looking_for_contributors.map_or(true, |f| p.looking_for_contributors == f))
            .count();
        Ok(count_u64(n))
    }

    async fn project_tags(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.check()?;
        Ok(self.projects.iter().map(|p| p.tags.clone()).collect())
    }

    async fn count_likes(&self, project_id: &str) -> Result<u64, StoreError> {
        self.check()?;
        Ok(count_u64(
            self.likes.iter().filter(|id| *id == project_id).count(),
        ))
    }

    async fn count_comments(&self, project_id: &str) -> Result<u64, StoreError> {
        self.check()?;
        Ok(count_u64(
            self.comments.iter().filter(|id| *id == project_id).count(),
        ))
    }

    async fn list_profiles(&self, page: Page) -> Result<Vec<Profile>, StoreError> {
        self.check()?;
        let mut profiles: Vec<&Profile> = self.profiles.iter().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(profiles
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.check()?;
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn projects_by_owner(&self, profile_id: &str) -> Result<Vec<ProjectRef>, StoreError> {
        self.check()?;
        Ok(self
            .projects_newest_first()
            .into_iter()
            .filter(|p| p.user_id == profile_id)
            .map(|p| ProjectRef {
                id: p.id.clone(),
                title: p.title.clone(),
            })
            .collect())
    }

    async fn project_owner(&self, project_id: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.user_id.clone()))
    }
}
