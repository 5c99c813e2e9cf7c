//! Read-only tools exposed through `tools/call`.
//!
//! Each tool is a pure query: arguments are validated first, then translated
//! into [`ShowcaseStore`] calls, and the rows are projected into the JSON
//! document returned to the client as MCP text content.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::mcp::protocol::{ErrorCode, JsonRpcErrorData};
use crate::mcp::server::store_failure;
use crate::store::{Page, Profile, ProjectQuery, ProjectWithAuthor, ShowcaseStore};

/// Default and maximum page size for `list_projects` and `list_profiles`.
const LIST_DEFAULT_LIMIT: usize = 50;
const LIST_MAX_LIMIT: usize = 100;

/// Default and maximum result count for `search_projects`.
const SEARCH_DEFAULT_LIMIT: usize = 20;
const SEARCH_MAX_LIMIT: usize = 50;

/// Number of tags reported by `get_project_stats`.
const TOP_TAG_COUNT: usize = 10;

/// The tools this server knows, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    /// Paginated project listing with optional filters.
    ListProjects,
    /// One project with author and engagement counts.
    GetProject,
    /// Substring search over project titles and descriptions.
    SearchProjects,
    /// Aggregate project statistics.
    GetProjectStats,
    /// One profile with its projects.
    GetProfile,
    /// Paginated profile listing.
    ListProfiles,
    /// Project ids owned by a profile.
    GetProfileProjects,
    /// Owning profile id of a project.
    GetProjectProfile,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::ListProjects,
        Self::GetProject,
        Self::SearchProjects,
        Self::GetProjectStats,
        Self::GetProfile,
        Self::ListProfiles,
        Self::GetProfileProjects,
        Self::GetProjectProfile,
    ];

    /// Returns the wire name of this tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListProjects => "list_projects",
            Self::GetProject => "get_project",
            Self::SearchProjects => "search_projects",
            Self::GetProjectStats => "get_project_stats",
            Self::GetProfile => "get_profile",
            Self::ListProfiles => "list_profiles",
            Self::GetProfileProjects => "get_profile_projects",
            Self::GetProjectProfile => "get_project_profile",
        }
    }

    /// Looks up a tool by its wire name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

/// A tag and the number of projects carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    /// The tag.
    pub tag: String,
    /// Number of occurrences across all projects.
    pub count: u64,
}

/// Returns the static tool catalog.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL
        .into_iter()
        .map(|tool| {
            let (description, input_schema) = match tool {
                ToolName::ListProjects => (
                    "List all projects in the showcase with optional filtering",
                    json!({
                        "type": "object",
                        "properties": {
                            "limit": {
                                "type": "integer",
                                "description": "Maximum number of projects to return (default: 50, max: 100)"
                            },
                            "offset": {
                                "type": "integer",
                                "description": "Number of projects to skip for pagination"
                            },
                            "tag": {
                                "type": "string",
                                "description": "Filter projects by tag"
                            },
                            "looking_for_contributors": {
                                "type": "boolean",
                                "description": "Filter projects looking for contributors"
                            }
                        }
                    }),
                ),
                ToolName::GetProject => (
                    "Get detailed information about a specific project, including its author, \
                     like count and comment count",
                    json!({
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "The project ID"
                            }
                        },
                        "required": ["id"]
                    }),
                ),
                ToolName::SearchProjects => (
                    "Search projects by title or description (case-insensitive substring match)",
                    json!({
                        "type": "object",
                        "properties": {
                            "query": {
                                "type": "string",
                                "description": "Search query to match against project titles and descriptions"
                            },
                            "limit": {
                                "type": "integer",
                                "description": "Maximum number of results (default: 20, max: 50)"
                            }
                        },
                        "required": ["query"]
                    }),
                ),
                ToolName::GetProjectStats => (
                    "Get statistics about projects in the showcase: totals, projects looking \
                     for contributors and the 10 most used tags",
                    json!({
                        "type": "object",
                        "properties": {}
                    }),
                ),
                ToolName::GetProfile => (
                    "Get detailed information about a user profile and the projects it owns",
                    json!({
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "The profile/user ID"
                            }
                        },
                        "required": ["id"]
                    }),
                ),
                ToolName::ListProfiles => (
                    "List user profiles with optional pagination",
                    json!({
                        "type": "object",
                        "properties": {
                            "limit": {
                                "type": "integer",
                                "description": "Maximum number of profiles to return (default: 50, max: 100)"
                            },
                            "offset": {
                                "type": "integer",
                                "description": "Number of profiles to skip for pagination"
                            }
                        }
                    }),
                ),
                ToolName::GetProfileProjects => (
                    "Get all project IDs created by a specific profile/user",
                    json!({
                        "type": "object",
                        "properties": {
                            "profile_id": {
                                "type": "string",
                                "description": "The profile/user ID"
                            }
                        },
                        "required": ["profile_id"]
                    }),
                ),
                ToolName::GetProjectProfile => (
                    "Get the profile ID of the user who created a specific project",
                    json!({
                        "type": "object",
                        "properties": {
                            "project_id": {
                                "type": "string",
                                "description": "The project ID"
                            }
                        },
                        "required": ["project_id"]
                    }),
                ),
            };

            ToolDefinition {
                name: tool.name().to_string(),
                description: description.to_string(),
                input_schema,
            }
        })
        .collect()
}

/// Runs the tool called `name` and wraps its output as MCP text content.
///
/// # Errors
///
/// - `-32601` if no tool has that name
/// - `-32602` for missing or malformed arguments and unknown entities
/// - `-32603` if the store fails
pub async fn call_tool(
    store: &dyn ShowcaseStore,
    name: &str,
    arguments: &Value,
) -> Result<Value, JsonRpcErrorData> {
    let Some(tool) = ToolName::from_name(name) else {
        return Err(JsonRpcErrorData::with_message(
            ErrorCode::MethodNotFound,
            format!("Unknown tool: {name}"),
        ));
    };

    tracing::info!(tool = tool.name(), "Calling tool");

    let output = match tool {
        ToolName::ListProjects => list_projects(store, arguments).await?,
        ToolName::GetProject => get_project(store, arguments).await?,
        ToolName::SearchProjects => search_projects(store, arguments).await?,
        ToolName::GetProjectStats => get_project_stats(store).await?,
        ToolName::GetProfile => get_profile(store, arguments).await?,
        ToolName::ListProfiles => list_profiles(store, arguments).await?,
        ToolName::GetProfileProjects => get_profile_projects(store, arguments).await?,
        ToolName::GetProjectProfile => get_project_profile(store, arguments).await?,
    };

    let text = serde_json::to_string_pretty(&output).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise tool call result");
        JsonRpcErrorData::internal_error("Internal error: failed to serialise result")
    })?;

    serde_json::to_value(ToolCallResult::text(text))
        .map_err(|_| JsonRpcErrorData::internal_error("Internal error: failed to serialise result"))
}

async fn list_projects(store: &dyn ShowcaseStore, args: &Value) -> Result<Value, JsonRpcErrorData> {
    let query = ProjectQuery {
        tag: optional_string(args, "tag"),
        looking_for_contributors: optional_bool(args, "looking_for_contributors")?,
        search: None,
        page: Page::new(
            limit_arg(args, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT),
            offset_arg(args),
        ),
    };

    let rows = store
        .list_projects(&query)
        .await
        .map_err(store_failure("list_projects", "Failed to fetch projects"))?;

    let projects = rows
        .iter()
        .map(|row| {
            let mut project = row_object(&row.project)?;
            project.insert(
                "author".to_string(),
                row.author.as_ref().map_or(Value::Null, author_summary),
            );
            Ok(Value::Object(project))
        })
        .collect::<Result<Vec<_>, JsonRpcErrorData>>()?;

    Ok(json!({
        "count": projects.len(),
        "projects": projects,
    }))
}

async fn get_project(store: &dyn ShowcaseStore, args: &Value) -> Result<Value, JsonRpcErrorData> {
    let id = required_key(args, "id")?;

    let row = store
        .get_project(&id)
        .await
        .map_err(store_failure("get_project", "Failed to fetch project"))?
        .ok_or_else(|| JsonRpcErrorData::invalid_params("Project not found"))?;

    let (likes, comments) = tokio::try_join!(store.count_likes(&id), store.count_comments(&id))
        .map_err(store_failure("get_project", "Failed to fetch project engagement"))?;

    let mut project = row_object(&row.project)?;
    project.insert(
        "author".to_string(),
        row.author.as_ref().map_or(Value::Null, author_detail),
    );
    project.insert("likes".to_string(), json!(likes));
    project.insert("comments".to_string(), json!(comments));

    Ok(Value::Object(project))
}

async fn search_projects(
    store: &dyn ShowcaseStore,
    args: &Value,
) -> Result<Value, JsonRpcErrorData> {
    let term = required_key(args, "query")?;

    let query = ProjectQuery {
        search: Some(term),
        ..ProjectQuery::page(Page::first(limit_arg(
            args,
            SEARCH_DEFAULT_LIMIT,
            SEARCH_MAX_LIMIT,
        )))
    };

    let rows = store
        .list_projects(&query)
        .await
        .map_err(store_failure("search_projects", "Search failed"))?;

    let results: Vec<Value> = rows.iter().map(search_hit).collect();

    Ok(json!({
        "count": results.len(),
        "results": results,
    }))
}

async fn get_project_stats(store: &dyn ShowcaseStore) -> Result<Value, JsonRpcErrorData> {
    let (total, looking, tags) = tokio::try_join!(
        store.count_projects(None),
        store.count_projects(Some(true)),
        store.project_tags(),
    )
    .map_err(store_failure("get_project_stats", "Failed to compute statistics"))?;

    Ok(json!({
        "totalProjects": total,
        "projectsLookingForContributors": looking,
        "topTags": top_tags(&tags, TOP_TAG_COUNT),
    }))
}

async fn get_profile(store: &dyn ShowcaseStore, args: &Value) -> Result<Value, JsonRpcErrorData> {
    let id = required_key(args, "id")?;

    let (profile, projects) =
        tokio::try_join!(store.get_profile(&id), store.projects_by_owner(&id))
            .map_err(store_failure("get_profile", "Failed to fetch profile"))?;

    let profile = profile.ok_or_else(|| JsonRpcErrorData::invalid_params("Profile not found"))?;

    let mut document = row_object(&profile)?;
    document.insert("project_count".to_string(), json!(projects.len()));
    document.insert("projects".to_string(), json!(projects));

    Ok(Value::Object(document))
}

async fn list_profiles(store: &dyn ShowcaseStore, args: &Value) -> Result<Value, JsonRpcErrorData> {
    let page = Page::new(
        limit_arg(args, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT),
        offset_arg(args),
    );

    let profiles = store
        .list_profiles(page)
        .await
        .map_err(store_failure("list_profiles", "Failed to fetch profiles"))?;

    let profiles: Vec<Value> = profiles
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "username": p.username,
                "avatar_url": p.avatar_url,
                "bio": p.bio,
                "created_at": p.created_at,
            })
        })
        .collect();

    Ok(json!({
        "count": profiles.len(),
        "profiles": profiles,
    }))
}

async fn get_profile_projects(
    store: &dyn ShowcaseStore,
    args: &Value,
) -> Result<Value, JsonRpcErrorData> {
    let profile_id = required_key(args, "profile_id")?;

    let projects = store
        .projects_by_owner(&profile_id)
        .await
        .map_err(store_failure("get_profile_projects", "Failed to fetch projects"))?;

    let project_ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();

    Ok(json!({
        "profile_id": profile_id,
        "project_ids": project_ids,
    }))
}

async fn get_project_profile(
    store: &dyn ShowcaseStore,
    args: &Value,
) -> Result<Value, JsonRpcErrorData> {
    let project_id = required_key(args, "project_id")?;

    let profile_id = store
        .project_owner(&project_id)
        .await
        .map_err(store_failure("get_project_profile", "Failed to fetch project"))?
        .ok_or_else(|| JsonRpcErrorData::invalid_params("Project not found"))?;

    Ok(json!({
        "project_id": project_id,
        "profile_id": profile_id,
    }))
}

/// Ranks tags by frequency across all projects.
///
/// Ties keep the order in which tags were first seen.
#[must_use]
pub fn top_tags(tag_lists: &[Vec<String>], n: usize) -> Vec<TagCount> {
    let mut counts: IndexMap<&str, u64> = IndexMap::new();
    for tag in tag_lists.iter().flatten() {
        *counts.entry(tag.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(n)
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}

fn author_summary(author: &Profile) -> Value {
    json!({
        "id": author.id,
        "username": author.username,
        "avatar_url": author.avatar_url,
    })
}

fn author_detail(author: &Profile) -> Value {
    json!({
        "id": author.id,
        "username": author.username,
        "avatar_url": author.avatar_url,
        "bio": author.bio,
        "github_url": author.github_url,
        "twitter_url": author.twitter_url,
        "linkedin_url": author.linkedin_url,
        "website_url": author.website_url,
    })
}

fn search_hit(row: &ProjectWithAuthor) -> Value {
    let project = &row.project;
    json!({
        "id": project.id,
        "title": project.title,
        "description": project.description,
        "tags": project.tags,
        "looking_for_contributors": project.looking_for_contributors,
        "created_at": project.created_at,
        "author": row.author.as_ref().map(|a| json!({ "username": a.username })),
    })
}

/// Serialises a store row into a JSON object.
pub(crate) fn row_object<T: Serialize>(row: &T) -> Result<Map<String, Value>, JsonRpcErrorData> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(JsonRpcErrorData::internal_error(
            "Internal error: failed to serialise result",
        )),
    }
}

/// Reads a required id-like argument. Strings and integers are accepted;
/// an empty string counts as missing.
pub(crate) fn required_key(args: &Value, name: &str) -> Result<String, JsonRpcErrorData> {
    match args.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(JsonRpcErrorData::invalid_params(format!(
            "Missing required parameter: {name}"
        ))),
    }
}

fn optional_string(args: &Value, name: &str) -> Option<String> {
    match args.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn optional_bool(args: &Value, name: &str) -> Result<Option<bool>, JsonRpcErrorData> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(JsonRpcErrorData::invalid_params(format!(
            "Parameter {name} must be a boolean"
        ))),
    }
}

/// Reads a non-negative integer given as a JSON number or numeric string.
fn integer_arg(args: &Value, name: &str) -> Option<usize> {
    let n = match args.get(name)? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    Some(usize::try_from(n).unwrap_or(usize::MAX))
}

/// `limit` argument: positive values are capped at `max`, anything else
/// falls back to `default`.
fn limit_arg(args: &Value, default: usize, max: usize) -> usize {
    match integer_arg(args, "limit") {
        Some(0) | None => default,
        Some(n) => n.min(max),
    }
}

fn offset_arg(args: &Value) -> usize {
    integer_arg(args, "offset").unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(lists: &[&[&str]]) -> Vec<Vec<String>> {
        lists
            .iter()
            .map(|l| l.iter().map(|t| (*t).to_string()).collect())
            .collect()
    }

    #[test]
    fn tool_definitions_valid() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), ToolName::ALL.len());

        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(!tool.description.is_empty());
            assert!(tool.input_schema.is_object());
            assert!(ToolName::from_name(&tool.name).is_some());
        }
    }

    #[test]
    fn tool_definitions_serialise_camel_case() {
        let value = serde_json::to_value(&tool_definitions()[1]).unwrap();
        assert_eq!(value["name"], "get_project");
        assert_eq!(value["inputSchema"]["required"], json!(["id"]));
    }

    #[test]
    fn tool_names_are_case_sensitive() {
        assert_eq!(ToolName::from_name("list_projects"), Some(ToolName::ListProjects));
        assert_eq!(ToolName::from_name("LIST_PROJECTS"), None);
        assert_eq!(ToolName::from_name("delete_project"), None);
    }

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Hello, world!"),
        }

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
    }

    #[test]
    fn top_tags_ranks_by_frequency() {
        let lists = tags(&[&["ai", "rust"], &["rust"], &["web", "rust", "ai"]]);
        let top = top_tags(&lists, 10);
        assert_eq!(
            top,
            vec![
                TagCount { tag: "rust".into(), count: 3 },
                TagCount { tag: "ai".into(), count: 2 },
                TagCount { tag: "web".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn top_tags_breaks_ties_by_first_seen() {
        let lists = tags(&[&["b", "a"], &["c"], &["a", "c", "b"]]);
        let names: Vec<String> = top_tags(&lists, 10).into_iter().map(|t| t.tag).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn top_tags_truncates() {
        let lists: Vec<Vec<String>> = (0..15).map(|i| vec![format!("tag{i}")]).collect();
        let top = top_tags(&lists, TOP_TAG_COUNT);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].tag, "tag0");
        assert_eq!(top[9].tag, "tag9");
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(limit_arg(&json!({}), 50, 100), 50);
        assert_eq!(limit_arg(&json!({"limit": 500}), 50, 100), 100);
        assert_eq!(limit_arg(&json!({"limit": 7}), 50, 100), 7);
        assert_eq!(limit_arg(&json!({"limit": "12"}), 50, 100), 12);
        assert_eq!(limit_arg(&json!({"limit": 0}), 50, 100), 50);
        assert_eq!(limit_arg(&json!({"limit": -3}), 50, 100), 50);
        assert_eq!(limit_arg(&json!({"limit": "lots"}), 20, 50), 20);
    }

    #[test]
    fn offset_defaults_to_zero() {
        assert_eq!(offset_arg(&json!({})), 0);
        assert_eq!(offset_arg(&json!({"offset": 30})), 30);
        assert_eq!(offset_arg(&json!({"offset": -1})), 0);
    }

    #[test]
    fn required_key_accepts_strings_and_integers() {
        assert_eq!(required_key(&json!({"id": "abc"}), "id").unwrap(), "abc");
        assert_eq!(required_key(&json!({"id": 42}), "id").unwrap(), "42");

        let err = required_key(&json!({"id": ""}), "id").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams.code());
        assert_eq!(err.message, "Missing required parameter: id");

        assert!(required_key(&json!({}), "id").is_err());
        assert!(required_key(&json!({"id": true}), "id").is_err());
    }

    #[test]
    fn optional_bool_rejects_other_types() {
        assert_eq!(optional_bool(&json!({}), "flag").unwrap(), None);
        assert_eq!(optional_bool(&json!({"flag": false}), "flag").unwrap(), Some(false));
        assert!(optional_bool(&json!({"flag": "yes"}), "flag").is_err());
    }
}
