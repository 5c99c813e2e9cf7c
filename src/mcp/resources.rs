//! Resources exposed through `resources/list`, `resources/read` and
//! `resources/templates/list`.
//!
//! Every project and profile is addressable as `project://{id}` or
//! `profile://{id}`. Resource contents are always a JSON document.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::mcp::protocol::JsonRpcErrorData;
use crate::mcp::server::store_failure;
use crate::mcp::tools::row_object;
use crate::store::{Page, ProjectQuery, ShowcaseStore};

/// MIME type of every resource this server serves.
pub const RESOURCE_MIME_TYPE: &str = "application/json";

/// Maximum number of projects and of profiles in `resources/list`.
const RESOURCE_LIST_LIMIT: usize = 100;

const PROJECT_SCHEME: &str = "project://";
const PROFILE_SCHEME: &str = "profile://";

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    /// `project://{id}`
    Project(String),
    /// `profile://{id}`
    Profile(String),
}

impl ResourceUri {
    /// Parses a resource URI. The id after the scheme must be non-empty.
    #[must_use]
    pub fn parse(uri: &str) -> Option<Self> {
        if let Some(id) = uri.strip_prefix(PROJECT_SCHEME) {
            (!id.is_empty()).then(|| Self::Project(id.to_string()))
        } else if let Some(id) = uri.strip_prefix(PROFILE_SCHEME) {
            (!id.is_empty()).then(|| Self::Profile(id.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "{PROJECT_SCHEME}{id}"),
            Self::Profile(id) => write!(f, "{PROFILE_SCHEME}{id}"),
        }
    }
}

/// An entry in the `resources/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Content type.
    pub mime_type: &'static str,
}

/// An entry in the `resources/templates/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    /// RFC 6570 URI template.
    pub uri_template: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Content type.
    pub mime_type: &'static str,
}

/// One item of a `resources/read` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The URI that was read.
    pub uri: String,
    /// Content type.
    pub mime_type: &'static str,
    /// The serialised document.
    pub text: String,
}

/// Returns the two resource templates.
#[must_use]
pub const fn resource_templates() -> [ResourceTemplate; 2] {
    [
        ResourceTemplate {
            uri_template: "project://{id}",
            name: "Project Details",
            description: "Get details of a specific project by ID",
            mime_type: RESOURCE_MIME_TYPE,
        },
        ResourceTemplate {
            uri_template: "profile://{id}",
            name: "Profile Details",
            description: "Get details of a specific user profile by ID",
            mime_type: RESOURCE_MIME_TYPE,
        },
    ]
}

/// Lists the newest projects followed by the newest profiles.
///
/// # Errors
///
/// Returns `-32603` if either store query fails.
pub async fn list_resources(store: &dyn ShowcaseStore) -> Result<Value, JsonRpcErrorData> {
    let page = Page::first(RESOURCE_LIST_LIMIT);
    let query = ProjectQuery::page(page);

    let (projects, profiles) = tokio::try_join!(
        store.list_projects(&query),
        store.list_profiles(page),
    )
    .map_err(store_failure("resources/list", "Internal error fetching resources"))?;

    let project_entries = projects.into_iter().map(|row| ResourceDescriptor {
        uri: ResourceUri::Project(row.project.id).to_string(),
        description: format!("Project: {}", row.project.title),
        name: row.project.title,
        mime_type: RESOURCE_MIME_TYPE,
    });

    let profile_entries = profiles.into_iter().map(|profile| {
        let name = profile
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());
        ResourceDescriptor {
            uri: ResourceUri::Profile(profile.id).to_string(),
            description: format!("Profile: {name}"),
            name,
            mime_type: RESOURCE_MIME_TYPE,
        }
    });

    let resources: Vec<ResourceDescriptor> = project_entries.chain(profile_entries).collect();

    Ok(json!({ "resources": resources }))
}

/// Reads one resource.
///
/// # Errors
///
/// - `-32602` if the URI is malformed or names a missing project or profile
/// - `-32603` if the store fails
pub async fn read_resource(
    store: &dyn ShowcaseStore,
    uri: &str,
) -> Result<Value, JsonRpcErrorData> {
    let parsed = ResourceUri::parse(uri).ok_or_else(|| {
        JsonRpcErrorData::invalid_params(
            "Invalid resource URI format. Use project://{id} or profile://{id}",
        )
    })?;

    let document = match &parsed {
        ResourceUri::Project(id) => {
            let row = store
                .get_project(id)
                .await
                .map_err(store_failure("resources/read", "Failed to read resource"))?
                .ok_or_else(|| JsonRpcErrorData::invalid_params("Project not found"))?;

            let mut document = row_object(&row.project)?;
            document.insert("author".to_string(), json!(row.author));
            document.insert("profile_id".to_string(), json!(row.project.user_id));
            document
        }
        ResourceUri::Profile(id) => {
            let (profile, projects) =
                tokio::try_join!(store.get_profile(id), store.projects_by_owner(id))
                    .map_err(store_failure("resources/read", "Failed to read resource"))?;

            let profile =
                profile.ok_or_else(|| JsonRpcErrorData::invalid_params("Profile not found"))?;

            let project_ids: Vec<String> = projects.into_iter().map(|p| p.id).collect();
            let mut document = row_object(&profile)?;
            document.insert("project_ids".to_string(), json!(project_ids));
            document
        }
    };

    let text = serde_json::to_string_pretty(&document).map_err(|e| {
        tracing::error!(error = %e, uri, "Failed to serialise resource");
        JsonRpcErrorData::internal_error("Internal error: failed to serialise result")
    })?;

    let contents = [ResourceContents {
        uri: uri.to_string(),
        mime_type: RESOURCE_MIME_TYPE,
        text,
    }];

    Ok(json!({ "contents": contents }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_and_profile_uris() {
        assert_eq!(
            ResourceUri::parse("project://abc"),
            Some(ResourceUri::Project("abc".to_string()))
        );
        assert_eq!(
            ResourceUri::parse("profile://u-1"),
            Some(ResourceUri::Profile("u-1".to_string()))
        );
    }

    #[test]
    fn parse_rejects_bad_uris() {
        for uri in ["project://", "profile://", "https://x", "projects://1", "", "PROJECT://1"] {
            assert_eq!(ResourceUri::parse(uri), None, "{uri}");
        }
    }

    #[test]
    fn display_round_trips() {
        for uri in ["project://42", "profile://a/b"] {
            assert_eq!(ResourceUri::parse(uri).unwrap().to_string(), uri);
        }
    }

    #[test]
    fn templates_serialise_camel_case() {
        let value = serde_json::to_value(resource_templates()).unwrap();
        assert_eq!(value[0]["uriTemplate"], "project://{id}");
        assert_eq!(value[0]["name"], "Project Details");
        assert_eq!(value[1]["uriTemplate"], "profile://{id}");
        assert_eq!(value[1]["mimeType"], "application/json");
    }
}
