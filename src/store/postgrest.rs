//! PostgREST store client.
//!
//! Talks to the showcase database through its PostgREST endpoint
//! (`<url>/rest/v1/<table>`) with the project's anonymous key. Row-level
//! security on the server side restricts that key to public reads; this
//! client only ever issues `GET` and `HEAD` requests.
//!
//! # Query Mapping
//!
//! | Capability | PostgREST |
//! |---|---|
//! | point lookup | `id=eq.<id>&limit=1` |
//! | equality | `<column>=eq.<value>` |
//! | array containment | `tags=cs.{"<tag>"}` |
//! | substring OR | `or=(title.ilike."*<term>*",description.ilike."*<term>*")` |
//! | newest first | `order=created_at.desc` |
//! | pagination | `limit=<n>&offset=<m>` |
//! | count only | `HEAD` + `Prefer: count=exact`, total read from `Content-Range` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    null_as_default, Page, Profile, ProjectQuery, ProjectRef, ProjectWithAuthor, ShowcaseStore,
    StoreError,
};

/// Postgres error code for a value that does not parse as the column type,
/// e.g. a non-UUID string compared against a UUID id column.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Projects joined with their owner's profile under the `author` key.
const PROJECT_WITH_AUTHOR: &str = "*,author:profiles!projects_user_id_fkey(*)";

const NEWEST_FIRST: &str = "created_at.desc";

type QueryParams = Vec<(&'static str, String)>;

#[derive(Debug, Deserialize)]
struct TagsRow {
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerRow {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
}

/// A store backed by a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    /// `<url>/rest/v1`
    base_url: String,
}

impl PostgrestStore {
    /// Creates a client for the PostgREST service at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be constructed.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let invalid_key = || StoreError::Unavailable("API key is not a valid header value".into());

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| invalid_key())?;
        key.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| invalid_key())?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: rest_base_url(url),
        })
    }

    /// Fetches rows from `table`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &'static str,
        params: &[(&'static str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .client
            .request(Method::GET, format!("{}/{table}", self.base_url))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(table, status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { table, source })
    }

    /// Fetches at most one row from `table`.
    ///
    /// An id that does not parse as the column type cannot match any row,
    /// so it is reported as not found rather than as a failure.
    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &'static str,
        mut params: QueryParams,
    ) -> Result<Option<T>, StoreError> {
        params.push(("limit", "1".to_string()));
        match self.fetch(table, &params).await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(e) if is_invalid_key(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Counts rows in `table` without transferring them.
    async fn count(
        &self,
        table: &'static str,
        params: &[(&'static str, String)],
    ) -> Result<u64, StoreError> {
        let response = self
            .client
            .request(Method::HEAD, format!("{}/{table}", self.base_url))
            .header("Prefer", "count=exact")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(table, status.as_u16(), ""));
        }

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
            .ok_or(StoreError::MissingCount { table })
    }

    async fn count_for_project(
        &self,
        table: &'static str,
        project_id: &str,
    ) -> Result<u64, StoreError> {
        match self.count(table, &[("project_id", eq(project_id))]).await {
            Err(e) if is_invalid_key(&e) => Ok(0),
            other => other,
        }
    }
}

#[async_trait]
impl ShowcaseStore for PostgrestStore {
    async fn list_projects(
        &self,
        query: &ProjectQuery,
    ) -> Result<Vec<ProjectWithAuthor>, StoreError> {
        self.fetch("projects", &project_query_params(query)).await
    }

    async fn get_project(&self, id: &str) -> Result<Option<ProjectWithAuthor>, StoreError> {
        self.fetch_one(
            "projects",
            vec![("select", PROJECT_WITH_AUTHOR.to_string()), ("id", eq(id))],
        )
        .await
    }

    async fn count_projects(
        &self,
        looking_for_contributors: Option<bool>,
    ) -> Result<u64, StoreError> {
        let mut params = QueryParams::new();
        if let Some(flag) = looking_for_contributors {
            params.push(("looking_for_contributors", eq(&flag.to_string())));
        }
        self.count("projects", &params).await
    }

    async fn project_tags(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let rows: Vec<TagsRow> = self
            .fetch("projects", &[("select", "tags".to_string())])
            .await?;
        Ok(rows.into_iter().map(|r| r.tags).collect())
    }

    async fn count_likes(&self, project_id: &str) -> Result<u64, StoreError> {
        self.count_for_project("project_likes", project_id).await
    }

    async fn count_comments(&self, project_id: &str) -> Result<u64, StoreError> {
        self.count_for_project("comments", project_id).await
    }

    async fn list_profiles(&self, page: Page) -> Result<Vec<Profile>, StoreError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", NEWEST_FIRST.to_string()),
        ];
        push_page(&mut params, page);
        self.fetch("profiles", &params).await
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.fetch_one("profiles", vec![("select", "*".to_string()), ("id", eq(id))])
            .await
    }

    async fn projects_by_owner(&self, profile_id: &str) -> Result<Vec<ProjectRef>, StoreError> {
        let params = [
            ("select", "id,title".to_string()),
            ("user_id", eq(profile_id)),
            ("order", NEWEST_FIRST.to_string()),
        ];
        match self.fetch("projects", &params).await {
            Err(e) if is_invalid_key(&e) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn project_owner(&self, project_id: &str) -> Result<Option<String>, StoreError> {
        let row: Option<OwnerRow> = self
            .fetch_one(
                "projects",
                vec![("select", "user_id".to_string()), ("id", eq(project_id))],
            )
            .await?;
        Ok(row.map(|r| r.user_id))
    }
}

/// Builds the REST base URL from the service URL.
fn rest_base_url(url: &str) -> String {
    format!("{}/rest/v1", url.trim_end_matches('/'))
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn push_page(params: &mut QueryParams, page: Page) {
    params.push(("limit", page.limit.to_string()));
    params.push(("offset", page.offset.to_string()));
}

/// Query parameters for a project listing.
fn project_query_params(query: &ProjectQuery) -> QueryParams {
    let mut params = vec![
        ("select", PROJECT_WITH_AUTHOR.to_string()),
        ("order", NEWEST_FIRST.to_string()),
    ];
    if let Some(tag) = &query.tag {
        params.push(("tags", format!("cs.{{{}}}", quote(tag))));
    }
    if let Some(flag) = query.looking_for_contributors {
        params.push(("looking_for_contributors", eq(&flag.to_string())));
    }
    if let Some(term) = &query.search {
        params.push(("or", search_filter(term)));
    }
    push_page(&mut params, query.page);
    params
}

/// Double-quotes a value for use inside a PostgREST filter.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Escapes LIKE metacharacters so `term` only matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `or` filter matching `term` anywhere in title or description, ignoring case.
fn search_filter(term: &str) -> String {
    let pattern = quote(&format!("*{}*", escape_like(term)));
    format!("(title.ilike.{pattern},description.ilike.{pattern})")
}

/// Extracts the total from a `Content-Range` header such as `0-24/573` or `*/0`.
fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn status_error(table: &'static str, status: u16, body: &str) -> StoreError {
    let db_code = serde_json::from_str::<PostgrestErrorBody>(body)
        .ok()
        .and_then(|b| b.code);
    tracing::debug!(table, status, body, "Store rejected query");
    StoreError::Status {
        table,
        status,
        db_code,
    }
}

fn is_invalid_key(error: &StoreError) -> bool {
    matches!(
        error,
        StoreError::Status { db_code: Some(code), .. } if code == INVALID_TEXT_REPRESENTATION
    )
}
