use std::fmt;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use thiserror::Error;

const CLIENT_AGENT: &str = "thought-spiral";
/// Rows requested per page. Servers may cap pages lower (`max-rows`); the
/// exact count in `Content-Range` tells whether more rows are left.
pub const PAGE_SIZE: usize = 500;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed: status {status}, body {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for the hosted backend's table API (PostgREST dialect).
///
/// Requests carry the project API key; when a user session is attached its
/// access token is sent as the bearer so row-level security applies to that
/// user instead of the anonymous role.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key,
            access_token: None,
        }
    }

    pub fn with_access_token(&self, access_token: Option<&str>) -> Self {
        Self {
            access_token: access_token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            ..self.clone()
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    pub async fn select<T>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, RestError>
    where
        T: DeserializeOwned,
    {
        let response = self.request(Method::GET, table).query(query).send().await?;
        read_json(response).await
    }

    /// Every matching row, fetched page by page. Stops once the exact count
    /// reported by the server is reached; a page that comes back empty before
    /// that is an error rather than a silently truncated result.
    pub async fn select_all<T>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RestError>
    where
        T: DeserializeOwned,
    {
        let mut rows: Vec<T> = Vec::new();
        loop {
            let mut paged = query.to_vec();
            paged.push(("limit", PAGE_SIZE.to_string()));
            paged.push(("offset", rows.len().to_string()));
            let response = self
                .request(Method::GET, table)
                .header("Prefer", "count=exact")
                .query(&paged)
                .send()
                .await?;
            let total = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(content_range_total);
            let page: Vec<T> = read_json(response).await?;
            let fetched = page.len();
            rows.extend(page);
            if !more_pages(table, rows.len(), fetched, total)? {
                return Ok(rows);
            }
        }
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert_returning<T, B>(&self, table: &str, body: &B) -> Result<T, RestError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = read_json(response).await?;
        if rows.is_empty() {
            return Err(RestError::InvalidResponse(format!(
                "insert into {table} returned no rows"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn insert_ignoring_duplicates<B>(&self, table: &str, body: &B) -> Result<(), RestError>
    where
        B: Serialize,
    {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), RestError> {
        let response = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=minimal")
            .query(filters)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer()))
            .header(USER_AGENT, CLIENT_AGENT)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("session", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

/// PostgREST equality filter.
pub fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Total from a `Content-Range` header such as `0-499/1200`; `None` when
/// the server did not count (`0-499/*`).
fn content_range_total(value: &str) -> Option<usize> {
    let (_, total) = value.trim().split_once('/')?;
    total.trim().parse().ok()
}

fn more_pages(
    table: &str,
    collected: usize,
    fetched: usize,
    total: Option<usize>,
) -> Result<bool, RestError> {
    match total {
        Some(total) if collected >= total => Ok(false),
        Some(total) if fetched == 0 => Err(RestError::InvalidResponse(format!(
            "{table}: read {collected} of {total} rows"
        ))),
        Some(_) => Ok(true),
        None => Ok(fetched >= PAGE_SIZE),
    }
}

async fn ensure_success(response: Response) -> Result<String, RestError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(RestError::Status { status, body });
    }
    Ok(body)
}

async fn read_json<T>(response: Response) -> Result<T, RestError>
where
    T: DeserializeOwned,
{
    let body = ensure_success(response).await?;
    from_str(&body).map_err(|err| RestError::InvalidResponse(format!("{err}: {body}")))
}

#[cfg(test)]
mod tests {
    use super::{content_range_total, eq, more_pages, RestClient, RestError, PAGE_SIZE};

    fn client() -> RestClient {
        RestClient::new(
            reqwest::Client::new(),
            " https://cafe.example.com/rest/v1/ ",
            "anon-key".to_string(),
        )
    }

    #[test]
    fn table_urls_drop_trailing_slashes() {
        assert_eq!(
            client().table_url("discussions"),
            "https://cafe.example.com/rest/v1/discussions"
        );
    }

    #[test]
    fn bearer_prefers_the_session_token() {
        let anon = client();
        assert_eq!(anon.bearer(), "anon-key");
        let user = anon.with_access_token(Some("user-token"));
        assert_eq!(user.bearer(), "user-token");
        assert_eq!(anon.with_access_token(Some("  ")).bearer(), "anon-key");
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", client().with_access_token(Some("secret-token")));
        assert!(!rendered.contains("anon-key"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn eq_filter_uses_postgrest_syntax() {
        assert_eq!(eq("p1"), "eq.p1");
    }

    #[test]
    fn content_range_totals_are_parsed() {
        assert_eq!(content_range_total("0-499/1200"), Some(1200));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-499/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn paging_follows_a_server_cap_below_the_page_size() {
        // A server that never returns more than 300 rows per request.
        let total = 1200;
        let mut collected = 0;
        let mut requests = 0;
        loop {
            let fetched = PAGE_SIZE.min(300).min(total - collected);
            collected += fetched;
            requests += 1;
            if !more_pages("discussions", collected, fetched, Some(total)).unwrap() {
                break;
            }
        }
        assert_eq!(collected, total);
        assert_eq!(requests, 4);
    }

    #[test]
    fn short_reads_are_errors() {
        let err = more_pages("discussions", 1000, 0, Some(1200)).unwrap_err();
        assert!(matches!(err, RestError::InvalidResponse(_)));
    }

    #[test]
    fn uncounted_pages_stop_on_a_short_page() {
        assert!(more_pages("discussions", PAGE_SIZE, PAGE_SIZE, None).unwrap());
        assert!(!more_pages("discussions", PAGE_SIZE + 3, 3, None).unwrap());
        assert!(!more_pages("discussions", 0, 0, Some(0)).unwrap());
    }
}
