//! HTTP feed source for a Twitter-v2-style JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{FeedItem, FeedSource, SourceError};
use crate::config::FeedConfig;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts requested per search page (the API maximum).
const PAGE_SIZE: u32 = 100;

/// Search pages followed in one call; older posts beyond them are skipped.
const MAX_PAGES: usize = 10;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Gateway-type failures are expected to clear up on their own.
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn request_error(e: &reqwest::Error) -> SourceError {
    if e.is_timeout() || e.is_connect() {
        SourceError::Unavailable
    } else {
        SourceError::Other(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Post>,
    #[serde(default)]
    meta: SearchMeta,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

/// Decoded answer to a GET.
enum Reply<T> {
    Body(T),
    NotFound,
    /// HTTP 400, with the response body.
    BadRequest(String),
}

/// Outcome of a full, possibly paginated, search.
enum Search {
    Items(Vec<FeedItem>),
    /// The request was rejected with HTTP 400, with the response body.
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    text: String,
}

impl TryFrom<Post> for FeedItem {
    type Error = SourceError;

    fn try_from(post: Post) -> Result<Self, Self::Error> {
        let id = post
            .id
            .parse()
            .map_err(|_| SourceError::Other(format!("invalid post id: {}", post.id)))?;
        Ok(Self::new(id, post.text))
    }
}

/// Feed source backed by the HTTP API.
///
/// Lookup uses `GET {base}/users/by/username/{account}`; search uses
/// `GET {base}/tweets/search/recent?query=from:{account}[&since_id=N]`.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    profile_base_url: String,
    token: Option<String>,
}

impl HttpFeedSource {
    /// Create a source from configuration, reading the bearer token from the
    /// configured environment variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &FeedConfig) -> Result<Self, reqwest::Error> {
        let token = std::env::var(&config.token_env).ok();
        if token.is_none() {
            tracing::warn!(
                env = %config.token_env,
                "No feed API token set, sending anonymous requests"
            );
        }
        Ok(Self::new(&config.base_url, &config.profile_base_url)?.with_token(token))
    }

    /// Create a source for the given API and profile base URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, profile_base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile_base_url: profile_base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        Url::parse(&format!("{}/{path}", self.base_url))
            .map_err(|e| SourceError::Other(format!("invalid feed URL: {e}")))
    }

    /// Sends a GET and decodes the JSON body of a successful response.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Reply<T>, SourceError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| request_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map(Reply::Body)
                .map_err(|e| SourceError::Other(format!("invalid feed response: {e}")));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(Reply::NotFound);
        }
        if is_transient(status) {
            return Err(SourceError::Unavailable);
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            return Ok(Reply::BadRequest(text));
        }
        Err(SourceError::Other(format!("HTTP {status}: {text}")))
    }

    fn search_url(
        &self,
        account: &str,
        since: Option<u64>,
        next_token: Option<&str>,
    ) -> Result<Url, SourceError> {
        let mut url = self.endpoint("tweets/search/recent")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("query", &format!("from:{account}"));
            query.append_pair("max_results", &PAGE_SIZE.to_string());
            if let Some(since) = since {
                query.append_pair("since_id", &since.to_string());
            }
            if let Some(token) = next_token {
                query.append_pair("next_token", token);
            }
        }
        Ok(url)
    }

    /// Collects every page of a search, newest page first.
    async fn search_pages(&self, account: &str, since: Option<u64>) -> Result<Search, SourceError> {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let url = self.search_url(account, since, next_token.as_deref())?;
            let page = match self.get_json::<SearchResponse>(url).await? {
                Reply::Body(page) => page,
                Reply::BadRequest(body) => return Ok(Search::Rejected(body)),
                Reply::NotFound => {
                    return Err(SourceError::Other("search endpoint not found".to_string()))
                }
            };
            for post in page.data {
                items.push(FeedItem::try_from(post)?);
            }
            next_token = page.meta.next_token;
            if next_token.is_none() {
                return Ok(Search::Items(items));
            }
        }

        tracing::warn!(
            account = %account,
            pages = MAX_PAGES,
            "Search has more pages, older posts skipped"
        );
        Ok(Search::Items(items))
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn lookup_account(&self, account: &str) -> Result<(), SourceError> {
        let mut url = self.endpoint("users/by/username")?;
        url.path_segments_mut()
            .map_err(|()| SourceError::Other("feed URL cannot be a base".to_string()))?
            .push(account);

        match self.get_json::<UserResponse>(url).await? {
            Reply::Body(UserResponse {
                data: Some(UserData { id }),
            }) => {
                tracing::debug!(account = %account, user_id = %id, "Feed account found");
                Ok(())
            }
            Reply::Body(_) | Reply::NotFound => Err(SourceError::NotFound),
            Reply::BadRequest(body) => Err(SourceError::Other(format!("HTTP 400: {body}"))),
        }
    }

    async fn search(
        &self,
        account: &str,
        since: Option<u64>,
    ) -> Result<Vec<FeedItem>, SourceError> {
        // 0 is not a valid post id.
        let since = since.filter(|id| *id > 0);

        match self.search_pages(account, since).await? {
            Search::Items(items) => return Ok(items),
            Search::Rejected(body) if since.is_some() => {
                // Ids older than the search window are rejected; callers
                // filter on their own watermark, so drop the bound.
                tracing::warn!(
                    account = %account,
                    since_id = ?since,
                    error = %body,
                    "Search lower bound rejected, retrying without it"
                );
            }
            Search::Rejected(body) => return Err(SourceError::Other(format!("HTTP 400: {body}"))),
        }

        match self.search_pages(account, None).await? {
            Search::Items(items) => Ok(items),
            Search::Rejected(body) => Err(SourceError::Other(format!("HTTP 400: {body}"))),
        }
    }

    fn profile_url(&self, account: &str) -> String {
        format!("{}/{account}", self.profile_base_url)
    }
}
