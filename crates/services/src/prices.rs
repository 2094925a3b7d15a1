//! Web search for cost hints, backed by Serper.
//!
//! No numeric extraction happens here. The snippets are handed to the
//! planning agent as-is and it decides on the numbers.

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, read_body};

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_NUM_RESULTS: u32 = 6;

/// Number of results kept per query.
pub const MAX_PRICE_RESULTS: usize = 3;

/// One organic web search result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceResult {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Text excerpt that may mention a price.
    #[serde(default)]
    pub snippet: String,
    /// Page URL.
    #[serde(default)]
    pub link: String,
}

/// A provider that searches the web for price information.
#[async_trait]
pub trait PriceSearch: Send + Sync {
    /// Runs one search, returning at most [`MAX_PRICE_RESULTS`] results.
    async fn search(&self, query: &str) -> Result<Vec<PriceResult>, Error>;
}

/// Configuration for [`Serper`].
#[derive(Clone)]
pub struct SerperConfig {
    api_key: String,
    base_url: String,
    num_results: u32,
    timeout: Duration,
}

impl SerperConfig {
    /// Creates a configuration with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into().trim().to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            num_results: DEFAULT_NUM_RESULTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Sets the request timeout.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Debug for SerperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerperConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("num_results", &self.num_results)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Price search through the Serper Google search API.
#[derive(Clone, Debug)]
pub struct Serper {
    client: Client,
    config: Arc<SerperConfig>,
}

impl Serper {
    /// Creates the adapter.
    pub fn new(config: SerperConfig) -> Self {
        let client = crate::http_client(config.timeout);
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl PriceSearch for Serper {
    async fn search(&self, query: &str) -> Result<Vec<PriceResult>, Error> {
        if self.config.api_key.is_empty() {
            return Err(Error::missing_credentials("SERPER_API_KEY"));
        }

        let resp = self
            .client
            .post(format!("{}/search", self.config.base_url))
            .header("X-API-KEY", &self.config.api_key)
            .json(&json!({ "q": query, "num": self.config.num_results }))
            .send()
            .await?;
        let body = read_body(resp).await.inspect_err(|err| {
            warn!("price search for {query:?} failed: {err}");
        })?;

        let results = parse_organic(&body)?;
        debug!("price search returned {} results for {query:?}", results.len());
        Ok(results)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<PriceResult>,
}

fn parse_organic(body: &str) -> Result<Vec<PriceResult>, Error> {
    let mut resp: SearchResponse = serde_json::from_str(body)?;
    resp.organic.truncate(MAX_PRICE_RESULTS);
    Ok(resp.organic)
}
