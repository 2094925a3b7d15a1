use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::RouteProvider;
use crate::error::{Error, read_body};
use crate::geo::{LatLng, decode_polyline};

const DEFAULT_BASE_URL: &str = "http://router.project-osrm.org";
const DEFAULT_PROFILE: &str = "foot";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`Osrm`].
#[derive(Clone, Debug)]
pub struct OsrmConfig {
    base_url: String,
    profile: String,
    timeout: Duration,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl OsrmConfig {
    /// Sets a custom server, e.g. a self-hosted instance.
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

/// The fallback route provider, a public OSRM server.
///
/// No API key is needed. The public demo server is best-effort, which is
/// fine for a fallback.
#[derive(Clone, Debug)]
pub struct Osrm {
    client: Client,
    config: Arc<OsrmConfig>,
}

impl Osrm {
    /// Creates the provider.
    pub fn new(config: OsrmConfig) -> Self {
        let client = crate::http_client(config.timeout);
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl RouteProvider for Osrm {
    fn name(&self) -> &str {
        "osrm"
    }

    async fn route(&self, points: &[LatLng]) -> Result<Vec<LatLng>, Error> {
        let url = route_url(&self.config, points);
        trace!("osrm request: {url}");
        let resp = self.client.get(url).send().await?;
        let body = read_body(resp).await?;
        parse_route(&body)
    }
}

fn route_url(config: &OsrmConfig, points: &[LatLng]) -> String {
    // OSRM wants `lon,lat` pairs.
    let coordinates = points
        .iter()
        .map(|p| format!("{},{}", p.lon, p.lat))
        .collect::<Vec<_>>()
        .join(";");
    format!(
        "{}/route/v1/{}/{coordinates}?overview=full&geometries=polyline",
        config.base_url, config.profile
    )
}

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    geometry: String,
}

fn parse_route(body: &str) -> Result<Vec<LatLng>, Error> {
    let resp: RouteResponse = serde_json::from_str(body)?;
    if resp.code != "Ok" {
        return Err(Error::decode(format!(
            "osrm answered {}: {}",
            resp.code,
            resp.message.unwrap_or_default()
        )));
    }
    let Some(route) = resp.routes.into_iter().next() else {
        return Ok(vec![]);
    };
    decode_polyline(&route.geometry)
        .ok_or_else(|| Error::decode("malformed encoded polyline"))
}
