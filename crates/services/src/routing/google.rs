use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{RouteProvider, TravelMode};
use crate::error::{Error, read_body};
use crate::geo::{LatLng, decode_polyline};

const DEFAULT_BASE_URL: &str = "https://routes.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`GoogleRoutes`].
#[derive(Clone)]
pub struct GoogleRoutesConfig {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GoogleRoutesConfig {
    /// Creates a configuration with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into().trim().to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
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

impl Debug for GoogleRoutesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleRoutesConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The primary route provider, Google Routes `computeRoutes`.
#[derive(Clone, Debug)]
pub struct GoogleRoutes {
    client: Client,
    config: Arc<GoogleRoutesConfig>,
}

impl GoogleRoutes {
    /// Creates the provider.
    pub fn new(config: GoogleRoutesConfig) -> Self {
        let client = crate::http_client(config.timeout);
        Self {
            client,
            config: Arc::new(config),
        }
    }

    async fn compute_routes(
        &self,
        req: &ComputeRoutesRequest,
        field_mask: &'static str,
    ) -> Result<ComputeRoutesResponse, Error> {
        if self.config.api_key.is_empty() {
            return Err(Error::missing_credentials("GOOGLE_MAPS_API_KEY"));
        }
        let resp = self
            .client
            .post(format!(
                "{}/directions/v2:computeRoutes",
                self.config.base_url
            ))
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header("X-Goog-FieldMask", field_mask)
            .json(req)
            .send()
            .await?;
        let body = read_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RouteProvider for GoogleRoutes {
    fn name(&self) -> &str {
        "google-routes"
    }

    async fn route(&self, points: &[LatLng]) -> Result<Vec<LatLng>, Error> {
        let Some(req) = create_route_request(points) else {
            return Ok(vec![]);
        };
        let resp = self
            .compute_routes(&req, "routes.polyline.encodedPolyline")
            .await?;
        let Some(encoded) = resp
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.polyline)
            .map(|polyline| polyline.encoded_polyline)
        else {
            return Ok(vec![]);
        };
        decode_polyline(&encoded)
            .ok_or_else(|| Error::decode("malformed encoded polyline"))
    }

    async fn travel_time(
        &self,
        from: LatLng,
        to: LatLng,
        mode: TravelMode,
    ) -> Result<Option<Duration>, Error> {
        let req = ComputeRoutesRequest {
            origin: Waypoint::at(from),
            destination: Waypoint::at(to),
            intermediates: vec![],
            travel_mode: travel_mode(mode),
            polyline_quality: None,
            optimize_waypoint_order: None,
        };
        let resp = self.compute_routes(&req, "routes.duration").await?;
        // Some regions answer successfully without any route.
        Ok(resp
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.duration)
            .and_then(|duration| parse_duration(&duration)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: Waypoint,
    destination: Waypoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    intermediates: Vec<Waypoint>,
    travel_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    polyline_quality: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optimize_waypoint_order: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Waypoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    via: Option<bool>,
    location: Location,
}

impl Waypoint {
    fn at(point: LatLng) -> Self {
        Self {
            via: None,
            location: Location {
                lat_lng: LatLngLiteral {
                    latitude: point.lat,
                    longitude: point.lon,
                },
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLngLiteral,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct LatLngLiteral {
    latitude: f64,
    longitude: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Clone, Debug, Deserialize)]
struct Route {
    polyline: Option<Polyline>,
    duration: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Polyline {
    encoded_polyline: String,
}

fn create_route_request(points: &[LatLng]) -> Option<ComputeRoutesRequest> {
    let (origin, rest) = points.split_first()?;
    let (destination, intermediates) = rest.split_last()?;
    Some(ComputeRoutesRequest {
        origin: Waypoint::at(*origin),
        destination: Waypoint::at(*destination),
        intermediates: intermediates
            .iter()
            .map(|point| Waypoint {
                via: Some(false),
                ..Waypoint::at(*point)
            })
            .collect(),
        travel_mode: travel_mode(TravelMode::Walk),
        polyline_quality: Some("HIGH_QUALITY"),
        optimize_waypoint_order: Some(false),
    })
}

fn travel_mode(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Walk => "WALK",
        TravelMode::Drive => "DRIVE",
        TravelMode::Transit => "TRANSIT",
    }
}

/// Parses protobuf JSON durations such as `"754s"`.
fn parse_duration(s: &str) -> Option<Duration> {
    let secs: f64 = s.strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}
