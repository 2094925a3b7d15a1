//! Place search around a center point, backed by Google Places (New).

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, read_body};
use crate::geo::LatLng;

const DEFAULT_BASE_URL: &str = "https://places.googleapis.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PHOTOS: usize = 3;
const PHOTO_MAX_WIDTH_PX: u32 = 400;
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.location,places.types,places.websiteUri,places.nationalPhoneNumber,\
places.photos";

/// A place returned by a search.
///
/// The serialized form is what the planning agent sees in tool results, so
/// the field names follow what the agent is told to reference (`place_id`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Opaque provider identifier.
    #[serde(rename = "place_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Best-effort distance from the search center, in meters.
    pub distance_m: Option<f64>,
    /// Provider category tags.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Formatted postal address.
    #[serde(default)]
    pub address: String,
    /// Website, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Phone number, if known.
    #[serde(rename = "tel", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Up to three photo resource names. They carry no credentials; turn
    /// one into a fetchable URL with [`GooglePlacesConfig::photo_url`].
    #[serde(default)]
    pub photo_refs: Vec<String>,
    /// Latitude, absent when the provider couldn't resolve the location.
    pub latitude: Option<f64>,
    /// Longitude, absent when the provider couldn't resolve the location.
    pub longitude: Option<f64>,
}

impl PlaceRecord {
    /// Returns the coordinates if both components are known.
    #[inline]
    pub fn location(&self) -> Option<LatLng> {
        Some(LatLng::new(self.latitude?, self.longitude?))
    }
}

/// Parameters of one place search.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceQuery {
    /// Free-text query, e.g. `"museum in Darmstadt"`.
    pub query: String,
    /// Center of the search area.
    pub center: LatLng,
    /// Search radius in meters.
    pub radius_m: u32,
    /// Maximum number of results.
    pub limit: u32,
}

/// A provider that finds places near a point.
///
/// `Ok` with an empty list means nothing was found nearby, an `Err` means
/// the provider could not be asked.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Runs one search.
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<PlaceRecord>, Error>;
}

/// Configuration for [`GooglePlaces`].
#[derive(Clone)]
pub struct GooglePlacesConfig {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GooglePlacesConfig {
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

    /// Builds the media URL for a photo reference from a [`PlaceRecord`].
    ///
    /// The URL embeds the API key, so it must only be handed to whatever
    /// fetches the image and never stored alongside the record.
    pub fn photo_url(&self, photo_ref: &str) -> String {
        format!(
            "{}/{photo_ref}/media?key={}&maxWidthPx={PHOTO_MAX_WIDTH_PX}",
            self.base_url, self.api_key
        )
    }
}

impl Debug for GooglePlacesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GooglePlacesConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Place search through the Google Places `searchText` endpoint.
#[derive(Clone, Debug)]
pub struct GooglePlaces {
    client: Client,
    config: Arc<GooglePlacesConfig>,
}

impl GooglePlaces {
    /// Creates the adapter.
    pub fn new(config: GooglePlacesConfig) -> Self {
        let client = crate::http_client(config.timeout);
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl PlaceSearch for GooglePlaces {
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<PlaceRecord>, Error> {
        if self.config.api_key.is_empty() {
            return Err(Error::missing_credentials("GOOGLE_MAPS_API_KEY"));
        }
        debug!(
            "searching places: query={:?} limit={} radius={}",
            query.query, query.limit, query.radius_m
        );

        let resp = self
            .client
            .post(format!("{}/places:searchText", self.config.base_url))
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&proto::create_request(query))
            .send()
            .await?;
        let body = read_body(resp).await.inspect_err(|err| {
            warn!("place search for {:?} failed: {err}", query.query);
        })?;

        let records = proto::parse_response(&body, query.center)?;
        debug!("found {} places for {:?}", records.len(), query.query);
        for record in &records {
            trace!("  {} ({})", record.name, record.id);
        }
        Ok(records)
    }
}

mod proto {
    use serde::{Deserialize, Serialize};

    use super::{
        LatLng, MAX_PHOTOS, PlaceQuery, PlaceRecord,
    };
    use crate::Error;

    #[derive(Clone, Debug, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchTextRequest {
        pub text_query: String,
        pub location_bias: LocationBias,
        pub max_result_count: u32,
    }

    #[derive(Clone, Debug, PartialEq, Serialize)]
    pub struct LocationBias {
        pub circle: Circle,
    }

    #[derive(Clone, Debug, PartialEq, Serialize)]
    pub struct Circle {
        pub center: Coordinates,
        pub radius: f64,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Coordinates {
        pub latitude: Option<f64>,
        pub longitude: Option<f64>,
    }

    #[derive(Clone, Debug, Default, Deserialize)]
    pub struct SearchTextResponse {
        #[serde(default)]
        pub places: Vec<Place>,
    }

    #[derive(Clone, Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Place {
        #[serde(default)]
        pub id: String,
        pub display_name: Option<LocalizedText>,
        #[serde(default)]
        pub formatted_address: String,
        pub location: Option<Coordinates>,
        #[serde(default)]
        pub types: Vec<String>,
        pub website_uri: Option<String>,
        pub national_phone_number: Option<String>,
        #[serde(default)]
        pub photos: Vec<Photo>,
    }

    #[derive(Clone, Debug, Default, Deserialize)]
    pub struct LocalizedText {
        #[serde(default)]
        pub text: String,
    }

    #[derive(Clone, Debug, Default, Deserialize)]
    pub struct Photo {
        pub name: Option<String>,
    }

    pub fn create_request(query: &PlaceQuery) -> SearchTextRequest {
        SearchTextRequest {
            text_query: query.query.clone(),
            location_bias: LocationBias {
                circle: Circle {
                    center: Coordinates {
                        latitude: Some(query.center.lat),
                        longitude: Some(query.center.lon),
                    },
                    radius: f64::from(query.radius_m),
                },
            },
            max_result_count: query.limit,
        }
    }

    pub fn parse_response(body: &str, center: LatLng) -> Result<Vec<PlaceRecord>, Error> {
        let resp: SearchTextResponse = serde_json::from_str(body)?;
        Ok(resp
            .places
            .into_iter()
            .map(|place| convert_place(place, center))
            .collect())
    }

    fn convert_place(place: Place, center: LatLng) -> PlaceRecord {
        let photo_refs = place
            .photos
            .into_iter()
            .filter_map(|photo| photo.name)
            .take(MAX_PHOTOS)
            .collect();

        let latitude = place.location.and_then(|l| l.latitude);
        let longitude = place.location.and_then(|l| l.longitude);
        let mut record = PlaceRecord {
            id: place.id,
            name: place.display_name.map(|n| n.text).unwrap_or_default(),
            distance_m: None,
            categories: place.types,
            address: place.formatted_address,
            website: place.website_uri.filter(|s| !s.is_empty()),
            phone: place.national_phone_number.filter(|s| !s.is_empty()),
            photo_refs,
            latitude,
            longitude,
        };
        record.distance_m = record
            .location()
            .map(|location| center.haversine_m(&location));
        record
    }
}
