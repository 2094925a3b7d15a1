use std::sync::Arc;

use daytrip_services::{LatLng, PlaceQuery, PlaceSearch};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tool::{Error as ToolError, Tool, ToolOutput, ToolResult};

/// Largest radius a place provider accepts for a circular search area.
const MAX_RADIUS_M: u32 = 50_000;

#[derive(Deserialize, JsonSchema)]
pub struct SearchPlacesParameters {
    #[schemars(description = "Search term, e.g. 'museum', 'cafe', 'park'.")]
    query: String,
    #[schemars(
        description = "Search center as 'lat,lon', e.g. '49.75,8.65'. Defaults to the traveler's location."
    )]
    ll: Option<String>,
    #[schemars(description = "Search radius in meters.")]
    radius: Option<u32>,
    #[schemars(description = "Maximum number of results.")]
    limit: Option<u32>,
}

/// Parameters applied when the agent leaves them out.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchDefaults {
    /// Center used when the agent passes no `ll`.
    pub center: LatLng,
    /// Radius used when the agent passes no `radius`.
    pub radius_m: u32,
    /// Result count used when the agent passes no `limit`.
    pub limit: u32,
    /// Upper bound of any requested result count.
    pub max_limit: u32,
    /// City appended to queries that don't mention it.
    pub city: Option<String>,
}

/// A tool for finding places near the traveler.
pub struct SearchPlacesTool {
    places: Arc<dyn PlaceSearch>,
    defaults: SearchDefaults,
    parameter_schema: Value,
}

impl SearchPlacesTool {
    /// Creates a new search tool backed by `places`.
    #[inline]
    pub fn new(places: Arc<dyn PlaceSearch>, defaults: SearchDefaults) -> Self {
        SearchPlacesTool {
            places,
            defaults,
            parameter_schema: schema_for!(SearchPlacesParameters).to_value(),
        }
    }

    fn make_query(
        &self,
        input: SearchPlacesParameters,
    ) -> Result<PlaceQuery, ToolError> {
        let query = input.query.trim();
        if query.is_empty() {
            return Err(
                ToolError::invalid_input().with_reason("`query` must not be empty")
            );
        }

        let center = match input.ll.as_deref().map(str::trim) {
            Some(ll) if !ll.is_empty() => ll.parse::<LatLng>().map_err(|err| {
                ToolError::invalid_input().with_reason(format!("`ll`: {err}"))
            })?,
            _ => self.defaults.center,
        };

        let query = match self.defaults.city.as_deref() {
            Some(city)
                if !query.to_lowercase().contains(&city.to_lowercase()) =>
            {
                format!("{query} in {city}")
            }
            _ => query.to_owned(),
        };

        Ok(PlaceQuery {
            query,
            center,
            radius_m: input
                .radius
                .unwrap_or(self.defaults.radius_m)
                .clamp(1, MAX_RADIUS_M),
            limit: input
                .limit
                .unwrap_or(self.defaults.limit)
                .clamp(1, self.defaults.max_limit),
        })
    }
}

impl Tool for SearchPlacesTool {
    type Input = SearchPlacesParameters;

    fn name(&self) -> &str {
        "search_places"
    }

    fn description(&self) -> &str {
        r#"
Search for places (museums, restaurants, parks, sights) near a location.
Results carry a `place_id` which must be used verbatim when referencing a place."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: SearchPlacesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let places = Arc::clone(&self.places);
        let query = self.make_query(input);
        async move {
            let query = query?;
            debug!("searching places: {:?}", query.query);
            let records = places.search(&query).await?;
            debug!("found {} places", records.len());
            Ok(ToolOutput {
                content: json!({ "error": false, "results": &records }),
                places: records,
            })
        }
    }
}
