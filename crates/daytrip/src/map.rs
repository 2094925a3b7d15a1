use daytrip_core::Plan;
use daytrip_services::{LatLng, Router};
use serde::{Deserialize, Serialize};

/// A numbered pin on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Position in the itinerary, starting at 1.
    pub number: usize,
    /// Identifier of the place.
    pub place_id: String,
    /// Display name of the place.
    pub name: String,
    /// Where the pin goes.
    pub position: LatLng,
}

/// The line connecting the markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum RouteLine {
    /// A walking path computed by a routing provider.
    Walking(Vec<LatLng>),
    /// Straight lines through the markers, drawn when no provider could
    /// compute a path.
    Direct(Vec<LatLng>),
    /// Nothing to connect.
    None,
}

/// What a map renderer needs to draw a plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapOverlay {
    /// Where the map is centered.
    pub center: LatLng,
    /// One marker per located stop, in visiting order. A revisited place
    /// gets a marker for each visit.
    pub markers: Vec<Marker>,
    /// The route through the markers.
    pub route: RouteLine,
}

impl MapOverlay {
    /// Routes through the plan's places and assembles the overlay.
    pub async fn build(router: &Router, center: LatLng, plan: &Plan) -> Self {
        let waypoints = plan.waypoints();
        let path = if waypoints.len() < 2 {
            vec![]
        } else {
            router.route(&waypoints).await
        };
        Self::with_path(center, plan, path)
    }

    /// Assembles the overlay from a path computed elsewhere. An empty path
    /// falls back to straight lines.
    pub fn with_path(center: LatLng, plan: &Plan, path: Vec<LatLng>) -> Self {
        let markers: Vec<_> = plan
            .stops()
            .enumerate()
            .map(|(idx, (place, position))| Marker {
                number: idx + 1,
                place_id: place.id.clone(),
                name: place.name.clone(),
                position,
            })
            .collect();

        let route = if markers.len() < 2 {
            RouteLine::None
        } else if path.is_empty() {
            debug!("no walking path, drawing straight lines");
            RouteLine::Direct(markers.iter().map(|m| m.position).collect())
        } else {
            RouteLine::Walking(path)
        };

        Self {
            center,
            markers,
            route,
        }
    }
}
