//! Walking routes between itinerary stops.
//!
//! [`Router`] asks the primary provider first and falls back to the
//! secondary one on any error or empty answer. An empty path means both
//! failed, and drawing straight lines is left to the renderer.

mod google;
mod osrm;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join3;

use crate::error::Error;
use crate::geo::LatLng;
pub use google::{GoogleRoutes, GoogleRoutesConfig};
pub use osrm::{Osrm, OsrmConfig};

/// A way of getting from one stop to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TravelMode {
    /// On foot.
    Walk,
    /// By car or taxi.
    Drive,
    /// By public transport.
    Transit,
}

/// A provider that computes paths through an ordered list of points.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Computes a walking path that visits `points` in the given order.
    ///
    /// The first point is the origin, the last one the destination and the
    /// rest are intermediate waypoints. Implementations must not reorder
    /// them.
    async fn route(&self, points: &[LatLng]) -> Result<Vec<LatLng>, Error>;

    /// Estimates the travel time between two points.
    ///
    /// `Ok(None)` means the provider has no answer for this mode.
    async fn travel_time(
        &self,
        _from: LatLng,
        _to: LatLng,
        _mode: TravelMode,
    ) -> Result<Option<Duration>, Error> {
        Ok(None)
    }
}

/// Travel times between two consecutive stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TravelTimes {
    /// On foot.
    pub walk: Option<Duration>,
    /// By car.
    pub drive: Option<Duration>,
    /// By public transport.
    pub transit: Option<Duration>,
}

impl TravelTimes {
    /// Returns `true` if no mode has an estimate.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.walk.is_none() && self.drive.is_none() && self.transit.is_none()
    }
}

/// The routing adapter: a fixed primary → fallback provider chain.
#[derive(Clone)]
pub struct Router {
    primary: Arc<dyn RouteProvider>,
    fallback: Arc<dyn RouteProvider>,
}

impl Router {
    /// Creates a router from a primary and a fallback provider.
    #[inline]
    pub fn new<P, F>(primary: P, fallback: F) -> Self
    where
        P: RouteProvider + 'static,
        F: RouteProvider + 'static,
    {
        Self {
            primary: Arc::new(primary),
            fallback: Arc::new(fallback),
        }
    }

    /// Computes a walking path through `points`.
    ///
    /// Returns an empty path when fewer than two points are given or when
    /// both providers fail.
    pub async fn route(&self, points: &[LatLng]) -> Vec<LatLng> {
        if points.len() < 2 {
            return vec![];
        }
        for provider in [&self.primary, &self.fallback] {
            match provider.route(points).await {
                Ok(path) if !path.is_empty() => {
                    debug!(
                        "{} returned a path with {} points",
                        provider.name(),
                        path.len()
                    );
                    return path;
                }
                Ok(_) => warn!("{} returned an empty route", provider.name()),
                Err(err) => warn!("{} failed to route: {err}", provider.name()),
            }
        }
        vec![]
    }

    /// Estimates travel times between two stops with the primary provider.
    pub async fn travel_times(&self, from: LatLng, to: LatLng) -> TravelTimes {
        let provider = &self.primary;
        let estimate = |mode| async move {
            match provider.travel_time(from, to, mode).await {
                Ok(duration) => duration,
                Err(err) => {
                    debug!("{} has no {mode:?} estimate: {err}", provider.name());
                    None
                }
            }
        };
        let (walk, drive, transit) = join3(
            estimate(TravelMode::Walk),
            estimate(TravelMode::Drive),
            estimate(TravelMode::Transit),
        )
        .await;
        TravelTimes {
            walk,
            drive,
            transit,
        }
    }
}
