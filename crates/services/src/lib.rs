//! Adapters for the external services the planner relies on.
//!
//! - [`places`]: place search around a center point.
//! - [`prices`]: web search used to gather cost hints.
//! - [`routing`]: walking paths with a primary and a fallback provider.
//!
//! Every adapter is a trait object seam, so the planner can be exercised
//! with in-memory fakes. Failures are always returned as values, adapters
//! never panic on provider misbehavior.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
pub mod geo;
pub mod places;
pub mod prices;
pub mod routing;

pub use error::{Error, ErrorKind};
pub use geo::LatLng;
pub use places::{PlaceQuery, PlaceRecord, PlaceSearch};
pub use prices::{PriceResult, PriceSearch};
pub use routing::{RouteProvider, Router, TravelMode, TravelTimes};

use std::time::Duration;

use reqwest::Client;

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            warn!("failed to build http client, using defaults: {err}");
            Client::new()
        })
}
