//! An out-of-the-box day-trip planner that wires the planning engine to
//! real providers.
//!
//! The crate includes a CLI tool for using in the terminal. It can also be
//! used as a library: [`Settings`] reads the environment and builds the
//! planner and router, [`MapOverlay`] turns a plan into what a map renderer
//! needs.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod map;
mod report;
mod settings;

pub use map::{MapOverlay, Marker, RouteLine};
pub use report::{format_duration, history_turn};
pub use settings::{ConfigError, Settings};

/// Re-exports of [`daytrip_core`] crate.
pub mod core {
    pub use daytrip_core::*;
}

/// Re-exports of [`daytrip_services`] crate.
pub mod services {
    pub use daytrip_services::*;
}
