//! The itinerary orchestration engine.
//!
//! A [`Planner`] runs one bounded, three-phase exchange with a planning
//! agent: discovery (the agent asks for place searches), enrichment (price
//! hints are gathered for every place found) and synthesis (the agent
//! answers with a structured itinerary). The answer is resolved against the
//! places actually found, so every entry handed back refers to a real
//! place record.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod config;
pub mod conversation;
mod error;
mod model_client;
mod plan;
mod planner;
pub mod tool;

pub use config::{PlannerConfig, PlannerConfigBuilder, RetryPolicy};
pub use error::{Error, ErrorKind};
pub use plan::{
    ItineraryEntry, Plan, PlanOutcome, PlanRequest, PriceSnippet, Travelers,
};
pub use planner::{Planner, PlannerBuilder};
