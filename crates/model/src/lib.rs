//! The protocol between the itinerary planner and a planning agent.
//!
//! This crate establishes a unified protocol for the planner to talk to
//! various tool-calling LLMs, so that the planner can switch between them
//! without touching the orchestration code.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
