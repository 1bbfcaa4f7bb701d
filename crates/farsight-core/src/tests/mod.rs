//! Cross-module tests for the engine.
//!
//! - `helpers.rs`: rules doubles, recording sinks and spawn shortcuts
//! - `integration.rs`: end-to-end scenarios over a populated grid
//! - `properties.rs`: property tests over arbitrary layouts

mod helpers;

pub use helpers::*;
