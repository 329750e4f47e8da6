// EventReport - app/mod.rs
//
// Application layer: query orchestration over a log source.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod batch;
pub mod query;
