// EventReport - core/mod.rs
//
// Core business logic layer.
// Must NOT depend on: platform or app.

pub mod export;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod source;
