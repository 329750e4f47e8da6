// EventReport - platform/mod.rs
//
// Platform abstraction layer: the native event-log source and
// platform directories / config.toml.
// Must NOT depend on: app.

pub mod config;
pub mod eventlog;
