// EventReport - lib.rs
//
// Library entry point. The binary in `main.rs` is a thin command-line front
// end over these modules; everything it does is reachable from here for
// integration testing and embedding.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
