//! Stewart Bridge Library Crate
//!
//! This library contains the web-facing half of the bridge: configuration,
//! shared state, routing, and the WebSocket relay core that shuttles frames
//! between the browser client and a live agent session. The `bridge` binary
//! is a thin wrapper around this library.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
