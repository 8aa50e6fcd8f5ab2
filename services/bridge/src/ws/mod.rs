//! WebSocket Relay Core
//!
//! This module contains the bridge between the browser client and a live
//! agent session. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON frame format exchanged with the client.
//! - `relay`: The two one-directional forwarding loops (client → agent,
//!   agent → client).
//! - `session`: The connection supervisor that owns the session lifecycle.

pub mod protocol;
pub mod relay;
pub mod session;

pub use session::ws_handler;
