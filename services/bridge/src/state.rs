//! Shared Application State
//!
//! This module defines the `AppState` struct holding the process-wide
//! resources every connection shares: the agent runner and the loaded
//! configuration. Both are immutable after startup.

use crate::config::Config;
use std::sync::Arc;
use stewart_live::AgentRunner;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn AgentRunner>,
    pub config: Arc<Config>,
}
