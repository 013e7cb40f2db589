//! # SSLCast Common Library
//!
//! Shared code for the SSLCast commentary services including:
//! - Event and state data models (GameEvent, GameStateUpdate)
//! - Event bus framing, publisher and subscriber
//! - YAML configuration types and loading
//! - Common error types

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{GameEvent, GameStateUpdate, Team, TeamState};
