//! # SSLCast Orchestrator Library
//!
//! Ingests referee-protocol snapshots from the game-controller multicast
//! group, derives discrete semantic game events from state changes, and
//! publishes events and periodic state updates on the SSLCast bus.

pub mod error;
pub mod handlers;
pub mod listener;
pub mod orchestrator;
pub mod proto;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::GameTracker;
