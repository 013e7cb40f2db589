//! # SSLCast Audio Playback Library
//!
//! Subscribes to the SSLCast event bus, resolves events to audio files via
//! the action table with weighted random selection, and arbitrates a single
//! playback channel with priority preemption and a small bounded backlog.

pub mod backend;
pub mod error;
pub mod scheduler;
pub mod selection;

pub use error::{Error, Result};
pub use scheduler::{PlaybackScheduler, SchedulerMsg};
