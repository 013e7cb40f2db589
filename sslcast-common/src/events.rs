//! Event and state data models shared by all SSLCast services
//!
//! `GameEvent` is the canonical, deduplicated, prioritized occurrence record
//! published on the `event` topic. `GameStateUpdate` is the flattened
//! projection of the latest referee snapshot, re-published periodically on
//! the `state` topic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::time::epoch_seconds;

/// Team identifier as carried in event payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Unknown,
    Yellow,
    Blue,
}

impl Team {
    /// Upper-case wire name, also used as event-type suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Unknown => "UNKNOWN",
            Team::Yellow => "YELLOW",
            Team::Blue => "BLUE",
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete semantic game event derived from referee snapshots.
///
/// Immutable once constructed. Created by the orchestrator's tracker,
/// consumed by the audio scheduler and any visualization subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Seconds since the Unix epoch; occurrence creation time where the
    /// wire protocol provides one, otherwise emission time
    pub timestamp: f64,
    /// Event identifier, e.g. `COMMAND_STOP` or `EVENT_GOAL_CONFIRMED_YELLOW`
    pub event_type: String,
    /// Playback priority resolved from the priority table
    pub priority: i32,
    /// Open string-keyed attribute map; absent source fields are explicit nulls
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl GameEvent {
    /// Create an event stamped with the current wall clock
    pub fn new(event_type: impl Into<String>, priority: i32, data: Map<String, Value>) -> Self {
        Self {
            timestamp: epoch_seconds(),
            event_type: event_type.into(),
            priority,
            data,
        }
    }

    /// Create an event with an explicit timestamp (occurrence creation time)
    pub fn with_timestamp(
        timestamp: f64,
        event_type: impl Into<String>,
        priority: i32,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            priority,
            data,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON. Unknown top-level keys are ignored for forward
    /// compatibility.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-team state within a `GameStateUpdate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TeamState {
    pub name: String,
    pub score: u32,
    pub red_cards: u32,
    pub yellow_cards: u32,
    /// Remaining time of each active yellow card, microseconds
    #[serde(default)]
    pub yellow_card_times_us: Vec<u32>,
    pub timeouts_left: u32,
    /// Remaining total timeout time, microseconds
    pub timeout_time_left_us: u32,
    pub goalkeeper_id: u32,
    #[serde(default)]
    pub foul_count: Option<u32>,
    #[serde(default)]
    pub max_allowed_bots: Option<u32>,
}

/// Flattened projection of the latest referee snapshot.
///
/// Recomputed wholesale on every snapshot; there is no partial-update
/// semantics anywhere downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateUpdate {
    pub timestamp: f64,
    /// Current stage enum name, e.g. `NORMAL_FIRST_HALF`
    pub stage: String,
    /// Current command enum name, e.g. `STOP`
    pub command: String,
    #[serde(default)]
    pub stage_time_left_us: Option<i64>,
    #[serde(default)]
    pub current_action_time_remaining_us: Option<i64>,
    pub team_yellow: TeamState,
    pub team_blue: TeamState,
    /// Spectator-facing message from the game controller
    #[serde(default)]
    pub status_message: String,
}

impl GameStateUpdate {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
