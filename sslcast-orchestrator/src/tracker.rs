//! State tracker and event detector
//!
//! Consumes referee snapshots in arrival order and derives discrete
//! `GameEvent`s from field changes plus the snapshot's embedded occurrence
//! list. Holds the previous snapshot, a context phase used solely to
//! disambiguate the generic NORMAL_START command, and the set of occurrence
//! ids already emitted.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use sslcast_common::config::PriorityConfig;
use sslcast_common::time::{epoch_seconds, micros_to_seconds};
use sslcast_common::{GameEvent, GameStateUpdate, Team, TeamState};

use crate::handlers;
use crate::proto::{Command, Referee, Stage, TeamInfo};

/// Derived match phase, used only to resolve the ambiguous start command.
///
/// The wire protocol reports kickoff starts, penalty starts and plain
/// restarts as the same NORMAL_START value; the phase the previous commands
/// put us in tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPhase {
    Halted,
    Stopped,
    Running,
    PrepareKickoffYellow,
    PrepareKickoffBlue,
    PreparePenaltyYellow,
    PreparePenaltyBlue,
    DirectFreeYellow,
    DirectFreeBlue,
    TimeoutYellow,
    TimeoutBlue,
    BallPlacementYellow,
    BallPlacementBlue,
    Unknown,
}

impl ContextPhase {
    /// Total mapping from a raw command value to the phase it establishes
    pub fn from_raw_command(raw: i32) -> Self {
        match Command::try_from(raw) {
            Ok(Command::Halt) => ContextPhase::Halted,
            Ok(Command::Stop) => ContextPhase::Stopped,
            Ok(Command::NormalStart) | Ok(Command::ForceStart) => ContextPhase::Running,
            Ok(Command::PrepareKickoffYellow) => ContextPhase::PrepareKickoffYellow,
            Ok(Command::PrepareKickoffBlue) => ContextPhase::PrepareKickoffBlue,
            Ok(Command::PreparePenaltyYellow) => ContextPhase::PreparePenaltyYellow,
            Ok(Command::PreparePenaltyBlue) => ContextPhase::PreparePenaltyBlue,
            Ok(Command::DirectFreeYellow) => ContextPhase::DirectFreeYellow,
            Ok(Command::DirectFreeBlue) => ContextPhase::DirectFreeBlue,
            Ok(Command::TimeoutYellow) => ContextPhase::TimeoutYellow,
            Ok(Command::TimeoutBlue) => ContextPhase::TimeoutBlue,
            Ok(Command::BallPlacementYellow) => ContextPhase::BallPlacementYellow,
            Ok(Command::BallPlacementBlue) => ContextPhase::BallPlacementBlue,
            _ => ContextPhase::Unknown,
        }
    }
}

/// Event type a NORMAL_START resolves to under the given phase
fn start_event_type(context: ContextPhase) -> (&'static str, Option<Team>) {
    match context {
        ContextPhase::PrepareKickoffYellow => ("COMMAND_KICKOFF_START_YELLOW", Some(Team::Yellow)),
        ContextPhase::PrepareKickoffBlue => ("COMMAND_KICKOFF_START_BLUE", Some(Team::Blue)),
        ContextPhase::PreparePenaltyYellow => ("COMMAND_PENALTY_START_YELLOW", Some(Team::Yellow)),
        ContextPhase::PreparePenaltyBlue => ("COMMAND_PENALTY_START_BLUE", Some(Team::Blue)),
        _ => ("COMMAND_NORMAL_START", None),
    }
}

/// Tracks referee state across snapshots and detects game events.
///
/// Must be fed snapshots strictly in arrival order by a single consumer.
pub struct GameTracker {
    previous: Option<Referee>,
    context: ContextPhase,
    /// Creation timestamps of occurrences already emitted; grows for the
    /// lifetime of the process (distinct occurrences are sparse)
    seen_event_ids: HashSet<u64>,
    priorities: PriorityConfig,
}

impl GameTracker {
    pub fn new(priorities: PriorityConfig) -> Self {
        Self {
            previous: None,
            context: ContextPhase::Unknown,
            seen_event_ids: HashSet::new(),
            priorities,
        }
    }

    /// Process one snapshot, returning derived events (possibly none) and
    /// the refreshed state projection.
    ///
    /// Status/command events precede occurrence events within a call; the
    /// very first snapshot only seeds state and never emits.
    pub fn process(&mut self, snapshot: &Referee) -> (Vec<GameEvent>, GameStateUpdate) {
        let state = project_state(snapshot);

        let Some(previous) = self.previous.as_ref() else {
            self.context = ContextPhase::from_raw_command(snapshot.command);
            self.previous = Some(snapshot.clone());
            debug!("Cold start: stored baseline snapshot, no events");
            return (Vec::new(), state);
        };

        let mut events = Vec::new();

        if snapshot.stage != previous.stage {
            events.push(self.stage_event(snapshot));
        }
        if snapshot.command != previous.command {
            if let Some(event) = self.command_event(snapshot) {
                events.push(event);
            }
        }

        for occurrence in &snapshot.game_events {
            if let Some(id) = occurrence.created_timestamp {
                if !self.seen_event_ids.insert(id) {
                    continue;
                }
            }
            if let Some((event_type, data)) = handlers::dispatch(occurrence, snapshot) {
                let priority = self.priorities.priority_for(&event_type);
                let timestamp = occurrence
                    .created_timestamp
                    .map(micros_to_seconds)
                    .unwrap_or_else(epoch_seconds);
                events.push(GameEvent::with_timestamp(timestamp, event_type, priority, data));
            }
        }

        self.context = ContextPhase::from_raw_command(snapshot.command);
        self.previous = Some(snapshot.clone());
        (events, state)
    }

    fn stage_event(&self, snapshot: &Referee) -> GameEvent {
        let event_type = format!("STAGE_{}", Stage::name_of(snapshot.stage));
        let mut data = Map::new();
        data.insert(
            "stage_time_left_us".into(),
            snapshot
                .stage_time_left
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
        );
        let priority = self.priorities.priority_for(&event_type);
        GameEvent::new(event_type, priority, data)
    }

    fn command_event(&self, snapshot: &Referee) -> Option<GameEvent> {
        let command = match Command::try_from(snapshot.command) {
            Ok(command) => command,
            Err(_) => {
                warn!("Unknown command value {}, skipping", snapshot.command);
                return None;
            }
        };

        let mut data = Map::new();
        let event_type = if command == Command::NormalStart {
            // Ambiguous on the wire: the context phase set by the previous
            // command tells kickoff, penalty and plain restart apart
            let (event_type, team) = start_event_type(self.context);
            if let Some(team) = team {
                data.insert("team".into(), json!(team.as_str()));
            }
            event_type.to_string()
        } else {
            if let Some(team) = command.team() {
                data.insert("team".into(), json!(team.as_str()));
            }
            match command {
                Command::BallPlacementYellow | Command::BallPlacementBlue => {
                    data.insert(
                        "designated_position".into(),
                        match &snapshot.designated_position {
                            Some(p) => json!({"x": p.x, "y": p.y}),
                            None => Value::Null,
                        },
                    );
                }
                Command::TimeoutYellow => timeout_bookkeeping(&mut data, &snapshot.yellow),
                Command::TimeoutBlue => timeout_bookkeeping(&mut data, &snapshot.blue),
                _ => {}
            }
            format!("COMMAND_{}", command.name())
        };

        if let Some(remaining) = snapshot.current_action_time_remaining {
            data.insert("action_time_remaining_us".into(), json!(remaining));
        }

        let priority = self.priorities.priority_for(&event_type);
        Some(GameEvent::new(event_type, priority, data))
    }
}

fn timeout_bookkeeping(data: &mut Map<String, Value>, team: &TeamInfo) {
    data.insert("timeouts_left".into(), json!(team.timeouts));
    data.insert("timeout_time_left_us".into(), json!(team.timeout_time));
}

fn team_state(info: &TeamInfo) -> TeamState {
    TeamState {
        name: info.name.clone(),
        score: info.score,
        red_cards: info.red_cards,
        yellow_cards: info.yellow_cards,
        yellow_card_times_us: info.yellow_card_times.clone(),
        timeouts_left: info.timeouts,
        timeout_time_left_us: info.timeout_time,
        goalkeeper_id: info.goalkeeper,
        foul_count: info.foul_counter,
        max_allowed_bots: info.max_allowed_bots,
    }
}

/// Flatten a snapshot into the consumer-facing state projection.
/// Recomputed wholesale every time; never partially updated.
fn project_state(snapshot: &Referee) -> GameStateUpdate {
    GameStateUpdate {
        timestamp: epoch_seconds(),
        stage: Stage::name_of(snapshot.stage),
        command: Command::name_of(snapshot.command),
        stage_time_left_us: snapshot.stage_time_left,
        current_action_time_remaining_us: snapshot.current_action_time_remaining,
        team_yellow: team_state(&snapshot.yellow),
        team_blue: team_state(&snapshot.blue),
        status_message: snapshot.status_message.clone().unwrap_or_default(),
    }
}
