//! Referee protocol wire model
//!
//! Hand-written prost messages mirroring the published SSL game-controller
//! referee schema (proto2 semantics). The schema is externally defined and
//! versioned; only the fields and game-event payloads consumed by the
//! tracker are modeled here. Datagrams carrying unmodeled fields still
//! decode (unknown fields are skipped), and game events whose payload
//! variant is not modeled decode with `event: None`.

use sslcast_common::Team as WireTeam;

/// Team enum shared by referee and game-event messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Team {
    Unknown = 0,
    Yellow = 1,
    Blue = 2,
}

impl Team {
    /// Convert a raw enum value to the bus-side team identifier
    pub fn wire(raw: i32) -> WireTeam {
        match Team::try_from(raw) {
            Ok(Team::Yellow) => WireTeam::Yellow,
            Ok(Team::Blue) => WireTeam::Blue,
            _ => WireTeam::Unknown,
        }
    }
}

/// Field coordinate in millimeters, as used by `designated_position`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Point {
    #[prost(float, required, tag = "1")]
    pub x: f32,
    #[prost(float, required, tag = "2")]
    pub y: f32,
}

/// Geometry vector used inside game-event payloads
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Vector2 {
    #[prost(float, required, tag = "1")]
    pub x: f32,
    #[prost(float, required, tag = "2")]
    pub y: f32,
}

/// Match stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Stage {
    NormalFirstHalfPre = 0,
    NormalFirstHalf = 1,
    NormalHalfTime = 2,
    NormalSecondHalfPre = 3,
    NormalSecondHalf = 4,
    ExtraTimeBreak = 5,
    ExtraFirstHalfPre = 6,
    ExtraFirstHalf = 7,
    ExtraHalfTime = 8,
    ExtraSecondHalfPre = 9,
    ExtraSecondHalf = 10,
    PenaltyShootoutBreak = 11,
    PenaltyShootout = 12,
    PostGame = 13,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::NormalFirstHalfPre => "NORMAL_FIRST_HALF_PRE",
            Stage::NormalFirstHalf => "NORMAL_FIRST_HALF",
            Stage::NormalHalfTime => "NORMAL_HALF_TIME",
            Stage::NormalSecondHalfPre => "NORMAL_SECOND_HALF_PRE",
            Stage::NormalSecondHalf => "NORMAL_SECOND_HALF",
            Stage::ExtraTimeBreak => "EXTRA_TIME_BREAK",
            Stage::ExtraFirstHalfPre => "EXTRA_FIRST_HALF_PRE",
            Stage::ExtraFirstHalf => "EXTRA_FIRST_HALF",
            Stage::ExtraHalfTime => "EXTRA_HALF_TIME",
            Stage::ExtraSecondHalfPre => "EXTRA_SECOND_HALF_PRE",
            Stage::ExtraSecondHalf => "EXTRA_SECOND_HALF",
            Stage::PenaltyShootoutBreak => "PENALTY_SHOOTOUT_BREAK",
            Stage::PenaltyShootout => "PENALTY_SHOOTOUT",
            Stage::PostGame => "POST_GAME",
        }
    }

    /// Name for a raw enum value, tolerating future additions
    pub fn name_of(raw: i32) -> String {
        match Stage::try_from(raw) {
            Ok(stage) => stage.name().to_string(),
            Err(_) => format!("UNKNOWN_STAGE_{raw}"),
        }
    }
}

/// Currently active referee directive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Command {
    Halt = 0,
    Stop = 1,
    NormalStart = 2,
    ForceStart = 3,
    PrepareKickoffYellow = 4,
    PrepareKickoffBlue = 5,
    PreparePenaltyYellow = 6,
    PreparePenaltyBlue = 7,
    DirectFreeYellow = 8,
    DirectFreeBlue = 9,
    IndirectFreeYellow = 10,
    IndirectFreeBlue = 11,
    TimeoutYellow = 12,
    TimeoutBlue = 13,
    BallPlacementYellow = 16,
    BallPlacementBlue = 17,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Halt => "HALT",
            Command::Stop => "STOP",
            Command::NormalStart => "NORMAL_START",
            Command::ForceStart => "FORCE_START",
            Command::PrepareKickoffYellow => "PREPARE_KICKOFF_YELLOW",
            Command::PrepareKickoffBlue => "PREPARE_KICKOFF_BLUE",
            Command::PreparePenaltyYellow => "PREPARE_PENALTY_YELLOW",
            Command::PreparePenaltyBlue => "PREPARE_PENALTY_BLUE",
            Command::DirectFreeYellow => "DIRECT_FREE_YELLOW",
            Command::DirectFreeBlue => "DIRECT_FREE_BLUE",
            Command::IndirectFreeYellow => "INDIRECT_FREE_YELLOW",
            Command::IndirectFreeBlue => "INDIRECT_FREE_BLUE",
            Command::TimeoutYellow => "TIMEOUT_YELLOW",
            Command::TimeoutBlue => "TIMEOUT_BLUE",
            Command::BallPlacementYellow => "BALL_PLACEMENT_YELLOW",
            Command::BallPlacementBlue => "BALL_PLACEMENT_BLUE",
        }
    }

    pub fn name_of(raw: i32) -> String {
        match Command::try_from(raw) {
            Ok(command) => command.name().to_string(),
            Err(_) => format!("UNKNOWN_COMMAND_{raw}"),
        }
    }

    /// Team addressed by the command's `_YELLOW`/`_BLUE` suffix, if any
    pub fn team(self) -> Option<WireTeam> {
        match self {
            Command::PrepareKickoffYellow
            | Command::PreparePenaltyYellow
            | Command::DirectFreeYellow
            | Command::IndirectFreeYellow
            | Command::TimeoutYellow
            | Command::BallPlacementYellow => Some(WireTeam::Yellow),
            Command::PrepareKickoffBlue
            | Command::PreparePenaltyBlue
            | Command::DirectFreeBlue
            | Command::IndirectFreeBlue
            | Command::TimeoutBlue
            | Command::BallPlacementBlue => Some(WireTeam::Blue),
            _ => None,
        }
    }
}

/// Per-team bookkeeping carried in every referee snapshot
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TeamInfo {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(uint32, required, tag = "2")]
    pub score: u32,
    #[prost(uint32, required, tag = "3")]
    pub red_cards: u32,
    /// Remaining time of each active yellow card, microseconds
    #[prost(uint32, repeated, tag = "4")]
    pub yellow_card_times: Vec<u32>,
    #[prost(uint32, required, tag = "5")]
    pub yellow_cards: u32,
    #[prost(uint32, required, tag = "6")]
    pub timeouts: u32,
    /// Remaining total timeout time, microseconds
    #[prost(uint32, required, tag = "7")]
    pub timeout_time: u32,
    #[prost(uint32, required, tag = "8")]
    pub goalkeeper: u32,
    #[prost(uint32, optional, tag = "9")]
    pub foul_counter: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub ball_placement_failures: Option<u32>,
    #[prost(bool, optional, tag = "12")]
    pub can_place_ball: Option<bool>,
    #[prost(uint32, optional, tag = "13")]
    pub max_allowed_bots: Option<u32>,
}

/// One referee snapshot as broadcast on the multicast group
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Referee {
    /// Unix timestamp in microseconds when this packet was sent
    #[prost(uint64, required, tag = "1")]
    pub packet_timestamp: u64,
    #[prost(enumeration = "Stage", required, tag = "2")]
    pub stage: i32,
    /// Time remaining in the current stage, microseconds (may be negative)
    #[prost(sint64, optional, tag = "3")]
    pub stage_time_left: Option<i64>,
    #[prost(enumeration = "Command", required, tag = "4")]
    pub command: i32,
    /// Incremented each time `command` changes
    #[prost(uint32, required, tag = "5")]
    pub command_counter: u32,
    #[prost(uint64, required, tag = "6")]
    pub command_timestamp: u64,
    #[prost(message, required, tag = "7")]
    pub yellow: TeamInfo,
    #[prost(message, required, tag = "8")]
    pub blue: TeamInfo,
    /// Ball placement target, set for BALL_PLACEMENT_* commands
    #[prost(message, optional, tag = "9")]
    pub designated_position: Option<Point>,
    #[prost(bool, optional, tag = "10")]
    pub blue_team_on_positive_half: Option<bool>,
    #[prost(enumeration = "Command", optional, tag = "12")]
    pub next_command: Option<i32>,
    /// Time remaining for the current action, microseconds
    #[prost(sint64, optional, tag = "15")]
    pub current_action_time_remaining: Option<i64>,
    /// Discrete occurrences detected since the last state change
    #[prost(message, repeated, tag = "16")]
    pub game_events: Vec<GameEvent>,
    /// Spectator-facing message from the game controller
    #[prost(string, optional, tag = "20")]
    pub status_message: Option<String>,
}

/// A single discrete occurrence reported inside a referee snapshot
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GameEvent {
    #[prost(enumeration = "game_event::Type", optional, tag = "40")]
    pub r#type: Option<i32>,
    #[prost(string, repeated, tag = "41")]
    pub origin: Vec<String>,
    /// Unix timestamp in microseconds; unique per real-world occurrence
    #[prost(uint64, optional, tag = "42")]
    pub created_timestamp: Option<u64>,
    #[prost(
        oneof = "game_event::Event",
        tags = "2, 3, 5, 6, 7, 8, 11, 22, 23, 24, 28, 29, 30, 31"
    )]
    pub event: Option<game_event::Event>,
}

pub mod game_event {
    /// Game event type tags (subset consumed by the tracker)
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum Type {
        UnknownGameEventType = 0,
        NoProgressInGame = 2,
        PlacementFailed = 3,
        PlacementSucceeded = 5,
        BallLeftFieldTouchLine = 6,
        BallLeftFieldGoalLine = 7,
        Goal = 8,
        AimlessKick = 11,
        KeeperHeldBall = 22,
        BotDribbledBallTooFar = 23,
        BotPushedBot = 24,
        BotKickedBallTooFast = 28,
        BotCrashUnique = 29,
        BotCrashDrawn = 30,
        DefenderTooCloseToKickPoint = 31,
    }

    /// Type-specific payload; one variant per modeled wire type
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "2")]
        NoProgressInGame(super::NoProgressInGame),
        #[prost(message, tag = "3")]
        PlacementFailed(super::PlacementFailed),
        #[prost(message, tag = "5")]
        PlacementSucceeded(super::PlacementSucceeded),
        #[prost(message, tag = "6")]
        BallLeftFieldTouchLine(super::BallLeftField),
        #[prost(message, tag = "7")]
        BallLeftFieldGoalLine(super::BallLeftField),
        #[prost(message, tag = "8")]
        Goal(super::Goal),
        #[prost(message, tag = "11")]
        AimlessKick(super::AimlessKick),
        #[prost(message, tag = "22")]
        KeeperHeldBall(super::KeeperHeldBall),
        #[prost(message, tag = "23")]
        BotDribbledBallTooFar(super::BotDribbledBallTooFar),
        #[prost(message, tag = "24")]
        BotPushedBot(super::BotPushedBot),
        #[prost(message, tag = "28")]
        BotKickedBallTooFast(super::BotKickedBallTooFast),
        #[prost(message, tag = "29")]
        BotCrashUnique(super::BotCrashUnique),
        #[prost(message, tag = "30")]
        BotCrashDrawn(super::BotCrashDrawn),
        #[prost(message, tag = "31")]
        DefenderTooCloseToKickPoint(super::DefenderTooCloseToKickPoint),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BallLeftField {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub by_bot: Option<u32>,
    #[prost(message, optional, tag = "3")]
    pub location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AimlessKick {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub by_bot: Option<u32>,
    #[prost(message, optional, tag = "3")]
    pub location: Option<Vector2>,
    #[prost(message, optional, tag = "4")]
    pub kick_location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Goal {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(enumeration = "Team", optional, tag = "2")]
    pub kicking_team: Option<i32>,
    #[prost(uint32, optional, tag = "3")]
    pub kicking_bot: Option<u32>,
    #[prost(message, optional, tag = "4")]
    pub location: Option<Vector2>,
    #[prost(message, optional, tag = "5")]
    pub kick_location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NoProgressInGame {
    #[prost(message, optional, tag = "1")]
    pub location: Option<Vector2>,
    /// Seconds without progress
    #[prost(float, optional, tag = "2")]
    pub time: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlacementFailed {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(float, optional, tag = "2")]
    pub remaining_distance: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlacementSucceeded {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(float, optional, tag = "2")]
    pub time_taken: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub precision: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub distance: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeeperHeldBall {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(message, optional, tag = "2")]
    pub location: Option<Vector2>,
    /// Seconds the keeper held the ball
    #[prost(float, optional, tag = "3")]
    pub duration: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotDribbledBallTooFar {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub by_bot: Option<u32>,
    #[prost(message, optional, tag = "3")]
    pub start: Option<Vector2>,
    #[prost(message, optional, tag = "4")]
    pub end: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotPushedBot {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub violator: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub victim: Option<u32>,
    #[prost(float, optional, tag = "4")]
    pub pushed_distance: Option<f32>,
    #[prost(message, optional, tag = "5")]
    pub location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotKickedBallTooFast {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub by_bot: Option<u32>,
    /// Meters per second at the moment of the kick
    #[prost(float, optional, tag = "3")]
    pub initial_ball_speed: Option<f32>,
    #[prost(bool, optional, tag = "4")]
    pub chipped: Option<bool>,
    #[prost(message, optional, tag = "5")]
    pub location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotCrashUnique {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub violator: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub victim: Option<u32>,
    #[prost(float, optional, tag = "4")]
    pub crash_speed: Option<f32>,
    #[prost(float, optional, tag = "5")]
    pub speed_diff: Option<f32>,
    #[prost(float, optional, tag = "6")]
    pub crash_angle: Option<f32>,
    #[prost(message, optional, tag = "7")]
    pub location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotCrashDrawn {
    #[prost(uint32, optional, tag = "1")]
    pub bot_yellow: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub bot_blue: Option<u32>,
    #[prost(float, optional, tag = "3")]
    pub crash_speed: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub speed_diff: Option<f32>,
    #[prost(float, optional, tag = "5")]
    pub crash_angle: Option<f32>,
    #[prost(message, optional, tag = "6")]
    pub location: Option<Vector2>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DefenderTooCloseToKickPoint {
    #[prost(enumeration = "Team", required, tag = "1")]
    pub by_team: i32,
    #[prost(uint32, optional, tag = "2")]
    pub by_bot: Option<u32>,
    #[prost(float, optional, tag = "3")]
    pub distance: Option<f32>,
    #[prost(message, optional, tag = "4")]
    pub location: Option<Vector2>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    fn minimal_referee() -> Referee {
        Referee {
            packet_timestamp: 1_700_000_000_000_000,
            stage: Stage::NormalFirstHalf as i32,
            stage_time_left: Some(120_000_000),
            command: Command::Stop as i32,
            command_counter: 7,
            command_timestamp: 1_700_000_000_000_000,
            yellow: TeamInfo {
                name: "Yellow FC".into(),
                timeouts: 4,
                ..Default::default()
            },
            blue: TeamInfo {
                name: "Blue United".into(),
                ..Default::default()
            },
            designated_position: None,
            blue_team_on_positive_half: None,
            next_command: None,
            current_action_time_remaining: None,
            game_events: vec![],
            status_message: None,
        }
    }

    #[test]
    fn test_referee_encode_decode() {
        let referee = minimal_referee();
        let bytes = referee.encode_to_vec();
        let decoded = Referee::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, referee);
    }

    #[test]
    fn test_game_event_oneof_decode() {
        let mut referee = minimal_referee();
        referee.game_events.push(GameEvent {
            r#type: Some(game_event::Type::Goal as i32),
            origin: vec!["GameController".into()],
            created_timestamp: Some(42),
            event: Some(game_event::Event::Goal(Goal {
                by_team: Team::Blue as i32,
                kicking_team: None,
                kicking_bot: Some(3),
                location: Some(Vector2 { x: 0.5, y: -1.0 }),
                kick_location: None,
            })),
        });
        let bytes = referee.encode_to_vec();
        let decoded = Referee::decode(bytes.as_slice()).unwrap();
        match &decoded.game_events[0].event {
            Some(game_event::Event::Goal(goal)) => {
                assert_eq!(goal.by_team, Team::Blue as i32);
                assert_eq!(goal.kicking_bot, Some(3));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_datagram_rejected() {
        assert!(Referee::decode(&b"not a referee message"[..]).is_err());
    }

    #[test]
    fn test_command_team_suffix() {
        assert_eq!(Command::TimeoutYellow.team(), Some(WireTeam::Yellow));
        assert_eq!(Command::BallPlacementBlue.team(), Some(WireTeam::Blue));
        assert_eq!(Command::Stop.team(), None);
    }

    #[test]
    fn test_enum_name_fallback() {
        assert_eq!(Command::name_of(1), "STOP");
        assert_eq!(Command::name_of(99), "UNKNOWN_COMMAND_99");
        assert_eq!(Stage::name_of(13), "POST_GAME");
        assert_eq!(Stage::name_of(-2), "UNKNOWN_STAGE_-2");
    }
}
