//! Per-type extraction of discrete referee game events
//!
//! Maps each modeled wire payload variant to a canonical event type string
//! and a flat attribute map. One pure function per wire type; optional
//! source fields are copied when present and written as explicit JSON nulls
//! when absent. Unmapped type tags produce a logged skip, never an error.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::proto::{self, game_event::Event, Referee, Team, Vector2};

/// Resolve one occurrence to (event_type, data), or `None` for unmapped
/// payloads. Takes the owning snapshot for context fields (current scores).
pub fn dispatch(occurrence: &proto::GameEvent, referee: &Referee) -> Option<(String, Map<String, Value>)> {
    let Some(event) = &occurrence.event else {
        warn!(
            "Game event with unmapped payload (type tag {:?}), skipping",
            occurrence.r#type
        );
        return None;
    };

    let mapped = match event {
        Event::BallLeftFieldTouchLine(e) => ball_left_field(e, "EVENT_BALL_LEFT_TOUCHLINE"),
        Event::BallLeftFieldGoalLine(e) => ball_left_field(e, "EVENT_BALL_LEFT_GOALLINE"),
        Event::Goal(e) => goal(e, referee),
        Event::AimlessKick(e) => aimless_kick(e),
        Event::NoProgressInGame(e) => no_progress(e),
        Event::PlacementSucceeded(e) => placement_succeeded(e),
        Event::PlacementFailed(e) => placement_failed(e),
        Event::KeeperHeldBall(e) => keeper_held_ball(e),
        Event::BotDribbledBallTooFar(e) => excessive_dribbling(e),
        Event::BotPushedBot(e) => bot_pushing(e),
        Event::BotKickedBallTooFast(e) => ball_speed_too_fast(e),
        Event::BotCrashUnique(e) => bot_crash_unique(e),
        Event::BotCrashDrawn(e) => bot_crash_drawn(e),
        Event::DefenderTooCloseToKickPoint(e) => defender_too_close(e),
    };
    Some(mapped)
}

fn team_name(raw: i32) -> &'static str {
    Team::wire(raw).as_str()
}

fn location_json(location: &Option<Vector2>) -> Value {
    match location {
        Some(v) => json!({"x": v.x, "y": v.y}),
        None => Value::Null,
    }
}

fn opt_json<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn opt_f32(value: Option<f32>) -> Value {
    value.map(|v| json!(v)).unwrap_or(Value::Null)
}

fn ball_left_field(e: &proto::BallLeftField, prefix: &str) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("last_touch_bot".into(), opt_json(e.by_bot));
    data.insert("location".into(), location_json(&e.location));
    (format!("{prefix}_{team}"), data)
}

fn goal(e: &proto::Goal, referee: &Referee) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert(
        "kicking_team".into(),
        match e.kicking_team {
            Some(raw) => json!(team_name(raw)),
            None => Value::Null,
        },
    );
    data.insert("kicking_bot".into(), opt_json(e.kicking_bot));
    // Latest scores come from the snapshot, not the occurrence
    data.insert("score_yellow".into(), json!(referee.yellow.score));
    data.insert("score_blue".into(), json!(referee.blue.score));
    data.insert("location".into(), location_json(&e.location));
    (format!("EVENT_GOAL_CONFIRMED_{team}"), data)
}

fn aimless_kick(e: &proto::AimlessKick) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("by_bot".into(), opt_json(e.by_bot));
    data.insert("location".into(), location_json(&e.location));
    data.insert("kick_location".into(), location_json(&e.kick_location));
    (format!("EVENT_AIMLESS_KICK_{team}"), data)
}

fn no_progress(e: &proto::NoProgressInGame) -> (String, Map<String, Value>) {
    let mut data = Map::new();
    data.insert("time".into(), opt_f32(e.time));
    data.insert("location".into(), location_json(&e.location));
    ("EVENT_NO_PROGRESS".to_string(), data)
}

fn placement_succeeded(e: &proto::PlacementSucceeded) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("time_taken".into(), opt_f32(e.time_taken));
    data.insert("precision".into(), opt_f32(e.precision));
    data.insert("distance".into(), opt_f32(e.distance));
    (format!("EVENT_PLACEMENT_SUCCEEDED_{team}"), data)
}

fn placement_failed(e: &proto::PlacementFailed) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("remaining_distance".into(), opt_f32(e.remaining_distance));
    (format!("EVENT_PLACEMENT_FAILED_{team}"), data)
}

fn keeper_held_ball(e: &proto::KeeperHeldBall) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("location".into(), location_json(&e.location));
    data.insert("duration".into(), opt_f32(e.duration));
    (format!("EVENT_KEEPER_HELD_BALL_{team}"), data)
}

fn excessive_dribbling(e: &proto::BotDribbledBallTooFar) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("by_bot".into(), opt_json(e.by_bot));
    data.insert("start".into(), location_json(&e.start));
    data.insert("end".into(), location_json(&e.end));
    (format!("EVENT_EXCESSIVE_DRIBBLING_{team}"), data)
}

fn bot_pushing(e: &proto::BotPushedBot) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("violator".into(), opt_json(e.violator));
    data.insert("victim".into(), opt_json(e.victim));
    data.insert("pushed_distance".into(), opt_f32(e.pushed_distance));
    data.insert("location".into(), location_json(&e.location));
    (format!("EVENT_BOT_PUSHING_{team}"), data)
}

fn ball_speed_too_fast(e: &proto::BotKickedBallTooFast) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("by_bot".into(), opt_json(e.by_bot));
    data.insert("initial_ball_speed".into(), opt_f32(e.initial_ball_speed));
    data.insert("chipped".into(), opt_json(e.chipped));
    data.insert("location".into(), location_json(&e.location));
    (format!("EVENT_BALL_SPEED_TOO_FAST_{team}"), data)
}

fn bot_crash_unique(e: &proto::BotCrashUnique) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("violator".into(), opt_json(e.violator));
    data.insert("victim".into(), opt_json(e.victim));
    data.insert("crash_speed".into(), opt_f32(e.crash_speed));
    data.insert("speed_diff".into(), opt_f32(e.speed_diff));
    data.insert("crash_angle".into(), opt_f32(e.crash_angle));
    data.insert("location".into(), location_json(&e.location));
    (format!("EVENT_BOT_CRASH_UNIQUE_{team}"), data)
}

fn bot_crash_drawn(e: &proto::BotCrashDrawn) -> (String, Map<String, Value>) {
    let mut data = Map::new();
    data.insert("bot_yellow".into(), opt_json(e.bot_yellow));
    data.insert("bot_blue".into(), opt_json(e.bot_blue));
    data.insert("crash_speed".into(), opt_f32(e.crash_speed));
    data.insert("speed_diff".into(), opt_f32(e.speed_diff));
    data.insert("crash_angle".into(), opt_f32(e.crash_angle));
    data.insert("location".into(), location_json(&e.location));
    ("EVENT_BOT_CRASH_DRAWN".to_string(), data)
}

fn defender_too_close(e: &proto::DefenderTooCloseToKickPoint) -> (String, Map<String, Value>) {
    let team = team_name(e.by_team);
    let mut data = Map::new();
    data.insert("team".into(), json!(team));
    data.insert("by_bot".into(), opt_json(e.by_bot));
    data.insert("distance".into(), opt_f32(e.distance));
    data.insert("location".into(), location_json(&e.location));
    (format!("EVENT_DEFENDER_TOO_CLOSE_{team}"), data)
}
