//! Orchestrator loop: snapshots in, bus traffic out
//!
//! A single consumer task drains the listener channel strictly in arrival
//! order (ordering is load-bearing for dedup and context-phase correctness),
//! publishes derived events on the `event` topic, and caches the latest
//! state projection. An independent timer task re-publishes the cached
//! state on the `state` topic at a fixed interval, whether or not anything
//! changed.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use sslcast_common::bus::{BusPublisher, TOPIC_EVENT, TOPIC_STATE};
use sslcast_common::GameStateUpdate;

use crate::proto::Referee;
use crate::tracker::GameTracker;

/// Drain snapshots until the channel closes or shutdown is signaled
pub async fn run(
    mut tracker: GameTracker,
    publisher: BusPublisher,
    mut snapshots: mpsc::Receiver<Referee>,
    state_tx: watch::Sender<Option<GameStateUpdate>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            snapshot = snapshots.recv() => {
                let Some(snapshot) = snapshot else {
                    info!("Snapshot channel closed, orchestrator stopping");
                    return;
                };
                let (events, state) = tracker.process(&snapshot);
                for event in events {
                    debug!(
                        "Publishing {} (priority {})",
                        event.event_type, event.priority
                    );
                    if let Err(e) = publisher.publish(TOPIC_EVENT, &event) {
                        warn!("Failed to publish event: {}", e);
                    }
                }
                // Full immutable replacement; the republish timer only reads
                let _ = state_tx.send(Some(state));
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Orchestrator shutting down");
                    return;
                }
            }
        }
    }
}

/// Re-publish the cached state projection on a fixed interval
pub async fn republish_state(
    publisher: BusPublisher,
    state_rx: watch::Receiver<Option<GameStateUpdate>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let latest = state_rx.borrow().clone();
                if let Some(state) = latest {
                    if let Err(e) = publisher.publish(TOPIC_STATE, &state) {
                        warn!("Failed to publish state: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Command, Stage, TeamInfo};
    use sslcast_common::bus::BusSubscriber;
    use sslcast_common::config::PriorityConfig;
    use sslcast_common::GameEvent;

    fn snapshot(command: Command) -> Referee {
        Referee {
            packet_timestamp: 1,
            stage: Stage::NormalFirstHalf as i32,
            stage_time_left: None,
            command: command as i32,
            command_counter: 0,
            command_timestamp: 1,
            yellow: TeamInfo::default(),
            blue: TeamInfo::default(),
            designated_position: None,
            blue_team_on_positive_half: None,
            next_command: None,
            current_action_time_remaining: None,
            game_events: vec![],
            status_message: None,
        }
    }

    #[tokio::test]
    async fn test_snapshots_flow_to_event_topic() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let publisher = BusPublisher::bind("127.0.0.1:0", shutdown_rx.clone())
            .await
            .unwrap();
        let addr = publisher.local_addr().to_string();
        let mut subscriber =
            BusSubscriber::connect(addr, vec![TOPIC_EVENT.to_string()], shutdown_rx.clone());

        // Wait for the subscriber connection before feeding snapshots
        for _ in 0..200 {
            if publisher.subscriber_count() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(None);
        let tracker = GameTracker::new(PriorityConfig::default());
        tokio::spawn(run(
            tracker,
            publisher.clone(),
            snapshot_rx,
            state_tx,
            shutdown_rx,
        ));

        snapshot_tx.send(snapshot(Command::Halt)).await.unwrap();
        snapshot_tx.send(snapshot(Command::Stop)).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
            .await
            .expect("timed out waiting for event")
            .expect("subscriber closed");
        let event = GameEvent::from_json(frame.payload_str().unwrap()).unwrap();
        assert_eq!(event.event_type, "COMMAND_STOP");

        // The state cache holds the latest projection
        assert_eq!(state_rx.borrow().as_ref().unwrap().command, "STOP");
    }
}
