//! Priority playback scheduling
//!
//! One scheduler task owns the single playback channel. Event arrivals and
//! playback completions are serialized through one message channel, so there
//! is never a race between "the file just ended" and "a new event arrived".
//!
//! Arbitration rules:
//! - with nothing active, an event plays immediately;
//! - a strictly higher priority preempts the active playback and discards
//!   the whole backlog;
//! - equal or lower priority joins the backlog, whose capacity is bounded
//!   and evicts its oldest entry when full;
//! - a completion starts the oldest backlogged request, if any.

use std::collections::VecDeque;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use sslcast_common::config::{AudioConfig, EventAction};
use sslcast_common::GameEvent;

use crate::backend::{AudioBackend, PlaybackToken};
use crate::selection::{resolve_candidates, select_file};

/// Input to the scheduler task
#[derive(Debug)]
pub enum SchedulerMsg {
    /// A game event arrived on the bus
    Event(GameEvent),
    /// The backend reported completion of the playback issued under `token`
    Finished(PlaybackToken),
}

/// A playback the scheduler decided to run, before or while it runs
#[derive(Debug, Clone, PartialEq)]
struct PlaybackRequest {
    event_type: String,
    priority: i32,
    path: PathBuf,
}

struct ActivePlayback {
    token: PlaybackToken,
    priority: i32,
    event_type: String,
}

/// Single-channel playback arbiter
pub struct PlaybackScheduler<B: AudioBackend> {
    backend: B,
    config: AudioConfig,
    rng: StdRng,
    active: Option<ActivePlayback>,
    backlog: VecDeque<PlaybackRequest>,
    next_token: PlaybackToken,
}

impl<B: AudioBackend> PlaybackScheduler<B> {
    pub fn new(backend: B, config: AudioConfig) -> Self {
        Self {
            backend,
            config,
            rng: StdRng::from_entropy(),
            active: None,
            backlog: VecDeque::new(),
            next_token: 0,
        }
    }

    /// Drain messages until the channel closes or shutdown is signaled
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<SchedulerMsg>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        info!("Scheduler channel closed, stopping");
                        break;
                    };
                    match msg {
                        SchedulerMsg::Event(event) => self.handle_event(&event),
                        SchedulerMsg::Finished(token) => self.handle_finished(token),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Scheduler shutting down");
                        break;
                    }
                }
            }
        }
        self.backend.stop();
    }

    fn handle_event(&mut self, event: &GameEvent) {
        let files = match self.config.action_for(&event.event_type) {
            EventAction::Ignore => {
                debug!("No action configured for {}", event.event_type);
                return;
            }
            EventAction::PlayFile { files } => files.clone(),
        };

        let candidates = resolve_candidates(&self.config.sounds_dir, &files);
        let Some(path) = select_file(&mut self.rng, &candidates) else {
            warn!("No playable file for {}", event.event_type);
            return;
        };

        let request = PlaybackRequest {
            event_type: event.event_type.clone(),
            priority: event.priority,
            path,
        };

        match &self.active {
            None => self.start_or_drain(request),
            Some(active) if request.priority > active.priority => {
                info!(
                    "{} (priority {}) preempts {} (priority {})",
                    request.event_type, request.priority, active.event_type, active.priority
                );
                self.backend.stop();
                // A queued request that lost to the preemptor is obsolete
                self.backlog.clear();
                self.start_or_drain(request);
            }
            Some(active) => {
                debug!(
                    "Queueing {} (priority {}) behind {} (priority {})",
                    request.event_type, request.priority, active.event_type, active.priority
                );
                self.enqueue(request);
            }
        }
    }

    fn handle_finished(&mut self, token: PlaybackToken) {
        match &self.active {
            Some(active) if active.token == token => {
                debug!("Playback of {} finished", active.event_type);
                self.active = None;
                if let Some(next) = self.backlog.pop_front() {
                    self.start_or_drain(next);
                }
            }
            _ => {
                // Completion for a playback we already preempted or replaced
                debug!("Ignoring stale completion (token {token})");
            }
        }
    }

    /// Start a playback; on start failure, fall through the backlog until a
    /// start succeeds or nothing is left
    fn start_or_drain(&mut self, mut request: PlaybackRequest) {
        loop {
            let token = self.next_token;
            self.next_token += 1;
            match self.backend.start(&request.path, token) {
                Ok(()) => {
                    self.active = Some(ActivePlayback {
                        token,
                        priority: request.priority,
                        event_type: request.event_type,
                    });
                    return;
                }
                Err(e) => {
                    warn!(
                        "Failed to start {} for {}: {}",
                        request.path.display(),
                        request.event_type,
                        e
                    );
                    match self.backlog.pop_front() {
                        Some(next) => request = next,
                        None => {
                            self.active = None;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Append to the backlog, evicting the oldest entry when full
    fn enqueue(&mut self, request: PlaybackRequest) {
        if self.config.backlog_capacity == 0 {
            debug!("Backlog disabled, dropping {}", request.event_type);
            return;
        }
        if self.backlog.len() >= self.config.backlog_capacity {
            if let Some(evicted) = self.backlog.pop_front() {
                debug!("Backlog full, evicting {}", evicted.event_type);
            }
        }
        self.backlog.push_back(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use sslcast_common::config::AudioFileEntry;

    /// Records start/stop calls; starts fail for paths listed in `fail_on`
    #[derive(Clone, Default)]
    struct MockBackend {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on: Vec<String>,
    }

    impl MockBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AudioBackend for MockBackend {
        fn start(&mut self, path: &Path, token: PlaybackToken) -> crate::Result<()> {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap()
                .to_string();
            if self.fail_on.contains(&name) {
                self.calls.lock().unwrap().push(format!("fail:{name}"));
                return Err(Error::Backend("mock start failure".into()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("start:{name}:{token}"));
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push("stop".to_string());
        }
    }

    fn event(event_type: &str, priority: i32) -> GameEvent {
        GameEvent::new(event_type, priority, serde_json::Map::new())
    }

    /// Config where every listed event type plays a same-named wav file
    fn config(dir: &Path, event_types: &[&str]) -> AudioConfig {
        let mut yaml = format!("sounds_dir: \"{}\"\nevent_actions:\n", dir.display());
        for event_type in event_types {
            let file = format!("{}.wav", event_type.to_lowercase());
            std::fs::write(dir.join(&file), b"riff").unwrap();
            yaml.push_str(&format!(
                "  {event_type}:\n    action: play_file\n    files:\n      - path: {file}\n"
            ));
        }
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn scheduler(backend: MockBackend, config: AudioConfig) -> PlaybackScheduler<MockBackend> {
        PlaybackScheduler::new(backend, config)
    }

    #[test]
    fn test_idle_event_plays_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A"]));

        sched.handle_event(&event("A", 5));
        assert_eq!(backend.calls(), vec!["start:a.wav:0"]);
        assert!(sched.backlog.is_empty());
    }

    #[test]
    fn test_higher_priority_preempts_and_clears_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "B", "C"]));

        sched.handle_event(&event("A", 5)); // active
        sched.handle_event(&event("B", 3)); // backlogged
        sched.handle_event(&event("C", 10)); // preempts, clears backlog
        assert_eq!(
            backend.calls(),
            vec!["start:a.wav:0", "stop", "start:c.wav:1"]
        );
        assert!(sched.backlog.is_empty());

        // Finishing C leaves nothing to play: B was discarded
        sched.handle_finished(1);
        assert_eq!(
            backend.calls(),
            vec!["start:a.wav:0", "stop", "start:c.wav:1"]
        );
        assert!(sched.active.is_none());
    }

    #[test]
    fn test_equal_priority_queues_instead_of_preempting() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "B"]));

        sched.handle_event(&event("A", 5));
        sched.handle_event(&event("B", 5));
        assert_eq!(backend.calls(), vec!["start:a.wav:0"]);
        assert_eq!(sched.backlog.len(), 1);

        sched.handle_finished(0);
        assert_eq!(backend.calls(), vec!["start:a.wav:0", "start:b.wav:1"]);
    }

    #[test]
    fn test_full_backlog_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "X", "Y", "Z"]));

        sched.handle_event(&event("A", 9)); // active
        sched.handle_event(&event("X", 1));
        sched.handle_event(&event("Y", 1));
        sched.handle_event(&event("Z", 1)); // evicts X
        let queued: Vec<&str> = sched
            .backlog
            .iter()
            .map(|r| r.event_type.as_str())
            .collect();
        assert_eq!(queued, vec!["Y", "Z"]);

        sched.handle_finished(0);
        assert_eq!(backend.calls(), vec!["start:a.wav:0", "start:y.wav:1"]);
    }

    #[test]
    fn test_lower_priority_never_interrupts() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "B"]));

        sched.handle_event(&event("A", 8));
        sched.handle_event(&event("B", 2));
        assert_eq!(backend.calls(), vec!["start:a.wav:0"]);
        assert_eq!(sched.active.as_ref().unwrap().event_type, "A");
    }

    #[test]
    fn test_start_failure_falls_through_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::default();
        backend.fail_on = vec!["b.wav".to_string()];
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "B", "C"]));

        sched.handle_event(&event("A", 5));
        sched.handle_event(&event("B", 3));
        sched.handle_event(&event("C", 3));

        // A finishes; B fails to start, so C plays instead
        sched.handle_finished(0);
        assert_eq!(
            backend.calls(),
            vec!["start:a.wav:0", "fail:b.wav", "start:c.wav:2"]
        );
        assert_eq!(sched.active.as_ref().unwrap().event_type, "C");
    }

    #[test]
    fn test_start_failure_with_empty_backlog_goes_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::default();
        backend.fail_on = vec!["a.wav".to_string()];
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A"]));

        sched.handle_event(&event("A", 5));
        assert!(sched.active.is_none());
        assert!(sched.backlog.is_empty());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A", "B", "C"]));

        sched.handle_event(&event("A", 3)); // token 0
        sched.handle_event(&event("B", 7)); // preempts, token 1
        sched.handle_event(&event("C", 1)); // backlogged behind B

        // The preempted playback's completion must not dequeue C
        sched.handle_finished(0);
        assert_eq!(sched.active.as_ref().unwrap().event_type, "B");
        assert_eq!(sched.backlog.len(), 1);

        sched.handle_finished(1);
        assert_eq!(sched.active.as_ref().unwrap().event_type, "C");
    }

    #[test]
    fn test_ignored_event_type_does_not_touch_playback() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut sched = scheduler(backend.clone(), config(dir.path(), &["A"]));

        sched.handle_event(&event("A", 5));
        sched.handle_event(&event("UNCONFIGURED", 100));
        assert_eq!(backend.calls(), vec!["start:a.wav:0"]);
        assert!(sched.backlog.is_empty());
    }

    #[test]
    fn test_missing_file_is_skipped_without_state_change() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let mut config = config(dir.path(), &["A"]);
        config.event_actions.insert(
            "GHOST".to_string(),
            EventAction::PlayFile {
                files: vec![AudioFileEntry {
                    path: "ghost.wav".into(),
                    weight: None,
                }],
            },
        );
        let mut sched = scheduler(backend.clone(), config);

        sched.handle_event(&event("GHOST", 100));
        assert!(backend.calls().is_empty());
        sched.handle_event(&event("A", 1));
        assert_eq!(backend.calls(), vec!["start:a.wav:0"]);
    }

    #[tokio::test]
    async fn test_run_loop_processes_channel_messages() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::default();
        let sched = scheduler(backend.clone(), config(dir.path(), &["A", "B"]));

        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(sched.run(rx, shutdown_rx));

        tx.send(SchedulerMsg::Event(event("A", 5))).await.unwrap();
        tx.send(SchedulerMsg::Finished(0)).await.unwrap();
        tx.send(SchedulerMsg::Event(event("B", 5))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        // Final stop comes from shutdown
        assert_eq!(
            backend.calls(),
            vec!["start:a.wav:0", "start:b.wav:1", "stop"]
        );
    }
}
