//! Configuration types and YAML loading
//!
//! All configuration is loaded once at startup; a missing or unparsable
//! file is fatal before any component starts. There is no hot reload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Load and deserialize a YAML configuration file
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let config = serde_yaml::from_str(&text)
        .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Priority table mapping event types to playback priorities
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityConfig {
    /// Priority assigned to event types not listed in `priorities`
    #[serde(default)]
    pub default_priority: i32,
    #[serde(default)]
    pub priorities: HashMap<String, i32>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            default_priority: 0,
            priorities: HashMap::new(),
        }
    }
}

impl PriorityConfig {
    pub fn priority_for(&self, event_type: &str) -> i32 {
        self.priorities
            .get(event_type)
            .copied()
            .unwrap_or(self.default_priority)
    }
}

/// Referee multicast ingest settings
#[derive(Debug, Clone, Deserialize)]
pub struct MulticastConfig {
    #[serde(default = "default_multicast_group")]
    pub group: String,
    #[serde(default = "default_multicast_port")]
    pub port: u16,
    /// Local interface address to receive on; `None` lets the OS choose
    #[serde(default)]
    pub interface: Option<String>,
}

fn default_multicast_group() -> String {
    "224.5.23.1".to_string()
}

fn default_multicast_port() -> u16 {
    10003
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            group: default_multicast_group(),
            port: default_multicast_port(),
            interface: None,
        }
    }
}

/// Orchestrator process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub multicast: MulticastConfig,
    /// Address the bus publisher binds to
    #[serde(default = "default_bus_bind")]
    pub bus_bind_addr: String,
    /// Period of the unconditional state re-publish timer
    #[serde(default = "default_state_interval")]
    pub state_publish_interval_secs: f64,
}

fn default_bus_bind() -> String {
    "127.0.0.1:5555".to_string()
}

fn default_state_interval() -> f64 {
    1.0
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            multicast: MulticastConfig::default(),
            bus_bind_addr: default_bus_bind(),
            state_publish_interval_secs: default_state_interval(),
        }
    }
}

/// One candidate audio file with an optional selection weight
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AudioFileEntry {
    pub path: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// What to do when an event of a given type arrives
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventAction {
    /// No playback for this event type
    Ignore,
    /// Play one file chosen from the candidate list
    PlayFile { files: Vec<AudioFileEntry> },
}

impl Default for EventAction {
    fn default() -> Self {
        EventAction::Ignore
    }
}

/// Audio playback process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Address of the orchestrator's bus publisher
    #[serde(default = "default_bus_bind")]
    pub bus_addr: String,
    /// Base directory audio file paths are resolved against
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,
    /// Playback backlog capacity (oldest entry evicted when full)
    #[serde(default = "default_backlog_capacity")]
    pub backlog_capacity: usize,
    #[serde(default)]
    pub event_actions: HashMap<String, EventAction>,
    /// Action for event types without an `event_actions` entry
    #[serde(default)]
    pub default_action: EventAction,
}

fn default_sounds_dir() -> PathBuf {
    PathBuf::from("sounds")
}

fn default_backlog_capacity() -> usize {
    2
}

impl AudioConfig {
    /// Action for an event type, falling back to the default action
    pub fn action_for(&self, event_type: &str) -> &EventAction {
        self.event_actions
            .get(event_type)
            .unwrap_or(&self.default_action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_priority_lookup_with_default() {
        let yaml = r#"
default_priority: 1
priorities:
  COMMAND_STOP: 5
  EVENT_GOAL_CONFIRMED_YELLOW: 10
"#;
        let config: PriorityConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.priority_for("COMMAND_STOP"), 5);
        assert_eq!(config.priority_for("EVENT_GOAL_CONFIRMED_YELLOW"), 10);
        assert_eq!(config.priority_for("EVENT_NEVER_HEARD_OF"), 1);
    }

    #[test]
    fn test_orchestrator_config_defaults() {
        let config: OrchestratorConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.multicast.group, "224.5.23.1");
        assert_eq!(config.multicast.port, 10003);
        assert_eq!(config.state_publish_interval_secs, 1.0);
    }

    #[test]
    fn test_audio_config_actions() {
        let yaml = r#"
bus_addr: "127.0.0.1:5555"
event_actions:
  EVENT_GOAL_CONFIRMED_YELLOW:
    action: play_file
    files:
      - path: goal_a.wav
        weight: 3
      - path: goal_b.wav
  COMMAND_HALT:
    action: ignore
"#;
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        match config.action_for("EVENT_GOAL_CONFIRMED_YELLOW") {
            EventAction::PlayFile { files } => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].weight, Some(3.0));
                assert_eq!(files[1].weight, None);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(config.action_for("COMMAND_HALT"), &EventAction::Ignore);
        // Unlisted types fall back to the default action
        assert_eq!(config.action_for("EVENT_UNLISTED"), &EventAction::Ignore);
        assert_eq!(config.backlog_capacity, 2);
    }

    #[test]
    fn test_load_yaml_missing_file_is_config_error() {
        let err = load_yaml::<PriorityConfig>(Path::new("/nonexistent/nope.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_yaml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_priority: 2").unwrap();
        let config: PriorityConfig = load_yaml(file.path()).unwrap();
        assert_eq!(config.default_priority, 2);
    }
}
