//! Playback backend capability
//!
//! The scheduler only ever talks to `AudioBackend`: start a resource, ask
//! for a best-effort stop, and receive completion notifications tagged with
//! the token the start was issued under. Completion covers natural end,
//! stop, and post-start errors alike so the backlog can never starve.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Identifies one issued playback; completions for tokens the scheduler no
/// longer considers active are ignored as stale
pub type PlaybackToken = u64;

/// Single-channel playback capability
pub trait AudioBackend: Send + 'static {
    /// Begin asynchronous playback of `path`, replacing any active one.
    ///
    /// Completion must be reported exactly once per successful start via the
    /// backend's finished callback. An `Err` return means nothing was
    /// started and no completion will follow.
    fn start(&mut self, path: &Path, token: PlaybackToken) -> Result<()>;

    /// Best-effort stop of the active playback. The scheduler clears its
    /// own active slot regardless, so a backend that cannot interrupt only
    /// causes a brief overlap, never a stall.
    fn stop(&mut self);
}

enum BackendCommand {
    Play(PathBuf, PlaybackToken),
    Stop,
    Shutdown,
}

/// rodio-based backend: a dedicated OS thread owns the output stream and
/// sinks (the stream handle is not `Send`) and polls the active sink for
/// completion between commands.
pub struct RodioBackend {
    cmd_tx: mpsc::Sender<BackendCommand>,
}

/// How often the backend thread checks the active sink for completion
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl RodioBackend {
    /// Spawn the backend thread. Fails if no audio output device is
    /// available; that is an operator problem, fatal at startup.
    pub fn spawn(on_finished: impl Fn(PlaybackToken) + Send + 'static) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("rodio-backend".into())
            .spawn(move || backend_thread(cmd_rx, init_tx, on_finished))
            .map_err(|e| Error::Backend(format!("failed to spawn backend thread: {e}")))?;

        match init_rx.recv() {
            Ok(Ok(())) => Ok(Self { cmd_tx }),
            Ok(Err(message)) => Err(Error::Backend(message)),
            Err(_) => Err(Error::Backend("backend thread died during init".into())),
        }
    }

    /// Stop any playback and terminate the backend thread
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(BackendCommand::Shutdown);
    }
}

impl AudioBackend for RodioBackend {
    fn start(&mut self, path: &Path, token: PlaybackToken) -> Result<()> {
        self.cmd_tx
            .send(BackendCommand::Play(path.to_path_buf(), token))
            .map_err(|_| Error::Backend("backend thread is gone".into()))
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(BackendCommand::Stop);
    }
}

fn backend_thread(
    cmd_rx: mpsc::Receiver<BackendCommand>,
    init_tx: mpsc::Sender<std::result::Result<(), String>>,
    on_finished: impl Fn(PlaybackToken),
) {
    // OutputStream must stay alive for the lifetime of all sinks
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => {
            let _ = init_tx.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = init_tx.send(Err(format!("no audio output device: {e}")));
            return;
        }
    };
    info!("Audio output device opened");

    let mut current: Option<(rodio::Sink, PlaybackToken)> = None;

    loop {
        match cmd_rx.recv_timeout(POLL_INTERVAL) {
            Ok(BackendCommand::Play(path, token)) => {
                // Any previous sink was already preempted by the scheduler;
                // its token is stale there, so no completion is reported
                if let Some((sink, old_token)) = current.take() {
                    debug!("Replacing active playback (token {old_token})");
                    sink.stop();
                }
                match open_sink(&handle, &path) {
                    Ok(sink) => {
                        debug!("Playing {} (token {token})", path.display());
                        current = Some((sink, token));
                    }
                    Err(e) => {
                        warn!("Failed to start {}: {}", path.display(), e);
                        on_finished(token);
                    }
                }
            }
            Ok(BackendCommand::Stop) => {
                if let Some((sink, token)) = current.take() {
                    sink.stop();
                    on_finished(token);
                }
            }
            Ok(BackendCommand::Shutdown) => {
                if let Some((sink, _)) = current.take() {
                    sink.stop();
                }
                info!("Audio backend thread stopping");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                error!("Backend command channel closed unexpectedly");
                return;
            }
        }

        // Natural completion: the sink drained its queued source
        if let Some((sink, token)) = &current {
            if sink.empty() {
                let token = *token;
                current = None;
                debug!("Playback finished naturally (token {token})");
                on_finished(token);
            }
        }
    }
}

fn open_sink(handle: &rodio::OutputStreamHandle, path: &Path) -> Result<rodio::Sink> {
    let file = BufReader::new(File::open(path)?);
    let source = rodio::Decoder::new(file)
        .map_err(|e| Error::Backend(format!("cannot decode {}: {e}", path.display())))?;
    let sink = rodio::Sink::try_new(handle)
        .map_err(|e| Error::Backend(format!("cannot open sink: {e}")))?;
    sink.append(source);
    Ok(sink)
}
