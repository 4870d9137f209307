//! mpv-backed media engine driven over its JSON IPC socket.

use super::{EndOfTrackCallback, EngineError, EngineStatus, MediaEngine, SeekDirection};
use crate::lock_unpoisoned as lock;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

const LOG_TARGET: &str = "r_playbot::engine::mpv";

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const OBSERVED_PROPERTIES: [&str; 5] = ["pause", "media-title", "duration", "time-pos", "volume"];

type ReplySender = oneshot::Sender<Result<Value, String>>;
type LoadSender = oneshot::Sender<Result<(), String>>;

/// State shared between the engine handle and the IPC reader task.
#[derive(Default)]
pub(super) struct Shared {
    pub(super) status: Mutex<EngineStatus>,
    pub(super) pending: Mutex<HashMap<u64, ReplySender>>,
    pub(super) load_waiter: Mutex<Option<LoadSender>>,
    pub(super) end_callback: Mutex<Option<EndOfTrackCallback>>,
}

/// Media engine that runs an idle `mpv` process and controls it through IPC.
pub struct MpvEngine {
    shared: Arc<Shared>,
    writer: TokioMutex<OwnedWriteHalf>,
    next_request_id: AtomicU64,
    reader_task: JoinHandle<()>,
    socket_path: PathBuf,
    _child: Child,
}

impl MpvEngine {
    /// Starts `mpv` in idle mode and connects to its IPC socket.
    #[instrument(skip(mpv_path, socket_path), fields(socket = %socket_path.display()))]
    pub async fn spawn(mpv_path: &str, socket_path: &Path, initial_volume: u32) -> Result<Self, EngineError> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }

        info!(target: LOG_TARGET, "Starting {} with IPC socket {}", mpv_path, socket_path.display());
        let child = Command::new(mpv_path)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg(format!("--volume={}", initial_volume))
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::ProcessError(format!("failed to start {}: {}", mpv_path, e)))?;

        let stream = connect_with_retry(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        let shared = Arc::new(Shared::default());
        lock(&shared.status).volume = initial_volume;
        let reader_task = tokio::spawn(read_events(BufReader::new(read_half), shared.clone()));

        let engine = MpvEngine {
            shared,
            writer: TokioMutex::new(write_half),
            next_request_id: AtomicU64::new(1),
            reader_task,
            socket_path: socket_path.to_path_buf(),
            _child: child,
        };

        for (index, name) in OBSERVED_PROPERTIES.iter().enumerate() {
            engine.command(json!(["observe_property", index + 1, name])).await?;
        }
        debug!(target: LOG_TARGET, "Observing {} mpv properties.", OBSERVED_PROPERTIES.len());

        Ok(engine)
    }

    /// Sends one IPC command and waits for its reply.
    async fn command(&self, args: Value) -> Result<Value, EngineError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.shared.pending).insert(request_id, reply_tx);

        let mut line = serde_json::to_vec(&json!({ "command": args, "request_id": request_id }))?;
        line.push(b'\n');
        trace!(target: LOG_TARGET, request_id, "Sending IPC command: {}", args);

        let write_result = {
            let mut writer = self.writer.lock().await;
            writer.write_all(&line).await
        };
        if let Err(e) = write_result {
            lock(&self.shared.pending).remove(&request_id);
            return Err(e.into());
        }

        match tokio::time::timeout(REPLY_TIMEOUT, reply_rx).await {
            Ok(Ok(Ok(data))) => Ok(data),
            Ok(Ok(Err(reason))) => Err(EngineError::CommandRejected(format!("{}: {}", args, reason))),
            Ok(Err(_)) => Err(EngineError::IpcError("engine connection closed".to_string())),
            Err(_) => {
                lock(&self.shared.pending).remove(&request_id);
                Err(EngineError::IpcError(format!("no reply to request {} within {:?}", request_id, REPLY_TIMEOUT)))
            }
        }
    }
}

#[async_trait]
impl MediaEngine for MpvEngine {
    #[instrument(skip(self))]
    async fn play_stream(&self, link: &str) -> Result<(), EngineError> {
        let (load_tx, load_rx) = oneshot::channel();
        if let Some(previous) = lock(&self.shared.load_waiter).replace(load_tx) {
            let _ = previous.send(Err("superseded by a newer load".to_string()));
        }

        if let Err(e) = self.command(json!(["loadfile", link, "replace"])).await {
            lock(&self.shared.load_waiter).take();
            return Err(e);
        }

        match tokio::time::timeout(LOAD_TIMEOUT, load_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(reason))) => return Err(EngineError::LoadFailed(reason)),
            Ok(Err(_)) => return Err(EngineError::IpcError("engine connection closed".to_string())),
            Err(_) => {
                lock(&self.shared.load_waiter).take();
                return Err(EngineError::LoadFailed(format!("no confirmation within {:?}", LOAD_TIMEOUT)));
            }
        }

        // The title property update can trail the load event.
        let title = match self.command(json!(["get_property", "media-title"])).await {
            Ok(value) => value.as_str().map(str::to_string),
            Err(e) => {
                warn!(target: LOG_TARGET, "Could not read media title after load: {}", e);
                None
            }
        };

        let mut status = lock(&self.shared.status);
        status.is_playing = true;
        status.paused = false;
        if let Some(title) = title {
            status.media_title = title;
        }
        info!(target: LOG_TARGET, "Loaded '{}'", status.media_title);
        Ok(())
    }

    async fn pause_stream(&self) -> Result<(), EngineError> {
        self.command(json!(["set_property", "pause", true])).await?;
        lock(&self.shared.status).paused = true;
        Ok(())
    }

    async fn resume_stream(&self) -> Result<(), EngineError> {
        self.command(json!(["set_property", "pause", false])).await?;
        lock(&self.shared.status).paused = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.command(json!(["stop"])).await?;
        let mut status = lock(&self.shared.status);
        status.is_playing = false;
        status.paused = false;
        status.playback_time = None;
        Ok(())
    }

    async fn seek(&self, direction: SeekDirection, seconds: i64) -> Result<(), EngineError> {
        let offset = match direction {
            SeekDirection::Forward => seconds,
            SeekDirection::Back => -seconds,
        };
        self.command(json!(["seek", offset, "relative"])).await.map(|_| ())
    }

    async fn set_volume(&self, volume: u32) -> Result<(), EngineError> {
        self.command(json!(["set_property", "volume", volume])).await?;
        lock(&self.shared.status).volume = volume;
        Ok(())
    }

    fn status(&self) -> EngineStatus {
        lock(&self.shared.status).clone()
    }

    fn set_end_of_track_callback(&self, callback: EndOfTrackCallback) {
        *lock(&self.shared.end_callback) = Some(callback);
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.reader_task.abort();
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            trace!(target: LOG_TARGET, "Socket cleanup skipped: {}", e);
        }
    }
}

async fn connect_with_retry(socket_path: &Path) -> Result<UnixStream, EngineError> {
    let mut last_error = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        match UnixStream::connect(socket_path).await {
            Ok(stream) => {
                debug!(target: LOG_TARGET, attempt, "Connected to mpv IPC socket.");
                return Ok(stream);
            }
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    }
    Err(EngineError::IpcError(format!(
        "could not connect to {}: {}",
        socket_path.display(),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

async fn read_events(mut reader: BufReader<OwnedReadHalf>, shared: Arc<Shared>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                warn!(target: LOG_TARGET, "mpv closed its IPC connection.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(target: LOG_TARGET, "Failed to read from mpv IPC socket: {}", e);
                break;
            }
        }

        match serde_json::from_str::<Value>(line.trim()) {
            Ok(message) => handle_message(&shared, &message),
            Err(e) => warn!(target: LOG_TARGET, "Ignoring malformed IPC line ({}): {}", e, line.trim()),
        }
    }

    // Dropping the senders fails every outstanding request.
    lock(&shared.pending).clear();
    lock(&shared.load_waiter).take();
    {
        let mut status = lock(&shared.status);
        status.is_playing = false;
        status.paused = false;
    }
    fire_end_of_track(&shared);
}

/// Applies one decoded IPC message (reply or event) to the shared state.
pub(super) fn handle_message(shared: &Shared, message: &Value) {
    if let Some(request_id) = message.get("request_id").and_then(Value::as_u64) {
        if let Some(reply) = lock(&shared.pending).remove(&request_id) {
            let outcome = match message.get("error").and_then(Value::as_str) {
                None | Some("success") => Ok(message.get("data").cloned().unwrap_or(Value::Null)),
                Some(reason) => Err(reason.to_string()),
            };
            let _ = reply.send(outcome);
        }
        return;
    }

    match message.get("event").and_then(Value::as_str) {
        Some("property-change") => apply_property(shared, message),
        Some("file-loaded") => {
            lock(&shared.status).is_playing = true;
            if let Some(waiter) = lock(&shared.load_waiter).take() {
                let _ = waiter.send(Ok(()));
            }
        }
        Some("end-file") => {
            let reason = message.get("reason").and_then(Value::as_str).unwrap_or("unknown");
            debug!(target: LOG_TARGET, reason, "Track ended.");
            {
                let mut status = lock(&shared.status);
                status.is_playing = false;
                status.paused = false;
                status.playback_time = None;
            }

            if reason == "error" {
                if let Some(waiter) = lock(&shared.load_waiter).take() {
                    let detail = message
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string();
                    let _ = waiter.send(Err(detail));
                    return;
                }
            }

            // Explicit stops and replacements ("stop", "redirect") are not natural ends.
            if matches!(reason, "eof" | "error" | "quit") {
                fire_end_of_track(shared);
            }
        }
        Some(other) => trace!(target: LOG_TARGET, "Unhandled mpv event: {}", other),
        None => {}
    }
}

fn apply_property(shared: &Shared, message: &Value) {
    let Some(name) = message.get("name").and_then(Value::as_str) else {
        return;
    };
    let data = message.get("data");
    let mut status = lock(&shared.status);
    match name {
        "pause" => status.paused = data.and_then(Value::as_bool).unwrap_or(false),
        "media-title" => {
            status.media_title = data.and_then(Value::as_str).unwrap_or_default().to_string();
        }
        "duration" => status.duration = data.and_then(Value::as_f64),
        "time-pos" => status.playback_time = data.and_then(Value::as_f64),
        "volume" => {
            if let Some(volume) = data.and_then(Value::as_f64) {
                status.volume = volume.round().max(0.0) as u32;
            }
        }
        _ => {}
    }
}

fn fire_end_of_track(shared: &Shared) {
    let callback = lock(&shared.end_callback).clone();
    if let Some(callback) = callback {
        callback();
    }
}
