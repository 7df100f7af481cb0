//! mpv driven over its JSON IPC socket.
//!
//! One reader thread per connection dispatches what mpv writes back:
//! command replies (matched by `request_id`), `property-change` events (to
//! observers, by observer id), `log-message` events and the
//! `start-file` / `playback-restart` / `end-file` events that resolve load
//! tickets.
//!
//! A ticket only counts once mpv has acknowledged its `loadfile`: events
//! read before that reply belong to the previous file. When the reply
//! carries a `playlist_entry_id` (mpv 0.38+), events are also matched
//! against that entry.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use ipmconfig::Config;
use parking_lot::{Condvar, Mutex};
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};

use crate::engine::{EngineLogMessage, LoadTicket, MediaEngine, PropertyChange};
use crate::errors::EngineError;

const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const QUIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MpvOptions {
    pub binary: String,
    pub socket_path: PathBuf,
    pub vo: String,
    pub hwdec: String,
    pub startup_timeout: Duration,
    pub request_timeout: Duration,
}

impl MpvOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.get_player_binary(),
            socket_path: PathBuf::from(config.get_player_ipc_socket()),
            vo: config.get_player_vo(),
            hwdec: config.get_player_hwdec(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Command line of the player process.
    pub fn arguments(&self) -> Vec<String> {
        vec![
            "--idle=yes".to_string(),
            format!("--input-ipc-server={}", self.socket_path.display()),
            format!("--vo={}", self.vo),
            format!("--hwdec={}", self.hwdec),
            "--demuxer-lavf-o=reconnect=1".to_string(),
            "--deinterlace=no".to_string(),
            "--keepaspect=no".to_string(),
            "--geometry=100%:100%".to_string(),
            "--fullscreen=yes".to_string(),
            "--loop-playlist=inf".to_string(),
            "--no-terminal".to_string(),
        ]
    }
}

#[derive(Debug, Default)]
struct LoadProgress {
    issued: u64,
    /// Latest ticket whose `loadfile` mpv has accepted
    acknowledged: u64,
    acknowledged_entry: Option<u64>,
    playing_entry: Option<u64>,
    started: u64,
    failed: u64,
    last_source: String,
    closed: bool,
}

impl LoadProgress {
    /// Whether an event about `entry` concerns the acknowledged load.
    fn concerns_current(&self, entry: Option<u64>) -> bool {
        match (self.acknowledged_entry, entry) {
            (Some(expected), Some(entry)) => expected == entry,
            _ => true,
        }
    }
}

struct PendingReply {
    command: String,
    load: Option<(u64, String)>,
    tx: Sender<Result<Value, EngineError>>,
}

fn entry_id(value: &Value) -> Option<u64> {
    value.get("playlist_entry_id").and_then(Value::as_u64)
}

#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, PendingReply>>,
    observers: Mutex<HashMap<u64, Sender<PropertyChange>>>,
    log_subscribers: Mutex<Vec<Sender<EngineLogMessage>>>,
    loads: Mutex<LoadProgress>,
    load_changed: Condvar,
}

impl Shared {
    fn dispatch(&self, message: &Value) {
        if let Some(event) = message.get("event").and_then(Value::as_str) {
            self.on_event(event, message);
            return;
        }

        let Some(id) = message.get("request_id").and_then(Value::as_u64) else {
            trace!("Ignoring mpv message without request_id: {}", message);
            return;
        };

        let Some(pending) = self.pending.lock().remove(&id) else {
            debug!(request_id = id, "Reply for an abandoned mpv request");
            return;
        };

        let result = match message.get("error").and_then(Value::as_str) {
            None | Some("success") => Ok(message.get("data").cloned().unwrap_or(Value::Null)),
            Some(err) => Err(EngineError::Command(pending.command, err.to_string())),
        };

        // Before the next line is read: events after the reply belong to this load
        if let (Ok(data), Some((ticket, source))) = (&result, pending.load) {
            let mut loads = self.loads.lock();
            loads.acknowledged = ticket;
            loads.acknowledged_entry = entry_id(data);
            loads.last_source = source;
            trace!(ticket, entry = ?loads.acknowledged_entry, "loadfile acknowledged");
        }
        let _ = pending.tx.send(result);
    }

    fn on_event(&self, event: &str, message: &Value) {
        match event {
            "property-change" => {
                let Some(id) = message.get("id").and_then(Value::as_u64) else {
                    return;
                };
                let change = PropertyChange {
                    name: message
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    value: message.get("data").cloned().unwrap_or(Value::Null),
                };
                let mut observers = self.observers.lock();
                let delivered = observers.get(&id).map(|tx| tx.send(change).is_ok());
                if delivered == Some(false) {
                    observers.remove(&id);
                }
            }
            "log-message" => {
                let field = |name: &str| {
                    message
                        .get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim_end()
                };
                let log = EngineLogMessage::new(field("level"), field("prefix"), field("text"));
                emit_engine_log(&log);
                self.log_subscribers
                    .lock()
                    .retain(|tx| tx.send(log.clone()).is_ok());
            }
            "start-file" => {
                self.loads.lock().playing_entry = entry_id(message);
            }
            "playback-restart" => {
                let mut loads = self.loads.lock();
                if loads.concerns_current(loads.playing_entry) {
                    loads.started = loads.acknowledged;
                    self.load_changed.notify_all();
                } else {
                    trace!(entry = ?loads.playing_entry, "Restart of a superseded entry");
                }
            }
            "end-file" => {
                if message.get("reason").and_then(Value::as_str) != Some("error") {
                    return;
                }
                let mut loads = self.loads.lock();
                if loads.concerns_current(entry_id(message)) {
                    loads.failed = loads.acknowledged;
                    self.load_changed.notify_all();
                } else {
                    debug!(entry = ?entry_id(message), "Superseded entry ended with an error");
                }
            }
            other => trace!(event = other, "mpv event"),
        }
    }

    fn close(&self) {
        {
            let mut loads = self.loads.lock();
            loads.closed = true;
            self.load_changed.notify_all();
        }
        // Dropping the senders wakes every waiter with a disconnect
        self.pending.lock().clear();
        self.observers.lock().clear();
        self.log_subscribers.lock().clear();
    }
}

fn emit_engine_log(log: &EngineLogMessage) {
    match log.level.as_str() {
        "fatal" | "error" => {
            error!(target: "ipmcontrol::engine", component = log.component.as_str(), "{}", log.text)
        }
        "warn" => {
            warn!(target: "ipmcontrol::engine", component = log.component.as_str(), "{}", log.text)
        }
        "info" => {
            info!(target: "ipmcontrol::engine", component = log.component.as_str(), "{}", log.text)
        }
        _ => debug!(target: "ipmcontrol::engine", component = log.component.as_str(), "{}", log.text),
    }
}

fn read_events(stream: UnixStream, shared: Arc<Shared>) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("mpv IPC read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(message) => shared.dispatch(&message),
            Err(e) => warn!("Unparsable mpv IPC line ({}): {}", e, line),
        }
    }
    info!("mpv IPC connection closed");
    shared.close();
}

fn wait_for_socket(path: &Path, timeout: Duration) -> Result<UnixStream, EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() >= deadline => {
                return Err(EngineError::Connect(path.display().to_string(), e));
            }
            Err(_) => thread::sleep(SOCKET_POLL_INTERVAL),
        }
    }
}

/// [`MediaEngine`] backed by an mpv process.
pub struct MpvEngine {
    writer: Mutex<UnixStream>,
    shared: Arc<Shared>,
    /// Keeps ticket order and `loadfile` order identical
    load_order: Mutex<()>,
    next_request_id: AtomicU64,
    next_observer_id: AtomicU64,
    request_timeout: Duration,
    child: Mutex<Option<Child>>,
}

impl MpvEngine {
    /// Launches mpv in idle mode and connects to its IPC socket.
    pub fn spawn(options: &MpvOptions) -> Result<Self, EngineError> {
        let _ = std::fs::remove_file(&options.socket_path);

        let mut child = Command::new(&options.binary)
            .args(options.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(options.binary.clone(), e))?;
        info!(pid = child.id(), "🎬 mpv started");

        let connected = wait_for_socket(&options.socket_path, options.startup_timeout)
            .and_then(|stream| Self::connect(stream, options.request_timeout));

        match connected {
            Ok(engine) => {
                *engine.child.lock() = Some(child);
                Ok(engine)
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }

    /// Drives an mpv instance already listening on `stream`.
    pub fn connect(stream: UnixStream, request_timeout: Duration) -> Result<Self, EngineError> {
        let reader = stream.try_clone()?;
        let shared = Arc::new(Shared::default());

        let reader_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("mpv-ipc-reader".into())
            .spawn(move || read_events(reader, reader_shared))?;

        let engine = Self {
            writer: Mutex::new(stream),
            shared,
            load_order: Mutex::new(()),
            next_request_id: AtomicU64::new(1),
            next_observer_id: AtomicU64::new(1),
            request_timeout,
            child: Mutex::new(None),
        };

        engine.command(vec![json!("request_log_messages"), json!("info")])?;
        Ok(engine)
    }

    fn command(&self, args: Vec<Value>) -> Result<Value, EngineError> {
        self.request(args, None)
    }

    fn request(&self, args: Vec<Value>, load: Option<(u64, String)>) -> Result<Value, EngineError> {
        let name = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = bounded(1);

        self.shared.pending.lock().insert(
            id,
            PendingReply {
                command: name.clone(),
                load,
                tx,
            },
        );
        if self.shared.loads.lock().closed {
            self.shared.pending.lock().remove(&id);
            return Err(EngineError::Disconnected);
        }

        let mut line = serde_json::to_vec(&json!({ "command": args, "request_id": id }))?;
        line.push(b'\n');
        trace!(request_id = id, command = name.as_str(), "mpv IPC request");

        if let Err(e) = self.writer.lock().write_all(&line) {
            self.shared.pending.lock().remove(&id);
            return Err(e.into());
        }

        match rx.recv_timeout(self.request_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.shared.pending.lock().remove(&id);
                Err(EngineError::Timeout(name))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }

    /// Asks mpv to quit and reaps the process.
    pub fn shutdown(&self) {
        if let Err(e) = self.command(vec![json!("quit")]) {
            debug!("mpv quit command: {}", e);
        }

        let Some(mut child) = self.child.lock().take() else {
            return;
        };

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("mpv exited with {}", status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(SOCKET_POLL_INTERVAL),
                _ => {
                    warn!("mpv did not quit, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
            }
        }
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.lock().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl MediaEngine for MpvEngine {
    fn load(&self, source: &str) -> Result<LoadTicket, EngineError> {
        let _order = self.load_order.lock();
        let ticket = {
            let mut loads = self.shared.loads.lock();
            loads.issued += 1;
            LoadTicket(loads.issued)
        };
        debug!(ticket = ticket.0, source, "loadfile");

        self.request(
            vec![json!("loadfile"), json!(source), json!("replace")],
            Some((ticket.0, source.to_string())),
        )?;
        Ok(ticket)
    }

    fn wait_until_started(&self, ticket: LoadTicket) -> Result<(), EngineError> {
        let mut loads = self.shared.loads.lock();
        loop {
            if loads.started >= ticket.0 {
                return Ok(());
            }
            if loads.failed >= ticket.0 {
                return Err(EngineError::LoadFailed(loads.last_source.clone()));
            }
            if loads.closed {
                return Err(EngineError::Disconnected);
            }
            self.shared.load_changed.wait(&mut loads);
        }
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.command(vec![json!("stop")]).map(|_| ())
    }

    fn set_property(&self, name: &str, value: &str) -> Result<(), EngineError> {
        self.command(vec![json!("set_property"), json!(name), json!(value)])
            .map(|_| ())
    }

    fn get_property(&self, name: &str) -> Result<Value, EngineError> {
        self.command(vec![json!("get_property"), json!(name)])
    }

    fn observe(&self, name: &str) -> Result<Receiver<PropertyChange>, EngineError> {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        self.shared.observers.lock().insert(id, tx);

        if let Err(e) = self.command(vec![json!("observe_property"), json!(id), json!(name)]) {
            self.shared.observers.lock().remove(&id);
            return Err(e);
        }
        Ok(rx)
    }

    fn log_messages(&self) -> Receiver<EngineLogMessage> {
        let (tx, rx) = unbounded();
        self.shared.log_subscribers.lock().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_carry_player_options() {
        let options = MpvOptions {
            binary: "mpv".into(),
            socket_path: PathBuf::from("/tmp/test.sock"),
            vo: "gpu".into(),
            hwdec: "auto-safe".into(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        let args = options.arguments();
        assert!(args.contains(&"--idle=yes".to_string()));
        assert!(args.contains(&"--input-ipc-server=/tmp/test.sock".to_string()));
        assert!(args.contains(&"--hwdec=auto-safe".to_string()));
        assert!(args.contains(&"--loop-playlist=inf".to_string()));
    }

    #[test]
    fn error_reply_maps_to_command_error() {
        let shared = Shared::default();
        let (tx, rx) = bounded(1);
        shared.pending.lock().insert(7, PendingReply { command: "get_property".into(), load: None, tx });

        shared.dispatch(&json!({"request_id": 7, "error": "property unavailable"}));

        match rx.recv() {
            Ok(Err(EngineError::Command(cmd, err))) => {
                assert_eq!(cmd, "get_property");
                assert_eq!(err, "property unavailable");
            }
            other => panic!("unexpected reply {:?}", other.map(|r| r.is_ok())),
        }
    }

    #[test]
    fn close_disconnects_waiters() {
        let shared = Shared::default();
        let (tx, rx) = bounded::<Result<Value, EngineError>>(1);
        shared.pending.lock().insert(1, PendingReply { command: "stop".into(), load: None, tx });
        shared.close();
        assert!(rx.recv().is_err());
        assert!(shared.loads.lock().closed);
    }
}
