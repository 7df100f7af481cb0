//! Logs temps réel : un buffer circulaire alimenté par une couche `tracing`,
//! exposé en SSE (`/log-sse`), en JSON (`/log-dump`) et réglable à chaud via
//! `/api/logs/level`.

mod sselayer;

pub use sselayer::SseLayer;

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use ipmconfig::get_config;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{Level, info};
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const LIVE_CHANNEL_CAPACITY: usize = 1000;
const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

type LevelHandle = reload::Handle<LevelFilter, Registry>;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    fn level(&self) -> Option<Level> {
        Level::from_str(&self.level).ok()
    }
}

/// Historique borné des logs et diffusion en direct
#[derive(Clone)]
pub struct LogState {
    history: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    live: broadcast::Sender<LogEntry>,
    level: Arc<RwLock<Level>>,
    handle: Option<Arc<LevelHandle>>,
}

impl LogState {
    pub fn new(capacity: usize, handle: LevelHandle) -> Self {
        Self {
            handle: Some(Arc::new(handle)),
            ..Self::detached(capacity)
        }
    }

    /// État qui ne pilote aucun subscriber global
    pub fn detached(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            live: broadcast::channel(LIVE_CHANNEL_CAPACITY).0,
            level: Arc::new(RwLock::new(Level::TRACE)),
            handle: None,
        }
    }

    /// Change le niveau minimum, y compris pour la console
    pub fn set_max_level(&self, level: Level) {
        *self.level.write() = level;
        if let Some(handle) = &self.handle {
            if let Err(e) = handle.reload(LevelFilter::from_level(level)) {
                eprintln!("❌ Cannot reload log level filter: {}", e);
            }
        }
    }

    pub fn get_max_level(&self) -> Level {
        *self.level.read()
    }

    pub(crate) fn push(&self, entry: LogEntry) {
        {
            let mut history = self.history.write();
            while history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }
        // Aucun abonné SSE n'est pas une erreur
        let _ = self.live.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.live.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        self.history.read().iter().cloned().collect()
    }

    fn is_visible(&self, entry: &LogEntry) -> bool {
        entry.level().is_some_and(|level| level <= self.get_max_level())
    }
}

/// Filtre de `/log-sse` et `/log-dump`
///
/// `levels` est une liste séparée par des virgules (`error,warn`) ; vide ou
/// absente, tous les niveaux passent. `search` porte sur le message et la
/// cible.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub levels: Option<String>,
    pub search: Option<String>,
}

impl LogQuery {
    fn accepts(&self, entry: &LogEntry) -> bool {
        let level_ok = match self.levels.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(levels) => levels
                .split(',')
                .any(|wanted| wanted.trim().eq_ignore_ascii_case(&entry.level)),
        };
        let search_ok = self
            .search
            .as_deref()
            .is_none_or(|s| entry.message.contains(s) || entry.target.contains(s));
        level_ok && search_ok
    }
}

fn to_event(entry: &LogEntry) -> Option<Result<Event, axum::Error>> {
    serde_json::to_string(entry)
        .ok()
        .map(|json| Ok(Event::default().data(json)))
}

/// Historique filtré puis flux temps réel
pub async fn log_sse(
    State(state): State<LogState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();

    let stream = async_stream::stream! {
        for entry in history {
            if state.is_visible(&entry) && query.accepts(&entry) {
                if let Some(event) = to_event(&entry) {
                    yield event;
                }
            }
        }

        loop {
            let entry = match rx.recv().await {
                Ok(entry) => entry,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if state.is_visible(&entry) && query.accepts(&entry) {
                if let Some(event) = to_event(&entry) {
                    yield event;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn log_dump(
    State(state): State<LogState>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<LogEntry>> {
    Json(
        state
            .dump()
            .into_iter()
            .filter(|entry| query.accepts(entry))
            .collect(),
    )
}

/// Installe le subscriber global (buffer SSE + console optionnelle)
///
/// Lit `host.logger.min_level`, `host.logger.buffer_capacity` et
/// `host.logger.enable_console`.
pub fn init_logging() -> LogState {
    let config = get_config();

    let level = config
        .get_log_min_level()
        .ok()
        .and_then(|l| Level::from_str(&l).ok())
        .unwrap_or(Level::INFO);
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(level));

    let state = LogState::new(config.get_log_cache_size().unwrap_or(500), handle);
    *state.level.write() = level;

    let console = config
        .get_log_enable_console()
        .unwrap_or(true)
        .then(|| tracing_subscriber::fmt::layer().with_target(true));

    let installed = Registry::default()
        .with(filter)
        .with(SseLayer::new(state.clone()))
        .with(console)
        .try_init();
    if let Err(e) = installed {
        eprintln!("⚠️ Global tracing subscriber already installed: {}", e);
    }

    state
}

/// Niveau de log courant
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LogLevel {
    /// ERROR, WARN, INFO, DEBUG ou TRACE
    pub level: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogLevelInfo {
    pub level: String,
    pub available: Vec<String>,
}

impl LogLevelInfo {
    fn of(level: Level) -> Self {
        Self {
            level: level.as_str().to_string(),
            available: LEVELS.iter().map(|l| l.as_str().to_string()).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/level",
    responses(
        (status = 200, description = "Niveau courant", body = LogLevelInfo)
    ),
    tag = "logs"
)]
async fn get_log_level(State(state): State<LogState>) -> Json<LogLevelInfo> {
    Json(LogLevelInfo::of(state.get_max_level()))
}

#[utoipa::path(
    put,
    path = "/level",
    request_body = LogLevel,
    responses(
        (status = 200, description = "Niveau appliqué", body = LogLevelInfo),
        (status = 400, description = "Niveau inconnu")
    ),
    tag = "logs"
)]
async fn put_log_level(
    State(state): State<LogState>,
    Json(request): Json<LogLevel>,
) -> Result<Json<LogLevelInfo>, (StatusCode, String)> {
    let level = Level::from_str(request.level.trim()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown log level '{}'", request.level),
        )
    })?;

    state.set_max_level(level);
    info!("Log level set to {}", level);
    Ok(Json(LogLevelInfo::of(level)))
}

/// Router de `/api/logs`
pub fn create_logs_router(state: LogState) -> Router {
    Router::new()
        .route("/level", get(get_log_level).put(put_log_level))
        .with_state(state)
}

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(get_log_level, put_log_level),
    components(schemas(LogLevel, LogLevelInfo)),
    tags((name = "logs", description = "Niveau de log à chaud"))
)]
pub struct LogsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: &str, target: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: chrono::Utc::now(),
            level: level.to_string(),
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn history_keeps_latest_entries() {
        let state = LogState::detached(2);
        for message in ["one", "two", "three"] {
            state.push(entry("INFO", "ipmpv", message));
        }

        let messages: Vec<_> = state.dump().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn visibility_follows_max_level() {
        let state = LogState::detached(10);
        state.set_max_level(Level::INFO);

        assert!(state.is_visible(&entry("ERROR", "t", "m")));
        assert!(state.is_visible(&entry("INFO", "t", "m")));
        assert!(!state.is_visible(&entry("DEBUG", "t", "m")));
        assert!(!state.is_visible(&entry("bogus", "t", "m")));
    }

    #[test]
    fn query_filters_levels_and_text() {
        let e = entry("WARN", "ipmcontrol::engine", "ffmpeg: Failed to open");

        assert!(LogQuery::default().accepts(&e));
        assert!(
            LogQuery {
                levels: Some("error, warn".into()),
                search: None,
            }
            .accepts(&e)
        );
        assert!(
            !LogQuery {
                levels: Some("error".into()),
                search: None,
            }
            .accepts(&e)
        );
        assert!(
            LogQuery {
                levels: None,
                search: Some("engine".into()),
            }
            .accepts(&e)
        );
    }

    #[test]
    fn level_info_lists_all_levels() {
        let info = LogLevelInfo::of(Level::DEBUG);
        assert_eq!(info.level, "DEBUG");
        assert_eq!(info.available, vec!["ERROR", "WARN", "INFO", "DEBUG", "TRACE"]);
    }
}
