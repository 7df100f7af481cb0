//! # IPMPV Configuration Module
//!
//! This module provides configuration management for IPMPV, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides (including the legacy `IPMPV_*` variables)
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use ipmconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! let playlist = config.get_playlist_url();
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use ipmutils::guess_local_ip;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{info, warn};

// Modules conditionnels pour l'API REST
#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod openapi;

#[cfg(feature = "api")]
pub use openapi::ApiDoc;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("ipmpv.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load IPMPV configuration"));
}

const ENV_CONFIG_DIR: &str = "IPMPV_CONFIG";
const LOCAL_CONFIG_DIR: &str = ".ipmpv";
const ENV_PREFIX: &str = "IPMPV_CONFIG__";

/// Variables d'environnement historiques et leur chemin dans la configuration.
const LEGACY_ENV_VARS: &[(&str, &[&str])] = &[
    ("IPMPV_M3U_URL", &["playlist", "url"]),
    ("IPMPV_RETROARCH_CMD", &["retroarch", "command"]),
    ("IPMPV_CORNER_RADIUS", &["osd", "corner_radius"]),
];

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_PLAYLIST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHANNEL_OSD_TIMEOUT_MS: u64 = 5000;
const DEFAULT_VOLUME_OSD_TIMEOUT_MS: u64 = 2000;
const DEFAULT_OSD_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_OSD_CORNER_RADIUS: usize = 15;
const DEFAULT_VOLUME_STEP: usize = 5;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path)? {
                Value::Number(n) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                Value::String(s) => Ok(s.trim().parse::<usize>().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for durations stored in milliseconds
macro_rules! impl_millis_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Duration {
            let millis = match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().unwrap_or($default),
                _ => $default,
            };
            Duration::from_millis(millis)
        }

        pub fn $setter(&self, value: Duration) -> Result<()> {
            let n = Number::from(value.as_millis() as u64);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => s,
                _ => $default.to_string(),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration d'IPMPV : l'arbre YAML fusionné et le fichier où il est
/// persisté.
///
/// ```no_run
/// use ipmconfig::get_config;
///
/// let config = get_config();
/// println!("HTTP port: {}", config.get_http_port());
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data.lock().clone()),
        }
    }
}

/// Répertoires candidats, du plus prioritaire au moins prioritaire.
fn candidate_dirs(directory: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if !directory.is_empty() {
        candidates.push(PathBuf::from(directory));
    }
    if let Some(dir) = env::var_os(ENV_CONFIG_DIR) {
        candidates.push(PathBuf::from(dir));
    }
    candidates.push(PathBuf::from(LOCAL_CONFIG_DIR));
    if let Some(home) = home_dir() {
        candidates.push(home.join(LOCAL_CONFIG_DIR));
    }
    candidates
}

/// Le répertoire doit exister (il est créé au besoin) et être inscriptible.
fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"ipmpv")
        .with_context(|| format!("Config directory {} is not writable", dir.display()))?;
    fs::remove_file(&probe)?;
    Ok(())
}

/// Valeur au bout de `path`, clés comparées en minuscules.
fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter().enumerate().try_fold(root, |node, (depth, key)| {
        let Value::Mapping(map) = node else {
            bail!("{} is not a section", path[..depth].join("."));
        };
        map.get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))
    })
}

/// Remplace la valeur au bout de `path`, en créant les sections manquantes.
fn assign(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        let Value::Mapping(map) = node else {
            bail!("Cannot create section {}: parent is not a section", key);
        };
        node = map
            .entry(Value::String(key.to_lowercase()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match node {
        Value::Mapping(map) => {
            map.insert(Value::String(last.to_lowercase()), value);
            Ok(())
        }
        _ => bail!("Cannot set {}: parent is not a section", path.join(".")),
    }
}

/// Les clés YAML sont insensibles à la casse : on les stocke en minuscules.
fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(value))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Interprète une variable d'environnement comme du YAML (`7000` → nombre,
/// `true` → booléen), sinon comme une chaîne.
fn env_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl Config {
    /// Choisit le répertoire de configuration et vérifie qu'il est utilisable
    ///
    /// Ordre de recherche :
    /// 1. `directory` s'il n'est pas vide
    /// 2. la variable `IPMPV_CONFIG`
    /// 3. `.ipmpv` dans le répertoire courant
    /// 4. `~/.ipmpv`
    ///
    /// Si aucun n'existe, `.ipmpv` est créé dans le répertoire courant.
    pub fn config_dir(directory: &str) -> Result<String> {
        let candidates = candidate_dirs(directory);
        let explicit = !directory.is_empty() || env::var_os(ENV_CONFIG_DIR).is_some();

        let chosen = if explicit {
            candidates[0].clone()
        } else {
            candidates
                .iter()
                .find(|dir| dir.exists())
                .cloned()
                .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_DIR))
        };

        ensure_writable_dir(&chosen)?;
        Ok(chosen.to_string_lossy().into_owned())
    }

    /// Charge la configuration : valeurs embarquées, puis `config.yaml` du
    /// répertoire choisi, puis variables d'environnement. Le résultat fusionné
    /// est réécrit sur disque.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        let path = Path::new(&config_dir)
            .join("config.yaml")
            .to_string_lossy()
            .into_owned();
        info!(config_dir = %config_dir, "Using config directory");

        let mut merged: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read(&path) {
            Ok(bytes) => {
                info!(config_file = %path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&bytes)
                    .with_context(|| format!("Invalid YAML in {}", path))?;
                merge_yaml(&mut merged, &lowercase_keys(external));
            }
            Err(_) => info!(config_file = %path, "No config file, using embedded defaults"),
        }

        let mut data = lowercase_keys(merged);
        Self::apply_env_overrides(&mut data, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Écrit la configuration courante dans `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(&self.path, yaml).with_context(|| format!("Cannot write {}", self.path))
    }

    /// Modifie une valeur puis sauvegarde
    ///
    /// * `path` - chemin de clés, ex: `&["osd", "channel_timeout_ms"]`
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        assign(&mut self.data.lock(), path, value)?;
        self.save()
    }

    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        lookup(&self.data.lock(), path).cloned()
    }

    fn apply_env_overrides<I>(data: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, raw) in vars {
            let result = if let Some(rest) = name.strip_prefix(ENV_PREFIX) {
                let path: Vec<&str> = rest.split("__").collect();
                assign(data, &path, env_value(&raw))
            } else if let Some((_, path)) = LEGACY_ENV_VARS.iter().find(|(legacy, _)| *legacy == name) {
                info!(env_var = %name, "Applying legacy environment override");
                assign(data, path, env_value(&raw))
            } else {
                continue;
            };

            if let Err(e) = result {
                warn!(env_var = %name, "Ignoring environment override: {}", e);
            }
        }
    }

    /// Répertoire de configuration effectivement utilisé
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Gets the base URL for the HTTP server
    ///
    /// Returns the configured base URL, or attempts to guess the local IP address if not configured.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(_) => guess_local_ip(),
            Err(err) => {
                warn!("Failed to get base URL: {}, guessing local IP", err);
                guess_local_ip()
            }
        }
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (5000) if not configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!("HTTP port {} out of range, using default {}", n, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(Value::String(s)) => match s.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Invalid HTTP port '{}', using default {}", s, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(_) => {
                warn!(
                    "HTTP port not a number or string, using default {}",
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
            Err(err) => {
                warn!(
                    "Failed to get HTTP port: {}, using default {}",
                    err,
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
        }
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        let n = Number::from(port);
        self.set_value(&["host", "http_port"], Value::Number(n))
    }

    /// URL of the M3U playlist, `None` when nothing is configured.
    pub fn get_playlist_url(&self) -> Option<String> {
        match self.get_value(&["playlist", "url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    pub fn set_playlist_url(&self, url: String) -> Result<()> {
        self.set_value(&["playlist", "url"], Value::String(url))
    }

    /// Timeout global pour le téléchargement de la playlist
    pub fn get_playlist_timeout(&self) -> Duration {
        let secs = match self.get_value(&["playlist", "timeout_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_PLAYLIST_TIMEOUT_SECS),
            _ => DEFAULT_PLAYLIST_TIMEOUT_SECS,
        };
        Duration::from_secs(secs)
    }

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    impl_string_config!(get_player_binary, set_player_binary, &["player", "binary"], "mpv");
    impl_string_config!(
        get_player_ipc_socket,
        set_player_ipc_socket,
        &["player", "ipc_socket"],
        "/tmp/ipmpv-mpv.sock"
    );
    impl_string_config!(get_player_vo, set_player_vo, &["player", "vo"], "gpu");
    impl_string_config!(get_player_hwdec, set_player_hwdec, &["player", "hwdec"], "auto-safe");
    impl_string_config!(
        get_novideo_image,
        set_novideo_image,
        &["player", "novideo_image"],
        "./novideo.png"
    );
    impl_string_config!(
        get_nosignal_image,
        set_nosignal_image,
        &["player", "nosignal_image"],
        "./nosignal.png"
    );

    impl_millis_config!(
        get_channel_osd_timeout,
        set_channel_osd_timeout,
        &["osd", "channel_timeout_ms"],
        DEFAULT_CHANNEL_OSD_TIMEOUT_MS
    );
    impl_millis_config!(
        get_volume_osd_timeout,
        set_volume_osd_timeout,
        &["osd", "volume_timeout_ms"],
        DEFAULT_VOLUME_OSD_TIMEOUT_MS
    );
    impl_millis_config!(
        get_osd_poll_interval,
        set_osd_poll_interval,
        &["osd", "poll_interval_ms"],
        DEFAULT_OSD_POLL_INTERVAL_MS
    );
    impl_usize_config!(
        get_osd_corner_radius,
        set_osd_corner_radius,
        &["osd", "corner_radius"],
        DEFAULT_OSD_CORNER_RADIUS
    );

    impl_string_config!(get_mixer_name, set_mixer_name, &["volume", "mixer"], "Master");
    impl_usize_config!(
        get_volume_step,
        set_volume_step,
        &["volume", "step"],
        DEFAULT_VOLUME_STEP
    );

    impl_string_config!(
        get_display_output,
        set_display_output,
        &["display", "output"],
        "Composite-1"
    );
    impl_string_config!(
        get_retroarch_command,
        set_retroarch_command,
        &["retroarch", "command"],
        "retroarch"
    );
    impl_string_config!(
        get_default_language,
        set_default_language,
        &["i18n", "default_language"],
        "en"
    );
}

/// Returns the global configuration instance
///
/// Lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn defaults_are_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_http_port(), 5000);
        assert_eq!(config.get_channel_osd_timeout(), Duration::from_millis(5000));
        assert_eq!(config.get_volume_osd_timeout(), Duration::from_millis(2000));
        assert_eq!(config.get_osd_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.get_mixer_name(), "Master");
        assert_eq!(config.get_volume_step().unwrap(), 5);
        assert_eq!(config.get_retroarch_command(), "retroarch");
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn external_file_is_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Host:\n  HTTP_Port: 8088\nvolume:\n  step: 10\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_http_port(), 8088);
        assert_eq!(config.get_volume_step().unwrap(), 10);
        // untouched keys keep their default
        assert_eq!(config.get_mixer_name(), "Master");
    }

    #[test]
    fn setter_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config
            .set_playlist_url("http://example.org/list.m3u".to_string())
            .unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(
            reloaded.get_playlist_url().as_deref(),
            Some("http://example.org/list.m3u")
        );
    }

    #[test]
    fn empty_playlist_url_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_playlist_url("   ".to_string()).unwrap();
        assert_eq!(config.get_playlist_url(), None);
    }

    #[test]
    fn env_overrides_cover_prefixed_and_legacy_variables() {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        Config::apply_env_overrides(
            &mut value,
            vec![
                ("IPMPV_CONFIG__HOST__HTTP_PORT".to_string(), "7000".to_string()),
                ("IPMPV_M3U_URL".to_string(), "http://tv/list.m3u".to_string()),
                ("IPMPV_RETROARCH_CMD".to_string(), "retroarch -f".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );

        let port = lookup(&value, &["host", "http_port"]).unwrap().clone();
        assert_eq!(port, Value::Number(Number::from(7000)));
        let url = lookup(&value, &["playlist", "url"]).unwrap().clone();
        assert_eq!(url, Value::String("http://tv/list.m3u".to_string()));
        let cmd = lookup(&value, &["retroarch", "command"]).unwrap().clone();
        assert_eq!(cmd, Value::String("retroarch -f".to_string()));
    }

    #[test]
    fn merge_replaces_scalars_and_keeps_missing_keys() {
        let mut default: Value = serde_yaml::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let external: Value = serde_yaml::from_str("b:\n  c: 20\n").unwrap();
        merge_yaml(&mut default, &external);

        assert_eq!(
            lookup(&default, &["b", "c"]).unwrap().clone(),
            Value::Number(Number::from(20))
        );
        assert_eq!(
            lookup(&default, &["b", "d"]).unwrap().clone(),
            Value::Number(Number::from(3))
        );
    }
}
