use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cannot start player process {0}: {1}")]
    Spawn(String, #[source] std::io::Error),
    #[error("Player IPC socket {0} not available: {1}")]
    Connect(String, #[source] std::io::Error),
    #[error("Player IPC write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Player IPC message could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Player rejected command '{0}': {1}")]
    Command(String, String),
    #[error("Player did not answer command '{0}' in time")]
    Timeout(String),
    #[error("Loading {0} failed")]
    LoadFailed(String),
    #[error("Player connection closed")]
    Disconnected,
}

#[derive(Error, Debug)]
pub enum MixerError {
    #[error("No usable mixer control (tried {0})")]
    NoControl(String),
    #[error("Cannot run amixer: {0}")]
    Io(#[from] std::io::Error),
    #[error("amixer {0} failed: {1}")]
    Command(String, String),
    #[error("Cannot read {0} from amixer output")]
    Parse(&'static str),
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Cannot run {0}: {1}")]
    Tool(&'static str, #[source] std::io::Error),
    #[error("{0} exited with status {1}")]
    Status(&'static str, std::process::ExitStatus),
}

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Emulator command is empty")]
    EmptyCommand,
    #[error("Cannot launch {0}: {1}")]
    Spawn(String, #[source] std::io::Error),
}

/// Invalid external request, rejected before any state is touched.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid channel index: {0}")]
    InvalidIndex(String),
    #[error("Invalid volume step: {0}")]
    InvalidStep(String),
    #[error("No channels available")]
    NoChannels,
}
