use std::path::PathBuf;
use std::time::Duration;

/// Which backend the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Cloud,
}

/// A normalized request to run one script. Built once by the caller and never
/// mutated by the backends.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub script: String,
    pub place: Option<PathBuf>,
    /// Saved place version for cloud tasks, typically from an upload.
    pub place_version: Option<u64>,
    pub mode: ExecutionMode,
    /// Suppress console echo of script output.
    pub silent: bool,
    /// Mirror script output into this file.
    pub output: Option<PathBuf>,
    /// Leave the host application running after the session ends.
    pub keep_alive: bool,
    /// Spawn the host application. When false an already running host is
    /// expected to connect on its own.
    pub launch: bool,
    /// End the session as soon as the plugin disconnects.
    pub oneshot: bool,
    /// Remote task timeout; also bounds cloud polling.
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(script: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            script: script.into(),
            place: None,
            place_version: None,
            mode,
            silent: false,
            output: None,
            keep_alive: false,
            launch: true,
            oneshot: false,
            timeout: Duration::from_secs(60),
        }
    }
}
