use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub cloud: CloudConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "warn" or "rbxluau_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Port of the control channel the companion plugin dials into.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_window_hide_interval_ms")]
    pub window_hide_interval_ms: u64,

    /// Directory holding the plugin sources, the built artifact and the
    /// bundled default place. Empty means `plugin/` beside the executable.
    #[serde(default)]
    pub plugin_dir: Option<String>,

    /// File name of the plugin inside the host's plugin directory.
    #[serde(default = "default_plugin_file_name")]
    pub plugin_file_name: String,

    /// File name of the built artifact inside `plugin_dir`.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    #[serde(default = "default_place_name")]
    pub default_place: String,

    /// Command (program + args) that produces the artifact inside `plugin_dir`.
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
}

fn default_port() -> u16 {
    7777
}

fn default_handshake_timeout_ms() -> u64 {
    30_000
}

fn default_window_hide_interval_ms() -> u64 {
    50
}

fn default_plugin_file_name() -> String {
    "rbxluau.rbxm".to_string()
}

fn default_artifact_name() -> String {
    "plugin.rbxm".to_string()
}

fn default_place_name() -> String {
    "empty_place.rbxl".to_string()
}

fn default_build_command() -> Vec<String> {
    vec!["npx".into(), "lune".into(), "run".into(), "build.lua".into()]
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            window_hide_interval_ms: default_window_hide_interval_ms(),
            plugin_dir: None,
            plugin_file_name: default_plugin_file_name(),
            artifact_name: default_artifact_name(),
            default_place: default_place_name(),
            build_command: default_build_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub universe_id: String,

    #[serde(default)]
    pub place_id: String,

    /// Pin tasks to a place version. Overridden by an uploaded place.
    #[serde(default)]
    pub place_version: Option<u64>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Consecutive transient poll failures tolerated before giving up.
    #[serde(default = "default_max_poll_retries")]
    pub max_poll_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,

    /// Extra time granted to the local poll loop beyond the task timeout.
    #[serde(default = "default_deadline_grace_ms")]
    pub deadline_grace_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://apis.roblox.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_poll_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_retry_backoff_max_ms() -> u64 {
    5_000
}

fn default_deadline_grace_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    concat!("rbxluau/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            universe_id: String::new(),
            place_id: String::new(),
            place_version: None,
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_poll_retries: default_max_poll_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            deadline_grace_ms: default_deadline_grace_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl CloudConfig {
    /// Remote execution is only possible with a key and a target place.
    pub fn has_credentials(&self) -> bool {
        [&self.api_key, &self.universe_id, &self.place_id]
            .iter()
            .all(|v| !v.trim().is_empty())
    }
}
