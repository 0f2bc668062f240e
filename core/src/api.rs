//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `rbxluau_core::api` instead of reaching into internal modules.

pub use crate::cloud::{
    ApiError, ApiErrorKind, CloudRunner, LogGroup, LuauTask, LuauTaskApi, PollPolicy, TaskError,
    TaskLogsPage, TaskOutput, TaskState, TaskTarget,
};
pub use crate::config::{
    get_data_dir, load_default, load_from, AppConfig, CloudConfig, LocalConfig, LoggingConfig,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::error::{CliError, ExecError};
pub use crate::local::{
    resolve_plugin_dir, shutdown_signal, HostInstall, HostLauncher, HostProcess, LocalRunner,
    PluginBuilder, PluginInstaller, SessionPhase,
};
pub use crate::orchestrator::{choose_backend, Backend, Orchestrator};
pub use crate::output::{LogLevel, OutputSink, SinkOptions, LINE_ENDING};
pub use crate::protocol::{PluginMessage, ScriptReturn, ServerMessage};
pub use crate::request::{ExecutionMode, ExecutionRequest};
