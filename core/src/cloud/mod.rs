mod api;
mod poll;
mod reconcile;
mod runner;
mod types;

pub use api::{ApiError, ApiErrorKind, LuauTaskApi};
pub use poll::{wait_for_terminal, PollPolicy};
pub use reconcile::{forward_logs, reconcile, remote_error, TestTally};
pub use runner::CloudRunner;
pub use types::{LogGroup, LuauTask, TaskError, TaskLogsPage, TaskOutput, TaskState, TaskTarget};
