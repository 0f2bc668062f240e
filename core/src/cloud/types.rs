use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a remote Luau execution task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Queued,
    Pending,
    Processing,
    Complete,
    Failed,
    Cancelled,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Complete | TaskState::Failed | TaskState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    #[serde(default)]
    pub results: Vec<Value>,
}

/// A task as returned by create and get calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuauTask {
    /// Resource path, e.g. `universes/1/places/2/luau-execution-session-tasks/abc`.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub output: Option<TaskOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    #[serde(default)]
    pub messages: Vec<Value>,
}

impl LogGroup {
    /// Messages as display lines; non-string entries are rendered as JSON.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.messages.iter().map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// One page of the task logs listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLogsPage {
    #[serde(rename = "luauExecutionSessionTaskLogs", default)]
    pub groups: Vec<LogGroup>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Which place (and optionally which saved version) tasks run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTarget {
    pub universe_id: String,
    pub place_id: String,
    pub version: Option<u64>,
}
