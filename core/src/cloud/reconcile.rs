use std::sync::OnceLock;

use regex::Regex;

use crate::error::ExecError;
use crate::output::OutputSink;
use crate::protocol::ScriptReturn;

use super::types::{LogGroup, LuauTask, TaskState};

static RESULT_REGEX: OnceLock<Regex> = OnceLock::new();
static SUITE_REGEX: OnceLock<Regex> = OnceLock::new();

fn result_regex() -> &'static Regex {
    RESULT_REGEX.get_or_init(|| {
        Regex::new(r"(\d+)\s+passed,\s+(\d+)\s+failed,\s+(\d+)\s+skipped")
            .expect("RESULT_REGEX is valid")
    })
}

fn suite_regex() -> &'static Regex {
    SUITE_REGEX.get_or_init(|| {
        Regex::new(r"Test Suites:\s+(\d+)\s+failed").expect("SUITE_REGEX is valid")
    })
}

/// Test counts scraped from runner summaries in the task logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestTally {
    pub total: u64,
    pub failed: u64,
}

impl TestTally {
    pub fn observe(&mut self, line: &str) {
        if let Some(caps) = result_regex().captures(line) {
            let n = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0)
            };
            self.total += n(1) + n(2) + n(3);
            self.failed += n(2);
        }
        if let Some(failed) = suite_regex()
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            self.failed += failed;
        }
    }
}

/// Writes every log line to the sink in order and tallies test summaries.
pub fn forward_logs(groups: &[LogGroup], sink: &OutputSink) -> TestTally {
    let mut tally = TestTally::default();
    for line in groups.iter().flat_map(LogGroup::lines) {
        sink.info(&line);
        tally.observe(&line);
    }
    tally
}

/// Turns a terminal task into an exit code, reporting failures to the sink.
pub fn reconcile(task: &LuauTask, tally: &TestTally, sink: &OutputSink) -> i32 {
    match task.state {
        TaskState::Complete => {
            let first = task.output.as_ref().and_then(|o| o.results.first());
            let ret = ScriptReturn::from_value(first);
            if let Some(value) = ret.display() {
                sink.info(value);
            }
            if tally.failed > 0 {
                sink.error(&format!(
                    "Luau task completed but {} test(s) failed",
                    tally.failed
                ));
                return 1;
            }
            ret.exit_code()
        }
        _ => {
            let err = remote_error(task);
            tracing::error!(error.kind = "cloud.task_failed", task_path = %task.path, error = %err);
            sink.error(&err.to_string());
            sink.error("Luau task failed");
            1
        }
    }
}

/// The task's own error, with defaults for whatever it left out.
pub fn remote_error(task: &LuauTask) -> ExecError {
    let error = task.error.clone().unwrap_or_default();
    ExecError::RemoteTask {
        code: error
            .code
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "UNKNOWN".into()),
        message: error
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Luau task failed".into()),
    }
}
