use std::time::Duration;

use crate::config::CloudConfig;
use crate::error::ExecError;

use super::api::LuauTaskApi;
use super::types::LuauTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
    pub backoff_max: Duration,
}

impl PollPolicy {
    pub fn from_config(cfg: &CloudConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            max_retries: cfg.max_poll_retries,
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
            backoff_max: Duration::from_millis(cfg.retry_backoff_max_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(self.backoff_max)
    }
}

/// Re-fetches the task until it reaches a terminal state.
///
/// Unbounded in time; callers put a deadline around it. Transient failures
/// are retried with backoff up to `max_retries` in a row.
pub async fn wait_for_terminal(
    api: &dyn LuauTaskApi,
    path: &str,
    policy: &PollPolicy,
) -> Result<LuauTask, ExecError> {
    let mut failures = 0u32;
    let mut delay = policy.interval;

    loop {
        tokio::time::sleep(delay).await;

        match api.get_task(path).await {
            Ok(task) => {
                failures = 0;
                tracing::trace!(task_path = %path, state = ?task.state, "poll");
                if task.state.is_terminal() {
                    return Ok(task);
                }
                delay = policy.interval;
            }
            Err(e) if e.is_transient() && failures < policy.max_retries => {
                failures += 1;
                delay = policy.backoff_for(failures);
                tracing::warn!(
                    task_path = %path,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient poll failure, retrying"
                );
            }
            Err(e) => {
                tracing::error!(error.kind = "cloud.poll", task_path = %path, error = %e);
                return Err(ExecError::Transport(e.to_string()));
            }
        }
    }
}
