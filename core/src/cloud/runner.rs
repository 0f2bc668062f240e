//! Cloud runner: submits the script as a remote task and reconciles the result.
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::config::CloudConfig;
use crate::error::ExecError;
use crate::local::shutdown_signal;
use crate::output::OutputSink;
use crate::request::ExecutionRequest;

use super::api::LuauTaskApi;
use super::poll::{wait_for_terminal, PollPolicy};
use super::reconcile::{forward_logs, reconcile};
use super::types::TaskTarget;

pub struct CloudRunner {
    cfg: CloudConfig,
    api: Arc<dyn LuauTaskApi>,
}

impl CloudRunner {
    pub fn new(cfg: CloudConfig, api: Arc<dyn LuauTaskApi>) -> Self {
        Self { cfg, api }
    }

    /// Target for `request`: an uploaded version wins over the configured one.
    pub fn target(&self, request: &ExecutionRequest) -> TaskTarget {
        TaskTarget {
            universe_id: self.cfg.universe_id.clone(),
            place_id: self.cfg.place_id.clone(),
            version: request.place_version.or(self.cfg.place_version),
        }
    }

    /// How long polling may run before the task is given up on.
    pub fn deadline(&self, request: &ExecutionRequest) -> Duration {
        request.timeout + Duration::from_millis(self.cfg.deadline_grace_ms)
    }

    pub async fn run(&self, request: &ExecutionRequest, sink: &OutputSink) -> i32 {
        let target = self.target(request);
        let span = tracing::info_span!(
            "cloud.run",
            universe_id = %target.universe_id,
            place_id = %target.place_id,
            version = ?target.version
        );

        let work = self.execute(request, &target, sink).instrument(span);
        tokio::select! {
            res = work => match res {
                Ok(code) => code,
                Err(e) => {
                    sink.error(&e.to_string());
                    1
                }
            },
            _ = shutdown_signal() => {
                sink.warn("Interrupted before the Luau task finished");
                1
            }
        }
    }

    async fn execute(
        &self,
        request: &ExecutionRequest,
        target: &TaskTarget,
        sink: &OutputSink,
    ) -> Result<i32, ExecError> {
        let task = self
            .api
            .create_task(target, &request.script, request.timeout)
            .await
            .map_err(|e| {
                tracing::error!(error.kind = "cloud.create", error = %e);
                ExecError::Transport(format!("failed to create Luau task: {e}"))
            })?;
        tracing::info!(task_path = %task.path, state = ?task.state, "task created");

        let policy = PollPolicy::from_config(&self.cfg);
        let deadline = self.deadline(request);
        let finished = tokio::time::timeout(
            deadline,
            wait_for_terminal(self.api.as_ref(), &task.path, &policy),
        )
        .await
        .map_err(|_| {
            tracing::error!(error.kind = "cloud.deadline", task_path = %task.path, deadline_ms = deadline.as_millis() as u64);
            ExecError::Timeout(format!(
                "Luau task {} did not finish within {}s",
                task.path,
                deadline.as_secs()
            ))
        })??;
        tracing::info!(task_path = %finished.path, state = ?finished.state, "task finished");

        let groups = self.api.get_logs(&task.path).await.map_err(|e| {
            tracing::error!(error.kind = "cloud.logs", error = %e);
            ExecError::Transport(format!("failed to fetch task logs: {e}"))
        })?;

        let tally = forward_logs(&groups, sink);
        if tally.total > 0 {
            tracing::debug!(total = tally.total, failed = tally.failed, "test summary");
        }
        Ok(reconcile(&finished, &tally, sink))
    }
}
