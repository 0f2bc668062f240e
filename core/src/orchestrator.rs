//! Picks a backend for a request and owns the Output Sink around the run.

use std::fmt;

use crate::cloud::CloudRunner;
use crate::config::AppConfig;
use crate::context::Services;
use crate::error::ExecError;
use crate::local::{resolve_plugin_dir, LocalRunner};
use crate::output::{OutputSink, SinkOptions};
use crate::request::{ExecutionMode, ExecutionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Cloud,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Cloud => f.write_str("cloud"),
        }
    }
}

/// Local when asked for, or when there is nothing to reach the cloud with.
pub fn choose_backend(mode: ExecutionMode, has_credentials: bool) -> Backend {
    match (mode, has_credentials) {
        (ExecutionMode::Local, _) | (_, false) => Backend::Local,
        (ExecutionMode::Cloud, true) => Backend::Cloud,
    }
}

pub struct Orchestrator {
    cfg: AppConfig,
    services: Services,
    color: bool,
}

impl Orchestrator {
    pub fn new(cfg: AppConfig, services: Services) -> Self {
        Self {
            cfg,
            services,
            color: false,
        }
    }

    /// Colour console echo by level.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Cloud when asked for and credentials are configured; whether a client
    /// was actually built is checked at run time.
    pub fn backend_for(&self, request: &ExecutionRequest) -> Backend {
        choose_backend(request.mode, self.cfg.cloud.has_credentials())
    }

    pub fn sink_options(&self, request: &ExecutionRequest) -> SinkOptions {
        SinkOptions {
            path: request.output.clone(),
            echo: !request.silent,
            color: self.color,
        }
    }

    /// Runs `request` on the chosen backend and returns its exit code.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<i32, ExecError> {
        let sink = OutputSink::open(self.sink_options(request)).await?;
        self.execute_with(request, &sink).await
    }

    /// Like [`Orchestrator::execute`] but writes to a caller-provided sink.
    /// The sink is closed exactly once whatever the outcome.
    pub async fn execute_with(
        &self,
        request: &ExecutionRequest,
        sink: &OutputSink,
    ) -> Result<i32, ExecError> {
        let backend = self.backend_for(request);
        tracing::info!(%backend, mode = ?request.mode, "executing");

        let outcome = self.dispatch(backend, request, sink).await;

        if let Err(e) = sink.close().await {
            tracing::error!(error.kind = "sink.close", error = %e);
            return Err(ExecError::io("flush output", e));
        }
        let code = outcome?;
        tracing::info!(%backend, exit_code = code, "finished");
        Ok(code)
    }

    async fn dispatch(
        &self,
        backend: Backend,
        request: &ExecutionRequest,
        sink: &OutputSink,
    ) -> Result<i32, ExecError> {
        match backend {
            Backend::Local => {
                let runner = LocalRunner::new(
                    self.cfg.local.clone(),
                    resolve_plugin_dir(&self.cfg.local),
                    self.services.launcher.clone(),
                    self.services.plugin_builder.clone(),
                );
                tracing::debug!(launcher = runner.launcher_name(), "local backend");
                Ok(runner.run(request, sink, None).await)
            }
            Backend::Cloud => match self.services.task_api.clone() {
                Some(api) => Ok(CloudRunner::new(self.cfg.cloud.clone(), api)
                    .run(request, sink)
                    .await),
                None => Err(ExecError::Config("Open Cloud client unavailable".into())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mode_always_local() {
        assert_eq!(choose_backend(ExecutionMode::Local, true), Backend::Local);
        assert_eq!(choose_backend(ExecutionMode::Local, false), Backend::Local);
    }

    #[test]
    fn cloud_needs_credentials() {
        assert_eq!(choose_backend(ExecutionMode::Cloud, true), Backend::Cloud);
        assert_eq!(choose_backend(ExecutionMode::Cloud, false), Backend::Local);
    }
}
