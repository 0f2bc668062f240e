use std::path::Path;

use async_trait::async_trait;

use crate::error::ExecError;

use super::types::HostInstall;

/// A spawned host application.
#[async_trait]
pub trait HostProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Resolves with the exit code once the process has exited. Must be
    /// cancel safe: the runner polls it inside `select!`.
    async fn wait(&mut self) -> anyhow::Result<i32>;

    async fn kill(&mut self) -> anyhow::Result<()>;
}

/// Per-OS knowledge of the host application: where it is installed, how it
/// is started, and how its windows are kept out of sight.
#[async_trait]
pub trait HostLauncher: Send + Sync {
    fn name(&self) -> &str;

    fn locate(&self) -> Result<HostInstall, ExecError>;

    async fn launch(
        &self,
        install: &HostInstall,
        place: &Path,
    ) -> Result<Box<dyn HostProcess>, ExecError>;

    fn supports_window_hiding(&self) -> bool {
        false
    }

    /// Best effort; the runner ignores failures.
    fn hide_windows(&self, _pid: u32) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Produces the companion plugin artifact inside `plugin_dir`.
#[async_trait]
pub trait PluginBuilder: Send + Sync {
    async fn build(&self, plugin_dir: &Path) -> Result<(), ExecError>;
}
