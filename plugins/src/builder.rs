use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use rbxluau_core::api::{ExecError, PluginBuilder};
use tokio::process::Command;

/// Runs a configured build command inside the plugin directory.
pub struct CommandPluginBuilder {
    command: Vec<String>,
}

impl CommandPluginBuilder {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn command(&self) -> Result<Command, ExecError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ExecError::Build("build command is empty".into()))?;

        // npx and friends are .cmd shims on Windows.
        let cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(program).args(args);
            cmd
        } else {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        };
        Ok(cmd)
    }
}

#[async_trait]
impl PluginBuilder for CommandPluginBuilder {
    async fn build(&self, plugin_dir: &Path) -> Result<(), ExecError> {
        let mut cmd = self.command()?;
        tracing::info!(command = ?self.command, dir = %plugin_dir.display(), "building plugin");

        // Inherit stdout/stderr so build progress stays visible.
        let status = cmd
            .current_dir(plugin_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| ExecError::Build(format!("{}: {e}", self.command.join(" "))))?;

        if !status.success() {
            return Err(ExecError::Build(format!(
                "{} exited with {}",
                self.command.join(" "),
                status.code().map_or_else(|| "signal".to_string(), |c| c.to_string())
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandPluginBuilder {
        CommandPluginBuilder::new(vec!["sh".into(), "-c".into(), script.into()])
    }

    #[tokio::test]
    async fn runs_in_plugin_dir() {
        let dir = tempfile::tempdir().unwrap();
        sh("echo built > plugin.rbxm").build(dir.path()).await.unwrap();
        assert!(dir.path().join("plugin.rbxm").is_file());
    }

    #[tokio::test]
    async fn failing_command_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = sh("exit 3").build(dir.path()).await.unwrap_err();
        assert!(matches!(err, ExecError::Build(ref m) if m.contains("exited with 3")));
    }

    #[tokio::test]
    async fn empty_command_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CommandPluginBuilder::new(vec![])
            .build(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Build(_)));
    }

    #[tokio::test]
    async fn missing_program_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CommandPluginBuilder::new(vec!["rbxluau-no-such-tool".into()])
            .build(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Build(_)));
    }
}
