use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use rbxluau_core::api::{ExecError, HostProcess};
use tokio::process::{Child, Command};

/// A running Studio started with the place file as its only argument.
pub struct StudioProcess {
    child: Child,
}

impl StudioProcess {
    pub fn spawn(application: &Path, place: &Path) -> Result<Self, ExecError> {
        let child = Command::new(application)
            .arg(place)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExecError::io(format!("spawn {}", application.display()), e))?;
        Ok(Self { child })
    }
}

#[async_trait]
impl HostProcess for StudioProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> anyhow::Result<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn kill(&mut self) -> anyhow::Result<()> {
        self.child.kill().await?;
        Ok(())
    }
}
