use std::path::Path;

use async_trait::async_trait;
use rbxluau_core::api::{ExecError, HostInstall, HostLauncher, HostProcess};

/// Platforms Studio does not ship for.
pub struct UnsupportedLauncher;

#[async_trait]
impl HostLauncher for UnsupportedLauncher {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn locate(&self) -> Result<HostInstall, ExecError> {
        Err(ExecError::Discovery(format!(
            "Roblox Studio is not available on {}",
            std::env::consts::OS
        )))
    }

    async fn launch(
        &self,
        _install: &HostInstall,
        _place: &Path,
    ) -> Result<Box<dyn HostProcess>, ExecError> {
        Err(self.locate().err().unwrap_or_else(|| {
            ExecError::Discovery("Roblox Studio is not available".into())
        }))
    }
}
