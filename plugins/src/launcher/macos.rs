use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use rbxluau_core::api::{ExecError, HostInstall, HostLauncher, HostProcess};

use super::discovery::{find_mac_install, MAC_STUDIO_PATH};
use super::process::StudioProcess;

static INSTALL: OnceLock<Result<HostInstall, String>> = OnceLock::new();

pub struct MacLauncher;

#[async_trait]
impl HostLauncher for MacLauncher {
    fn name(&self) -> &str {
        "macos"
    }

    fn locate(&self) -> Result<HostInstall, ExecError> {
        INSTALL
            .get_or_init(|| {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
                find_mac_install(Path::new(MAC_STUDIO_PATH), &home).map_err(|e| e.to_string())
            })
            .clone()
            .map_err(ExecError::Discovery)
    }

    async fn launch(
        &self,
        install: &HostInstall,
        place: &Path,
    ) -> Result<Box<dyn HostProcess>, ExecError> {
        Ok(Box::new(StudioProcess::spawn(&install.application_path, place)?))
    }
}
