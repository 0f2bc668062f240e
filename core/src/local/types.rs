use std::path::PathBuf;

/// Where the host application lives on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInstall {
    pub application_path: PathBuf,
    pub plugins_path: PathBuf,
}
