//! Per-OS knowledge of Roblox Studio: discovery, launch and window hiding.
mod discovery;
#[cfg(target_os = "macos")]
mod macos;
mod process;
mod unsupported;
#[cfg(windows)]
mod win;

use std::sync::Arc;

use rbxluau_core::api::HostLauncher;

pub use discovery::{find_mac_install, find_windows_install, MAC_STUDIO_PATH, WINDOWS_STUDIO_EXE};
#[cfg(target_os = "macos")]
pub use macos::MacLauncher;
pub use process::StudioProcess;
pub use unsupported::UnsupportedLauncher;
#[cfg(windows)]
pub use win::WindowsLauncher;

#[cfg(windows)]
pub fn platform_launcher() -> Arc<dyn HostLauncher> {
    Arc::new(WindowsLauncher)
}

#[cfg(target_os = "macos")]
pub fn platform_launcher() -> Arc<dyn HostLauncher> {
    Arc::new(MacLauncher)
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn platform_launcher() -> Arc<dyn HostLauncher> {
    Arc::new(UnsupportedLauncher)
}
