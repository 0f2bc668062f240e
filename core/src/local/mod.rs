mod install;
mod runner;
mod session;
mod signal;
mod traits;
mod types;

use std::path::PathBuf;

use crate::config::LocalConfig;

pub use install::PluginInstaller;
pub use runner::LocalRunner;
pub use session::{PluginSocket, Session, SessionPhase, TransitionError};
pub use signal::shutdown_signal;
pub use traits::{HostLauncher, HostProcess, PluginBuilder};
pub use types::HostInstall;

/// Configured plugin directory, else `plugin/` beside the running executable.
pub fn resolve_plugin_dir(cfg: &LocalConfig) -> PathBuf {
    if let Some(dir) = cfg.plugin_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("plugin")))
        .unwrap_or_else(|| PathBuf::from("plugin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_plugin_dir_wins() {
        let cfg = LocalConfig {
            plugin_dir: Some("/opt/rbxluau/plugin".into()),
            ..LocalConfig::default()
        };
        assert_eq!(resolve_plugin_dir(&cfg), PathBuf::from("/opt/rbxluau/plugin"));
    }

    #[test]
    fn blank_plugin_dir_falls_back_to_exe_sibling() {
        let cfg = LocalConfig {
            plugin_dir: Some("  ".into()),
            ..LocalConfig::default()
        };
        let dir = resolve_plugin_dir(&cfg);
        assert_eq!(dir.file_name().unwrap(), "plugin");
    }
}
