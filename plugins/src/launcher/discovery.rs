//! Install discovery, kept free of platform gates so it can be tested anywhere.
use std::path::{Path, PathBuf};

use rbxluau_core::api::{ExecError, HostInstall};

pub const WINDOWS_STUDIO_EXE: &str = "RobloxStudioBeta.exe";
pub const MAC_STUDIO_PATH: &str = "/Applications/RobloxStudio.app/Contents/MacOS/RobloxStudio";

/// First `Roblox/Versions/*/RobloxStudioBeta.exe` under the local app-data dir.
pub fn find_windows_install(local_app_data: &Path) -> Result<HostInstall, ExecError> {
    let roblox = local_app_data.join("Roblox");
    let versions = roblox.join("Versions");

    let entries = std::fs::read_dir(&versions).map_err(|e| {
        ExecError::Discovery(format!("cannot read {}: {e}", versions.display()))
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(WINDOWS_STUDIO_EXE))
        .filter(|exe| exe.is_file())
        .collect();
    candidates.sort();

    let application_path = candidates.into_iter().next().ok_or_else(|| {
        ExecError::Discovery(format!(
            "no {WINDOWS_STUDIO_EXE} under {}",
            versions.display()
        ))
    })?;

    Ok(HostInstall {
        application_path,
        plugins_path: roblox.join("Plugins"),
    })
}

pub fn find_mac_install(application: &Path, home: &Path) -> Result<HostInstall, ExecError> {
    if !application.is_file() {
        return Err(ExecError::Discovery(format!(
            "{} not found",
            application.display()
        )));
    }
    Ok(HostInstall {
        application_path: application.to_path_buf(),
        plugins_path: home.join("Documents").join("Roblox").join("Plugins"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_picks_version_with_studio() {
        let dir = tempfile::tempdir().unwrap();
        let versions = dir.path().join("Roblox").join("Versions");
        std::fs::create_dir_all(versions.join("version-aaa")).unwrap();
        std::fs::create_dir_all(versions.join("version-bbb")).unwrap();
        std::fs::write(versions.join("version-bbb").join(WINDOWS_STUDIO_EXE), b"").unwrap();

        let install = find_windows_install(dir.path()).unwrap();

        assert_eq!(
            install.application_path,
            versions.join("version-bbb").join(WINDOWS_STUDIO_EXE)
        );
        assert_eq!(install.plugins_path, dir.path().join("Roblox").join("Plugins"));
    }

    #[test]
    fn windows_without_versions_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_windows_install(dir.path()),
            Err(ExecError::Discovery(_))
        ));

        std::fs::create_dir_all(dir.path().join("Roblox").join("Versions").join("v1")).unwrap();
        assert!(matches!(
            find_windows_install(dir.path()),
            Err(ExecError::Discovery(_))
        ));
    }

    #[test]
    fn mac_uses_documents_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("RobloxStudio");
        std::fs::write(&app, b"").unwrap();

        let install = find_mac_install(&app, dir.path()).unwrap();
        assert_eq!(
            install.plugins_path,
            dir.path().join("Documents").join("Roblox").join("Plugins")
        );

        assert!(find_mac_install(&dir.path().join("missing"), dir.path()).is_err());
    }
}
