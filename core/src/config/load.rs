use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default rbxluau data directory: ~/.rbxluau
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".rbxluau"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.rbxluau/config.toml (highest)
    let user_config = get_data_dir()?.join("config.toml");

    // Priority 2: ./rbxluau.toml (current directory)
    let local_config = Path::new("rbxluau.toml");

    let mut cfg = if user_config.exists() {
        read_config(&user_config)?
    } else if local_config.exists() {
        read_config(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Load an explicit config file; env overrides still apply on top.
pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = read_config(path)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    toml::from_str::<AppConfig>(&s).map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))
}

// Environment variable overrides (Priority 0: highest)
// Malformed numbers are rejected rather than skipped.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("RBXLUAU_API_KEY") {
        cfg.cloud.api_key = v;
    }
    if let Some(v) = get("RBXLUAU_UNIVERSE_ID") {
        cfg.cloud.universe_id = v;
    }
    if let Some(v) = get("RBXLUAU_PLACE_ID") {
        cfg.cloud.place_id = v;
    }
    if let Some(v) = get("RBXLUAU_BASE_URL") {
        cfg.cloud.base_url = v;
    }
    if let Some(v) = get("RBXLUAU_PLACE_VERSION") {
        let n = v
            .trim()
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("RBXLUAU_PLACE_VERSION={v:?} is not a version number: {e}"))?;
        cfg.cloud.place_version = Some(n);
    }
    if let Some(v) = get("RBXLUAU_PLUGIN_DIR") {
        cfg.local.plugin_dir = Some(v);
    }
    if let Some(v) = get("RBXLUAU_PORT") {
        cfg.local.port = v
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("RBXLUAU_PORT={v:?} is not a valid port: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_cloud_credentials() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(
            &mut cfg,
            lookup(&[
                ("RBXLUAU_API_KEY", "secret"),
                ("RBXLUAU_UNIVERSE_ID", "123"),
                ("RBXLUAU_PLACE_ID", "456"),
                ("RBXLUAU_PLACE_VERSION", "7"),
            ]),
        )
        .unwrap();
        assert!(cfg.cloud.has_credentials());
        assert_eq!(cfg.cloud.place_version, Some(7));
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(
            &mut cfg,
            lookup(&[("RBXLUAU_API_KEY", "  "), ("RBXLUAU_PORT", "")]),
        )
        .unwrap();
        assert!(cfg.cloud.api_key.is_empty());
        assert_eq!(cfg.local.port, 7777);
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let mut cfg = AppConfig::default();
        let err = apply_env_overrides(&mut cfg, lookup(&[("RBXLUAU_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("RBXLUAU_PORT"));
        assert_eq!(cfg.local.port, 7777);

        let err = apply_env_overrides(&mut cfg, lookup(&[("RBXLUAU_PLACE_VERSION", "v3")]))
            .unwrap_err();
        assert!(err.to_string().contains("RBXLUAU_PLACE_VERSION"));
        assert_eq!(cfg.cloud.place_version, None);
    }

    #[test]
    fn load_from_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[local]\nhandshake_timeout_ms = 5000\n").unwrap();

        let cfg = read_config(&path).unwrap();
        assert_eq!(cfg.local.handshake_timeout_ms, 5000);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[local\nport = ").unwrap();

        let err = read_config(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
