use std::sync::Arc;

use anyhow::Result;

use rbxluau_core::api::{AppConfig, HostLauncher, LuauTaskApi, PluginBuilder};

use crate::builder::CommandPluginBuilder;
use crate::cloud::OpenCloudClient;
use crate::launcher::platform_launcher;

pub fn build_launcher(_cfg: &AppConfig) -> Arc<dyn HostLauncher> {
    platform_launcher()
}

pub fn build_plugin_builder(cfg: &AppConfig) -> Arc<dyn PluginBuilder> {
    Arc::new(CommandPluginBuilder::new(cfg.local.build_command.clone()))
}

/// `None` unless every Open Cloud credential is configured.
pub fn build_cloud_client(cfg: &AppConfig) -> Result<Option<OpenCloudClient>> {
    if !cfg.cloud.has_credentials() {
        return Ok(None);
    }
    let client = OpenCloudClient::new(
        &cfg.cloud.base_url,
        &cfg.cloud.api_key,
        &cfg.cloud.user_agent,
        cfg.cloud.request_timeout_ms,
    )?;
    Ok(Some(client))
}

pub fn build_task_api(cfg: &AppConfig) -> Result<Option<Arc<dyn LuauTaskApi>>> {
    Ok(build_cloud_client(cfg)?.map(|c| Arc::new(c) as Arc<dyn LuauTaskApi>))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_no_client() {
        let cfg = AppConfig::default();
        assert!(build_cloud_client(&cfg).unwrap().is_none());
    }

    #[test]
    fn credentials_build_client() {
        let mut cfg = AppConfig::default();
        cfg.cloud.api_key = "key".into();
        cfg.cloud.universe_id = "1".into();
        cfg.cloud.place_id = "2".into();
        assert!(build_task_api(&cfg).unwrap().is_some());
    }

    #[test]
    fn invalid_key_is_an_error() {
        let mut cfg = AppConfig::default();
        cfg.cloud.api_key = "bad\nkey".into();
        cfg.cloud.universe_id = "1".into();
        cfg.cloud.place_id = "2".into();
        assert!(build_cloud_client(&cfg).is_err());
    }
}
