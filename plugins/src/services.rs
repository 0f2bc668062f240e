//! `ServicesFactory` implementation: builds the launcher, plugin builder and
//! Open Cloud client from configuration for the CLI.
use rbxluau_core::api::{AppConfig, ExecError, Services, ServicesFactory};

use crate::factory;

#[derive(Default)]
pub struct PluginServicesFactory;

impl ServicesFactory for PluginServicesFactory {
    fn build_services(&self, cfg: &AppConfig) -> Result<Services, ExecError> {
        let task_api =
            factory::build_task_api(cfg).map_err(|e| ExecError::Config(format!("{e:#}")))?;
        Ok(Services {
            launcher: factory::build_launcher(cfg),
            plugin_builder: factory::build_plugin_builder(cfg),
            task_api,
        })
    }
}
