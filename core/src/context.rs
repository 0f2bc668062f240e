use std::sync::Arc;

use crate::cloud::LuauTaskApi;
use crate::config::AppConfig;
use crate::error::ExecError;
use crate::local::{HostLauncher, PluginBuilder};

/// Concrete collaborators the backends run against.
#[derive(Clone)]
pub struct Services {
    pub launcher: Arc<dyn HostLauncher>,
    pub plugin_builder: Arc<dyn PluginBuilder>,
    /// Absent when no Open Cloud credentials are configured.
    pub task_api: Option<Arc<dyn LuauTaskApi>>,
}

pub trait ServicesFactory: Send + Sync {
    fn build_services(&self, cfg: &AppConfig) -> Result<Services, ExecError>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    services_factory: Option<Arc<dyn ServicesFactory>>,
}

impl AppContext {
    pub fn new(cfg: AppConfig, services_factory: Option<Arc<dyn ServicesFactory>>) -> Self {
        Self {
            cfg,
            services_factory,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn build_services(&self) -> Result<Services, ExecError> {
        let Some(factory) = self.services_factory.as_ref() else {
            return Err(ExecError::Config(
                "services_factory missing (cannot build launchers/clients)".into(),
            ));
        };
        factory.build_services(&self.cfg)
    }
}
