use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::LocalConfig;
use crate::error::ExecError;

use super::traits::PluginBuilder;
use super::types::HostInstall;

/// Copies the companion plugin into the host's plugin directory, building it
/// first when the artifact is missing.
pub struct PluginInstaller {
    plugin_dir: PathBuf,
    artifact_name: String,
    plugin_file_name: String,
    builder: Arc<dyn PluginBuilder>,
}

impl PluginInstaller {
    pub fn new(plugin_dir: PathBuf, cfg: &LocalConfig, builder: Arc<dyn PluginBuilder>) -> Self {
        Self {
            plugin_dir,
            artifact_name: cfg.artifact_name.clone(),
            plugin_file_name: cfg.plugin_file_name.clone(),
            builder,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.plugin_dir.join(&self.artifact_name)
    }

    pub fn installed_path(&self, install: &HostInstall) -> PathBuf {
        install.plugins_path.join(&self.plugin_file_name)
    }

    #[tracing::instrument(name = "local.install_plugin", skip_all, fields(plugins = %install.plugins_path.display()))]
    pub async fn install(&self, install: &HostInstall) -> Result<PathBuf, ExecError> {
        let artifact = self.artifact_path();

        let data = match read_if_exists(&artifact).await? {
            Some(data) => data,
            None => {
                tracing::info!(artifact = %artifact.display(), "plugin artifact missing, building");
                self.builder.build(&self.plugin_dir).await?;
                read_if_exists(&artifact).await?.ok_or_else(|| {
                    ExecError::Build(format!(
                        "could not open plugin file {} after build",
                        artifact.display()
                    ))
                })?
            }
        };

        tokio::fs::create_dir_all(&install.plugins_path)
            .await
            .map_err(|e| ExecError::io(format!("create {}", install.plugins_path.display()), e))?;

        let target = self.installed_path(install);
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| ExecError::io(format!("write {}", target.display()), e))?;
        tracing::debug!(target_path = %target.display(), "plugin installed");
        Ok(target)
    }
}

pub(crate) async fn remove_installed(path: &Path) -> Result<(), ExecError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExecError::io(format!("remove {}", path.display()), e)),
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, ExecError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ExecError::io(format!("read {}", path.display()), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WritingBuilder {
        calls: AtomicUsize,
        produce: bool,
    }

    #[async_trait]
    impl PluginBuilder for WritingBuilder {
        async fn build(&self, plugin_dir: &Path) -> Result<(), ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.produce {
                std::fs::write(plugin_dir.join("plugin.rbxm"), b"built").unwrap();
            }
            Ok(())
        }
    }

    fn fixture(produce: bool) -> (tempfile::TempDir, PluginInstaller, HostInstall, Arc<WritingBuilder>) {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("plugin");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        let builder = Arc::new(WritingBuilder {
            calls: AtomicUsize::new(0),
            produce,
        });
        let installer = PluginInstaller::new(plugin_dir, &LocalConfig::default(), builder.clone());
        let install = HostInstall {
            application_path: dir.path().join("Studio.exe"),
            plugins_path: dir.path().join("Plugins"),
        };
        (dir, installer, install, builder)
    }

    #[tokio::test]
    async fn existing_artifact_is_copied_without_building() {
        let (_dir, installer, install, builder) = fixture(true);
        std::fs::write(installer.artifact_path(), b"prebuilt").unwrap();

        let path = installer.install(&install).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"prebuilt");
        assert_eq!(path.file_name().unwrap(), "rbxluau.rbxm");
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_artifact_triggers_build() {
        let (_dir, installer, install, builder) = fixture(true);

        let path = installer.install(&install).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"built");
        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn build_without_artifact_is_a_build_error() {
        let (_dir, installer, install, _builder) = fixture(false);

        let err = installer.install(&install).await.unwrap_err();
        assert!(matches!(err, ExecError::Build(_)));
        assert!(!installer.installed_path(&install).exists());
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let (_dir, installer, install, _builder) = fixture(true);
        std::fs::write(installer.artifact_path(), b"prebuilt").unwrap();
        let path = installer.install(&install).await.unwrap();

        remove_installed(&path).await.unwrap();
        assert!(!path.exists());
        remove_installed(&path).await.unwrap();
    }
}
