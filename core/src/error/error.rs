use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("execution failed: {0}")]
    Exec(#[from] ExecError),
    #[error("config error: {0}")]
    Config(String),
    #[error("input error: {0}")]
    Input(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("could not locate a Roblox Studio installation: {0}")]
    Discovery(String),
    #[error("plugin build failed: {0}")]
    Build(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
    #[error("place file does not exist at path: {}", .0.display())]
    InvalidPlace(PathBuf),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("{code} {message}")]
    RemoteTask { code: String, message: String },
    #[error("config error: {0}")]
    Config(String),
}

impl ExecError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Errors raised before anything was launched or submitted.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Discovery(_) | Self::Build(_) | Self::Io { .. } | Self::InvalidPlace(_)
        )
    }
}
