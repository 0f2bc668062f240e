//! Session resources and the phase machine that guards their teardown.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Interval;
use tokio_tungstenite::WebSocketStream;

use super::install::remove_installed;
use super::traits::HostProcess;

pub type PluginSocket = WebSocketStream<TcpStream>;

const CLOSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Launching,
    AwaitingHandshake,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionPhase,
        to: SessionPhase,
    },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: SessionPhase },
}

impl SessionPhase {
    pub fn validate(self, to: SessionPhase) -> Result<(), TransitionError> {
        if self == SessionPhase::Stopped {
            return Err(TransitionError::FromTerminalState { state: self });
        }

        let is_valid = match (self, to) {
            (SessionPhase::Idle, SessionPhase::Launching) => true,
            (SessionPhase::Launching, SessionPhase::AwaitingHandshake) => true,
            // Nothing launched: no handshake to wait for.
            (SessionPhase::Launching, SessionPhase::Running) => true,
            (SessionPhase::AwaitingHandshake, SessionPhase::Running) => true,
            (SessionPhase::Stopping, SessionPhase::Stopped) => true,
            (from, SessionPhase::Stopping) => !from.is_stopping(),
            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from: self, to })
        }
    }

    /// Stopping or Stopped: teardown has begun and further stops are no-ops.
    pub fn is_stopping(self) -> bool {
        matches!(self, SessionPhase::Stopping | SessionPhase::Stopped)
    }
}

/// Everything one local run owns. Released exactly once by [`Session::stop`].
pub struct Session {
    pub id: String,
    phase: SessionPhase,
    exit_code: i32,
    keep_alive: bool,
    pub listener: Option<TcpListener>,
    pub client: Option<PluginSocket>,
    pub process: Option<Box<dyn HostProcess>>,
    pub hide_timer: Option<Interval>,
    pub installed_plugin: Option<PathBuf>,
}

impl Session {
    pub fn new(keep_alive: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            phase: SessionPhase::Idle,
            exit_code: 1,
            keep_alive,
            listener: None,
            client: None,
            process: None,
            hide_timer: None,
            installed_plugin: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    pub fn transition(&mut self, to: SessionPhase) -> Result<(), TransitionError> {
        self.phase.validate(to)?;
        tracing::debug!(session_id = %self.id, from = ?self.phase, to = ?to, "session phase");
        self.phase = to;
        Ok(())
    }

    /// Releases every resource. Returns false when teardown already happened.
    pub async fn stop(&mut self) -> bool {
        if self.transition(SessionPhase::Stopping).is_err() {
            return false;
        }

        self.hide_timer = None;

        if let Some(mut client) = self.client.take() {
            let _ = tokio::time::timeout(CLOSE_GRACE, client.close(None)).await;
        }
        self.listener = None;

        if let Some(mut process) = self.process.take() {
            if self.keep_alive {
                tracing::info!(session_id = %self.id, pid = ?process.id(), "leaving host running");
            } else if let Err(e) = process.kill().await {
                tracing::warn!(session_id = %self.id, error = %e, "failed to kill host process");
            }
        }

        if let Some(path) = self.installed_plugin.take() {
            if let Err(e) = remove_installed(&path).await {
                tracing::debug!(session_id = %self.id, error = %e, "plugin removal failed");
            }
        }

        let _ = self.transition(SessionPhase::Stopped);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProcess {
        kills: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HostProcess for CountingProcess {
        fn id(&self) -> Option<u32> {
            Some(1)
        }

        async fn wait(&mut self) -> anyhow::Result<i32> {
            std::future::pending().await
        }

        async fn kill(&mut self) -> anyhow::Result<()> {
            self.kills.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn valid_transitions() {
        assert!(SessionPhase::Idle.validate(SessionPhase::Launching).is_ok());
        assert!(SessionPhase::Launching
            .validate(SessionPhase::AwaitingHandshake)
            .is_ok());
        assert!(SessionPhase::AwaitingHandshake
            .validate(SessionPhase::Running)
            .is_ok());
        assert!(SessionPhase::Running.validate(SessionPhase::Stopping).is_ok());
        assert!(SessionPhase::Idle.validate(SessionPhase::Stopping).is_ok());
        assert!(SessionPhase::Stopping.validate(SessionPhase::Stopped).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(SessionPhase::Idle.validate(SessionPhase::Running).is_err());
        assert!(SessionPhase::Running
            .validate(SessionPhase::AwaitingHandshake)
            .is_err());
        assert!(SessionPhase::Stopping
            .validate(SessionPhase::Stopping)
            .is_err());
        assert!(matches!(
            SessionPhase::Stopped.validate(SessionPhase::Stopping),
            Err(TransitionError::FromTerminalState { .. })
        ));
    }

    #[tokio::test]
    async fn stop_twice_releases_once() {
        let kills = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir.path().join("rbxluau.rbxm");
        std::fs::write(&plugin, b"x").unwrap();

        let mut session = Session::new(false);
        session.transition(SessionPhase::Launching).unwrap();
        session.listener = Some(TcpListener::bind("127.0.0.1:0").await.unwrap());
        session.process = Some(Box::new(CountingProcess {
            kills: kills.clone(),
        }));
        session.installed_plugin = Some(plugin.clone());

        assert!(session.stop().await);
        assert!(!session.stop().await);

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert_eq!(kills.load(Ordering::SeqCst), 1);
        assert!(session.listener.is_none());
        assert!(session.process.is_none());
        assert!(!plugin.exists());
        assert_eq!(session.exit_code(), 1);
    }

    #[tokio::test]
    async fn keep_alive_skips_kill() {
        let kills = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new(true);
        session.process = Some(Box::new(CountingProcess {
            kills: kills.clone(),
        }));

        assert!(session.stop().await);
        assert_eq!(kills.load(Ordering::SeqCst), 0);
        assert!(session.process.is_none());
    }
}
