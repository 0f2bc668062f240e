//! Local runner: drives a live Studio instance through the companion plugin.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::Instrument;

use crate::config::LocalConfig;
use crate::error::ExecError;
use crate::output::OutputSink;
use crate::protocol::{parse_plugin_message, PluginMessage, ScriptReturn, ServerMessage};
use crate::request::ExecutionRequest;

use super::install::PluginInstaller;
use super::session::{PluginSocket, Session, SessionPhase};
use super::signal::shutdown_signal;
use super::traits::{HostLauncher, HostProcess, PluginBuilder};

const HANDSHAKE_TIMEOUT_HINT: &str =
    "Caught a timeout while waiting for a studio instance to start - do you need to login?";

/// Upper bound on a single WebSocket upgrade; a peer that never sends it is dropped.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(2);

type Upgrade = (SocketAddr, Result<PluginSocket, String>);

pub struct LocalRunner {
    cfg: LocalConfig,
    launcher: Arc<dyn HostLauncher>,
    installer: PluginInstaller,
}

enum Event {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Upgraded(Option<Upgrade>),
    Frame(Option<Result<Message, tungstenite::Error>>),
    StopRequested(Option<String>),
    Signal,
    ProcessExited(anyhow::Result<i32>),
    HandshakeTimeout,
    HideTick,
}

impl LocalRunner {
    pub fn new(
        cfg: LocalConfig,
        plugin_dir: PathBuf,
        launcher: Arc<dyn HostLauncher>,
        builder: Arc<dyn PluginBuilder>,
    ) -> Self {
        let installer = PluginInstaller::new(plugin_dir, &cfg, builder);
        Self {
            cfg,
            launcher,
            installer,
        }
    }

    pub fn launcher_name(&self) -> &str {
        self.launcher.name()
    }

    /// Runs `request` to completion and returns its exit code.
    ///
    /// `stop_rx` lets the caller end the session early; the reason is logged.
    /// Interrupt signals end it the same way.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        sink: &OutputSink,
        stop_rx: Option<mpsc::Receiver<String>>,
    ) -> i32 {
        let mut session = Session::new(request.keep_alive);
        let span = tracing::info_span!("local.run", session_id = %session.id, port = self.cfg.port);

        async move {
            let _ = session.transition(SessionPhase::Launching);

            let code = match self.prepare(request, &mut session).await {
                Ok(()) => self.drive(request, sink, &mut session, stop_rx).await,
                Err(failure) => {
                    tracing::error!(error.kind = failure.kind(), error = %failure.error());
                    sink.error(&failure.to_string());
                    1
                }
            };

            session.stop().await;
            code
        }
        .instrument(span)
        .await
    }

    /// Setup steps that can fail before the session starts exchanging messages.
    async fn prepare(
        &self,
        request: &ExecutionRequest,
        session: &mut Session,
    ) -> Result<(), SetupFailure> {
        let install = self.launcher.locate().map_err(SetupFailure::Locate)?;
        let place = if request.launch {
            Some(
                self.resolve_place(request.place.as_deref())
                    .map_err(SetupFailure::Locate)?,
            )
        } else {
            None
        };

        let installed = self
            .installer
            .install(&install)
            .await
            .map_err(SetupFailure::Install)?;
        session.installed_plugin = Some(installed);

        let addr = SocketAddr::from(([127, 0, 0, 1], self.cfg.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            SetupFailure::Listen(ExecError::Transport(format!("bind {addr}: {e}")))
        })?;
        tracing::debug!(%addr, "control channel listening");
        session.listener = Some(listener);

        let Some(place) = place else {
            let _ = session.transition(SessionPhase::Running);
            return Ok(());
        };

        let process = self
            .launcher
            .launch(&install, &place)
            .await
            .map_err(SetupFailure::Launch)?;
        tracing::info!(pid = ?process.id(), place = %place.display(), "host launched");

        if self.launcher.supports_window_hiding() {
            let mut timer = tokio::time::interval(Duration::from_millis(
                self.cfg.window_hide_interval_ms.max(1),
            ));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            session.hide_timer = Some(timer);
        }
        session.process = Some(process);
        let _ = session.transition(SessionPhase::AwaitingHandshake);
        Ok(())
    }

    fn resolve_place(&self, explicit: Option<&Path>) -> Result<PathBuf, ExecError> {
        let place = match explicit {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => std::env::current_dir()
                .map_err(|e| ExecError::io("resolve current directory", e))?
                .join(p),
            None => self.installer.plugin_dir().join(&self.cfg.default_place),
        };
        if !place.is_file() {
            return Err(ExecError::InvalidPlace(place));
        }
        Ok(place)
    }

    async fn drive(
        &self,
        request: &ExecutionRequest,
        sink: &OutputSink,
        session: &mut Session,
        mut stop_rx: Option<mpsc::Receiver<String>>,
    ) -> i32 {
        let execute = ServerMessage::Execute {
            script: request.script.clone(),
        }
        .to_text();
        let mut execute_sent = false;
        let (upgrade_tx, mut upgrade_rx) = mpsc::channel::<Upgrade>(4);

        let handshake_deadline = (session.phase() == SessionPhase::AwaitingHandshake)
            .then(|| Instant::now() + Duration::from_millis(self.cfg.handshake_timeout_ms));

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        while !session.phase().is_stopping() {
            let deadline = handshake_deadline
                .filter(|_| session.phase() == SessionPhase::AwaitingHandshake);

            let event = tokio::select! {
                biased;
                frame = next_frame(session.client.as_mut()) => Event::Frame(frame),
                upgraded = upgrade_rx.recv() => Event::Upgraded(upgraded),
                accepted = accept_next(session.listener.as_ref()) => Event::Accepted(accepted),
                reason = next_stop(stop_rx.as_mut()) => Event::StopRequested(reason),
                _ = &mut shutdown => Event::Signal,
                status = wait_exit(session.process.as_mut()) => Event::ProcessExited(status),
                _ = sleep_until(deadline) => Event::HandshakeTimeout,
                _ = next_tick(session.hide_timer.as_mut()) => Event::HideTick,
            };

            match event {
                Event::Frame(Some(Ok(msg))) => {
                    if let Some(text) = frame_text(msg) {
                        self.handle_text(&text, sink, session).await;
                    }
                }
                Event::Frame(Some(Err(e))) => {
                    tracing::warn!(error.kind = "local.socket", error = %e, "plugin connection failed");
                    self.on_disconnect(request, session).await;
                }
                Event::Frame(None) => {
                    self.on_disconnect(request, session).await;
                }
                Event::Accepted(Ok((stream, peer))) => {
                    if session.client.is_some() {
                        tracing::warn!(%peer, "rejecting second plugin connection");
                        continue;
                    }
                    tokio::spawn(upgrade(stream, peer, upgrade_tx.clone()));
                }
                Event::Upgraded(Some((peer, Ok(mut socket)))) => {
                    if session.client.is_some() {
                        tracing::warn!(%peer, "rejecting second plugin connection");
                        continue;
                    }
                    tracing::debug!(%peer, "plugin connected");
                    if !execute_sent {
                        match socket.send(Message::Text(execute.clone())).await {
                            Ok(()) => execute_sent = true,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to send execute");
                                continue;
                            }
                        }
                    }
                    session.client = Some(socket);
                }
                Event::Upgraded(Some((peer, Err(e)))) => {
                    tracing::warn!(%peer, error = %e, "websocket handshake failed");
                }
                // upgrade_tx lives as long as this loop
                Event::Upgraded(None) => {}
                Event::Accepted(Err(e)) => {
                    tracing::warn!(error = %e, "accept failed");
                }
                Event::StopRequested(reason) => match reason {
                    Some(reason) => {
                        tracing::warn!(reason = %reason, "stop requested");
                        session.stop().await;
                    }
                    None => stop_rx = None,
                },
                Event::Signal => {
                    session.stop().await;
                }
                Event::ProcessExited(status) => {
                    // Already gone; nothing left to kill.
                    session.process = None;
                    match status {
                        Ok(code) => tracing::warn!(code, "host exited"),
                        Err(e) => tracing::warn!(error = %e, "host wait failed"),
                    }
                    session.stop().await;
                }
                Event::HandshakeTimeout => {
                    tracing::error!(
                        error.kind = "local.handshake_timeout",
                        timeout_ms = self.cfg.handshake_timeout_ms
                    );
                    sink.error(HANDSHAKE_TIMEOUT_HINT);
                    session.set_exit_code(1);
                    session.stop().await;
                }
                Event::HideTick => {
                    if let Some(pid) = session.process.as_ref().and_then(|p| p.id()) {
                        if let Err(e) = self.launcher.hide_windows(pid) {
                            tracing::trace!(error = %e, "hide windows failed");
                        }
                    }
                }
            }
        }

        session.exit_code()
    }

    async fn handle_text(&self, text: &str, sink: &OutputSink, session: &mut Session) {
        let msg = match parse_plugin_message(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error.kind = "local.protocol", error = %e, "ignoring plugin message");
                return;
            }
        };

        match msg {
            PluginMessage::Ready => {
                if session.phase() == SessionPhase::AwaitingHandshake {
                    let _ = session.transition(SessionPhase::Running);
                    tracing::info!("plugin ready");
                }
            }
            PluginMessage::Output {
                message_type,
                message,
            } => {
                sink.write(&message, PluginMessage::output_level(message_type.as_deref()));
            }
            PluginMessage::Complete { exit_code } => {
                let ret = ScriptReturn::from_value(exit_code.as_ref());
                if let Some(value) = ret.display() {
                    sink.info(value);
                }
                session.set_exit_code(ret.exit_code());
                tracing::info!(exit_code = ret.exit_code(), "execution complete");
                session.stop().await;
            }
            PluginMessage::Error { message } => {
                sink.error(&format!("Execution error: {message}"));
                session.set_exit_code(1);
                session.stop().await;
            }
        }
    }

    async fn on_disconnect(&self, request: &ExecutionRequest, session: &mut Session) {
        session.client = None;
        tracing::debug!("plugin disconnected");
        if request.oneshot {
            session.stop().await;
        }
    }
}

/// Where setup stopped; decides how the failure is worded.
enum SetupFailure {
    Locate(ExecError),
    Install(ExecError),
    Listen(ExecError),
    Launch(ExecError),
}

impl SetupFailure {
    fn error(&self) -> &ExecError {
        match self {
            Self::Locate(e) | Self::Install(e) | Self::Listen(e) | Self::Launch(e) => e,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Locate(_) => "local.locate",
            Self::Install(_) => "local.install",
            Self::Listen(_) => "local.listen",
            Self::Launch(_) => "local.spawn",
        }
    }
}

impl std::fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install(e) => write!(f, "Failed to install plugin: {e}"),
            Self::Launch(e) => write!(f, "Failed to launch Studio: {e}"),
            Self::Locate(e) | Self::Listen(e) => write!(f, "{e}"),
        }
    }
}

fn frame_text(msg: Message) -> Option<String> {
    match msg {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::warn!(error.kind = "local.protocol", "ignoring non-utf8 binary frame");
                None
            }
        },
        _ => None,
    }
}

async fn next_frame(
    client: Option<&mut PluginSocket>,
) -> Option<Result<Message, tungstenite::Error>> {
    match client {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

async fn accept_next(listener: Option<&TcpListener>) -> std::io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

async fn upgrade(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Upgrade>) {
    let handshake = tokio_tungstenite::accept_async(stream);
    let result = match tokio::time::timeout(UPGRADE_TIMEOUT, handshake).await {
        Ok(Ok(socket)) => Ok(socket),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no upgrade request within {}s", UPGRADE_TIMEOUT.as_secs())),
    };
    // Receiver is gone once the session has stopped.
    let _ = tx.send((peer, result)).await;
}

async fn next_stop(rx: Option<&mut mpsc::Receiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_exit(process: Option<&mut Box<dyn HostProcess>>) -> anyhow::Result<i32> {
    match process {
        Some(process) => process.wait().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
