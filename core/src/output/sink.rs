use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use owo_colors::OwoColorize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ExecError;

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn tag(self) -> Option<&'static str> {
        match self {
            LogLevel::Info => None,
            LogLevel::Warn => Some("[WARN]"),
            LogLevel::Error => Some("[ERROR]"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    /// Mirror every line into this file (truncated on open).
    pub path: Option<PathBuf>,
    /// Echo lines to stdout/stderr.
    pub echo: bool,
    /// Colour console echo by level.
    pub color: bool,
}

/// Append-only leveled line channel.
///
/// Cloning yields another handle onto the same destination. Once `close` has
/// run, further writes are dropped silently.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Inner>,
}

struct Inner {
    echo: bool,
    color: bool,
    state: Mutex<SinkState>,
}

struct SinkState {
    closed: bool,
    tx: Option<mpsc::UnboundedSender<String>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
}

impl OutputSink {
    /// Console-only sink (or a fully silent one when `echo` is false).
    pub fn console(echo: bool, color: bool) -> Self {
        Self::from_parts(echo, color, None, None)
    }

    pub async fn open(opts: SinkOptions) -> Result<Self, ExecError> {
        let Some(path) = opts.path else {
            return Ok(Self::console(opts.echo, opts.color));
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ExecError::io(format!("create {}", parent.display()), e))?;
        }
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ExecError::io(format!("open {}", path.display()), e))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            let mut out = BufWriter::new(file);
            while let Some(line) = rx.recv().await {
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    tracing::error!(error.kind = "sink.write", path = %path.display(), error = %e);
                    return Err(e);
                }
            }
            out.flush().await?;
            out.into_inner().sync_all().await
        });

        Ok(Self::from_parts(opts.echo, opts.color, Some(tx), Some(writer)))
    }

    fn from_parts(
        echo: bool,
        color: bool,
        tx: Option<mpsc::UnboundedSender<String>>,
        writer: Option<JoinHandle<std::io::Result<()>>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                echo,
                color,
                state: Mutex::new(SinkState {
                    closed: false,
                    tx,
                    writer,
                }),
            }),
        }
    }

    pub fn info(&self, text: &str) {
        self.write(text, LogLevel::Info);
    }

    pub fn warn(&self, text: &str) {
        self.write(text, LogLevel::Warn);
    }

    pub fn error(&self, text: &str) {
        self.write(text, LogLevel::Error);
    }

    /// Writes one physical line per line of `text`; non-info lines get a tag.
    pub fn write(&self, text: &str, level: LogLevel) {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }

        for line in split_lines(text) {
            let formatted = match level.tag() {
                Some(tag) => format!("{tag} {line}"),
                None => line.to_string(),
            };

            if self.inner.echo {
                self.echo(&formatted, level);
            }

            if let Some(tx) = state.tx.as_ref() {
                let _ = tx.send(format!("{formatted}{LINE_ENDING}"));
            }
        }
    }

    fn echo(&self, line: &str, level: LogLevel) {
        match (level, self.inner.color) {
            (LogLevel::Info, _) | (LogLevel::Warn, false) => println!("{line}"),
            (LogLevel::Warn, true) => println!("{}", line.yellow()),
            (LogLevel::Error, false) => eprintln!("{line}"),
            (LogLevel::Error, true) => eprintln!("{}", line.red()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Flushes and releases the destination. Only the first call does work.
    pub async fn close(&self) -> std::io::Result<()> {
        let writer = {
            let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.tx = None;
            state.writer.take()
        };

        match writer {
            Some(handle) => handle.await.map_err(std::io::Error::other)?,
            None => Ok(()),
        }
    }
}

/// Splits text into physical lines. Empty text is one empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return vec![""];
    }
    text.lines().collect()
}
