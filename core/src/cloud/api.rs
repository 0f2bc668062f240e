use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{LogGroup, LuauTask, TaskTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl ApiErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one remote call, classified so the poller can tell a hiccup
/// from a hard error.
#[derive(Debug)]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            url: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn status_error(status: u16, url: impl Into<String>, preview: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Status,
            status: Some(status),
            url: Some(url.into()),
            message: preview.into(),
            source: None,
        }
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Worth another attempt: connection trouble, timeouts, throttling and
    /// server-side errors.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            ApiErrorKind::Timeout | ApiErrorKind::Connect => true,
            ApiErrorKind::Status => matches!(self.status, Some(429) | Some(500..=599)),
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "open cloud error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

/// Remote Luau execution service.
#[async_trait]
pub trait LuauTaskApi: Send + Sync {
    async fn create_task(
        &self,
        target: &TaskTarget,
        script: &str,
        timeout: Duration,
    ) -> Result<LuauTask, ApiError>;

    async fn get_task(&self, path: &str) -> Result<LuauTask, ApiError>;

    /// All log groups of a task, across every page.
    async fn get_logs(&self, path: &str) -> Result<Vec<LogGroup>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::new(ApiErrorKind::Timeout, "slow").is_transient());
        assert!(ApiError::new(ApiErrorKind::Connect, "refused").is_transient());
        assert!(ApiError::status_error(429, "u", "slow down").is_transient());
        assert!(ApiError::status_error(503, "u", "unavailable").is_transient());
        assert!(!ApiError::status_error(403, "u", "forbidden").is_transient());
        assert!(!ApiError::new(ApiErrorKind::Decode, "bad json").is_transient());
    }

    #[test]
    fn display_includes_kind_status_and_url() {
        let err = ApiError::status_error(502, "https://apis.example/cloud/v2/x", "bad gateway");
        let msg = err.to_string();
        assert!(msg.contains("kind=status"));
        assert!(msg.contains("status=502"));
        assert!(msg.contains("url=https://apis.example/cloud/v2/x"));
        assert!(msg.ends_with("bad gateway"));
    }
}
