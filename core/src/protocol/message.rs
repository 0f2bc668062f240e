//! Control channel messages exchanged with the companion Studio plugin.
//!
//! Every frame is a JSON object tagged by `"type"`. The plugin speaks the
//! closed set in [`PluginMessage`]; the runner only ever sends
//! [`ServerMessage::Execute`].

use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::output::LogLevel;

/// Frames sent by the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PluginMessage {
    /// Plugin loaded and listening; completes the handshake.
    Ready,

    /// One `LogService.MessageOut` entry.
    Output {
        #[serde(rename = "messageType", default)]
        message_type: Option<String>,
        #[serde(default)]
        message: String,
    },

    /// Script returned. `exitCode` is whatever the script returned, if anything.
    Complete {
        #[serde(rename = "exitCode", default)]
        exit_code: Option<serde_json::Value>,
    },

    /// Script raised.
    Error {
        #[serde(default)]
        message: String,
    },
}

impl PluginMessage {
    /// Level of an `output` frame, derived from the Studio message type.
    pub fn output_level(message_type: Option<&str>) -> LogLevel {
        match message_type {
            Some("Enum.MessageType.MessageWarning") => LogLevel::Warn,
            Some("Enum.MessageType.MessageError") => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Frames sent to the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Execute { script: String },
}

impl ServerMessage {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Parse one text frame. Unknown tags and malformed JSON are protocol errors;
/// callers log them and keep the session alive.
pub fn parse_plugin_message(text: &str) -> Result<PluginMessage, ExecError> {
    serde_json::from_str(text).map_err(|e| ExecError::Protocol(format!("{e}: {}", preview(text))))
}

fn preview(s: &str) -> String {
    const MAX: usize = 160;
    if s.len() <= MAX {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push('…');
    out
}
