mod message;
mod ret;

pub use message::{parse_plugin_message, PluginMessage, ServerMessage};
pub use ret::ScriptReturn;
