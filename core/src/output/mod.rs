//! Output Sink: the single destination for script output lines, echoed to the
//! console and optionally persisted to a file.
mod sink;

pub use sink::{split_lines, LogLevel, OutputSink, SinkOptions, LINE_ENDING};
