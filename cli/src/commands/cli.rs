use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "rbxluau",
    version,
    about = "All-in-one toolkit to seamlessly execute Roblox Luau"
)]
pub struct Args {
    /// Inline Luau code to execute if --script is not provided
    pub luau: Option<String>,

    /// Path to the Luau script file if not provided inline
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Path to an optional Roblox place file to execute the script in
    #[arg(short, long)]
    pub place: Option<PathBuf>,

    /// Run the Luau script on a local Roblox Studio instance
    #[arg(short, long)]
    pub local: bool,

    /// Write execution output to a file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Suppress Roblox output in the terminal
    #[arg(long)]
    pub silent: bool,

    /// Leave Studio running and return normally after completion
    #[arg(long = "no-exit")]
    pub no_exit: bool,

    /// Maximum execution time for cloud runs (e.g. "30s", "2m")
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Do not start Studio; wait for an already running one to connect
    #[arg(long = "no-launch")]
    pub no_launch: bool,

    /// End the local session as soon as the plugin disconnects
    #[arg(long)]
    pub oneshot: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long)]
    pub config: Option<PathBuf>,
}
