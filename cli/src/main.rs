use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rbxluau_cli::{app, commands::cli};
use rbxluau_core::api::{self as core_api, AppContext, CliError, ExecError};
use rbxluau_plugins::services::PluginServicesFactory;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    let no_exit = args.no_exit;

    let exit = match real_main(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    if no_exit {
        return ExitCode::from(exit.clamp(0, 255) as u8);
    }
    std::process::exit(exit);
}

async fn real_main(args: cli::Args) -> Result<i32, CliError> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cfg = match args.config.as_deref() {
        Some(path) => core_api::load_from(path),
        None => core_api::load_default(),
    }
    .map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Config)?;

    let ctx = AppContext::new(cfg, Some(Arc::new(PluginServicesFactory)));
    app::run_app(args, &ctx).await
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0..: the script's own exit code (never an error)
    // 11: config error
    // 20: setup error (discovery, plugin build, file access)
    // 30: remote transport / timeout
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Exec(ee) if ee.is_setup() => 20,
        CliError::Exec(ee) => match ee {
            ExecError::Config(_) => 11,
            ExecError::Transport(_) | ExecError::Timeout(_) => 30,
            _ => 50,
        },
        CliError::Input(_) => 20,
        CliError::Io(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &core_api::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("rbxluau"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("rbxluau.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_by_error_class() {
        assert_eq!(exit_code_for_error(&CliError::Config("bad".into())), 11);
        assert_eq!(
            exit_code_for_error(&ExecError::Discovery("none".into()).into()),
            20
        );
        assert_eq!(
            exit_code_for_error(&ExecError::InvalidPlace(PathBuf::from("x.rbxl")).into()),
            20
        );
        assert_eq!(
            exit_code_for_error(&ExecError::Transport("down".into()).into()),
            30
        );
        assert_eq!(
            exit_code_for_error(&ExecError::Timeout("slow".into()).into()),
            30
        );
        assert_eq!(
            exit_code_for_error(&CliError::Anyhow(anyhow::anyhow!("?"))),
            50
        );
    }

    #[test]
    fn setup_class_covers_build_and_io() {
        assert_eq!(exit_code_for_error(&ExecError::Build("npx missing".into()).into()), 20);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(exit_code_for_error(&ExecError::io("write plugin", io).into()), 20);
        assert_eq!(exit_code_for_error(&ExecError::Config("no client".into()).into()), 11);
        assert_eq!(
            exit_code_for_error(
                &ExecError::RemoteTask {
                    code: "INTERNAL".into(),
                    message: "boom".into(),
                }
                .into()
            ),
            50
        );
    }

    #[test]
    fn file_only_logging_requires_a_writer() {
        let logging = core_api::LoggingConfig {
            console: false,
            file: false,
            ..core_api::LoggingConfig::default()
        };
        assert!(init_tracing(&logging).is_err());
    }
}
