//! Turns parsed arguments into an execution request and hands it to the orchestrator.
use std::path::Path;

use rbxluau_core::api::{
    AppConfig, AppContext, Backend, CliError, ExecError, ExecutionMode, ExecutionRequest,
    Orchestrator,
};
use rbxluau_plugins::factory;

use crate::commands::cli::Args;

/// Inline code, or the contents of `--script`.
pub fn load_script(args: &Args) -> Result<String, CliError> {
    if let Some(path) = args.script.as_deref() {
        return std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("read script {} failed: {e}", path.display())));
    }
    match args.luau.as_deref() {
        Some(code) if !code.is_empty() => Ok(code.to_string()),
        _ => Err(CliError::Input(
            "No Luau script provided. Use --script or provide inline code.".into(),
        )),
    }
}

pub fn build_request(args: &Args, script: String) -> ExecutionRequest {
    let mode = if args.local {
        ExecutionMode::Local
    } else {
        ExecutionMode::Cloud
    };
    let mut request = ExecutionRequest::new(script, mode);
    request.silent = args.silent;
    request.output = args.out.clone();
    request.keep_alive = args.no_exit;
    request.launch = !args.no_launch;
    request.oneshot = args.oneshot;
    request.timeout = args.timeout;
    request
}

#[tracing::instrument(name = "cli.run_app", skip_all)]
pub async fn run_app(args: Args, ctx: &AppContext) -> Result<i32, CliError> {
    let script = load_script(&args)?;
    let mut request = build_request(&args, script);

    let services = ctx.build_services()?;
    let orchestrator = Orchestrator::new(ctx.cfg().clone(), services)
        .with_color(atty::is(atty::Stream::Stdout));

    let backend = orchestrator.backend_for(&request);
    if request.mode == ExecutionMode::Cloud && backend == Backend::Local {
        tracing::warn!("Open Cloud credentials not configured, running in local Studio");
    }

    if let Some(place) = args.place.as_deref() {
        match backend {
            Backend::Local => request.place = Some(place.to_path_buf()),
            Backend::Cloud => request.place_version = Some(upload_place(ctx.cfg(), place).await?),
        }
    }

    Ok(orchestrator.execute(&request).await?)
}

async fn upload_place(cfg: &AppConfig, place: &Path) -> Result<u64, CliError> {
    let client = factory::build_cloud_client(cfg)?
        .ok_or_else(|| CliError::Config("Open Cloud credentials are required to upload a place".into()))?;
    let bytes = tokio::fs::read(place)
        .await
        .map_err(|e| ExecError::io(format!("read place {}", place.display()), e))?;
    let version = client
        .upload_place(&cfg.cloud.universe_id, &cfg.cloud.place_id, bytes)
        .await
        .map_err(|e| ExecError::Transport(format!("place upload failed: {e}")))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn inline_script_is_used() {
        let args = Args::try_parse_from(["rbxluau", "print(1)"]).unwrap();
        assert_eq!(load_script(&args).unwrap(), "print(1)");
    }

    #[test]
    fn script_file_wins_over_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.luau");
        std::fs::write(&path, "return 2").unwrap();
        let args = Args::try_parse_from(["rbxluau", "-s", path.to_str().unwrap(), "print(1)"]).unwrap();
        assert_eq!(load_script(&args).unwrap(), "return 2");
    }

    #[test]
    fn missing_script_is_input_error() {
        let args = Args::try_parse_from(["rbxluau"]).unwrap();
        assert!(matches!(load_script(&args), Err(CliError::Input(m)) if m.starts_with("No Luau script")));

        let args = Args::try_parse_from(["rbxluau", "-s", "/no/such/file.luau"]).unwrap();
        assert!(matches!(load_script(&args), Err(CliError::Input(_))));
    }

    #[test]
    fn request_reflects_flags() {
        let args = Args::try_parse_from([
            "rbxluau", "--local", "--silent", "--no-exit", "--no-launch", "--timeout", "30s",
            "print(1)",
        ])
        .unwrap();
        let req = build_request(&args, "print(1)".into());
        assert_eq!(req.mode, ExecutionMode::Local);
        assert!(req.silent && req.keep_alive && !req.launch);
        assert_eq!(req.timeout, Duration::from_secs(30));

        let args = Args::try_parse_from(["rbxluau", "print(1)"]).unwrap();
        let req = build_request(&args, "print(1)".into());
        assert_eq!(req.mode, ExecutionMode::Cloud);
        assert!(req.launch && !req.keep_alive);
    }
}
