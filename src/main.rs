use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use codekb::cli::commands::{handle_build, handle_config, handle_models};
use codekb::cli::output::get_formatter;
use codekb::cli::{Cli, Commands};
use codekb::logging;
use codekb::models::{Config, OutputFormat};

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/codekb/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/codekb/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

fn main() -> Result<()> {
    // Both mutate the environment, so they run before the runtime starts threads.
    dotenvy::dotenv().ok();
    detect_and_set_ort_path();

    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprint!(
                "{}",
                get_formatter(format).format_error(&format!(
                    "failed to load {}: {}",
                    cli.config.display(),
                    e
                ))
            );
            std::process::exit(1);
        }
    };
    let guard = logging::init(&config.logging, cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(async {
        tokio::select! {
            result = run_command(cli, config, format) => result,
            _ = shutdown_signal() => {
                tracing::warn!("received shutdown signal; run cancelled, nothing exported");
                Err(anyhow::anyhow!("interrupted"))
            }
        }
    });
    runtime.shutdown_background();

    if let Err(e) = result {
        eprint!("{}", get_formatter(format).format_error(&format!("{e:#}")));
        drop(guard);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(cli: Cli, config: Config, format: OutputFormat) -> Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Build(args) => {
            handle_build(args, config, format, verbose).await?;
        }
        Commands::Models => {
            handle_models(&config, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, &cli.config, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
