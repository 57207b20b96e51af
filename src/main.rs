//! Sasayaki command line entry point.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sasayaki::cli::Args;
use sasayaki::config::{ConfigFile, RunConfig};
use sasayaki::process::SystemRunner;
use sasayaki::setup::{AppLayout, SetupManager, UNINSTALL_COUNTDOWN};
use sasayaki::translate::TranslatorFactory;
use sasayaki::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let layout = AppLayout::default_location()?;

    let log_dir = (layout.exists() && !args.uninstall).then(|| layout.log_dir());
    let _guard = setup_logging(log_dir.as_deref(), args.debug)?;

    let manager = SetupManager::new(layout.clone())?;

    if args.uninstall {
        manager.uninstall(UNINSTALL_COUNTDOWN).await?;
        println!("Uninstalled.");
        return Ok(());
    }

    if args.install {
        let config_path = manager.install()?;
        println!("Installed to {}", layout.root().display());
        println!("Add your Gemini API key to {}", config_path.display());
        return Ok(());
    }

    if args.config {
        let config_path = manager.write_config()?;
        println!("Config file reset: {}", config_path.display());
        return Ok(());
    }

    if !layout.exists() {
        println!("Application directory not found: {}", layout.root().display());
        println!("Run: sasayaki --install");
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        println!("Usage: sasayaki [args] <url>");
        println!("Help: sasayaki -h");
        return Ok(());
    };

    let config_file = ConfigFile::from_file(layout.config_path())?;
    let config = RunConfig::resolve(
        config_file,
        layout.config_path(),
        args.to_run_options(),
        cfg!(windows),
    );
    debug!("Resolved configuration: engine={:?} model={} translate={}", config.engine, config.model, config.translate);

    manager.prepare_engine(&config).await?;

    let translator = TranslatorFactory::create_translator(&config)?;
    let runner = SystemRunner::new(layout.root(), config.verbose);
    let workflow = Workflow::new(
        config,
        layout,
        Box::new(runner),
        translator,
        std::env::current_dir()?,
    );

    let outcome = workflow.run(input).await?;

    println!("\nSubtitles ready!");
    for path in &outcome.outputs {
        println!("{}", path.display());
    }
    info!("Run completed for {}", input);
    Ok(())
}

/// Log to the console, and to a daily file when the application directory exists.
fn setup_logging(log_dir: Option<&Path>, debug: bool) -> Result<Option<WorkerGuard>> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .without_time();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = non_blocking(rolling::daily(dir, "sasayaki.log"));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Some(dir) = log_dir {
        debug!("Logging to {}", dir.join("sasayaki.log").display());
    }
    Ok(guard)
}
