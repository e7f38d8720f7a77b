//! `azmig` binary
//!
//! Sets up logging and maps the batch outcome to the process exit code.

use azmig_cli::{command, execute, render, RunOptions, StdinConfirmation, EXIT_FATAL};
use azmig_core::{AutoConfirm, Confirmation, StopSignal};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbosity: u8, json: bool) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

#[tokio::main]
async fn main() {
    let matches = match command().try_get_matches() {
        Ok(matches) => matches,
        // Help and version output
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_FATAL);
        }
    };
    init_tracing(
        matches.get_count("verbose"),
        matches.get_flag("log-json"),
    );

    let options = match RunOptions::from_matches(&matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_FATAL);
        }
    };

    let stop = StopSignal::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing the current resource");
            on_interrupt.stop();
        }
    });

    let confirmation: Arc<dyn Confirmation> = if options.config.force || options.config.dry_run {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirmation)
    };

    let report = match execute(&options, confirmation, stop).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_FATAL);
        }
    };

    match render(&report, options.json) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_FATAL);
        }
    }

    std::process::exit(report.exit_code());
}
