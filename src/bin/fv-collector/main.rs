mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use solar_collector::{
    clock::SystemClock,
    config::Config,
    fetcher::Fetcher,
    scheduler::Collector,
    sun_window::SunWindow,
    writer::InfluxWriter,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let config = Config::try_from(Args::parse()).context("invalid arguments")?;
    config.validate().context("invalid configuration")?;

    let fetcher =
        Fetcher::new(config.inverter.clone()).context("failed to create inverter client")?;
    let writer =
        InfluxWriter::new(config.sink.clone()).context("failed to create InfluxDB client")?;

    let sun_window = config.daylight.map(|daylight| {
        info!(
            latitude = daylight.latitude,
            longitude = daylight.longitude,
            margin_minutes = daylight.margin.num_minutes(),
            timezone = %daylight.timezone,
            "daylight gating enabled"
        );
        SunWindow::new(daylight)
    });

    info!(
        device = %config.inverter.serial_number,
        url = %config.inverter.livedata_url,
        bucket = %config.sink.bucket,
        "collector started"
    );

    Collector::new(fetcher, writer, sun_window, SystemClock)
        .run(config.poll_interval, shutdown_signal())
        .await;

    info!("collector stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
