mod cli;
mod config;
mod input;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use fraudlens_alerts::{AlertDeriver, AlertDispatcher, AlertSink, JsonLinesSink, LogSink};
use fraudlens_compute::{DetectionEngine, DetectionOutcome};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    fraudlens_core::config::load_dotenv();
    let args = CliArgs::parse();

    let config = config::load(args.config.as_deref(), args.profile.as_deref())
        .context("failed to load configuration")?;
    config.log_summary();

    let engine = DetectionEngine::from_config(&config).context("failed to start detection engine")?;

    let mut failure = None;
    if let Some(ref path) = args.input {
        let batch = input::read_batch(path)?;
        let interpretation = args
            .interpretation
            .as_deref()
            .map(input::read_interpretation)
            .transpose()?;
        info!(rows = batch.len(), "Batch loaded");

        let outcome = engine.detect(batch).await;
        if let DetectionOutcome::Degraded {
            ref error,
            ref failed_detectors,
            ..
        } = outcome
        {
            warn!(error = %error, ?failed_detectors, "Detection degraded");
        }
        let result = outcome.into_result();
        print_json(&result, args.pretty).await?;

        match result.error {
            Some(ref e) => failure = Some(e.clone()),
            None => {
                let alerts = AlertDeriver::new(config.alerts.clone())
                    .derive(&result, interpretation.as_ref());

                let sink: Box<dyn AlertSink> = match args.alerts_out {
                    Some(ref out) => {
                        let file = tokio::fs::File::create(out)
                            .await
                            .with_context(|| format!("failed to create {}", out.display()))?;
                        Box::new(JsonLinesSink::new(file))
                    }
                    None => Box::new(JsonLinesSink::new(tokio::io::stdout())),
                };
                let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(LogSink), sink];
                let dispatcher = AlertDispatcher::new(sinks);

                for delivery in dispatcher.dispatch(&alerts).await {
                    if let Some(e) = delivery.error {
                        bail!("alert delivery to {} failed: {}", delivery.sink, e);
                    }
                }
            }
        }
    }

    if args.health {
        print_json(&engine.health_status().await, args.pretty).await?;
    }

    if let Some(e) = failure {
        bail!("detection failed: {e}");
    }
    Ok(())
}

async fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut line = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    line.push(b'\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}
