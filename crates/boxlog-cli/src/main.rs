//! `boxlog`: run one container and relay its output to CloudWatch Logs.
//!
//! Run with: cargo run -p boxlog-cli -- --help

mod config;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use boxlog_cloudwatch::CloudWatchSink;
use boxlog_docker::DockerRuntime;
use boxlog_session::{ExecutionSession, SessionOutcome, Teardown};
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;

const EXIT_FAILED: u8 = 1;
const EXIT_TEARDOWN_DEGRADED: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u8> {
    // Connect first so a workload is never started without a destination.
    let destination = args.destination();
    let sink = CloudWatchSink::connect(&destination, args.sink_options())
        .await
        .with_context(|| format!("Cannot deliver logs to {destination}"))?;

    let runtime = DockerRuntime::new(args.docker_config());
    let session = ExecutionSession::new(Arc::new(runtime), Arc::new(sink), args.session_config());

    let (interrupt_tx, interrupt_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, tearing down");
                let _ = interrupt_tx.send(());
            }
            Err(e) => tracing::warn!("Cannot listen for Ctrl-C: {e}"),
        }
    });
    let interrupt = async move {
        // A dropped sender means no interrupt will ever come.
        if interrupt_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let outcome = session.run_until(&args.request(), interrupt).await?;

    if args.summary_json {
        println!("{}", serde_json::to_string(&outcome.summary())?);
    }
    Ok(exit_status(&outcome))
}

/// 0 for a clean run, 3 if only teardown failed, 1 for a failed run.
fn exit_status(outcome: &SessionOutcome) -> u8 {
    match (outcome.is_stopped(), &outcome.teardown) {
        (true, Teardown::Degraded(_)) => EXIT_TEARDOWN_DEGRADED,
        (true, _) => 0,
        (false, _) => EXIT_FAILED,
    }
}
