use std::sync::Arc;

use anyhow::Context;
use goose::prelude::*;
use tenksteps_loadgen::{identity, user_with_device, Identities, LoadConfig, StepsRun};
use tracing::info;

/// Goose flags (`--users`, `--hatch-rate`, `--run-time`, `--timeout`, ...)
/// come from the command line; backend URLs and the wait range from the
/// environment.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LoadConfig::from_env().context("load configuration")?;
    let run_id = identity::run_id_now();
    info!(
        api = %config.api_url,
        ingest = %config.ingest_url,
        run = %run_id,
        "steps backend"
    );

    let run = Arc::new(StepsRun::new(Identities::new(run_id), config.ingest_url.clone()));
    let scenario = user_with_device(run, config.min_wait, config.max_wait)
        .context("build scenario")?;

    let metrics = GooseAttack::initialize()?
        .register_scenario(scenario)
        .set_default(GooseDefault::Host, config.api_url.as_str())?
        .execute()
        .await
        .context("run load test")?;

    info!(duration_secs = metrics.duration, "load test finished");
    Ok(())
}
