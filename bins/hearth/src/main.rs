//! Consumer demo: owns the condition segment and logs every batch of
//! cross-process notifications.

use flint_config::BusConfig;
use flint_sync::{ConditionArena, Waiter};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => BusConfig::load(path)?,
        None => BusConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let cond = Arc::new(ConditionArena::create(&config.segment_path)?);
    let waiter = Waiter::new(Arc::clone(&cond));
    tracing::info!(path = %config.segment_path, "condition segment created, waiting for events");

    let mut batches: u64 = 0;
    let mut events: u64 = 0;
    let mut last = Instant::now();

    loop {
        let fired = waiter.wait();
        if fired.is_empty() {
            continue;
        }
        batches += 1;
        events += fired.len() as u64;
        tracing::debug!(?fired, "batch received");

        if last.elapsed().as_secs() >= 1 {
            tracing::info!(batches, events, "receive rate over the last second");
            batches = 0;
            events = 0;
            last = Instant::now();
        }
    }
}
