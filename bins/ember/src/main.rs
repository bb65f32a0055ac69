//! Producer demo: attaches to the condition segment owned by `hearth` and
//! notifies the configured slots on a fixed interval.

use flint_config::BusConfig;
use flint_sync::{ConditionArena, Notifier};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

    // The segment owner may still be starting up; retry for a bit.
    let open_deadline = Instant::now() + Duration::from_secs(5);
    let cond = loop {
        match ConditionArena::open(&config.segment_path) {
            Ok(arena) => break Arc::new(arena),
            Err(e) if Instant::now() >= open_deadline => {
                anyhow::bail!("no condition segment at {}: {e}", config.segment_path);
            }
            Err(_) => std::thread::sleep(Duration::from_millis(10)),
        }
    };

    let notifiers: Vec<Notifier> = config
        .notify_slots
        .iter()
        .map(|&slot| Notifier::new(Arc::clone(&cond), slot))
        .collect();
    tracing::info!(
        path = %config.segment_path,
        slots = ?config.notify_slots,
        interval_us = config.notify_interval_us,
        "attached, producing notifications"
    );

    let mut sent: u64 = 0;
    let mut last = Instant::now();

    loop {
        for notifier in &notifiers {
            notifier.notify();
            sent += 1;
        }

        if last.elapsed() >= Duration::from_secs(1) {
            tracing::info!(sent, "notify rate over the last second");
            sent = 0;
            last = Instant::now();
        }

        std::thread::sleep(Duration::from_micros(config.notify_interval_us));
    }
}
