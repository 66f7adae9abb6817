use std::time::Duration;

use log::*;
use market_engine::{events::EventProducers, ReviewApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the rating reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, each product's rating aggregate is rebuilt from its reviews. Aggregates only drift if a write
/// went around the engine, so a non-zero repair count is logged as a warning.
pub fn start_reconcile_worker(db: SqliteDatabase, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = ReviewApi::new(db, EventProducers::default());
        info!("🔁 Rating reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🔁 Running rating reconciliation job");
            match api.reconcile().await {
                Ok(0) => trace!("🔁 Rating reconciliation complete. Nothing to repair"),
                Ok(n) => info!("🔁 Rating reconciliation complete. {n} products repaired"),
                Err(e) => error!("🔁 Error running rating reconciliation job: {e}"),
            }
        }
    })
}
