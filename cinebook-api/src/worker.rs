use cinebook_booking::BookingEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Periodic clean-up of stale locks and lapsed pending payments. The lazy
/// sweeps inside each operation already keep decisions correct; this only
/// keeps the tables small and the seat map fresh for idle screenings.
pub fn start_expiry_worker(engine: Arc<BookingEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Expiry worker started, sweeping every {:?}", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_once(&engine).await;
        }
    })
}

pub async fn run_once(engine: &BookingEngine) {
    if let Err(e) = engine.locks.sweep().await {
        error!("Lock sweep failed: {}", e);
    }
    if let Err(e) = engine.settlement.sweep_expired().await {
        error!("Payment expiry sweep failed: {}", e);
    }
}
