//! Background schedulers for cache refresh and tracked-set persistence.
//!
//! Both run on fixed periods independent of request traffic. The first tick
//! of each comes one period after startup, since startup already restored
//! the snapshot and warmed the cache.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Starts the periodic refresh of every tracked coin in every tracked currency.
///
/// Each cycle is bounded by the refresh period so a rate-limited upstream
/// cannot stack cycles on top of each other.
pub fn start_rate_refresh_scheduler(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.refresh_interval;
    tokio::spawn(async move {
        info!("Rate refresh scheduler started ({:?} interval)", period);

        let mut ticker = interval_at(first_tick(period), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_scheduled_refresh(&state).await;
        }
    })
}

async fn run_scheduled_refresh(state: &Arc<AppState>) {
    debug!("Running scheduled rate refresh...");
    match state
        .rate_service
        .refresh_rates(Some(state.config.refresh_interval))
        .await
    {
        Ok(count) => debug!("Scheduled refresh cached rates for {} coins", count),
        Err(e) => warn!("Scheduled rate refresh failed: {}", e),
    }
}

/// One period from now, or now if that instant cannot be represented.
fn first_tick(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period).unwrap_or(now)
}

/// Starts the periodic write of the tracked set to its snapshot file.
pub fn start_snapshot_scheduler(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.persist_interval;
    tokio::spawn(async move {
        info!("Snapshot scheduler started ({:?} interval)", period);

        let mut ticker = interval_at(first_tick(period), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            state.rate_service.persist_tracked().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_tolerates_huge_period() {
        let before = Instant::now();
        assert!(first_tick(Duration::from_secs(u64::MAX)) >= before);
        assert!(first_tick(Duration::from_secs(30)) >= before + Duration::from_secs(30));
    }
}
