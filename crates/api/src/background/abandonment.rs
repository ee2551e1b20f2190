//! Periodic sweep of idle sessions.
//!
//! Marks live sessions with no activity for the configured idle timeout as
//! `abandoned`. The flag is advisory: no ledger event is written, nothing is
//! erased, and the next learner operation lifts it again. Runs on a fixed
//! interval using `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use guidepost_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the abandonment sweep loop.
///
/// Marks sessions idle for more than `idle_timeout_minutes` as abandoned.
/// Runs until `cancel` is triggered.
pub async fn run(pool: PgPool, idle_timeout_minutes: i64, cancel: CancellationToken) {
    tracing::info!(
        idle_timeout_minutes,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Abandonment sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Abandonment sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::minutes(idle_timeout_minutes);
                match SessionRepo::sweep_abandoned(&pool, cutoff).await {
                    Ok(swept) => {
                        if swept > 0 {
                            tracing::info!(swept, "Abandonment sweep: marked idle sessions");
                        } else {
                            tracing::debug!("Abandonment sweep: nothing idle");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Abandonment sweep failed");
                    }
                }
            }
        }
    }
}
