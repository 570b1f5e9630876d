//! Periodic purge of expired refresh tokens and idle sessions left without tokens.
//!
//! Revoked tokens are kept until they expire so replays can still be
//! detected; only rows expired for longer than the retention window go.

use std::sync::Arc;
use std::time::Duration;

use centralauth_db::SessionStore;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// How often the purge runs.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run one purge pass for rows older than `retention_hours`.
pub async fn purge_once(store: &dyn SessionStore, retention_hours: i64) {
    let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);
    match store.purge_expired(cutoff).await {
        Ok(stats) if stats.refresh_tokens > 0 || stats.sessions > 0 => {
            tracing::info!(
                refresh_tokens = stats.refresh_tokens,
                sessions = stats.sessions,
                "Session retention: purged old rows"
            );
        }
        Ok(_) => tracing::debug!("Session retention: no rows to purge"),
        Err(e) => tracing::error!(error = %e, "Session retention: purge failed"),
    }
}

/// Run the purge loop until `cancel` is triggered.
pub async fn run(
    store: Arc<dyn SessionStore>,
    retention_hours: i64,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours,
        interval_secs = interval.as_secs(),
        "Session retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session retention job stopping");
                break;
            }
            _ = ticker.tick() => purge_once(store.as_ref(), retention_hours).await,
        }
    }
}
