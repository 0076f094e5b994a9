//! Time source for the polling loops.
//!
//! Everything that waits goes through here, backed by tokio's clock so tests
//! can pause and auto-advance time.

use std::time::Duration;

pub use tokio::time::Instant;

/// Suspends the current flow for `duration`.
pub async fn sleep(duration: Duration) {
	tokio::time::sleep(duration).await
}

pub fn now() -> Instant {
	Instant::now()
}
