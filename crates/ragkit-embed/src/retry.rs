//! Bounded retry with exponential backoff.
//!
//! Applied at the single-item embedding call site only; batch calls use a
//! degrade-by-fallback strategy instead of this wrapper.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use ragkit_core::error::Result;

pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Run `op` up to `attempts` times, sleeping `base * 2^n` (capped at
/// `cap`) between failures. The final error is returned unchanged once
/// the attempt budget is exhausted.
pub async fn with_backoff<T, F, Fut>(
    attempts: u32,
    base: Duration,
    cap: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = base;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(attempt, error = %err, "call failed, retrying after backoff");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(cap);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
