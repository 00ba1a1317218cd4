//! Timeout enforcement.
//!
//! Every outbound attempt and every health probe runs under a deadline.
//! An elapsed deadline is reported as its own variant so callers can tell
//! it apart from transport errors.

use std::future::Future;
use std::time::Duration;

/// Result of a deadline-bound operation.
#[derive(Debug)]
pub enum Deadline<T> {
    Completed(T),
    Elapsed(Duration),
}

/// Run `fut` for at most `limit`.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Deadline<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Deadline::Completed(value),
        Err(_) => Deadline::Elapsed(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed() {
        let result = with_deadline(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            1
        })
        .await;
        assert!(matches!(result, Deadline::Elapsed(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_completed() {
        let result = with_deadline(Duration::from_secs(1), async { 7 }).await;
        assert!(matches!(result, Deadline::Completed(7)));
    }
}
