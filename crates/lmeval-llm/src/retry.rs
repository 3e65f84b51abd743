use std::future::Future;
use std::time::Duration;

/// Execute an async operation with exponential backoff and jitter.
///
/// Retries up to `max_retries` times, but only while `should_retry` accepts
/// the error, with delays of 100ms, 200ms, 400ms... plus a small jitter.
pub async fn with_retry<F, Fut, T, E, P>(max_retries: u32, should_retry: P, f: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if retries < max_retries && should_retry(&e) => {
                retries += 1;
                let base_ms = 100u64 * (1u64 << (retries - 1).min(16));
                // Jitter from the clock's sub-second nanos.
                let jitter_ms = (std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos()
                    % 100) as u64;
                tracing::debug!(attempt = retries, delay_ms = base_ms + jitter_ms, "retrying");
                tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn always(_: &&str) -> bool {
        true
    }

    #[tokio::test]
    async fn retry_succeeds_first_try() {
        let result: Result<i32, &str> = with_retry(3, always, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retry_succeeds_after_failures() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, &str> = with_retry(3, always, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("not yet") } else { Ok(42) } }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_exhausts_all_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, &str> = with_retry(2, always, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;

        assert!(result.is_err());
        // 1 initial + 2 retries = 3 total attempts
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_zero_retries_tries_once() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, &str> = with_retry(0, always, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("fail") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, &str> = with_retry(
            5,
            |e: &&str| *e != "permanent",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent") }
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), "permanent");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
