//! Bounded retry for network fetches.
//!
//! The fetch stage wraps every request in [`with_retry`]: one attempt, then a
//! fixed sleep and another attempt, until either an attempt succeeds or
//! `max_retry` retries have been spent (`max_retry + 1` attempts in total).
//! The policy is a plain value so tests can swap in a zero-delay one.
//!
//! A non-2xx response counts as a failed attempt, the same as a transport
//! error; see [`get_bytes`].

use crate::error::{Error, Result};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Default pause between two attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// How often and how patiently to retry a failing operation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retry: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retry: u32, backoff: Duration) -> Self {
        Self { max_retry, backoff }
    }

    /// A policy that retries without sleeping.
    pub fn immediate(max_retry: u32) -> Self {
        Self::new(max_retry, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, DEFAULT_BACKOFF)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retry", &self.max_retry)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Run `op` until it succeeds or the policy's budget is exhausted.
///
/// # Arguments
///
/// * `policy` - retry budget and the pause between attempts
/// * `label` - names the operation in log lines, usually the URL
/// * `op` - builds a fresh attempt each time it is called
///
/// # Returns
///
/// The value of the first successful attempt.
///
/// # Errors
///
/// The error of the final attempt, once `policy.max_retry + 1` attempts have
/// failed.
#[instrument(level = "debug", skip_all, fields(%label))]
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total_t0 = Instant::now();
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                attempt += 1;
                if attempt > policy.max_retry {
                    error!(
                        attempt,
                        max = policy.max_retry,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        error = %e,
                        "Exhausted retries"
                    );
                    return Err(e);
                }

                warn!(
                    attempt,
                    max = policy.max_retry,
                    delay = ?policy.backoff,
                    error = %e,
                    "Attempt failed; backing off"
                );
                if !policy.backoff.is_zero() {
                    sleep(policy.backoff).await;
                }
            }
        }
    }
}

/// GET `url` once and return the body. Any non-2xx status is an error.
pub async fn get_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(res.bytes().await?.to_vec())
}

/// [`get_bytes`] wrapped in [`with_retry`].
pub async fn get_bytes_with_retry(
    client: &reqwest::Client,
    url: &str,
    policy: RetryPolicy,
) -> Result<Vec<u8>> {
    with_retry(policy, url, || get_bytes(client, url)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_success_stops_retrying() {
        let mut calls = 0;
        let value = with_retry(RetryPolicy::immediate(3), "ok", || {
            calls += 1;
            async { Ok::<_, Error>(42) }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_later_attempt() {
        let mut calls = 0;
        let value = with_retry(RetryPolicy::immediate(3), "flaky", || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(Error::Config(format!("attempt {n}")))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_makes_max_retry_plus_one_attempts() {
        let mut calls = 0;
        let result: Result<()> = with_retry(RetryPolicy::immediate(3), "down", || {
            calls += 1;
            let n = calls;
            async move { Err(Error::Config(format!("attempt {n}"))) }
        })
        .await;

        assert_eq!(calls, 4);
        assert!(matches!(result, Err(Error::Config(ref m)) if m == "attempt 4"));
    }

    #[tokio::test]
    async fn test_zero_retry_budget_tries_once() {
        let mut calls = 0;
        let result: Result<()> = with_retry(RetryPolicy::immediate(0), "once", || {
            calls += 1;
            async { Err(Error::Status { status: 503, url: "http://x".into() }) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(Error::Status { status: 503, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_secs(3));
        let t0 = tokio::time::Instant::now();
        let result: Result<()> = with_retry(policy, "slow", || async {
            Err(Error::Config("nope".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert!(t0.elapsed() >= Duration::from_secs(6));
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retry, 3);
        assert_eq!(p.backoff, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_returned() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let server_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let mut req = Vec::new();
                let mut buf = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }
                server_hits.fetch_add(1, Ordering::SeqCst);
                let _ = sock
                    .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = sock.shutdown().await;
            }
        });

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let url = format!("http://{addr}/newsplus/subject.txt");
        let result = get_bytes_with_retry(&client, &url, RetryPolicy::immediate(2)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(Error::Status { status: 503, url: ref u }) if *u == url));
    }
}
