//! The retry/bulkhead policy stack (SPEC_FULL.md §4.2), composed outer→inner as
//! `Auth -> Hash -> Bulkhead -> operation` by callers in [`crate::session`], [`crate::upload`]
//! and [`crate::download`].
//!
//! Generalizes the teacher's `Client::run_request_with_reauth` (an unconditional
//! retry-once-on-401 closure wrapper with no singleflight guard) into a
//! `retryCount`-bounded policy with backoff and a real singleflight re-auth gate.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::backoff;
use crate::error::{B2Error, B2ErrorKind};

/// Caps concurrent operations of one class (upload or download), SPEC_FULL.md §4.2/§8.6.
#[derive(Clone)]
pub struct Bulkhead {
    sem: Arc<Semaphore>,
}

impl Bulkhead {
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(max_concurrent.max(1) as usize)),
        }
    }

    /// Acquires a slot, waiting if the bulkhead is at capacity. There is no queue-length cap.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.sem.clone().acquire_owned().await.expect("bulkhead semaphore is never closed")
    }
}

/// Serializes re-authentication so concurrent *Authentication* failures collapse onto one
/// `Connect` call (SPEC_FULL.md §5, invariant §8.5).
pub struct AuthSingleflight {
    generation: AtomicU64,
    gate: Mutex<()>,
}

impl Default for AuthSingleflight {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSingleflight {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Ensures the session has reauthenticated at least once since `seen_generation`.
    ///
    /// Only the first caller observing a stale generation actually invokes `reconnect`;
    /// callers that arrive while another reconnect is in flight wait for the gate and then
    /// find the generation already bumped, so they return without reconnecting again.
    async fn reauth_if_stale<F, Fut>(&self, seen_generation: u64, reconnect: F) -> Result<(), B2Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), B2Error>>,
    {
        let _gate = self.gate.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen_generation {
            return Ok(());
        }

        reconnect().await?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Retries `op` up to `retry_count` times on [`B2ErrorKind::Authentication`], reauthenticating
/// (via singleflight) between attempts and sleeping [`backoff::sleep_duration`] in between.
pub async fn with_auth_policy<T, Op, OpFut, Reconnect, ReconnectFut>(
    retry_count: u32,
    singleflight: &AuthSingleflight,
    cancel: &tokio_util::sync::CancellationToken,
    mut op: Op,
    mut reconnect: Reconnect,
) -> Result<T, B2Error>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, B2Error>>,
    Reconnect: FnMut() -> ReconnectFut,
    ReconnectFut: Future<Output = Result<(), B2Error>>,
{
    let mut attempt = 0u32;
    loop {
        let seen_generation = singleflight.generation();

        match op().await {
            Ok(t) => return Ok(t),
            Err(e) if e.kind() == B2ErrorKind::Authentication && attempt < retry_count => {
                attempt += 1;
                tracing::debug!(attempt, "authentication error, reauthenticating");
                singleflight.reauth_if_stale(seen_generation, || reconnect()).await?;
                backoff::sleep(attempt, cancel).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retries `op` up to `retry_count` times on [`B2ErrorKind::InvalidHash`], calling `rewind`
/// before each retry. Fails fast with [`B2Error::NonSeekableStream`] if `seekable` is false.
pub async fn with_hash_policy<T, Op, OpFut, Rewind>(
    retry_count: u32,
    cancel: &tokio_util::sync::CancellationToken,
    seekable: bool,
    mut op: Op,
    mut rewind: Rewind,
) -> Result<T, B2Error>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, B2Error>>,
    Rewind: FnMut(),
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(t) => return Ok(t),
            Err(e) if e.kind() == B2ErrorKind::InvalidHash && attempt < retry_count => {
                if !seekable {
                    return Err(B2Error::NonSeekableStream);
                }
                attempt += 1;
                tracing::debug!(attempt, "hash mismatch, rewinding and retrying");
                rewind();
                backoff::sleep(attempt, cancel).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Races `fut` against cancellation, so an in-flight HTTP request is dropped (and thus
/// aborted) the instant the signal fires, rather than being awaited to completion
/// (SPEC_FULL.md §5, scenario S5).
pub async fn cancellable<T, Fut>(cancel: &tokio_util::sync::CancellationToken, fut: Fut) -> Result<T, B2Error>
where
    Fut: Future<Output = Result<T, B2Error>>,
{
    tokio::select! {
        res = fut => res,
        _ = cancel.cancelled() => Err(B2Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Duration;

    fn auth_err() -> B2Error {
        crate::error::B2ErrorMessage {
            status: 401,
            code: "expired_auth_token".into(),
            message: "x".into(),
        }
        .into()
    }

    fn hash_err() -> B2Error {
        crate::error::B2ErrorMessage {
            status: 400,
            code: "bad_digest".into(),
            message: "x".into(),
        }
        .into()
    }

    #[tokio::test]
    async fn bulkhead_never_exceeds_cap() {
        let bulkhead = Bulkhead::new(2);
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let bulkhead = bulkhead.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = bulkhead.acquire().await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn auth_policy_retries_and_succeeds_after_reconnect() {
        let singleflight = AuthSingleflight::new();
        let cancel = tokio_util::sync::CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result = with_auth_policy(
            3,
            &singleflight,
            &cancel,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(auth_err())
                } else {
                    Ok(42)
                }
            },
            || async { Ok(()) },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn auth_singleflight_reconnects_exactly_once_under_concurrency() {
        let singleflight = Arc::new(AuthSingleflight::new());
        let cancel = Arc::new(tokio_util::sync::CancellationToken::new());
        let reconnect_calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let singleflight = singleflight.clone();
            let cancel = cancel.clone();
            let reconnect_calls = reconnect_calls.clone();

            handles.push(tokio::spawn(async move {
                let attempted = AtomicU32::new(0);
                with_auth_policy(
                    1,
                    &singleflight,
                    &cancel,
                    || async {
                        if attempted.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(auth_err())
                        } else {
                            Ok(())
                        }
                    },
                    || {
                        let reconnect_calls = reconnect_calls.clone();
                        async move {
                            reconnect_calls.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    },
                )
                .await
            }));
        }

        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(reconnect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hash_policy_fails_fast_when_not_seekable() {
        let cancel = tokio_util::sync::CancellationToken::new();

        let result: Result<(), B2Error> =
            with_hash_policy(3, &cancel, false, || async { Err(hash_err()) }, || {}).await;

        assert!(matches!(result, Err(B2Error::NonSeekableStream)));
    }

    #[tokio::test]
    async fn hash_policy_retries_with_rewind_then_succeeds() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let calls = AtomicU32::new(0);
        let rewinds = AtomicU32::new(0);

        let result = with_hash_policy(
            3,
            &cancel,
            true,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(hash_err())
                } else {
                    Ok(7)
                }
            },
            || {
                rewinds.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(rewinds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellable_returns_cancelled_when_signalled_first() {
        let cancel = tokio_util::sync::CancellationToken::new();
        cancel.cancel();

        let result: Result<(), B2Error> = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(B2Error::Cancelled)));
    }

    #[tokio::test]
    async fn cancellable_passes_through_when_not_signalled() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let result = cancellable(&cancel, async { Ok::<_, B2Error>(9) }).await;
        assert_eq!(result.unwrap(), 9);
    }
}
