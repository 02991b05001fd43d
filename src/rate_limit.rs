use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, warn};

use crate::metrics::{RATE_LIMIT_QUEUE_DEPTH, RATE_LIMIT_WAITS};

pub const DEFAULT_MAX_CALLS: u32 = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(2000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("rate limiter is shut down")]
    Closed,
    #[error("queued call panicked before completing")]
    Aborted,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window: Duration,
    // Fixed pause once the ceiling is hit, not the remaining window time
    pub backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            window: DEFAULT_WINDOW,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

// Rate limit entry - calls dispatched in the current window
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimiterStatus {
    pub queue_length: usize,
    pub processing: bool,
    pub calls_this_window: u32,
    pub max_calls: u32,
}

#[derive(Default)]
struct Shared {
    queued: AtomicUsize,
    processing: AtomicBool,
    calls_this_window: AtomicU32,
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// FIFO queue in front of a rate-limited upstream.
///
/// One drain task per limiter dispatches queued calls in submission order, at
/// most `max_calls` per `window`. Hitting the ceiling pauses the queue for
/// `backoff`. Handles are cheap to clone and all feed the same queue.
#[derive(Clone)]
pub struct RateLimiter {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
    max_calls: u32,
}

impl RateLimiter {
    /// Spawns the drain task, so this must be called inside a tokio runtime.
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            max_calls: config.max_calls.max(1),
            ..config
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        tokio::spawn(drain(rx, config, Arc::clone(&shared)));

        Self {
            tx,
            shared,
            max_calls: config.max_calls,
        }
    }

    /// Queues `call` and resolves with its own output once it has run.
    ///
    /// The call is queued when `enqueue` is invoked, not when the returned
    /// future is first polled. Dropping the future does not withdraw the call.
    pub fn enqueue<F, Fut, T>(
        &self,
        call: F,
    ) -> impl Future<Output = Result<T, LimiterError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let _ = reply_tx.send(call().await);
            }
            .boxed()
        });

        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        RATE_LIMIT_QUEUE_DEPTH.inc();
        let sent = self.tx.send(job).is_ok();
        if !sent {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            RATE_LIMIT_QUEUE_DEPTH.dec();
        }

        async move {
            if !sent {
                return Err(LimiterError::Closed);
            }
            reply_rx.await.map_err(|_| LimiterError::Aborted)
        }
    }

    pub fn status(&self) -> LimiterStatus {
        LimiterStatus {
            queue_length: self.shared.queued.load(Ordering::SeqCst),
            processing: self.shared.processing.load(Ordering::SeqCst),
            calls_this_window: self.shared.calls_this_window.load(Ordering::SeqCst),
            max_calls: self.max_calls,
        }
    }
}

async fn drain(mut rx: mpsc::UnboundedReceiver<Job>, config: RateLimitConfig, shared: Arc<Shared>) {
    debug!(
        max_calls = config.max_calls,
        window_ms = config.window.as_millis() as u64,
        "rate limiter started"
    );
    let mut entry = RateLimitEntry::new();

    while let Some(job) = rx.recv().await {
        shared.processing.store(true, Ordering::SeqCst);

        loop {
            if entry.window_start.elapsed() >= config.window {
                entry.reset();
            }
            if entry.count < config.max_calls {
                break;
            }
            RATE_LIMIT_WAITS.inc();
            debug!(
                backoff_ms = config.backoff.as_millis() as u64,
                "rate limit reached, backing off"
            );
            sleep(config.backoff).await;
            entry.reset();
        }

        entry.count += 1;
        shared.calls_this_window.store(entry.count, Ordering::SeqCst);
        shared.queued.fetch_sub(1, Ordering::SeqCst);
        RATE_LIMIT_QUEUE_DEPTH.dec();

        if AssertUnwindSafe(job()).catch_unwind().await.is_err() {
            warn!("queued call panicked");
        }

        if rx.is_empty() {
            shared.processing.store(false, Ordering::SeqCst);
        }
    }
}
