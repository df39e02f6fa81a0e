//! Time source used by the status poller.
//!
//! Production code runs on [`TokioClock`]; tests substitute a virtual clock so a
//! 30 second polling budget can be exercised without waiting.

use std::time::Duration;

/// Monotonic time source with an async sleep
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock whose origin is the current instant
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod manual {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Virtual clock: `sleep` advances time instantly, `advance` simulates work taking time.
    ///
    /// Every sleep moves the one shared clock, so it only models a single sleeper.
    #[derive(Default)]
    pub(crate) struct ManualClock {
        now: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }

        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration);
            // Let sibling tasks interleave as they would across a real timer
            tokio::task::yield_now().await;
        }
    }
}
