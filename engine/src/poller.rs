use crate::metrics::Metrics;
use crate::view::MarketView;
use engine_core::MarketStateSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Floor for any periodic tick; `tokio::time::interval` panics on zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Configured poll period with the floor applied.
pub fn poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms).max(MIN_INTERVAL)
}

/// Periodic on-chain refresh. First read fires immediately.
pub struct MarketPoller {
    source: Arc<dyn MarketStateSource>,
    view: Arc<MarketView>,
    interval: Duration,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

/// Owner of a running poller. Dropping it stops the loop.
pub struct PollHandle {
    shutdown: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl MarketPoller {
    pub fn spawn(
        source: Arc<dyn MarketStateSource>,
        view: Arc<MarketView>,
        interval: Duration,
        metrics: Arc<Metrics>,
    ) -> PollHandle {
        let shutdown = CancellationToken::new();
        let poller = Self {
            source,
            view,
            interval: interval.max(MIN_INTERVAL),
            metrics,
            shutdown: shutdown.clone(),
        };
        let join = tokio::spawn(poller.run());
        PollHandle {
            shutdown,
            join: Some(join),
        }
    }

    async fn run(self) {
        info!(target: "poller", interval_ms = self.interval.as_millis() as u64, "market poller started");
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tick.tick() => {}
            }

            // a read already in flight is allowed to finish
            let result = self.source.poll_market_state().await;
            if self.shutdown.is_cancelled() {
                debug!(target: "poller", "discarding read finished after stop");
                break;
            }

            match &result {
                Ok((_, status)) => {
                    self.metrics.polls_succeeded.inc();
                    self.metrics.market_open.set(i64::from(status.is_open));
                }
                Err(_) => self.metrics.polls_failed.inc(),
            }
            self.view.apply_market_poll(result);
        }
        info!(target: "poller", "market poller stopped");
    }
}

impl PollHandle {
    /// Requests a stop. No new read starts afterwards; a read already in
    /// flight is normally discarded, but on a multi-threaded runtime at most
    /// one in-flight result may still be applied.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops and waits for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::{MarketError, MarketStatus, OutcomeQuote, Price};
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    type Poll = Result<(OutcomeQuote, MarketStatus), MarketError>;

    fn ok(win: i64, is_open: bool) -> Poll {
        let quote = OutcomeQuote {
            win: Price::Available(Decimal::new(win, 2)),
            ..OutcomeQuote::unavailable()
        };
        let status = MarketStatus {
            is_open,
            ..MarketStatus::default()
        };
        Ok((quote, status))
    }

    /// Replays a script, repeating the last entry.
    struct Scripted {
        script: Mutex<VecDeque<Poll>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Poll>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MarketStateSource for Scripted {
        async fn poll_market_state(&self) -> Poll {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    /// Blocks each read until released.
    struct Gated {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl MarketStateSource for Gated {
        async fn poll_market_state(&self) -> Poll {
            self.entered.notify_one();
            self.release.notified().await;
            ok(400, true)
        }
    }

    #[test]
    fn zero_interval_is_floored() {
        assert_eq!(poll_interval(0), MIN_INTERVAL);
        assert_eq!(poll_interval(15_000), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_polls() {
        let source = Scripted::new(vec![ok(250, true)]);
        let handle = MarketPoller::spawn(
            source.clone(),
            Arc::new(MarketView::new()),
            Duration::ZERO,
            Metrics::detached().unwrap(),
        );
        settle().await;
        tokio::time::advance(MIN_INTERVAL).await;
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        handle.shutdown().await;
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_read_is_immediate_then_periodic() {
        let source = Scripted::new(vec![ok(250, true)]);
        let view = Arc::new(MarketView::new());
        let metrics = Metrics::detached().unwrap();
        let handle = MarketPoller::spawn(
            source.clone(),
            view.clone(),
            Duration::from_secs(15),
            metrics.clone(),
        );

        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.displayed_quote().win.to_string(), "2.50");
        assert_eq!(metrics.market_open.get(), 1);

        tokio::time::advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_keeps_previous_values() {
        let source = Scripted::new(vec![
            ok(250, true),
            Err(MarketError::ChainReadFailure("node down".into())),
        ]);
        let view = Arc::new(MarketView::new());
        let metrics = Metrics::detached().unwrap();
        let handle = MarketPoller::spawn(
            source.clone(),
            view.clone(),
            Duration::from_secs(15),
            metrics.clone(),
        );

        settle().await;
        tokio::time::advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.polls_failed.get(), 1);
        assert_eq!(view.displayed_quote().win.to_string(), "2.50");
        assert!(view.status().unwrap().is_open);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_reads() {
        let source = Scripted::new(vec![ok(250, true)]);
        let view = Arc::new(MarketView::new());
        let handle = MarketPoller::spawn(
            source.clone(),
            view,
            Duration::from_secs(15),
            Metrics::detached().unwrap(),
        );
        settle().await;
        handle.stop();
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_result_is_discarded_after_stop() {
        let source = Arc::new(Gated {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let view = Arc::new(MarketView::new());
        let handle = MarketPoller::spawn(
            source.clone(),
            view.clone(),
            Duration::from_secs(15),
            Metrics::detached().unwrap(),
        );

        source.entered.notified().await;
        handle.stop();
        source.release.notify_one();
        handle.shutdown().await;

        assert!(view.status().is_none());
        assert!(view.displayed_quote().is_empty());
    }
}
