use engine_core::{reconcile, MarketError, MarketStatus, OutcomeQuote};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
struct Sources {
    off_chain: OutcomeQuote,
    on_chain: OutcomeQuote,
    status: Option<MarketStatus>,
}

/// Display state: the latest successful value of each source. Failed
/// updates never overwrite good data.
#[derive(Debug, Default)]
pub struct MarketView {
    inner: RwLock<Sources>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub quote: OutcomeQuote,
    pub status: Option<MarketStatus>,
}

impl MarketView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the update was applied.
    pub fn apply_off_chain(&self, result: Result<OutcomeQuote, MarketError>) -> bool {
        match result {
            Ok(quote) => {
                self.inner.write().off_chain = quote;
                true
            }
            Err(err) => {
                warn!(target: "view", %err, "keeping previous off-chain odds");
                false
            }
        }
    }

    pub fn apply_market_poll(
        &self,
        result: Result<(OutcomeQuote, MarketStatus), MarketError>,
    ) -> bool {
        match result {
            Ok((quote, status)) => {
                let mut inner = self.inner.write();
                inner.on_chain = quote;
                inner.status = Some(status);
                true
            }
            Err(err) => {
                warn!(target: "view", %err, "keeping previous market state");
                false
            }
        }
    }

    pub fn displayed_quote(&self) -> OutcomeQuote {
        let inner = self.inner.read();
        reconcile(&inner.off_chain, &inner.on_chain)
    }

    pub fn status(&self) -> Option<MarketStatus> {
        self.inner.read().status
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let inner = *self.inner.read();
        ViewSnapshot {
            quote: reconcile(&inner.off_chain, &inner.on_chain),
            status: inner.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Price;
    use rust_decimal::Decimal;

    fn q(win: i64, draw: i64, lose: i64) -> OutcomeQuote {
        OutcomeQuote {
            win: Price::Available(Decimal::new(win, 2)),
            draw: Price::Available(Decimal::new(draw, 2)),
            lose: Price::Available(Decimal::new(lose, 2)),
        }
    }

    fn status() -> MarketStatus {
        MarketStatus {
            is_open: true,
            start_time: 100,
            close_time: 200,
            ..MarketStatus::default()
        }
    }

    #[test]
    fn failed_poll_keeps_previous_state() {
        let view = MarketView::new();
        assert!(view.apply_market_poll(Ok((q(250, 333, 333), status()))));
        let before = view.snapshot();
        assert!(!view.apply_market_poll(Err(MarketError::ChainReadFailure("timeout".into()))));
        assert_eq!(view.snapshot(), before);
        assert_eq!(view.status(), Some(status()));
    }

    #[test]
    fn off_chain_failure_leaves_on_chain_odds_displayed() {
        let view = MarketView::new();
        view.apply_market_poll(Ok((q(250, 333, 333), status())));
        view.apply_off_chain(Err(MarketError::QuoteUnavailable("http 500".into())));
        assert_eq!(view.displayed_quote(), q(250, 333, 333));
    }

    #[test]
    fn update_order_does_not_matter() {
        let a = MarketView::new();
        a.apply_off_chain(Ok(q(185, 360, 420)));
        a.apply_market_poll(Ok((q(250, 333, 333), status())));

        let b = MarketView::new();
        b.apply_market_poll(Ok((q(250, 333, 333), status())));
        b.apply_off_chain(Ok(q(185, 360, 420)));

        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.displayed_quote(), q(250, 333, 333));
    }

    #[test]
    fn off_chain_fills_in_before_first_poll() {
        let view = MarketView::new();
        view.apply_off_chain(Ok(q(185, 360, 420)));
        assert_eq!(view.displayed_quote(), q(185, 360, 420));
        assert!(view.status().is_none());
    }
}
