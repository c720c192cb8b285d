use crate::model::OutcomeQuote;

/// Field-wise merge: on-chain odds win once available, then the off-chain
/// snapshot, then `Unavailable`.
pub fn reconcile(off_chain: &OutcomeQuote, on_chain: &OutcomeQuote) -> OutcomeQuote {
    OutcomeQuote {
        win: on_chain.win.or(off_chain.win),
        draw: on_chain.draw.or(off_chain.draw),
        lose: on_chain.lose.or(off_chain.lose),
    }
}
