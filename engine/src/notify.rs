use engine_core::{Notice, Notifier};
use tracing::{info, warn};

/// Routes action outcomes into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Info(msg) => info!(target: "notice", "{}", msg),
            Notice::Confirmed { action, receipt } => {
                info!(target: "notice", %action, tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "confirmed")
            }
            Notice::Failed { action, error } => {
                warn!(target: "notice", %action, %error, "failed")
            }
        }
    }
}
