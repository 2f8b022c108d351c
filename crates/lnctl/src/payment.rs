//! Payment coordination.

use std::sync::Arc;

use lnctl_common::{Error, NodeDaemon, PaymentConfirmation};

use crate::refresh;
use crate::store::NodeStore;

/// Routes payment requests against the daemon.
///
/// Shares the store with the lifecycle orchestrator so a settled payment is
/// followed by a channel-balance refresh readers can observe.
pub struct PaymentCoordinator {
    daemon: Arc<dyn NodeDaemon>,
    store: NodeStore,
}

impl PaymentCoordinator {
    /// New coordinator writing balance refreshes into `store`.
    pub fn new(daemon: Arc<dyn NodeDaemon>, store: NodeStore) -> Self {
        Self { daemon, store }
    }

    /// Pay a bolt11 invoice.
    ///
    /// Daemon errors surface verbatim and nothing is retried; payment is not
    /// safely idempotent at this layer. On success the channel balance is
    /// refreshed best-effort before the confirmation is returned; a failed
    /// refresh never downgrades a settled payment.
    pub async fn pay_invoice(&self, invoice: &str) -> Result<PaymentConfirmation, Error> {
        let confirmation = self.daemon.pay_invoice(invoice).await?;
        tracing::info!(
            payment_hash = %confirmation.payment_hash,
            amount_sat = confirmation.amount_sat,
            "invoice paid"
        );

        if let Err(err) = refresh::channel_balance(self.daemon.as_ref(), &self.store).await {
            tracing::warn!("post-payment channel balance refresh failed: {err}");
        }
        Ok(confirmation)
    }
}

impl std::fmt::Debug for PaymentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentCoordinator")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
