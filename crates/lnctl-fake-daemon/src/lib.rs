//! Fake node daemon.
//!
//! In-memory [`NodeDaemon`] used for testing the orchestration layer. Every
//! endpoint is counted, failures can be injected per concern, and state
//! pushes can be driven from the test to exercise the subscription path.
//! Invoices must be settled into the daemon up front; paying one debits the
//! channel balance so balance refreshes are observable.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bip39::{Language, Mnemonic};
use lnctl_common::{
    ChannelBalance, DaemonConfig, Error, Network, NodeDaemon, NodeInfo, NodeState, OnChainBalance,
    PaymentConfirmation, StateStream,
};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

/// Buffer for per-subscriber state push channels.
const PUSH_CHANNEL_SIZE: usize = 32;

#[derive(Debug, Default)]
struct CallCounters {
    start: AtomicUsize,
    gen_seed: AtomicUsize,
    create_wallet: AtomicUsize,
    unlock_wallet: AtomicUsize,
    get_info: AtomicUsize,
    wallet_balance: AtomicUsize,
    channel_balance: AtomicUsize,
    pay_invoice: AtomicUsize,
    subscribe: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    state: NodeState,
    wallets: HashMap<Network, String>,
    info: NodeInfo,
    on_chain: OnChainBalance,
    channel: ChannelBalance,
    invoices: HashMap<String, PaymentConfirmation>,
    subscribers: Vec<mpsc::Sender<NodeState>>,
    last_config: Option<DaemonConfig>,
    last_seed: Option<Vec<String>>,
    fail_start: Option<String>,
    fail_seed: bool,
    fail_refreshes: bool,
    unavailable: bool,
}

/// Fake node daemon backend.
#[derive(Debug, Clone)]
pub struct FakeDaemon {
    network: Network,
    inner: Arc<Mutex<Inner>>,
    calls: Arc<CallCounters>,
}

impl FakeDaemon {
    /// New daemon for a network, not running, no wallet.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            inner: Arc::new(Mutex::new(Inner::default())),
            calls: Arc::new(CallCounters::default()),
        }
    }

    /// Overwrite the reported readiness state without notifying subscribers.
    pub async fn set_state(&self, state: NodeState) {
        self.inner.lock().await.state = state;
    }

    /// Overwrite the state and push it to every live subscriber.
    pub async fn push_state(&self, state: NodeState) {
        let mut inner = self.inner.lock().await;
        inner.state = state;
        inner.subscribers.retain(|tx| tx.try_send(state).is_ok());
    }

    /// Pre-install a wallet for a network.
    pub async fn install_wallet(&self, network: Network, password: &str) {
        self.inner
            .lock()
            .await
            .wallets
            .insert(network, password.to_string());
    }

    /// Make the next `start` call fail with the given message.
    pub async fn fail_start(&self, message: &str) {
        self.inner.lock().await.fail_start = Some(message.to_string());
    }

    /// Make `gen_seed` fail.
    pub async fn fail_seed(&self, fail: bool) {
        self.inner.lock().await.fail_seed = fail;
    }

    /// Make the info and balance endpoints fail while `current_state` keeps
    /// answering.
    pub async fn fail_refreshes(&self, fail: bool) {
        self.inner.lock().await.fail_refreshes = fail;
    }

    /// Make every endpoint unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Set the info the daemon reports.
    pub async fn set_info(&self, info: NodeInfo) {
        self.inner.lock().await.info = info;
    }

    /// Set the reported balances.
    pub async fn set_balances(&self, on_chain: OnChainBalance, channel: ChannelBalance) {
        let mut inner = self.inner.lock().await;
        inner.on_chain = on_chain;
        inner.channel = channel;
    }

    /// Register an invoice the daemon will settle when paid.
    pub async fn settle_invoice(&self, invoice: &str, confirmation: PaymentConfirmation) {
        self.inner
            .lock()
            .await
            .invoices
            .insert(invoice.to_string(), confirmation);
    }

    /// Seed words passed to the last `create_wallet` call.
    pub async fn last_seed(&self) -> Option<Vec<String>> {
        self.inner.lock().await.last_seed.clone()
    }

    /// Config passed to the last `start` call.
    pub async fn last_config(&self) -> Option<DaemonConfig> {
        self.inner.lock().await.last_config.clone()
    }

    /// Number of subscriptions whose receiver is still alive.
    pub async fn active_subscriptions(&self) -> usize {
        self.inner
            .lock()
            .await
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Calls made to `start`.
    pub fn start_calls(&self) -> usize {
        self.calls.start.load(Ordering::SeqCst)
    }

    /// Calls made to `gen_seed`.
    pub fn gen_seed_calls(&self) -> usize {
        self.calls.gen_seed.load(Ordering::SeqCst)
    }

    /// Calls made to `create_wallet`.
    pub fn create_wallet_calls(&self) -> usize {
        self.calls.create_wallet.load(Ordering::SeqCst)
    }

    /// Calls made to `unlock_wallet`.
    pub fn unlock_wallet_calls(&self) -> usize {
        self.calls.unlock_wallet.load(Ordering::SeqCst)
    }

    /// Calls made to `get_info`.
    pub fn get_info_calls(&self) -> usize {
        self.calls.get_info.load(Ordering::SeqCst)
    }

    /// Calls made to `get_wallet_balance`.
    pub fn wallet_balance_calls(&self) -> usize {
        self.calls.wallet_balance.load(Ordering::SeqCst)
    }

    /// Calls made to `get_channel_balance`.
    pub fn channel_balance_calls(&self) -> usize {
        self.calls.channel_balance.load(Ordering::SeqCst)
    }

    /// Calls made to `pay_invoice`.
    pub fn pay_invoice_calls(&self) -> usize {
        self.calls.pay_invoice.load(Ordering::SeqCst)
    }

    /// Calls made to `subscribe_state`.
    pub fn subscribe_calls(&self) -> usize {
        self.calls.subscribe.load(Ordering::SeqCst)
    }

    fn check_available(inner: &Inner) -> Result<(), Error> {
        if inner.unavailable {
            return Err(Error::DaemonUnavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeDaemon for FakeDaemon {
    async fn current_state(&self) -> Result<NodeState, Error> {
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        Ok(inner.state)
    }

    async fn start(&self, config: DaemonConfig) -> Result<(), Error> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if let Some(message) = inner.fail_start.take() {
            return Err(Error::StartFailed(message));
        }
        inner.last_config = Some(config);
        // The process comes up first; RPC readiness is reported separately.
        inner.state.running = true;
        Ok(())
    }

    async fn wallet_exists(&self, network: Network) -> Result<bool, Error> {
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        Ok(inner.wallets.contains_key(&network))
    }

    async fn gen_seed(&self) -> Result<Vec<String>, Error> {
        self.calls.gen_seed.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if inner.fail_seed {
            return Err(Error::SeedGenerationFailed);
        }
        let mnemonic = Mnemonic::generate_in(Language::English, 24)
            .map_err(|_| Error::SeedGenerationFailed)?;
        Ok(mnemonic.words().map(String::from).collect())
    }

    async fn create_wallet(&self, password: &str, seed: &[String]) -> Result<(), Error> {
        self.calls.create_wallet.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if inner.wallets.contains_key(&self.network) {
            return Err(Error::AlreadyExists);
        }
        inner.last_seed = Some(seed.to_vec());
        inner.wallets.insert(self.network, password.to_string());
        let state = NodeState {
            running: true,
            grpc_ready: true,
            unlocked: true,
        };
        inner.state = state;
        inner.subscribers.retain(|tx| tx.try_send(state).is_ok());
        Ok(())
    }

    async fn unlock_wallet(&self, password: &str) -> Result<(), Error> {
        self.calls.unlock_wallet.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        match inner.wallets.get(&self.network) {
            None => Err(Error::NoWallet),
            Some(stored) if stored != password => Err(Error::AuthFailed),
            Some(_) => {
                let state = NodeState {
                    running: true,
                    grpc_ready: true,
                    unlocked: true,
                };
                inner.state = state;
                inner.subscribers.retain(|tx| tx.try_send(state).is_ok());
                Ok(())
            }
        }
    }

    async fn get_info(&self) -> Result<NodeInfo, Error> {
        self.calls.get_info.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if inner.fail_refreshes {
            return Err(Error::DaemonUnavailable("injected failure".to_string()));
        }
        Ok(inner.info.clone())
    }

    async fn get_wallet_balance(&self) -> Result<OnChainBalance, Error> {
        self.calls.wallet_balance.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if inner.fail_refreshes {
            return Err(Error::DaemonUnavailable("injected failure".to_string()));
        }
        Ok(inner.on_chain)
    }

    async fn get_channel_balance(&self) -> Result<ChannelBalance, Error> {
        self.calls.channel_balance.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        if inner.fail_refreshes {
            return Err(Error::DaemonUnavailable("injected failure".to_string()));
        }
        Ok(inner.channel)
    }

    async fn pay_invoice(&self, invoice: &str) -> Result<PaymentConfirmation, Error> {
        self.calls.pay_invoice.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        let Some(confirmation) = inner.invoices.remove(invoice) else {
            return Err(Error::PaymentFailed(format!(
                "unable to route payment for {invoice}"
            )));
        };
        let spent = confirmation.amount_sat + confirmation.fee_sat;
        inner.channel.balance = inner.channel.balance.saturating_sub(spent);
        tracing::debug!(invoice, spent, "fake daemon settled payment");
        Ok(confirmation)
    }

    async fn subscribe_state(&self) -> Result<StateStream, Error> {
        self.calls.subscribe.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        Self::check_available(&inner)?;
        let (tx, rx) = mpsc::channel(PUSH_CHANNEL_SIZE);
        inner.subscribers.push(tx);
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlock_checks_password() {
        let daemon = FakeDaemon::new(Network::Regtest);
        daemon.install_wallet(Network::Regtest, "correct").await;

        assert!(matches!(
            daemon.unlock_wallet("wrong").await,
            Err(Error::AuthFailed)
        ));
        daemon.unlock_wallet("correct").await.expect("unlocks");
        let state = daemon.current_state().await.expect("state");
        assert!(state.unlocked);
    }

    #[tokio::test]
    async fn gen_seed_returns_24_words() {
        let daemon = FakeDaemon::new(Network::Regtest);
        let seed = daemon.gen_seed().await.expect("seed");
        assert_eq!(seed.len(), 24);
    }

    #[tokio::test]
    async fn paying_settled_invoice_debits_channel_balance() {
        let daemon = FakeDaemon::new(Network::Regtest);
        daemon
            .set_balances(
                OnChainBalance::default(),
                ChannelBalance {
                    balance: 10_000,
                    pending_open_balance: 0,
                },
            )
            .await;
        daemon
            .settle_invoice(
                "lnbcrt1invoice",
                PaymentConfirmation {
                    payment_hash: "00".repeat(32),
                    payment_preimage: None,
                    amount_sat: 1_000,
                    fee_sat: 1,
                },
            )
            .await;

        daemon.pay_invoice("lnbcrt1invoice").await.expect("paid");
        let balance = daemon.get_channel_balance().await.expect("balance");
        assert_eq!(balance.balance, 8_999);

        // Second attempt no longer routes.
        assert!(matches!(
            daemon.pay_invoice("lnbcrt1invoice").await,
            Err(Error::PaymentFailed(_))
        ));
    }
}
