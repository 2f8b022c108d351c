//! Node daemon trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Error;
use crate::state::{
    ChannelBalance, DaemonConfig, Network, NodeInfo, NodeState, OnChainBalance,
    PaymentConfirmation,
};

/// Stream of daemon state pushes.
pub type StateStream = Pin<Box<dyn Stream<Item = NodeState> + Send>>;

/// Request/response and subscription interface to the Lightning daemon.
///
/// Every call may suspend for a daemon round-trip; implementations are
/// expected to bound that with their own timeouts. Nothing here panics; all
/// failures come back as [`Error`].
#[async_trait]
pub trait NodeDaemon: Send + Sync {
    /// Current readiness state.
    async fn current_state(&self) -> Result<NodeState, Error>;

    /// Start the daemon process.
    async fn start(&self, config: DaemonConfig) -> Result<(), Error>;

    /// Whether a wallet already exists for the network.
    async fn wallet_exists(&self, network: Network) -> Result<bool, Error>;

    /// Generate a fresh seed phrase.
    async fn gen_seed(&self) -> Result<Vec<String>, Error>;

    /// Create a wallet from a password and seed words.
    async fn create_wallet(&self, password: &str, seed: &[String]) -> Result<(), Error>;

    /// Unlock an existing wallet.
    async fn unlock_wallet(&self, password: &str) -> Result<(), Error>;

    /// Node info.
    async fn get_info(&self) -> Result<NodeInfo, Error>;

    /// On-chain wallet balance.
    async fn get_wallet_balance(&self) -> Result<OnChainBalance, Error>;

    /// Channel balance.
    async fn get_channel_balance(&self) -> Result<ChannelBalance, Error>;

    /// Pay a bolt11 invoice.
    async fn pay_invoice(&self, invoice: &str) -> Result<PaymentConfirmation, Error>;

    /// Subscribe to daemon state pushes.
    ///
    /// The stream ends when the daemon side closes it; callers own the
    /// reading task and its shutdown.
    async fn subscribe_state(&self) -> Result<StateStream, Error>;
}
