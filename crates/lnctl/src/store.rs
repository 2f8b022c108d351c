//! Sliced node state store.
//!
//! Holds the latest daemon-reported state, info, and balances as independent
//! slices. All mutation goes through [`NodeStore::apply`]; each apply
//! replaces one slice wholesale and broadcasts which slice changed so
//! readers (UI) can re-read just that part. There are no cross-slice
//! invariants here; within one slice the last completed write wins.

use std::sync::Arc;

use lnctl_common::{ChannelBalance, NodeInfo, NodeState, OnChainBalance};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// Buffered change notifications per subscriber.
const CHANGE_CHANNEL_SIZE: usize = 64;

/// One independently-updatable portion of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    /// Daemon readiness state
    State,
    /// Node info
    Info,
    /// On-chain balance
    OnChainBalance,
    /// Channel balance
    ChannelBalance,
    /// Locally recorded wallet lifecycle transitions
    Wallet,
    /// Poll-loop health
    Health,
}

/// A single slice replacement.
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    /// Replace the readiness state
    State(NodeState),
    /// Replace the node info
    Info(NodeInfo),
    /// Replace the on-chain balance
    OnChainBalance(OnChainBalance),
    /// Replace the channel balance
    ChannelBalance(ChannelBalance),
    /// Record that a wallet was created
    WalletCreated,
    /// Record that the wallet was unlocked
    WalletUnlocked,
    /// Flip the poll-loop degraded flag
    Degraded(bool),
}

/// Wallet lifecycle transitions recorded by the orchestrator.
///
/// Kept apart from [`NodeState`], which stays a verbatim daemon mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStatus {
    /// A wallet create call succeeded this session
    pub created: bool,
    /// A wallet unlock call succeeded this session
    pub unlocked: bool,
}

/// Consistent point-in-time view of every slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Daemon readiness state
    pub state: NodeState,
    /// Node info, absent until the first successful refresh
    pub info: Option<NodeInfo>,
    /// On-chain balance
    pub on_chain: OnChainBalance,
    /// Channel balance
    pub channel: ChannelBalance,
    /// Wallet lifecycle transitions
    pub wallet: WalletStatus,
    /// Set while the poll loop cannot reach the daemon
    pub degraded: bool,
}

/// Shared store handle.
///
/// Cheap to clone; all clones observe the same slices. Only the lifecycle
/// orchestrator and the payment coordinator write.
#[derive(Debug, Clone)]
pub struct NodeStore {
    inner: Arc<RwLock<Snapshot>>,
    changes: broadcast::Sender<Slice>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        Self {
            inner: Arc::new(RwLock::new(Snapshot::default())),
            changes,
        }
    }

    /// Current snapshot of every slice.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Replace one slice and notify subscribers which one changed.
    pub async fn apply(&self, update: StoreUpdate) {
        let slice = {
            let mut snapshot = self.inner.write().await;
            match update {
                StoreUpdate::State(state) => {
                    snapshot.state = state;
                    Slice::State
                }
                StoreUpdate::Info(info) => {
                    snapshot.info = Some(info);
                    Slice::Info
                }
                StoreUpdate::OnChainBalance(balance) => {
                    snapshot.on_chain = balance;
                    Slice::OnChainBalance
                }
                StoreUpdate::ChannelBalance(balance) => {
                    snapshot.channel = balance;
                    Slice::ChannelBalance
                }
                StoreUpdate::WalletCreated => {
                    snapshot.wallet.created = true;
                    Slice::Wallet
                }
                StoreUpdate::WalletUnlocked => {
                    snapshot.wallet.unlocked = true;
                    Slice::Wallet
                }
                StoreUpdate::Degraded(degraded) => {
                    snapshot.degraded = degraded;
                    Slice::Health
                }
            }
        };
        // Nobody listening is fine.
        let _ = self.changes.send(slice);
    }

    /// Subscribe to per-slice change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Slice> {
        self.changes.subscribe()
    }

    /// Reset every slice to empty, as on logout.
    pub async fn reset(&self) {
        {
            let mut snapshot = self.inner.write().await;
            *snapshot = Snapshot::default();
        }
        for slice in [
            Slice::State,
            Slice::Info,
            Slice::OnChainBalance,
            Slice::ChannelBalance,
            Slice::Wallet,
            Slice::Health,
        ] {
            let _ = self.changes.send(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn apply_replaces_one_slice_wholesale() {
        let store = NodeStore::new();
        store
            .apply(StoreUpdate::Info(NodeInfo {
                version: "0.17.0".to_string(),
                block_height: 100,
                ..Default::default()
            }))
            .await;
        store
            .apply(StoreUpdate::Info(NodeInfo {
                version: "0.17.1".to_string(),
                ..Default::default()
            }))
            .await;

        let snapshot = store.snapshot().await;
        let info = snapshot.info.expect("info refreshed");
        assert_eq!(info.version, "0.17.1");
        // Overwritten wholesale, not merged field-by-field.
        assert_eq!(info.block_height, 0);
        // Unrelated slices untouched.
        assert_eq!(snapshot.channel, ChannelBalance::default());
    }

    #[tokio::test]
    async fn apply_notifies_the_changed_slice() {
        let store = NodeStore::new();
        let mut changes = store.subscribe();

        store
            .apply(StoreUpdate::ChannelBalance(ChannelBalance {
                balance: 42,
                pending_open_balance: 0,
            }))
            .await;
        store
            .apply(StoreUpdate::State(NodeState {
                running: true,
                grpc_ready: false,
                unlocked: false,
            }))
            .await;

        assert_eq!(changes.recv().await.expect("event"), Slice::ChannelBalance);
        assert_eq!(changes.recv().await.expect("event"), Slice::State);
    }

    #[tokio::test]
    async fn reads_after_apply_observe_the_new_value() {
        let store = NodeStore::new();
        let state = NodeState {
            running: true,
            grpc_ready: true,
            unlocked: true,
        };
        store.apply(StoreUpdate::State(state)).await;
        assert_eq!(store.snapshot().await.state, state);
    }

    #[tokio::test]
    async fn reset_empties_every_slice() {
        let store = NodeStore::new();
        store
            .apply(StoreUpdate::State(NodeState {
                running: true,
                grpc_ready: true,
                unlocked: true,
            }))
            .await;
        store.apply(StoreUpdate::WalletCreated).await;
        store
            .apply(StoreUpdate::OnChainBalance(OnChainBalance {
                total_balance: 7,
                confirmed_balance: 7,
                unconfirmed_balance: 0,
            }))
            .await;

        store.reset().await;
        assert_eq!(store.snapshot().await, Snapshot::default());
    }
}
