//! Lightning node lifecycle orchestration.
//!
//! Drives an external Lightning daemon through start, wallet create/unlock,
//! and a background refresh loop, mirroring the daemon's state into a
//! sliced [`store::NodeStore`] that readers observe. Payments are routed
//! through the [`payment::PaymentCoordinator`], which refreshes the channel
//! balance after a settle.
//!
//! The daemon itself is opaque; it is consumed through the
//! [`lnctl_common::NodeDaemon`] trait.

pub mod lifecycle;
pub mod payment;
mod refresh;
pub mod store;

pub use lifecycle::NodeLifecycle;
pub use lnctl_common::{
    ChannelBalance, DaemonConfig, Error, Network, NodeDaemon, NodeInfo, NodeState, OnChainBalance,
    PaymentConfirmation, StateStream, WalletCredentials,
};
pub use payment::PaymentCoordinator;
pub use store::{NodeStore, Slice, Snapshot, StoreUpdate, WalletStatus};
