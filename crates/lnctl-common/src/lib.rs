//! lnctl shared types and traits.
//!
//! This crate is the base foundation for the lnctl crates: the error
//! taxonomy, the daemon-reported state types, and the [`NodeDaemon`] trait
//! every daemon backend implements.

pub mod daemon;
pub mod error;
pub mod state;

pub use daemon::{NodeDaemon, StateStream};
pub use error::Error;
pub use state::{
    ChannelBalance, DaemonConfig, Network, NodeInfo, NodeState, OnChainBalance,
    PaymentConfirmation, WalletCredentials,
};
