//! Daemon-reported state types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network the daemon runs against.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet
    Mainnet,
    /// Bitcoin testnet
    Testnet,
    /// Bitcoin signet
    Signet,
    /// Local regtest
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Signet => write!(f, "signet"),
            Self::Regtest => write!(f, "regtest"),
        }
    }
}

/// Daemon start configuration.
///
/// The overrides blob is opaque pass-through data for the daemon; the core
/// never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Network the daemon should run against
    pub network: Network,
    /// Daemon-specific configuration overrides
    pub overrides: Option<Value>,
}

impl DaemonConfig {
    /// Config for a network with no overrides.
    pub fn new(network: Network, overrides: Option<Value>) -> Self {
        Self { network, overrides }
    }
}

/// Readiness state reported by the daemon.
///
/// Mirrored verbatim into the store; never derived locally beyond the
/// [`NodeState::is_coherent`] implication check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Daemon process is running
    pub running: bool,
    /// Daemon RPC interface is reachable
    pub grpc_ready: bool,
    /// Wallet is unlocked
    pub unlocked: bool,
}

impl NodeState {
    /// Checks the `unlocked ⇒ grpc_ready ⇒ running` implication chain.
    ///
    /// A daemon that reports an unlocked wallet over an unreachable RPC
    /// interface is lying about one of the two.
    pub fn is_coherent(&self) -> bool {
        (!self.unlocked || self.grpc_ready) && (!self.grpc_ready || self.running)
    }
}

/// Daemon node info, refreshed periodically and overwritten wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Daemon version string
    pub version: String,
    /// Node identity public key (hex)
    pub identity_pubkey: String,
    /// Whether the node is synced to the chain tip
    pub synced_to_chain: bool,
    /// Best block height the node knows of
    pub block_height: u32,
    /// Number of active channels
    pub num_active_channels: u32,
    /// Number of connected peers
    pub num_peers: u32,
}

/// On-chain wallet balance in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainBalance {
    /// Total balance
    pub total_balance: u64,
    /// Confirmed balance
    pub confirmed_balance: u64,
    /// Unconfirmed balance
    pub unconfirmed_balance: u64,
}

/// Channel balance in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBalance {
    /// Sum of local channel balances
    pub balance: u64,
    /// Balance in channels pending open
    pub pending_open_balance: u64,
}

/// Confirmation returned for a settled outgoing payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Payment hash (hex)
    pub payment_hash: String,
    /// Payment preimage (hex), if the daemon revealed it
    pub payment_preimage: Option<String>,
    /// Amount paid in satoshis
    pub amount_sat: u64,
    /// Routing fee paid in satoshis
    pub fee_sat: u64,
}

/// Credentials for wallet create/unlock calls.
///
/// Ephemeral: lives only for the duration of one call and is never persisted
/// by this core.
#[derive(Clone)]
pub struct WalletCredentials {
    /// Wallet password
    pub password: String,
    /// Optional mnemonic; when absent a fresh seed is requested from the
    /// daemon on create
    pub mnemonic: Option<String>,
    /// Network the wallet belongs to
    pub network: Network,
}

impl fmt::Debug for WalletCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredentials")
            .field("password", &"<redacted>")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("network", &self.network)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coherence_implication_chain() {
        let ok = [
            NodeState::default(),
            NodeState {
                running: true,
                grpc_ready: false,
                unlocked: false,
            },
            NodeState {
                running: true,
                grpc_ready: true,
                unlocked: false,
            },
            NodeState {
                running: true,
                grpc_ready: true,
                unlocked: true,
            },
        ];
        for state in ok {
            assert!(state.is_coherent(), "{state:?}");
        }

        let bad = [
            NodeState {
                running: false,
                grpc_ready: true,
                unlocked: false,
            },
            NodeState {
                running: false,
                grpc_ready: false,
                unlocked: true,
            },
            NodeState {
                running: true,
                grpc_ready: false,
                unlocked: true,
            },
        ];
        for state in bad {
            assert!(!state.is_coherent(), "{state:?}");
        }
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = WalletCredentials {
            password: "hunter2".to_string(),
            mnemonic: Some("abandon abandon about".to_string()),
            network: Network::Regtest,
        };
        let out = format!("{creds:?}");
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("abandon"));
    }
}
