//! lnctl Error

use thiserror::Error;

/// lnctl Error
#[derive(Debug, Error)]
pub enum Error {
    /// Daemon could not be reached
    #[error("Daemon unavailable: {0}")]
    DaemonUnavailable(String),
    /// Daemon start failed
    #[error("Node start failed: {0}")]
    StartFailed(String),
    /// Wallet already exists for the network
    #[error("Wallet already exists")]
    AlreadyExists,
    /// No wallet exists for the network
    #[error("Wallet does not exist")]
    NoWallet,
    /// Seed generation failed
    #[error("Unable to generate seed")]
    SeedGenerationFailed,
    /// Wrong password on unlock
    #[error("Authentication failed")]
    AuthFailed,
    /// Daemon rejected the payment
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    /// A background refresh failed (non-fatal)
    #[error("Refresh failed: {0}")]
    RefreshFailed(String),
}
