//! Single-slice refreshes.
//!
//! Each refresh is one daemon query that overwrites one store slice on
//! success and leaves the store untouched on failure, so a failed refresh
//! can never corrupt an unrelated slice.

use lnctl_common::{Error, NodeDaemon};

use crate::store::{NodeStore, StoreUpdate};

pub(crate) async fn state(daemon: &dyn NodeDaemon, store: &NodeStore) -> Result<(), Error> {
    let state = daemon.current_state().await?;
    if !state.is_coherent() {
        tracing::warn!(?state, "daemon reported an incoherent readiness state");
    }
    store.apply(StoreUpdate::State(state)).await;
    Ok(())
}

pub(crate) async fn info(daemon: &dyn NodeDaemon, store: &NodeStore) -> Result<(), Error> {
    let info = daemon.get_info().await?;
    store.apply(StoreUpdate::Info(info)).await;
    Ok(())
}

pub(crate) async fn on_chain_balance(
    daemon: &dyn NodeDaemon,
    store: &NodeStore,
) -> Result<(), Error> {
    let balance = daemon.get_wallet_balance().await?;
    store.apply(StoreUpdate::OnChainBalance(balance)).await;
    Ok(())
}

pub(crate) async fn channel_balance(
    daemon: &dyn NodeDaemon,
    store: &NodeStore,
) -> Result<(), Error> {
    let balance = daemon.get_channel_balance().await?;
    store.apply(StoreUpdate::ChannelBalance(balance)).await;
    Ok(())
}
