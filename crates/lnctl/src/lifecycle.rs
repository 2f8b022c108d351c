//! Node lifecycle orchestration.
//!
//! [`NodeLifecycle`] drives the daemon through
//! not-running → running → rpc-ready → unlocked, mirrors daemon state pushes
//! into the store through a single long-lived subscription task, and keeps a
//! background poll loop refreshing info and balances once the daemon's RPC
//! interface is reachable.
//!
//! Both background activities are owned, cancellable tasks: the poll
//! scheduler holds at most one scheduled loop and cancels the previous one
//! before starting a new one, so repeated create/unlock calls never leave
//! overlapping timers behind.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lnctl_common::{DaemonConfig, Error, Network, NodeDaemon, WalletCredentials};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::refresh;
use crate::store::{NodeStore, StoreUpdate};

/// Backoff between readiness probes while the daemon RPC is not yet up.
const NOT_READY_RETRY: Duration = Duration::from_secs(1);
/// Interval between refresh cycles once the daemon is ready.
const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Consecutive fully-failed ticks before the health slice flips to degraded.
const DEGRADED_TICK_THRESHOLD: u32 = 3;

/// A spawned background task and its cancellation token.
#[derive(Debug)]
struct TaskHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Cancel and wait for the task to finish.
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

/// Owns the single scheduled poll loop.
#[derive(Debug, Default)]
struct PollScheduler {
    slot: Mutex<Option<TaskHandle>>,
}

impl PollScheduler {
    /// Start the poll loop, cancelling any previously scheduled one first.
    ///
    /// Fire-and-forget: returns as soon as the loop task is spawned.
    async fn restart(&self, daemon: Arc<dyn NodeDaemon>, store: NodeStore) {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(daemon, store, cancel.clone()));
        *slot = Some(TaskHandle { cancel, handle });
    }

    async fn stop(&self) {
        let taken = self.slot.lock().await.take();
        if let Some(previous) = taken {
            previous.stop().await;
        }
    }
}

/// Lifecycle orchestrator for one daemon connection.
///
/// The orchestrator is the only issuer of lifecycle calls against the daemon
/// and, together with the payment coordinator, the only writer to the store.
pub struct NodeLifecycle {
    daemon: Arc<dyn NodeDaemon>,
    store: NodeStore,
    poller: PollScheduler,
    subscription: Mutex<Option<TaskHandle>>,
}

impl std::fmt::Debug for NodeLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLifecycle")
            .field("store", &self.store)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl NodeLifecycle {
    /// New orchestrator with an empty store.
    pub fn new(daemon: Arc<dyn NodeDaemon>) -> Self {
        Self::with_store(daemon, NodeStore::new())
    }

    /// New orchestrator writing into an existing store.
    pub fn with_store(daemon: Arc<dyn NodeDaemon>, store: NodeStore) -> Self {
        Self {
            daemon,
            store,
            poller: PollScheduler::default(),
            subscription: Mutex::new(None),
        }
    }

    /// The store this orchestrator writes to.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Start the daemon for a network.
    ///
    /// Idempotent: when the daemon already reports running and rpc-ready the
    /// current state is pushed into the store and no second start is issued.
    /// On the first successful start the daemon's state-push stream is
    /// subscribed to exactly once; re-invoking never adds a second
    /// subscription.
    pub async fn start(&self, network: Network, overrides: Option<Value>) -> Result<(), Error> {
        if let Ok(state) = self.daemon.current_state().await {
            if state.running && state.grpc_ready {
                self.store.apply(StoreUpdate::State(state)).await;
                self.ensure_subscribed().await?;
                return Ok(());
            }
        }

        let config = DaemonConfig::new(network, overrides);
        if let Err(err) = self.daemon.start(config).await {
            return Err(match err {
                Error::StartFailed(_) => err,
                other => Error::StartFailed(other.to_string()),
            });
        }
        tracing::info!(%network, "daemon started");

        if let Err(err) = refresh::state(self.daemon.as_ref(), &self.store).await {
            tracing::warn!("initial state refresh failed: {err}");
        }
        self.ensure_subscribed().await?;
        Ok(())
    }

    /// Create a new wallet.
    ///
    /// Fails with [`Error::AlreadyExists`] without touching the create
    /// endpoint when the daemon already has a wallet for the network. The
    /// seed comes from the supplied mnemonic when present, otherwise from
    /// the daemon. On success the poll loop is started without being
    /// awaited.
    pub async fn create_wallet(&self, credentials: WalletCredentials) -> Result<(), Error> {
        if self.daemon.wallet_exists(credentials.network).await? {
            return Err(Error::AlreadyExists);
        }

        let seed = match credentials.mnemonic.as_deref() {
            Some(mnemonic) => mnemonic.split_whitespace().map(String::from).collect(),
            None => self
                .daemon
                .gen_seed()
                .await
                .map_err(|_| Error::SeedGenerationFailed)?,
        };

        self.daemon
            .create_wallet(&credentials.password, &seed)
            .await?;
        tracing::info!(network = %credentials.network, "wallet created");

        self.store.apply(StoreUpdate::WalletCreated).await;
        self.poller
            .restart(Arc::clone(&self.daemon), self.store.clone())
            .await;
        Ok(())
    }

    /// Unlock an existing wallet.
    ///
    /// When the daemon already reports rpc-ready the wallet is treated as
    /// unlocked: the poll loop is (re)started and no unlock call is made.
    /// Daemon unlock errors (wrong password and the rest) surface verbatim.
    pub async fn unlock_wallet(&self, credentials: WalletCredentials) -> Result<(), Error> {
        if let Ok(state) = self.daemon.current_state().await {
            if state.grpc_ready {
                self.poller
                    .restart(Arc::clone(&self.daemon), self.store.clone())
                    .await;
                return Ok(());
            }
        }

        if !self.daemon.wallet_exists(credentials.network).await? {
            return Err(Error::NoWallet);
        }

        self.daemon.unlock_wallet(&credentials.password).await?;
        tracing::info!(network = %credentials.network, "wallet unlocked");

        self.store.apply(StoreUpdate::WalletUnlocked).await;
        self.poller
            .restart(Arc::clone(&self.daemon), self.store.clone())
            .await;
        Ok(())
    }

    /// Refresh the readiness-state slice.
    pub async fn refresh_state(&self) -> Result<(), Error> {
        refresh::state(self.daemon.as_ref(), &self.store).await
    }

    /// Refresh the node-info slice.
    pub async fn refresh_info(&self) -> Result<(), Error> {
        refresh::info(self.daemon.as_ref(), &self.store).await
    }

    /// Refresh the on-chain-balance slice.
    pub async fn refresh_on_chain_balance(&self) -> Result<(), Error> {
        refresh::on_chain_balance(self.daemon.as_ref(), &self.store).await
    }

    /// Refresh the channel-balance slice.
    pub async fn refresh_channel_balance(&self) -> Result<(), Error> {
        refresh::channel_balance(self.daemon.as_ref(), &self.store).await
    }

    /// Stop the poll loop and the state subscription and wait for both.
    pub async fn shutdown(&self) {
        self.poller.stop().await;
        let taken = self.subscription.lock().await.take();
        if let Some(subscription) = taken {
            subscription.stop().await;
        }
    }

    /// Shut down and reset every store slice to empty.
    pub async fn logout(&self) {
        self.shutdown().await;
        self.store.reset().await;
    }

    /// Subscribe to daemon state pushes, once.
    ///
    /// A still-running subscription task suppresses re-subscription; a task
    /// whose stream ended is replaced.
    async fn ensure_subscribed(&self) -> Result<(), Error> {
        let mut slot = self.subscription.lock().await;
        if let Some(existing) = slot.as_ref() {
            if !existing.handle.is_finished() {
                return Ok(());
            }
        }

        let mut stream = self.daemon.subscribe_state().await?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = stream.next() => match next {
                        Some(state) => {
                            if !state.is_coherent() {
                                tracing::warn!(?state, "daemon pushed an incoherent readiness state");
                            }
                            store.apply(StoreUpdate::State(state)).await;
                        }
                        None => {
                            tracing::info!("daemon state stream ended");
                            break;
                        }
                    }
                }
            }
        });
        *slot = Some(TaskHandle { cancel, handle });
        Ok(())
    }
}

/// Tracks consecutive fully-failed ticks and drives the health slice.
struct TickHealth {
    consecutive_failures: u32,
    degraded: bool,
}

impl TickHealth {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            degraded: false,
        }
    }

    async fn record_failure(&mut self, store: &NodeStore) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= DEGRADED_TICK_THRESHOLD && !self.degraded {
            self.degraded = true;
            tracing::warn!(
                ticks = self.consecutive_failures,
                "daemon unreachable across consecutive poll ticks, marking degraded"
            );
            store.apply(StoreUpdate::Degraded(true)).await;
        }
    }

    async fn record_success(&mut self, store: &NodeStore) {
        self.consecutive_failures = 0;
        if self.degraded {
            self.degraded = false;
            tracing::info!("poll loop recovered");
            store.apply(StoreUpdate::Degraded(false)).await;
        }
    }
}

async fn poll_loop(daemon: Arc<dyn NodeDaemon>, store: NodeStore, cancel: CancellationToken) {
    let mut health = TickHealth::new();
    loop {
        let delay = poll_tick(daemon.as_ref(), &store, &mut health).await;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// One refresh cycle.
///
/// Skips every refresh while the daemon's RPC is not reachable, retrying on
/// the short backoff; otherwise runs the three refreshes concurrently and
/// swallows their individual failures. A transient daemon error must never
/// end the loop.
async fn poll_tick(daemon: &dyn NodeDaemon, store: &NodeStore, health: &mut TickHealth) -> Duration {
    match daemon.current_state().await {
        Ok(state) if !state.grpc_ready => return NOT_READY_RETRY,
        Ok(_) => {}
        Err(err) => {
            tracing::warn!("poll readiness check failed: {err}");
            health.record_failure(store).await;
            return NOT_READY_RETRY;
        }
    }

    let (info, on_chain, channel) = tokio::join!(
        refresh::info(daemon, store),
        refresh::on_chain_balance(daemon, store),
        refresh::channel_balance(daemon, store),
    );

    let mut any_succeeded = false;
    for result in [info, on_chain, channel] {
        match result {
            Ok(()) => any_succeeded = true,
            Err(err) => {
                tracing::warn!("{}", Error::RefreshFailed(err.to_string()));
            }
        }
    }
    if any_succeeded {
        health.record_success(store).await;
    } else {
        health.record_failure(store).await;
    }

    POLL_INTERVAL
}
