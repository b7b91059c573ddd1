//! Staking orchestrator.
//!
//! Owns the session, picks the wallet backend, converts and validates
//! amounts, dispatches staking operations and refreshes the overview after
//! every successful mutation.
//!
//! Every mutating call runs the same pipeline:
//! validate -> convert -> dispatch -> refresh the whole overview -> return.
//! A failed dispatch still refreshes when the transaction reached the chain.
//! Only one mutating call runs at a time; a concurrent one fails with
//! [`StakingError::Busy`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use qube_core::units::to_minimal_units;
use qube_core::{ReadPolicy, Session, StakingOverview, TxReceipt, UnitError, WalletKind};
use tokio::sync::{Mutex, RwLock};

use crate::client::{ChainInfo, validate_chain};
use crate::config::StakingConfig;
use crate::error::{StakingError, WalletError};
use crate::queries::ChainQuery;
use crate::store::SessionStore;
use crate::totals::build_overview;
use crate::wallet::evm::parse_quantity;
use crate::wallet::{
    CosmosExtension, Eip1193Provider, EvmBridgeBackend, NativeBackend, ProviderEvent,
    WalletBackend, apply_read_policy,
};

/// Wallet integrations available on this host.
#[derive(Clone, Default)]
pub struct WalletProviders {
    pub keplr: Option<Arc<dyn CosmosExtension>>,
    pub leap: Option<Arc<dyn CosmosExtension>>,
    pub evm: Option<Arc<dyn Eip1193Provider>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    Initialized,
    WalletConnected,
    /// A mutating operation is in flight.
    Busy,
}

struct ActiveWallet {
    backend: Arc<dyn WalletBackend>,
    session: Session,
}

/// Cached overview tagged with the load that produced it.
#[derive(Default)]
struct OverviewSlot {
    generation: u64,
    snapshot: Option<Arc<StakingOverview>>,
}

/// Held for the duration of a mutating call.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct StakingOrchestrator {
    chain: Arc<dyn ChainQuery>,
    providers: WalletProviders,
    store: Arc<dyn SessionStore>,
    config: StakingConfig,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    chain_info: RwLock<Option<ChainInfo>>,
    busy: AtomicBool,
    active: RwLock<Option<ActiveWallet>>,
    generation: AtomicU64,
    overview: RwLock<OverviewSlot>,
}

impl StakingOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainQuery>,
        providers: WalletProviders,
        store: Arc<dyn SessionStore>,
        config: StakingConfig,
    ) -> Self {
        Self {
            chain,
            providers,
            store,
            config,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            chain_info: RwLock::new(None),
            busy: AtomicBool::new(false),
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
            overview: RwLock::new(OverviewSlot::default()),
        }
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub async fn state(&self) -> OrchestratorState {
        if self.busy.load(Ordering::SeqCst) {
            OrchestratorState::Busy
        } else if self.active.read().await.is_some() {
            OrchestratorState::WalletConnected
        } else if self.initialized.load(Ordering::SeqCst) {
            OrchestratorState::Initialized
        } else {
            OrchestratorState::Uninitialized
        }
    }

    /// Current session, if a wallet is connected.
    pub async fn session(&self) -> Option<Session> {
        self.active.read().await.as_ref().map(|a| a.session.clone())
    }

    /// Latest overview snapshot.
    pub async fn overview(&self) -> Option<Arc<StakingOverview>> {
        self.overview.read().await.snapshot.clone()
    }

    /// Node identity checked by [`initialize`](Self::initialize).
    pub async fn chain_info(&self) -> Option<ChainInfo> {
        self.chain_info.read().await.clone()
    }

    fn begin(&self) -> Result<BusyGuard<'_>, StakingError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| StakingError::Busy)
    }

    /// Check the chain is reachable. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<(), StakingError> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        let _lock = self.init_lock.lock().await;
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        let info = validate_chain(self.config.network, self.chain.node_info().await?);
        tracing::info!(
            "Staking client ready on {} ({})",
            info.node.network,
            info.node.version
        );
        *self.chain_info.write().await = Some(info);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn backend_for(&self, kind: WalletKind) -> Result<Arc<dyn WalletBackend>, StakingError> {
        let native = |extension: &Option<Arc<dyn CosmosExtension>>| -> Arc<dyn WalletBackend> {
            Arc::new(NativeBackend::new(
                kind,
                extension.clone(),
                self.chain.clone(),
                self.config.clone(),
            ))
        };

        let backend: Arc<dyn WalletBackend> = match kind {
            WalletKind::Keplr => native(&self.providers.keplr),
            WalletKind::Leap => native(&self.providers.leap),
            WalletKind::MetaMask => {
                let provider = self
                    .providers
                    .evm
                    .clone()
                    .ok_or(StakingError::ConnectorMissing)?;
                Arc::new(EvmBridgeBackend::new(
                    provider,
                    self.chain.clone(),
                    self.config.clone(),
                ))
            }
        };
        Ok(backend)
    }

    async fn backend(&self) -> Result<Arc<dyn WalletBackend>, StakingError> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|a| a.backend.clone())
            .ok_or(StakingError::NotConnected)
    }

    /// Connect by wallet name (`keplr`, `leap`, `metamask`).
    pub async fn connect_wallet(&self, kind: &str) -> Result<Session, StakingError> {
        let kind: WalletKind = kind
            .parse()
            .map_err(|e: qube_core::UnknownWalletKind| StakingError::UnknownWalletType(e.0))?;
        self.connect(kind).await
    }

    /// Open a session with `kind`. The previous session, if any, is kept
    /// until the new wallet has approved the connection.
    pub async fn connect(&self, kind: WalletKind) -> Result<Session, StakingError> {
        let _busy = self.begin()?;
        self.initialize().await?;
        let backend = self.backend_for(kind)?;

        let address = backend.connect().await?;
        let chain_address = backend.chain_address().await?;
        let session = Session {
            wallet_kind: kind,
            address,
            chain_address,
            connected: true,
        };

        self.teardown().await;
        *self.active.write().await = Some(ActiveWallet {
            backend,
            session: session.clone(),
        });
        self.store.remember_wallet(kind);
        tracing::info!("Session opened with {} ({})", kind, session.chain_address);

        self.load_staking_overview().await?;
        Ok(session)
    }

    /// Reconnect the remembered wallet, if any.
    pub async fn reconnect(&self) -> Result<Option<Session>, StakingError> {
        match self.store.remembered_wallet() {
            Some(kind) => {
                tracing::info!("Reconnecting {}", kind);
                self.connect(kind).await.map(Some)
            }
            None => Ok(None),
        }
    }

    async fn teardown(&self) {
        let previous = self.active.write().await.take();
        if let Some(previous) = previous {
            previous.backend.disconnect().await;
        }
        // loads still in flight belong to the closed session
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.overview.write().await = OverviewSlot {
            generation,
            snapshot: None,
        };
    }

    /// Close the session and forget the remembered wallet.
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.store.forget_wallet();
        tracing::info!("Session closed");
    }

    /// Rebuild the overview from the chain and replace the cached one,
    /// unless a load that started later has already stored its result.
    pub async fn load_staking_overview(&self) -> Result<Arc<StakingOverview>, StakingError> {
        let backend = self.backend().await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let policy = self.config.read_policy;

        let overview = if backend.kind().is_evm() {
            aggregate(backend.as_ref(), policy).await?
        } else {
            match backend.overview(policy).await? {
                Some(overview) => overview,
                None => aggregate(backend.as_ref(), policy).await?,
            }
        };

        let overview = Arc::new(overview);
        let mut slot = self.overview.write().await;
        if generation < slot.generation {
            tracing::debug!(
                "Discarding overview from load {} (cached {})",
                generation,
                slot.generation
            );
            return Ok(overview);
        }
        *slot = OverviewSlot {
            generation,
            snapshot: Some(overview.clone()),
        };
        drop(slot);
        tracing::debug!(
            "Overview: {} delegated, {} rewards, {} unbonding",
            overview.total_delegated,
            overview.total_rewards,
            overview.total_unbonding
        );
        Ok(overview)
    }

    /// Refresh after a dispatched mutation and pass its result through.
    ///
    /// Successes and failures that reached the chain (reverted, unconfirmed,
    /// partially applied) refresh; failures refused before submission do
    /// not. A failed refresh is logged rather than returned.
    async fn finish<T>(
        &self,
        operation: &str,
        result: Result<T, WalletError>,
    ) -> Result<T, StakingError> {
        let refresh = match &result {
            Ok(_) => true,
            Err(e) => e.reached_chain(),
        };
        if refresh {
            if let Err(e) = self.load_staking_overview().await {
                tracing::warn!("Overview refresh after {} failed: {}", operation, e);
            }
        }
        result.map_err(StakingError::from)
    }

    fn positive_amount(human: &str) -> Result<u128, StakingError> {
        match to_minimal_units(human)? {
            0 => Err(UnitError::InvalidAmount(human.to_string()).into()),
            amount => Ok(amount),
        }
    }

    fn memo<'a>(&'a self, memo: &'a str) -> &'a str {
        self.config.memo_or_default(memo)
    }

    /// Delegate `human` tokens to the configured validator.
    pub async fn delegate(&self, human: &str, memo: &str) -> Result<TxReceipt, StakingError> {
        let amount = Self::positive_amount(human)?;
        let minimum = to_minimal_units(&self.config.validator.min_delegation)?;
        if amount < minimum {
            return Err(StakingError::BelowMinimum {
                amount: human.to_string(),
                minimum: self.config.validator.min_delegation.clone(),
            });
        }

        let _busy = self.begin()?;
        let backend = self.backend().await?;
        let result = backend
            .delegate(&self.config.validator.operator_address, amount, self.memo(memo))
            .await;
        self.finish("delegate", result).await
    }

    /// Undelegate `human` tokens from the configured validator.
    pub async fn undelegate(&self, human: &str, memo: &str) -> Result<TxReceipt, StakingError> {
        let amount = Self::positive_amount(human)?;

        let _busy = self.begin()?;
        let backend = self.backend().await?;
        let result = backend
            .undelegate(&self.config.validator.operator_address, amount, self.memo(memo))
            .await;
        self.finish("undelegate", result).await
    }

    pub async fn redelegate(
        &self,
        src_validator: &str,
        dst_validator: &str,
        human: &str,
        memo: &str,
    ) -> Result<TxReceipt, StakingError> {
        let backend = self.backend().await?;
        if !backend.capabilities().redelegate {
            return Err(StakingError::UnsupportedByBackend {
                operation: "redelegate",
                kind: backend.kind(),
            });
        }
        let amount = Self::positive_amount(human)?;

        let _busy = self.begin()?;
        let result = backend
            .redelegate(src_validator, dst_validator, amount, self.memo(memo))
            .await;
        self.finish("redelegate", result).await
    }

    /// Withdraw rewards; `None` claims from the configured validator.
    pub async fn claim_rewards(
        &self,
        memo: &str,
        validators: Option<Vec<String>>,
    ) -> Result<Vec<TxReceipt>, StakingError> {
        let validators =
            validators.unwrap_or_else(|| vec![self.config.validator.operator_address.clone()]);

        let _busy = self.begin()?;
        let backend = self.backend().await?;
        let result = backend.claim_rewards(&validators, self.memo(memo)).await;
        self.finish("claim", result).await
    }

    pub async fn cancel_unbonding(
        &self,
        validator: &str,
        human: &str,
        creation_height: u64,
        memo: &str,
    ) -> Result<TxReceipt, StakingError> {
        let backend = self.backend().await?;
        if !backend.capabilities().cancel_unbonding {
            return Err(StakingError::UnsupportedByBackend {
                operation: "cancel unbonding",
                kind: backend.kind(),
            });
        }
        let amount = Self::positive_amount(human)?;

        let _busy = self.begin()?;
        let result = backend
            .cancel_unbonding(validator, amount, creation_height, self.memo(memo))
            .await;
        self.finish("cancel unbonding", result).await
    }

    /// React to `accountsChanged` / `chainChanged` from the EVM provider.
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> Result<(), StakingError> {
        let Some(backend) = self.active.read().await.as_ref().map(|a| a.backend.clone()) else {
            tracing::debug!("Ignoring {:?} without a session", event);
            return Ok(());
        };
        if !backend.kind().is_evm() {
            tracing::debug!("Ignoring {:?} for {}", event, backend.kind());
            return Ok(());
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    tracing::info!("Wallet revoked all accounts");
                    self.disconnect().await;
                }
                Some(account) => {
                    let _busy = self.begin()?;
                    let chain_address = backend.set_account(account).await?;
                    if let Some(active) = self.active.write().await.as_mut() {
                        active.session.address = account.to_lowercase();
                        active.session.chain_address = chain_address;
                    }
                    self.load_staking_overview().await?;
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                let expected = self.config.network.evm_chain_id();
                if parse_quantity(&serde_json::Value::String(chain_id.clone())) != Some(expected) {
                    tracing::warn!("Wallet moved to chain {}, closing session", chain_id);
                    self.disconnect().await;
                }
            }
        }
        Ok(())
    }
}

/// Aggregate an overview from the four backend reads.
async fn aggregate(
    backend: &dyn WalletBackend,
    policy: ReadPolicy,
) -> Result<StakingOverview, WalletError> {
    let (balance, delegations, rewards, unbonding) = futures::join!(
        backend.balance(),
        backend.delegations(),
        backend.rewards(),
        backend.unbonding_delegations(),
    );

    Ok(build_overview(
        apply_read_policy(policy, "balance", balance, || "0".to_string())?,
        apply_read_policy(policy, "delegations", delegations, Vec::new)?,
        apply_read_policy(policy, "rewards", rewards, Vec::new)?,
        apply_read_policy(policy, "unbonding", unbonding, Vec::new)?,
    ))
}
