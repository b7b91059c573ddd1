//! In-memory chain, extension and provider doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use qube_core::{Delegation, Network, RewardEntry, UnbondingEntry};
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::client::NodeInfo;
use crate::error::{ChainError, WalletError};
use crate::queries::ChainQuery;
use crate::wallet::msgs::Fee;
use crate::wallet::{BroadcastResult, CosmosExtension, Eip1193Provider, ProviderError};

pub const ACCOUNT: &str = "qubetics13wslzz24r02r9qpszfj94sfkmhtymwnjf5zvr5";
pub const EVM_ACCOUNT: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
pub const EVM_ACCOUNT_BECH32: &str = ACCOUNT;

#[derive(Default)]
pub struct MockChain {
    pub delegations: Mutex<Vec<Delegation>>,
    pub node_info_calls: AtomicUsize,
    pub delegation_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub queried: Mutex<Vec<String>>,
    /// (entered, release) for the next `delegations` call.
    hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    fail_reads: AtomicBool,
    fail_node_info: AtomicBool,
}

impl MockChain {
    pub fn with_delegations(amounts: &[&str]) -> Self {
        let chain = Self::default();
        chain.set_delegations(amounts);
        chain
    }

    pub fn set_delegations(&self, amounts: &[&str]) {
        *self.delegations.lock().unwrap() = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Delegation {
                validator_address: format!("qubeticsvaloper{i}"),
                amount: a.to_string(),
            })
            .collect();
    }

    /// Park the next `delegations` call after it has read its data.
    /// `entered` fires once it is parked; it returns after `release`.
    pub fn hold_next_delegations(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_node_info(&self, fail: bool) {
        self.fail_node_info.store(fail, Ordering::SeqCst);
    }

    pub fn delegation_calls(&self) -> usize {
        self.delegation_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    fn read(&self, address: &str) -> Result<(), ChainError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(address.to_string());
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(ChainError::Connection("mock read failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn node_info(&self) -> Result<NodeInfo, ChainError> {
        self.node_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_node_info.load(Ordering::SeqCst) {
            return Err(ChainError::Connection("mock node unreachable".into()));
        }
        Ok(NodeInfo {
            network: Network::Mainnet.chain_id().to_string(),
            moniker: "mock".into(),
            version: "v0".into(),
        })
    }

    async fn balance(&self, address: &str) -> Result<String, ChainError> {
        self.read(address)?;
        Ok("1000".into())
    }

    async fn delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError> {
        self.delegation_calls.fetch_add(1, Ordering::SeqCst);
        self.read(address)?;
        let delegations = self.delegations.lock().unwrap().clone();
        let hold = self.hold.lock().unwrap().take();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }
        Ok(delegations)
    }

    async fn rewards(&self, address: &str) -> Result<Vec<RewardEntry>, ChainError> {
        self.read(address)?;
        Ok(Vec::new())
    }

    async fn unbonding_delegations(
        &self,
        address: &str,
    ) -> Result<Vec<UnbondingEntry>, ChainError> {
        self.read(address)?;
        Ok(Vec::new())
    }
}

type Broadcast = (Vec<Value>, Fee, String);

pub struct MockExtension {
    pub account: String,
    pub broadcast_code: u32,
    /// 0 means the node refused the transaction before inclusion.
    pub broadcast_height: u64,
    pub enabled: Mutex<Vec<String>>,
    pub broadcasts: Mutex<Vec<Broadcast>>,
}

impl Default for MockExtension {
    fn default() -> Self {
        Self {
            account: ACCOUNT.to_string(),
            broadcast_code: 0,
            broadcast_height: 100,
            enabled: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }
}

impl MockExtension {
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl CosmosExtension for MockExtension {
    async fn suggest_chain(&self, _network: Network) -> Result<(), WalletError> {
        Ok(())
    }

    async fn enable(&self, chain_id: &str) -> Result<(), WalletError> {
        self.enabled.lock().unwrap().push(chain_id.to_string());
        Ok(())
    }

    async fn accounts(&self, _chain_id: &str) -> Result<Vec<String>, WalletError> {
        Ok(vec![self.account.clone()])
    }

    async fn sign_and_broadcast(
        &self,
        _chain_id: &str,
        _signer: &str,
        msgs: Vec<Value>,
        fee: Fee,
        memo: &str,
    ) -> Result<BroadcastResult, WalletError> {
        self.broadcasts
            .lock()
            .unwrap()
            .push((msgs, fee, memo.to_string()));
        Ok(BroadcastResult {
            code: self.broadcast_code,
            tx_hash: "ABC123".into(),
            height: self.broadcast_height,
            gas_used: 90_000,
            raw_log: String::new(),
        })
    }
}

pub struct MockProvider {
    pub accounts: Vec<String>,
    pub chain_id: Mutex<String>,
    pub accounts_error: Option<ProviderError>,
    pub switch_error: Option<ProviderError>,
    pub add_error: Option<ProviderError>,
    pub send_error: Option<ProviderError>,
    pub receipt_error: Option<ProviderError>,
    pub receipts: Mutex<VecDeque<Value>>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockProvider {
    pub fn on_chain(chain_id: &str) -> Self {
        Self {
            accounts: vec![EVM_ACCOUNT.to_string()],
            chain_id: Mutex::new(chain_id.to_string()),
            accounts_error: None,
            switch_error: None,
            add_error: None,
            send_error: None,
            receipt_error: None,
            receipts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_receipt(&self, receipt: Value) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn called(&self, method: &str) -> bool {
        self.count(method) > 0
    }

    /// Params of the first call to `method`.
    pub fn params_of(&self, method: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }

    fn switch_to(&self, params: &Value) {
        if let Some(id) = params[0]["chainId"].as_str() {
            *self.chain_id.lock().unwrap() = id.to_string();
        }
    }
}

#[async_trait]
impl Eip1193Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        match method {
            "eth_requestAccounts" => match &self.accounts_error {
                Some(e) => Err(e.clone()),
                None => Ok(json!(self.accounts)),
            },
            "eth_chainId" => Ok(json!(self.chain_id.lock().unwrap().clone())),
            "wallet_switchEthereumChain" => match &self.switch_error {
                Some(e) => Err(e.clone()),
                None => {
                    self.switch_to(&params);
                    Ok(Value::Null)
                }
            },
            "wallet_addEthereumChain" => match &self.add_error {
                Some(e) => Err(e.clone()),
                None => {
                    self.switch_to(&params);
                    Ok(Value::Null)
                }
            },
            "eth_sendTransaction" => match &self.send_error {
                Some(e) => Err(e.clone()),
                None => Ok(json!("0xfeed")),
            },
            "eth_getTransactionReceipt" => match &self.receipt_error {
                Some(e) => Err(e.clone()),
                None => Ok(self
                    .receipts
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(Value::Null)),
            },
            _ => Err(ProviderError::new(-32601, format!("{method} not found"))),
        }
    }
}
