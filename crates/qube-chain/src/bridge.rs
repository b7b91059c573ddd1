//! EIP-1193 provider over plain HTTP JSON-RPC.
//!
//! Used outside a browser: the endpoint must sign `eth_sendTransaction`
//! itself (a node with unlocked accounts or a signing proxy). Wallet-only
//! methods are answered locally: `eth_requestAccounts` returns the configured
//! account and chain switching succeeds only when the endpoint already serves
//! the requested chain.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::wallet::evm::{UNRECOGNIZED_CHAIN, parse_quantity};
use crate::wallet::{Eip1193Provider, ProviderError};

/// JSON-RPC internal error code, used for transport failures.
const INTERNAL_ERROR: i64 = -32603;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct JsonRpcProvider {
    http: reqwest::Client,
    url: String,
    account: String,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    pub fn new(url: &str, account: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            account: account.to_lowercase(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            method,
            params,
        };
        tracing::debug!("RPC {} -> {}", method, self.url);

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::new(INTERNAL_ERROR, format!("Request failed: {e}")))?
            .json()
            .await
            .map_err(|e| ProviderError::new(INTERNAL_ERROR, format!("Invalid JSON response: {e}")))?;

        into_result(response)
    }

    /// Accept a switch only to the chain the endpoint serves.
    async fn switch_chain(&self, params: &Value) -> Result<Value, ProviderError> {
        let requested = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(parse_quantity);
        let served = parse_quantity(&self.call("eth_chainId", json!([])).await?);

        if requested.is_some() && requested == served {
            Ok(Value::Null)
        } else {
            Err(ProviderError::new(
                UNRECOGNIZED_CHAIN,
                format!("endpoint serves chain {served:?}, not {requested:?}"),
            ))
        }
    }
}

fn into_result(response: JsonRpcResponse) -> Result<Value, ProviderError> {
    if let Some(err) = response.error {
        return Err(ProviderError::new(err.code, err.message));
    }
    Ok(response.result.unwrap_or(Value::Null))
}

#[async_trait]
impl Eip1193Provider for JsonRpcProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.account])),
            "wallet_switchEthereumChain" => self.switch_chain(&params).await,
            "wallet_addEthereumChain" => Err(ProviderError::new(
                INTERNAL_ERROR,
                "cannot add a chain to a JSON-RPC endpoint",
            )),
            _ => self.call(method, params).await,
        }
    }
}
