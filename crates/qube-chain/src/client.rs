//! Chain client over the Cosmos SDK REST (LCD) API.
//!
//! All staking reads go through REST; writes are submitted by the wallet
//! backends, never by this client.

use crate::config::get_rest_endpoints;
use crate::error::ChainError;
use qube_core::Network;

use serde::Deserialize;
use serde::de::DeserializeOwned;

const NODE_INFO_PATH: &str = "/cosmos/base/tendermint/v1beta1/node_info";

/// REST endpoint configuration.
#[derive(Debug, Clone, Default)]
pub struct RestEndpoints {
    /// Custom REST endpoint, tried instead of the network presets.
    pub rest: Option<String>,
}

/// Node identity reported by `node_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Chain id the node is running.
    pub network: String,
    pub moniker: String,
    /// Node software version.
    pub version: String,
}

/// Chain metadata and validation info.
#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub node: NodeInfo,
    /// Whether the node runs the expected chain.
    pub validated: bool,
    /// Validation message (empty if valid, error message if not).
    pub validation_message: String,
}

#[derive(Deserialize)]
struct NodeInfoResponse {
    default_node_info: DefaultNodeInfo,
    #[serde(default)]
    application_version: Option<ApplicationVersion>,
}

#[derive(Deserialize)]
struct DefaultNodeInfo {
    network: String,
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
struct ApplicationVersion {
    #[serde(default)]
    version: String,
}

impl NodeInfoResponse {
    fn into_node_info(self) -> NodeInfo {
        let version = self
            .application_version
            .map(|v| v.version)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.default_node_info.version);
        NodeInfo {
            network: self.default_node_info.network,
            moniker: self.default_node_info.moniker,
            version,
        }
    }
}

/// Chain client for Qubetics REST endpoints.
#[derive(Debug, Clone)]
pub struct ChainClient {
    network: Network,
    base_url: String,
    http: reqwest::Client,
}

impl ChainClient {
    /// Connect to a network's REST API.
    /// Uses the custom endpoint from `RestEndpoints` if provided, otherwise
    /// tries the network presets in order until one answers `node_info`.
    pub async fn connect(network: Network, endpoints: &RestEndpoints) -> Result<Self, ChainError> {
        let endpoints: Vec<&str> = if let Some(ref endpoint) = endpoints.rest {
            vec![endpoint.as_str()]
        } else {
            get_rest_endpoints(network).to_vec()
        };

        if endpoints.is_empty() {
            return Err(ChainError::Connection(
                "No REST endpoints configured".to_string(),
            ));
        }

        let mut last_error = None;
        for endpoint in endpoints {
            tracing::info!("Trying {} via {}", network, endpoint);

            let client = Self::with_base_url(network, endpoint);
            match client.get_node_info().await {
                Ok(info) => {
                    tracing::info!(
                        "Connected to {} via {} (node {})",
                        info.network,
                        endpoint,
                        info.version
                    );
                    return Ok(client);
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to {}: {}", endpoint, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(ChainError::Connection(
            last_error.unwrap_or_else(|| "All endpoints failed".to_string()),
        ))
    }

    /// Build a client for a known endpoint without checking it.
    pub fn with_base_url(network: Network, base_url: &str) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Get the connected network.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Get the REST base URL in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a REST path and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ChainError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChainError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Get the node identity.
    pub async fn get_node_info(&self) -> Result<NodeInfo, ChainError> {
        let response: NodeInfoResponse = self.get_json(NODE_INFO_PATH, &[]).await?;
        Ok(response.into_node_info())
    }
}

/// Check that `node` runs the chain `network` expects.
pub fn validate_chain(network: Network, node: NodeInfo) -> ChainInfo {
    let validated = node.network == network.chain_id();
    let validation_message = if validated {
        String::new()
    } else {
        format!(
            "Warning: node runs chain '{}', expected '{}' for {}",
            node.network,
            network.chain_id(),
            network
        )
    };

    if !validated {
        tracing::warn!("Chain validation warning: {}", validation_message);
    }

    ChainInfo {
        node,
        validated,
        validation_message,
    }
}
