//! Read-only access to a token contract through a node
//!
//! [`ChainReader`] is the seam between feature extraction and the network;
//! [`RpcChainReader`] implements it over an ethers HTTP provider.

use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::{Abi, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, NameOrAddress, U256};
use once_cell::sync::Lazy;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, RugDetectorError};

/// Minimal ERC20 ABI
pub static ERC20_ABI: Lazy<Abi> = Lazy::new(|| {
    serde_json::from_value(json!([
        {
            "constant": true,
            "inputs": [],
            "name": "name",
            "outputs": [{"name": "", "type": "string"}],
            "type": "function"
        },
        {
            "constant": true,
            "inputs": [],
            "name": "totalSupply",
            "outputs": [{"name": "", "type": "uint256"}],
            "type": "function"
        },
        {
            "constant": true,
            "inputs": [{"name": "_owner", "type": "address"}],
            "name": "balanceOf",
            "outputs": [{"name": "balance", "type": "uint256"}],
            "type": "function"
        },
        {
            "constant": true,
            "inputs": [],
            "name": "decimals",
            "outputs": [{"name": "", "type": "uint8"}],
            "type": "function"
        },
        {
            "constant": true,
            "inputs": [],
            "name": "owner",
            "outputs": [{"name": "", "type": "address"}],
            "type": "function"
        }
    ]))
    .expect("Valid ERC20 ABI")
});

/// Node queries used by the feature extractor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Latest block number
    async fn block_number(&self) -> Result<u64>;

    /// Deployed bytecode at `address`; empty for externally owned accounts
    async fn code_at(&self, address: Address) -> Result<Bytes>;

    /// ERC20 `totalSupply()` in base units
    async fn total_supply(&self, token: Address) -> Result<U256>;

    /// ERC20 `decimals()`
    async fn decimals(&self, token: Address) -> Result<u8>;
}

/// Encode a call to an ERC20 function
pub fn encode_erc20_call(function_name: &str, params: &[Token]) -> Result<Bytes> {
    let function = ERC20_ABI.function(function_name).map_err(|e| {
        RugDetectorError::contract_call(function_name, e.to_string().as_str())
    })?;

    let encoded = function.encode_input(params).map_err(|e| {
        RugDetectorError::contract_call(
            function_name,
            format!("failed to encode call: {}", e).as_str(),
        )
    })?;

    Ok(Bytes::from(encoded))
}

/// Decode the return data of an ERC20 function
pub fn decode_erc20_output(function_name: &str, output: &[u8]) -> Result<Vec<Token>> {
    let function = ERC20_ABI.function(function_name).map_err(|e| {
        RugDetectorError::contract_call(function_name, e.to_string().as_str())
    })?;

    function.decode_output(output).map_err(|e| {
        RugDetectorError::contract_call(
            function_name,
            format!("failed to decode output: {}", e).as_str(),
        )
    })
}

fn single_uint(function_name: &str, tokens: Vec<Token>) -> Result<U256> {
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| {
            RugDetectorError::contract_call(function_name, "expected a uint return value")
        })
}

/// [`ChainReader`] over a JSON-RPC HTTP endpoint
pub struct RpcChainReader {
    provider: Provider<Http>,
    endpoint: String,
}

impl RpcChainReader {
    /// Build the provider and confirm the node answers
    ///
    /// A malformed URL is a configuration error; a node that does not answer
    /// `eth_blockNumber` is a connectivity error.
    pub async fn connect(endpoint: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            RugDetectorError::config_message(format!("invalid RPC URL {}: {}", endpoint, e))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RugDetectorError::connectivity(
                    endpoint,
                    format!("failed to create HTTP client: {}", e).as_str(),
                )
            })?;

        let provider = Provider::<Http>::new(Http::new_with_client(url, http_client));

        let block = provider
            .get_block_number()
            .await
            .map_err(|e| RugDetectorError::connectivity(endpoint, e.to_string().as_str()))?;

        info!(endpoint, block = block.as_u64(), "Connected to RPC endpoint");

        Ok(Self {
            provider,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call_erc20(&self, token: Address, function_name: &str) -> Result<Vec<Token>> {
        let calldata = encode_erc20_call(function_name, &[])?;

        let mut tx = TypedTransaction::default();
        tx.set_to(NameOrAddress::Address(token));
        tx.set_data(calldata);

        let output = self.provider.call(&tx, None).await?;
        debug!(token = %token, function = function_name, bytes = output.len(), "eth_call");

        decode_erc20_output(function_name, &output)
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        Ok(self.provider.get_code(address, None).await?)
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        let tokens = self.call_erc20(token, "totalSupply").await?;
        single_uint("totalSupply", tokens)
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        let tokens = self.call_erc20(token, "decimals").await?;
        let value = single_uint("decimals", tokens)?;
        if value > U256::from(u8::MAX) {
            return Err(RugDetectorError::contract_call(
                "decimals",
                format!("value {} does not fit in uint8", value).as_str(),
            ));
        }
        Ok(value.low_u32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::AbiEncode;

    #[test]
    fn test_abi_has_erc20_functions() {
        for name in ["name", "totalSupply", "balanceOf", "decimals", "owner"] {
            assert!(ERC20_ABI.function(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn test_total_supply_selector() {
        let calldata = encode_erc20_call("totalSupply", &[]).unwrap();
        assert_eq!(hex::encode(&calldata), "18160ddd");
    }

    #[test]
    fn test_decode_uint_output() {
        let raw = U256::from(1_000_000u64).encode();
        let tokens = decode_erc20_output("totalSupply", &raw).unwrap();
        assert_eq!(single_uint("totalSupply", tokens).unwrap(), U256::from(1_000_000u64));
    }

    #[test]
    fn test_decode_garbage_is_contract_call_error() {
        let err = decode_erc20_output("decimals", &[0x01, 0x02]).unwrap_err();
        assert_eq!(err.category(), "feature_query");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let err = RpcChainReader::connect("not a url", Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert_eq!(err.category(), "configuration");
    }

    #[tokio::test]
    async fn test_connect_reports_unreachable_endpoint() {
        let err = RpcChainReader::connect("http://127.0.0.1:1", Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert_eq!(err.category(), "connectivity");
    }
}
