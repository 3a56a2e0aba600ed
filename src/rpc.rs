use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(u16),
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Transient failures worth retrying: timeouts, rate limits, 5xx,
    /// flaky backends. Anything else is treated as terminal for the attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::Status(code) => *code == 429 || *code >= 500,
            RpcError::Node { message, .. } => {
                let m = message.to_ascii_lowercase();
                m.contains("timeout")
                    || m.contains("rate")
                    || m.contains("429")
                    || m.contains("server error")
                    || m.contains("no backend")
            }
            RpcError::Malformed(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    /// Absent while the block is still propagating (or was pruned)
    pub hash: Option<B256>,
}

/// One decoded ERC-20 Transfer event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferLog {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub tx_hash: B256,
    pub block_number: u64,
}

/// Read-only view of the chain consumed by the scanner and the draw engine
#[allow(async_fn_in_trait)]
pub trait ChainRpc: Send + Sync {
    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn get_block(&self, number: u64) -> Result<Option<BlockInfo>, RpcError>;

    /// Transfer events of `token` in `[from_block, to_block]` (inclusive),
    /// optionally filtered by recipient
    async fn transfer_logs(
        &self,
        token: Address,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, RpcError>;
}

/// Ethereum JSON-RPC over HTTP
pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RawBlock {
    hash: Option<B256>,
}

#[derive(Deserialize)]
struct RawLog {
    topics: Vec<B256>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "transactionHash")]
    tx_hash: B256,
    #[serde(default)]
    removed: bool,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HttpRpc {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        debug!(method, "rpc call");
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body: RpcResponse<T> = resp.json().await?;
        if let Some(err) = body.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.result)
    }
}

impl ChainRpc for HttpRpc {
    async fn block_number(&self) -> Result<u64, RpcError> {
        let raw: String = self
            .call("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| RpcError::Malformed("eth_blockNumber returned null".into()))?;
        parse_quantity(&raw)
    }

    async fn get_block(&self, number: u64) -> Result<Option<BlockInfo>, RpcError> {
        let raw: Option<RawBlock> = self
            .call("eth_getBlockByNumber", json!([hex_block(number), false]))
            .await?;
        Ok(raw.map(|b| BlockInfo {
            number,
            hash: b.hash,
        }))
    }

    async fn transfer_logs(
        &self,
        token: Address,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, RpcError> {
        let topics = match to {
            Some(to) => json!([TRANSFER_TOPIC, Value::Null, address_topic(&to)]),
            None => json!([TRANSFER_TOPIC]),
        };
        let filter = json!([{
            "address": token,
            "topics": topics,
            "fromBlock": hex_block(from_block),
            "toBlock": hex_block(to_block),
        }]);

        let raw: Vec<RawLog> = self
            .call("eth_getLogs", filter)
            .await?
            .ok_or_else(|| RpcError::Malformed("eth_getLogs returned null".into()))?;

        let mut logs = Vec::with_capacity(raw.len());
        for log in raw {
            if log.removed {
                continue;
            }
            if log.topics.len() < 3 {
                continue; // not an indexed ERC-20 transfer
            }
            logs.push(TransferLog {
                from: Address::from_word(log.topics[1]),
                to: Address::from_word(log.topics[2]),
                value: parse_data_word(&log.data)?,
                tx_hash: log.tx_hash,
                block_number: parse_quantity(&log.block_number)?,
            });
        }
        Ok(logs)
    }
}

fn hex_block(number: u64) -> String {
    format!("0x{number:x}")
}

/// 32-byte topic encoding of an address
fn address_topic(addr: &Address) -> String {
    format!("0x000000000000000000000000{}", hex::encode(addr))
}

fn parse_quantity(raw: &str) -> Result<u64, RpcError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("bad quantity {raw:?}: {e}")))
}

fn parse_data_word(raw: &str) -> Result<U256, RpcError> {
    let digits = raw.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    let bytes =
        hex::decode(digits).map_err(|e| RpcError::Malformed(format!("bad log data: {e}")))?;
    if bytes.len() > 32 {
        return Err(RpcError::Malformed(format!(
            "log data is {} bytes, expected at most 32",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn quantities_parse_from_rpc_hex() {
        assert_eq!(parse_quantity("0x10").unwrap(), 16);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn transfer_value_decodes_from_the_data_word() {
        let word = format!("0x{:064x}", 350_000u64);
        assert_eq!(parse_data_word(&word).unwrap(), U256::from(350_000u64));
        assert_eq!(parse_data_word("0x").unwrap(), U256::ZERO);
    }

    #[test]
    fn address_topics_are_left_padded_to_32_bytes() {
        let addr = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let topic = address_topic(&addr);
        assert_eq!(topic.len(), 2 + 64);
        assert!(topic.ends_with(&hex::encode(addr)));
    }

    #[test]
    fn rate_limit_and_server_errors_are_retriable() {
        assert!(RpcError::Status(429).is_retriable());
        assert!(RpcError::Status(503).is_retriable());
        assert!(!RpcError::Status(400).is_retriable());
        assert!(RpcError::Node {
            code: -32005,
            message: "rate limit exceeded".into()
        }
        .is_retriable());
        assert!(!RpcError::Malformed("x".into()).is_retriable());
    }
}
