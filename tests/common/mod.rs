#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, B256, U256};
use fairdraw::rpc::{BlockInfo, ChainRpc, RpcError, TransferLog};
use fairdraw::state::one_token;
use fairdraw::watcher::AlertSink;
use fairdraw::{Config, Engine, EnvSecret, MemStore};

pub const TOKEN: Address = address!("1000000000000000000000000000000000000001");
pub const COLLECTION: Address = address!("2000000000000000000000000000000000000002");
pub const POOL: Address = address!("3000000000000000000000000000000000000003");
pub const ALICE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const BOB: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

pub const SECRET: &str = "s3cr3t";

#[derive(Default)]
struct MockInner {
    head: u64,
    blocks: HashMap<u64, B256>,
    logs: Vec<TransferLog>,
    log_calls: Vec<(u64, u64)>,
    fail_logs: u32,
}

/// Scriptable chain: a settable head, block hashes, and a flat log list
/// filtered per query the way a real node would
#[derive(Clone, Default)]
pub struct MockRpc {
    inner: Arc<Mutex<MockInner>>,
}

impl MockRpc {
    pub fn new(head: u64) -> Self {
        let rpc = MockRpc::default();
        rpc.set_head(head);
        rpc
    }

    pub fn set_head(&self, head: u64) {
        self.inner.lock().unwrap().head = head;
    }

    pub fn set_block_hash(&self, number: u64, hash: B256) {
        self.inner.lock().unwrap().blocks.insert(number, hash);
    }

    pub fn push_transfer(&self, from: Address, to: Address, value: U256, block: u64, nonce: u64) {
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&nonce.to_be_bytes());
        self.inner.lock().unwrap().logs.push(TransferLog {
            from,
            to,
            value,
            tx_hash: B256::from(hash),
            block_number: block,
        });
    }

    /// Ranges `transfer_logs` was queried with, in call order
    pub fn log_calls(&self) -> Vec<(u64, u64)> {
        self.inner.lock().unwrap().log_calls.clone()
    }

    /// Make the next `n` log queries fail with a retriable error
    pub fn fail_next_logs(&self, n: u32) {
        self.inner.lock().unwrap().fail_logs = n;
    }
}

impl ChainRpc for MockRpc {
    async fn block_number(&self) -> Result<u64, RpcError> {
        Ok(self.inner.lock().unwrap().head)
    }

    async fn get_block(&self, number: u64) -> Result<Option<BlockInfo>, RpcError> {
        let inner = self.inner.lock().unwrap();
        if number > inner.head {
            return Ok(None);
        }
        Ok(Some(BlockInfo {
            number,
            hash: inner.blocks.get(&number).copied(),
        }))
    }

    async fn transfer_logs(
        &self,
        _token: Address,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, RpcError> {
        let mut inner = self.inner.lock().unwrap();
        inner.log_calls.push((from_block, to_block));
        if inner.fail_logs > 0 {
            inner.fail_logs -= 1;
            return Err(RpcError::Status(503));
        }
        Ok(inner
            .logs
            .iter()
            .filter(|l| l.block_number >= from_block && l.block_number <= to_block)
            .filter(|l| to.map_or(true, |to| l.to == to))
            .cloned()
            .collect())
    }
}

/// Sink that records every rendered alert
#[derive(Clone, Default)]
pub struct VecSink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl VecSink {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl AlertSink for VecSink {
    async fn send(&self, text: &str) {
        self.sent.lock().unwrap().push(text.to_string());
    }
}

pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * one_token()
}

pub fn test_config() -> Config {
    Config {
        token: TOKEN,
        collection: COLLECTION,
        pool: Some(POOL),
        ticket_price: tokens(100_000),
        confirmations: 2,
        jackpot_percent: 10,
        jackpot_min_pot: tokens(1),
        alert_min: tokens(50_000),
        operators: vec!["op".to_string()],
        backoff: Duration::from_millis(1),
        ..Config::default()
    }
}

pub fn test_engine(rpc: MockRpc) -> Engine<MockRpc, MemStore, EnvSecret> {
    engine_with(test_config(), rpc, MemStore::new(), EnvSecret::fixed(SECRET))
}

pub fn engine_with(
    cfg: Config,
    rpc: MockRpc,
    store: MemStore,
    secret: EnvSecret,
) -> Engine<MockRpc, MemStore, EnvSecret> {
    Engine::new(cfg, rpc, store, secret).unwrap()
}

pub fn addr_key(addr: &Address) -> String {
    fairdraw::state::addr_key(addr)
}
