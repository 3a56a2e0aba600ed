use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};

use crate::error::DrawError;
use crate::state::one_token;

/// Entropy offset floor: the end block must be far enough ahead of the close
/// head that it cannot already be mined (or trivially predicted) at commit
/// time.
pub const MIN_ENTROPY_OFFSET: u64 = 12;

/// Blocks scanned on the very first pass, before any cursor exists
pub const DEFAULT_FIRST_WINDOW: u64 = 4_000;
pub const DEFAULT_CHUNK_SIZE: u64 = 2_000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1_200;

/// Engine configuration, read once at startup
#[derive(Clone, Debug)]
pub struct Config {
    /// RPC endpoints, probed in order at startup
    pub rpc_urls: Vec<String>,
    /// ERC-20 token whose transfers mint tickets
    pub token: Address,
    /// Collection wallet: transfers to this address buy tickets
    pub collection: Address,
    /// Liquidity pool watched for buy/sell alerts; alerts off when unset
    pub pool: Option<Address>,
    /// Base token-units per raffle ticket
    pub ticket_price: U256,
    /// Blocks required on top of an event before it is counted
    pub confirmations: u64,
    /// Blocks between the close head and the entropy block
    pub entropy_offset: u64,
    /// Percent of each qualifying transfer skimmed into the jackpot pot
    pub jackpot_percent: u64,
    /// Minimum pot (base units) before a jackpot round may close
    pub jackpot_min_pot: U256,
    /// Minimum transfer (base units) worth a buy/sell alert
    pub alert_min: U256,
    /// Callers allowed to run mutating commands
    pub operators: Vec<String>,
    pub store_path: PathBuf,
    pub first_window: u64,
    pub chunk_size: u64,
    pub scan_interval: Duration,
    pub watch_interval: Duration,
    pub retries: u32,
    pub backoff: Duration,
    /// Explorer prefix for transaction links in alerts
    pub explorer_tx: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_urls: vec!["https://mainnet.base.org".to_string()],
            token: Address::ZERO,
            collection: Address::ZERO,
            pool: None,
            ticket_price: U256::from(100_000u64) * one_token(),
            confirmations: 2,
            entropy_offset: MIN_ENTROPY_OFFSET,
            jackpot_percent: 10,
            jackpot_min_pot: U256::from(1_000_000u64) * one_token(),
            alert_min: U256::from(50_000u64) * one_token(),
            operators: Vec::new(),
            store_path: PathBuf::from("data.json"),
            first_window: DEFAULT_FIRST_WINDOW,
            chunk_size: DEFAULT_CHUNK_SIZE,
            scan_interval: Duration::from_secs(15),
            watch_interval: Duration::from_secs(20),
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            explorer_tx: "https://base.blockscout.com/tx/".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, DrawError> {
        let mut cfg = Config::default();

        if let Some(raw) = read("RPC_URLS") {
            cfg.rpc_urls = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        cfg.token = required_address("TOKEN_ADDR")?;
        cfg.collection = required_address("COLLECTION_ADDR")?;
        cfg.pool = read("POOL_ADDR").map(|raw| parse_address("POOL_ADDR", &raw)).transpose()?;

        if let Some(raw) = read("TICKET_PRICE") {
            cfg.ticket_price = parse_tokens("TICKET_PRICE", &raw)?;
        }
        if let Some(raw) = read("CONFIRMATIONS") {
            cfg.confirmations = parse_num("CONFIRMATIONS", &raw)?;
        }
        if let Some(raw) = read("ENTROPY_OFFSET_BLOCKS") {
            cfg.entropy_offset = parse_num("ENTROPY_OFFSET_BLOCKS", &raw)?;
        }
        cfg.entropy_offset = cfg.entropy_offset.max(MIN_ENTROPY_OFFSET);

        if let Some(raw) = read("JACKPOT_PERCENT") {
            cfg.jackpot_percent = parse_num::<u64>("JACKPOT_PERCENT", &raw)?.min(100);
        }
        if let Some(raw) = read("JACKPOT_MIN_TICKETS") {
            cfg.jackpot_min_pot = parse_tokens("JACKPOT_MIN_TICKETS", &raw)?;
        }
        if let Some(raw) = read("ALERT_MIN_TOKENS") {
            cfg.alert_min = parse_tokens("ALERT_MIN_TOKENS", &raw)?;
        }
        if let Some(raw) = read("OPERATORS") {
            cfg.operators = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(raw) = read("STORE_PATH") {
            cfg.store_path = PathBuf::from(raw);
        }
        if let Some(raw) = read("SCAN_CHUNK_BLOCKS") {
            cfg.chunk_size = parse_num::<u64>("SCAN_CHUNK_BLOCKS", &raw)?.max(1);
        }
        if let Some(raw) = read("SCAN_INTERVAL_SECS") {
            cfg.scan_interval = Duration::from_secs(parse_num("SCAN_INTERVAL_SECS", &raw)?);
        }
        if let Some(raw) = read("WATCH_INTERVAL_SECS") {
            cfg.watch_interval = Duration::from_secs(parse_num("WATCH_INTERVAL_SECS", &raw)?);
        }
        if let Some(raw) = read("EXPLORER_TX_URL") {
            cfg.explorer_tx = raw;
        }

        Ok(cfg)
    }
}

fn read(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

fn required_address(var: &str) -> Result<Address, DrawError> {
    let raw = read(var).ok_or_else(|| DrawError::Config(format!("{var} is not set")))?;
    parse_address(var, &raw)
}

fn parse_address(var: &str, raw: &str) -> Result<Address, DrawError> {
    Address::from_str(raw.trim())
        .map_err(|e| DrawError::Config(format!("{var}: bad address {raw:?}: {e}")))
}

/// Whole-token env values are scaled to 18-decimal base units
fn parse_tokens(var: &str, raw: &str) -> Result<U256, DrawError> {
    let whole = U256::from_str_radix(raw.trim(), 10)
        .map_err(|e| DrawError::Config(format!("{var}: bad amount {raw:?}: {e}")))?;
    Ok(whole * one_token())
}

fn parse_num<T: FromStr>(var: &str, raw: &str) -> Result<T, DrawError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| DrawError::Config(format!("{var}: bad value {raw:?}: {e}")))
}
