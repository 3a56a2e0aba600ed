//! Commit-reveal draw math.
//!
//! The operator commits to `sha256(secret)` at close time, before the entropy
//! block exists; entrants are frozen into the snapshot hash at the same
//! moment. Once the entropy block is mined, `sha256(block_hash ‖ secret ‖
//! snapshot_hash)` is unpredictable to everyone in advance and reproducible
//! by anyone afterwards from the published values.

use alloy_primitives::{B256, U256};
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Published at close time: the hash of the secret, not the secret itself
pub fn salt_commit(secret: &str) -> String {
    sha256_hex(secret.as_bytes())
}

pub fn commit_matches(secret: &str, commit: &str) -> bool {
    salt_commit(secret) == commit
}

/// Entropy digest over the end-block hash, the revealed secret, and the
/// snapshot hash, in that order
pub fn derive_entropy(
    block_hash: &B256,
    secret: &str,
    snapshot_hash: &str,
) -> Result<String, hex::FromHexError> {
    let snapshot = hex::decode(snapshot_hash)?;
    let mut hasher = Sha256::new();
    hasher.update(block_hash.as_slice());
    hasher.update(secret.as_bytes());
    hasher.update(&snapshot);
    Ok(hex::encode(hasher.finalize()))
}

/// Index into the flat entry list: the entropy digest taken as an unsigned
/// big-endian integer, modulo the entry count
pub fn winner_index(entropy: &str, total_entries: usize) -> Result<usize, hex::FromHexError> {
    let bytes = hex::decode(entropy)?;
    let value = U256::from_be_slice(&bytes);
    let rem = value % U256::from(total_entries as u64);
    Ok(rem.to::<u64>() as usize)
}
