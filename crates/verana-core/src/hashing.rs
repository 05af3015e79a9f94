//! Commitment over the store: one BLAKE3 digest per module namespace,
//! combined into a binary Merkle root ordered by namespace name.

use crate::error::CoreError;
use crate::store::KvStore;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute the Merkle root of a list of hashes.
/// Returns a zero hash for empty input; an odd node is paired with itself.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for chunk in level.chunks(2) {
            let right = chunk.get(1).unwrap_or(&chunk[0]);
            let mut combined = Vec::with_capacity(64);
            combined.extend_from_slice(&chunk[0]);
            combined.extend_from_slice(right);
            next.push(hash(&combined));
        }
        level = next;
    }
    level[0]
}

/// Digest of one namespace's ordered key/value pairs.
pub fn namespace_hash(store: &dyn KvStore, namespace: &str) -> Result<Hash, CoreError> {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in store.scan_prefix(namespace, &[])? {
        hasher.update(&(key.len() as u64).to_be_bytes());
        hasher.update(&key);
        hasher.update(&(value.len() as u64).to_be_bytes());
        hasher.update(&value);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Application hash over every namespace.
pub fn commit_hash(store: &dyn KvStore) -> Result<Hash, CoreError> {
    let mut leaves = Vec::new();
    for namespace in store.namespaces()? {
        let mut leaf = Vec::with_capacity(namespace.len() + 32);
        leaf.extend_from_slice(namespace.as_bytes());
        leaf.extend_from_slice(&namespace_hash(store, &namespace)?);
        leaves.push(hash(&leaf));
    }
    Ok(merkle_root(&leaves))
}
