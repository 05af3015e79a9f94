//! Typed views over a module namespace.
//!
//! A module declares its collections as constants, each with a one-byte
//! prefix, and reads and writes prost-encoded values through them.

use prost::Message;
use std::marker::PhantomData;

use crate::context::Context;
use crate::error::CoreError;

/// Encoding of a collection key.
///
/// Numeric keys are big-endian so that byte order equals numeric order.
pub trait StoreKey {
    fn store_key(&self) -> Vec<u8>;
}

impl StoreKey for u64 {
    fn store_key(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl StoreKey for str {
    fn store_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl StoreKey for String {
    fn store_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Composite key. The first component is length-prefixed so that a scan
/// over one first component never matches a longer one.
impl<A: StoreKey, B: StoreKey> StoreKey for (A, B) {
    fn store_key(&self) -> Vec<u8> {
        let mut out = first_component(&self.0);
        out.extend_from_slice(&self.1.store_key());
        out
    }
}

fn first_component<A: StoreKey + ?Sized>(key: &A) -> Vec<u8> {
    let encoded = key.store_key();
    let mut out = Vec::with_capacity(encoded.len() + 2);
    out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
    out.extend_from_slice(&encoded);
    out
}

/// A keyed collection of prost messages within one namespace.
pub struct Collection<K: ?Sized, V> {
    namespace: &'static str,
    prefix: u8,
    _marker: PhantomData<fn(&K) -> V>,
}

impl<K: StoreKey + ?Sized, V: Message + Default> Collection<K, V> {
    pub const fn new(namespace: &'static str, prefix: u8) -> Self {
        Self {
            namespace,
            prefix,
            _marker: PhantomData,
        }
    }

    fn full_key(&self, key: &K) -> Vec<u8> {
        let mut out = vec![self.prefix];
        out.extend_from_slice(&key.store_key());
        out
    }

    /// Load the value under `key`.
    pub fn get(&self, ctx: &Context<'_>, key: &K) -> Result<Option<V>, CoreError> {
        match ctx.get(self.namespace, &self.full_key(key))? {
            Some(bytes) => Ok(Some(V::decode(bytes.as_slice())?)),
            None => Ok(None),
        }
    }

    /// Whether `key` is present.
    pub fn has(&self, ctx: &Context<'_>, key: &K) -> Result<bool, CoreError> {
        Ok(ctx.get(self.namespace, &self.full_key(key))?.is_some())
    }

    /// Store `value` under `key`.
    pub fn set(&self, ctx: &mut Context<'_>, key: &K, value: &V) {
        ctx.set(self.namespace, self.full_key(key), value.encode_to_vec());
    }

    /// Delete `key`.
    pub fn remove(&self, ctx: &mut Context<'_>, key: &K) {
        ctx.delete(self.namespace, self.full_key(key));
    }

    /// All values in ascending key order.
    pub fn values(&self, ctx: &Context<'_>) -> Result<Vec<V>, CoreError> {
        ctx.scan_prefix(self.namespace, &[self.prefix])?
            .into_iter()
            .map(|(_, bytes)| V::decode(bytes.as_slice()).map_err(CoreError::from))
            .collect()
    }
}

impl<A: StoreKey, B: StoreKey, V: Message + Default> Collection<(A, B), V> {
    /// Values whose key starts with `first`, in ascending order of the
    /// second component.
    pub fn prefixed_values(&self, ctx: &Context<'_>, first: &A) -> Result<Vec<V>, CoreError> {
        let mut prefix = vec![self.prefix];
        prefix.extend_from_slice(&first_component(first));
        ctx.scan_prefix(self.namespace, &prefix)?
            .into_iter()
            .map(|(_, bytes)| V::decode(bytes.as_slice()).map_err(CoreError::from))
            .collect()
    }
}

/// A single value stored at a fixed key (module parameters).
pub struct Item<V> {
    namespace: &'static str,
    prefix: u8,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Message + Default> Item<V> {
    pub const fn new(namespace: &'static str, prefix: u8) -> Self {
        Self {
            namespace,
            prefix,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, ctx: &Context<'_>) -> Result<Option<V>, CoreError> {
        match ctx.get(self.namespace, &[self.prefix])? {
            Some(bytes) => Ok(Some(V::decode(bytes.as_slice())?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, ctx: &mut Context<'_>, value: &V) {
        ctx.set(self.namespace, vec![self.prefix], value.encode_to_vec());
    }
}

/// Monotonic id counter. The first id handed out is 1.
pub struct Sequence {
    namespace: &'static str,
    prefix: u8,
}

impl Sequence {
    pub const fn new(namespace: &'static str, prefix: u8) -> Self {
        Self { namespace, prefix }
    }

    /// The id the next call to [`Sequence::next`] will return.
    pub fn peek(&self, ctx: &Context<'_>) -> Result<u64, CoreError> {
        match ctx.get(self.namespace, &[self.prefix])? {
            Some(bytes) => Ok(u64::decode(bytes.as_slice())?),
            None => Ok(1),
        }
    }

    /// Allocate an id.
    pub fn next(&self, ctx: &mut Context<'_>) -> Result<u64, CoreError> {
        let id = self.peek(ctx)?;
        let following = id
            .checked_add(1)
            .ok_or_else(|| CoreError::Overflow(format!("{} sequence", self.namespace)))?;
        self.set(ctx, following);
        Ok(id)
    }

    /// Force the next id (genesis import restores max-id + 1).
    pub fn set(&self, ctx: &mut Context<'_>, next: u64) {
        ctx.set(self.namespace, vec![self.prefix], next.encode_to_vec());
    }
}
