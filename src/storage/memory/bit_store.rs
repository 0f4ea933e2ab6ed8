//! In-memory BitStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::interfaces::{validate_width, BitStore, Result, StorageError};

/// Bit strings held as byte vectors, one per key.
///
/// Every operation runs under the map's write or read lock, which makes
/// `set_bit` a true test-and-set.
#[derive(Default)]
pub struct MemoryBitStore {
    keys: RwLock<HashMap<String, Vec<u8>>>,
    fail_on_set: RwLock<bool>,
    fail_on_clear: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

impl MemoryBitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_set(&self, fail: bool) {
        *self.fail_on_set.write().await = fail;
    }

    pub async fn set_fail_on_clear(&self, fail: bool) {
        *self.fail_on_clear.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Number of set bits under a key. Test helper.
    pub async fn count_ones(&self, key: &str) -> u32 {
        self.keys
            .read()
            .await
            .get(key)
            .map(|bytes| bytes.iter().map(|b| b.count_ones()).sum())
            .unwrap_or(0)
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Injected("bit store read".to_string()));
        }
        Ok(())
    }
}

fn mask(offset: u32) -> (usize, u8) {
    ((offset / 8) as usize, 0x80 >> (offset % 8))
}

fn read_bit(bytes: Option<&Vec<u8>>, offset: u32) -> bool {
    let (index, mask) = mask(offset);
    bytes
        .and_then(|b| b.get(index))
        .map(|byte| byte & mask != 0)
        .unwrap_or(false)
}

#[async_trait]
impl BitStore for MemoryBitStore {
    async fn set_bit(&self, key: &str, offset: u32) -> Result<bool> {
        if *self.fail_on_set.read().await {
            return Err(StorageError::Injected("bit store set".to_string()));
        }
        let (index, mask) = mask(offset);
        let mut keys = self.keys.write().await;
        let bytes = keys.entry(key.to_string()).or_default();
        if bytes.len() <= index {
            bytes.resize(index + 1, 0);
        }
        let previous = bytes[index] & mask != 0;
        bytes[index] |= mask;

        debug!(key = %key, offset, previous, "setbit");
        Ok(previous)
    }

    async fn clear_bit(&self, key: &str, offset: u32) -> Result<()> {
        if *self.fail_on_clear.read().await {
            return Err(StorageError::Injected("bit store clear".to_string()));
        }
        let (index, mask) = mask(offset);
        let mut keys = self.keys.write().await;
        if let Some(byte) = keys.get_mut(key).and_then(|b| b.get_mut(index)) {
            *byte &= !mask;
        }

        debug!(key = %key, offset, "clearbit");
        Ok(())
    }

    async fn get_bit(&self, key: &str, offset: u32) -> Result<bool> {
        self.check_read().await?;
        let keys = self.keys.read().await;
        Ok(read_bit(keys.get(key), offset))
    }

    async fn get_bit_range(&self, key: &str, width: u32, offset: u32) -> Result<u64> {
        validate_width(width)?;
        self.check_read().await?;
        let keys = self.keys.read().await;
        let bytes = keys.get(key);
        Ok((offset..offset + width).fold(0u64, |value, bit| {
            (value << 1) | u64::from(read_bit(bytes, bit))
        }))
    }
}
