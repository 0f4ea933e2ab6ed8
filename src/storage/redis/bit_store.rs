//! Redis BitStore implementation.
//!
//! Attendance bitmaps are plain Redis strings. SETBIT is atomic and returns
//! the previous bit, BITFIELD GET extracts a month slice in one round trip.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use tracing::{debug, info};

use crate::interfaces::{validate_width, BitStore, Result};

/// Redis implementation of BitStore.
///
/// Keys are used as given; prefixing is the caller's concern.
pub struct RedisBitStore {
    conn: ConnectionManager,
}

impl RedisBitStore {
    /// Create a new Redis bit store.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    pub async fn new(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis for attendance bitmaps");

        Ok(Self { conn })
    }
}

#[async_trait]
impl BitStore for RedisBitStore {
    async fn set_bit(&self, key: &str, offset: u32) -> Result<bool> {
        let mut conn = self.conn.clone();

        let previous: u8 = redis::cmd("SETBIT")
            .arg(key)
            .arg(offset)
            .arg(1)
            .query_async(&mut conn)
            .await?;

        debug!(key = %key, offset, previous, "setbit");
        Ok(previous == 1)
    }

    async fn clear_bit(&self, key: &str, offset: u32) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: u8 = redis::cmd("SETBIT")
            .arg(key)
            .arg(offset)
            .arg(0)
            .query_async(&mut conn)
            .await?;

        debug!(key = %key, offset, "clearbit");
        Ok(())
    }

    async fn get_bit(&self, key: &str, offset: u32) -> Result<bool> {
        let mut conn = self.conn.clone();

        let value: u8 = redis::cmd("GETBIT")
            .arg(key)
            .arg(offset)
            .query_async(&mut conn)
            .await?;

        Ok(value == 1)
    }

    async fn get_bit_range(&self, key: &str, width: u32, offset: u32) -> Result<u64> {
        validate_width(width)?;
        let mut conn = self.conn.clone();

        // A missing key yields [0], never an empty reply, but treat both alike.
        let values: Vec<i64> = redis::cmd("BITFIELD")
            .arg(key)
            .arg("GET")
            .arg(format!("u{}", width))
            .arg(offset)
            .query_async(&mut conn)
            .await?;

        let value = values.first().copied().unwrap_or(0) as u64;
        debug!(key = %key, width, offset, value, "bitfield get");
        Ok(value)
    }
}
