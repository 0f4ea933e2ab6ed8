//! BitStore trait definition.

use async_trait::async_trait;

use super::{Result, StorageError};

/// Widest range `get_bit_range` can extract as an unsigned value.
pub const MAX_RANGE_WIDTH: u32 = 63;

/// Interface for key-addressed bit strings.
///
/// Bit offset 0 is the most significant bit of the first byte, the order
/// Redis uses for SETBIT and BITFIELD. A range read therefore returns the
/// bit at `offset` as the most significant bit of the extracted value.
///
/// A missing key reads as all zeros. Keys grow implicitly on write.
///
/// # Implementations
///
/// - `RedisBitStore`: Redis strings (SETBIT / GETBIT / BITFIELD)
/// - `MemoryBitStore`: in-process byte vectors, with failure injection
#[async_trait]
pub trait BitStore: Send + Sync {
    /// Atomically set a bit to 1 and return its previous value.
    ///
    /// The previous value is trustworthy under concurrent callers racing on
    /// the same key and offset: exactly one of them observes `false`.
    async fn set_bit(&self, key: &str, offset: u32) -> Result<bool>;

    /// Set a bit back to 0. Only used to compensate a `set_bit` made by the
    /// same request.
    async fn clear_bit(&self, key: &str, offset: u32) -> Result<()>;

    /// Read a single bit.
    async fn get_bit(&self, key: &str, offset: u32) -> Result<bool>;

    /// Atomically read `width` contiguous bits starting at `offset`.
    async fn get_bit_range(&self, key: &str, width: u32, offset: u32) -> Result<u64>;
}

/// Reject range widths that cannot be returned as an unsigned value.
pub fn validate_width(width: u32) -> Result<()> {
    if width == 0 || width > MAX_RANGE_WIDTH {
        return Err(StorageError::InvalidBitRange {
            width,
            max: MAX_RANGE_WIDTH,
        });
    }
    Ok(())
}
