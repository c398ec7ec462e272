//! Client-side gid assignment for new downloads.

use crate::command::error::{CommandError, CommandResult};

/// Largest batch whose items can get distinct gids from one timestamp.
pub const MAX_BATCH_ITEMS: usize = 256;

const TIMESTAMP_DIGITS: usize = 14;

/// Gid for item `index` of a batch created at `timestamp_ms`: the low 14
/// hex digits of the timestamp, left-padded with `f`, then two hex digits of
/// the index.
pub fn synthesize_gid(timestamp_ms: u64, index: u8) -> String {
    let hex = format!("{timestamp_ms:x}");
    let digits = &hex[hex.len().saturating_sub(TIMESTAMP_DIGITS)..];
    let padding = "f".repeat(TIMESTAMP_DIGITS - digits.len());
    format!("{padding}{digits}{index:02x}")
}

/// One gid per item for a batch of `count` items sharing `timestamp_ms`.
pub fn synthesize_gids(timestamp_ms: u64, count: usize) -> CommandResult<Vec<String>> {
    if count > MAX_BATCH_ITEMS {
        return Err(CommandError::TooManyItems {
            count,
            max: MAX_BATCH_ITEMS,
        });
    }
    Ok((0..count)
        .map(|index| synthesize_gid(timestamp_ms, index as u8))
        .collect())
}
