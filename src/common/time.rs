//! Time utilities for timestamp operations.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in nanoseconds.
///
/// Truncated to u64; fits zero-padded into 20 decimal digits, which is what
/// the mailbox store relies on for filename ordering.
#[inline]
pub fn now_ts_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
