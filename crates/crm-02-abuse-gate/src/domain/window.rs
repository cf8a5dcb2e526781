//! Fixed-window arithmetic.
//!
//! Windows are aligned to multiples of their length since the Unix epoch, so
//! every process sharing a counter store agrees on window boundaries without
//! coordination.

use std::net::IpAddr;
use std::time::Duration;

/// A counter slot for one client in one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSlot {
    /// Counter key, unique per (prefix, ip, window index)
    pub key: String,
    /// Time left until the window closes (never zero)
    pub remaining: Duration,
}

/// Compute the counter slot for `ip` at `now_secs`.
pub fn window_slot(prefix: &str, ip: IpAddr, now_secs: i64, window: Duration) -> WindowSlot {
    let length = window.as_secs().max(1) as i64;
    let index = now_secs.div_euclid(length);
    let elapsed = now_secs.rem_euclid(length);
    WindowSlot {
        key: format!("{}:{}:{}", prefix, ip, index),
        remaining: Duration::from_secs((length - elapsed) as u64),
    }
}
