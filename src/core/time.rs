//! Modification clock used to decide whether a node is up to date.
//!
//! Every tick comes from one process-wide monotonically increasing counter,
//! so two timestamps are always comparable regardless of which node they
//! were taken on.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_CLOCK: AtomicU64 = AtomicU64::new(0);

/// Draw a fresh tick. Strictly greater than every tick drawn before it.
pub fn next_tick() -> u64 {
    GLOBAL_CLOCK.fetch_add(1, Ordering::SeqCst) + 1
}

/// Modification time carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModifiedTime(u64);

impl ModifiedTime {
    /// A fresh modification time.
    pub fn new() -> Self {
        Self(next_tick())
    }

    /// Mark as modified now.
    pub fn modified(&mut self) {
        self.0 = next_tick();
    }

    /// Raw tick value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for ModifiedTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_are_strictly_increasing() {
        let a = next_tick();
        let b = next_tick();
        assert!(b > a);
    }

    #[test]
    fn test_modified_advances() {
        let mut time = ModifiedTime::new();
        let before = time.get();
        time.modified();
        assert!(time.get() > before);
    }
}
