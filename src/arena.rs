//! Memory arena driven by the bus saturation worker
//!
//! On the device the arena sits in external RAM (no-init section) so every fill goes
//! over the shared bus. Here it is a heap region owned by exactly one worker and freed
//! with it. Contents are never reset between passes.

use busprobe_core::{BusprobeError, BusprobeResult};

/// Default arena size: 1 MiB
pub const DEFAULT_ARENA_SIZE: usize = 1024 * 1024;

/// Fixed-size contiguous byte region
pub struct MemoryArena {
    bytes: Box<[u8]>,
}

impl MemoryArena {
    pub fn new(size: usize) -> BusprobeResult<Self> {
        if size == 0 {
            return Err(BusprobeError::InvalidInput(
                "memory arena size must be greater than zero".to_string(),
            ));
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|e| {
            BusprobeError::InvalidInput(format!("cannot allocate {} byte arena: {}", size, e))
        })?;
        bytes.resize(size, 0);

        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write `value` into every position, front to back
    pub fn fill(&mut self, value: u8) {
        for slot in self.bytes.iter_mut() {
            *slot = value;
        }
        // The region is never read by us; keep the stores observable
        std::hint::black_box(&mut self.bytes);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MemoryArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryArena")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busprobe_test::assertions::assert_uniform_fill;
    use proptest::prelude::*;

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(MemoryArena::new(0), Err(BusprobeError::InvalidInput(_))));
    }

    #[test]
    fn test_fill_overwrites_previous_pass() {
        let mut arena = MemoryArena::new(4096).unwrap();
        arena.fill(0xAA);
        arena.fill(0x11);
        assert_uniform_fill(arena.as_slice(), 0x11);
    }

    proptest! {
        #[test]
        fn prop_fill_covers_whole_arena(size in 1usize..=64 * 1024, value in any::<u8>()) {
            let mut arena = MemoryArena::new(size).unwrap();
            arena.fill(value);
            prop_assert_eq!(arena.len(), size);
            prop_assert!(arena.as_slice().iter().all(|&b| b == value));
        }
    }
}
