//! ## leakprobe-core::ledger
//! **Bounded ownership of committed memory blocks**
//!
//! Every block handed to the ledger is backed by physically committed pages:
//! the buffer is zero-filled and then stamped with a per-page byte so the
//! kernel cannot satisfy it with shared zero pages.
//!
//! Invariants, upheld at every instant another thread can observe:
//! - `total_mb == sum(block.size_mb)`
//! - `total_mb <= ceiling_mb`

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::LedgerError;

pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Distance between two stamped bytes. Matches the smallest common page size.
pub const PAGE_STRIDE: usize = 4096;

/// One committed allocation.
pub struct Block {
    size_mb: u64,
    bytes: Box<[u8]>,
}

impl Block {
    fn commit(size_mb: u64) -> Result<Self, LedgerError> {
        let len = usize::try_from(size_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(BYTES_PER_MB))
            .ok_or_else(|| LedgerError::AllocationFailure {
                size_mb,
                reason: "size exceeds the address space".into(),
            })?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|e| LedgerError::AllocationFailure {
                size_mb,
                reason: e.to_string(),
            })?;
        bytes.resize(len, 0u8);

        for (page, offset) in (0..len).step_by(PAGE_STRIDE).enumerate() {
            bytes[offset] = page_stamp(page);
        }

        Ok(Self {
            size_mb,
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn size_mb(&self) -> u64 {
        self.size_mb
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("size_mb", &self.size_mb)
            .finish_non_exhaustive()
    }
}

/// Never zero, so every stamped page differs from a fresh zero page.
#[inline]
fn page_stamp(page: usize) -> u8 {
    (page % 255) as u8 + 1
}

#[derive(Default)]
struct LedgerState {
    blocks: Vec<Block>,
    total_mb: u64,
}

/// Point-in-time copy of the ledger counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub chunks: usize,
    pub allocated_mb: u64,
    pub ceiling_mb: u64,
}

/// What a release pass handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReleaseSummary {
    pub blocks: usize,
    pub megabytes: u64,
}

/// Thread-safe owner of all leaked blocks.
///
/// `allocate`, `release_all` and `stats` serialise on one mutex. Page
/// commitment happens outside of it so a large allocation does not stall
/// concurrent snapshots.
pub struct AllocationLedger {
    ceiling_mb: u64,
    state: Mutex<LedgerState>,
    releases: AtomicU64,
}

impl AllocationLedger {
    pub fn new(ceiling_mb: u64) -> Self {
        Self {
            ceiling_mb,
            state: Mutex::new(LedgerState::default()),
            releases: AtomicU64::new(0),
        }
    }

    pub fn ceiling_mb(&self) -> u64 {
        self.ceiling_mb
    }

    /// Adds a committed block of `size_mb` MiB, unless that would pass the
    /// ceiling. On error the ledger is unchanged. A zero-sized request is a
    /// no-op.
    pub fn allocate(&self, size_mb: u64) -> Result<(), LedgerError> {
        if size_mb == 0 {
            return Ok(());
        }

        self.check_headroom(&self.state.lock(), size_mb)?;

        let block = Block::commit(size_mb)?;

        let mut state = self.state.lock();
        // Re-checked: another caller may have committed in the meantime.
        if let Err(e) = self.check_headroom(&state, size_mb) {
            drop(state);
            drop(block);
            return Err(e);
        }
        state.total_mb += size_mb;
        state.blocks.push(block);
        let total_mb = state.total_mb;
        drop(state);

        info!("Allocated {size_mb}MB, total allocated: {total_mb}MB");
        Ok(())
    }

    fn check_headroom(&self, state: &LedgerState, size_mb: u64) -> Result<(), LedgerError> {
        let fits = state
            .total_mb
            .checked_add(size_mb)
            .is_some_and(|total| total <= self.ceiling_mb);
        if fits {
            Ok(())
        } else {
            debug!(
                requested_mb = size_mb,
                allocated_mb = state.total_mb,
                "Allocation refused at ceiling"
            );
            Err(LedgerError::LimitExceeded {
                requested_mb: size_mb,
                allocated_mb: state.total_mb,
                ceiling_mb: self.ceiling_mb,
            })
        }
    }

    /// Drops every block and zeroes the total. Idempotent.
    ///
    /// The buffers go back to the allocator after the lock is released.
    pub fn release_all(&self) -> ReleaseSummary {
        let (blocks, megabytes) = {
            let mut state = self.state.lock();
            let megabytes = std::mem::take(&mut state.total_mb);
            (std::mem::take(&mut state.blocks), megabytes)
        };
        self.releases.fetch_add(1, Ordering::AcqRel);

        let summary = ReleaseSummary {
            blocks: blocks.len(),
            megabytes,
        };
        drop(blocks);

        info!(
            "Cleaned up {} memory chunks ({}MB)",
            summary.blocks, summary.megabytes
        );
        summary
    }

    pub fn stats(&self) -> LedgerStats {
        let state = self.state.lock();
        LedgerStats {
            chunks: state.blocks.len(),
            allocated_mb: state.total_mb,
            ceiling_mb: self.ceiling_mb,
        }
    }

    /// Number of release passes performed so far.
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Acquire)
    }

    #[cfg(test)]
    fn with_blocks<R>(&self, f: impl FnOnce(&[Block]) -> R) -> R {
        f(&self.state.lock().blocks)
    }
}
