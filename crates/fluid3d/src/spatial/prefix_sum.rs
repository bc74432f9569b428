//! Hierarchical exclusive prefix sum.
//!
//! Three passes per level:
//! 1. Scan every block of `block_size` elements locally, recording block totals
//! 2. Exclusive-scan the block totals (recursing while they exceed one block)
//! 3. Add each block's scanned total back into the block
//!
//! The single-block scan is the only primitive; any length is handled by
//! adding levels.

use rayon::prelude::*;

use crate::constants::SCAN_BLOCK_SIZE;

/// Exclusive prefix sum in place. Returns the total.
pub fn exclusive_scan(data: &mut [u32]) -> u32 {
    exclusive_scan_blocked(data, SCAN_BLOCK_SIZE)
}

/// Exclusive prefix sum with an explicit block size.
pub fn exclusive_scan_blocked(data: &mut [u32], block_size: usize) -> u32 {
    assert!(block_size > 1, "block_size must be at least 2");

    if data.len() <= block_size {
        return scan_block(data);
    }

    // 1. Local scans
    let mut block_sums: Vec<u32> = data
        .par_chunks_mut(block_size)
        .map(scan_block)
        .collect();

    // 2. Scan of the block totals, which may itself need more levels
    let total = exclusive_scan_blocked(&mut block_sums, block_size);

    // 3. Uniform add
    data.par_chunks_mut(block_size)
        .zip(block_sums.par_iter())
        .for_each(|(block, &offset)| {
            for value in block.iter_mut() {
                *value += offset;
            }
        });

    total
}

/// Sequential exclusive scan of one block. Returns the block total.
#[inline]
fn scan_block(block: &mut [u32]) -> u32 {
    let mut running = 0u32;
    for value in block.iter_mut() {
        let count = *value;
        *value = running;
        running += count;
    }
    running
}
