//! Container statistics (§4.8), including the fragmentation score used
//! to decide whether a caller should consider a compaction pass.

use crate::container::Container;
use crate::holes::HoleManager;

/// A point-in-time snapshot of a container's space usage.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub logical_size_pages: u64,
    pub total_pages: u32,
    pub allocated_pages: u32,
    pub original_total_bytes: u64,
    pub stored_total_bytes: u64,
    pub compression_ratio_percent: u32,
    pub hole_count: usize,
    pub hole_bytes: u64,
    /// Fraction of the allocated extent span that is reclaimable hole
    /// space rather than live page data, in `[0.0, 1.0]`. `0.0` means no
    /// fragmentation; values approaching `1.0` mean most of the space
    /// between the data region's start and its high-water mark is holes.
    pub fragmentation_score: f64,
}

impl Stats {
    pub fn compute(container: &Container, holes: &HoleManager) -> Self {
        let allocated_pages = container
            .index
            .iter()
            .filter(|(_, e)| e.is_allocated())
            .count() as u32;
        let hole_bytes = holes.total_reclaimable_bytes();
        let stored = container.header.stored_total_bytes;
        let denominator = stored + hole_bytes;
        let fragmentation_score = if denominator == 0 {
            0.0
        } else {
            hole_bytes as f64 / denominator as f64
        };

        Stats {
            logical_size_pages: container.header.logical_size_pages,
            total_pages: container.header.total_pages,
            allocated_pages,
            original_total_bytes: container.header.original_total_bytes,
            stored_total_bytes: stored,
            compression_ratio_percent: container.header.compression_ratio_percent(),
            hole_count: holes.len(),
            hole_bytes,
            fragmentation_score,
        }
    }
}
