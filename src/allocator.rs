//! Space allocator (C6, §4.4): decides where a page's newly encoded
//! bytes land — reused in place, reused from a hole, or appended — ahead
//! of the read/write path actually touching the file. Built on
//! [`crate::holes::HoleManager`], the same free-list this crate adapted
//! from `redox-os/tfs`'s cluster allocator.

use crate::holes::HoleManager;
use crate::container::PageEntry;

/// Where a page's encoded bytes should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Reuse an existing extent (the page's previous home, or a
    /// reclaimed hole) starting at this file offset.
    Offset(u64),
    /// No existing extent fit; write at the current end of the file.
    Append,
}

/// Decides placement and owns the hole free-list those decisions feed.
pub struct Allocator {
    holes: HoleManager,
}

impl Allocator {
    pub fn new(holes: HoleManager) -> Self {
        Allocator { holes }
    }

    pub fn holes(&self) -> &HoleManager {
        &self.holes
    }

    pub fn holes_mut(&mut self) -> &mut HoleManager {
        &mut self.holes
    }

    /// Decide where `needed_size` stored bytes should go, given the
    /// page's previous entry (if any). Mirrors the decision ladder of
    /// §4.4 steps 2-5 (step 1, the sparse case, is handled by the caller
    /// before this is reached): reuse the page's own extent in place if
    /// it still fits (freeing any leftover tail as a hole); otherwise
    /// free the old extent and look for a best-fit hole; otherwise
    /// append. A sparse old entry has `offset == 0` and carries no
    /// backing bytes to reuse or free.
    pub fn allocate(&mut self, old: Option<PageEntry>, needed_size: u32) -> Allocation {
        if let Some(old) = old {
            if old.offset != 0 {
                if needed_size <= old.stored_size {
                    let leftover = old.stored_size - needed_size;
                    if leftover > 0 {
                        self.holes.add_hole(old.offset + needed_size as u64, leftover);
                    }
                    return Allocation::Offset(old.offset);
                }
                self.holes.add_hole(old.offset, old.stored_size);
            }
        }

        match self.holes.take_best_fit(needed_size) {
            Some(hole) => Allocation::Offset(hole.offset),
            None => Allocation::Append,
        }
    }

    /// Release a page's extent without replacing it (used when a page is
    /// truncated away or explicitly freed). A sparse entry has no
    /// backing bytes and is a no-op here.
    pub fn free(&mut self, entry: PageEntry) {
        if entry.offset != 0 {
            self.holes.add_hole(entry.offset, entry.stored_size);
        }
    }
}
