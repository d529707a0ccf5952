//! Write-behind buffer (C8, §4.6): per-page staging of plaintext writes
//! so a caller hammering the same page gets read-your-writes without
//! re-encoding and re-allocating on every call. Flushed in page-number
//! order so the batch writer (C9) downstream sees writes in an order
//! that favors contiguous extents.

use std::collections::HashMap;

use crate::config::BufferConfig;

/// Staged plaintext page writes, not yet encoded or placed on disk.
pub struct WriteBuffer {
    pending: HashMap<u64, Vec<u8>>,
    total_bytes: usize,
    merges: usize,
    config: BufferConfig,
}

impl WriteBuffer {
    pub fn new(config: BufferConfig) -> Self {
        WriteBuffer {
            pending: HashMap::new(),
            total_bytes: 0,
            merges: 0,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// How many staged writes have replaced an already-staged write to
    /// the same page, over this buffer's lifetime (not reset by flush).
    pub fn merges(&self) -> usize {
        self.merges
    }

    pub fn get(&self, page: u64) -> Option<&[u8]> {
        self.pending.get(&page).map(|v| v.as_slice())
    }

    /// Stage `data` for `page`, replacing whatever was staged before.
    pub fn stage(&mut self, page: u64, data: Vec<u8>) {
        if let Some(old) = self.pending.insert(page, data) {
            self.total_bytes -= old.len();
            self.merges += 1;
        }
        self.total_bytes += self.pending.get(&page).map(|v| v.len()).unwrap_or(0);
    }

    /// Drop a page's staged write without flushing it (used when a page
    /// is truncated away before ever reaching disk).
    pub fn discard(&mut self, page: u64) {
        if let Some(old) = self.pending.remove(&page) {
            self.total_bytes -= old.len();
        }
    }

    /// Whether the buffer has grown past any of its configured bounds
    /// and should be flushed before accepting more writes.
    pub fn needs_flush(&self) -> bool {
        self.config.enabled
            && (self.pending.len() >= self.config.auto_flush_entries
                || self.pending.len() >= self.config.max_entries
                || self.total_bytes >= self.config.max_total_bytes)
    }

    /// Remove and return every staged write, in ascending page order —
    /// the order the batch writer wants them in to find contiguous runs.
    pub fn drain_sorted(&mut self) -> Vec<(u64, Vec<u8>)> {
        let mut items: Vec<(u64, Vec<u8>)> = self.pending.drain().collect();
        items.sort_by_key(|(page, _)| *page);
        self.total_bytes = 0;
        items
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BufferConfig {
        BufferConfig {
            enabled: true,
            max_entries: 4,
            max_total_bytes: 1024,
            auto_flush_entries: 3,
        }
    }

    #[test]
    fn stage_then_get_returns_the_staged_bytes() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(5, vec![1, 2, 3]);
        assert_eq!(buf.get(5), Some(&[1u8, 2, 3][..]));
        assert_eq!(buf.total_bytes(), 3);
    }

    #[test]
    fn restaging_a_page_replaces_it_and_tracks_bytes_correctly() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(5, vec![0u8; 10]);
        buf.stage(5, vec![0u8; 4]);
        assert_eq!(buf.total_bytes(), 4);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn restaging_a_page_counts_a_merge() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(7, b"AAAA".to_vec());
        assert_eq!(buf.merges(), 0);
        buf.stage(7, b"BBBB".to_vec());
        assert_eq!(buf.merges(), 1);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get(7), Some(&b"BBBB"[..]));
    }

    #[test]
    fn needs_flush_once_auto_flush_entry_threshold_is_hit() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(1, vec![0u8; 1]);
        buf.stage(2, vec![0u8; 1]);
        assert!(!buf.needs_flush());
        buf.stage(3, vec![0u8; 1]);
        assert!(buf.needs_flush());
    }

    #[test]
    fn needs_flush_once_byte_bound_is_hit() {
        let mut buf = WriteBuffer::new(BufferConfig {
            enabled: true,
            max_entries: 100,
            max_total_bytes: 8,
            auto_flush_entries: 100,
        });
        buf.stage(1, vec![0u8; 10]);
        assert!(buf.needs_flush());
    }

    #[test]
    fn drain_sorted_returns_pages_in_ascending_order_and_clears() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(3, vec![3]);
        buf.stage(1, vec![1]);
        buf.stage(2, vec![2]);
        let drained = buf.drain_sorted();
        let pages: Vec<u64> = drained.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert!(buf.is_empty());
        assert_eq!(buf.total_bytes(), 0);
    }

    #[test]
    fn discard_drops_a_staged_write() {
        let mut buf = WriteBuffer::new(cfg());
        buf.stage(1, vec![0u8; 5]);
        buf.discard(1);
        assert!(buf.is_empty());
        assert_eq!(buf.total_bytes(), 0);
    }

    #[test]
    fn disabled_buffer_never_requests_a_flush() {
        let mut buf = WriteBuffer::new(BufferConfig {
            enabled: false,
            max_entries: 1,
            max_total_bytes: 1,
            auto_flush_entries: 1,
        });
        buf.stage(1, vec![0u8; 100]);
        assert!(!buf.needs_flush());
    }
}
