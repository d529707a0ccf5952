//! Container format (C3): header + page index, bound together so callers
//! never manipulate one without the other staying consistent.

pub mod header;
pub mod index;

use crate::file_io::UnderlyingFile;
use crate::PageStoreError;

pub use header::Header;
pub use index::{PageEntry, PageIndex};

/// The header and page index loaded (or freshly initialized) together.
pub struct Container {
    pub header: Header,
    pub index: PageIndex,
}

impl Container {
    /// Initialize a brand-new container in an empty (or about-to-be
    /// truncated) file.
    pub fn create(
        page_size: u32,
        compress_name: &str,
        encrypt_name: &str,
        key: Option<&[u8]>,
    ) -> Self {
        let header = Header::init(page_size, compress_name, encrypt_name, key);
        let index = PageIndex::new(header.index_offset, header.reserved_index_entries());
        Container { header, index }
    }

    /// Load an existing container's header and index from `file`.
    pub fn open(file: &mut dyn UnderlyingFile) -> Result<Self, PageStoreError> {
        let header = Header::load(file)?;
        let index = PageIndex::load(
            file,
            header.index_offset,
            header.total_pages,
            header.reserved_index_entries(),
        )?;
        Ok(Container { header, index })
    }

    /// Persist both header and index. The index is written first so a
    /// crash between the two writes leaves the header's `total_pages`
    /// describing data that is already on disk, never entries the header
    /// doesn't yet know about.
    pub fn save(&mut self, file: &mut dyn UnderlyingFile) -> Result<(), PageStoreError> {
        self.index.save(file)?;
        self.header.total_pages = self.index.len() as u32;
        self.header.save(file)?;
        Ok(())
    }

    pub fn data_region_offset(&self) -> u64 {
        self.header.data_region_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::index::PageEntry;
    use crate::file_io::MemFile;

    #[test]
    fn create_then_save_then_open_roundtrips() {
        let mut file = MemFile::new();
        let mut container = Container::create(4096, "zlib", "", None);
        container.index.set(
            0,
            PageEntry {
                offset: container.data_region_offset(),
                stored_size: 100,
                original_size: 4096,
                checksum: 123,
                compressed: true,
                encrypted: false,
                is_hole: false,
            },
        );
        container.save(&mut file).unwrap();

        let reopened = Container::open(&mut file).unwrap();
        assert_eq!(reopened.header.total_pages, 1);
        assert_eq!(reopened.index.get(0).unwrap().stored_size, 100);
    }
}
