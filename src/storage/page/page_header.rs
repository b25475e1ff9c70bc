//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing the only metadata the
//! buffer pool itself is allowed to look at (spec §1): a type tag, the
//! page's own id, its tree's root id, and a foster-child pointer the
//! eviction policy and restart code may need to chase. Everything else
//! about the page's contents is opaque to this crate.

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized or corrupted page.
    #[default]
    Invalid = 0,
    /// Generic data page.
    Data = 1,
    /// B-tree internal (non-leaf) node.
    BTreeInternal = 2,
    /// B-tree leaf node.
    BTreeLeaf = 3,
    /// Page on the free list.
    Free = 4,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::BTreeInternal,
            3 => PageType::BTreeLeaf,
            4 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (29 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     tag (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       8     lsn (Log Sequence Number, little-endian)
/// 13      4     page_id (little-endian)
/// 17      4     root_id (little-endian)
/// 21      4     foster_child_ptr (little-endian; see `buffer::swizzle::ChildPointer`)
/// ```
///
/// # Checksum
/// Computed over the entire page with the checksum field itself zeroed, so
/// verification needs no special-casing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub tag: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Log Sequence Number of last modification.
    pub lsn: u64,
    /// This page's own persistent id, duplicated in the header so a frame
    /// can be identified from its bytes alone (e.g. during restore).
    pub page_id: u32,
    /// The id of the root page of the tree this page belongs to.
    pub root_id: u32,
    /// Raw encoded pointer (persistent id or swizzled frame index) to this
    /// page's foster child, consulted by the eviction policy and by
    /// restart code walking a partially-swizzled tree.
    pub foster_child_ptr: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 29;

    pub const OFFSET_TAG: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_LSN: usize = 5;
    pub const OFFSET_PAGE_ID: usize = 13;
    pub const OFFSET_ROOT_ID: usize = 17;
    pub const OFFSET_FOSTER_CHILD_PTR: usize = 21;

    /// Create a new header with the given page type; all other fields
    /// default to zero/invalid.
    pub fn new(tag: PageType) -> Self {
        Self {
            tag,
            ..Default::default()
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let tag = PageType::from_u8(data[Self::OFFSET_TAG]);
        let checksum = u32::from_le_bytes(data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4].try_into().unwrap());
        let lsn = u64::from_le_bytes(data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8].try_into().unwrap());
        let page_id = u32::from_le_bytes(data[Self::OFFSET_PAGE_ID..Self::OFFSET_PAGE_ID + 4].try_into().unwrap());
        let root_id = u32::from_le_bytes(data[Self::OFFSET_ROOT_ID..Self::OFFSET_ROOT_ID + 4].try_into().unwrap());
        let foster_child_ptr = u32::from_le_bytes(
            data[Self::OFFSET_FOSTER_CHILD_PTR..Self::OFFSET_FOSTER_CHILD_PTR + 4]
                .try_into()
                .unwrap(),
        );

        Self {
            tag,
            checksum,
            lsn,
            page_id,
            root_id,
            foster_child_ptr,
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_TAG] = self.tag as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4].copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8].copy_from_slice(&self.lsn.to_le_bytes());
        data[Self::OFFSET_PAGE_ID..Self::OFFSET_PAGE_ID + 4].copy_from_slice(&self.page_id.to_le_bytes());
        data[Self::OFFSET_ROOT_ID..Self::OFFSET_ROOT_ID + 4].copy_from_slice(&self.root_id.to_le_bytes());
        data[Self::OFFSET_FOSTER_CHILD_PTR..Self::OFFSET_FOSTER_CHILD_PTR + 4]
            .copy_from_slice(&self.foster_child_ptr.to_le_bytes());
    }

    /// Compute CRC32 checksum of a page, with the checksum field zeroed.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;

    #[test]
    fn test_page_type_from_u8() {
        assert_eq!(PageType::from_u8(0), PageType::Invalid);
        assert_eq!(PageType::from_u8(1), PageType::Data);
        assert_eq!(PageType::from_u8(2), PageType::BTreeInternal);
        assert_eq!(PageType::from_u8(3), PageType::BTreeLeaf);
        assert_eq!(PageType::from_u8(4), PageType::Free);
        assert_eq!(PageType::from_u8(255), PageType::Invalid);
    }

    #[test]
    fn test_page_type_default() {
        assert_eq!(PageType::default(), PageType::Invalid);
    }

    #[test]
    fn test_page_header_new() {
        let header = PageHeader::new(PageType::Data);
        assert_eq!(header.tag, PageType::Data);
        assert_eq!(header.checksum, 0);
        assert_eq!(header.page_id, 0);
    }

    #[test]
    fn test_page_header_roundtrip() {
        let original = PageHeader {
            tag: PageType::BTreeLeaf,
            checksum: 0xDEADBEEF,
            lsn: 0x123456789ABCDEF0,
            page_id: 42,
            root_id: 1,
            foster_child_ptr: 0x8000_0007,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        original.write_to(&mut buffer);

        let recovered = PageHeader::from_bytes(&buffer);
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_page_header_byte_layout() {
        let header = PageHeader {
            tag: PageType::Data,
            checksum: 0x04030201,
            lsn: 0x0807060504030201,
            page_id: 0,
            root_id: 0,
            foster_child_ptr: 0,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 1); // PageType::Data
        assert_eq!(buffer[1], 0x01);
        assert_eq!(buffer[4], 0x04);
        assert_eq!(buffer[5], 0x01);
        assert_eq!(buffer[12], 0x08);
    }

    #[test]
    fn test_checksum_deterministic() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;
        page_data[1000] = 0xCD;

        let checksum1 = PageHeader::compute_checksum(&page_data);
        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
        assert_ne!(checksum1, 0);
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let mut page1 = [0u8; PAGE_SIZE];
        let mut page2 = [0u8; PAGE_SIZE];

        page1[500] = 0xFF;
        page2[500] = 0xFE;

        assert_ne!(PageHeader::compute_checksum(&page1), PageHeader::compute_checksum(&page2));
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;

        let checksum1 = PageHeader::compute_checksum(&page_data);

        page_data[1] = 0xFF;
        page_data[2] = 0xFF;
        page_data[3] = 0xFF;
        page_data[4] = 0xFF;

        let checksum2 = PageHeader::compute_checksum(&page_data);
        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_verify() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;

        let checksum = PageHeader::compute_checksum(&page_data);
        let header = PageHeader {
            tag: PageType::Data,
            checksum,
            ..Default::default()
        };

        assert!(header.verify_checksum(&page_data));

        page_data[100] = 0xFF;
        assert!(!header.verify_checksum(&page_data));
    }
}
