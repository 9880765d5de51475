//! Superblock signature scanning.
//!
//! The first [`SCAN_BYTES`] of a device are searched for the magic of the
//! *declared* filesystem type. Nothing is inferred: the caller asserts a type
//! and the scan confirms or denies it.

use crate::device::{AccessMode, BlockDevice, SECTOR_SIZE};
use crate::{FsMgrError, FsType, FstabEntry};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, error};
use static_assertions::const_assert_eq;

/// Sixteen sectors (4 x 4k blocks) cover the ext4 alignment requirement and
/// the f2fs backup superblock.
pub const SCAN_SECTORS: usize = 16;
pub const SCAN_BYTES: usize = SCAN_SECTORS * SECTOR_SIZE as usize;

pub const F2FS_SUPER_MAGIC: u32 = 0xF2F5_2010;
pub const EXT4_SUPER_MAGIC: u16 = 0xEF53;

const EXT4_SUPERBLOCK_SIZE: usize = 1024;
const EXT4_MAGIC_OFFSET: usize = 0x38;

const_assert_eq!(SCAN_BYTES % EXT4_SUPERBLOCK_SIZE, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperblockSignature {
    /// 32-bit magic in the first word of every 512-byte sector.
    F2fs,
    /// 16-bit magic at 0x38 of each 1024-byte superblock-sized window.
    Ext4,
}

impl SuperblockSignature {
    pub fn for_type(fs_type: FsType) -> Self {
        match fs_type {
            FsType::F2fs => SuperblockSignature::F2fs,
            FsType::Ext4 => SuperblockSignature::Ext4,
        }
    }

    /// Distance between two probed windows.
    pub fn stride(&self) -> usize {
        match self {
            SuperblockSignature::F2fs => SECTOR_SIZE as usize,
            SuperblockSignature::Ext4 => EXT4_SUPERBLOCK_SIZE,
        }
    }

    pub fn magic_offset(&self) -> usize {
        match self {
            SuperblockSignature::F2fs => 0,
            SuperblockSignature::Ext4 => EXT4_MAGIC_OFFSET,
        }
    }

    fn matches_window(&self, window: &[u8]) -> bool {
        let field = &window[self.magic_offset()..];
        match self {
            SuperblockSignature::F2fs => LittleEndian::read_u32(field) == F2FS_SUPER_MAGIC,
            SuperblockSignature::Ext4 => LittleEndian::read_u16(field) == EXT4_SUPER_MAGIC,
        }
    }

    /// True if any window in the first [`SCAN_BYTES`] of `block` carries this
    /// signature. A buffer shorter than the scan region never matches.
    pub fn scan(&self, block: &[u8]) -> bool {
        match block.get(..SCAN_BYTES) {
            Some(region) => region
                .chunks_exact(self.stride())
                .any(|window| self.matches_window(window)),
            None => false,
        }
    }
}

/// Checks `block` for the signature of the declared type.
pub fn identify(fs_type: FsType, block: &[u8]) -> bool {
    SuperblockSignature::for_type(fs_type).scan(block)
}

/// Reads the scan region of the entry's device and checks it for the
/// declared type. Unsupported types fail before any I/O.
pub fn scan_device(entry: &FstabEntry) -> Result<bool, FsMgrError> {
    let fs_type = entry
        .declared_type()
        .ok_or_else(|| FsMgrError::UnsupportedFsType(entry.fs_type.clone()))?;

    let mut device = BlockDevice::open(&entry.blk_device, AccessMode::ReadOnly)?;
    let mut block = vec![0u8; SCAN_BYTES];
    device.read_at(0, &mut block)?;

    Ok(identify(fs_type, &block))
}

/// Examines the superblock area of the entry's device and reports whether it
/// holds the declared filesystem type.
pub fn identify_fs(entry: &FstabEntry) -> bool {
    let recognized = match scan_device(entry) {
        Ok(found) => found,
        Err(e) => {
            debug!("Superblock scan of {} failed: {}", entry.blk_device.display(), e);
            false
        }
    };

    if !recognized {
        error!(
            "Did not recognize file system type '{}' on {}",
            entry.fs_type,
            entry.blk_device.display()
        );
    }
    recognized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_f2fs_magic(block: &mut [u8], offset: usize) {
        LittleEndian::write_u32(&mut block[offset..offset + 4], F2FS_SUPER_MAGIC);
    }

    fn put_ext4_magic(block: &mut [u8], superblock: usize) {
        let at = superblock + EXT4_MAGIC_OFFSET;
        LittleEndian::write_u16(&mut block[at..at + 2], EXT4_SUPER_MAGIC);
    }

    #[test]
    fn f2fs_found_at_every_sector() {
        for sector in 0..SCAN_SECTORS {
            let mut block = vec![0u8; SCAN_BYTES];
            put_f2fs_magic(&mut block, sector * 512);
            assert!(identify(FsType::F2fs, &block), "sector {}", sector);
        }
    }

    #[test]
    fn f2fs_not_found_off_sector_or_outside_window() {
        let mut block = vec![0u8; SCAN_BYTES + 512];
        put_f2fs_magic(&mut block, 4);
        put_f2fs_magic(&mut block, 1024 + 100);
        put_f2fs_magic(&mut block, SCAN_BYTES);
        assert!(!identify(FsType::F2fs, &block));
    }

    #[test]
    fn ext4_found_at_every_stride() {
        for sb in (0..SCAN_BYTES).step_by(EXT4_SUPERBLOCK_SIZE) {
            let mut block = vec![0u8; SCAN_BYTES];
            put_ext4_magic(&mut block, sb);
            assert!(identify(FsType::Ext4, &block), "superblock at {}", sb);
        }
    }

    #[test]
    fn ext4_magic_at_wrong_offset_is_ignored() {
        let mut block = vec![0u8; SCAN_BYTES];
        // Right field offset, but within a sector-aligned (not 1k-aligned) window.
        put_ext4_magic(&mut block, 512);
        assert!(!identify(FsType::Ext4, &block));
    }

    #[test]
    fn declared_type_must_agree_with_signature() {
        let mut f2fs = vec![0u8; SCAN_BYTES];
        put_f2fs_magic(&mut f2fs, 0);
        assert!(!identify(FsType::Ext4, &f2fs));

        let mut ext4 = vec![0u8; SCAN_BYTES];
        put_ext4_magic(&mut ext4, 1024);
        assert!(!identify(FsType::F2fs, &ext4));
    }

    #[test]
    fn short_buffer_never_matches() {
        let mut block = vec![0u8; SCAN_BYTES - 1];
        put_f2fs_magic(&mut block, 0);
        put_ext4_magic(&mut block, 1024);
        assert!(!identify(FsType::F2fs, &block));
        assert!(!identify(FsType::Ext4, &block));
        assert!(!identify(FsType::Ext4, &[]));
    }

    #[test]
    fn strides_and_offsets() {
        assert_eq!(SuperblockSignature::F2fs.stride(), 512);
        assert_eq!(SuperblockSignature::Ext4.stride(), 1024);
        assert_eq!(SuperblockSignature::Ext4.magic_offset(), 0x38);
        assert_eq!(SCAN_BYTES, 8192);
    }
}
