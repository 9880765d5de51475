//! Encryption footer detection.
//!
//! Only the 4-byte footer magic is examined. No key material is read or
//! validated.

use crate::device::{AccessMode, BlockDevice};
use crate::{FsMgrError, FstabEntry, KeyLocation};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};

pub const CRYPT_MAGIC: u32 = 0xD0B5_B1C4;

/// Bytes reserved at the end of a partition for the crypto footer. Shared by
/// every formatter and by the detector.
pub const CRYPT_FOOTER_OFFSET: u64 = 0x4000;

/// Offset of the footer on a device of `size_bytes`, or `None` if the device
/// cannot hold one.
pub fn footer_offset(size_bytes: u64) -> Option<u64> {
    size_bytes.checked_sub(CRYPT_FOOTER_OFFSET)
}

/// Resolves the footer location of `entry` and reads its magic.
///
/// Entries not marked encryptable are reported unencrypted without touching
/// the device. Key locations other than an absolute path or the footer
/// sentinel are configuration errors.
pub fn probe_footer(entry: &FstabEntry) -> Result<bool, FsMgrError> {
    if !entry.encryptable {
        return Ok(false);
    }

    let (mut device, offset) = match entry.key_location()? {
        KeyLocation::File(path) => (BlockDevice::open(path, AccessMode::ReadOnly)?, 0),
        KeyLocation::Footer => {
            let device = BlockDevice::open(&entry.blk_device, AccessMode::ReadOnly)?;
            let size = device.size_in_bytes()?;
            match footer_offset(size) {
                Some(offset) => (device, offset),
                None => {
                    debug!(
                        "{} ({} bytes) is too small for a crypto footer",
                        entry.blk_device.display(),
                        size
                    );
                    return Ok(false);
                }
            }
        }
    };

    let mut magic = [0u8; 4];
    device.read_at(offset, &mut magic)?;
    trace!(
        "Footer magic at {}:{:#x} is {}",
        device.path().display(),
        offset,
        hex::encode(magic)
    );

    Ok(LittleEndian::read_u32(&magic) == CRYPT_MAGIC)
}

/// Reports whether the entry's partition carries an encryption footer. Any
/// failure to locate or read the footer counts as "not encrypted".
pub fn is_partition_encrypted(entry: &FstabEntry) -> bool {
    match probe_footer(entry) {
        Ok(encrypted) => encrypted,
        Err(e) if e.is_configuration() => {
            warn!("{}: {}", entry.blk_device.display(), e);
            false
        }
        Err(e) => {
            debug!("Footer probe of {} failed: {}", entry.blk_device.display(), e);
            false
        }
    }
}
