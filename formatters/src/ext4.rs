//! ext4 formatting through an in-process builder.

use fsmgr_core::crypt::footer_offset;
use fsmgr_core::{
    AccessMode, BlockDevice, FilesystemFormatter, FormatRequest, FsMgrError, FsType,
    CRYPT_FOOTER_OFFSET,
};
use log::{error, info, warn};
use std::path::PathBuf;

/// Block size forced at build time, e.g.
/// `FSMGR_USERIMAGE_BLOCK_SIZE=4096 cargo build`.
const USERIMAGE_BLOCK_SIZE: Option<&str> = option_env!("FSMGR_USERIMAGE_BLOCK_SIZE");

/// ext2/3/4 only support 1k, 2k and 4k blocks. Anything else falls back to
/// the builder's default with a warning.
pub fn sanitize_block_size(requested: Option<i64>) -> Option<u32> {
    match requested {
        None => None,
        Some(size @ (1024 | 2048 | 4096)) => Some(size as u32),
        Some(size) => {
            warn!("Block size '{}' not supported; using default", size);
            None
        }
    }
}

/// Parses a configured block size. Non-numeric values fall back to the
/// default like unsupported sizes do.
fn parse_block_size(raw: Option<&str>) -> Option<u32> {
    let raw = raw?;
    match raw.trim().parse::<i64>() {
        Ok(size) => sanitize_block_size(Some(size)),
        Err(_) => {
            warn!("Block size '{}' not supported; using default", raw);
            None
        }
    }
}

fn build_time_block_size() -> Option<u32> {
    parse_block_size(USERIMAGE_BLOCK_SIZE)
}

/// Builder configuration for one format call. Built fresh every time, so
/// nothing carries over between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ext4FsInfo {
    /// Raw device length in bytes.
    pub len: u64,
    /// Bytes at the end of the device the filesystem must not use.
    pub reserved_tail: u64,
    pub block_size: Option<u32>,
    pub mount_point: PathBuf,
}

impl Ext4FsInfo {
    pub fn usable_len(&self) -> u64 {
        self.len.saturating_sub(self.reserved_tail)
    }
}

/// Builds an ext4 filesystem on an open device. Returns 0 on success.
pub trait Ext4Builder: Send + Sync {
    fn make_ext4fs(&self, device: &mut BlockDevice, info: &Ext4FsInfo) -> i32;
}

pub struct Ext4Formatter<B> {
    builder: B,
    block_size: Option<u32>,
}

impl<B: Ext4Builder> Ext4Formatter<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            block_size: build_time_block_size(),
        }
    }

    pub fn with_block_size(mut self, block_size: Option<i64>) -> Self {
        self.block_size = sanitize_block_size(block_size);
        self
    }

    pub fn block_size(&self) -> Option<u32> {
        self.block_size
    }

    /// Zeroes the footer region so a stale footer from an earlier use of the
    /// partition cannot be mistaken for a live one.
    fn wipe_footer(device: &mut BlockDevice, len: u64) -> Result<(), FsMgrError> {
        info!("Wiping old crypto info.");

        let offset = footer_offset(len).ok_or_else(|| FsMgrError::DeviceTooSmall {
            path: device.path().to_path_buf(),
            size: len,
            reserved: CRYPT_FOOTER_OFFSET,
        })?;

        let zeros = vec![0u8; CRYPT_FOOTER_OFFSET as usize];
        device.write_at(offset, &zeros).map_err(|e| match e {
            FsMgrError::Io { path, source } => FsMgrError::FooterWipe { path, source },
            other => other,
        })
    }
}

impl<B: Ext4Builder> FilesystemFormatter for Ext4Formatter<B> {
    fn name(&self) -> &'static str {
        "ext4"
    }

    fn fs_type(&self) -> FsType {
        FsType::Ext4
    }

    fn format(&self, request: &FormatRequest) -> Result<(), FsMgrError> {
        // One handle is held from the footer wipe through the build.
        let mut device = BlockDevice::open(request.device(), AccessMode::ReadWrite)
            .map_err(|e| {
                error!("Cannot open block device. {}", e);
                e
            })?;
        let len = device.size_in_bytes().map_err(|e| {
            error!("{}", e);
            e
        })?;

        if request.needs_footer {
            Self::wipe_footer(&mut device, len).map_err(|e| {
                error!("{}", e);
                e
            })?;
        }

        let info = Ext4FsInfo {
            len,
            reserved_tail: if request.needs_footer {
                CRYPT_FOOTER_OFFSET
            } else {
                0
            },
            block_size: self.block_size,
            mount_point: request.mount_point.clone(),
        };

        let rc = self.builder.make_ext4fs(&mut device, &info);
        if rc != 0 {
            error!("make_ext4fs returned {}.", rc);
            return Err(FsMgrError::Ext4Builder(rc));
        }

        Ok(())
    }
}
