use crate::FsMgrError;
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod ioctl {
    // BLKGETSIZE: device size in 512-byte sectors.
    nix::ioctl_read_bad!(blk_get_size, 0x1260, nix::libc::c_ulong);
}

/// An open, exclusively owned handle on a raw block device (or a regular file
/// standing in for one). The descriptor is closed when the handle drops.
#[derive(Debug)]
pub struct BlockDevice {
    path: PathBuf,
    file: File,
}

impl BlockDevice {
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self, FsMgrError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == AccessMode::ReadWrite)
            .open(path)
            .map_err(|e| FsMgrError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the device in 512-byte sectors.
    pub fn size_in_sectors(&self) -> Result<u64, FsMgrError> {
        let sectors = probe_sectors(&self.file).map_err(|e| FsMgrError::DeviceSize {
            path: self.path.clone(),
            source: e,
        })?;
        trace!("{} has {} sectors", self.path.display(), sectors);
        Ok(sectors)
    }

    pub fn size_in_bytes(&self) -> Result<u64, FsMgrError> {
        Ok(self.size_in_sectors()? * SECTOR_SIZE)
    }

    /// Fill `buf` from `offset`. A short read is an error.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FsMgrError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|e| FsMgrError::io(&self.path, e))
    }

    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), FsMgrError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(data))
            .and_then(|_| self.file.flush())
            .map_err(|e| FsMgrError::io(&self.path, e))
    }
}

fn probe_sectors(file: &File) -> io::Result<u64> {
    let metadata = file.metadata()?;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use std::os::unix::fs::FileTypeExt;
        use std::os::unix::io::AsRawFd;

        if metadata.file_type().is_block_device() {
            let mut sectors: nix::libc::c_ulong = 0;
            unsafe { ioctl::blk_get_size(file.as_raw_fd(), &mut sectors) }
                .map_err(io::Error::from)?;
            return Ok(sectors as u64);
        }
    }

    // Disk images: whole sectors only, like the kernel reports.
    Ok(metadata.len() / SECTOR_SIZE)
}
