use crate::{FsMgrError, FsType};
use std::path::{Path, PathBuf};

/// Everything a formatter needs for one format call. Derived from a
/// declaration, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    pub fs_type: FsType,
    pub blk_device: PathBuf,
    pub mount_point: PathBuf,
    pub needs_footer: bool,
}

impl FormatRequest {
    pub fn device(&self) -> &Path {
        &self.blk_device
    }
}

pub trait FilesystemFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    fn fs_type(&self) -> FsType;

    /// Initialises the device in place. Blocks until the filesystem is built.
    fn format(&self, request: &FormatRequest) -> Result<(), FsMgrError>;
}
