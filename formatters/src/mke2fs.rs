use crate::ext4::{Ext4Builder, Ext4FsInfo};
use fsmgr_core::{BlockDevice, FsMgrError};
use log::{debug, error};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const MKE2FS: &str = "mke2fs";

enum Program {
    Fixed(PathBuf),
    /// Looked up when a filesystem is built; `None` searches `PATH`.
    Search(Option<OsString>),
}

/// [`Ext4Builder`] backed by the system `mke2fs`.
pub struct Mke2fsBuilder {
    program: Program,
}

impl Mke2fsBuilder {
    /// Uses the first `mke2fs` on `PATH` at build time.
    pub fn new() -> Self {
        Self {
            program: Program::Search(None),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Program::Fixed(program.into()),
        }
    }

    /// Searches `paths` (a `PATH`-style list) instead of `PATH`.
    pub fn with_search_path(paths: impl Into<OsString>) -> Self {
        Self {
            program: Program::Search(Some(paths.into())),
        }
    }

    fn resolve(&self) -> Result<PathBuf, FsMgrError> {
        let found = match &self.program {
            Program::Fixed(program) => return Ok(program.clone()),
            Program::Search(None) => which::which(MKE2FS),
            Program::Search(Some(paths)) => which::which_in(MKE2FS, Some(paths), "/"),
        };
        found.map_err(|e| FsMgrError::Configuration(format!("{} not found: {}", MKE2FS, e)))
    }

    /// Command line for `info` on `device`. The size argument already leaves
    /// out the reserved tail.
    pub fn args(&self, device: &Path, info: &Ext4FsInfo) -> Vec<String> {
        let mut args = vec!["-F".to_string(), "-q".to_string(), "-t".to_string(), "ext4".to_string()];

        if let Some(block_size) = info.block_size {
            args.push("-b".to_string());
            args.push(block_size.to_string());
        }

        args.push("-M".to_string());
        args.push(info.mount_point.display().to_string());
        args.push(device.display().to_string());

        match info.block_size {
            Some(block_size) => args.push((info.usable_len() / block_size as u64).to_string()),
            None => args.push(format!("{}k", info.usable_len() / 1024)),
        }

        args
    }
}

impl Default for Mke2fsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Ext4Builder for Mke2fsBuilder {
    fn make_ext4fs(&self, device: &mut BlockDevice, info: &Ext4FsInfo) -> i32 {
        let program = match self.resolve() {
            Ok(program) => program,
            Err(e) => {
                error!("{}", e);
                return -1;
            }
        };

        let args = self.args(device.path(), info);
        debug!("Running {} {:?}", program.display(), args);

        let status = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .status();

        match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                error!("Failed to start {}: {}", program.display(), e);
                -1
            }
        }
    }
}
