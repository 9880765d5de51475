use fsmgr_core::{
    run_to_exit, FilesystemFormatter, FormatRequest, FsMgrError, FsType, HelperLauncher,
    CRYPT_FOOTER_OFFSET,
};
use log::error;
use std::path::PathBuf;
use std::sync::Arc;

pub const MKFS_F2FS: &str = "/sbin/mkfs.f2fs";

/// Formats f2fs by running `mkfs.f2fs -r <reserved> <device>`.
pub struct F2fsFormatter {
    helper: PathBuf,
    launcher: Arc<dyn HelperLauncher>,
}

impl F2fsFormatter {
    pub fn new(launcher: Arc<dyn HelperLauncher>) -> Self {
        Self {
            helper: PathBuf::from(MKFS_F2FS),
            launcher,
        }
    }

    pub fn with_helper(mut self, helper: impl Into<PathBuf>) -> Self {
        self.helper = helper.into();
        self
    }

    pub fn helper_args(request: &FormatRequest) -> Vec<String> {
        let footer = if request.needs_footer {
            CRYPT_FOOTER_OFFSET
        } else {
            0
        };

        vec![
            "-r".to_string(),
            footer.to_string(),
            request.device().display().to_string(),
        ]
    }
}

impl FilesystemFormatter for F2fsFormatter {
    fn name(&self) -> &'static str {
        "f2fs"
    }

    fn fs_type(&self) -> FsType {
        FsType::F2fs
    }

    fn format(&self, request: &FormatRequest) -> Result<(), FsMgrError> {
        let args = Self::helper_args(request);
        let code = run_to_exit(self.launcher.as_ref(), &self.helper, &args).map_err(|e| {
            error!("{}", e);
            e
        })?;

        if code != 0 {
            return Err(FsMgrError::HelperExit(code));
        }
        Ok(())
    }
}
