use crate::{FormatRequest, FormatterRegistry, FsMgrError, FstabEntry};
use log::{error, info};
use std::sync::Arc;

/// Routes a declaration to the formatter for its declared type.
pub struct FormatManager {
    registry: Arc<FormatterRegistry>,
}

impl FormatManager {
    pub fn new(registry: Arc<FormatterRegistry>) -> Self {
        Self { registry }
    }

    /// Builds the request for `entry`. Unsupported types are rejected here,
    /// before any device is opened.
    pub fn prepare(&self, entry: &FstabEntry) -> Result<FormatRequest, FsMgrError> {
        let fs_type = entry
            .declared_type()
            .ok_or_else(|| FsMgrError::UnsupportedFsType(entry.fs_type.clone()))?;

        Ok(FormatRequest {
            fs_type,
            blk_device: entry.blk_device.clone(),
            mount_point: entry.mount_point.clone(),
            needs_footer: entry.needs_footer(),
        })
    }

    pub fn do_format(&self, entry: &FstabEntry) -> Result<(), FsMgrError> {
        let request = match self.prepare(entry) {
            Ok(request) => request,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        info!(
            "Formatting {} as '{}'{}.",
            entry.blk_device.display(),
            entry.fs_type,
            if request.needs_footer { ", with footer" } else { "" }
        );

        let formatter = self
            .registry
            .get_formatter(request.fs_type)
            .ok_or_else(|| FsMgrError::UnsupportedFsType(entry.fs_type.clone()))?;

        formatter.format(&request)
    }

    /// Same as [`do_format`](Self::do_format), reporting 0 on success and the
    /// failure's negative status otherwise.
    pub fn do_format_status(&self, entry: &FstabEntry) -> i32 {
        match self.do_format(entry) {
            Ok(()) => 0,
            Err(e) => e.status(),
        }
    }
}
