use std::path::PathBuf;
use thiserror::Error;

/// `EINVAL`, reported for configuration errors so callers can tell them
/// apart from device failures.
pub const EINVAL: i32 = 22;

#[derive(Debug, Error)]
pub enum FsMgrError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot get block device size of {path}: {source}")]
    DeviceSize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File system type '{0}' is not supported")]
    UnsupportedFsType(String),

    #[error("Invalid key location: {0}")]
    InvalidKeyLocation(String),

    #[error("Device {path} is too small ({size} bytes) to reserve a {reserved} byte footer")]
    DeviceTooSmall {
        path: PathBuf,
        size: u64,
        reserved: u64,
    },

    #[error("Cannot wipe crypto footer on {path}: {source}")]
    FooterWipe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("make_ext4fs returned {0}")]
    Ext4Builder(i32),

    #[error("Failed to start {program}: {source}")]
    HelperSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error waiting for child process: {0}")]
    HelperWait(String),

    #[error("Helper exited with status {0}")]
    HelperExit(i32),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FsMgrError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsMgrError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FsMgrError::UnsupportedFsType(_)
                | FsMgrError::InvalidKeyLocation(_)
                | FsMgrError::Configuration(_)
                | FsMgrError::Serialization(_)
        )
    }

    /// Negative status code for callers that speak the integer contract.
    pub fn status(&self) -> i32 {
        if self.is_configuration() {
            -EINVAL
        } else {
            -1
        }
    }
}
