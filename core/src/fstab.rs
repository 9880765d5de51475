use crate::FsMgrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Key location value meaning the crypto footer lives in the last sectors of
/// the block device itself.
pub const CRYPT_KEY_IN_FOOTER: &str = "footer";

/// Filesystem types this crate knows how to identify and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    Ext4,
    F2fs,
}

impl FsType {
    /// Matches a declared type by its four-character prefix, so `"ext4"` and
    /// `"f2fs"` qualify as well as longer spellings starting with them.
    pub fn from_declared(fs_type: &str) -> Option<Self> {
        let prefix = fs_type.as_bytes().get(..4)?;
        match prefix {
            b"ext4" => Some(FsType::Ext4),
            b"f2fs" => Some(FsType::F2fs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FsType::Ext4 => "ext4",
            FsType::F2fs => "f2fs",
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the encryption footer of an entry is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation<'a> {
    /// Absolute path to a separate key file; the footer starts at offset 0.
    File(&'a Path),
    /// Last `CRYPT_FOOTER_OFFSET` bytes of the block device.
    Footer,
}

impl<'a> KeyLocation<'a> {
    pub fn parse(key_loc: &'a str) -> Result<Self, FsMgrError> {
        if key_loc.starts_with('/') {
            Ok(KeyLocation::File(Path::new(key_loc)))
        } else if key_loc == CRYPT_KEY_IN_FOOTER {
            Ok(KeyLocation::Footer)
        } else {
            Err(FsMgrError::InvalidKeyLocation(key_loc.to_string()))
        }
    }
}

/// One filesystem declaration as produced by the fstab parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FstabEntry {
    pub blk_device: PathBuf,
    pub fs_type: String,
    pub mount_point: PathBuf,
    #[serde(default)]
    pub key_loc: Option<String>,
    #[serde(default)]
    pub encryptable: bool,
}

impl FstabEntry {
    pub fn new(
        blk_device: impl Into<PathBuf>,
        fs_type: impl Into<String>,
        mount_point: impl Into<PathBuf>,
    ) -> Self {
        Self {
            blk_device: blk_device.into(),
            fs_type: fs_type.into(),
            mount_point: mount_point.into(),
            key_loc: None,
            encryptable: false,
        }
    }

    pub fn with_key_loc(mut self, key_loc: impl Into<String>) -> Self {
        self.key_loc = Some(key_loc.into());
        self
    }

    pub fn encryptable(mut self, encryptable: bool) -> Self {
        self.encryptable = encryptable;
        self
    }

    pub fn declared_type(&self) -> Option<FsType> {
        FsType::from_declared(&self.fs_type)
    }

    /// True when the key location is the footer sentinel. This is a property
    /// of the declaration, not of what is currently on the device.
    pub fn needs_footer(&self) -> bool {
        self.key_loc.as_deref() == Some(CRYPT_KEY_IN_FOOTER)
    }

    pub fn key_location(&self) -> Result<KeyLocation<'_>, FsMgrError> {
        match self.key_loc.as_deref() {
            Some(key_loc) => KeyLocation::parse(key_loc),
            None => Err(FsMgrError::InvalidKeyLocation("<none>".to_string())),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FsMgrError> {
        Ok(serde_json::from_str(json)?)
    }
}
