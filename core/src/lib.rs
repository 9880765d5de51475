pub mod crypt;
pub mod device;
pub mod error;
pub mod filesystem;
pub mod format;
pub mod fstab;
pub mod process;
pub mod registry;
pub mod superblock;

pub use crypt::{is_partition_encrypted, probe_footer, CRYPT_FOOTER_OFFSET, CRYPT_MAGIC};
pub use device::{AccessMode, BlockDevice, SECTOR_SIZE};
pub use error::FsMgrError;
pub use filesystem::{FilesystemFormatter, FormatRequest};
pub use format::FormatManager;
pub use fstab::{FsType, FstabEntry, KeyLocation, CRYPT_KEY_IN_FOOTER};
pub use process::{run_to_exit, HelperChild, HelperLauncher, HelperState, WaitEvent};
pub use registry::FormatterRegistry;
pub use superblock::{identify, identify_fs, scan_device, SuperblockSignature};
