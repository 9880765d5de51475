pub mod ext4;
pub mod f2fs;
pub mod mke2fs;
pub mod registration;

pub use ext4::{sanitize_block_size, Ext4Builder, Ext4Formatter, Ext4FsInfo};
pub use f2fs::{F2fsFormatter, MKFS_F2FS};
pub use mke2fs::Mke2fsBuilder;

pub use registration::{builtin_registry, register_builtin_formatters};
