use crate::ext4::{Ext4Builder, Ext4Formatter};
use crate::f2fs::F2fsFormatter;
use fsmgr_core::{FormatterRegistry, HelperLauncher};
use log::debug;
use std::sync::Arc;

/// Registers the ext4 and f2fs formatters.
pub fn register_builtin_formatters<B>(
    registry: &mut FormatterRegistry,
    launcher: Arc<dyn HelperLauncher>,
    builder: B,
) where
    B: Ext4Builder + 'static,
{
    let ext4 = Ext4Formatter::new(builder);
    debug!("ext4 block size: {:?}", ext4.block_size());
    registry.register(Arc::new(ext4));

    registry.register(Arc::new(F2fsFormatter::new(launcher)));
}

/// A registry holding only the built-in formatters.
pub fn builtin_registry<B>(launcher: Arc<dyn HelperLauncher>, builder: B) -> FormatterRegistry
where
    B: Ext4Builder + 'static,
{
    let mut registry = FormatterRegistry::new();
    register_builtin_formatters(&mut registry, launcher, builder);
    registry
}
