use crate::{FilesystemFormatter, FsType};
use std::collections::HashMap;
use std::sync::Arc;

pub struct FormatterRegistry {
    formatters: HashMap<FsType, Arc<dyn FilesystemFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Registers `formatter` under its own type, replacing any previous one.
    pub fn register(&mut self, formatter: Arc<dyn FilesystemFormatter>) {
        self.formatters.insert(formatter.fs_type(), formatter);
    }

    pub fn get_formatter(&self, fs_type: FsType) -> Option<Arc<dyn FilesystemFormatter>> {
        self.formatters.get(&fs_type).cloned()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
