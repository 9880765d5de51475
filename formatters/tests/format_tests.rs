/// Format dispatch and adapter behaviour against disk images, with the
/// external builders replaced by recording doubles.

#[cfg(test)]
mod format_tests {
    use fsmgr_core::{
        BlockDevice, FormatManager, FormatterRegistry, FsMgrError, FstabEntry, HelperChild,
        HelperLauncher, WaitEvent, CRYPT_FOOTER_OFFSET, CRYPT_MAGIC,
    };
    use fsmgr_formatters::{
        builtin_registry, Ext4Builder, Ext4Formatter, Ext4FsInfo, F2fsFormatter, Mke2fsBuilder,
    };
    use fsmgr_platform::PlatformLauncher;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    const IMAGE_SIZE: u64 = 1024 * 1024;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn image_with_footer_magic() -> NamedTempFile {
        let mut image = NamedTempFile::new().unwrap();
        image.as_file().set_len(IMAGE_SIZE).unwrap();
        image
            .seek(SeekFrom::Start(IMAGE_SIZE - CRYPT_FOOTER_OFFSET))
            .unwrap();
        image.write_all(&CRYPT_MAGIC.to_le_bytes()).unwrap();
        image.flush().unwrap();
        image
    }

    fn footer_bytes(image: &NamedTempFile) -> Vec<u8> {
        let mut file = image.reopen().unwrap();
        file.seek(SeekFrom::Start(IMAGE_SIZE - CRYPT_FOOTER_OFFSET))
            .unwrap();
        let mut footer = vec![0u8; CRYPT_FOOTER_OFFSET as usize];
        file.read_exact(&mut footer).unwrap();
        footer
    }

    #[derive(Clone, Default)]
    struct RecordingBuilder {
        calls: Arc<Mutex<Vec<Ext4FsInfo>>>,
        rc: i32,
    }

    impl Ext4Builder for RecordingBuilder {
        fn make_ext4fs(&self, _device: &mut BlockDevice, info: &Ext4FsInfo) -> i32 {
            self.calls.lock().unwrap().push(info.clone());
            self.rc
        }
    }

    struct ExitedChild {
        code: i32,
    }

    impl HelperChild for ExitedChild {
        fn pid(&self) -> u32 {
            1000
        }

        fn wait(&mut self) -> WaitEvent {
            WaitEvent::Exited {
                pid: 1000,
                code: self.code,
            }
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        spawned: Mutex<Vec<(PathBuf, Vec<String>)>>,
        code: i32,
    }

    impl HelperLauncher for RecordingLauncher {
        fn spawn(
            &self,
            program: &Path,
            args: &[String],
        ) -> Result<Box<dyn HelperChild>, FsMgrError> {
            self.spawned
                .lock()
                .unwrap()
                .push((program.to_path_buf(), args.to_vec()));
            Ok(Box::new(ExitedChild { code: self.code }))
        }
    }

    fn manager(builder: RecordingBuilder, launcher: Arc<RecordingLauncher>) -> FormatManager {
        FormatManager::new(Arc::new(builtin_registry(launcher, builder)))
    }

    #[test]
    fn ext4_with_footer_wipes_stale_footer() {
        init_logging();
        let image = image_with_footer_magic();
        let builder = RecordingBuilder::default();
        let launcher = Arc::new(RecordingLauncher::default());
        let manager = manager(builder.clone(), launcher.clone());

        let entry = FstabEntry::new(image.path(), "ext4", "/data").with_key_loc("footer");
        manager.do_format(&entry).unwrap();

        assert!(footer_bytes(&image).iter().all(|b| *b == 0));

        let calls = builder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len, IMAGE_SIZE);
        assert_eq!(calls[0].reserved_tail, CRYPT_FOOTER_OFFSET);
        assert_eq!(calls[0].usable_len(), IMAGE_SIZE - CRYPT_FOOTER_OFFSET);
        assert_eq!(calls[0].mount_point, PathBuf::from("/data"));
        assert!(launcher.spawned.lock().unwrap().is_empty());
    }

    #[test]
    fn ext4_without_footer_leaves_tail_alone() {
        let image = image_with_footer_magic();
        let builder = RecordingBuilder::default();
        let manager = manager(builder.clone(), Arc::new(RecordingLauncher::default()));

        let entry = FstabEntry::new(image.path(), "ext4", "/cache");
        manager.do_format(&entry).unwrap();

        assert_eq!(&footer_bytes(&image)[..4], &CRYPT_MAGIC.to_le_bytes());
        let calls = builder.calls.lock().unwrap();
        assert_eq!(calls[0].reserved_tail, 0);
        assert_eq!(calls[0].usable_len(), IMAGE_SIZE);
    }

    #[test]
    fn ext4_builder_failure_is_reported() {
        let image = image_with_footer_magic();
        let builder = RecordingBuilder {
            rc: 7,
            ..Default::default()
        };
        let manager = manager(builder, Arc::new(RecordingLauncher::default()));

        let entry = FstabEntry::new(image.path(), "ext4", "/data");
        assert!(matches!(
            manager.do_format(&entry),
            Err(FsMgrError::Ext4Builder(7))
        ));
        assert_eq!(manager.do_format_status(&entry), -1);
    }

    #[test]
    fn ext4_device_too_small_for_footer() {
        let image = NamedTempFile::new().unwrap();
        image.as_file().set_len(CRYPT_FOOTER_OFFSET / 2).unwrap();
        let builder = RecordingBuilder::default();
        let manager = manager(builder.clone(), Arc::new(RecordingLauncher::default()));

        let entry = FstabEntry::new(image.path(), "ext4", "/data").with_key_loc("footer");
        assert!(matches!(
            manager.do_format(&entry),
            Err(FsMgrError::DeviceTooSmall { .. })
        ));
        assert!(builder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn ext4_missing_device_fails() {
        let builder = RecordingBuilder::default();
        let formatter = Ext4Formatter::new(builder.clone());
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(formatter));
        let manager = FormatManager::new(Arc::new(registry));

        let entry = FstabEntry::new("/nonexistent/block/userdata", "ext4", "/data");
        assert!(matches!(manager.do_format(&entry), Err(FsMgrError::Io { .. })));
        assert!(builder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn ext4_block_size_override_reaches_builder() {
        let image = image_with_footer_magic();
        let builder = RecordingBuilder::default();
        let formatter = Ext4Formatter::new(builder.clone()).with_block_size(Some(2048));
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(formatter));
        let manager = FormatManager::new(Arc::new(registry));

        manager
            .do_format(&FstabEntry::new(image.path(), "ext4", "/data"))
            .unwrap();
        assert_eq!(builder.calls.lock().unwrap()[0].block_size, Some(2048));
    }

    #[test]
    fn f2fs_with_footer_passes_reservation() {
        let builder = RecordingBuilder::default();
        let launcher = Arc::new(RecordingLauncher::default());
        let manager = manager(builder.clone(), launcher.clone());

        let entry = FstabEntry::new("/dev/block/userdata", "f2fs", "/data").with_key_loc("footer");
        manager.do_format(&entry).unwrap();

        let spawned = launcher.spawned.lock().unwrap();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].0, PathBuf::from("/sbin/mkfs.f2fs"));
        assert_eq!(spawned[0].1, vec!["-r", "16384", "/dev/block/userdata"]);
        assert!(builder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn f2fs_key_file_reserves_nothing() {
        let launcher = Arc::new(RecordingLauncher::default());
        let manager = manager(RecordingBuilder::default(), launcher.clone());

        let entry = FstabEntry::new("/dev/block/userdata", "f2fs", "/data")
            .with_key_loc("/dev/block/metadata");
        manager.do_format(&entry).unwrap();

        assert_eq!(
            launcher.spawned.lock().unwrap()[0].1,
            vec!["-r", "0", "/dev/block/userdata"]
        );
    }

    #[test]
    fn f2fs_nonzero_exit_fails() {
        let launcher = Arc::new(RecordingLauncher {
            code: 3,
            ..Default::default()
        });
        let manager = manager(RecordingBuilder::default(), launcher);

        let entry = FstabEntry::new("/dev/block/userdata", "f2fs", "/data").with_key_loc("footer");
        assert!(matches!(
            manager.do_format(&entry),
            Err(FsMgrError::HelperExit(3))
        ));
    }

    #[test]
    fn unsupported_type_touches_nothing() {
        let builder = RecordingBuilder::default();
        let launcher = Arc::new(RecordingLauncher::default());
        let manager = manager(builder.clone(), launcher.clone());

        let entry = FstabEntry::new("/nonexistent", "btrfs", "/data").with_key_loc("footer");
        assert_eq!(manager.do_format_status(&entry), -22);
        assert!(builder.calls.lock().unwrap().is_empty());
        assert!(launcher.spawned.lock().unwrap().is_empty());
    }

    #[test]
    fn f2fs_real_helper_exit_status() {
        let request_entry = FstabEntry::new("/dev/null", "f2fs", "/data").with_key_loc("footer");

        let ok = F2fsFormatter::new(Arc::new(PlatformLauncher)).with_helper("/bin/true");
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(ok));
        assert!(FormatManager::new(Arc::new(registry))
            .do_format(&request_entry)
            .is_ok());

        let failing = F2fsFormatter::new(Arc::new(PlatformLauncher)).with_helper("/bin/false");
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(failing));
        assert!(matches!(
            FormatManager::new(Arc::new(registry)).do_format(&request_entry),
            Err(FsMgrError::HelperExit(1))
        ));
    }

    #[test]
    fn f2fs_missing_helper_fails_to_spawn() {
        let formatter =
            F2fsFormatter::new(Arc::new(PlatformLauncher)).with_helper("/nonexistent/mkfs.f2fs");
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(formatter));

        let entry = FstabEntry::new("/dev/null", "f2fs", "/data");
        assert!(matches!(
            FormatManager::new(Arc::new(registry)).do_format(&entry),
            Err(FsMgrError::HelperSpawn { .. })
        ));
    }

    #[test]
    fn f2fs_formats_without_mke2fs_installed() {
        init_logging();
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = builtin_registry(
            launcher.clone(),
            Mke2fsBuilder::with_search_path("/nonexistent/bin"),
        );
        let manager = FormatManager::new(Arc::new(registry));

        let entry = FstabEntry::new("/dev/block/userdata", "f2fs", "/data").with_key_loc("footer");
        manager.do_format(&entry).unwrap();
        assert_eq!(launcher.spawned.lock().unwrap().len(), 1);

        let image = image_with_footer_magic();
        let entry = FstabEntry::new(image.path(), "ext4", "/data");
        assert!(matches!(
            manager.do_format(&entry),
            Err(FsMgrError::Ext4Builder(-1))
        ));
    }

    #[test]
    fn mke2fs_exit_status_is_reported() {
        let image = image_with_footer_magic();
        let entry = FstabEntry::new(image.path(), "ext4", "/data");

        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(Ext4Formatter::new(Mke2fsBuilder::with_program(
            "/bin/true",
        ))));
        assert!(FormatManager::new(Arc::new(registry)).do_format(&entry).is_ok());

        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(Ext4Formatter::new(Mke2fsBuilder::with_program(
            "/bin/false",
        ))));
        let manager = FormatManager::new(Arc::new(registry));
        assert!(matches!(
            manager.do_format(&entry),
            Err(FsMgrError::Ext4Builder(1))
        ));
        assert_eq!(manager.do_format_status(&entry), -1);
    }

    #[test]
    fn mke2fs_that_cannot_start_fails() {
        let image = image_with_footer_magic();
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(Ext4Formatter::new(Mke2fsBuilder::with_program(
            "/nonexistent/mke2fs",
        ))));

        let entry = FstabEntry::new(image.path(), "ext4", "/data");
        assert!(matches!(
            FormatManager::new(Arc::new(registry)).do_format(&entry),
            Err(FsMgrError::Ext4Builder(-1))
        ));
    }
}
