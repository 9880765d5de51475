use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use fsmgr_core::{identify_fs, is_partition_encrypted, FormatManager, FstabEntry};
use fsmgr_formatters::{builtin_registry, F2fsFormatter, Mke2fsBuilder};
use fsmgr_platform::PlatformLauncher;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fsmgr")]
#[command(about = "Identify, check and format block devices before mount", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a device holds its declared filesystem type
    Identify(EntryArgs),
    /// Check a device for an encryption footer
    Encrypted(EntryArgs),
    /// Format a device with its declared filesystem type
    Format {
        #[command(flatten)]
        entry: EntryArgs,
        /// mkfs.f2fs helper to run instead of the default
        #[arg(long)]
        f2fs_helper: Option<PathBuf>,
        /// mke2fs binary (looked up on PATH if omitted)
        #[arg(long)]
        mke2fs: Option<PathBuf>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct EntryArgs {
    /// JSON file holding one fstab entry
    #[arg(long, conflicts_with_all = ["device", "fs_type"])]
    entry: Option<PathBuf>,
    /// Block device
    #[arg(short, long)]
    device: Option<PathBuf>,
    /// Declared filesystem type (ext4, f2fs)
    #[arg(short = 't', long = "type")]
    fs_type: Option<String>,
    /// Mount point hint
    #[arg(short, long, default_value = "/data")]
    mount_point: PathBuf,
    /// Key location: an absolute path or "footer"
    #[arg(short, long)]
    key_loc: Option<String>,
    /// Entry is encryptable
    #[arg(long)]
    encryptable: bool,
}

impl EntryArgs {
    fn into_entry(self) -> anyhow::Result<FstabEntry> {
        if let Some(path) = self.entry {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(FstabEntry::from_json(&json)?);
        }

        let (Some(device), Some(fs_type)) = (self.device, self.fs_type) else {
            bail!("Either --entry or both --device and --type are required");
        };

        let mut entry = FstabEntry::new(device, fs_type, self.mount_point)
            .encryptable(self.encryptable);
        entry.key_loc = self.key_loc;
        Ok(entry)
    }
}

fn confirm(entry: &FstabEntry) -> anyhow::Result<bool> {
    use std::io::{self, BufRead};

    println!(
        "WARNING: This will ERASE ALL DATA on {}!",
        entry.blk_device.display()
    );
    println!("Type 'yes' to continue: ");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim() == "yes")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify(args) => {
            let entry = args.into_entry()?;
            if !identify_fs(&entry) {
                bail!(
                    "{} does not hold a '{}' filesystem",
                    entry.blk_device.display(),
                    entry.fs_type
                );
            }
            println!("{}: {}", entry.blk_device.display(), entry.fs_type);
        }
        Commands::Encrypted(args) => {
            let entry = args.into_entry()?;
            let state = if is_partition_encrypted(&entry) {
                "encrypted"
            } else {
                "not encrypted"
            };
            println!("{}: {}", entry.blk_device.display(), state);
        }
        Commands::Format {
            entry,
            f2fs_helper,
            mke2fs,
            yes,
        } => {
            let entry = entry.into_entry()?;

            let builder = match mke2fs {
                Some(program) => Mke2fsBuilder::with_program(program),
                None => Mke2fsBuilder::new(),
            };

            let mut registry = builtin_registry(Arc::new(PlatformLauncher), builder);
            if let Some(helper) = f2fs_helper {
                registry.register(Arc::new(
                    F2fsFormatter::new(Arc::new(PlatformLauncher)).with_helper(helper),
                ));
            }
            let manager = FormatManager::new(Arc::new(registry));

            if !yes && !confirm(&entry)? {
                println!("Format cancelled.");
                return Ok(());
            }

            manager
                .do_format(&entry)
                .with_context(|| format!("Format of {} failed", entry.blk_device.display()))?;
            println!("Format completed successfully!");
        }
    }

    Ok(())
}
