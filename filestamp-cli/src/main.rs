mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use filestamp_core::{
    ChecksumConfig, DigestAlgorithm, FileChecksum, FileInfo, Fingerprint, TreeConfig,
    TreeMessage, TreeScanner,
};
use log::debug;

/// fstamp - inspect the file identity an incremental build would record
#[derive(Parser, Debug)]
#[command(name = "fstamp")]
#[command(about = "Print stat signatures and content checksums of paths")]
#[command(version)]
struct Args {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stat signature of each path
    Info {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report symbolic links themselves instead of their targets
        #[arg(long)]
        no_follow: bool,
    },

    /// Print the content checksum of each path
    Checksum {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Digest algorithm (sha256 or blake3)
        #[arg(short, long, default_value_t = DigestAlgorithm::Sha256)]
        algorithm: DigestAlgorithm,
    },

    /// Snapshot a directory tree and print its signature
    Tree {
        root: PathBuf,

        /// Follow symbolic links
        #[arg(short, long)]
        follow_symlinks: bool,

        /// Maximum depth to scan
        #[arg(short, long)]
        max_depth: Option<usize>,

        /// Include file content checksums in the signature
        #[arg(short, long)]
        checksums: bool,

        /// Digest algorithm for file checksums
        #[arg(short, long, default_value_t = DigestAlgorithm::Sha256)]
        algorithm: DigestAlgorithm,

        /// Print every entry
        #[arg(short, long)]
        list: bool,
    },

    /// Compare the fingerprints of two paths
    Compare {
        old: PathBuf,
        new: PathBuf,

        /// Let content checksums decide when metadata differs
        #[arg(short, long)]
        checksums: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Info { paths, no_follow } => {
            for path in paths {
                let info = FileInfo::for_path(&path, !no_follow);
                println!("{}", output::format_info(&path, &info));
            }
        }
        Command::Checksum { paths, algorithm } => {
            let config = ChecksumConfig::with_algorithm(algorithm);
            for path in paths {
                let checksum = FileChecksum::for_path_with(&path, &config)
                    .wrap_err_with(|| format!("Failed to checksum {}", path.display()))?;
                println!("{}", output::format_checksum(&path, &checksum));
            }
        }
        Command::Tree {
            root,
            follow_symlinks,
            max_depth,
            checksums,
            algorithm,
            list,
        } => {
            let config = TreeConfig {
                follow_symlinks,
                max_depth,
                num_threads: 0,
                checksums: checksums.then(|| ChecksumConfig::with_algorithm(algorithm)),
            };
            run_tree(root, config, list)?;
        }
        Command::Compare { old, new, checksums } => {
            let config = checksums.then(ChecksumConfig::default);
            let before = Fingerprint::capture(&old, true, config.as_ref())
                .wrap_err_with(|| format!("Failed to fingerprint {}", old.display()))?;
            let after = Fingerprint::capture(&new, true, config.as_ref())
                .wrap_err_with(|| format!("Failed to fingerprint {}", new.display()))?;
            println!("{}", before.compare(&after));
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run_tree(root: PathBuf, config: TreeConfig, list: bool) -> Result<()> {
    let (rx, handle) = TreeScanner::new(config).scan(root.clone());

    for msg in rx {
        match msg {
            TreeMessage::Progress(p) => {
                debug!(
                    "{} entries, {} bytes hashed, {} errors",
                    p.total_entries(),
                    p.bytes_hashed,
                    p.errors
                );
            }
            TreeMessage::Cancelled => debug!("scan cancelled"),
            _ => {}
        }
    }

    let snapshot = handle
        .join()
        .map_err(|_| color_eyre::eyre::eyre!("Tree scan thread panicked"))?
        .wrap_err_with(|| format!("Failed to scan {}", root.display()))?;

    if list {
        for (path, fingerprint) in snapshot.iter() {
            println!("{}", output::format_entry(path, fingerprint));
        }
    }

    println!("{}", output::format_tree_summary(&snapshot));
    Ok(())
}
