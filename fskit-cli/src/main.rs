use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fskit_core::{ArchiveFormat, DirEntry, Entry, FileEntry, Mode, Workdir};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "fskit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Object-style filesystem helpers from the terminal")]
struct Args {
    /// Resolve relative paths against this directory instead of the
    /// process working directory
    #[arg(long, global = true, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory's contents
    Ls {
        /// Directory to list (default: the workdir)
        path: Option<String>,
        /// Emit a JSON array instead of plain names
        #[arg(long)]
        json: bool,
        /// Sort names lexicographically
        #[arg(long)]
        sorted: bool,
    },
    /// Print an entry's size (recursive for directories)
    Size { path: String },
    /// Print what a path is (file, directory, symlink)
    Kind { path: String },
    /// Copy items into a directory, suffixing colliding names
    Insert {
        /// Target directory
        dir: String,
        /// Items to copy in
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Apply an `ls -l`-style mode string ('-rw-r--r--')
    Chmod {
        path: String,
        mode: String,
        /// Apply the mode to everything inside a directory too
        #[arg(short, long)]
        recursive: bool,
    },
    /// Pack a directory into an archive
    Pack {
        /// Directory to archive
        dir: String,
        /// Archive format: zip, tar, gztar or bztar
        #[arg(long, default_value = "gztar")]
        format: ArchiveFormat,
        /// Directory to write the archive into (default: the workdir)
        #[arg(long)]
        dest: Option<String>,
    },
    /// Extract an archive
    Unpack {
        /// Archive file
        archive: String,
        /// Directory to extract into (default: the workdir)
        #[arg(long)]
        dest: Option<String>,
    },
    /// Replace occurrences of a literal pattern in a text file
    Replace {
        file: String,
        old: String,
        new: String,
        /// Replace at most this many occurrences, left to right
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print byte offsets of a literal pattern in a text file
    Find {
        file: String,
        pattern: String,
        /// Print every occurrence instead of the first
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.quiet)?;

    let workdir = match &args.workdir {
        Some(dir) => {
            // A relative --workdir is itself resolved against the process cwd.
            let base = Workdir::current()?.resolve(&dir.to_string_lossy())?;
            Workdir::new(base)?
        }
        None => Workdir::current()?,
    };
    tracing::debug!(workdir = %workdir.base().display(), "resolved workdir");

    match args.command {
        Command::Ls { path, json, sorted } => {
            let dir = open_dir(path.as_deref().unwrap_or("."), &workdir)?;
            commands::ls(&dir, json, sorted)
        }
        Command::Size { path } => {
            let entry = Entry::open(&path, &workdir)?;
            println!("{}", entry.size()?);
            Ok(())
        }
        Command::Kind { path } => {
            let entry = Entry::open(&path, &workdir)?;
            println!("{}", serde_json::to_string(&entry.kind()?)?);
            Ok(())
        }
        Command::Insert { dir, items } => {
            let dir = open_dir(&dir, &workdir)?;
            let paths = items
                .iter()
                .map(|item| workdir.resolve(item))
                .collect::<Result<Vec<_>>>()?;
            let inserted = dir.insert(&paths)?;
            for entry in inserted {
                println!("{}", entry.path().display());
            }
            Ok(())
        }
        Command::Chmod {
            path,
            mode,
            recursive,
        } => {
            let mode: Mode = mode.parse()?;
            let entry = Entry::open(&path, &workdir)?;
            entry.set_mode(mode)?;
            if recursive {
                let dir = entry
                    .as_dir()
                    .context("--recursive requires a directory")?;
                commands::chmod_recursive(dir, mode)?;
            }
            Ok(())
        }
        Command::Pack { dir, format, dest } => {
            let dir = open_dir(&dir, &workdir)?;
            let dest = workdir.resolve(dest.as_deref().unwrap_or("."))?;
            let archive = dir.make_archive(None, format, &dest)?;
            println!("{}", archive.path().display());
            Ok(())
        }
        Command::Unpack { archive, dest } => {
            let file = FileEntry::open(&archive, &workdir)?;
            let dest = workdir.resolve(dest.as_deref().unwrap_or("."))?;
            let extracted = file.unpack_archive(&dest, None)?;
            println!("{}", extracted.path().display());
            Ok(())
        }
        Command::Replace {
            file,
            old,
            new,
            limit,
        } => {
            let file = FileEntry::open(&file, &workdir)?;
            let count = file.replace(&old, &new, limit)?;
            println!("{count}");
            Ok(())
        }
        Command::Find { file, pattern, all } => {
            let file = FileEntry::open(&file, &workdir)?;
            if all {
                for offset in file.find_all(&pattern)? {
                    println!("{offset}");
                }
            } else if let Some(offset) = file.find(&pattern)? {
                println!("{offset}");
            }
            Ok(())
        }
    }
}

fn open_dir(path: &str, workdir: &Workdir) -> Result<DirEntry> {
    let entry = Entry::open(path, workdir)?;
    match entry {
        Entry::Dir(dir) => Ok(dir),
        Entry::File(file) => anyhow::bail!("{} is not a directory", file.path().display()),
    }
}

fn setup_tracing(quiet: bool) -> Result<()> {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
