//! Archive creation and extraction for the four formats the wrappers
//! support: zip and the tar family (plain, gzip, bzip2). Tar archives
//! store the directory tree under the directory's own name, so unpacking
//! next to the source recreates a sibling of it.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use strum::{Display, EnumString};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    GzTar,
    BzTar,
}

impl ArchiveFormat {
    /// The file extension appended to an archive base name, dot included.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::GzTar => ".tar.gz",
            ArchiveFormat::BzTar => ".tar.bz2",
        }
    }

    /// Infer the format from an archive file name.
    pub fn from_path(path: &Path) -> Option<ArchiveFormat> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::GzTar)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(ArchiveFormat::BzTar)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }
}

/// Archive the directory at `src_dir` to `dest_base` plus the format's
/// extension, returning the path actually written.
pub fn make(src_dir: &Path, dest_base: &Path, format: ArchiveFormat) -> Result<PathBuf> {
    if !src_dir.is_dir() {
        bail!("Archive source is not a directory: {}", src_dir.display());
    }
    let mut dest = dest_base.as_os_str().to_owned();
    dest.push(format.extension());
    let dest = PathBuf::from(dest);

    let out = File::create(&dest)
        .with_context(|| format!("Failed to create archive {}", dest.display()))?;
    let root_name = crate::path::file_name(src_dir);

    match format {
        ArchiveFormat::Tar => {
            let mut builder = tar::Builder::new(out);
            builder.append_dir_all(&root_name, src_dir)?;
            builder.finish()?;
        }
        ArchiveFormat::GzTar => {
            let encoder = GzEncoder::new(out, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(&root_name, src_dir)?;
            builder.into_inner()?.finish()?;
        }
        ArchiveFormat::BzTar => {
            let encoder = BzEncoder::new(out, bzip2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(&root_name, src_dir)?;
            builder.into_inner()?.finish()?;
        }
        ArchiveFormat::Zip => {
            write_zip(src_dir, &root_name, out)?;
        }
    }

    tracing::debug!(archive = %dest.display(), %format, "archive written");
    Ok(dest)
}

fn write_zip(src_dir: &Path, root_name: &str, out: File) -> Result<()> {
    let mut zip = zip::ZipWriter::new(out);
    let options = zip::write::SimpleFileOptions::default();

    for entry in WalkDir::new(src_dir).follow_links(false) {
        let entry = entry.context("Failed to walk archive source")?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .context("Walked outside the archive source")?;
        let stored = if relative.as_os_str().is_empty() {
            root_name.to_string()
        } else {
            format!("{root_name}/{}", relative.to_string_lossy())
        };
        if entry.file_type().is_dir() {
            zip.add_directory(stored, options)?;
        } else {
            zip.start_file(stored, options)?;
            let mut src = File::open(entry.path())
                .with_context(|| format!("Failed to open {}", entry.path().display()))?;
            io::copy(&mut src, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}

/// Extract `archive` into `dest`, inferring the format from the file name
/// when not given explicitly.
pub fn unpack(archive: &Path, dest: &Path, format: Option<ArchiveFormat>) -> Result<()> {
    let format = match format.or_else(|| ArchiveFormat::from_path(archive)) {
        Some(format) => format,
        None => bail!(
            "Cannot infer archive format from {}, pass one explicitly",
            archive.display()
        ),
    };

    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive {}", archive.display()))?;

    match format {
        ArchiveFormat::Tar => tar::Archive::new(file).unpack(dest)?,
        ArchiveFormat::GzTar => tar::Archive::new(GzDecoder::new(file)).unpack(dest)?,
        ArchiveFormat::BzTar => tar::Archive::new(BzDecoder::new(file)).unpack(dest)?,
        ArchiveFormat::Zip => {
            zip::ZipArchive::new(file)
                .with_context(|| format!("Failed to read archive {}", archive.display()))?
                .extract(dest)?;
        }
    }

    Ok(())
}
