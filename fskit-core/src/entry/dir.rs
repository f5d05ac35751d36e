use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::archive::{self, ArchiveFormat};
use crate::group::Group;
use crate::mode::Mode;
use crate::path::Workdir;

use super::file::FileEntry;
use super::{Entry, Location};

/// A directory on disk. Contents are queried live from the OS on every
/// call; there is no listing cache, so a read after a write always sees
/// the write.
#[derive(Debug, Clone)]
pub struct DirEntry {
    loc: Location,
}

impl DirEntry {
    pub fn open(input: &str, workdir: &Workdir) -> Result<Self> {
        Ok(Self::from_location(Location::resolve(input, workdir)?))
    }

    pub(crate) fn from_location(loc: Location) -> Self {
        Self { loc }
    }

    pub fn location(&self) -> &Location {
        &self.loc
    }

    pub fn path(&self) -> &Path {
        self.loc.path()
    }

    pub fn name(&self) -> &str {
        self.loc.name()
    }

    pub fn exists(&self) -> bool {
        self.loc.exists()
    }

    pub fn parent(&self) -> Result<DirEntry> {
        self.loc.parent()
    }

    /// The directory one level up (an alias for [`DirEntry::parent`] that
    /// reads better next to [`DirEntry::child`]).
    pub fn ascend(&self) -> Result<DirEntry> {
        self.parent()
    }

    /// The entry for a named item inside, classified from disk.
    pub fn child(&self, name: &str) -> Entry {
        Entry::from_path(self.path().join(name))
    }

    /// Names of the items inside, in OS order (unsorted).
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.read_dir()? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Absolute paths of the items inside, in OS order.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in self.read_dir()? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    /// Wrapped entries for the items inside, in OS order.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self.paths()?.into_iter().map(Entry::from_path).collect())
    }

    /// Names sorted lexicographically, `ls`-style.
    pub fn ls(&self) -> Result<Vec<String>> {
        let mut names = self.names()?;
        names.sort();
        Ok(names)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.names()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_dir()?.next().is_none())
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir(self.path())
            .with_context(|| format!("Failed to create {}", self.path().display()))
    }

    /// Remove everything inside by deleting and recreating the directory.
    pub fn empty(&self) -> Result<()> {
        self.delete()?;
        self.create()
    }

    /// Remove the directory tree. A symlinked directory removes only the
    /// link, never the tree behind it.
    pub fn delete(&self) -> Result<()> {
        let kind = self.loc.kind()?;
        if kind.is_symlink() {
            fs::remove_file(self.path())
                .with_context(|| format!("Failed to remove link {}", self.path().display()))
        } else {
            fs::remove_dir_all(self.path())
                .with_context(|| format!("Failed to remove {}", self.path().display()))
        }
    }

    /// Own stat size plus the stat size of everything below, depth first.
    /// Symlinks are counted but not followed, so link loops cannot recurse.
    pub fn recursive_size(&self) -> Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(self.path()).follow_links(false) {
            let entry = entry.context("Failed to walk directory")?;
            total += entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?
                .len();
        }
        Ok(total)
    }

    /// Recursive tree copy to an absolute path; the source is untouched.
    /// Copying a symlinked directory copies the link itself.
    pub fn copy(&self, new_path: &Path) -> Result<DirEntry> {
        if self.loc.kind()?.is_symlink() {
            copy_symlink(self.path(), new_path)?;
        } else {
            copy_tree(self.path(), new_path)?;
        }
        Ok(DirEntry::from_location(Location::from_absolute(
            new_path.to_path_buf(),
        )))
    }

    /// Copy into `target` under `new_name` (default: current name).
    pub fn copy_into(&self, target: &DirEntry, new_name: Option<&str>) -> Result<DirEntry> {
        let new_path = target.path().join(new_name.unwrap_or(self.name()));
        self.copy(&new_path)
    }

    pub fn move_into(&mut self, target: &DirEntry) -> Result<()> {
        self.loc.move_into(target)
    }

    pub fn rename_to(&mut self, new_name: &str) -> Result<()> {
        self.loc.rename_to(new_name)
    }

    /// Delete the named children. Names that are not present warn and are
    /// skipped; this is bulk cleanup, not a precondition check.
    pub fn remove(&self, names: &[&str]) -> Result<()> {
        let present = self.names()?;
        for &name in names {
            if present.iter().any(|n| n == name) {
                self.child(name).delete()?;
            } else {
                tracing::warn!(name, dir = %self.path().display(), "nothing to remove");
            }
        }
        Ok(())
    }

    /// Copy the given external items into this directory. A name collision
    /// probes `name_1`, `name_2`, ... for the smallest free suffix rather
    /// than overwriting. Returns the entries created inside.
    pub fn insert(&self, paths: &[PathBuf]) -> Result<Vec<Entry>> {
        let mut inserted = Vec::new();
        for path in paths {
            let item = Entry::from_path(path.clone());
            if !item.exists() {
                bail!("Cannot insert non-existent {}", path.display());
            }
            let present = self.names()?;
            let name = if present.iter().any(|n| n == item.name()) {
                let free = free_name(item.name(), &present);
                tracing::warn!(
                    original = item.name(),
                    renamed = %free,
                    dir = %self.path().display(),
                    "name collision on insert"
                );
                Some(free)
            } else {
                None
            };
            inserted.push(item.copy_into(self, name.as_deref())?);
        }
        Ok(inserted)
    }

    /// Depth-first chmod of the contents (not the directory itself):
    /// `file_mode` applies to files, `dir_mode` to directories, either may
    /// be omitted.
    #[cfg(unix)]
    pub fn set_mode_recursive(
        &self,
        file_mode: Option<Mode>,
        dir_mode: Option<Mode>,
    ) -> Result<()> {
        for entry in WalkDir::new(self.path()).min_depth(1).follow_links(false) {
            let entry = entry.context("Failed to walk directory")?;
            let mode = if entry.file_type().is_dir() {
                dir_mode
            } else {
                file_mode
            };
            if let Some(mode) = mode {
                Location::from_absolute(entry.path().to_path_buf()).set_mode(mode)?;
            }
        }
        Ok(())
    }

    /// Depth-first chown of the contents (not the directory itself).
    #[cfg(unix)]
    pub fn change_owner_recursive(&self, uid: u32, gid: u32) -> Result<()> {
        for entry in WalkDir::new(self.path()).min_depth(1).follow_links(false) {
            let entry = entry.context("Failed to walk directory")?;
            std::os::unix::fs::chown(entry.path(), Some(uid), Some(gid))
                .with_context(|| format!("Failed to chown {}", entry.path().display()))?;
        }
        Ok(())
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.loc.set_mode(mode)
    }

    #[cfg(unix)]
    pub fn change_owner(&self, uid: u32, gid: u32) -> Result<()> {
        self.loc.change_owner(uid, gid)
    }

    /// Archive this directory tree as `base_name` (default: the directory
    /// name) inside `dest_dir`, returning the archive file. The format's
    /// extension is appended to the base name.
    pub fn make_archive(
        &self,
        base_name: Option<&str>,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<FileEntry> {
        let base = dest_dir.join(base_name.unwrap_or(self.name()));
        let written = archive::make(self.path(), &base, format)?;
        Ok(FileEntry::from_location(Location::from_absolute(written)))
    }

    /// Snapshot the contents into a [`Group`] named after this directory.
    pub fn group(&self) -> Result<Group> {
        Ok(Group::new(self.name(), self.entries()?))
    }

    fn read_dir(&self) -> Result<fs::ReadDir> {
        if !self.exists() {
            bail!("Directory not found: {}", self.path().display());
        }
        if !self.path().is_dir() {
            bail!("Path is not a directory: {}", self.path().display());
        }
        fs::read_dir(self.path())
            .with_context(|| format!("Failed to read directory {}", self.path().display()))
    }
}

/// Smallest free `base_N` name with N probing 1, 2, ... upward.
fn free_name(base: &str, taken: &[String]) -> String {
    let mut index = 1;
    loop {
        let candidate = format!("{base}_{index}");
        if !taken.iter().any(|n| *n == candidate) {
            return candidate;
        }
        index += 1;
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    // A destination inside the source would be walked as it is being
    // written, re-copying its own output until the OS gives up and
    // polluting the source tree on the way. Reject it up front.
    if dest.starts_with(src) {
        bail!(
            "Cannot copy {} into itself ({})",
            src.display(),
            dest.display()
        );
    }
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.context("Failed to walk directory")?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Walked outside the copy root")?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let points_at = fs::read_link(src)
        .with_context(|| format!("Failed to read link {}", src.display()))?;
    std::os::unix::fs::symlink(points_at, dest)
        .with_context(|| format!("Failed to recreate link at {}", dest.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy link {}", src.display()))?;
    Ok(())
}
