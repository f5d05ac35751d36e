//! Filesystem entries: a [`Location`] is one wrapped path with the
//! operations every entry shares; [`FileEntry`] and [`DirEntry`] layer
//! file- and directory-specific behavior on top; [`Entry`] is the tagged
//! variant resolved once at construction from the observed filesystem
//! type. Nothing here caches OS state: every query hits the filesystem,
//! so reads always see the latest write at the cost of no optimization.

pub mod dir;
pub mod edit;
pub mod file;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::mode::Mode;
use crate::path::{self, Workdir};

use dir::DirEntry;
use file::FileEntry;

/// What a path points at, as observed by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    SymlinkFile,
    SymlinkDirectory,
}

impl EntryKind {
    /// Classify an existing path; `None` when it does not exist.
    pub fn of(path: &Path) -> Option<EntryKind> {
        let meta = fs::symlink_metadata(path).ok()?;
        if meta.file_type().is_symlink() {
            // Follow the link once to see what it points at.
            return match fs::metadata(path) {
                Ok(target) if target.is_dir() => Some(EntryKind::SymlinkDirectory),
                _ => Some(EntryKind::SymlinkFile),
            };
        }
        if meta.is_dir() {
            Some(EntryKind::Directory)
        } else {
            Some(EntryKind::File)
        }
    }

    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::SymlinkDirectory)
    }

    pub fn is_symlink(self) -> bool {
        matches!(self, EntryKind::SymlinkFile | EntryKind::SymlinkDirectory)
    }
}

/// One filesystem location: an absolute path plus the derived short name.
/// Both fields are recomputed together on every rename and move, so from a
/// caller's perspective they never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: PathBuf,
    name: String,
}

impl Location {
    /// Resolve a user-supplied path through the workdir context. The
    /// location may point at nothing yet; that is logged, not an error,
    /// so entries can be constructed ahead of `create()`.
    pub fn resolve(input: &str, workdir: &Workdir) -> Result<Self> {
        let path = workdir.resolve(input)?;
        let loc = Self::from_absolute(path);
        if !loc.exists() {
            tracing::warn!(path = %loc.path.display(), "entry does not exist yet");
        }
        Ok(loc)
    }

    pub(crate) fn from_absolute(path: PathBuf) -> Self {
        let name = path::file_name(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live existence check against the OS, never cached.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn metadata(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.path)
            .with_context(|| format!("Failed to stat {}", self.path.display()))
    }

    pub fn kind(&self) -> Result<EntryKind> {
        EntryKind::of(&self.path)
            .with_context(|| format!("{} does not exist", self.path.display()))
    }

    /// Size as reported by stat (not recursive; [`DirEntry::recursive_size`]
    /// is the recursive variant).
    pub fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    pub fn parent(&self) -> Result<DirEntry> {
        let parent = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;
        Ok(DirEntry::from_location(Location::from_absolute(
            parent.to_path_buf(),
        )))
    }

    /// Remove a non-directory entry. Operating on something that does not
    /// exist is a precondition violation, not a silent no-op.
    pub(crate) fn remove_file(&self) -> Result<()> {
        if !self.exists() {
            bail!("Cannot remove non-existent {}", self.path.display());
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))
    }

    /// Physically relocate into `target`, keeping the short name. Path and
    /// name are updated only after the OS move succeeds.
    pub(crate) fn move_into(&mut self, target: &DirEntry) -> Result<()> {
        if !self.exists() {
            bail!("Cannot move non-existent {}", self.path.display());
        }
        let new_path = target.path().join(&self.name);
        fs::rename(&self.path, &new_path).with_context(|| {
            format!(
                "Failed to move {} into {}",
                self.path.display(),
                target.path().display()
            )
        })?;
        self.path = new_path;
        Ok(())
    }

    /// Rename within the parent directory. Both cached fields update
    /// atomically from the caller's perspective: on error neither changes.
    pub(crate) fn rename_to(&mut self, new_name: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;
        let new_path = parent.join(new_name);
        fs::rename(&self.path, &new_path).with_context(|| {
            format!("Failed to rename {} to {new_name}", self.path.display())
        })?;
        self.path = new_path;
        self.name = new_name.to_string();
        Ok(())
    }

    /// Create a hard link named `name` (default: this entry's name) inside
    /// `target` and return its location. Linking a path to itself is
    /// rejected before touching the OS.
    pub(crate) fn hard_link(&self, target: &DirEntry, name: Option<&str>) -> Result<Location> {
        let link = target.path().join(name.unwrap_or(&self.name));
        if link == self.path {
            bail!("Cannot create hard link over itself: {}", link.display());
        }
        fs::hard_link(&self.path, &link)
            .with_context(|| format!("Failed to hard-link {}", self.path.display()))?;
        Ok(Location::from_absolute(link))
    }

    /// Create a symbolic link, with the same self-link guard as
    /// [`Location::hard_link`].
    #[cfg(unix)]
    pub(crate) fn symlink(&self, target: &DirEntry, name: Option<&str>) -> Result<Location> {
        let link = target.path().join(name.unwrap_or(&self.name));
        if link == self.path {
            bail!("Cannot create symlink over itself: {}", link.display());
        }
        std::os::unix::fs::symlink(&self.path, &link)
            .with_context(|| format!("Failed to symlink {}", self.path.display()))?;
        Ok(Location::from_absolute(link))
    }

    /// Chown passthrough. No validation of the ids; the OS is the judge.
    #[cfg(unix)]
    pub fn change_owner(&self, uid: u32, gid: u32) -> Result<()> {
        std::os::unix::fs::chown(&self.path, Some(uid), Some(gid))
            .with_context(|| format!("Failed to chown {}", self.path.display()))
    }

    #[cfg(unix)]
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&self.path, fs::Permissions::from_mode(mode.bits()))
            .with_context(|| format!("Failed to chmod {}", self.path.display()))
    }

    #[cfg(not(unix))]
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        let _ = mode;
        bail!("Permission modes are only supported on Unix");
    }
}

/// A file or directory, resolved once at construction from the observed
/// filesystem type. For paths that do not exist yet the classification
/// falls back on the name: a dotted last segment reads as a file.
#[derive(Debug, Clone)]
pub enum Entry {
    File(FileEntry),
    Dir(DirEntry),
}

impl Entry {
    pub fn open(input: &str, workdir: &Workdir) -> Result<Entry> {
        Ok(Self::from_location(Location::resolve(input, workdir)?))
    }

    pub(crate) fn from_path(path: PathBuf) -> Entry {
        Self::from_location(Location::from_absolute(path))
    }

    pub(crate) fn from_location(loc: Location) -> Entry {
        let is_dir = match EntryKind::of(loc.path()) {
            Some(kind) => kind.is_dir(),
            // Not on disk yet: guess from the name, like the interactive
            // tools this replaces did.
            None => !loc.name().contains('.'),
        };
        if is_dir {
            Entry::Dir(DirEntry::from_location(loc))
        } else {
            Entry::File(FileEntry::from_location(loc))
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Entry::File(f) => f.location(),
            Entry::Dir(d) => d.location(),
        }
    }

    pub fn path(&self) -> &Path {
        self.location().path()
    }

    pub fn name(&self) -> &str {
        self.location().name()
    }

    pub fn exists(&self) -> bool {
        self.location().exists()
    }

    pub fn kind(&self) -> Result<EntryKind> {
        self.location().kind()
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entry::File(f) => Some(f),
            Entry::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&DirEntry> {
        match self {
            Entry::Dir(d) => Some(d),
            Entry::File(_) => None,
        }
    }

    /// Stat size for files, recursive size for directories (matching how
    /// group totals counted the original's items).
    pub fn size(&self) -> Result<u64> {
        match self {
            Entry::File(f) => f.size(),
            Entry::Dir(d) => d.recursive_size(),
        }
    }

    pub fn delete(&self) -> Result<()> {
        match self {
            Entry::File(f) => f.delete(),
            Entry::Dir(d) => d.delete(),
        }
    }

    pub fn rename_to(&mut self, new_name: &str) -> Result<()> {
        match self {
            Entry::File(f) => f.rename_to(new_name),
            Entry::Dir(d) => d.rename_to(new_name),
        }
    }

    pub fn move_into(&mut self, target: &DirEntry) -> Result<()> {
        match self {
            Entry::File(f) => f.move_into(target),
            Entry::Dir(d) => d.move_into(target),
        }
    }

    /// Copy into `target` under `new_name` (default: current name) and
    /// return the entry for the copy; the source is untouched.
    pub fn copy_into(&self, target: &DirEntry, new_name: Option<&str>) -> Result<Entry> {
        match self {
            Entry::File(f) => Ok(Entry::File(f.copy_into(target, new_name)?)),
            Entry::Dir(d) => Ok(Entry::Dir(d.copy_into(target, new_name)?)),
        }
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.location().set_mode(mode)
    }

    #[cfg(unix)]
    pub fn change_owner(&self, uid: u32, gid: u32) -> Result<()> {
        self.location().change_owner(uid, gid)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use crate::path::Workdir;

    use super::{dir::DirEntry, Entry, EntryKind, Location};

    fn workdir_in(temp: &tempfile::TempDir) -> Workdir {
        Workdir::new(temp.path()).unwrap()
    }

    #[test]
    fn test_exists_reflects_live_state() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);

        let entry = Entry::open("a.txt", &wd).unwrap();
        assert!(!entry.exists());

        fs::write(temp.path().join("a.txt"), "x").unwrap();
        assert!(entry.exists());

        fs::remove_file(temp.path().join("a.txt")).unwrap();
        assert!(!entry.exists());
    }

    #[test]
    fn test_classification_from_disk() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("data"), "x").unwrap();
        fs::create_dir(temp.path().join("sub.dir")).unwrap();

        // Observed type wins over the dotted-name heuristic.
        assert!(Entry::open("data", &wd).unwrap().is_file());
        assert!(Entry::open("sub.dir", &wd).unwrap().is_dir());
    }

    #[test]
    fn test_classification_fallback_by_name() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);

        assert!(Entry::open("notes.txt", &wd).unwrap().is_file());
        assert!(Entry::open("build", &wd).unwrap().is_dir());
    }

    #[test]
    fn test_kind() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("f"), "x").unwrap();
        fs::create_dir(temp.path().join("d")).unwrap();

        assert_eq!(
            EntryKind::of(&temp.path().join("f")),
            Some(EntryKind::File)
        );
        assert_eq!(
            EntryKind::of(&temp.path().join("d")),
            Some(EntryKind::Directory)
        );
        assert_eq!(EntryKind::of(&temp.path().join("nope")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_kind_symlink() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("f");
        fs::write(&target, "x").unwrap();
        let link = temp.path().join("l");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(EntryKind::of(&link), Some(EntryKind::SymlinkFile));
        assert!(EntryKind::of(&link).unwrap().is_symlink());
    }

    #[test]
    fn test_rename_updates_path_and_name() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("old.txt"), "content").unwrap();

        let mut entry = Entry::open("old.txt", &wd).unwrap();
        entry.rename_to("new.txt").unwrap();

        assert_eq!(entry.name(), "new.txt");
        assert!(entry.path().ends_with("new.txt"));
        assert!(temp.path().join("new.txt").exists());
        assert!(!temp.path().join("old.txt").exists());
    }

    #[test]
    fn test_rename_failure_leaves_fields_untouched() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);

        let mut entry = Entry::open("ghost.txt", &wd).unwrap();
        assert!(entry.rename_to("other.txt").is_err());
        assert_eq!(entry.name(), "ghost.txt");
    }

    #[test]
    fn test_move_into() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("f.txt"), "data").unwrap();
        fs::create_dir(temp.path().join("dest")).unwrap();

        let mut entry = Entry::open("f.txt", &wd).unwrap();
        let dest = DirEntry::open("dest", &wd).unwrap();
        entry.move_into(&dest).unwrap();

        assert_eq!(entry.path(), temp.path().join("dest/f.txt"));
        assert!(!temp.path().join("f.txt").exists());
        assert!(temp.path().join("dest/f.txt").exists());
    }

    #[test]
    fn test_move_missing_fails() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::create_dir(temp.path().join("dest")).unwrap();

        let mut entry = Entry::open("ghost.txt", &wd).unwrap();
        let dest = DirEntry::open("dest", &wd).unwrap();
        let err = entry.move_into(&dest).unwrap_err();
        assert!(err.to_string().contains("Cannot move non-existent"));
    }

    #[test]
    fn test_copy_into_leaves_source() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("src.txt"), "payload").unwrap();
        fs::create_dir(temp.path().join("dest")).unwrap();

        let entry = Entry::open("src.txt", &wd).unwrap();
        let dest = DirEntry::open("dest", &wd).unwrap();
        let copy = entry.copy_into(&dest, Some("copy.txt")).unwrap();

        assert!(temp.path().join("src.txt").exists());
        assert_eq!(copy.name(), "copy.txt");
        assert_eq!(
            fs::read_to_string(temp.path().join("dest/copy.txt")).unwrap(),
            "payload"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_self_link_rejected() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("f"), "x").unwrap();

        let loc = Location::resolve("f", &wd).unwrap();
        let here = DirEntry::open(".", &wd).unwrap();
        let err = loc.symlink(&here, None).unwrap_err();
        assert!(err.to_string().contains("over itself"));
    }

    #[cfg(unix)]
    #[test]
    fn test_hard_link_creates_second_path() {
        let temp = tempdir().unwrap();
        let wd = workdir_in(&temp);
        fs::write(temp.path().join("f"), "same").unwrap();
        fs::create_dir(temp.path().join("links")).unwrap();

        let loc = Location::resolve("f", &wd).unwrap();
        let links = DirEntry::open("links", &wd).unwrap();
        let link = loc.hard_link(&links, None).unwrap();

        assert_eq!(
            fs::read_to_string(link.path()).unwrap(),
            "same"
        );
    }
}
