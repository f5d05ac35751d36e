use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::archive::{self, ArchiveFormat};
use crate::mode::Mode;
use crate::path::{self, Workdir};

use super::dir::DirEntry;
use super::edit::{self, CropBound};
use super::Location;

/// A file on disk, with whole-text editing operations. Text operations
/// materialize the entire file in memory; that is the deliberate trade-off
/// for small text files, and edits are last-write-wins against concurrent
/// external writers.
#[derive(Debug, Clone)]
pub struct FileEntry {
    loc: Location,
    /// Extension without the dot, recomputed on every rename.
    ext: String,
}

impl FileEntry {
    pub fn open(input: &str, workdir: &Workdir) -> Result<Self> {
        Ok(Self::from_location(Location::resolve(input, workdir)?))
    }

    pub(crate) fn from_location(loc: Location) -> Self {
        let ext = path::extension(loc.name()).to_string();
        Self { loc, ext }
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

    /// Extension without the dot, empty when there is none.
    pub fn extension(&self) -> &str {
        &self.ext
    }

    pub fn exists(&self) -> bool {
        self.loc.exists()
    }

    pub fn size(&self) -> Result<u64> {
        self.loc.size()
    }

    pub fn parent(&self) -> Result<DirEntry> {
        self.loc.parent()
    }

    /// Whole-file UTF-8 read.
    pub fn text(&self) -> Result<String> {
        fs::read_to_string(self.path())
            .with_context(|| format!("Failed to read {}", self.path().display()))
    }

    /// Whole-file write, replacing any previous content.
    pub fn set_text(&self, text: &str) -> Result<()> {
        fs::write(self.path(), text)
            .with_context(|| format!("Failed to write {}", self.path().display()))
    }

    /// Create the file empty. Fails if the parent directory is missing.
    pub fn create(&self) -> Result<()> {
        self.set_text("")
    }

    /// Truncate an existing file; clearing a missing file is an error.
    pub fn clear(&self) -> Result<()> {
        if !self.exists() {
            bail!("Cannot clear non-existent {}", self.path().display());
        }
        self.set_text("")
    }

    pub fn char_len(&self) -> Result<usize> {
        Ok(self.text()?.chars().count())
    }

    pub fn line_count(&self) -> Result<usize> {
        Ok(self.text()?.lines().count())
    }

    /// Byte offset of the first occurrence of `pattern`. Literal substring
    /// search; see [`FileEntry::find_regex`] for the regex variant.
    pub fn find(&self, pattern: &str) -> Result<Option<usize>> {
        Ok(self.text()?.find(pattern))
    }

    /// Byte offsets of every occurrence of `pattern`, in order.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<usize>> {
        Ok(edit::find_all(&self.text()?, pattern))
    }

    /// `(start, end)` byte spans of every match of `re`, in order.
    pub fn find_regex(&self, re: &Regex) -> Result<Vec<(usize, usize)>> {
        Ok(re
            .find_iter(&self.text()?)
            .map(|m| (m.start(), m.end()))
            .collect())
    }

    /// Replace up to `limit` occurrences of `old` with `new`, left to
    /// right (all when `None`). Returns how many were replaced; zero
    /// matches is reported, not an error.
    pub fn replace(&self, old: &str, new: &str, limit: Option<usize>) -> Result<usize> {
        let (text, count) = edit::replace_limited(&self.text()?, old, new, limit);
        if count == 0 {
            tracing::warn!(pattern = old, file = %self.path().display(), "no occurrences to replace");
            return Ok(0);
        }
        self.set_text(&text)?;
        Ok(count)
    }

    /// Replace the whole line containing each match of `pattern` with
    /// `new_line`, up to `limit` lines.
    pub fn replace_lines(
        &self,
        pattern: &str,
        new_line: &str,
        limit: Option<usize>,
    ) -> Result<usize> {
        let (text, count) = edit::replace_lines_limited(&self.text()?, pattern, new_line, limit);
        if count == 0 {
            tracing::warn!(pattern, file = %self.path().display(), "no lines to replace");
            return Ok(0);
        }
        self.set_text(&text)?;
        Ok(count)
    }

    /// Delete up to `limit` occurrences of `pattern`.
    pub fn remove(&self, pattern: &str, limit: Option<usize>) -> Result<usize> {
        self.replace(pattern, "", limit)
    }

    /// Cut the given spans out of the file; unlocatable or inverted spans
    /// are skipped with a warning. Returns how many spans were applied.
    pub fn crop(&self, spans: &[(CropBound, CropBound)], coherent: bool) -> Result<usize> {
        let (text, applied) = edit::crop_spans(&self.text()?, spans, coherent);
        if applied > 0 {
            self.set_text(&text)?;
        }
        Ok(applied)
    }

    /// Insert `text` at the given byte offset.
    pub fn insert(&self, text: &str, position: usize) -> Result<()> {
        let updated = edit::insert_at(&self.text()?, text, position)?;
        self.set_text(&updated)
    }

    /// Append `text` at the end of the file.
    pub fn append(&self, text: &str) -> Result<()> {
        let mut current = self.text()?;
        current.push_str(text);
        self.set_text(&current)
    }

    pub fn delete(&self) -> Result<()> {
        self.loc.remove_file()
    }

    pub fn move_into(&mut self, target: &DirEntry) -> Result<()> {
        self.loc.move_into(target)
    }

    /// Rename, keeping the cached extension in sync with the new name.
    pub fn rename_to(&mut self, new_name: &str) -> Result<()> {
        self.loc.rename_to(new_name)?;
        self.ext = path::extension(new_name).to_string();
        Ok(())
    }

    /// Rename keeping the stem, swapping only the extension.
    pub fn set_extension(&mut self, new_ext: &str) -> Result<()> {
        let stem = match self.name().rfind('.') {
            Some(0) | None => self.name().to_string(),
            Some(i) => self.name()[..i].to_string(),
        };
        self.rename_to(&format!("{stem}.{new_ext}"))
    }

    /// Copy to an absolute path (renaming included) and return the copy.
    pub fn copy(&self, new_path: &Path) -> Result<FileEntry> {
        fs::copy(self.path(), new_path).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                self.path().display(),
                new_path.display()
            )
        })?;
        Ok(FileEntry::from_location(Location::from_absolute(
            new_path.to_path_buf(),
        )))
    }

    /// Copy into `target` under `new_name` (default: current name).
    pub fn copy_into(&self, target: &DirEntry, new_name: Option<&str>) -> Result<FileEntry> {
        let new_path = target.path().join(new_name.unwrap_or(self.name()));
        self.copy(&new_path)
    }

    /// Create a hard link inside `target` and return the linked file.
    pub fn hard_link(&self, target: &DirEntry, name: Option<&str>) -> Result<FileEntry> {
        Ok(FileEntry::from_location(self.loc.hard_link(target, name)?))
    }

    /// Create a symbolic link inside `target` and return the linked file.
    #[cfg(unix)]
    pub fn symlink(&self, target: &DirEntry, name: Option<&str>) -> Result<FileEntry> {
        Ok(FileEntry::from_location(self.loc.symlink(target, name)?))
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.loc.set_mode(mode)
    }

    #[cfg(unix)]
    pub fn change_owner(&self, uid: u32, gid: u32) -> Result<()> {
        self.loc.change_owner(uid, gid)
    }

    /// Extract this archive into `dest` (format inferred from the file
    /// name when not given) and return the destination directory.
    pub fn unpack_archive(
        &self,
        dest: &Path,
        format: Option<ArchiveFormat>,
    ) -> Result<DirEntry> {
        archive::unpack(self.path(), dest, format)?;
        Ok(DirEntry::from_location(Location::from_absolute(
            dest.to_path_buf(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::tempdir;

    use crate::entry::edit::CropBound;
    use crate::path::Workdir;

    use super::FileEntry;

    fn file_with(temp: &tempfile::TempDir, name: &str, content: &str) -> FileEntry {
        fs::write(temp.path().join(name), content).unwrap();
        let wd = Workdir::new(temp.path()).unwrap();
        FileEntry::open(name, &wd).unwrap()
    }

    #[rstest]
    #[case("")]
    #[case("one line")]
    #[case("multi\nline\ncontent\n")]
    #[case("unicode: héllo ∀x\n")]
    fn test_text_round_trip(#[case] content: &str) {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "seed");
        file.set_text(content).unwrap();
        assert_eq!(file.text().unwrap(), content);
    }

    #[test]
    fn test_extension_tracking() {
        let temp = tempdir().unwrap();
        let mut file = file_with(&temp, "notes.txt", "x");
        assert_eq!(file.extension(), "txt");

        file.rename_to("notes.md").unwrap();
        assert_eq!(file.extension(), "md");
        assert_eq!(file.name(), "notes.md");

        file.set_extension("rst").unwrap();
        assert_eq!(file.name(), "notes.rst");
        assert_eq!(file.extension(), "rst");
        assert!(temp.path().join("notes.rst").exists());
    }

    #[test]
    fn test_find_is_literal() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "a.c abc a.c");
        // A regex would also match "abc"; literal search must not.
        assert_eq!(file.find("a.c").unwrap(), Some(0));
        assert_eq!(file.find_all("a.c").unwrap(), vec![0, 8]);
        assert_eq!(file.find("zzz").unwrap(), None);
    }

    #[test]
    fn test_find_regex() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "a.c abc");
        let re = regex::Regex::new("a.c").unwrap();
        assert_eq!(file.find_regex(&re).unwrap(), vec![(0, 3), (4, 7)]);
    }

    #[test]
    fn test_replace_with_limit() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "foo bar foo bar foo");
        let n = file.replace("foo", "qux", Some(2)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(file.text().unwrap(), "qux bar qux bar foo");
    }

    #[test]
    fn test_replace_no_match_is_not_an_error() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "abc");
        assert_eq!(file.replace("zzz", "y", None).unwrap(), 0);
        assert_eq!(file.text().unwrap(), "abc");
    }

    #[test]
    fn test_remove() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "a-b-c");
        assert_eq!(file.remove("-", None).unwrap(), 2);
        assert_eq!(file.text().unwrap(), "abc");
    }

    #[test]
    fn test_replace_lines() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "keep\nTODO old\nkeep");
        assert_eq!(file.replace_lines("TODO", "done", None).unwrap(), 1);
        assert_eq!(file.text().unwrap(), "keep\ndone\nkeep");
    }

    #[test]
    fn test_crop() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "head [cut me] tail");
        let spans = [(
            CropBound::Pattern("[".to_string()),
            CropBound::Pattern("]".to_string()),
        )];
        assert_eq!(file.crop(&spans, false).unwrap(), 1);
        assert_eq!(file.text().unwrap(), "head ] tail");
    }

    #[test]
    fn test_insert_and_append() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "ad");
        file.insert("bc", 1).unwrap();
        file.append("e").unwrap();
        assert_eq!(file.text().unwrap(), "abcde");
    }

    #[test]
    fn test_create_and_clear() {
        let temp = tempdir().unwrap();
        let wd = Workdir::new(temp.path()).unwrap();
        let file = FileEntry::open("fresh.txt", &wd).unwrap();

        assert!(file.clear().is_err());
        file.create().unwrap();
        assert!(file.exists());

        file.set_text("data").unwrap();
        file.clear().unwrap();
        assert_eq!(file.text().unwrap(), "");
    }

    #[test]
    fn test_counts() {
        let temp = tempdir().unwrap();
        let file = file_with(&temp, "t.txt", "ab\ncd\n");
        assert_eq!(file.char_len().unwrap(), 6);
        assert_eq!(file.line_count().unwrap(), 2);
    }

    #[test]
    fn test_delete_missing_fails() {
        let temp = tempdir().unwrap();
        let wd = Workdir::new(temp.path()).unwrap();
        let file = FileEntry::open("ghost.txt", &wd).unwrap();
        assert!(file.delete().is_err());
    }
}
