use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::entry::dir::DirEntry;
use crate::entry::Entry;

/// An ad hoc collection of entries with a display name, for bulk
/// filter/transform operations. Membership is by value, not by path: two
/// independently constructed entries for the same path are two members.
/// That matches how these collections were always used (snapshots of one
/// directory) and is documented rather than papered over.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    members: Vec<Entry>,
}

impl Group {
    pub fn new(name: impl Into<String>, members: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// Wrap a set of absolute paths, classifying each from disk.
    pub fn from_paths(name: impl Into<String>, paths: &[PathBuf]) -> Self {
        let members = paths.iter().cloned().map(Entry::from_path).collect();
        Self::new(name, members)
    }

    /// Snapshot a directory's contents, named after the directory.
    pub fn from_directory(dir: &DirEntry) -> Result<Self> {
        dir.group()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.members.iter()
    }

    pub fn push(&mut self, entry: Entry) {
        self.members.push(entry);
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|e| e.path().to_path_buf()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn count(&self, pred: impl Fn(&Entry) -> bool) -> usize {
        self.members.iter().filter(|e| pred(e)).count()
    }

    pub fn count_files(&self) -> usize {
        self.count(Entry::is_file)
    }

    pub fn count_dirs(&self) -> usize {
        self.count(Entry::is_dir)
    }

    /// Sum of member sizes (recursive for directory members).
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0;
        for member in &self.members {
            total += member.size()?;
        }
        Ok(total)
    }

    /// A new group of the members matching `pred`; this group is untouched.
    pub fn filter(&self, pred: impl Fn(&Entry) -> bool) -> Group {
        let members = self.members.iter().filter(|e| pred(e)).cloned().collect();
        Group::new(format!("filtered from {}", self.name), members)
    }

    /// Drain the members failing `pred` into a new group, keeping the rest.
    pub fn cut(&mut self, pred: impl Fn(&Entry) -> bool) -> Group {
        let (keep, cut) = std::mem::take(&mut self.members)
            .into_iter()
            .partition(|e| pred(e));
        self.members = keep;
        Group::new(format!("cut from {}", self.name), cut)
    }

    /// Drop members whose paths no longer exist on disk.
    pub fn strip(&mut self) {
        let dropped = self.cut(Entry::exists);
        if !dropped.is_empty() {
            tracing::debug!(
                group = %self.name,
                dropped = dropped.len(),
                "stripped vanished members"
            );
        }
    }

    /// Partition the members by `key`, returning one subgroup per distinct
    /// key in sorted key order, each named after its key.
    pub fn split_by<K: Ord + std::fmt::Display>(
        &self,
        key: impl Fn(&Entry) -> K,
    ) -> Vec<Group> {
        let mut buckets: std::collections::BTreeMap<K, Vec<Entry>> =
            std::collections::BTreeMap::new();
        for member in &self.members {
            buckets.entry(key(member)).or_default().push(member.clone());
        }
        buckets
            .into_iter()
            .map(|(key, members)| Group::new(format!("{}:{key}", self.name), members))
            .collect()
    }

    /// Run `action` over every member. All members are attempted; failures
    /// are logged as they happen and reported once at the end.
    pub fn apply(&self, mut action: impl FnMut(&Entry) -> Result<()>) -> Result<()> {
        let mut failures = 0;
        for member in &self.members {
            if let Err(error) = action(member) {
                tracing::warn!(member = %member.path().display(), %error, "group action failed");
                failures += 1;
            }
        }
        if failures > 0 {
            bail!("{failures} of {} group actions failed", self.members.len());
        }
        Ok(())
    }

    /// Rename every member to `f(current_name)`. Stops at the first rename
    /// the OS rejects; members already renamed stay renamed.
    pub fn rename_all(&mut self, f: impl Fn(&str) -> String) -> Result<()> {
        for member in &mut self.members {
            let new_name = f(member.name());
            member.rename_to(&new_name)?;
        }
        Ok(())
    }

    /// Members whose name is exactly `name`.
    pub fn find(&self, name: &str) -> Vec<&Entry> {
        self.members.iter().filter(|e| e.name() == name).collect()
    }

    /// Members whose name contains `fragment`.
    pub fn matching(&self, fragment: &str) -> Vec<&Entry> {
        self.members
            .iter()
            .filter(|e| e.name().contains(fragment))
            .collect()
    }
}

impl IntoIterator for Group {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use crate::entry::dir::DirEntry;
    use crate::path::Workdir;

    use super::Group;

    fn seeded_group(temp: &tempfile::TempDir) -> Group {
        fs::create_dir(temp.path().join("d")).unwrap();
        fs::write(temp.path().join("d/a.txt"), "aa").unwrap();
        fs::write(temp.path().join("d/b.txt"), "bbbb").unwrap();
        fs::write(temp.path().join("d/c.log"), "c").unwrap();
        fs::create_dir(temp.path().join("d/sub")).unwrap();
        let wd = Workdir::new(temp.path()).unwrap();
        DirEntry::open("d", &wd).unwrap().group().unwrap()
    }

    #[test]
    fn test_from_directory_snapshot() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        assert_eq!(group.name(), "d");
        assert_eq!(group.len(), 4);
        assert_eq!(group.count_files(), 3);
        assert_eq!(group.count_dirs(), 1);
    }

    #[test]
    fn test_filter_leaves_original() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        let txt = group.filter(|e| e.name().ends_with(".txt"));
        assert_eq!(txt.len(), 2);
        assert_eq!(group.len(), 4);
    }

    #[test]
    fn test_cut_drains_failing_members() {
        let temp = tempdir().unwrap();
        let mut group = seeded_group(&temp);
        let cut = group.cut(|e| e.is_file());
        assert_eq!(cut.len(), 1);
        assert_eq!(group.len(), 3);
        assert_eq!(cut.names(), ["sub"]);
    }

    #[test]
    fn test_strip_drops_vanished() {
        let temp = tempdir().unwrap();
        let mut group = seeded_group(&temp);
        fs::remove_file(temp.path().join("d/a.txt")).unwrap();
        group.strip();
        assert_eq!(group.len(), 3);
        assert!(group.find("a.txt").is_empty());
    }

    #[test]
    fn test_split_by_extension() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        let by_ext = group.split_by(|e| {
            crate::path::extension(e.name()).to_string()
        });
        // Sorted key order: "" (sub), "log", "txt".
        assert_eq!(by_ext.len(), 3);
        assert_eq!(by_ext[0].names(), ["sub"]);
        assert_eq!(by_ext[1].names(), ["c.log"]);
        assert_eq!(by_ext[2].len(), 2);
    }

    #[test]
    fn test_total_size() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        let sub_size = fs::metadata(temp.path().join("d/sub")).unwrap().len();
        assert_eq!(group.total_size().unwrap(), sub_size + 7);
    }

    #[test]
    fn test_rename_all() {
        let temp = tempdir().unwrap();
        let mut group = seeded_group(&temp);
        group.rename_all(|name| format!("x_{name}")).unwrap();
        assert!(temp.path().join("d/x_a.txt").exists());
        assert!(temp.path().join("d/x_sub").exists());
        assert!(group.find("x_b.txt").len() == 1);
    }

    #[test]
    fn test_apply_reports_failures() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        let err = group
            .apply(|e| {
                if e.is_dir() {
                    anyhow::bail!("no directories allowed")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(err.to_string().contains("1 of 4"));
    }

    #[test]
    fn test_matching() {
        let temp = tempdir().unwrap();
        let group = seeded_group(&temp);
        assert_eq!(group.matching(".txt").len(), 2);
        assert_eq!(group.matching("zzz").len(), 0);
    }

    #[test]
    fn test_membership_is_not_path_deduplicated() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("f.txt"), "x").unwrap();
        let path = temp.path().join("f.txt");
        let group = Group::from_paths("dupes", &[path.clone(), path]);
        assert_eq!(group.len(), 2);
    }
}
