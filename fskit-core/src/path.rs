use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Expand a leading `~` or `~/` to the user's home directory. Any other
/// input is returned unchanged (`~user` forms are not supported).
pub fn expand(path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        if path == "~" {
            return Ok(home);
        }
        return Ok(home.join(&path[2..]));
    }
    Ok(PathBuf::from(path))
}

/// Resolve `path` against `base` and lexically normalize `.` and `..`
/// components. No symlink resolution: entries must be constructible for
/// paths that do not exist yet, so `canonicalize` is not an option here.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, as in shell `cd /..`
                out.pop();
                if out.as_os_str().is_empty() {
                    out.push(Component::RootDir.as_os_str());
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Last path segment, or the empty string at the filesystem root.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Text after the last dot of `name`, without the dot. Empty when there is
/// no extension; a leading dot (dotfiles) does not count as one.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i + 1..],
    }
}

/// Explicit current-directory context. The original tooling this replaces
/// leaned on process-wide `chdir`; a `Workdir` is a plain value instead, so
/// two resolutions can never race through ambient global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    base: PathBuf,
}

impl Workdir {
    /// Create a context rooted at `base`, which must be absolute.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        if !base.is_absolute() {
            bail!("Workdir base must be absolute, got {}", base.display());
        }
        Ok(Self {
            base: absolutize(&base, Path::new("/")),
        })
    }

    /// Context rooted at the process working directory, captured once.
    pub fn current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        Self::new(cwd)
    }

    /// Context rooted at the user's home directory.
    pub fn home() -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Self::new(home)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Tilde-expand `input`, then resolve it against the base directory.
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        let expanded = expand(input)?;
        Ok(absolutize(&expanded, &self.base))
    }

    /// A new context `levels` directories above this one.
    pub fn ascend(&self, levels: usize) -> Workdir {
        let mut base = self.base.clone();
        for _ in 0..levels {
            base.pop();
        }
        if base.as_os_str().is_empty() {
            base.push(Component::RootDir.as_os_str());
        }
        Workdir { base }
    }

    /// A new context rooted at the named child.
    pub fn descend(&self, name: &str) -> Workdir {
        Workdir {
            base: self.base.join(name),
        }
    }
}
