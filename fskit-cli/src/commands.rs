use anyhow::Result;
use serde_json::json;

use fskit_core::{DirEntry, Mode};

/// Print a directory listing, as plain names or one JSON object per item.
pub fn ls(dir: &DirEntry, as_json: bool, sorted: bool) -> Result<()> {
    if !as_json {
        let names = if sorted { dir.ls()? } else { dir.names()? };
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    let mut entries = dir.entries()?;
    if sorted {
        entries.sort_by(|a, b| a.name().cmp(b.name()));
    }
    let rows = entries
        .iter()
        .map(|entry| {
            Ok(json!({
                "name": entry.name(),
                "path": entry.path().to_string_lossy(),
                "kind": entry.kind()?,
                "size": entry.location().size()?,
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

/// Apply one mode to a directory's entire contents, files and
/// subdirectories alike.
pub fn chmod_recursive(dir: &DirEntry, mode: Mode) -> Result<()> {
    #[cfg(unix)]
    {
        dir.set_mode_recursive(Some(mode), Some(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (dir, mode);
        anyhow::bail!("Recursive chmod is only supported on Unix");
    }
    Ok(())
}
