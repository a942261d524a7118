//! Source path resolution and existence checks.
//!
//! A page or gallery source is either a plain filesystem path or an entry
//! inside a zip/cbz archive, written as `<archive>/<entry>`. Existence
//! checks distinguish "not there" from "the archive cannot be read": the
//! former is an answer, the latter an error the caller decides how to
//! treat.

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("archive {archive:?} could not be read")]
    ArchiveUnreadable { archive: PathBuf },
}

/// A classified source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePath {
    Plain(PathBuf),
    ArchiveEntry { archive: PathBuf, entry: String },
}

fn has_archive_extension(component: &str) -> bool {
    Path::new(component)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_lowercase();
            ARCHIVE_EXTENSIONS.iter().any(|a| *a == ext)
        })
        .unwrap_or(false)
}

impl SourcePath {
    /// Classify a raw path.
    ///
    /// The split is lexical: the first non-final component with an archive
    /// extension becomes the archive, the remainder the entry name.
    pub fn parse(raw: &str) -> Self {
        let path = Path::new(raw);
        let components: Vec<Component> = path.components().collect();

        for (i, component) in components.iter().enumerate() {
            let Component::Normal(name) = component else {
                continue;
            };
            let Some(name) = name.to_str() else { continue };
            // The final component is the file itself, even if it is an archive
            if i + 1 == components.len() {
                break;
            }
            if has_archive_extension(name) {
                let archive: PathBuf = components[..=i].iter().collect();
                let entry = components[i + 1..]
                    .iter()
                    .filter_map(|c| match c {
                        Component::Normal(n) => n.to_str(),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                return SourcePath::ArchiveEntry { archive, entry };
            }
        }

        SourcePath::Plain(path.to_path_buf())
    }

    /// Whether the source is present on disk.
    pub fn exists(&self) -> Result<bool, SourceError> {
        match self {
            SourcePath::Plain(path) => Ok(path.exists()),
            SourcePath::ArchiveEntry { archive, entry } => {
                // A real directory that merely looks like an archive wins
                if archive.is_dir() {
                    let entry_path: PathBuf = entry.split('/').collect();
                    return Ok(archive.join(entry_path).exists());
                }
                if !archive.is_file() {
                    return Ok(false);
                }
                let file = File::open(archive).map_err(|_| SourceError::ArchiveUnreadable {
                    archive: archive.clone(),
                })?;
                let zip = zip::ZipArchive::new(file).map_err(|_| SourceError::ArchiveUnreadable {
                    archive: archive.clone(),
                })?;
                Ok(zip.index_for_name(entry).is_some())
            }
        }
    }
}

/// Existence check for a raw source path string.
pub fn exists(raw: &str) -> Result<bool, SourceError> {
    SourcePath::parse(raw).exists()
}

/// File entry names of an archive, directories excluded.
pub fn archive_entries(archive: &Path) -> Result<Vec<String>, SourceError> {
    let file = File::open(archive).map_err(|_| SourceError::ArchiveUnreadable {
        archive: archive.to_path_buf(),
    })?;
    let zip = zip::ZipArchive::new(file).map_err(|_| SourceError::ArchiveUnreadable {
        archive: archive.to_path_buf(),
    })?;
    let mut entries: Vec<String> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(|name| name.to_string())
        .collect();
    entries.sort();
    Ok(entries)
}
