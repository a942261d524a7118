use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How a gallery candidate is backed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Directory,
    Archive,
}

/// A potential gallery found under the scan root.
#[derive(Debug, Clone)]
pub struct GalleryCandidate {
    pub path: PathBuf,
    pub kind: CandidateKind,
}

fn extension_matches(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|e| e.to_lowercase() == ext_lower)
        })
        .unwrap_or(false)
}

/// Find gallery candidates among the direct children of `root`.
///
/// A subdirectory counts when it contains at least one page file; a file
/// counts when it has an archive extension. Everything else is ignored.
pub fn discover_galleries(
    root: &PathBuf,
    page_extensions: &[String],
    archive_extensions: &[String],
) -> Result<Vec<GalleryCandidate>> {
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if !discover_pages(&path, page_extensions)?.is_empty() {
                candidates.push(GalleryCandidate {
                    path,
                    kind: CandidateKind::Directory,
                });
            }
        } else if extension_matches(&path, archive_extensions) {
            candidates.push(GalleryCandidate {
                path,
                kind: CandidateKind::Archive,
            });
        }
    }

    // Sort by path for consistent ordering
    candidates.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(candidates)
}

/// Page files under a gallery directory, in path order.
pub fn discover_pages(directory: &Path, page_extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && extension_matches(path, page_extensions) {
            pages.push(path.to_path_buf());
        }
    }

    pages.sort();

    Ok(pages)
}
