pub mod discovery;
pub mod hashing;

use anyhow::Result;
use chrono::Utc;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::db::Database;
use crate::source;

pub use discovery::{discover_galleries, discover_pages, CandidateKind, GalleryCandidate};

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { total_galleries: usize },
    Importing { current: usize, total: usize, title: String },
    Completed { found: usize, new: usize, pages: usize },
    Error { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub galleries_found: usize,
    pub galleries_new: usize,
    pub pages_new: usize,
    pub skipped: usize,
}

fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub struct Scanner {
    config: Config,
}

impl Scanner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Import gallery candidates under `root` into the database.
    ///
    /// Already-imported galleries are skipped; unreadable archives are
    /// reported and skipped, never fatal.
    pub fn scan_directory(
        &self,
        root: &PathBuf,
        db: &Database,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanResult> {
        let scan_id = db.record_scan_started(&root.to_string_lossy(), &now_timestamp())?;

        match self.import_candidates(root, db, &progress_tx) {
            Ok(result) => {
                db.record_scan_completed(
                    scan_id,
                    &now_timestamp(),
                    result.galleries_found,
                    result.galleries_new,
                    result.pages_new,
                )?;
                if let Some(ref tx) = progress_tx {
                    let _ = tx.send(ScanProgress::Completed {
                        found: result.galleries_found,
                        new: result.galleries_new,
                        pages: result.pages_new,
                    });
                }
                Ok(result)
            }
            Err(e) => {
                db.record_scan_failed(scan_id, &now_timestamp())?;
                Err(e)
            }
        }
    }

    fn import_candidates(
        &self,
        root: &PathBuf,
        db: &Database,
        progress_tx: &Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanResult> {
        let candidates = discover_galleries(
            root,
            &self.config.scanner.page_extensions,
            &self.config.scanner.archive_extensions,
        )?;

        let total = candidates.len();
        if let Some(tx) = progress_tx {
            let _ = tx.send(ScanProgress::Started {
                total_galleries: total,
            });
        }

        let mut result = ScanResult {
            galleries_found: total,
            ..Default::default()
        };

        for (index, candidate) in candidates.iter().enumerate() {
            let title = gallery_title(&candidate.path);
            if let Some(tx) = progress_tx {
                let _ = tx.send(ScanProgress::Importing {
                    current: index + 1,
                    total,
                    title: title.clone(),
                });
            }

            let imported = match candidate.kind {
                CandidateKind::Directory => self.import_directory(db, &candidate.path, &title)?,
                CandidateKind::Archive => {
                    match self.import_archive(db, &candidate.path, &title) {
                        Ok(imported) => imported,
                        Err(e) => {
                            warn!("skipping archive {:?}: {}", candidate.path, e);
                            if let Some(tx) = progress_tx {
                                let _ = tx.send(ScanProgress::Error {
                                    message: format!(
                                        "skipping {}: {}",
                                        candidate.path.display(),
                                        e
                                    ),
                                });
                            }
                            result.skipped += 1;
                            continue;
                        }
                    }
                }
            };

            match imported {
                Some(pages) => {
                    result.galleries_new += 1;
                    result.pages_new += pages;
                }
                None => result.skipped += 1,
            }
        }

        Ok(result)
    }

    /// Import a directory-backed gallery. Returns the number of pages
    /// inserted, or `None` if the gallery was already present.
    fn import_directory(&self, db: &Database, dir: &Path, title: &str) -> Result<Option<usize>> {
        if db.find_gallery(title, None)?.is_some() {
            return Ok(None);
        }

        let pages = discover_pages(dir, &self.config.scanner.page_extensions)?;

        let hashed: Vec<(PathBuf, i64, Option<String>)> = pages
            .par_iter()
            .map(|path| {
                let size = std::fs::metadata(path).map(|m| m.len() as i64).unwrap_or(0);
                let hash = hashing::sha256_file(path).ok();
                (path.clone(), size, hash)
            })
            .collect();

        let gallery_id = db.insert_gallery(title, None)?;
        let mut count = 0;
        for (number, (path, size, hash)) in hashed.iter().enumerate() {
            db.insert_page(
                gallery_id,
                number as i64 + 1,
                &path.to_string_lossy(),
                *size,
                hash.as_deref(),
            )?;
            count += 1;
        }
        db.touch_gallery_scanned(gallery_id, &now_timestamp())?;

        Ok(Some(count))
    }

    /// Import an archive-backed gallery. Pages are the archive's entries
    /// with a page extension, addressed as `<archive>/<entry>`.
    fn import_archive(&self, db: &Database, archive: &Path, title: &str) -> Result<Option<usize>> {
        let archive_str = archive.to_string_lossy();
        if db.find_gallery(title, Some(&archive_str))?.is_some() {
            return Ok(None);
        }

        let entries = source::archive_entries(archive)?;
        let page_entries: Vec<&String> = entries
            .iter()
            .filter(|entry| {
                Path::new(entry.as_str())
                    .extension()
                    .map(|ext| {
                        let ext_lower = ext.to_string_lossy().to_lowercase();
                        self.config
                            .scanner
                            .page_extensions
                            .iter()
                            .any(|e| e.to_lowercase() == ext_lower)
                    })
                    .unwrap_or(false)
            })
            .collect();

        let gallery_id = db.insert_gallery(title, Some(&archive_str))?;
        let mut count = 0;
        for (number, entry) in page_entries.iter().enumerate() {
            db.insert_page(
                gallery_id,
                number as i64 + 1,
                &format!("{archive_str}/{entry}"),
                0,
                None,
            )?;
            count += 1;
        }
        db.touch_gallery_scanned(gallery_id, &now_timestamp())?;

        Ok(Some(count))
    }
}

/// Gallery title derived from its path: directory name, or archive file
/// stem.
fn gallery_title(path: &Path) -> String {
    if path.is_dir() {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    } else {
        path.file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn scanner() -> Scanner {
        Scanner::new(Config::default())
    }

    fn write_zip(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for entry in entries {
            zip.start_file(*entry, options).unwrap();
            zip.write_all(b"page data").unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn scan_imports_directories_and_archives() {
        let root = tempdir().unwrap();
        let db_dir = tempdir().unwrap();
        let db = Database::open(&db_dir.path().join("kura.db")).unwrap();
        db.initialize().unwrap();

        fs::create_dir(root.path().join("vacation")).unwrap();
        File::create(root.path().join("vacation/002.jpg"))
            .unwrap()
            .write_all(b"b")
            .unwrap();
        File::create(root.path().join("vacation/001.jpg"))
            .unwrap()
            .write_all(b"a")
            .unwrap();
        write_zip(
            &root.path().join("packed.zip"),
            &["001.jpg", "002.jpg", "notes.txt"],
        );

        let result = scanner()
            .scan_directory(&root.path().to_path_buf(), &db, None)
            .unwrap();

        assert_eq!(result.galleries_found, 2);
        assert_eq!(result.galleries_new, 2);
        assert_eq!(result.pages_new, 4);

        let galleries = db.list_galleries().unwrap();
        assert_eq!(galleries.len(), 2);

        let (packed, packed_pages) = &galleries[0];
        assert_eq!(packed.title, "packed");
        assert!(packed.single_source.is_some());
        assert_eq!(*packed_pages, 2);

        let (vacation, vacation_pages) = &galleries[1];
        assert_eq!(vacation.title, "vacation");
        assert_eq!(vacation.single_source, None);
        assert_eq!(*vacation_pages, 2);

        // Filename order becomes page numbering
        let first = db.first_page(vacation.id).unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert!(first.path.ends_with("001.jpg"));
        assert!(first.sha256_hash.is_some());

        // Archive pages address entries inside the archive
        let packed_first = db.first_page(packed.id).unwrap().unwrap();
        assert!(packed_first.path.ends_with("packed.zip/001.jpg"));
    }

    #[test]
    fn rescan_is_idempotent() {
        let root = tempdir().unwrap();
        let db_dir = tempdir().unwrap();
        let db = Database::open(&db_dir.path().join("kura.db")).unwrap();
        db.initialize().unwrap();

        fs::create_dir(root.path().join("g")).unwrap();
        File::create(root.path().join("g/001.jpg")).unwrap();

        let scanner = scanner();
        let first = scanner
            .scan_directory(&root.path().to_path_buf(), &db, None)
            .unwrap();
        assert_eq!(first.galleries_new, 1);

        let second = scanner
            .scan_directory(&root.path().to_path_buf(), &db, None)
            .unwrap();
        assert_eq!(second.galleries_found, 1);
        assert_eq!(second.galleries_new, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(db.list_galleries().unwrap().len(), 1);
    }

    #[test]
    fn unreadable_archive_is_skipped_with_progress_error() {
        let root = tempdir().unwrap();
        let db_dir = tempdir().unwrap();
        let db = Database::open(&db_dir.path().join("kura.db")).unwrap();
        db.initialize().unwrap();

        fs::write(root.path().join("broken.zip"), b"not a zip").unwrap();
        fs::create_dir(root.path().join("ok")).unwrap();
        File::create(root.path().join("ok/001.jpg")).unwrap();

        let (tx, rx) = mpsc::channel();
        let result = scanner()
            .scan_directory(&root.path().to_path_buf(), &db, Some(tx))
            .unwrap();

        assert_eq!(result.galleries_new, 1);
        assert_eq!(result.skipped, 1);

        let saw_error = rx
            .try_iter()
            .any(|p| matches!(p, ScanProgress::Error { .. }));
        assert!(saw_error);
    }
}
