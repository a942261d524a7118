//! Library query operations: source existence checking and page
//! navigation.
//!
//! Both operations are stateless reads over an explicitly passed
//! [`Database`] handle. The existence checker's per-entry I/O failures
//! are absorbed into the report; only unknown ids and missing arguments
//! are fatal.

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::db::{Database, Page};
use crate::error::LibraryError;
use crate::source::{self, SourceError};

/// Kind of item a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Gallery,
    Page,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Gallery => "gallery",
            ItemType::Page => "page",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "gallery" => Some(ItemType::Gallery),
            "page" => Some(ItemType::Page),
            _ => None,
        }
    }

    /// Numeric wire code used by external callers.
    pub fn code(&self) -> i64 {
        match self {
            ItemType::Gallery => 1,
            ItemType::Page => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ItemType::Gallery),
            2 => Some(ItemType::Page),
            _ => None,
        }
    }

    /// Map an external representation (name or numeric code) to a kind.
    ///
    /// Rejection happens here, before any query runs.
    pub fn parse(raw: &str) -> Result<Self, LibraryError> {
        if let Some(item_type) = Self::from_str(&raw.to_lowercase()) {
            return Ok(item_type);
        }
        if let Ok(code) = raw.parse::<i64>() {
            if let Some(item_type) = Self::from_code(code) {
                return Ok(item_type);
            }
        }
        Err(LibraryError::InvalidArgument(format!(
            "unsupported item type '{raw}'"
        )))
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item whose claimed source could not be found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingSource {
    pub id: i64,
    pub item_type: ItemType,
}

/// Result of a source existence check.
#[derive(Debug, Clone, Serialize)]
pub struct ExistenceReport {
    pub exists: bool,
    pub missing: Vec<MissingSource>,
}

/// Check whether a gallery's or page's backing source still exists.
///
/// For a page the check probes its own path. For a gallery the default is
/// a single representative probe: the gallery's `single_source` when set,
/// otherwise the directory containing its first page (lowest `number`).
/// With `check_all` every page of the gallery is probed individually.
///
/// An unreadable archive counts as a missing source, never an error. A
/// gallery with nothing to probe reports `exists = false`.
pub fn check_existence(
    db: &Database,
    item_type: ItemType,
    item_id: i64,
    check_all: bool,
) -> Result<ExistenceReport> {
    let mut entries: Vec<(i64, String, ItemType)> = Vec::new();

    match item_type {
        ItemType::Page => {
            let path = db.get_page_path(item_id)?.ok_or(LibraryError::NotFound {
                item_type,
                id: item_id,
            })?;
            entries.push((item_id, path, ItemType::Page));
        }
        ItemType::Gallery => {
            let single_source =
                db.get_gallery_single_source(item_id)?
                    .ok_or(LibraryError::NotFound {
                        item_type,
                        id: item_id,
                    })?;
            if check_all {
                for (page_id, path) in db.get_gallery_page_paths(item_id)? {
                    entries.push((page_id, path, ItemType::Page));
                }
            } else if let Some(source) = single_source {
                entries.push((item_id, source, ItemType::Gallery));
            } else if let Some(first) = db.first_page(item_id)? {
                let parent = Path::new(&first.path)
                    .parent()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or(first.path);
                entries.push((item_id, parent, ItemType::Gallery));
            }
        }
    }

    let not_empty = !entries.is_empty();
    let mut missing = Vec::new();
    for (id, path, kind) in &entries {
        let present = match source::exists(path) {
            Ok(present) => present,
            Err(SourceError::ArchiveUnreadable { .. }) => false,
        };
        if !present {
            missing.push(MissingSource {
                id: *id,
                item_type: *kind,
            });
        }
    }

    Ok(ExistenceReport {
        exists: missing.is_empty() && not_empty,
        missing,
    })
}

/// Get the next or previous page by gallery or page id.
///
/// At least one of `page_id` and `gallery_id` is required. With a
/// `page_id`, a nonzero `number` equal to that page's own number returns
/// the page itself; otherwise navigation anchors on the requested number
/// (or the page's, when unspecified) within the page's gallery. Running
/// off either end of the gallery yields `None`, not an error.
pub fn get_page(
    db: &Database,
    page_id: Option<i64>,
    gallery_id: Option<i64>,
    number: Option<i64>,
    prev: bool,
) -> Result<Option<Page>> {
    let requested = number.unwrap_or(0);

    let (anchor_gallery, anchor_number) = match (page_id, gallery_id) {
        (Some(page_id), _) => {
            let page = db.get_page(page_id)?.ok_or(LibraryError::NotFound {
                item_type: ItemType::Page,
                id: page_id,
            })?;
            if requested != 0 && requested == page.number {
                return Ok(Some(page));
            }
            let anchor = if requested != 0 { requested } else { page.number };
            (page.gallery_id, anchor)
        }
        (None, Some(gallery_id)) => (gallery_id, requested),
        (None, None) => {
            return Err(LibraryError::InvalidArgument(
                "either a gallery id or page id is required".to_string(),
            )
            .into());
        }
    };

    db.adjacent_page(anchor_gallery, anchor_number, prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        db: Database,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("kura.db")).unwrap();
        db.initialize().unwrap();
        Fixture { dir, db }
    }

    fn page_file(fx: &Fixture, rel: &str) -> String {
        let path = fx.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path)
            .unwrap()
            .write_all(b"page data")
            .unwrap();
        path.to_string_lossy().to_string()
    }

    fn write_zip(fx: &Fixture, rel: &str, entries: &[&str]) -> String {
        let path = fx.dir.path().join(rel);
        let file = File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for entry in entries {
            zip.start_file(*entry, options).unwrap();
            zip.write_all(b"page data").unwrap();
        }
        zip.finish().unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn item_type_parsing() {
        assert_eq!(ItemType::parse("gallery").unwrap(), ItemType::Gallery);
        assert_eq!(ItemType::parse("Page").unwrap(), ItemType::Page);
        assert_eq!(ItemType::parse("1").unwrap(), ItemType::Gallery);
        assert_eq!(ItemType::parse("2").unwrap(), ItemType::Page);

        assert!(matches!(
            ItemType::parse("99999"),
            Err(LibraryError::InvalidArgument(_))
        ));
        assert!(matches!(
            ItemType::parse("album"),
            Err(LibraryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn page_with_present_file_exists() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        let path = page_file(&fx, "g/001.jpg");
        let p = fx.db.insert_page(g, 1, &path, 9, None).unwrap();

        let report = check_existence(&fx.db, ItemType::Page, p, false).unwrap();
        assert!(report.exists);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn page_with_absent_file_is_missing() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        let path = fx.dir.path().join("g/gone.jpg");
        let p = fx
            .db
            .insert_page(g, 1, path.to_str().unwrap(), 9, None)
            .unwrap();

        let report = check_existence(&fx.db, ItemType::Page, p, false).unwrap();
        assert!(!report.exists);
        assert_eq!(
            report.missing,
            vec![MissingSource {
                id: p,
                item_type: ItemType::Page
            }]
        );
    }

    #[test]
    fn unknown_page_id_is_fatal() {
        let fx = fixture();
        let err = check_existence(&fx.db, ItemType::Page, 42, false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LibraryError>(),
            Some(&LibraryError::NotFound {
                item_type: ItemType::Page,
                id: 42
            })
        );
    }

    #[test]
    fn gallery_default_check_probes_first_page_directory() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        let path = page_file(&fx, "g/003.jpg");
        fx.db.insert_page(g, 3, &path, 9, None).unwrap();

        let report = check_existence(&fx.db, ItemType::Gallery, g, false).unwrap();
        assert!(report.exists);

        // Removing the directory makes the representative probe fail
        fs::remove_dir_all(fx.dir.path().join("g")).unwrap();
        let report = check_existence(&fx.db, ItemType::Gallery, g, false).unwrap();
        assert!(!report.exists);
        assert_eq!(
            report.missing,
            vec![MissingSource {
                id: g,
                item_type: ItemType::Gallery
            }]
        );
    }

    #[test]
    fn gallery_single_source_is_probed_directly() {
        let fx = fixture();
        let archive = write_zip(&fx, "packed.zip", &["001.jpg"]);
        let g = fx.db.insert_gallery("packed", Some(&archive)).unwrap();

        // No page rows at all; the archive alone carries the gallery
        let report = check_existence(&fx.db, ItemType::Gallery, g, false).unwrap();
        assert!(report.exists);

        fs::remove_file(&archive).unwrap();
        let report = check_existence(&fx.db, ItemType::Gallery, g, false).unwrap();
        assert!(!report.exists);
    }

    #[test]
    fn gallery_check_all_lists_each_missing_page() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        let kept = page_file(&fx, "g/001.jpg");
        let p1 = fx.db.insert_page(g, 1, &kept, 9, None).unwrap();
        let gone_a = fx.dir.path().join("g/002.jpg");
        let p2 = fx
            .db
            .insert_page(g, 2, gone_a.to_str().unwrap(), 9, None)
            .unwrap();
        let gone_b = fx.dir.path().join("g/003.jpg");
        let p3 = fx
            .db
            .insert_page(g, 3, gone_b.to_str().unwrap(), 9, None)
            .unwrap();

        let report = check_existence(&fx.db, ItemType::Gallery, g, true).unwrap();
        assert!(!report.exists);
        let mut missing_ids: Vec<i64> = report.missing.iter().map(|m| m.id).collect();
        missing_ids.sort();
        assert_eq!(missing_ids, vec![p2, p3]);
        assert!(report.missing.iter().all(|m| m.item_type == ItemType::Page));
        assert!(!missing_ids.contains(&p1));
    }

    #[test]
    fn empty_gallery_never_exists() {
        let fx = fixture();
        let g = fx.db.insert_gallery("empty", None).unwrap();

        for check_all in [false, true] {
            let report = check_existence(&fx.db, ItemType::Gallery, g, check_all).unwrap();
            assert!(!report.exists);
            assert!(report.missing.is_empty());
        }
    }

    #[test]
    fn unreadable_archive_counts_as_missing_not_error() {
        let fx = fixture();
        let archive_path = fx.dir.path().join("broken.zip");
        fs::write(&archive_path, b"not a zip").unwrap();

        let g = fx.db.insert_gallery("broken", None).unwrap();
        let entry = archive_path.join("001.jpg");
        let p = fx
            .db
            .insert_page(g, 1, entry.to_str().unwrap(), 9, None)
            .unwrap();

        let report = check_existence(&fx.db, ItemType::Gallery, g, true).unwrap();
        assert!(!report.exists);
        assert_eq!(report.missing[0].id, p);
    }

    #[test]
    fn get_page_requires_an_id() {
        let fx = fixture();
        let err = get_page(&fx.db, None, None, Some(1), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LibraryError>(),
            Some(LibraryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn get_page_navigates_by_gallery_and_number() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        for n in [1, 4, 9] {
            fx.db
                .insert_page(g, n, &format!("/g/{n:03}.jpg"), 9, None)
                .unwrap();
        }

        let next = get_page(&fx.db, None, Some(g), Some(4), false)
            .unwrap()
            .unwrap();
        assert_eq!(next.number, 9);

        let prev = get_page(&fx.db, None, Some(g), Some(4), true)
            .unwrap()
            .unwrap();
        assert_eq!(prev.number, 1);

        // Off either end: no result, not an error
        assert!(get_page(&fx.db, None, Some(g), Some(9), false)
            .unwrap()
            .is_none());
        assert!(get_page(&fx.db, None, Some(g), Some(1), true)
            .unwrap()
            .is_none());
    }

    #[test]
    fn get_page_defaults_number_to_zero() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        for n in [1, 4] {
            fx.db
                .insert_page(g, n, &format!("/g/{n:03}.jpg"), 9, None)
                .unwrap();
        }

        // next from 0 is the first page
        let first = get_page(&fx.db, None, Some(g), None, false)
            .unwrap()
            .unwrap();
        assert_eq!(first.number, 1);

        // prev from 0 is nothing
        assert!(get_page(&fx.db, None, Some(g), None, true)
            .unwrap()
            .is_none());
    }

    #[test]
    fn get_page_by_page_id() {
        let fx = fixture();
        let g = fx.db.insert_gallery("g", None).unwrap();
        let mut ids = Vec::new();
        for n in [1, 4, 9] {
            ids.push(
                fx.db
                    .insert_page(g, n, &format!("/g/{n:03}.jpg"), 9, None)
                    .unwrap(),
            );
        }

        // Matching number returns the page itself
        let same = get_page(&fx.db, Some(ids[1]), None, Some(4), false)
            .unwrap()
            .unwrap();
        assert_eq!(same.id, ids[1]);

        // No number: anchor on the page's own number
        let next = get_page(&fx.db, Some(ids[1]), None, None, false)
            .unwrap()
            .unwrap();
        assert_eq!(next.number, 9);

        let prev = get_page(&fx.db, Some(ids[1]), None, None, true)
            .unwrap()
            .unwrap();
        assert_eq!(prev.number, 1);

        // A differing nonzero number wins as the anchor
        let from_nine = get_page(&fx.db, Some(ids[0]), None, Some(9), true)
            .unwrap()
            .unwrap();
        assert_eq!(from_nine.number, 4);
    }

    #[test]
    fn get_page_with_unknown_page_id_is_fatal() {
        let fx = fixture();
        let err = get_page(&fx.db, Some(77), None, None, false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LibraryError>(),
            Some(&LibraryError::NotFound {
                item_type: ItemType::Page,
                id: 77
            })
        );
    }
}
