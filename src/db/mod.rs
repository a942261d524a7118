mod schema;
pub mod gallery;
pub mod sqlite;

use anyhow::Result;
use std::path::PathBuf;

pub use gallery::{Gallery, LibraryStats, Page};
pub use schema::{MIGRATIONS, SCHEMA};

/// Handle to the library database.
///
/// Query operations take this handle explicitly; nothing in the crate
/// reaches for a process-wide connection.
pub struct Database {
    inner: sqlite::SqliteDb,
}

impl Database {
    pub fn open(path: &PathBuf) -> Result<Self> {
        let db = sqlite::SqliteDb::open(path)?;
        Ok(Self { inner: db })
    }

    pub fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    // ========================================================================
    // Gallery operations
    // ========================================================================

    pub fn get_gallery(&self, id: i64) -> Result<Option<Gallery>> {
        self.inner.get_gallery(id)
    }

    pub fn get_gallery_single_source(&self, id: i64) -> Result<Option<Option<String>>> {
        self.inner.get_gallery_single_source(id)
    }

    pub fn find_gallery(&self, title: &str, single_source: Option<&str>) -> Result<Option<i64>> {
        self.inner.find_gallery(title, single_source)
    }

    pub fn insert_gallery(&self, title: &str, single_source: Option<&str>) -> Result<i64> {
        self.inner.insert_gallery(title, single_source)
    }

    pub fn touch_gallery_scanned(&self, id: i64, timestamp: &str) -> Result<()> {
        self.inner.touch_gallery_scanned(id, timestamp)
    }

    pub fn list_galleries(&self) -> Result<Vec<(Gallery, i64)>> {
        self.inner.list_galleries()
    }

    // ========================================================================
    // Page operations
    // ========================================================================

    pub fn get_page(&self, id: i64) -> Result<Option<Page>> {
        self.inner.get_page(id)
    }

    pub fn get_page_path(&self, id: i64) -> Result<Option<String>> {
        self.inner.get_page_path(id)
    }

    pub fn first_page(&self, gallery_id: i64) -> Result<Option<Page>> {
        self.inner.first_page(gallery_id)
    }

    pub fn get_gallery_page_paths(&self, gallery_id: i64) -> Result<Vec<(i64, String)>> {
        self.inner.get_gallery_page_paths(gallery_id)
    }

    pub fn adjacent_page(&self, gallery_id: i64, number: i64, prev: bool) -> Result<Option<Page>> {
        self.inner.adjacent_page(gallery_id, number, prev)
    }

    pub fn insert_page(
        &self,
        gallery_id: i64,
        number: i64,
        path: &str,
        size_bytes: i64,
        sha256_hash: Option<&str>,
    ) -> Result<i64> {
        self.inner.insert_page(gallery_id, number, path, size_bytes, sha256_hash)
    }

    // ========================================================================
    // Scan history operations
    // ========================================================================

    pub fn record_scan_started(&self, root: &str, started_at: &str) -> Result<i64> {
        self.inner.record_scan_started(root, started_at)
    }

    pub fn record_scan_completed(
        &self,
        scan_id: i64,
        completed_at: &str,
        galleries_found: usize,
        galleries_new: usize,
        pages_new: usize,
    ) -> Result<()> {
        self.inner
            .record_scan_completed(scan_id, completed_at, galleries_found, galleries_new, pages_new)
    }

    pub fn record_scan_failed(&self, scan_id: i64, completed_at: &str) -> Result<()> {
        self.inner.record_scan_failed(scan_id, completed_at)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn get_stats(&self) -> Result<LibraryStats> {
        self.inner.get_stats()
    }
}
