//! Row types for galleries and pages.

use serde::Serialize;

/// A gallery record.
///
/// A gallery is backed either by a directory of loose page files or by a
/// single archive, in which case `single_source` holds the archive path.
#[derive(Debug, Clone, Serialize)]
pub struct Gallery {
    pub id: i64,
    pub title: String,
    pub single_source: Option<String>,
    pub added_at: String,
    pub last_scanned_at: Option<String>,
}

/// A page record.
///
/// `number` is the page's position within its gallery. Numbers are unique
/// per gallery and totally ordered but not guaranteed contiguous.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: i64,
    pub gallery_id: i64,
    pub number: i64,
    pub path: String,
    pub size_bytes: i64,
    pub sha256_hash: Option<String>,
}

/// Aggregate counts for the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub galleries: i64,
    pub pages: i64,
    pub scans_completed: i64,
    pub last_scan_at: Option<String>,
}
