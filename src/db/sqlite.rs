//! SQLite backend implementation.

use anyhow::Result;
use rusqlite::Connection;
use std::path::PathBuf;

use super::gallery::{Gallery, LibraryStats, Page};
use super::schema::{MIGRATIONS, SCHEMA};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

fn page_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        gallery_id: row.get(1)?,
        number: row.get(2)?,
        path: row.get(3)?,
        size_bytes: row.get(4)?,
        sha256_hash: row.get(5)?,
    })
}

impl SqliteDb {
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    // ========================================================================
    // Gallery operations
    // ========================================================================

    pub fn get_gallery(&self, id: i64) -> Result<Option<Gallery>> {
        let result = self.conn.query_row(
            "SELECT id, title, single_source, added_at, last_scanned_at FROM galleries WHERE id = ?",
            [id],
            |row| {
                Ok(Gallery {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    single_source: row.get(2)?,
                    added_at: row.get(3)?,
                    last_scanned_at: row.get(4)?,
                })
            },
        );
        match result {
            Ok(gallery) => Ok(Some(gallery)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch only the `single_source` column of a gallery.
    ///
    /// The outer `None` means the gallery row itself does not exist; the
    /// inner `None` means the gallery is directory-backed.
    pub fn get_gallery_single_source(&self, id: i64) -> Result<Option<Option<String>>> {
        let result = self.conn.query_row(
            "SELECT single_source FROM galleries WHERE id = ?",
            [id],
            |row| row.get::<_, Option<String>>(0),
        );
        match result {
            Ok(source) => Ok(Some(source)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_gallery(&self, title: &str, single_source: Option<&str>) -> Result<Option<i64>> {
        let result = match single_source {
            Some(source) => self.conn.query_row(
                "SELECT id FROM galleries WHERE title = ? AND single_source = ?",
                rusqlite::params![title, source],
                |row| row.get(0),
            ),
            None => self.conn.query_row(
                "SELECT id FROM galleries WHERE title = ? AND single_source IS NULL",
                [title],
                |row| row.get(0),
            ),
        };
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_gallery(&self, title: &str, single_source: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO galleries (title, single_source) VALUES (?, ?)",
            rusqlite::params![title, single_source],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn touch_gallery_scanned(&self, id: i64, timestamp: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE galleries SET last_scanned_at = ? WHERE id = ?",
            rusqlite::params![timestamp, id],
        )?;
        Ok(())
    }

    pub fn list_galleries(&self) -> Result<Vec<(Gallery, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT g.id, g.title, g.single_source, g.added_at, g.last_scanned_at,
                   COUNT(p.id) AS page_count
            FROM galleries g
            LEFT JOIN pages p ON p.gallery_id = g.id
            GROUP BY g.id
            ORDER BY g.title
            "#,
        )?;
        let galleries = stmt
            .query_map([], |row| {
                Ok((
                    Gallery {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        single_source: row.get(2)?,
                        added_at: row.get(3)?,
                        last_scanned_at: row.get(4)?,
                    },
                    row.get::<_, i64>(5)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(galleries)
    }

    // ========================================================================
    // Page operations
    // ========================================================================

    pub fn get_page(&self, id: i64) -> Result<Option<Page>> {
        let result = self.conn.query_row(
            "SELECT id, gallery_id, number, path, size_bytes, sha256_hash FROM pages WHERE id = ?",
            [id],
            page_from_row,
        );
        match result {
            Ok(page) => Ok(Some(page)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch only the `path` column of a page.
    pub fn get_page_path(&self, id: i64) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT path FROM pages WHERE id = ?",
            [id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(path) => Ok(Some(path)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The gallery's first page by lowest `number`.
    pub fn first_page(&self, gallery_id: i64) -> Result<Option<Page>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, gallery_id, number, path, size_bytes, sha256_hash
            FROM pages
            WHERE gallery_id = ?
            ORDER BY number ASC
            LIMIT 1
            "#,
            [gallery_id],
            page_from_row,
        );
        match result {
            Ok(page) => Ok(Some(page)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// `(id, path)` for every page of a gallery.
    pub fn get_gallery_page_paths(&self, gallery_id: i64) -> Result<Vec<(i64, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path FROM pages WHERE gallery_id = ? ORDER BY number")?;
        let paths = stmt
            .query_map([gallery_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(paths)
    }

    /// The page adjacent to `number` within a gallery.
    ///
    /// With `prev` false this is the smallest `number` strictly greater
    /// than the anchor; with `prev` true, the largest strictly smaller.
    pub fn adjacent_page(&self, gallery_id: i64, number: i64, prev: bool) -> Result<Option<Page>> {
        let sql = if prev {
            r#"
            SELECT id, gallery_id, number, path, size_bytes, sha256_hash
            FROM pages
            WHERE gallery_id = ? AND number < ?
            ORDER BY number DESC
            LIMIT 1
            "#
        } else {
            r#"
            SELECT id, gallery_id, number, path, size_bytes, sha256_hash
            FROM pages
            WHERE gallery_id = ? AND number > ?
            ORDER BY number ASC
            LIMIT 1
            "#
        };
        let result = self
            .conn
            .query_row(sql, rusqlite::params![gallery_id, number], page_from_row);
        match result {
            Ok(page) => Ok(Some(page)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_page(
        &self,
        gallery_id: i64,
        number: i64,
        path: &str,
        size_bytes: i64,
        sha256_hash: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pages (gallery_id, number, path, size_bytes, sha256_hash) VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![gallery_id, number, path, size_bytes, sha256_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ========================================================================
    // Scan history operations
    // ========================================================================

    pub fn record_scan_started(&self, root: &str, started_at: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scans (root, started_at) VALUES (?, ?)",
            rusqlite::params![root, started_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn record_scan_completed(
        &self,
        scan_id: i64,
        completed_at: &str,
        galleries_found: usize,
        galleries_new: usize,
        pages_new: usize,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE scans
            SET completed_at = ?, galleries_found = ?, galleries_new = ?, pages_new = ?,
                status = 'completed'
            WHERE id = ?
            "#,
            rusqlite::params![
                completed_at,
                galleries_found as i64,
                galleries_new as i64,
                pages_new as i64,
                scan_id
            ],
        )?;
        Ok(())
    }

    pub fn record_scan_failed(&self, scan_id: i64, completed_at: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE scans SET completed_at = ?, status = 'failed' WHERE id = ?",
            rusqlite::params![completed_at, scan_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn get_stats(&self) -> Result<LibraryStats> {
        let galleries: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM galleries", [], |row| row.get(0))?;
        let pages: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        let scans_completed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )?;
        let last_scan_at: Option<String> = self.conn.query_row(
            "SELECT MAX(completed_at) FROM scans WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )?;
        Ok(LibraryStats {
            galleries,
            pages,
            scans_completed,
            last_scan_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db() -> (tempfile::TempDir, SqliteDb) {
        let dir = tempdir().unwrap();
        let db = SqliteDb::open(&dir.path().join("kura.db")).unwrap();
        db.initialize().unwrap();
        (dir, db)
    }

    #[test]
    fn gallery_roundtrip() {
        let (_dir, db) = open_db();
        let id = db.insert_gallery("vacation", None).unwrap();

        let gallery = db.get_gallery(id).unwrap().unwrap();
        assert_eq!(gallery.title, "vacation");
        assert_eq!(gallery.single_source, None);

        assert!(db.get_gallery(id + 1).unwrap().is_none());
    }

    #[test]
    fn single_source_projection_distinguishes_missing_row() {
        let (_dir, db) = open_db();
        let dir_gallery = db.insert_gallery("loose", None).unwrap();
        let arc_gallery = db.insert_gallery("packed", Some("/lib/packed.zip")).unwrap();

        assert_eq!(db.get_gallery_single_source(dir_gallery).unwrap(), Some(None));
        assert_eq!(
            db.get_gallery_single_source(arc_gallery).unwrap(),
            Some(Some("/lib/packed.zip".to_string()))
        );
        assert_eq!(db.get_gallery_single_source(9999).unwrap(), None);
    }

    #[test]
    fn first_page_picks_lowest_number() {
        let (_dir, db) = open_db();
        let g = db.insert_gallery("g", None).unwrap();
        db.insert_page(g, 7, "/g/007.jpg", 10, None).unwrap();
        db.insert_page(g, 3, "/g/003.jpg", 10, None).unwrap();
        db.insert_page(g, 5, "/g/005.jpg", 10, None).unwrap();

        let first = db.first_page(g).unwrap().unwrap();
        assert_eq!(first.number, 3);
        assert_eq!(first.path, "/g/003.jpg");
    }

    #[test]
    fn adjacent_page_walks_number_order() {
        let (_dir, db) = open_db();
        let g = db.insert_gallery("g", None).unwrap();
        // Non-contiguous numbering on purpose
        for n in [1, 4, 9] {
            db.insert_page(g, n, &format!("/g/{n:03}.jpg"), 10, None)
                .unwrap();
        }

        let next = db.adjacent_page(g, 4, false).unwrap().unwrap();
        assert_eq!(next.number, 9);

        let prev = db.adjacent_page(g, 4, true).unwrap().unwrap();
        assert_eq!(prev.number, 1);

        assert!(db.adjacent_page(g, 9, false).unwrap().is_none());
        assert!(db.adjacent_page(g, 1, true).unwrap().is_none());
    }

    #[test]
    fn duplicate_page_number_rejected() {
        let (_dir, db) = open_db();
        let g = db.insert_gallery("g", None).unwrap();
        db.insert_page(g, 1, "/g/001.jpg", 10, None).unwrap();
        assert!(db.insert_page(g, 1, "/g/dup.jpg", 10, None).is_err());
    }

    #[test]
    fn stats_counts_completed_scans() {
        let (_dir, db) = open_db();
        let g = db.insert_gallery("g", None).unwrap();
        db.insert_page(g, 1, "/g/001.jpg", 10, None).unwrap();

        let scan = db.record_scan_started("/library", "2026-08-06T10:00:00").unwrap();
        db.record_scan_completed(scan, "2026-08-06T10:00:05", 1, 1, 1)
            .unwrap();
        let failed = db.record_scan_started("/library", "2026-08-06T11:00:00").unwrap();
        db.record_scan_failed(failed, "2026-08-06T11:00:01").unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.galleries, 1);
        assert_eq!(stats.pages, 1);
        assert_eq!(stats.scans_completed, 1);
        assert_eq!(stats.last_scan_at.as_deref(), Some("2026-08-06T10:00:05"));
    }
}
