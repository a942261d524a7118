pub const SCHEMA: &str = r#"
-- Galleries table: one row per gallery
CREATE TABLE IF NOT EXISTS galleries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,

    -- Set when the gallery is a single archive file rather than a
    -- directory of loose pages
    single_source TEXT,

    added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_scanned_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_galleries_title ON galleries(title);
CREATE INDEX IF NOT EXISTS idx_galleries_single_source ON galleries(single_source);

-- Pages table: ordered members of a gallery
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    gallery_id INTEGER NOT NULL,
    number INTEGER NOT NULL,     -- position within the gallery; unique, not necessarily contiguous
    path TEXT NOT NULL,          -- backing file, or an entry inside an archive
    size_bytes INTEGER NOT NULL DEFAULT 0,
    sha256_hash TEXT,
    UNIQUE (gallery_id, number),
    FOREIGN KEY (gallery_id) REFERENCES galleries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_pages_gallery ON pages(gallery_id);
CREATE INDEX IF NOT EXISTS idx_pages_gallery_number ON pages(gallery_id, number);

-- Scan history
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    completed_at TEXT,
    galleries_found INTEGER DEFAULT 0,
    galleries_new INTEGER DEFAULT 0,
    pages_new INTEGER DEFAULT 0,
    status TEXT DEFAULT 'running'  -- 'running', 'completed', 'failed'
);
"#;

/// Additive migrations applied after the base schema. Each statement must
/// be safe to attempt against a database that already has it; failures
/// are ignored.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE pages ADD COLUMN sha256_hash TEXT",
    "ALTER TABLE galleries ADD COLUMN last_scanned_at TEXT",
];
