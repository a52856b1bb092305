use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Lookup tables keep a lowercased copy of their natural key so that
// case-insensitive matching is indexable and agrees with `fold_key`.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(name) <= 100),
    folded_key TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_customers_key ON customers (folded_key);

CREATE TABLE IF NOT EXISTS manufacturers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(name) <= 30),
    folded_key TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_manufacturers_key ON manufacturers (folded_key);

CREATE TABLE IF NOT EXISTS filament_colours (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL CHECK (length(description) <= 100),
    folded_key TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_filament_colours_key ON filament_colours (folded_key);

CREATE TABLE IF NOT EXISTS filament_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL CHECK (length(description) <= 15),
    folded_key TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_filament_types_key ON filament_types (folded_key);

CREATE TABLE IF NOT EXISTS model_designs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL CHECK (length(description) <= 5000),
    folded_key TEXT NOT NULL,
    length TEXT NOT NULL,
    summary TEXT NOT NULL CHECK (length(summary) <= 100),
    url TEXT CHECK (url IS NULL OR length(url) <= 2038)
);
CREATE INDEX IF NOT EXISTS idx_model_designs_key ON model_designs (folded_key);

CREATE TABLE IF NOT EXISTS filaments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cost_per_weight TEXT NOT NULL,
    product_id TEXT CHECK (product_id IS NULL OR length(product_id) <= 20),
    reorder_link TEXT CHECK (reorder_link IS NULL OR length(reorder_link) <= 2083),
    manufacturer_id INTEGER NOT NULL REFERENCES manufacturers (id),
    filament_colour_id INTEGER NOT NULL REFERENCES filament_colours (id),
    filament_type_id INTEGER NOT NULL REFERENCES filament_types (id)
);
CREATE INDEX IF NOT EXISTS idx_filaments_manufacturer ON filaments (manufacturer_id);
CREATE INDEX IF NOT EXISTS idx_filaments_colour ON filaments (filament_colour_id);
CREATE INDEX IF NOT EXISTS idx_filaments_type ON filaments (filament_type_id);

CREATE TABLE IF NOT EXISTS printing_projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cost TEXT NOT NULL,
    submitted TEXT NOT NULL,
    completed TEXT,
    customer_id INTEGER NOT NULL REFERENCES customers (id),
    model_design_id INTEGER NOT NULL REFERENCES model_designs (id)
);
CREATE INDEX IF NOT EXISTS idx_projects_customer ON printing_projects (customer_id);
CREATE INDEX IF NOT EXISTS idx_projects_design ON printing_projects (model_design_id);

CREATE TABLE IF NOT EXISTS printing_project_filaments (
    project_id INTEGER NOT NULL REFERENCES printing_projects (id) ON DELETE CASCADE,
    filament_id INTEGER NOT NULL REFERENCES filaments (id),
    position INTEGER NOT NULL,
    PRIMARY KEY (project_id, filament_id)
);
CREATE INDEX IF NOT EXISTS idx_project_filaments_filament ON printing_project_filaments (filament_id);

CREATE TABLE IF NOT EXISTS commit_log (
    rowid INTEGER PRIMARY KEY,
    unit_of_work_id BLOB NOT NULL UNIQUE CHECK (length(unit_of_work_id) = 16),
    committed_at TEXT NOT NULL,
    change_count INTEGER NOT NULL,
    payload BLOB NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32)
);
";

pub(crate) const SEED_COLOURS: [(i64, &str); 17] = [
    (1, "Black"),
    (2, "White"),
    (3, "Red"),
    (4, "Dark Blue"),
    (5, "Light Blue"),
    (6, "Light Green"),
    (7, "Sea Green"),
    (8, "Yellow"),
    (9, "Purple"),
    (10, "Orange"),
    (11, "Pink"),
    (12, "Space Grey"),
    (13, "Silver"),
    (14, "Translucent"),
    (15, "Brown"),
    (16, "Wood"),
    (17, "Marble"),
];

pub(crate) const SEED_TYPES: [(i64, &str); 6] = [
    (1, "PLA"),
    (2, "ABS"),
    (3, "PETG"),
    (4, "TPU"),
    (5, "Nylon"),
    (6, "ASA"),
];

pub(crate) const SEED_MANUFACTURERS: [(i64, &str); 7] = [
    (1, "Elegoo"),
    (2, "Esun"),
    (3, "SUNLU"),
    (4, "Flashforge"),
    (5, "Bambu Lab"),
    (6, "Polymaker"),
    (7, "Creality"),
];

/// (id, manufacturer, colour, type, cost per weight)
pub(crate) const SEED_FILAMENTS: [(i64, i64, i64, i64, &str); 2] =
    [(1, 1, 2, 1, "19.95"), (2, 1, 1, 1, "19.95")];
