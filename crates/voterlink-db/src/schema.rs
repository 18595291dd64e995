//! SQL schema definitions.

/// Complete schema for the v1 constituency store.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Voters
-- ============================================================

CREATE TABLE IF NOT EXISTS voters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    voter_id TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    full_name TEXT NOT NULL,
    phone_number TEXT,
    email TEXT,
    street TEXT,
    ward TEXT NOT NULL,
    district TEXT NOT NULL,
    constituency TEXT NOT NULL,
    pincode TEXT,
    age INTEGER,
    gender TEXT,
    occupation TEXT,
    education TEXT,
    registration_status TEXT NOT NULL,
    telegram_user_id INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    last_synced_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_voters_ward ON voters(ward);
CREATE INDEX IF NOT EXISTS idx_voters_district ON voters(district);
CREATE INDEX IF NOT EXISTS idx_voters_status ON voters(registration_status);
CREATE INDEX IF NOT EXISTS idx_voters_telegram ON voters(telegram_user_id);
CREATE INDEX IF NOT EXISTS idx_voters_synced ON voters(synced);

-- ============================================================
-- Store settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
