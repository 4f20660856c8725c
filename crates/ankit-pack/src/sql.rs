//! SQLite schema for Anki .apkg files.
//!
//! Uses schema version 11 for maximum compatibility.

/// Pragmas applied to every store before the schema is created.
pub const PRAGMAS: &[(&str, &str)] = &[
    ("foreign_keys", "ON"),
    ("page_size", "4096"),
    ("encoding", "'UTF-8'"),
    ("journal_mode", "DELETE"),
    ("synchronous", "OFF"),
    ("temp_store", "MEMORY"),
];

/// Tables of the collection, in copy order.
pub const TABLES: [&str; 5] = ["notes", "cards", "col", "graves", "revlog"];

/// SQL to create the database schema.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id              INTEGER PRIMARY KEY,
    guid            TEXT NOT NULL,
    mid             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    tags            TEXT NOT NULL,
    flds            TEXT NOT NULL,
    sfld            TEXT NOT NULL,
    csum            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id              INTEGER PRIMARY KEY,
    nid             INTEGER NOT NULL,
    did             INTEGER NOT NULL,
    ord             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    type            INTEGER NOT NULL,
    queue           INTEGER NOT NULL,
    due             INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    reps            INTEGER NOT NULL,
    lapses          INTEGER NOT NULL,
    left            INTEGER NOT NULL,
    odue            INTEGER NOT NULL,
    odid            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS col (
    id              INTEGER PRIMARY KEY,
    crt             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    scm             INTEGER NOT NULL,
    ver             INTEGER NOT NULL,
    dty             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ls              INTEGER NOT NULL,
    conf            TEXT NOT NULL,
    models          TEXT NOT NULL,
    decks           TEXT NOT NULL,
    dconf           TEXT NOT NULL,
    tags            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS graves (
    usn             INTEGER NOT NULL,
    oid             INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS revlog (
    id              INTEGER PRIMARY KEY,
    cid             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ease            INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    lastIvl         INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    time            INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_notes_usn ON notes (usn);
CREATE INDEX IF NOT EXISTS ix_cards_usn ON cards (usn);
CREATE INDEX IF NOT EXISTS ix_revlog_usn ON revlog (usn);
CREATE INDEX IF NOT EXISTS ix_cards_nid ON cards (nid);
CREATE INDEX IF NOT EXISTS ix_cards_sched ON cards (did, queue, due);
CREATE INDEX IF NOT EXISTS ix_revlog_cid ON revlog (cid);
CREATE INDEX IF NOT EXISTS ix_notes_csum ON notes (csum);
"#;

/// Update sequence number marking a row as needing sync.
pub const USN_NEEDS_SYNC: i64 = -1;

/// Scheduling state of a freshly created card.
pub mod new_card {
    /// `type`: new.
    pub const TYPE: i64 = 0;
    /// `queue`: new.
    pub const QUEUE: i64 = 0;
    /// `due`.
    pub const DUE: i64 = 0;
    /// `ivl`.
    pub const INTERVAL: i64 = 0;
    /// `factor`: 250% ease.
    pub const FACTOR: i64 = 2500;
}
