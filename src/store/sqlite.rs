//! SQLite-backed store
//!
//! ## Tables
//!
//! - `vessels` - one row per vessel, parent and owner as foreign keys
//! - `forum` - message log entries, host and author as foreign keys
//! - `schema_version` - single-row schema version
//!
//! Rows are cached in memory; `refresh` reloads the cache so a session sees
//! what other connections committed, and `commit` writes staged rows in one
//! transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use super::{MemoryStore, MessageId, Staged, Store, Tables};
use crate::error::{ParadoxError, Result};
use crate::world::{Message, Vessel, VesselId};

pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vessels (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    attr TEXT NOT NULL DEFAULT '',
    parent_id INTEGER NOT NULL REFERENCES vessels(id) DEFERRABLE INITIALLY DEFERRED,
    owner_id INTEGER NOT NULL REFERENCES vessels(id) DEFERRABLE INITIALLY DEFERRED,
    raw_note TEXT NOT NULL DEFAULT '',
    program TEXT NOT NULL DEFAULT '',
    locked INTEGER NOT NULL DEFAULT 0,
    hidden INTEGER NOT NULL DEFAULT 0,
    silent INTEGER NOT NULL DEFAULT 0,
    tunnel INTEGER NOT NULL DEFAULT 0,
    created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS forum (
    id INTEGER PRIMARY KEY,
    host_id INTEGER NOT NULL REFERENCES vessels(id) DEFERRABLE INITIALLY DEFERRED,
    from_id INTEGER NOT NULL REFERENCES vessels(id) DEFERRABLE INITIALLY DEFERRED,
    message TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vessels_parent ON vessels(parent_id);
CREATE INDEX IF NOT EXISTS idx_forum_host ON forum(host_id);
"#;

pub struct SqliteStore {
    conn: Connection,
    cache: Tables,
    staged: Staged,
}

impl SqliteStore {
    /// Open or create a world database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening SQLite world at {:?}", path);
        let conn = Connection::open(path)
            .map_err(|e| ParadoxError::Store(format!("Failed to open SQLite: {}", e)))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ParadoxError::Store(format!("Failed to set PRAGMA: {}", e)))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite world");
        let conn = Connection::open_in_memory()
            .map_err(|e| ParadoxError::Store(format!("Failed to open in-memory SQLite: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        let cache = load(&conn)?;
        Ok(Self {
            conn,
            cache,
            staged: Staged::default(),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);
    if version == 0 {
        info!("Creating world schema v{}", SCHEMA_VERSION);
        conn.execute_batch(SCHEMA)?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?)", [SCHEMA_VERSION])?;
    } else if version > SCHEMA_VERSION {
        return Err(ParadoxError::Store(format!(
            "world schema v{} is newer than supported v{}",
            version, SCHEMA_VERSION
        )));
    }
    Ok(())
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn load(conn: &Connection) -> Result<Tables> {
    let mut tables = Tables::default();

    let mut stmt = conn.prepare(
        "SELECT id, name, attr, parent_id, owner_id, raw_note, program,
                locked, hidden, silent, tunnel, created
         FROM vessels ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Vessel {
            id: row.get(0)?,
            name: row.get(1)?,
            attr: row.get(2)?,
            parent_id: row.get(3)?,
            owner_id: row.get(4)?,
            raw_note: row.get(5)?,
            program: row.get(6)?,
            locked: row.get(7)?,
            hidden: row.get(8)?,
            silent: row.get(9)?,
            tunnel: row.get(10)?,
            created: timestamp(row, 11)?,
        })
    })?;
    for vessel in rows {
        let vessel = vessel?;
        tables.vessels.insert(vessel.id, vessel);
    }

    let mut stmt =
        conn.prepare("SELECT id, host_id, from_id, message, timestamp FROM forum ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Message {
            id: row.get(0)?,
            host_id: row.get(1)?,
            from_id: row.get(2)?,
            message: row.get(3)?,
            timestamp: timestamp(row, 4)?,
        })
    })?;
    for message in rows {
        tables.messages.push(message?);
    }

    Ok(tables)
}

impl Store for SqliteStore {
    fn find(&self, predicate: &dyn Fn(&Vessel) -> bool) -> Vec<Vessel> {
        self.staged.find(&self.cache, predicate)
    }

    fn fork(&self) -> Result<MemoryStore> {
        Ok(MemoryStore::from_parts(self.cache.clone(), self.staged.clone()))
    }

    fn get(&self, id: VesselId) -> Option<Vessel> {
        self.staged.get(&self.cache, id)
    }

    fn count(&self) -> usize {
        self.staged.count(&self.cache)
    }

    fn put(&mut self, vessel: Vessel) {
        self.staged.vessels.insert(vessel.id, vessel);
    }

    fn messages(&self, host_id: VesselId) -> Vec<Message> {
        self.staged.messages(&self.cache, host_id)
    }

    fn append(&mut self, message: Message) {
        self.staged.messages.push(message);
    }

    fn next_vessel_id(&self) -> VesselId {
        self.staged.next_vessel_id(&self.cache)
    }

    fn next_message_id(&self) -> MessageId {
        self.staged.next_message_id(&self.cache)
    }

    fn commit(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let staged = std::mem::take(&mut self.staged);
        debug!(
            vessels = staged.vessels.len(),
            messages = staged.messages.len(),
            "committing to sqlite store"
        );
        let tx = self.conn.transaction()?;
        for v in staged.vessels.values() {
            tx.execute(
                "INSERT INTO vessels (id, name, attr, parent_id, owner_id, raw_note, program,
                                      locked, hidden, silent, tunnel, created)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    attr = excluded.attr,
                    parent_id = excluded.parent_id,
                    owner_id = excluded.owner_id,
                    raw_note = excluded.raw_note,
                    program = excluded.program,
                    locked = excluded.locked,
                    hidden = excluded.hidden,
                    silent = excluded.silent,
                    tunnel = excluded.tunnel",
                params![
                    v.id,
                    v.name,
                    v.attr,
                    v.parent_id,
                    v.owner_id,
                    v.raw_note,
                    v.program,
                    v.locked,
                    v.hidden,
                    v.silent,
                    v.tunnel,
                    v.created.to_rfc3339(),
                ],
            )?;
        }
        for m in &staged.messages {
            tx.execute(
                "INSERT INTO forum (id, host_id, from_id, message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![m.id, m.host_id, m.from_id, m.message, m.timestamp.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        self.cache.absorb(staged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged = Staged::default();
    }

    fn refresh(&mut self) -> Result<()> {
        self.cache = load(&self.conn)?;
        Ok(())
    }
}
