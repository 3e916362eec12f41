use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};

use crate::error::{LedgerError, Result};
use crate::event::Event;
use crate::hashing::event_hash;
use crate::policy::{NoopPolicy, WritePolicy};

use super::migrations;

/// SQLite-backed [`super::EventLog`]. Uses separate reader/writer connections
/// so readers are never blocked behind the writer's transaction, mirroring
/// the split used by the storage layer this crate's knowledge-node backend
/// used to own.
pub struct SqliteEventLog {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    policy: Mutex<Arc<dyn WritePolicy>>,
}

fn configure_connection(conn: &Connection) -> Result<()> {
    #[cfg(feature = "encryption")]
    {
        if let Ok(key) = std::env::var("LEDGER_ENCRYPTION_KEY") {
            if !key.is_empty() {
                conn.pragma_update(None, "key", &key)?;
            }
        }
    }

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA mmap_size = 268435456;
         PRAGMA journal_size_limit = 67108864;
         PRAGMA optimize = 0x10002;",
    )?;

    Ok(())
}

impl SqliteEventLog {
    /// Opens (creating if necessary) the ledger at `db_path`, or at the
    /// platform-specific default data directory when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "selfledger", "core")
                    .ok_or_else(|| LedgerError::Init("could not determine project directories".to_string()))?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("ledger.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            policy: Mutex::new(Arc::new(NoopPolicy)),
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let meta_text: String = row.get("meta")?;
        let meta: Map<String, Value> = serde_json::from_str(&meta_text)
            .ok()
            .and_then(|v: Value| v.as_object().cloned())
            .unwrap_or_default();
        Ok(Event {
            id: row.get("id")?,
            ts: row.get("ts")?,
            kind: row.get("kind")?,
            content: row.get("content")?,
            meta,
            prev_hash: row.get("prev_hash")?,
            hash: row.get("hash")?,
        })
    }

    fn tail_hash(conn: &Connection) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT hash FROM events ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
    }

    fn next_id(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM events", [], |row| {
            row.get(0)
        })
    }
}

impl super::EventLog for SqliteEventLog {
    fn append(&self, kind: &str, content: &str, meta: Map<String, Value>) -> Result<Event> {
        self.policy.lock().unwrap().check(kind, &meta)?;

        let conn = self.writer.lock().unwrap();
        let prev_hash = Self::tail_hash(&conn)?;
        let id = Self::next_id(&conn)?;
        let ts = Utc::now();
        let meta_value = Value::Object(meta.clone());
        let hash = event_hash(prev_hash.as_deref(), kind, content, &meta_value);
        let meta_text = crate::hashing::canonical_json(&meta_value);

        conn.execute(
            "INSERT INTO events (id, ts, kind, content, meta, prev_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, ts, kind, content, meta_text, prev_hash, hash],
        )?;

        Ok(Event {
            id,
            ts,
            kind: kind.to_string(),
            content: content.to_string(),
            meta,
            prev_hash,
            hash,
        })
    }

    fn read_all(&self) -> Result<Vec<Event>> {
        let conn = self.reader.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, ts, kind, content, meta, prev_hash, hash FROM events ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get(&self, id: i64) -> Result<Event> {
        let conn = self.reader.lock().unwrap();
        conn.query_row(
            "SELECT id, ts, kind, content, meta, prev_hash, hash FROM events WHERE id = ?1",
            params![id],
            Self::row_to_event,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => LedgerError::NotFound(id),
            other => LedgerError::Database(other),
        })
    }

    fn read_from(&self, after_id: i64) -> Result<Vec<Event>> {
        let conn = self.reader.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, ts, kind, content, meta, prev_hash, hash FROM events WHERE id > ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![after_id], Self::row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn set_policy(&self, policy: Arc<dyn WritePolicy>) {
        *self.policy.lock().unwrap() = policy;
    }
}
