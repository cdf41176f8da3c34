//! SQLite-backed device cache.
//!
//! # Responsibility
//! - Persist cached cards and the tombstone list in one key/value table.
//!
//! # Invariants
//! - Card documents live under `card-<id>` keys as JSON.
//! - The tombstone list lives under `TOMBSTONE_KEY` and is updated with a
//!   read-modify-write inside one transaction.
//! - Undecodable rows are skipped, never surfaced to callers.
//! - A tombstone list that no longer decodes is copied to
//!   `TOMBSTONE_BACKUP_KEY` before it is rewritten.

use crate::cache::{card_key, CacheError, CacheResult, LocalCardCache, CARD_KEY_PREFIX};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::card::{Card, CardId};
use crate::sync::tombstones::{TombstoneSet, TOMBSTONE_KEY};
use log::warn;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Holds the last tombstone payload that failed to decode.
pub const TOMBSTONE_BACKUP_KEY: &str = "smartshare.deleted-cards.corrupt";

const UPSERT_ENTRY_SQL: &str = "INSERT INTO local_entries (key, value, updated_at)
     VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at;";

/// Persistent cache over the `local_entries` table.
pub struct SqliteCardCache {
    conn: Mutex<Connection>,
}

impl SqliteCardCache {
    /// Opens (and migrates) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalCardCache for SqliteCardCache {
    fn try_put(&self, card: &Card) -> CacheResult<()> {
        let payload = serde_json::to_string(card)?;
        let conn = self.lock();
        conn.execute(UPSERT_ENTRY_SQL, params![card_key(&card.id), payload])
            .map_err(map_write_error)?;
        Ok(())
    }

    fn get(&self, id: &CardId) -> Option<Card> {
        let conn = self.lock();
        let payload = match read_entry(&conn, &card_key(id)) {
            Ok(payload) => payload?,
            Err(err) => {
                warn!(
                    "event=cache_get module=cache status=error card_id={} error={}",
                    id, err
                );
                return None;
            }
        };
        decode_card(&card_key(id), &payload)
    }

    fn remove(&self, id: &CardId) {
        let conn = self.lock();
        if let Err(err) = conn.execute(
            "DELETE FROM local_entries WHERE key = ?1;",
            [card_key(id)],
        ) {
            warn!(
                "event=cache_remove module=cache status=degraded card_id={} error={}",
                id, err
            );
        }
    }

    fn cached_cards(&self) -> Vec<Card> {
        let conn = self.lock();
        match read_card_rows(&conn) {
            Ok(rows) => rows
                .iter()
                .filter_map(|(key, payload)| decode_card(key, payload))
                .collect(),
            Err(err) => {
                warn!(
                    "event=cache_list module=cache status=error error={}",
                    err
                );
                Vec::new()
            }
        }
    }

    fn tombstones(&self) -> TombstoneSet {
        let conn = self.lock();
        match read_entry(&conn, TOMBSTONE_KEY) {
            Ok(Some(payload)) => TombstoneSet::decode(&payload),
            Ok(None) => TombstoneSet::new(),
            Err(err) => {
                warn!(
                    "event=tombstones_read module=cache status=error error={}",
                    err
                );
                TombstoneSet::new()
            }
        }
    }

    fn add_tombstone(&self, id: &CardId) {
        let mut conn = self.lock();
        if let Err(err) = append_tombstone(&mut conn, id) {
            warn!(
                "event=tombstone_add module=cache status=degraded card_id={} error={}",
                id, err
            );
        }
    }
}

fn append_tombstone(conn: &mut Connection, id: &CardId) -> CacheResult<()> {
    let tx = conn.transaction()?;
    let mut set = match read_entry(&tx, TOMBSTONE_KEY)? {
        Some(payload) => match TombstoneSet::try_decode(&payload) {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    "event=tombstones_decode module=cache status=backup key={} error={}",
                    TOMBSTONE_BACKUP_KEY, err
                );
                tx.execute(UPSERT_ENTRY_SQL, params![TOMBSTONE_BACKUP_KEY, payload])
                    .map_err(map_write_error)?;
                TombstoneSet::new()
            }
        },
        None => TombstoneSet::new(),
    };
    if set.insert(id.clone()) {
        tx.execute(UPSERT_ENTRY_SQL, params![TOMBSTONE_KEY, set.encode()])
            .map_err(map_write_error)?;
    }
    tx.commit()?;
    Ok(())
}

fn read_entry(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM local_entries WHERE key = ?1;",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

fn read_card_rows(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT key, value
         FROM local_entries
         WHERE substr(key, 1, ?1) = ?2
         ORDER BY key ASC;",
    )?;
    let prefix_len = CARD_KEY_PREFIX.len() as i64;
    let rows = stmt.query_map(params![prefix_len, CARD_KEY_PREFIX], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn decode_card(key: &str, payload: &str) -> Option<Card> {
    match serde_json::from_str::<Card>(payload) {
        Ok(card) => Some(card),
        Err(err) => {
            warn!(
                "event=cache_decode module=cache status=skip key={} error={}",
                key, err
            );
            None
        }
    }
}

fn map_write_error(err: rusqlite::Error) -> CacheError {
    if err.sqlite_error_code() == Some(ErrorCode::DiskFull) {
        return CacheError::QuotaExceeded;
    }
    CacheError::from(err)
}
