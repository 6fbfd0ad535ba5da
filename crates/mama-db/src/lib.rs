//! Storage layer for the mama pregnancy tracker.
//!
//! Provides persistence for labor sessions, their contractions, and kick
//! counts using `rusqlite`, implementing the `mama-core` store traits.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2024-01-15T10:30:00.000Z`), always UTC. Lexicographic ordering matches
//! chronological ordering, and the values read naturally in the database.
//!
//! ## Recording Order
//!
//! Contractions carry a per-session `seq` assigned at append time. Reads
//! order by `seq`, never by timestamp, so the list round-trips exactly as
//! it was recorded even if a clock adjustment produced out-of-order start
//! instants.
//!
//! ## Durations
//!
//! `duration_seconds` and `duration_minutes` are frozen by the domain layer
//! when an event completes and are returned exactly as stored, never
//! recomputed from the timestamps on read.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;

use mama_core::kicks::KickCount;
use mama_core::session::{Contraction, ContractionSession, Intensity};
use mama_core::store::{KickStore, SessionStore, StoreError};
use mama_core::{ContractionId, KickId, SessionId, UserId, ValidationError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row fails domain validation.
    #[error("invalid row for {record_id}: {message}")]
    InvalidRow { record_id: String, message: String },
    /// More than one active session for one user; the data is corrupt.
    #[error("{count} active sessions stored for user {user_id}")]
    MultipleActiveSessions { user_id: String, count: usize },
    /// The addressed session does not exist, or is not active where the
    /// operation requires an active one.
    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },
    /// Close of a session that is already closed.
    #[error("session {session_id} is already closed")]
    SessionClosed { session_id: String },
    /// The user already has an active session.
    #[error("user {user_id} already has an active session")]
    ActiveSessionExists { user_id: String },
    /// The addressed kick count does not exist.
    #[error("kick count {id} not found")]
    KickCountNotFound { id: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SessionNotFound { session_id } => Self::NotFound { id: session_id },
            DbError::KickCountNotFound { id } => Self::NotFound { id },
            DbError::SessionClosed { session_id } => Self::AlreadyClosed { session_id },
            DbError::ActiveSessionExists { user_id } => Self::ActiveSessionExists { user_id },
            DbError::TimestampParse { .. }
            | DbError::InvalidRow { .. }
            | DbError::MultipleActiveSessions { .. } => Self::Consistency {
                message: err.to_string(),
            },
            DbError::Sqlite(_) => Self::backend(err),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A raw session row before domain conversion.
#[derive(Debug)]
struct SessionRow {
    id: String,
    user_id: String,
    started_at: String,
    ended_at: Option<String>,
    is_active: bool,
}

/// A raw contraction row before domain conversion.
#[derive(Debug)]
struct ContractionRow {
    id: String,
    started_at: String,
    ended_at: Option<String>,
    duration_seconds: Option<i64>,
    intensity: String,
    notes: Option<String>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user_active ON sessions(user_id, is_active);

            -- Contractions: seq is the per-session recording order,
            -- assigned at append time. Reads order by seq, not timestamp.
            CREATE TABLE IF NOT EXISTS contractions (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                duration_seconds INTEGER,
                intensity TEXT NOT NULL DEFAULT 'moderate',
                notes TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_contractions_session_seq
                ON contractions(session_id, seq);

            CREATE TABLE IF NOT EXISTS kick_counts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                count INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_kick_counts_user ON kick_counts(user_id);
            ",
        )?;
        Ok(())
    }

    /// Lists a user's sessions, newest first, contractions in recording order.
    pub fn list_sessions_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ContractionSession>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, started_at, ended_at, is_active
            FROM sessions
            WHERE user_id = ?
            ORDER BY started_at DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], session_row)?;
        let mut session_rows = Vec::new();
        for row in rows {
            session_rows.push(row?);
        }

        let mut contractions = self.contractions_by_session(user_id)?;
        let mut sessions = Vec::new();
        for row in session_rows {
            let events = contractions.remove(&row.id).unwrap_or_default();
            sessions.push(session_from_row(row, events)?);
        }
        Ok(sessions)
    }

    /// The user's single active session with contractions loaded, if any.
    ///
    /// Two or more active rows is corrupt state and fails rather than
    /// silently picking one.
    pub fn get_active_session_for(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContractionSession>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, started_at, ended_at, is_active
            FROM sessions
            WHERE user_id = ? AND is_active = 1
            ",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], session_row)?;
        let mut active = Vec::new();
        for row in rows {
            active.push(row?);
        }
        match active.len() {
            0 => Ok(None),
            1 => {
                let Some(row) = active.into_iter().next() else {
                    return Ok(None);
                };
                let events = self.contractions_for(&row.id)?;
                Ok(Some(session_from_row(row, events)?))
            }
            count => Err(DbError::MultipleActiveSessions {
                user_id: user_id.to_string(),
                count,
            }),
        }
    }

    /// One session by id with contractions loaded.
    pub fn get_session_by_id(
        &self,
        session_id: &SessionId,
    ) -> Result<ContractionSession, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, started_at, ended_at, is_active
            FROM sessions
            WHERE id = ?
            ",
        )?;
        let rows = stmt.query_map(params![session_id.as_str()], session_row)?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row?);
        }
        let Some(row) = found.into_iter().next() else {
            return Err(DbError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        };
        let events = self.contractions_for(&row.id)?;
        session_from_row(row, events)
    }

    /// Persists a new session, refusing a second active one per user.
    ///
    /// Any contractions already carried by the session are stored with it,
    /// in list order.
    pub fn insert_session(&mut self, session: &ContractionSession) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        if session.is_active {
            let active: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ? AND is_active = 1",
                params![session.user_id.as_str()],
                |row| row.get(0),
            )?;
            if active > 0 {
                return Err(DbError::ActiveSessionExists {
                    user_id: session.user_id.to_string(),
                });
            }
        }
        tx.execute(
            "
            INSERT INTO sessions (id, user_id, started_at, ended_at, is_active)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                session.id.as_str(),
                session.user_id.as_str(),
                format_timestamp(session.started_at),
                session.ended_at.map(format_timestamp),
                session.is_active,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO contractions
                (id, session_id, seq, started_at, ended_at, duration_seconds, intensity, notes)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for (seq, contraction) in (0_i64..).zip(session.contractions.iter()) {
                stmt.execute(params![
                    contraction.id.as_str(),
                    session.id.as_str(),
                    seq,
                    format_timestamp(contraction.started_at),
                    contraction.ended_at.map(format_timestamp),
                    contraction.duration_seconds,
                    contraction.intensity.as_str(),
                    contraction.notes,
                ])?;
            }
        }
        tx.commit()?;
        debug!(session_id = %session.id, user_id = %session.user_id, "session stored");
        Ok(())
    }

    /// Appends one contraction to an active session, after everything
    /// already stored for it.
    pub fn append_contraction_to(
        &mut self,
        session_id: &SessionId,
        contraction: &Contraction,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        let state = session_state(&tx, session_id)?;
        match state {
            None | Some(false) => {
                // A closed session is no longer an append target.
                return Err(DbError::SessionNotFound {
                    session_id: session_id.to_string(),
                });
            }
            Some(true) => {}
        }
        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM contractions WHERE session_id = ?",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        tx.execute(
            "
            INSERT INTO contractions
            (id, session_id, seq, started_at, ended_at, duration_seconds, intensity, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                contraction.id.as_str(),
                session_id.as_str(),
                seq,
                format_timestamp(contraction.started_at),
                contraction.ended_at.map(format_timestamp),
                contraction.duration_seconds,
                contraction.intensity.as_str(),
                contraction.notes,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Marks a session closed, stamping its end instant.
    pub fn close_session_at(
        &mut self,
        session_id: &SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        match session_state(&tx, session_id)? {
            None => {
                return Err(DbError::SessionNotFound {
                    session_id: session_id.to_string(),
                });
            }
            Some(false) => {
                return Err(DbError::SessionClosed {
                    session_id: session_id.to_string(),
                });
            }
            Some(true) => {}
        }
        tx.execute(
            "UPDATE sessions SET is_active = 0, ended_at = ? WHERE id = ?",
            params![format_timestamp(ended_at), session_id.as_str()],
        )?;
        tx.commit()?;
        debug!(session_id = %session_id, "session closed");
        Ok(())
    }

    /// Removes a session; its contractions go with it.
    pub fn delete_session_by_id(&mut self, session_id: &SessionId) -> Result<(), DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?",
            params![session_id.as_str()],
        )?;
        if deleted == 0 {
            return Err(DbError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }
        debug!(session_id = %session_id, "session deleted");
        Ok(())
    }

    /// Lists a user's kick counts, newest first.
    pub fn list_kick_counts_for(&self, user_id: &UserId) -> Result<Vec<KickCount>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, started_at, ended_at, count, duration_minutes, notes
            FROM kick_counts
            WHERE user_id = ?
            ORDER BY started_at DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, user, started_at, ended_at, count, duration_minutes, notes) = row?;
            let count = u32::try_from(count).map_err(|_| DbError::InvalidRow {
                record_id: id.clone(),
                message: format!("negative kick count: {count}"),
            })?;
            records.push(KickCount {
                id: parse_id::<KickId>(&id, "kick count ID")?,
                user_id: parse_id::<UserId>(&user, "user ID")?,
                started_at: parse_timestamp(&started_at, &id)?,
                ended_at: parse_timestamp(&ended_at, &id)?,
                count,
                duration_minutes,
                notes,
            });
        }
        Ok(records)
    }

    /// Persists one finished kick-counting sitting.
    pub fn insert_kick_count_record(&mut self, record: &KickCount) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO kick_counts
            (id, user_id, started_at, ended_at, count, duration_minutes, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                record.id.as_str(),
                record.user_id.as_str(),
                format_timestamp(record.started_at),
                format_timestamp(record.ended_at),
                i64::from(record.count),
                record.duration_minutes,
                record.notes,
            ],
        )?;
        debug!(kick_count_id = %record.id, count = record.count, "kick count stored");
        Ok(())
    }

    /// Removes one kick count by id.
    pub fn delete_kick_count_by_id(&mut self, id: &KickId) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM kick_counts WHERE id = ?", params![id.as_str()])?;
        if deleted == 0 {
            return Err(DbError::KickCountNotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Contractions for every session of a user, grouped by session id,
    /// each group in recording order.
    fn contractions_by_session(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, Vec<Contraction>>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT c.session_id, c.id, c.started_at, c.ended_at, c.duration_seconds,
                   c.intensity, c.notes
            FROM contractions c
            JOIN sessions s ON s.id = c.session_id
            WHERE s.user_id = ?
            ORDER BY c.session_id ASC, c.seq ASC
            ",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], |row| {
            let session_id: String = row.get(0)?;
            Ok((
                session_id,
                ContractionRow {
                    id: row.get(1)?,
                    started_at: row.get(2)?,
                    ended_at: row.get(3)?,
                    duration_seconds: row.get(4)?,
                    intensity: row.get(5)?,
                    notes: row.get(6)?,
                },
            ))
        })?;
        let mut grouped: HashMap<String, Vec<Contraction>> = HashMap::new();
        for row in rows {
            let (session_id, contraction_row) = row?;
            grouped
                .entry(session_id)
                .or_default()
                .push(contraction_from_row(contraction_row)?);
        }
        Ok(grouped)
    }

    /// Contractions for one session, in recording order.
    fn contractions_for(&self, session_id: &str) -> Result<Vec<Contraction>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, started_at, ended_at, duration_seconds, intensity, notes
            FROM contractions
            WHERE session_id = ?
            ORDER BY seq ASC
            ",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(ContractionRow {
                id: row.get(0)?,
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                duration_seconds: row.get(3)?,
                intensity: row.get(4)?,
                notes: row.get(5)?,
            })
        })?;
        let mut contractions = Vec::new();
        for row in rows {
            contractions.push(contraction_from_row(row?)?);
        }
        Ok(contractions)
    }
}

impl SessionStore for Database {
    fn list_sessions(&self, user_id: &UserId) -> Result<Vec<ContractionSession>, StoreError> {
        Ok(self.list_sessions_for(user_id)?)
    }

    fn get_active_session(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContractionSession>, StoreError> {
        Ok(self.get_active_session_for(user_id)?)
    }

    fn get_session(&self, session_id: &SessionId) -> Result<ContractionSession, StoreError> {
        Ok(self.get_session_by_id(session_id)?)
    }

    fn create_session(&mut self, session: &ContractionSession) -> Result<(), StoreError> {
        Ok(self.insert_session(session)?)
    }

    fn append_contraction(
        &mut self,
        session_id: &SessionId,
        contraction: &Contraction,
    ) -> Result<(), StoreError> {
        Ok(self.append_contraction_to(session_id, contraction)?)
    }

    fn close_session(
        &mut self,
        session_id: &SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(self.close_session_at(session_id, ended_at)?)
    }

    fn delete_session(&mut self, session_id: &SessionId) -> Result<(), StoreError> {
        Ok(self.delete_session_by_id(session_id)?)
    }
}

impl KickStore for Database {
    fn list_kick_counts(&self, user_id: &UserId) -> Result<Vec<KickCount>, StoreError> {
        Ok(self.list_kick_counts_for(user_id)?)
    }

    fn insert_kick_count(&mut self, record: &KickCount) -> Result<(), StoreError> {
        Ok(self.insert_kick_count_record(record)?)
    }

    fn delete_kick_count(&mut self, id: &KickId) -> Result<(), StoreError> {
        Ok(self.delete_kick_count_by_id(id)?)
    }
}

fn session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        is_active: row.get(4)?,
    })
}

/// `Some(is_active)` for an existing session, `None` for a missing one.
fn session_state(
    tx: &rusqlite::Transaction<'_>,
    session_id: &SessionId,
) -> Result<Option<bool>, DbError> {
    let mut stmt = tx.prepare("SELECT is_active FROM sessions WHERE id = ?")?;
    let rows = stmt.query_map(params![session_id.as_str()], |row| row.get::<_, bool>(0))?;
    for row in rows {
        return Ok(Some(row?));
    }
    Ok(None)
}

fn session_from_row(
    row: SessionRow,
    contractions: Vec<Contraction>,
) -> Result<ContractionSession, DbError> {
    let started_at = parse_timestamp(&row.started_at, &row.id)?;
    let ended_at = row
        .ended_at
        .as_deref()
        .map(|value| parse_timestamp(value, &row.id))
        .transpose()?;
    Ok(ContractionSession {
        id: parse_id::<SessionId>(&row.id, "session ID")?,
        user_id: parse_id::<UserId>(&row.user_id, "user ID")?,
        started_at,
        ended_at,
        is_active: row.is_active,
        contractions,
    })
}

fn contraction_from_row(row: ContractionRow) -> Result<Contraction, DbError> {
    let started_at = parse_timestamp(&row.started_at, &row.id)?;
    let ended_at = row
        .ended_at
        .as_deref()
        .map(|value| parse_timestamp(value, &row.id))
        .transpose()?;
    if ended_at.is_some() != row.duration_seconds.is_some() {
        return Err(DbError::InvalidRow {
            record_id: row.id,
            message: "contraction has an end instant without a duration, or vice versa".into(),
        });
    }
    let intensity: Intensity = row.intensity.parse().map_err(|_| DbError::InvalidRow {
        record_id: row.id.clone(),
        message: format!("unknown intensity: {}", row.intensity),
    })?;
    Ok(Contraction {
        id: parse_id::<ContractionId>(&row.id, "contraction ID")?,
        started_at,
        ended_at,
        duration_seconds: row.duration_seconds,
        intensity,
        notes: row.notes,
    })
}

fn parse_id<T>(value: &str, what: &'static str) -> Result<T, DbError>
where
    T: TryFrom<String, Error = ValidationError>,
{
    T::try_from(value.to_string()).map_err(|err| DbError::InvalidRow {
        record_id: value.to_string(),
        message: format!("invalid {what}: {err}"),
    })
}

fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mama_core::kicks::KickTally;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn user() -> UserId {
        UserId::new("test-user").unwrap()
    }

    fn other_user() -> UserId {
        UserId::new("someone-else").unwrap()
    }

    fn completed(start: i64, duration: i64) -> Contraction {
        Contraction::begin(at(start))
            .complete(at(start + duration), Intensity::Moderate, None)
            .unwrap()
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        columns
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        let sessions_columns = table_columns(&db.conn, "sessions");
        assert_eq!(
            sessions_columns,
            vec!["id", "user_id", "started_at", "ended_at", "is_active"]
        );

        let contractions_columns = table_columns(&db.conn, "contractions");
        assert_eq!(
            contractions_columns,
            vec![
                "id",
                "session_id",
                "seq",
                "started_at",
                "ended_at",
                "duration_seconds",
                "intensity",
                "notes",
            ]
        );

        let kick_columns = table_columns(&db.conn, "kick_counts");
        assert_eq!(
            kick_columns,
            vec![
                "id",
                "user_id",
                "started_at",
                "ended_at",
                "count",
                "duration_minutes",
                "notes",
            ]
        );
    }

    #[test]
    fn init_is_idempotent() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.init().is_ok());
    }

    #[test]
    fn open_creates_the_file_and_reopens_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mama.db");

        {
            let mut db = Database::open(&path).expect("open");
            let session = ContractionSession::begin(user(), at(0));
            db.insert_session(&session).expect("insert");
        }
        let db = Database::open(&path).expect("reopen");
        let sessions = db.list_sessions_for(&user()).expect("list");
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn session_roundtrip_preserves_everything() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let mut session = ContractionSession::begin(user(), at(0));
        session.push_contraction(
            Contraction::begin(at(60))
                .complete(at(125), Intensity::Strong, Some("wave".into()))
                .unwrap(),
        );
        db.insert_session(&session).expect("insert");

        let loaded = db.get_session_by_id(&session.id).expect("load");
        assert_eq!(loaded, session);
    }

    #[test]
    fn appends_round_trip_in_recording_order() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");

        // B starts before A on the clock; recording order must win.
        let a = completed(100, 40);
        let b = completed(50, 40);
        let c = completed(200, 40);
        for event in [&a, &b, &c] {
            db.append_contraction_to(&session.id, event).expect("append");
        }

        let loaded = db.get_session_by_id(&session.id).expect("load");
        let ids: Vec<_> = loaded.contractions.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn append_to_missing_session_fails() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let missing = SessionId::new("no-such-session").unwrap();
        let result = db.append_contraction_to(&missing, &completed(0, 30));
        assert!(matches!(result, Err(DbError::SessionNotFound { .. })));
    }

    #[test]
    fn append_to_closed_session_fails_as_not_found() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");
        db.close_session_at(&session.id, at(500)).expect("close");

        let result = db.append_contraction_to(&session.id, &completed(600, 30));
        assert!(matches!(result, Err(DbError::SessionNotFound { .. })));
    }

    #[test]
    fn second_active_session_is_refused() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_session(&ContractionSession::begin(user(), at(0)))
            .expect("insert first");

        let result = db.insert_session(&ContractionSession::begin(user(), at(100)));
        assert!(matches!(result, Err(DbError::ActiveSessionExists { .. })));

        // A different user is unaffected.
        db.insert_session(&ContractionSession::begin(other_user(), at(100)))
            .expect("other user may start");
    }

    #[test]
    fn closing_releases_the_active_slot() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let first = ContractionSession::begin(user(), at(0));
        db.insert_session(&first).expect("insert");
        db.close_session_at(&first.id, at(300)).expect("close");

        db.insert_session(&ContractionSession::begin(user(), at(400)))
            .expect("new session after close");
    }

    #[test]
    fn close_stamps_the_end_instant() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");
        db.close_session_at(&session.id, at(750)).expect("close");

        let loaded = db.get_session_by_id(&session.id).expect("load");
        assert!(!loaded.is_active);
        assert_eq!(loaded.ended_at, Some(at(750)));
    }

    #[test]
    fn close_twice_fails() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");
        db.close_session_at(&session.id, at(100)).expect("close");

        let again = db.close_session_at(&session.id, at(200));
        assert!(matches!(again, Err(DbError::SessionClosed { .. })));
    }

    #[test]
    fn close_missing_session_fails() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let missing = SessionId::new("nope").unwrap();
        let result = db.close_session_at(&missing, at(0));
        assert!(matches!(result, Err(DbError::SessionNotFound { .. })));
    }

    #[test]
    fn get_active_session_finds_only_the_active_one() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.get_active_session_for(&user()).expect("none").is_none());

        let closed = ContractionSession::begin(user(), at(0));
        db.insert_session(&closed).expect("insert");
        db.close_session_at(&closed.id, at(10)).expect("close");

        let active = ContractionSession::begin(user(), at(100));
        db.insert_session(&active).expect("insert");

        let found = db
            .get_active_session_for(&user())
            .expect("query")
            .expect("active session");
        assert_eq!(found.id, active.id);
        assert!(found.is_active);
    }

    #[test]
    fn two_active_rows_fail_instead_of_picking_one() {
        let db = Database::open_in_memory().expect("open in-memory db");
        for id in ["dup-a", "dup-b"] {
            db.conn
                .execute(
                    "INSERT INTO sessions (id, user_id, started_at, is_active) VALUES (?, ?, ?, 1)",
                    params![id, user().as_str(), format_timestamp(at(0))],
                )
                .unwrap();
        }
        let result = db.get_active_session_for(&user());
        assert!(matches!(
            result,
            Err(DbError::MultipleActiveSessions { count: 2, .. })
        ));
    }

    #[test]
    fn delete_cascades_to_contractions() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");
        db.append_contraction_to(&session.id, &completed(10, 30))
            .expect("append");

        db.delete_session_by_id(&session.id).expect("delete");

        let remaining: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM contractions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            db.get_session_by_id(&session.id),
            Err(DbError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn delete_missing_session_fails() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let missing = SessionId::new("gone").unwrap();
        assert!(matches!(
            db.delete_session_by_id(&missing),
            Err(DbError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn list_sessions_is_newest_first_and_per_user() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let old = ContractionSession::begin(user(), at(0));
        db.insert_session(&old).expect("insert old");
        db.close_session_at(&old.id, at(100)).expect("close old");

        let newer = ContractionSession::begin(user(), at(1_000));
        db.insert_session(&newer).expect("insert newer");

        db.insert_session(&ContractionSession::begin(other_user(), at(2_000)))
            .expect("other user session");

        let sessions = db.list_sessions_for(&user()).expect("list");
        let ids: Vec<_> = sessions.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![newer.id, old.id]);
    }

    #[test]
    fn durations_are_returned_as_stored() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");

        // A duration that disagrees with the timestamps must survive as-is.
        let mut odd = completed(10, 30);
        odd.duration_seconds = Some(999);
        db.append_contraction_to(&session.id, &odd).expect("append");

        let loaded = db.get_session_by_id(&session.id).expect("load");
        assert_eq!(loaded.contractions[0].duration_seconds, Some(999));
    }

    #[test]
    fn half_completed_row_is_rejected_on_read() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        db.insert_session(&session).expect("insert");
        db.conn
            .execute(
                "
                INSERT INTO contractions
                (id, session_id, seq, started_at, ended_at, duration_seconds, intensity)
                VALUES ('broken', ?, 0, ?, ?, NULL, 'mild')
                ",
                params![
                    session.id.as_str(),
                    format_timestamp(at(10)),
                    format_timestamp(at(40)),
                ],
            )
            .unwrap();

        assert!(matches!(
            db.get_session_by_id(&session.id),
            Err(DbError::InvalidRow { .. })
        ));
    }

    #[test]
    fn malformed_timestamp_is_reported_with_context() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO sessions (id, user_id, started_at, is_active) VALUES ('bad-ts', ?, 'yesterday', 1)",
                params![user().as_str()],
            )
            .unwrap();

        let result = db.get_active_session_for(&user());
        let Err(DbError::TimestampParse { record_id, timestamp, .. }) = result else {
            panic!("expected a timestamp parse error, got {result:?}");
        };
        assert_eq!(record_id, "bad-ts");
        assert_eq!(timestamp, "yesterday");
    }

    #[test]
    fn kick_counts_roundtrip_newest_first() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let mut tally = KickTally::begin(at(0));
        for _ in 0..10 {
            tally.record_kick();
        }
        let first = tally.finish(user(), at(1_500), Some("morning".into()));
        db.insert_kick_count_record(&first).expect("insert first");

        let second = KickTally::begin(at(5_000)).finish(user(), at(5_100), None);
        db.insert_kick_count_record(&second).expect("insert second");

        let records = db.list_kick_counts_for(&user()).expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], second);
        assert_eq!(records[1], first);
        assert!(records[1].met_goal());
        assert!(!records[0].met_goal());
    }

    #[test]
    fn delete_kick_count_removes_the_record() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let record = KickTally::begin(at(0)).finish(user(), at(600), None);
        db.insert_kick_count_record(&record).expect("insert");

        db.delete_kick_count_by_id(&record.id).expect("delete");
        assert!(db.list_kick_counts_for(&user()).expect("list").is_empty());

        assert!(matches!(
            db.delete_kick_count_by_id(&record.id),
            Err(DbError::KickCountNotFound { .. })
        ));
    }

    #[test]
    fn store_trait_maps_errors_into_the_domain_taxonomy() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let session = ContractionSession::begin(user(), at(0));
        SessionStore::create_session(&mut db, &session).expect("create");

        let duplicate = SessionStore::create_session(
            &mut db,
            &ContractionSession::begin(user(), at(50)),
        );
        assert!(matches!(
            duplicate,
            Err(StoreError::ActiveSessionExists { .. })
        ));

        SessionStore::close_session(&mut db, &session.id, at(100)).expect("close");

        let append = SessionStore::append_contraction(&mut db, &session.id, &completed(10, 30));
        assert!(matches!(append, Err(StoreError::NotFound { .. })));

        let close = SessionStore::close_session(&mut db, &session.id, at(200));
        assert!(matches!(close, Err(StoreError::AlreadyClosed { .. })));
    }
}
