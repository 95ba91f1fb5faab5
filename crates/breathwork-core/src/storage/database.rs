//! SQLite-based session history.
//!
//! Provides persistent storage for:
//! - Finished breathing sessions and their rounds
//! - Aggregate statistics over all sessions

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::plan::RecordedRoundType;
use crate::session::{RoundRecord, SessionSink, SessionSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: i64,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub total_ms: u64,
    pub round_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_ms: u64,
    pub today_sessions: u64,
    pub today_ms: u64,
    /// Total actual time per round type.
    pub by_round_type: BTreeMap<String, u64>,
    /// Longest open-ended hold ever recorded.
    pub longest_hold_ms: Option<u64>,
}

/// SQLite database for session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/breathwork.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breathwork.db");
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                title        TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                total_ms     INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session_rounds (
                session_id  INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                round_type  TEXT NOT NULL,
                expected_ms INTEGER,
                actual_ms   INTEGER NOT NULL,
                PRIMARY KEY (session_id, position)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_session_rounds_type ON session_rounds(round_type);",
        )?;
        Ok(())
    }

    /// Record a finished session and its rounds.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, summary: &SessionSummary) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO sessions (title, completed_at, total_ms) VALUES (?1, ?2, ?3)",
            params![
                summary.title,
                summary.completed_at.to_rfc3339(),
                summary.total_ms(),
            ],
        )?;
        let session_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO session_rounds (session_id, position, round_type, expected_ms, actual_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, round) in summary.rounds.iter().enumerate() {
                stmt.execute(params![
                    session_id,
                    position as i64,
                    round.round_type.as_str(),
                    round.expected_ms,
                    round.actual_ms,
                ])?;
            }
        }
        tx.commit()?;
        Ok(session_id)
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.title, s.completed_at, s.total_ms,
                    (SELECT COUNT(*) FROM session_rounds r WHERE r.session_id = s.id)
             FROM sessions s
             ORDER BY s.completed_at DESC, s.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, title, completed_at, total_ms, round_count) = row?;
            sessions.push(SessionRow {
                id,
                title,
                completed_at: parse_timestamp(&completed_at)?,
                total_ms,
                round_count,
            });
        }
        Ok(sessions)
    }

    /// Load a full summary by id.
    pub fn session(&self, id: i64) -> Result<Option<SessionSummary>> {
        let header = self
            .conn
            .query_row(
                "SELECT title, completed_at FROM sessions WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((title, completed_at)) = header else {
            return Ok(None);
        };

        Ok(Some(SessionSummary {
            title,
            completed_at: parse_timestamp(&completed_at)?,
            rounds: self.session_rounds(id)?,
        }))
    }

    pub fn session_rounds(&self, session_id: i64) -> Result<Vec<RoundRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT round_type, expected_ms, actual_ms
             FROM session_rounds
             WHERE session_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<u64>>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        let mut rounds = Vec::new();
        for row in rows {
            let (round_type, expected_ms, actual_ms) = row?;
            let round_type =
                RecordedRoundType::parse(&round_type).ok_or_else(|| DatabaseError::CorruptRow {
                    table: "session_rounds".into(),
                    message: format!("unknown round type '{round_type}'"),
                })?;
            rounds.push(RoundRecord {
                round_type,
                expected_ms,
                actual_ms,
            });
        }
        Ok(rounds)
    }

    pub fn stats(&self) -> Result<Stats> {
        let mut stats = Stats::default();

        let (total_sessions, total_ms) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(total_ms), 0) FROM sessions",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.total_sessions = total_sessions;
        stats.total_ms = total_ms;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let (today_sessions, today_ms) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(total_ms), 0) FROM sessions WHERE completed_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_sessions = today_sessions;
        stats.today_ms = today_ms;

        let mut stmt = self.conn.prepare(
            "SELECT round_type, COALESCE(SUM(actual_ms), 0)
             FROM session_rounds
             GROUP BY round_type",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        for row in rows {
            let (round_type, ms) = row?;
            stats.by_round_type.insert(round_type, ms);
        }

        stats.longest_hold_ms = self.conn.query_row(
            "SELECT MAX(actual_ms) FROM session_rounds
             WHERE round_type = 'hold' AND expected_ms IS NULL",
            [],
            |row| row.get::<_, Option<u64>>(0),
        )?;

        Ok(stats)
    }
}

impl SessionSink for Database {
    fn save(&self, summary: &SessionSummary) -> Result<()> {
        self.record_session(summary).map(|_| ())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::CorruptRow {
                table: "sessions".into(),
                message: format!("bad timestamp '{value}': {e}"),
            }
            .into()
        })
}
