//! SQLite-backed repository for card sets, cards, translations, examples,
//! the language reference table and the append-only practice log.
//!
//! Every multi-row write runs inside a single transaction, so a failure
//! part way through leaves no partial rows behind.

mod cards;
mod events;

pub use events::PracticeLog;

use chrono::{DateTime, SecondsFormat, Utc};
use include_dir::{include_dir, Dir};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{CardSet, CardSetId, Language, LanguageId};

static SEED_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/seed");

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS languages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        iso_2 TEXT NOT NULL UNIQUE,
        flag_emoji TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS card_sets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_set_id INTEGER NOT NULL REFERENCES card_sets(id),
        text TEXT NOT NULL,
        language_id INTEGER REFERENCES languages(id),
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL REFERENCES cards(id),
        language_id INTEGER NOT NULL REFERENCES languages(id),
        text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS examples (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL REFERENCES cards(id),
        translation_id INTEGER NOT NULL REFERENCES translations(id),
        text TEXT NOT NULL,
        translation TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS practice_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL,
        translation_id INTEGER NOT NULL,
        language_id INTEGER NOT NULL,
        result BOOLEAN NOT NULL,
        practice_mode TEXT NOT NULL,
        practice_date TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_cards_card_set ON cards(card_set_id);
    CREATE INDEX IF NOT EXISTS idx_translations_card ON translations(card_id);
    CREATE INDEX IF NOT EXISTS idx_examples_translation ON examples(translation_id);
    CREATE INDEX IF NOT EXISTS idx_practice_stats_date ON practice_stats(practice_date);

    CREATE TRIGGER IF NOT EXISTS practice_stats_no_update
    BEFORE UPDATE ON practice_stats
    BEGIN
        SELECT RAISE(ABORT, 'practice events are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS practice_stats_no_delete
    BEFORE DELETE ON practice_stats
    BEGIN
        SELECT RAISE(ABORT, 'practice events are append-only');
    END;
"#;

#[derive(Deserialize)]
struct SeedLanguage {
    name: String,
    iso_2: String,
    flag_emoji: String,
}

/// Database handle for everything the application persists
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        log::debug!("opening database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let store = Store { conn };
        store.seed_languages()?;
        Ok(store)
    }

    fn seed_languages(&self) -> Result<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM languages", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }

        let file = SEED_DIR.get_file("languages.json").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "embedded languages.json missing",
            ))
        })?;
        let seed: Vec<SeedLanguage> = serde_json::from_slice(file.contents())?;

        let mut stmt = self
            .conn
            .prepare("INSERT INTO languages (name, iso_2, flag_emoji) VALUES (?1, ?2, ?3)")?;
        for lang in &seed {
            stmt.execute(params![lang.name, lang.iso_2, lang.flag_emoji])?;
        }
        log::debug!("seeded {} languages", seed.len());

        Ok(())
    }

    /// All languages ordered by display name
    pub fn languages(&self) -> Result<Vec<Language>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, iso_2, flag_emoji FROM languages ORDER BY name")?;
        let languages = stmt
            .query_map([], language_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(languages)
    }

    pub fn language(&self, id: LanguageId) -> Result<Option<Language>> {
        let language = self
            .conn
            .query_row(
                "SELECT id, name, iso_2, flag_emoji FROM languages WHERE id = ?1",
                [id],
                language_from_row,
            )
            .optional()?;
        Ok(language)
    }

    /// Case-insensitive lookup by ISO-2 code
    pub fn language_by_iso(&self, code: &str) -> Result<Option<Language>> {
        let language = self
            .conn
            .query_row(
                "SELECT id, name, iso_2, flag_emoji FROM languages WHERE lower(iso_2) = lower(?1)",
                [code.trim()],
                language_from_row,
            )
            .optional()?;
        Ok(language)
    }

    pub fn create_card_set(&self, name: &str, description: Option<&str>) -> Result<CardSetId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Card set name is required"));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        self.conn.execute(
            "INSERT INTO card_sets (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, timestamp(Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("created card set {id} ({name})");
        Ok(id)
    }

    /// All card sets with their card counts, ordered by name
    pub fn card_sets(&self) -> Result<Vec<CardSet>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name, s.description, s.created_at, COUNT(c.id)
            FROM card_sets s
            LEFT JOIN cards c ON c.card_set_id = s.id
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )?;
        let sets = stmt
            .query_map([], card_set_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sets)
    }

    pub fn card_set(&self, id: CardSetId) -> Result<Option<CardSet>> {
        let set = self
            .conn
            .query_row(
                r#"
                SELECT s.id, s.name, s.description, s.created_at, COUNT(c.id)
                FROM card_sets s
                LEFT JOIN cards c ON c.card_set_id = s.id
                WHERE s.id = ?1
                GROUP BY s.id
                "#,
                [id],
                card_set_from_row,
            )
            .optional()?;
        Ok(set)
    }

    /// Card sets owning at least one card translated into `language_id`
    pub fn card_sets_for_language(&self, language_id: LanguageId) -> Result<Vec<CardSet>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name, s.description, s.created_at, COUNT(DISTINCT c.id)
            FROM card_sets s
            JOIN cards c ON c.card_set_id = s.id
            JOIN translations t ON t.card_id = c.id
            WHERE t.language_id = ?1
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )?;
        let sets = stmt
            .query_map([language_id], card_set_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sets)
    }

    /// Delete a set and every card it owns
    pub fn delete_card_set(&mut self, id: CardSetId) -> Result<()> {
        self.require_card_set(id)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM examples WHERE card_id IN (SELECT id FROM cards WHERE card_set_id = ?1)",
            [id],
        )?;
        tx.execute(
            "DELETE FROM translations WHERE card_id IN (SELECT id FROM cards WHERE card_set_id = ?1)",
            [id],
        )?;
        let cards = tx.execute("DELETE FROM cards WHERE card_set_id = ?1", [id])?;
        tx.execute("DELETE FROM card_sets WHERE id = ?1", [id])?;
        tx.commit()?;

        log::debug!("deleted card set {id} with {cards} cards");
        Ok(())
    }

    fn require_card_set(&self, id: CardSetId) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM card_sets WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(Error::NotFound {
                entity: "card set",
                id,
            })
        }
    }

    fn require_language(&self, id: LanguageId) -> Result<()> {
        match self.language(id)? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound {
                entity: "language",
                id,
            }),
        }
    }
}

/// Sortable RFC 3339 representation used for every stored instant
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), Type::Text))
}

fn language_from_row(row: &Row) -> rusqlite::Result<Language> {
    Ok(Language {
        id: row.get(0)?,
        name: row.get(1)?,
        iso_2: row.get(2)?,
        flag_emoji: row.get(3)?,
    })
}

fn card_set_from_row(row: &Row) -> rusqlite::Result<CardSet> {
    let count: i64 = row.get(4)?;
    Ok(CardSet {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        card_count: count as usize,
    })
}
