use rusqlite::{params, types::Type, Row};

use super::{timestamp, timestamp_at, Store};
use crate::error::Result;
use crate::model::{EventId, NewPracticeEvent, PracticeEvent, PracticeMode};

/// Sink for practice answers. The log is append-only.
pub trait PracticeLog {
    fn record(&self, event: &NewPracticeEvent) -> Result<EventId>;
}

impl PracticeLog for Store {
    fn record(&self, event: &NewPracticeEvent) -> Result<EventId> {
        self.conn.execute(
            r#"
            INSERT INTO practice_stats
            (card_id, translation_id, language_id, result, practice_mode, practice_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.card_id,
                event.translation_id,
                event.language_id,
                event.result,
                event.mode.tag(),
                timestamp(event.practiced_at),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }
}

impl Store {
    /// The whole practice log, oldest first
    pub fn practice_events(&self) -> Result<Vec<PracticeEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, card_id, translation_id, language_id, result, practice_mode, practice_date
            FROM practice_stats
            ORDER BY practice_date, id
            "#,
        )?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}

fn event_from_row(row: &Row) -> rusqlite::Result<PracticeEvent> {
    let tag: String = row.get(5)?;
    let mode = PracticeMode::from_tag(&tag).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(5, "practice_mode".to_string(), Type::Text)
    })?;

    Ok(PracticeEvent {
        id: row.get(0)?,
        card_id: row.get(1)?,
        translation_id: row.get(2)?,
        language_id: row.get(3)?,
        result: row.get(4)?,
        mode,
        practiced_at: timestamp_at(row, 6)?,
    })
}
