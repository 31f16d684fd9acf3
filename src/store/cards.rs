use chrono::Utc;
use itertools::Itertools;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;

use super::{timestamp, timestamp_at, Store};
use crate::error::{Error, Result};
use crate::import::{ImportFailure, ImportReport};
use crate::model::{
    Card, CardId, CardSetId, Example, LanguageId, NewCard, NewExample, NewTranslation,
    PracticeCard, Translation, TranslationId,
};

impl Store {
    /// Cards of a set with their translations and examples, oldest first
    pub fn list_cards(&self, card_set_id: CardSetId) -> Result<Vec<Card>> {
        self.require_card_set(card_set_id)?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, card_set_id, text, language_id, created_at
            FROM cards
            WHERE card_set_id = ?1
            ORDER BY id
            "#,
        )?;
        let mut cards = stmt
            .query_map([card_set_id], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for card in &mut cards {
            card.translations = self.translations_for(card.id)?;
        }

        Ok(cards)
    }

    pub fn card(&self, id: CardId) -> Result<Option<Card>> {
        let card = self
            .conn
            .query_row(
                "SELECT id, card_set_id, text, language_id, created_at FROM cards WHERE id = ?1",
                [id],
                card_from_row,
            )
            .optional()?;

        match card {
            Some(mut card) => {
                card.translations = self.translations_for(card.id)?;
                Ok(Some(card))
            }
            None => Ok(None),
        }
    }

    fn translations_for(&self, card_id: CardId) -> Result<Vec<Translation>> {
        let mut examples = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT id, card_id, translation_id, text, translation
                FROM examples
                WHERE card_id = ?1
                ORDER BY id
                "#,
            )?;
            let rows = stmt
                .query_map([card_id], example_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().into_group_map_by(|e| e.translation_id)
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, card_id, language_id, text FROM translations WHERE card_id = ?1 ORDER BY id",
        )?;
        let translations = stmt
            .query_map([card_id], |row| {
                Ok(Translation {
                    id: row.get(0)?,
                    card_id: row.get(1)?,
                    language_id: row.get(2)?,
                    text: row.get(3)?,
                    examples: Vec::new(),
                })
            })?
            .map(|t| {
                t.map(|mut t| {
                    t.examples = examples.remove(&t.id).unwrap_or_default();
                    t
                })
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(translations)
    }

    /// Insert one card with its translations and examples in a single transaction
    pub fn create_card(&mut self, card_set_id: CardSetId, card: &NewCard) -> Result<CardId> {
        validate_card_text(&card.text)?;
        validate_translations(&card.translations)?;
        self.require_card_set(card_set_id)?;
        if let Some(language_id) = card.language_id {
            self.require_language(language_id)?;
        }
        for t in &card.translations {
            self.require_language(t.language_id)?;
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO cards (card_set_id, text, language_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                card_set_id,
                card.text.trim(),
                card.language_id,
                timestamp(Utc::now())
            ],
        )?;
        let card_id = tx.last_insert_rowid();

        for translation in &card.translations {
            insert_translation(&tx, card_id, translation)?;
        }
        tx.commit()?;

        log::debug!(
            "created card {card_id} with {} translations",
            card.translations.len()
        );
        Ok(card_id)
    }

    /// Sync a card's text and translations with the submitted set.
    ///
    /// Translations are matched by language: changed text is updated in place
    /// and its examples replaced, new languages are inserted, and languages
    /// missing from `translations` are deleted along with their examples.
    pub fn update_card(
        &mut self,
        id: CardId,
        text: &str,
        translations: &[NewTranslation],
    ) -> Result<()> {
        validate_card_text(text)?;
        validate_translations(translations)?;
        for t in translations {
            self.require_language(t.language_id)?;
        }
        let existing = self.card(id)?.ok_or(Error::NotFound { entity: "card", id })?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE cards SET text = ?1 WHERE id = ?2",
            params![text.trim(), id],
        )?;

        for incoming in translations {
            match existing.translation_for(incoming.language_id) {
                Some(current) => {
                    let text_changed = current.text != incoming.text.trim();
                    if text_changed {
                        tx.execute(
                            "UPDATE translations SET text = ?1 WHERE id = ?2",
                            params![incoming.text.trim(), current.id],
                        )?;
                    }
                    if text_changed || !same_examples(&current.examples, &incoming.examples) {
                        tx.execute(
                            "DELETE FROM examples WHERE translation_id = ?1",
                            [current.id],
                        )?;
                        insert_examples(&tx, id, current.id, &incoming.examples)?;
                    }
                }
                None => {
                    insert_translation(&tx, id, incoming)?;
                }
            }
        }

        let kept: HashSet<LanguageId> = translations.iter().map(|t| t.language_id).collect();
        for stale in existing
            .translations
            .iter()
            .filter(|t| !kept.contains(&t.language_id))
        {
            tx.execute("DELETE FROM examples WHERE translation_id = ?1", [stale.id])?;
            tx.execute("DELETE FROM translations WHERE id = ?1", [stale.id])?;
        }
        tx.commit()?;

        log::debug!("updated card {id}");
        Ok(())
    }

    /// Delete examples, then translations, then the card itself
    pub fn delete_card(&mut self, id: CardId) -> Result<()> {
        if self.card(id)?.is_none() {
            return Err(Error::NotFound { entity: "card", id });
        }

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM examples WHERE card_id = ?1", [id])?;
        tx.execute("DELETE FROM translations WHERE card_id = ?1", [id])?;
        tx.execute("DELETE FROM cards WHERE id = ?1", [id])?;
        tx.commit()?;

        log::debug!("deleted card {id}");
        Ok(())
    }

    /// Insert imported cards one by one. A failing card is reported and the
    /// remaining ones are still inserted.
    pub fn import_cards(&mut self, card_set_id: CardSetId, cards: &[NewCard]) -> Result<ImportReport> {
        self.require_card_set(card_set_id)?;

        let mut report = ImportReport::default();
        for card in cards {
            match self.create_card(card_set_id, card) {
                Ok(id) => report.imported.push(id),
                Err(e) => {
                    log::warn!("failed to import card {:?}: {e}", card.text);
                    report.failed.push(ImportFailure {
                        text: card.text.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Cards from `card_set_ids` translated into `language_id`, newest first,
    /// each paired with its first translation in that language
    pub fn practice_cards(
        &self,
        language_id: LanguageId,
        card_set_ids: &[CardSetId],
    ) -> Result<Vec<PracticeCard>> {
        if card_set_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = std::iter::repeat("?").take(card_set_ids.len()).join(", ");
        let sql = format!(
            r#"
            SELECT c.id, c.text, t.id, t.text, t.language_id
            FROM cards c
            JOIN translations t ON t.card_id = c.id
            WHERE t.language_id = ? AND c.card_set_id IN ({placeholders})
            ORDER BY c.id DESC, t.id ASC
            "#
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let args = std::iter::once(language_id).chain(card_set_ids.iter().copied());
        let cards = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(PracticeCard {
                    card_id: row.get(0)?,
                    text: row.get(1)?,
                    translation_id: row.get(2)?,
                    translation: row.get(3)?,
                    language_id: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .dedup_by(|a, b| a.card_id == b.card_id)
            .collect();

        Ok(cards)
    }
}

fn insert_translation(
    conn: &Connection,
    card_id: CardId,
    translation: &NewTranslation,
) -> Result<TranslationId> {
    conn.execute(
        "INSERT INTO translations (card_id, language_id, text) VALUES (?1, ?2, ?3)",
        params![card_id, translation.language_id, translation.text.trim()],
    )?;
    let translation_id = conn.last_insert_rowid();
    insert_examples(conn, card_id, translation_id, &translation.examples)?;
    Ok(translation_id)
}

/// Examples are only written when the translation belongs to `card_id`
fn insert_examples(
    conn: &Connection,
    card_id: CardId,
    translation_id: TranslationId,
    examples: &[NewExample],
) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO examples (card_id, translation_id, text, translation)
        SELECT ?1, id, ?3, ?4 FROM translations WHERE id = ?2 AND card_id = ?1
        "#,
    )?;

    for example in examples.iter().filter(|e| !e.is_blank()) {
        let inserted = stmt.execute(params![
            card_id,
            translation_id,
            example.text.trim(),
            example.translation.trim()
        ])?;
        if inserted == 0 {
            return Err(Error::validation(format!(
                "translation {translation_id} does not belong to card {card_id}"
            )));
        }
    }

    Ok(())
}

fn same_examples(current: &[Example], incoming: &[NewExample]) -> bool {
    let incoming: Vec<(&str, &str)> = incoming
        .iter()
        .filter(|e| !e.is_blank())
        .map(|e| (e.text.trim(), e.translation.trim()))
        .collect();
    let current: Vec<(&str, &str)> = current
        .iter()
        .map(|e| (e.text.as_str(), e.translation.as_str()))
        .collect();
    current == incoming
}

fn validate_card_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation("Card text is required"));
    }
    Ok(())
}

fn validate_translations(translations: &[NewTranslation]) -> Result<()> {
    if translations.iter().any(|t| t.text.trim().is_empty()) {
        return Err(Error::validation("Translation text is required"));
    }
    let duplicated = translations
        .iter()
        .map(|t| t.language_id)
        .duplicates()
        .next();
    if let Some(language_id) = duplicated {
        return Err(Error::validation(format!(
            "Only one translation per language is allowed (language {language_id})"
        )));
    }
    Ok(())
}

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        card_set_id: row.get(1)?,
        text: row.get(2)?,
        language_id: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
        translations: Vec::new(),
    })
}

fn example_from_row(row: &Row) -> rusqlite::Result<Example> {
    Ok(Example {
        id: row.get(0)?,
        card_id: row.get(1)?,
        translation_id: row.get(2)?,
        text: row.get(3)?,
        translation: row.get(4)?,
    })
}
