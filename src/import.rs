//! Bulk import of tab-separated card data, e.g. pasted from a spreadsheet.
//!
//! The first non-blank line is the header. Columns named `text` and
//! `text_language` hold the card text and its language code; every other
//! column is read as an ISO-2 language code whose cells become translations.

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::model::{CardId, Language, NewCard, NewTranslation};

pub const TEXT_COLUMN: &str = "text";
pub const TEXT_LANGUAGE_COLUMN: &str = "text_language";

/// One parsed data row, before language codes are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub primary_text: String,
    pub primary_language_code: String,
    /// (language code from the header, cell text), in header order
    pub translations_by_language_code: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    /// Data rows dropped because their `text` cell was empty
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub text: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportReport {
    pub imported: Vec<CardId>,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("{} cards imported", self.imported.len())
        } else {
            format!(
                "{} cards imported, {} failed",
                self.imported.len(),
                self.failed.len()
            )
        }
    }
}

/// Split pasted text into typed rows
pub fn parse_import(input: &str) -> Result<ParsedImport> {
    let cleaned = input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(cleaned.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Import(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let text_idx = headers
        .iter()
        .position(|h| h == TEXT_COLUMN)
        .ok_or_else(|| Error::Import(format!("missing `{TEXT_COLUMN}` column")))?;
    let language_idx = headers.iter().position(|h| h == TEXT_LANGUAGE_COLUMN);

    let mut parsed = ParsedImport::default();
    let mut seen_rows = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| Error::Import(e.to_string()))?;
        seen_rows += 1;
        let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

        let primary_text = cell(text_idx);
        if primary_text.is_empty() {
            log::debug!("skipping import row {seen_rows}: empty `{TEXT_COLUMN}` cell");
            parsed.skipped += 1;
            continue;
        }

        let translations_by_language_code = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != text_idx && Some(*idx) != language_idx)
            .filter(|(_, header)| !header.is_empty())
            .map(|(idx, header)| (header.clone(), cell(idx).to_string()))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        parsed.rows.push(ImportRow {
            primary_text: primary_text.to_string(),
            primary_language_code: language_idx.map(cell).unwrap_or("").to_string(),
            translations_by_language_code,
        });
    }

    if seen_rows == 0 {
        return Err(Error::Import("no rows to import".to_string()));
    }

    Ok(parsed)
}

/// Turn parsed rows into cards ready for insertion. Columns whose header is
/// not a known language code contribute nothing.
pub fn resolve_rows(rows: &[ImportRow], languages: &[Language]) -> Vec<NewCard> {
    let find = |code: &str| {
        languages
            .iter()
            .find(|l| l.iso_2.eq_ignore_ascii_case(code))
    };

    rows.iter()
        .map(|row| {
            let language_id = match row.primary_language_code.as_str() {
                "" => None,
                code => {
                    let found = find(code).map(|l| l.id);
                    if found.is_none() {
                        log::warn!(
                            "unknown source language {code:?} for {:?}",
                            row.primary_text
                        );
                    }
                    found
                }
            };

            let translations = row
                .translations_by_language_code
                .iter()
                .filter_map(|(code, text)| match find(code) {
                    Some(language) => Some(NewTranslation::new(language.id, text.clone())),
                    None => {
                        log::debug!("ignoring column {code:?}: not a known language");
                        None
                    }
                })
                .collect();

            NewCard {
                text: row.primary_text.clone(),
                language_id,
                translations,
            }
        })
        .collect()
}
