use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CardId = i64;
pub type CardSetId = i64;
pub type LanguageId = i64;
pub type TranslationId = i64;
pub type EventId = i64;

/// Reference data: one row of the `languages` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub name: String,
    pub iso_2: String,
    pub flag_emoji: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardSet {
    pub id: CardSetId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub card_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub card_set_id: CardSetId,
    pub text: String,
    pub language_id: Option<LanguageId>,
    pub created_at: DateTime<Utc>,
    pub translations: Vec<Translation>,
}

impl Card {
    pub fn translation_for(&self, language_id: LanguageId) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|t| t.language_id == language_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub id: TranslationId,
    pub card_id: CardId,
    pub language_id: LanguageId,
    pub text: String,
    pub examples: Vec<Example>,
}

/// A usage sentence pair attached to a translation
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: i64,
    pub card_id: CardId,
    pub translation_id: TranslationId,
    pub text: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewExample {
    pub text: String,
    pub translation: String,
}

impl NewExample {
    pub fn new(text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() || self.translation.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslation {
    pub language_id: LanguageId,
    pub text: String,
    pub examples: Vec<NewExample>,
}

impl NewTranslation {
    pub fn new(language_id: LanguageId, text: impl Into<String>) -> Self {
        Self {
            language_id,
            text: text.into(),
            examples: Vec::new(),
        }
    }

    pub fn with_examples(mut self, examples: Vec<NewExample>) -> Self {
        self.examples = examples;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub text: String,
    pub language_id: Option<LanguageId>,
    pub translations: Vec<NewTranslation>,
}

/// What the practice engine needs from a card: its text and the first
/// translation in the practiced language
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeCard {
    pub card_id: CardId,
    pub text: String,
    pub translation_id: TranslationId,
    pub translation: String,
    pub language_id: LanguageId,
}

/// Quiz modes, fixed for the lifetime of a session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum PracticeMode {
    #[strum(serialize = "Flashcard")]
    Flashcard,
    #[strum(serialize = "Multiple Choice")]
    MultipleChoice,
    #[strum(serialize = "Chain Reaction")]
    ChainReaction,
}

impl PracticeMode {
    pub const ALL: [PracticeMode; 3] = [
        PracticeMode::Flashcard,
        PracticeMode::MultipleChoice,
        PracticeMode::ChainReaction,
    ];

    /// Fewest cards a session in this mode can start with
    pub fn min_cards(self) -> usize {
        match self {
            PracticeMode::Flashcard => 1,
            PracticeMode::MultipleChoice => 4,
            PracticeMode::ChainReaction => 5,
        }
    }

    /// Tag written to the `practice_mode` column
    pub fn tag(self) -> &'static str {
        match self {
            PracticeMode::Flashcard => "flashcard",
            PracticeMode::MultipleChoice => "multipleChoice",
            PracticeMode::ChainReaction => "chainReaction",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        PracticeMode::ALL.into_iter().find(|m| m.tag() == tag)
    }
}

/// One immutable record of a quiz answer
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeEvent {
    pub id: EventId,
    pub card_id: CardId,
    pub translation_id: TranslationId,
    pub language_id: LanguageId,
    pub result: bool,
    pub mode: PracticeMode,
    pub practiced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPracticeEvent {
    pub card_id: CardId,
    pub translation_id: TranslationId,
    pub language_id: LanguageId,
    pub result: bool,
    pub mode: PracticeMode,
    pub practiced_at: DateTime<Utc>,
}

impl NewPracticeEvent {
    pub fn for_card(card: &PracticeCard, mode: PracticeMode, result: bool) -> Self {
        Self {
            card_id: card.card_id,
            translation_id: card.translation_id,
            language_id: card.language_id,
            result,
            mode,
            practiced_at: Utc::now(),
        }
    }
}
