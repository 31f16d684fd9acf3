//! Practice session engine.
//!
//! A session is created from the Setup step (language, card sets, mode) and
//! owns all in-progress state. Every answer is written to a [`PracticeLog`]
//! as it happens; nothing else about a session is persisted.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::model::{CardSetId, LanguageId, NewPracticeEvent, PracticeCard, PracticeMode};
use crate::store::{PracticeLog, Store};
use crate::util::{answers_match, success_ratio};

/// Links in a chain reaction round
pub const CHAIN_LENGTH: usize = 5;
/// Options shown for a multiple choice question
pub const CHOICE_COUNT: usize = 4;

/// Choices made before a session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSetup {
    pub language_id: Option<LanguageId>,
    pub card_set_ids: Vec<CardSetId>,
    pub mode: PracticeMode,
}

impl PracticeSetup {
    pub fn new(mode: PracticeMode) -> Self {
        Self {
            language_id: None,
            card_set_ids: Vec::new(),
            mode,
        }
    }

    /// Picking a language clears the chosen sets, they are filtered per language
    pub fn select_language(&mut self, language_id: LanguageId) {
        self.language_id = Some(language_id);
        self.card_set_ids.clear();
    }

    pub fn toggle_card_set(&mut self, card_set_id: CardSetId) {
        if let Some(pos) = self.card_set_ids.iter().position(|id| *id == card_set_id) {
            self.card_set_ids.remove(pos);
        } else {
            self.card_set_ids.push(card_set_id);
        }
    }

    /// A language and at least one card set must be chosen
    pub fn validate(&self) -> Result<LanguageId> {
        let language_id = self
            .language_id
            .ok_or_else(|| Error::validation("Select a language to practice."))?;
        if self.card_set_ids.is_empty() {
            return Err(Error::validation("Select at least one card set."));
        }
        Ok(language_id)
    }

    /// Load the filtered cards and start a session. Nothing is written on failure.
    pub fn start(&self, store: &Store) -> Result<PracticeSession> {
        let language_id = self.validate()?;
        let cards = store.practice_cards(language_id, &self.card_set_ids)?;
        PracticeSession::new(self.mode, cards)
    }
}

/// A question in a chain reaction round
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub card: PracticeCard,
    pub user_answer: String,
}

impl ChainLink {
    pub fn question(&self) -> &str {
        &self.card.text
    }

    pub fn answer(&self) -> &str {
        &self.card.translation
    }

    pub fn is_correct(&self) -> bool {
        answers_match(&self.user_answer, self.answer())
    }
}

/// How a multiple choice option should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionState {
    Idle,
    Selected,
    Correct,
    Wrong,
}

/// Answers given during this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub answered: usize,
    pub correct: usize,
}

impl Tally {
    fn add(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn success_ratio(&self) -> f64 {
        success_ratio(self.correct, self.answered)
    }
}

#[derive(Debug, Clone)]
enum Round {
    Flashcard {
        revealed: bool,
    },
    MultipleChoice {
        options: Vec<String>,
        selected: Option<usize>,
        checked: bool,
    },
    Chain {
        links: Vec<ChainLink>,
        cursor: usize,
        input: String,
    },
}

#[derive(Debug)]
pub struct PracticeSession {
    mode: PracticeMode,
    cards: Vec<PracticeCard>,
    index: usize,
    round: Round,
    tally: Tally,
    rng: StdRng,
}

impl PracticeSession {
    pub fn new(mode: PracticeMode, cards: Vec<PracticeCard>) -> Result<Self> {
        Self::with_rng(mode, cards, StdRng::from_entropy())
    }

    /// Start a session drawing randomness from `rng`
    pub fn with_rng(mode: PracticeMode, cards: Vec<PracticeCard>, mut rng: StdRng) -> Result<Self> {
        if cards.is_empty() {
            return Err(Error::validation("No cards available for the selected sets."));
        }
        if cards.len() < mode.min_cards() {
            return Err(Error::validation(format!(
                "At least {} cards are needed for {mode} mode.",
                mode.min_cards()
            )));
        }

        let round = match mode {
            PracticeMode::Flashcard => Round::Flashcard { revealed: false },
            PracticeMode::MultipleChoice => Round::MultipleChoice {
                options: choice_options(&cards, 0, &mut rng),
                selected: None,
                checked: false,
            },
            PracticeMode::ChainReaction => Round::Chain {
                links: draw_chain(&cards, &mut rng),
                cursor: 1,
                input: String::new(),
            },
        };

        log::info!("starting {mode} session with {} cards", cards.len());
        Ok(Self {
            mode,
            cards,
            index: 0,
            round,
            tally: Tally::default(),
            rng,
        })
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn cards(&self) -> &[PracticeCard] {
        &self.cards
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// The card being asked: the chain link under the cursor in chain mode
    pub fn current_card(&self) -> &PracticeCard {
        match &self.round {
            Round::Chain { links, cursor, .. } => {
                &links[(*cursor).min(links.len() - 1)].card
            }
            _ => &self.cards[self.index],
        }
    }

    pub fn progress_label(&self) -> String {
        match &self.round {
            Round::Chain { links, cursor, .. } => {
                format!("Link {} of {}", (*cursor + 1).min(links.len()), links.len())
            }
            _ => format!("Card {} of {}", self.index + 1, self.cards.len()),
        }
    }

    // ---- flashcard ----

    pub fn is_revealed(&self) -> bool {
        matches!(self.round, Round::Flashcard { revealed: true })
    }

    /// Flip the current flashcard to its translation
    pub fn reveal(&mut self) -> Result<()> {
        match &mut self.round {
            Round::Flashcard { revealed } => {
                *revealed = true;
                Ok(())
            }
            _ => Err(self.wrong_mode(PracticeMode::Flashcard)),
        }
    }

    /// Self-reported outcome for a revealed flashcard; moves to the next card
    pub fn answer_flashcard(&mut self, knew_it: bool, log: &dyn PracticeLog) -> Result<()> {
        match self.round {
            Round::Flashcard { revealed: true } => {}
            Round::Flashcard { revealed: false } => {
                return Err(Error::validation("Reveal the card before answering."));
            }
            _ => return Err(self.wrong_mode(PracticeMode::Flashcard)),
        }

        let event = NewPracticeEvent::for_card(self.current_card(), self.mode, knew_it);
        self.tally.add(knew_it);
        self.advance();
        record(log, &event)
    }

    // ---- multiple choice ----

    pub fn options(&self) -> &[String] {
        match &self.round {
            Round::MultipleChoice { options, .. } => options,
            _ => &[],
        }
    }

    pub fn selected_option(&self) -> Option<usize> {
        match self.round {
            Round::MultipleChoice { selected, .. } => selected,
            _ => None,
        }
    }

    pub fn is_checked(&self) -> bool {
        matches!(self.round, Round::MultipleChoice { checked: true, .. })
    }

    pub fn select_option(&mut self, idx: usize) -> Result<()> {
        let mode_error = self.wrong_mode(PracticeMode::MultipleChoice);
        match &mut self.round {
            Round::MultipleChoice {
                options,
                selected,
                checked,
            } => {
                if *checked {
                    return Err(Error::validation("This answer has already been checked."));
                }
                if idx >= options.len() {
                    return Err(Error::validation(format!("There is no option {}.", idx + 1)));
                }
                *selected = Some(idx);
                Ok(())
            }
            _ => Err(mode_error),
        }
    }

    /// Lock the selection and record whether it matches the correct text exactly
    pub fn check_answer(&mut self, log: &dyn PracticeLog) -> Result<bool> {
        let correct_text = self.cards[self.index].translation.clone();
        let mode_error = self.wrong_mode(PracticeMode::MultipleChoice);

        let is_correct = match &mut self.round {
            Round::MultipleChoice {
                options,
                selected,
                checked,
            } => {
                if *checked {
                    return Err(Error::validation("This answer has already been checked."));
                }
                let choice = selected.ok_or_else(|| Error::validation("Select an answer first."))?;
                *checked = true;
                options[choice] == correct_text
            }
            _ => return Err(mode_error),
        };

        let event = NewPracticeEvent::for_card(&self.cards[self.index], self.mode, is_correct);
        self.tally.add(is_correct);
        record(log, &event)?;
        Ok(is_correct)
    }

    pub fn option_state(&self, idx: usize) -> OptionState {
        let Round::MultipleChoice {
            options,
            selected,
            checked,
        } = &self.round
        else {
            return OptionState::Idle;
        };
        let Some(option) = options.get(idx) else {
            return OptionState::Idle;
        };
        let is_selected = *selected == Some(idx);

        if !*checked {
            return if is_selected {
                OptionState::Selected
            } else {
                OptionState::Idle
            };
        }

        if *option == self.cards[self.index].translation {
            OptionState::Correct
        } else if is_selected {
            OptionState::Wrong
        } else {
            OptionState::Idle
        }
    }

    /// Move on to the next card, wrapping around at the end of the list.
    /// Multiple choice questions must be checked first.
    pub fn next_card(&mut self) -> Result<()> {
        match self.round {
            Round::Flashcard { .. } => {}
            Round::MultipleChoice { checked: true, .. } => {}
            Round::MultipleChoice { checked: false, .. } => {
                return Err(Error::validation("Check your answer first."));
            }
            Round::Chain { .. } => {
                return Err(Error::validation(
                    "Chain Reaction moves forward by submitting answers.",
                ))
            }
        }
        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.cards.len();
        self.round = match self.round {
            Round::Flashcard { .. } => Round::Flashcard { revealed: false },
            Round::MultipleChoice { .. } => Round::MultipleChoice {
                options: choice_options(&self.cards, self.index, &mut self.rng),
                selected: None,
                checked: false,
            },
            Round::Chain { .. } => return,
        };
    }

    // ---- chain reaction ----

    pub fn chain(&self) -> &[ChainLink] {
        match &self.round {
            Round::Chain { links, .. } => links,
            _ => &[],
        }
    }

    /// Index of the link awaiting an answer; equals the chain length once complete
    pub fn chain_cursor(&self) -> usize {
        match self.round {
            Round::Chain { cursor, .. } => cursor,
            _ => 0,
        }
    }

    pub fn chain_input(&self) -> &str {
        match &self.round {
            Round::Chain { input, .. } => input,
            _ => "",
        }
    }

    pub fn is_chain_complete(&self) -> bool {
        matches!(&self.round, Round::Chain { links, cursor, .. } if *cursor >= links.len())
    }

    pub fn push_chain_char(&mut self, c: char) {
        if let Round::Chain { input, .. } = &mut self.round {
            input.push(c);
        }
    }

    pub fn pop_chain_char(&mut self) {
        if let Round::Chain { input, .. } = &mut self.round {
            input.pop();
        }
    }

    pub fn set_chain_input(&mut self, text: &str) {
        if let Round::Chain { input, .. } = &mut self.round {
            *input = text.to_string();
        }
    }

    /// Submit the typed answer for the current link and move the cursor on
    pub fn submit_chain_answer(&mut self, log: &dyn PracticeLog) -> Result<bool> {
        let mode = self.mode;
        let mode_error = self.wrong_mode(PracticeMode::ChainReaction);

        let (event, is_correct) = match &mut self.round {
            Round::Chain {
                links,
                cursor,
                input,
            } => {
                let Some(link) = links.get_mut(*cursor) else {
                    return Err(Error::validation("The chain is already complete."));
                };
                link.user_answer = std::mem::take(input);
                let is_correct = link.is_correct();
                let event = NewPracticeEvent::for_card(&link.card, mode, is_correct);
                *cursor += 1;
                (event, is_correct)
            }
            _ => return Err(mode_error),
        };

        self.tally.add(is_correct);
        if self.is_chain_complete() {
            let (correct, total) = self.chain_score();
            log::info!("chain complete: {correct}/{total}");
        }
        record(log, &event)?;
        Ok(is_correct)
    }

    /// (correct links, chain length); the pre-filled first link counts as correct
    pub fn chain_score(&self) -> (usize, usize) {
        let links = self.chain();
        (links.iter().filter(|l| l.is_correct()).count(), links.len())
    }

    /// Throw away the current chain and draw a new one
    pub fn restart_chain(&mut self) -> Result<()> {
        if self.mode != PracticeMode::ChainReaction {
            return Err(self.wrong_mode(PracticeMode::ChainReaction));
        }
        self.round = Round::Chain {
            links: draw_chain(&self.cards, &mut self.rng),
            cursor: 1,
            input: String::new(),
        };
        Ok(())
    }

    fn wrong_mode(&self, expected: PracticeMode) -> Error {
        Error::validation(format!(
            "Not available in {} mode, only in {expected} mode.",
            self.mode
        ))
    }
}

fn record(log: &dyn PracticeLog, event: &NewPracticeEvent) -> Result<()> {
    log.record(event).map(|_| ()).inspect_err(|e| {
        log::error!("failed to save practice result for card {}: {e}", event.card_id);
    })
}

/// The correct translation plus up to three distinct distractors drawn from
/// other cards, shuffled. Distractor texts equal to the correct one are skipped.
fn choice_options(cards: &[PracticeCard], index: usize, rng: &mut StdRng) -> Vec<String> {
    let correct = &cards[index].translation;
    let pool: Vec<&String> = cards
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, card)| &card.translation)
        .filter(|text| *text != correct)
        .unique()
        .collect();

    let mut options: Vec<String> = pool
        .choose_multiple(rng, CHOICE_COUNT - 1)
        .map(|text| (*text).clone())
        .collect();
    options.push(correct.clone());
    options.shuffle(rng);
    options
}

/// Sample the chain's cards without replacement; the first answer is given
fn draw_chain(cards: &[PracticeCard], rng: &mut StdRng) -> Vec<ChainLink> {
    cards
        .choose_multiple(rng, CHAIN_LENGTH)
        .enumerate()
        .map(|(i, card)| ChainLink {
            card: card.clone(),
            user_answer: if i == 0 {
                card.translation.clone()
            } else {
                String::new()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventId, NewCard, NewTranslation};
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MemoryLog {
        events: RefCell<Vec<NewPracticeEvent>>,
    }

    impl PracticeLog for MemoryLog {
        fn record(&self, event: &NewPracticeEvent) -> Result<EventId> {
            let mut events = self.events.borrow_mut();
            events.push(event.clone());
            Ok(events.len() as EventId)
        }
    }

    struct FailingLog;

    impl PracticeLog for FailingLog {
        fn record(&self, _event: &NewPracticeEvent) -> Result<EventId> {
            Err(Error::Store(rusqlite::Error::QueryReturnedNoRows))
        }
    }

    fn cards(n: usize) -> Vec<PracticeCard> {
        (0..n)
            .map(|i| PracticeCard {
                card_id: i as i64 + 1,
                text: format!("parola {i}"),
                translation_id: i as i64 + 100,
                translation: format!("word {i}"),
                language_id: 7,
            })
            .collect()
    }

    fn session(mode: PracticeMode, n: usize, seed: u64) -> PracticeSession {
        PracticeSession::with_rng(mode, cards(n), StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn empty_card_list_is_rejected() {
        let result = PracticeSession::new(PracticeMode::Flashcard, vec![]);
        assert_matches!(result, Err(Error::Validation(msg)) if msg == "No cards available for the selected sets.");
    }

    #[test]
    fn mode_minimums_are_enforced() {
        assert_matches!(
            PracticeSession::new(PracticeMode::MultipleChoice, cards(3)),
            Err(Error::Validation(msg)) if msg == "At least 4 cards are needed for Multiple Choice mode."
        );
        assert_matches!(
            PracticeSession::new(PracticeMode::ChainReaction, cards(4)),
            Err(Error::Validation(msg)) if msg == "At least 5 cards are needed for Chain Reaction mode."
        );
        assert!(PracticeSession::new(PracticeMode::Flashcard, cards(1)).is_ok());
        assert!(PracticeSession::new(PracticeMode::MultipleChoice, cards(4)).is_ok());
        assert!(PracticeSession::new(PracticeMode::ChainReaction, cards(5)).is_ok());
    }

    #[test]
    fn flashcard_requires_reveal_then_records_and_wraps() {
        let log = MemoryLog::default();
        let mut s = session(PracticeMode::Flashcard, 2, 1);

        assert!(!s.is_revealed());
        assert_matches!(s.answer_flashcard(true, &log), Err(Error::Validation(_)));
        assert!(log.events.borrow().is_empty());

        s.reveal().unwrap();
        assert!(s.is_revealed());
        s.answer_flashcard(true, &log).unwrap();
        assert_eq!(s.index(), 1);
        assert!(!s.is_revealed());

        s.reveal().unwrap();
        s.answer_flashcard(false, &log).unwrap();
        assert_eq!(s.index(), 0, "index wraps around");

        let events = log.events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].card_id, 1);
        assert!(events[0].result);
        assert_eq!(events[0].translation_id, 100);
        assert_eq!(events[0].language_id, 7);
        assert_eq!(events[0].mode, PracticeMode::Flashcard);
        assert_eq!(events[1].card_id, 2);
        assert!(!events[1].result);
        assert_eq!(s.tally(), Tally { answered: 2, correct: 1 });
    }

    #[test]
    fn flashcard_can_be_skipped_without_recording() {
        let mut s = session(PracticeMode::Flashcard, 3, 1);
        s.next_card().unwrap();
        assert_eq!(s.index(), 1);
        assert_eq!(s.tally().answered, 0);
    }

    #[test]
    fn multiple_choice_options_hold_correct_answer_once() {
        for seed in 0..50 {
            let mut s = session(PracticeMode::MultipleChoice, 6, seed);
            for _ in 0..6 {
                let options = s.options().to_vec();
                let correct = &s.current_card().translation;
                assert_eq!(options.len(), CHOICE_COUNT);
                assert_eq!(options.iter().filter(|o| *o == correct).count(), 1);
                let distinct: HashSet<&String> = options.iter().collect();
                assert_eq!(distinct.len(), CHOICE_COUNT);

                let pick = options.iter().position(|o| o == correct).unwrap();
                s.select_option(pick).unwrap();
                s.check_answer(&MemoryLog::default()).unwrap();
                s.next_card().unwrap();
            }
        }
    }

    #[test]
    fn multiple_choice_skips_duplicate_translation_text() {
        let mut list = cards(5);
        list[1].translation = list[0].translation.clone();
        list[2].translation = "word 3".into();

        let s = PracticeSession::with_rng(PracticeMode::MultipleChoice, list, StdRng::seed_from_u64(3))
            .unwrap();
        let options = s.options();
        assert_eq!(options.iter().filter(|o| *o == "word 0").count(), 1);
        let distinct: HashSet<&String> = options.iter().collect();
        assert_eq!(distinct.len(), options.len());
        assert_eq!(options.len(), 3, "only two distinct distractors exist");
    }

    #[test]
    fn check_answer_locks_and_colors_options() {
        let log = MemoryLog::default();
        let mut s = session(PracticeMode::MultipleChoice, 4, 9);
        let correct = s.current_card().translation.clone();
        let right = s.options().iter().position(|o| *o == correct).unwrap();
        let wrong = (right + 1) % CHOICE_COUNT;

        assert_matches!(s.check_answer(&log), Err(Error::Validation(_)));
        assert_matches!(s.next_card(), Err(Error::Validation(_)));

        s.select_option(wrong).unwrap();
        assert_eq!(s.option_state(wrong), OptionState::Selected);
        assert!(!s.check_answer(&log).unwrap());

        assert_eq!(s.option_state(right), OptionState::Correct);
        assert_eq!(s.option_state(wrong), OptionState::Wrong);
        assert_matches!(s.select_option(right), Err(Error::Validation(_)));
        assert_matches!(s.check_answer(&log), Err(Error::Validation(_)));

        assert_eq!(log.events.borrow().len(), 1);
        assert!(!log.events.borrow()[0].result);

        s.next_card().unwrap();
        assert_eq!(s.index(), 1);
        assert_eq!(s.selected_option(), None);
        assert!(!s.is_checked());
    }

    #[test]
    fn check_answer_is_case_sensitive() {
        let mut list = cards(4);
        list[1].translation = "WORD 0".into();
        let mut s = PracticeSession::with_rng(PracticeMode::MultipleChoice, list, StdRng::seed_from_u64(2))
            .unwrap();
        let upper = s.options().iter().position(|o| o == "WORD 0").unwrap();
        s.select_option(upper).unwrap();
        assert!(!s.check_answer(&MemoryLog::default()).unwrap());
    }

    #[test]
    fn chain_has_five_distinct_links_with_first_prefilled() {
        let s = session(PracticeMode::ChainReaction, 5, 4);
        let chain = s.chain();
        assert_eq!(chain.len(), CHAIN_LENGTH);
        assert_eq!(chain[0].user_answer, chain[0].answer());
        assert!(chain[1..].iter().all(|l| l.user_answer.is_empty()));
        let ids: HashSet<i64> = chain.iter().map(|l| l.card.card_id).collect();
        assert_eq!(ids.len(), CHAIN_LENGTH);
        assert_eq!(s.chain_cursor(), 1);
        assert!(!s.is_chain_complete());
    }

    #[test]
    fn chain_scores_normalized_answers_and_records_each_link() {
        let log = MemoryLog::default();
        let mut s = session(PracticeMode::ChainReaction, 8, 11);
        let answers: Vec<String> = s.chain().iter().map(|l| l.answer().to_string()).collect();

        s.set_chain_input(&format!("  {}  ", answers[1].to_uppercase()));
        assert!(s.submit_chain_answer(&log).unwrap());
        s.set_chain_input("nope");
        assert!(!s.submit_chain_answer(&log).unwrap());
        for c in answers[3].chars() {
            s.push_chain_char(c);
        }
        s.push_chain_char('x');
        s.pop_chain_char();
        assert!(s.submit_chain_answer(&log).unwrap());
        s.set_chain_input("");
        assert!(!s.submit_chain_answer(&log).unwrap());

        assert!(s.is_chain_complete());
        assert_eq!(s.chain_score(), (3, 5));
        assert_matches!(s.submit_chain_answer(&log), Err(Error::Validation(_)));

        let events = log.events.borrow();
        assert_eq!(events.len(), 4, "the pre-filled link is not recorded");
        let chain_ids: Vec<i64> = s.chain()[1..].iter().map(|l| l.card.card_id).collect();
        let event_ids: Vec<i64> = events.iter().map(|e| e.card_id).collect();
        assert_eq!(event_ids, chain_ids);
        assert!(events.iter().all(|e| e.mode == PracticeMode::ChainReaction));
        assert_eq!(s.tally(), Tally { answered: 4, correct: 2 });
    }

    #[test]
    fn restart_draws_a_fresh_chain() {
        let log = MemoryLog::default();
        let mut s = session(PracticeMode::ChainReaction, 5, 5);
        for _ in 1..CHAIN_LENGTH {
            s.submit_chain_answer(&log).unwrap();
        }
        assert!(s.is_chain_complete());

        s.restart_chain().unwrap();
        assert!(!s.is_chain_complete());
        assert_eq!(s.chain_cursor(), 1);
        assert_eq!(s.chain().len(), CHAIN_LENGTH);
        assert_eq!(s.chain_score(), (1, 5));
    }

    #[test]
    fn actions_from_other_modes_are_rejected() {
        let log = MemoryLog::default();
        let mut flash = session(PracticeMode::Flashcard, 5, 1);
        assert_matches!(flash.select_option(0), Err(Error::Validation(_)));
        assert_matches!(flash.submit_chain_answer(&log), Err(Error::Validation(_)));
        assert_matches!(flash.restart_chain(), Err(Error::Validation(_)));
        assert!(flash.options().is_empty());

        let mut chain = session(PracticeMode::ChainReaction, 5, 1);
        assert_matches!(chain.reveal(), Err(Error::Validation(_)));
        assert_matches!(chain.next_card(), Err(Error::Validation(_)));
        assert!(log.events.borrow().is_empty());
    }

    #[test]
    fn failed_write_still_advances_the_session() {
        let mut s = session(PracticeMode::Flashcard, 3, 1);
        s.reveal().unwrap();
        assert_matches!(s.answer_flashcard(true, &FailingLog), Err(Error::Store(_)));
        assert_eq!(s.index(), 1);
    }

    #[test]
    fn setup_validates_and_loads_cards_from_store() {
        let mut store = Store::open_in_memory().unwrap();
        let set = store.create_card_set("Numbers", None).unwrap();
        let en = store.language_by_iso("en").unwrap().unwrap().id;
        let it = store.language_by_iso("it").unwrap().unwrap().id;
        for (text, translation) in [("uno", "one"), ("due", "two"), ("tre", "three")] {
            store
                .create_card(
                    set,
                    &NewCard {
                        text: text.into(),
                        language_id: Some(it),
                        translations: vec![NewTranslation::new(en, translation)],
                    },
                )
                .unwrap();
        }

        let mut setup = PracticeSetup::new(PracticeMode::MultipleChoice);
        assert_matches!(setup.start(&store), Err(Error::Validation(_)));
        setup.toggle_card_set(set);
        setup.select_language(en);
        assert!(setup.card_set_ids.is_empty(), "language change clears sets");
        assert_matches!(setup.start(&store), Err(Error::Validation(_)));

        setup.toggle_card_set(set);
        assert_matches!(
            setup.start(&store),
            Err(Error::Validation(msg)) if msg.contains("At least 4")
        );
        assert!(store.practice_events().unwrap().is_empty());

        setup.mode = PracticeMode::Flashcard;
        let mut session = setup.start(&store).unwrap();
        assert_eq!(session.cards().len(), 3);
        session.reveal().unwrap();
        session.answer_flashcard(true, &store).unwrap();
        assert_eq!(store.practice_events().unwrap().len(), 1);

        setup.toggle_card_set(set);
        assert!(setup.card_set_ids.is_empty());
    }
}
