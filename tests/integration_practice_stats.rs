use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};

use lingo::import::{parse_import, resolve_rows};
use lingo::model::PracticeMode;
use lingo::practice::PracticeSession;
use lingo::stats::{compute_statistics, load_statistics};
use lingo::store::Store;

const DECK: &str = "text\ttext_language\ten\tde
Hund\tde\tdog\t
Katze\tde\tcat\t
Maus\tde\tmouse\t
Vogel\tde\tbird\t
Pferd\tde\thorse\t
gatto\tit\tcat\tKatze
";

#[test]
fn imported_cards_survive_reopen_and_feed_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("lingo.db");

    let (set, en) = {
        let mut store = Store::open(&path).unwrap();
        let set = store.create_card_set("Animals", Some("Tiere")).unwrap();
        let parsed = parse_import(DECK).unwrap();
        let cards = resolve_rows(&parsed.rows, &store.languages().unwrap());
        let report = store.import_cards(set, &cards).unwrap();
        assert_eq!(report.imported.len(), 6);
        assert!(report.failed.is_empty());
        (set, store.language_by_iso("en").unwrap().unwrap().id)
    };

    let store = Store::open(&path).unwrap();
    assert_eq!(store.card_set(set).unwrap().unwrap().card_count, 6);
    assert_eq!(store.card_sets_for_language(en).unwrap().len(), 1);

    let cards = store.practice_cards(en, &[set]).unwrap();
    assert_eq!(cards.len(), 6);
    assert_eq!(cards[0].text, "gatto", "newest card first");

    let mut session =
        PracticeSession::with_rng(PracticeMode::MultipleChoice, cards, StdRng::seed_from_u64(42))
            .unwrap();
    for _ in 0..3 {
        let correct = session.current_card().translation.clone();
        let pick = session.options().iter().position(|o| *o == correct).unwrap();
        session.select_option(pick).unwrap();
        assert!(session.check_answer(&store).unwrap());
        session.next_card().unwrap();
    }

    let today = Utc::now().date_naive();
    let stats = load_statistics(&store, today).unwrap();
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.overall_success_ratio, 100.0);
    assert_eq!(stats.last_week[6].count, 3);
    assert_eq!(stats.streaks.current, 1);
    assert_eq!(stats.per_language.len(), 1);
    assert_eq!(stats.per_language[0].name, "English");

    let mode = stats
        .per_mode
        .iter()
        .find(|m| m.mode == PracticeMode::MultipleChoice)
        .unwrap();
    assert_eq!(mode.count, 3);
}

#[test]
fn deleting_a_set_keeps_the_practice_log() {
    let mut store = Store::open_in_memory().unwrap();
    let set = store.create_card_set("Short-lived", None).unwrap();
    let parsed = parse_import(DECK).unwrap();
    let cards = resolve_rows(&parsed.rows, &store.languages().unwrap());
    store.import_cards(set, &cards).unwrap();
    let en = store.language_by_iso("en").unwrap().unwrap().id;

    let mut session = PracticeSession::with_rng(
        PracticeMode::Flashcard,
        store.practice_cards(en, &[set]).unwrap(),
        StdRng::seed_from_u64(1),
    )
    .unwrap();
    session.reveal().unwrap();
    session.answer_flashcard(false, &store).unwrap();

    store.delete_card_set(set).unwrap();
    assert!(store.card_set(set).unwrap().is_none());

    let events = store.practice_events().unwrap();
    assert_eq!(events.len(), 1);
    let stats = compute_statistics(&events, &store.languages().unwrap(), Utc::now().date_naive());
    assert_eq!(stats.overall_success_ratio, 0.0);
    assert_eq!(stats.total_events, 1);
}
