use std::{
    error::Error,
    fs,
    io::{self, stdin, Read},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    event::KeyEventKind,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};

use lingo::{
    app::{App, Flow},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    import::{parse_import, resolve_rows},
    model::{Card, Language, NewCard, NewExample, NewTranslation, PracticeMode},
    practice::PracticeSetup,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    services::{
        media_type_for, AnthropicExtractor, DeepLClient, TranslationSuggester, UnderlineExtractor,
        UnderlinedPhrase,
    },
    stats::{load_statistics, render_report},
    store::{PracticeLog, Store},
    ui::screen::current_screen,
};

const TICK_RATE_MS: u64 = 250;

/// vocabulary flashcards in the terminal
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Keep vocabulary cards in sets, import them from spreadsheets, practice them as flashcards, multiple choice or chain reaction quizzes, and follow your progress."
)]
pub struct Cli {
    /// database file [default: ~/.local/state/lingo/lingo.db]
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file [default: platform config dir]
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// list the languages cards can use
    Languages,
    /// manage card sets
    Sets {
        #[clap(subcommand)]
        action: SetsAction,
    },
    /// manage the cards in a set
    Cards {
        #[clap(subcommand)]
        action: CardsAction,
    },
    /// add cards from tab-separated text (a header row, then one card per line)
    Import {
        set: i64,
        /// read from this file instead of stdin
        file: Option<PathBuf>,
    },
    /// start a practice session
    Practice {
        /// ISO-2 code of the language to answer in
        #[clap(short, long)]
        language: Option<String>,
        /// card set to draw cards from (repeatable)
        #[clap(short = 's', long = "set", required = true)]
        sets: Vec<i64>,
        #[clap(short, long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// print practice statistics
    Stats,
    /// browse practice statistics in the terminal
    Dashboard,
    /// suggest a translation using DeepL
    Suggest {
        text: String,
        /// ISO-2 code of the target language
        #[clap(long)]
        to: String,
    },
    /// list the underlined phrases in a photo of a page
    Extract {
        image: PathBuf,
        /// add every phrase as a card to this set
        #[clap(long, requires = "suggest")]
        into: Option<i64>,
        /// ISO-2 code to translate the phrases into with DeepL
        #[clap(long, requires = "into")]
        suggest: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SetsAction {
    List {
        /// only sets with cards translated into this ISO-2 language
        #[clap(short, long)]
        language: Option<String>,
    },
    Add {
        name: String,
        #[clap(short, long)]
        description: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum CardsAction {
    List {
        set: i64,
    },
    Add {
        set: i64,
        text: String,
        /// ISO-2 code of the card text
        #[clap(short, long)]
        language: Option<String>,
        /// ISO=TEXT (repeatable)
        #[clap(
            short,
            long = "translation",
            value_parser = parse_pair,
            required_unless_present = "suggest"
        )]
        translations: Vec<(String, String)>,
        /// ISO=SENTENCE|TRANSLATED SENTENCE (repeatable)
        #[clap(short, long = "example", value_parser = parse_pair)]
        examples: Vec<(String, String)>,
        /// ask DeepL for the translation into this ISO-2 language (repeatable)
        #[clap(long)]
        suggest: Vec<String>,
    },
    /// replace a card's text and translations
    Edit {
        id: i64,
        text: String,
        #[clap(short, long = "translation", value_parser = parse_pair, required = true)]
        translations: Vec<(String, String)>,
        #[clap(short, long = "example", value_parser = parse_pair)]
        examples: Vec<(String, String)>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    Flashcard,
    MultipleChoice,
    ChainReaction,
}

impl From<ModeArg> for PracticeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Flashcard => PracticeMode::Flashcard,
            ModeArg::MultipleChoice => PracticeMode::MultipleChoice,
            ModeArg::ChainReaction => PracticeMode::ChainReaction,
        }
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected ISO=TEXT, got `{s}`")),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    }
    .load();

    // network-only commands don't need the database
    match &cli.command {
        Command::Suggest { text, to } => {
            let client = DeepLClient::from_config(&config)?;
            println!("{}", client.suggest(text, to)?);
            return Ok(());
        }
        Command::Extract {
            image,
            into: None,
            ..
        } => return extract(image, &config),
        _ => {}
    }

    let db_path = cli
        .db
        .clone()
        .or_else(AppDirs::db_path)
        .unwrap_or_else(|| PathBuf::from("lingo.db"));
    let mut store = Store::open(&db_path)?;

    match cli.command {
        Command::Languages => {
            for lang in store.languages()? {
                println!("{}  {} {}", lang.iso_2, lang.flag_emoji, lang.name);
            }
        }
        Command::Sets { action } => sets(&mut store, action)?,
        Command::Cards { action } => cards(&mut store, &config, action)?,
        Command::Import { set, file } => import(&mut store, set, file.as_deref())?,
        Command::Practice {
            language,
            sets,
            mode,
        } => practice(&store, &config, language, sets, mode)?,
        Command::Stats => {
            let stats = load_statistics(&store, Utc::now().date_naive())?;
            print!("{}", render_report(&stats, Utc::now()));
        }
        Command::Dashboard => {
            let now = Utc::now();
            let stats = load_statistics(&store, now.date_naive())?;
            let mut app = App::dashboard(stats, now);
            run_tui(&mut app, &store)?;
        }
        Command::Extract {
            image,
            into: Some(set),
            suggest,
        } => extract_into(&mut store, &config, &image, set, suggest.as_deref().unwrap_or(""))?,
        Command::Suggest { .. } | Command::Extract { .. } => {}
    }
    Ok(())
}

fn sets(store: &mut Store, action: SetsAction) -> lingo::Result<()> {
    match action {
        SetsAction::List { language } => {
            let sets = match language {
                Some(code) => {
                    let language = lookup_language(store, &code)?;
                    store.card_sets_for_language(language.id)?
                }
                None => store.card_sets()?,
            };
            for set in sets {
                match &set.description {
                    Some(d) => println!("{:>4}  {} ({} cards)  {d}", set.id, set.name, set.card_count),
                    None => println!("{:>4}  {} ({} cards)", set.id, set.name, set.card_count),
                }
            }
        }
        SetsAction::Add { name, description } => {
            let id = store.create_card_set(&name, description.as_deref())?;
            println!("created card set {id}");
        }
        SetsAction::Delete { id } => {
            store.delete_card_set(id)?;
            println!("deleted card set {id}");
        }
    }
    Ok(())
}

fn cards(store: &mut Store, config: &Config, action: CardsAction) -> lingo::Result<()> {
    match action {
        CardsAction::List { set } => {
            let languages = store.languages()?;
            for card in store.list_cards(set)? {
                print_card(&card, &languages);
            }
        }
        CardsAction::Add {
            set,
            text,
            language,
            mut translations,
            examples,
            suggest,
        } => {
            if !suggest.is_empty() {
                let client = DeepLClient::from_config(config)?;
                add_suggestions(&client, &text, &suggest, &mut translations)?;
            }
            let language_id = language
                .as_deref()
                .map(|code| lookup_language(store, code).map(|l| l.id))
                .transpose()?;
            let card = NewCard {
                text,
                language_id,
                translations: build_translations(store, &translations, &examples)?,
            };
            let id = store.create_card(set, &card)?;
            println!("created card {id}");
        }
        CardsAction::Edit {
            id,
            text,
            translations,
            examples,
        } => {
            let translations = build_translations(store, &translations, &examples)?;
            store.update_card(id, &text, &translations)?;
            println!("updated card {id}");
        }
        CardsAction::Delete { id } => {
            store.delete_card(id)?;
            println!("deleted card {id}");
        }
    }
    Ok(())
}

/// Fill in a translation for each requested language the user did not type
fn add_suggestions(
    suggester: &dyn TranslationSuggester,
    text: &str,
    codes: &[String],
    translations: &mut Vec<(String, String)>,
) -> lingo::Result<()> {
    for code in codes {
        if translations.iter().any(|(t, _)| t.eq_ignore_ascii_case(code)) {
            continue;
        }
        let suggestion = suggester.suggest(text, code)?;
        log::info!("suggested {code} translation for {text:?}: {suggestion:?}");
        translations.push((code.clone(), suggestion));
    }
    Ok(())
}

fn lookup_language(store: &Store, code: &str) -> lingo::Result<Language> {
    store
        .language_by_iso(code)?
        .ok_or_else(|| lingo::Error::validation(format!("Unknown language code `{code}`")))
}

/// Group `--example` values under the `--translation` with the same code
fn build_translations(
    store: &Store,
    translations: &[(String, String)],
    examples: &[(String, String)],
) -> lingo::Result<Vec<NewTranslation>> {
    let mut built = Vec::with_capacity(translations.len());
    for (code, text) in translations {
        let language = lookup_language(store, code)?;
        let attached = examples
            .iter()
            .filter(|(ex_code, _)| ex_code.eq_ignore_ascii_case(code))
            .map(|(_, pair)| {
                let (sentence, translated) = pair.split_once('|').unwrap_or((pair.as_str(), ""));
                NewExample::new(sentence.trim(), translated.trim())
            })
            .collect();
        built.push(NewTranslation::new(language.id, text.clone()).with_examples(attached));
    }

    if let Some((orphan, _)) = examples
        .iter()
        .find(|(code, _)| !translations.iter().any(|(t, _)| t.eq_ignore_ascii_case(code)))
    {
        return Err(lingo::Error::validation(format!(
            "Example for `{orphan}` has no matching translation"
        )));
    }
    Ok(built)
}

fn print_card(card: &Card, languages: &[Language]) {
    let code = |id: i64| {
        languages
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.iso_2.as_str())
            .unwrap_or("??")
    };
    let source = card.language_id.map(code).unwrap_or("--");
    println!("{:>4}  [{source}] {}", card.id, card.text);
    for t in &card.translations {
        println!("        {}: {}", code(t.language_id), t.text);
        for ex in &t.examples {
            println!("            {} | {}", ex.text, ex.translation);
        }
    }
}

fn import(store: &mut Store, set: i64, file: Option<&Path>) -> lingo::Result<()> {
    let input = match file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let parsed = parse_import(&input)?;
    let cards = resolve_rows(&parsed.rows, &store.languages()?);
    let report = store.import_cards(set, &cards)?;

    println!("{}", report.summary());
    if parsed.skipped > 0 {
        println!("skipped {} rows without text", parsed.skipped);
    }
    for failure in &report.failed {
        println!("  {}: {}", failure.text, failure.error);
    }
    Ok(())
}

fn practice(
    store: &Store,
    config: &Config,
    language: Option<String>,
    sets: Vec<i64>,
    mode: Option<ModeArg>,
) -> Result<(), Box<dyn Error>> {
    let mut setup = PracticeSetup::new(mode.map(Into::into).unwrap_or(config.default_mode));
    let mut heading = String::new();
    if let Some(code) = language.or_else(|| config.default_language.clone()) {
        let lang = lookup_language(store, &code)?;
        heading = format!("{} {}", lang.flag_emoji, lang.name);
        setup.select_language(lang.id);
    }
    for set in sets {
        setup.toggle_card_set(set);
    }

    let session = setup.start(store)?;
    let mut app = App::practice(session, heading);
    run_tui(&mut app, store)?;

    if let Some(summary) = app.exit_summary() {
        println!("{summary}");
    }
    Ok(())
}

fn extract(image: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
    let media_type = media_type_for(image)?;
    let bytes = fs::read(image)?;
    let extractor = AnthropicExtractor::from_config(config)?;
    for phrase in extractor.extract(&bytes, media_type)? {
        println!("{}\t{}", phrase.phrase, phrase.context);
    }
    Ok(())
}

/// Turn extracted phrases into cards translated into `language`. The phrase
/// context is kept as an example sentence with its own suggested translation.
fn phrase_cards(
    phrases: &[UnderlinedPhrase],
    suggester: &dyn TranslationSuggester,
    language: &Language,
) -> lingo::Result<Vec<NewCard>> {
    phrases
        .iter()
        .map(|p| {
            let mut translation =
                NewTranslation::new(language.id, suggester.suggest(&p.phrase, &language.iso_2)?);
            if !p.context.is_empty() {
                let context = suggester.suggest(&p.context, &language.iso_2)?;
                translation = translation.with_examples(vec![NewExample::new(&p.context, context)]);
            }
            Ok(NewCard {
                text: p.phrase.clone(),
                language_id: None,
                translations: vec![translation],
            })
        })
        .collect()
}

fn extract_into(
    store: &mut Store,
    config: &Config,
    image: &Path,
    set: i64,
    code: &str,
) -> Result<(), Box<dyn Error>> {
    let language = lookup_language(store, code)?;
    store
        .card_set(set)?
        .ok_or(lingo::Error::NotFound {
            entity: "card set",
            id: set,
        })?;

    let media_type = media_type_for(image)?;
    let bytes = fs::read(image)?;
    let phrases = AnthropicExtractor::from_config(config)?.extract(&bytes, media_type)?;
    let cards = phrase_cards(&phrases, &DeepLClient::from_config(config)?, &language)?;

    let report = store.import_cards(set, &cards)?;
    println!("{}", report.summary());
    for failure in &report.failed {
        println!("  {}: {}", failure.text, failure.error);
    }
    Ok(())
}

fn run_tui(app: &mut App, log: &dyn PracticeLog) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = event_loop(&mut terminal, app, log, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    log: &dyn PracticeLog,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => continue,
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.on_key(key, log) == Flow::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}
