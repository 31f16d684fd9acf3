use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::{bold, legend_style, render_status, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::app::App;
use crate::model::PracticeMode;
use crate::practice::{OptionState, PracticeSession};

pub fn render_practice(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(session) = app.session.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // heading
            Constraint::Length(1), // padding
            Constraint::Min(1),    // card
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = Line::from(vec![
        Span::styled(app.heading.as_str(), bold()),
        Span::raw("  ·  "),
        Span::styled(session.mode().to_string(), Style::default().fg(Color::Magenta)),
        Span::raw("  ·  "),
        Span::styled(session.progress_label(), Style::default().add_modifier(Modifier::DIM)),
    ]);
    Paragraph::new(header).render(chunks[0], buf);

    let body = match session.mode() {
        PracticeMode::Flashcard => flashcard_lines(session),
        PracticeMode::MultipleChoice => multiple_choice_lines(session),
        PracticeMode::ChainReaction => chain_lines(session),
    };
    Paragraph::new(body)
        .alignment(match session.mode() {
            PracticeMode::ChainReaction => Alignment::Left,
            _ => Alignment::Center,
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    render_status(app.status.as_ref(), chunks[3], buf);

    Paragraph::new(Span::styled(legend(session), legend_style()))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn legend(session: &PracticeSession) -> &'static str {
    match session.mode() {
        PracticeMode::Flashcard if session.is_revealed() => {
            "(y) knew it / (n) didn't / (tab) skip / (esc) finish"
        }
        PracticeMode::Flashcard => "(space) reveal / (tab) skip / (esc) finish",
        PracticeMode::MultipleChoice if session.is_checked() => "(enter) next / (esc) finish",
        PracticeMode::MultipleChoice => "(1-4 ↑↓) choose / (enter) check / (esc) finish",
        PracticeMode::ChainReaction if session.is_chain_complete() => {
            "(enter) new chain / (esc) finish"
        }
        PracticeMode::ChainReaction => "type the translation / (enter) submit / (esc) finish",
    }
}

fn flashcard_lines(session: &PracticeSession) -> Vec<Line<'_>> {
    let card = session.current_card();
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(card.text.as_str(), bold())),
        Line::from(""),
    ];
    if session.is_revealed() {
        lines.push(Line::from(Span::styled(
            card.translation.as_str(),
            bold().fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "· · ·",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines
}

fn multiple_choice_lines(session: &PracticeSession) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(session.current_card().text.as_str(), bold())),
        Line::from(""),
    ];

    for (idx, option) in session.options().iter().enumerate() {
        let style = match session.option_state(idx) {
            OptionState::Idle => Style::default(),
            OptionState::Selected => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            OptionState::Correct => bold().fg(Color::Green),
            OptionState::Wrong => bold().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
        };
        lines.push(Line::from(Span::styled(
            format!("{}. {option}", idx + 1),
            style,
        )));
    }
    lines
}

fn chain_lines(session: &PracticeSession) -> Vec<Line<'_>> {
    let links = session.chain();
    let cursor = session.chain_cursor();
    let question_width = links.iter().map(|l| l.question().width()).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(links.len() + 2);
    for (idx, link) in links.iter().enumerate() {
        let pad = " ".repeat(question_width - link.question().width());
        let mut spans = vec![
            Span::styled(format!("{}. ", idx + 1), Style::default().add_modifier(Modifier::DIM)),
            Span::styled(link.question(), bold()),
            Span::raw(pad),
            Span::raw("  →  "),
        ];

        if idx < cursor {
            let style = if link.is_correct() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            spans.push(Span::styled(link.user_answer.as_str(), style));
            if !link.is_correct() {
                spans.push(Span::styled(
                    format!("  ({})", link.answer()),
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
        } else if idx == cursor {
            spans.push(Span::styled(session.chain_input(), bold().fg(Color::Cyan)));
            spans.push(Span::styled(
                "_",
                Style::default().add_modifier(Modifier::SLOW_BLINK),
            ));
        }
        lines.push(Line::from(spans));
    }

    if session.is_chain_complete() {
        let (correct, total) = session.chain_score();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Score: {correct}/{total}"),
            bold().fg(Color::Magenta),
        )));
    }
    lines
}

#[cfg(test)]
mod tests {
    use crate::app::App;
    use crate::model::{EventId, NewPracticeEvent, PracticeCard, PracticeMode};
    use crate::practice::PracticeSession;
    use crate::store::PracticeLog;
    use crate::ui::render_to_string;
    use rand::{rngs::StdRng, SeedableRng};

    struct NullLog;

    impl PracticeLog for NullLog {
        fn record(&self, _event: &NewPracticeEvent) -> crate::error::Result<EventId> {
            Ok(1)
        }
    }

    fn app(mode: PracticeMode) -> App {
        let cards = ["uno", "due", "tre", "quattro", "cinque"]
            .iter()
            .zip(["one", "two", "three", "four", "five"])
            .enumerate()
            .map(|(i, (text, translation))| PracticeCard {
                card_id: i as i64 + 1,
                text: text.to_string(),
                translation_id: i as i64 + 1,
                translation: translation.to_string(),
                language_id: 1,
            })
            .collect();
        let session = PracticeSession::with_rng(mode, cards, StdRng::seed_from_u64(3)).unwrap();
        App::practice(session, "English")
    }

    #[test]
    fn flashcard_hides_translation_until_revealed() {
        let mut app = app(PracticeMode::Flashcard);
        let rendered = render_to_string(&app, 80, 20);
        assert!(rendered.contains("uno"));
        assert!(!rendered.contains("one"));
        assert!(rendered.contains("Card 1 of 5"));
        assert!(rendered.contains("(space) reveal"));

        app.session.as_mut().unwrap().reveal().unwrap();
        let rendered = render_to_string(&app, 80, 20);
        assert!(rendered.contains("one"));
        assert!(rendered.contains("(y) knew it"));
    }

    #[test]
    fn multiple_choice_lists_numbered_options() {
        let app = app(PracticeMode::MultipleChoice);
        let rendered = render_to_string(&app, 80, 20);
        assert!(rendered.contains("Multiple Choice"));
        for n in 1..=4 {
            assert!(rendered.contains(&format!("{n}. ")));
        }
        assert!(rendered.contains("one"));
    }

    #[test]
    fn chain_shows_prefilled_link_and_input() {
        let mut app = app(PracticeMode::ChainReaction);
        app.session.as_mut().unwrap().set_chain_input("tw");
        let first = app.session.as_ref().unwrap().chain()[0].clone();

        let rendered = render_to_string(&app, 80, 20);
        assert!(rendered.contains(first.question()));
        assert!(rendered.contains(first.answer()));
        assert!(rendered.contains("tw_"));
        assert!(rendered.contains("Link 2 of 5"));
    }

    #[test]
    fn finished_chain_shows_score() {
        let mut app = app(PracticeMode::ChainReaction);
        let session = app.session.as_mut().unwrap();
        for _ in 1..5 {
            session.submit_chain_answer(&NullLog).unwrap();
        }
        let rendered = render_to_string(&app, 80, 20);
        assert!(rendered.contains("Score: 1/5"));
        assert!(rendered.contains("(enter) new chain"));
    }
}
