pub mod charting;
pub mod dashboard;
pub mod practice;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::app::{App, AppState, StatusKind, StatusLine};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Practice => practice::render_practice(self, area, buf),
            AppState::Summary => render_summary(self, area, buf),
            AppState::Dashboard => dashboard::render_dashboard(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn legend_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn status_style(kind: StatusKind) -> Style {
    match kind {
        StatusKind::Info => Style::default().fg(Color::Cyan),
        StatusKind::Warning => Style::default().fg(Color::Yellow),
        StatusKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn render_status(status: Option<&StatusLine>, area: Rect, buf: &mut Buffer) {
    if let Some(status) = status {
        Paragraph::new(Span::styled(status.text.as_str(), status_style(status.kind)))
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let tally = app.tally();
    let mode = app
        .session
        .as_ref()
        .map(|s| s.mode().to_string())
        .unwrap_or_default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let lines = vec![
        Line::from(Span::styled(app.heading.as_str(), bold())),
        Line::from(format!("Mode: {mode}")),
        Line::from(format!("Answered: {}", tally.answered)),
        Line::from(Span::styled(
            format!(
                "Correct: {} ({:.0}%)",
                tally.correct,
                tally.success_ratio()
            ),
            Style::default().fg(Color::Green),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Session"))
        .render(chunks[1], buf);

    Paragraph::new(Span::styled("(r)esume / (q)uit", legend_style()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
}

#[cfg(test)]
pub(crate) fn render_to_string(app: &App, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    app.render(area, &mut buffer);
    buffer
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PracticeCard, PracticeMode};
    use crate::practice::PracticeSession;
    use rand::{rngs::StdRng, SeedableRng};

    fn summary_app() -> App {
        let cards = vec![PracticeCard {
            card_id: 1,
            text: "Hund".into(),
            translation_id: 1,
            translation: "dog".into(),
            language_id: 1,
        }];
        let session =
            PracticeSession::with_rng(PracticeMode::Flashcard, cards, StdRng::seed_from_u64(1))
                .unwrap();
        let mut app = App::practice(session, "German");
        app.state = AppState::Summary;
        app
    }

    #[test]
    fn summary_shows_tally_and_legend() {
        let rendered = render_to_string(&summary_app(), 80, 24);
        assert!(rendered.contains("German"));
        assert!(rendered.contains("Mode: Flashcard"));
        assert!(rendered.contains("Answered: 0"));
        assert!(rendered.contains("(r)esume / (q)uit"));
    }

    #[test]
    fn tiny_areas_do_not_panic() {
        let app = summary_app();
        for (w, h) in [(1, 1), (10, 5), (200, 60)] {
            let area = Rect::new(0, 0, w, h);
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert_eq!(*buffer.area(), area);
        }
    }
}
