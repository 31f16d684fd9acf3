use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Widget},
};

use super::charting::{compute_chart_params, format_label, heat_symbol};
use super::{bold, legend_style, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::app::App;
use crate::stats::{describe_last_practiced, LanguageStats, Statistics, WEEK_DAYS};
use crate::util::truncate;

const NAME_WIDTH: usize = 28;
const DAY_LABELS: [&str; WEEK_DAYS] = ["Mon", "", "Wed", "", "Fri", "", "Sun"];

pub fn render_dashboard(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(stats) = app.statistics.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),  // totals
            Constraint::Min(6),     // weekly chart
            Constraint::Length(9),  // heatmap
            Constraint::Length(8),  // languages
            Constraint::Length(1),  // legend
        ])
        .split(area);

    if stats.is_empty() {
        Paragraph::new(vec![
            Line::from(Span::styled("No practice recorded yet.", bold())),
            Line::from("Start a session with `lingo practice`."),
        ])
        .alignment(Alignment::Center)
        .render(chunks[0], buf);
    } else {
        render_totals(stats, app, chunks[0], buf);
        render_week_chart(stats, chunks[1], buf);
        render_heatmap(stats, chunks[2], buf);
        render_languages(&stats.per_language, app.scroll_offset, chunks[3], buf);
    }

    Paragraph::new(Span::styled("(↑↓) scroll languages / (esc) quit", legend_style()))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn render_totals(stats: &Statistics, app: &App, area: Rect, buf: &mut Buffer) {
    let modes = stats
        .per_mode
        .iter()
        .filter(|m| m.count > 0)
        .map(|m| format!("{} {} ({:.0}%)", m.mode, m.count, m.success_ratio))
        .collect::<Vec<_>>()
        .join("   ");

    let lines = vec![
        Line::from(vec![
            Span::styled(format!("{} answers", stats.total_events), bold()),
            Span::raw("   "),
            Span::styled(
                format!("{:.1}% correct", stats.overall_success_ratio),
                bold().fg(ratio_color(stats.overall_success_ratio)),
            ),
            Span::raw("   "),
            Span::styled(
                format!(
                    "streak {} (best {})",
                    stats.streaks.current, stats.streaks.longest
                ),
                bold().fg(Color::Magenta),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "last practiced {}",
                describe_last_practiced(stats.last_practiced, app.now)
            ),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(Span::styled(modes, Style::default().fg(Color::Gray))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_week_chart(stats: &Statistics, area: Rect, buf: &mut Buffer) {
    let points: Vec<(f64, f64)> = stats
        .last_week
        .iter()
        .enumerate()
        .map(|(i, day)| (i as f64, day.count as f64))
        .collect();
    let (last_day, highest) = compute_chart_params(&points);

    let first_label = stats
        .last_week
        .first()
        .map(|d| d.date.format("%a %d").to_string())
        .unwrap_or_default();
    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .block(Block::default().title(format!("last 7 days · {}", stats.week_total())))
        .x_axis(
            Axis::default()
                .bounds([0.0, last_day])
                .labels(vec![
                    Span::styled(first_label, bold()),
                    Span::styled("today", bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("answers")
                .bounds([0.0, highest])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(format_label(highest), bold()),
                ]),
        )
        .render(area, buf);
}

fn render_heatmap(stats: &Statistics, area: Rect, buf: &mut Buffer) {
    let weeks = stats.heatmap.weeks();
    let max = stats.heatmap.max_count();
    let block = Block::default().borders(Borders::ALL).title("past year");
    let inner = block.inner(area);
    block.render(area, buf);

    // keep the most recent weeks when the terminal is narrow
    let label_width = 4usize;
    let visible = (inner.width as usize).saturating_sub(label_width).min(weeks.len());
    let shown = &weeks[weeks.len() - visible..];

    let lines: Vec<Line> = (0..WEEK_DAYS)
        .map(|weekday| {
            let mut spans = vec![Span::styled(
                format!("{:<width$}", DAY_LABELS[weekday], width = label_width),
                Style::default().add_modifier(Modifier::DIM),
            )];
            spans.extend(shown.iter().map(|week| match week[weekday] {
                Some(day) => Span::styled(
                    heat_symbol(day.count, max),
                    Style::default().fg(if day.count > 0 {
                        Color::Green
                    } else {
                        Color::DarkGray
                    }),
                ),
                None => Span::raw(" "),
            }));
            Line::from(spans)
        })
        .collect();
    Paragraph::new(lines).render(inner, buf);
}

fn render_languages(languages: &[LanguageStats], offset: usize, area: Rect, buf: &mut Buffer) {
    let rows = languages.iter().skip(offset).map(|lang| {
        Row::new(vec![
            Cell::from(truncate(&format!("{} {}", lang.flag_emoji, lang.name), NAME_WIDTH))
                .style(Style::default().add_modifier(Modifier::BOLD)),
            Cell::from(lang.count.to_string()),
            Cell::from(format!("{:.1}%", lang.success_ratio))
                .style(Style::default().fg(ratio_color(lang.success_ratio))),
        ])
    });

    Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["Language", "Answers", "Correct"])
            .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
    )
    .block(Block::default().borders(Borders::ALL).title("by language"))
    .render(area, buf);
}

fn ratio_color(ratio: f64) -> Color {
    if ratio >= 80.0 {
        Color::Green
    } else if ratio >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}
