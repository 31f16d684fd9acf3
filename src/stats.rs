//! Practice statistics, recomputed from the event log on every request.
//!
//! Calendar days are UTC days of each event's timestamp; "today" is passed in
//! by the caller so results are reproducible.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use itertools::Itertools;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::error::Result;
use crate::model::{Language, LanguageId, PracticeEvent, PracticeMode};
use crate::store::Store;
use crate::util::success_ratio;

pub const WEEK_DAYS: usize = 7;
pub const YEAR_DAYS: usize = 365;

const UNKNOWN_FLAG: &str = "🏳️";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
    pub successes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageStats {
    pub language_id: LanguageId,
    pub name: String,
    pub flag_emoji: String,
    pub count: usize,
    pub successes: usize,
    pub success_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeStats {
    pub mode: PracticeMode,
    pub count: usize,
    pub success_ratio: f64,
}

/// Consecutive calendar days with at least one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Daily buckets laid out for a calendar view
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    days: Vec<DailyCount>,
}

impl Heatmap {
    pub fn new(days: Vec<DailyCount>) -> Self {
        Self { days }
    }

    pub fn days(&self) -> &[DailyCount] {
        &self.days
    }

    pub fn max_count(&self) -> usize {
        self.days.iter().map(|d| d.count).max().unwrap_or(0)
    }

    /// Week columns, Monday first. Slots before the first day and after the
    /// last day are `None`.
    pub fn weeks(&self) -> Vec<[Option<DailyCount>; WEEK_DAYS]> {
        let Some(first) = self.days.first() else {
            return Vec::new();
        };

        let mut weeks = Vec::new();
        let mut week = [None; WEEK_DAYS];
        let mut slot = first.date.weekday().num_days_from_monday() as usize;
        for day in &self.days {
            week[slot] = Some(*day);
            slot += 1;
            if slot == WEEK_DAYS {
                weeks.push(week);
                week = [None; WEEK_DAYS];
                slot = 0;
            }
        }
        if slot > 0 {
            weeks.push(week);
        }
        weeks
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub today: NaiveDate,
    pub last_week: Vec<DailyCount>,
    pub last_year: Vec<DailyCount>,
    pub total_events: usize,
    pub successful_events: usize,
    pub overall_success_ratio: f64,
    pub per_language: Vec<LanguageStats>,
    pub per_mode: Vec<ModeStats>,
    pub streaks: Streaks,
    pub heatmap: Heatmap,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }

    pub fn week_total(&self) -> usize {
        self.last_week.iter().map(|d| d.count).sum()
    }
}

/// Read the log and languages from `store` and aggregate them
pub fn load_statistics(store: &Store, today: NaiveDate) -> Result<Statistics> {
    let events = store.practice_events()?;
    let languages = store.languages()?;
    log::debug!("aggregating {} practice events", events.len());
    Ok(compute_statistics(&events, &languages, today))
}

pub fn compute_statistics(
    events: &[PracticeEvent],
    languages: &[Language],
    today: NaiveDate,
) -> Statistics {
    let total_events = events.len();
    let successful_events = events.iter().filter(|e| e.result).count();
    let last_year = daily_counts(events, today, YEAR_DAYS);

    Statistics {
        today,
        last_week: last_year[YEAR_DAYS - WEEK_DAYS..].to_vec(),
        heatmap: Heatmap::new(last_year.clone()),
        last_year,
        total_events,
        successful_events,
        overall_success_ratio: success_ratio(successful_events, total_events),
        per_language: per_language(events, languages),
        per_mode: per_mode(events),
        streaks: streaks(events, today),
        last_practiced: events.iter().map(|e| e.practiced_at).max(),
    }
}

/// One bucket per day for the `days` days ending with `today`, oldest first
pub fn daily_counts(events: &[PracticeEvent], today: NaiveDate, days: usize) -> Vec<DailyCount> {
    let first = today - Duration::days(days as i64 - 1);
    let mut buckets: Vec<DailyCount> = first
        .iter_days()
        .take(days)
        .map(|date| DailyCount {
            date,
            count: 0,
            successes: 0,
        })
        .collect();

    for event in events {
        let date = event.practiced_at.date_naive();
        if date < first || date > today {
            continue;
        }
        let bucket = &mut buckets[(date - first).num_days() as usize];
        bucket.count += 1;
        if event.result {
            bucket.successes += 1;
        }
    }
    buckets
}

fn per_language(events: &[PracticeEvent], languages: &[Language]) -> Vec<LanguageStats> {
    let names: HashMap<LanguageId, &Language> = languages.iter().map(|l| (l.id, l)).collect();

    events
        .iter()
        .into_group_map_by(|e| e.language_id)
        .into_iter()
        .map(|(language_id, group)| {
            let count = group.len();
            let successes = group.iter().filter(|e| e.result).count();
            let (name, flag_emoji) = match names.get(&language_id) {
                Some(language) => (language.name.clone(), language.flag_emoji.clone()),
                None => (
                    format!("Unknown language #{language_id}"),
                    UNKNOWN_FLAG.to_string(),
                ),
            };
            LanguageStats {
                language_id,
                name,
                flag_emoji,
                count,
                successes,
                success_ratio: success_ratio(successes, count),
            }
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)))
        .collect()
}

fn per_mode(events: &[PracticeEvent]) -> Vec<ModeStats> {
    PracticeMode::ALL
        .into_iter()
        .map(|mode| {
            let (count, successes) = events
                .iter()
                .filter(|e| e.mode == mode)
                .fold((0, 0), |(n, ok), e| (n + 1, ok + usize::from(e.result)));
            ModeStats {
                mode,
                count,
                success_ratio: success_ratio(successes, count),
            }
        })
        .collect()
}

/// Walk the distinct practice days in order. A one-day gap extends the run,
/// a longer gap restarts it at 1. The current run lapses unless the last day
/// is today or yesterday.
pub fn streaks(events: &[PracticeEvent], today: NaiveDate) -> Streaks {
    let days: BTreeSet<NaiveDate> = events.iter().map(|e| e.practiced_at.date_naive()).collect();

    let mut result = Streaks::default();
    let mut previous: Option<NaiveDate> = None;
    for day in &days {
        result.current = match previous {
            Some(prev) if (*day - prev).num_days() == 1 => result.current + 1,
            _ => 1,
        };
        result.longest = result.longest.max(result.current);
        previous = Some(*day);
    }

    if let Some(last) = previous {
        let yesterday = today - Duration::days(1);
        if last != today && last != yesterday {
            result.current = 0;
        }
    }
    result
}

/// "3 hours ago", or "never" when nothing has been practiced
pub fn describe_last_practiced(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last {
        Some(at) => {
            let seconds = (now - at).num_seconds().max(0);
            HumanTime::from_seconds(seconds).to_text_en(Accuracy::Rough, Tense::Past)
        }
        None => "never".to_string(),
    }
}

/// Plain-text report for the `stats` command
pub fn render_report(stats: &Statistics, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    if stats.is_empty() {
        out.push_str("No practice recorded yet.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Answers: {} ({} correct, {:.1}%)",
        stats.total_events, stats.successful_events, stats.overall_success_ratio
    );
    let _ = writeln!(
        out,
        "Streak: {} days (longest {})",
        stats.streaks.current, stats.streaks.longest
    );
    let _ = writeln!(
        out,
        "Last practiced: {}",
        describe_last_practiced(stats.last_practiced, now)
    );

    let _ = writeln!(out, "\nLast 7 days:");
    for day in &stats.last_week {
        let _ = writeln!(
            out,
            "  {} {:>4} {:>6.1}%",
            day.date.format("%a %d %b"),
            day.count,
            success_ratio(day.successes, day.count)
        );
    }

    let _ = writeln!(out, "\nBy language:");
    for lang in &stats.per_language {
        let _ = writeln!(
            out,
            "  {} {:<20} {:>5} {:>6.1}%",
            lang.flag_emoji, lang.name, lang.count, lang.success_ratio
        );
    }

    let _ = writeln!(out, "\nBy mode:");
    for mode in stats.per_mode.iter().filter(|m| m.count > 0) {
        let _ = writeln!(
            out,
            "  {:<20} {:>5} {:>6.1}%",
            mode.mode.to_string(),
            mode.count,
            mode.success_ratio
        );
    }

    out
}
