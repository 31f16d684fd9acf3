use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Percentage of `part` in `total`, 0 for an empty total
pub fn success_ratio(part: usize, total: usize) -> f64 {
    match total {
        positive if positive > 0 => part as f64 / total as f64 * 100.0,
        _ => 0.0,
    }
}

/// Free-text answers compare trimmed and case-insensitively
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

pub fn answers_match(given: &str, expected: &str) -> bool {
    normalize_answer(given) == normalize_answer(expected)
}

/// Shorten `text` to at most `max` terminal columns, marking the cut with an
/// ellipsis. Wide glyphs (flags, CJK) count as two columns.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut used = 0;
    let kept: String = text
        .chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= budget
        })
        .collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_ratio() {
        assert_eq!(success_ratio(1, 4), 25.0);
        assert_eq!(success_ratio(3, 3), 100.0);
    }

    #[test]
    fn test_success_ratio_empty_total() {
        assert_eq!(success_ratio(0, 0), 0.0);
        assert!(!success_ratio(0, 0).is_nan());
    }

    #[test]
    fn test_answers_match_ignores_case_and_outer_whitespace() {
        assert!(answers_match("  Hello ", "hello"));
        assert!(answers_match("GUTEN TAG", "Guten Tag"));
        assert!(answers_match("Ärger", "ärger"));
    }

    #[test]
    fn test_answers_match_keeps_inner_differences() {
        assert!(!answers_match("guten  tag", "guten tag"));
        assert!(!answers_match("hallo", "hello"));
        assert!(!answers_match("", "hello"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("longer text", 6), "longe…");
        assert_eq!(truncate("żółć gęślą", 5), "żółć…");
    }

    #[test]
    fn truncate_counts_display_columns() {
        // each ideograph is two columns wide
        assert_eq!(truncate("日本語の単語", 7), "日本語…");
        assert_eq!(truncate("日本語", 6), "日本語");
        let cut = truncate("漢字漢字漢字", 6);
        assert!(cut.width() <= 6, "{cut:?} is {} columns", cut.width());
    }
}
