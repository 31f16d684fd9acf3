/// X (last day index) and Y (highest count) bounds for the weekly chart.
/// Both are at least 1 so an empty week still draws axes.
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let highest = points.iter().map(|&(_, y)| y).fold(0.0, f64::max);
    let last_x = points.last().map(|p| p.0).unwrap_or(1.0);

    (last_x.max(1.0), highest.max(1.0).round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

const HEAT_LEVELS: [&str; 4] = ["░", "▒", "▓", "█"];

/// Heatmap cell for a day with `count` answers when the busiest day had `max`
pub fn heat_symbol(count: usize, max: usize) -> &'static str {
    if count == 0 || max == 0 {
        return "·";
    }
    let level = (count * HEAT_LEVELS.len()).div_ceil(max).clamp(1, HEAT_LEVELS.len());
    HEAT_LEVELS[level - 1]
}
