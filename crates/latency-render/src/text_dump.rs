//! Plain-text output: word wrapping and the per-API statistics dump.

use latency_data::aggregator::LatencyDescription;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Width of the `=` rule under the text report title.
pub const RULE_WIDTH: usize = 40;

const DESCRIBE_COLUMNS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const INDEX_HEADER: &str = "api_name";

// ── Wrapping ──────────────────────────────────────────────────────────────────

/// Greedy word wrap to at most `width` display columns per line.
///
/// Words wider than `width` are split across lines. Whitespace runs collapse
/// to a single space; an empty input yields no lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + 1 + word_width
        };

        if needed <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        for ch in word.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if current_width + w > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn pad_left(text: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(text);
    format!("{}{}", " ".repeat(width.saturating_sub(w)), text)
}

pub fn pad_right(text: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(w)))
}

// ── Describe table ────────────────────────────────────────────────────────────

fn describe_cells(d: &LatencyDescription) -> [String; 8] {
    let fixed = |v: f64| format!("{:.6}", v);
    [
        format!("{:.1}", d.count as f64),
        fixed(d.mean),
        d.std.map(fixed).unwrap_or_else(|| "NaN".to_string()),
        fixed(d.min),
        fixed(d.p25),
        fixed(d.p50),
        fixed(d.p75),
        fixed(d.max),
    ]
}

/// Right-aligned table of latency statistics, one row per API.
pub fn describe_table(rows: &[LatencyDescription]) -> String {
    let cells: Vec<[String; 8]> = rows.iter().map(describe_cells).collect();

    let index_width = rows
        .iter()
        .map(|r| UnicodeWidthStr::width(r.api_name.as_str()))
        .chain(std::iter::once(INDEX_HEADER.len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = DESCRIBE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (name, w) in DESCRIBE_COLUMNS.iter().zip(&widths) {
        out.push_str("  ");
        out.push_str(&pad_left(name, *w));
    }
    out.push('\n');
    out.push_str(INDEX_HEADER);
    out.push('\n');

    for (row, values) in rows.iter().zip(&cells) {
        out.push_str(&pad_right(&row.api_name, index_width));
        for (value, w) in values.iter().zip(&widths) {
            out.push_str("  ");
            out.push_str(&pad_left(value, *w));
        }
        out.push('\n');
    }
    out
}

/// Full contents of the plain-text statistics file.
pub fn render_text_report(run_name: &str, rows: &[LatencyDescription]) -> String {
    format!(
        "Analysis Report for {}\n{}\n{}",
        run_name,
        "=".repeat(RULE_WIDTH),
        describe_table(rows)
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, count: usize, std: Option<f64>) -> LatencyDescription {
        LatencyDescription {
            api_name: name.to_string(),
            count,
            mean: 200.0,
            std,
            min: 100.0,
            p25: 150.0,
            p50: 200.0,
            p75: 250.0,
            max: 300.0,
        }
    }

    // ── wrap_text ────────────────────────────────────────────────────────────

    #[test]
    fn test_wrap_short_text_is_one_line() {
        assert_eq!(wrap_text("NETWORK: 60.0% calls failed.", 80), vec!["NETWORK: 60.0% calls failed."]);
    }

    #[test]
    fn test_wrap_breaks_at_words() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert!(lines.iter().all(|l| l.len() <= 11));
    }

    #[test]
    fn test_wrap_splits_long_word() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_counts_display_width() {
        // Each CJK character takes two columns.
        let lines = wrap_text("接続 状態", 4);
        assert_eq!(lines, vec!["接続", "状態"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text("   ", 80).is_empty());
    }

    // ── describe table ───────────────────────────────────────────────────────

    #[test]
    fn test_text_report_header() {
        let text = render_text_report("15_NOV_BIKE_8", &[row("maps", 3, Some(100.0))]);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Analysis Report for 15_NOV_BIKE_8"));
        assert_eq!(lines.next(), Some("=".repeat(40).as_str()));
        let header = lines.next().unwrap();
        assert!(header.trim_start().starts_with("count"));
        assert!(header.trim_end().ends_with("max"));
        assert_eq!(lines.next(), Some("api_name"));
        let maps = lines.next().unwrap();
        assert!(maps.starts_with("maps"));
        assert!(maps.contains("3.0"));
        assert!(maps.contains("100.000000"));
    }

    #[test]
    fn test_single_value_std_is_nan() {
        let table = describe_table(&[row("auth", 1, None)]);
        assert!(table.contains("NaN"));
    }

    #[test]
    fn test_columns_align() {
        let table = describe_table(&[row("a", 3, Some(1.0)), row("much_longer_api", 12, Some(2.5))]);
        let lines: Vec<&str> = table.lines().filter(|l| *l != "api_name").collect();
        let len = lines[0].len();
        assert!(lines.iter().all(|l| l.len() == len));
    }
}
