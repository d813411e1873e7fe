//! Lexical and structural feature extraction.
//!
//! Tokenization rule shared with the rest of the engine: lowercase, then split
//! on whitespace. All counts are derived from a single pass over the content so
//! extraction stays cheap and deterministic.

use std::collections::BTreeSet;

/// Phrases treated as evidence of worked examples.
const EXAMPLE_MARKERS: [&str; 4] = ["for example", "e.g.", "such as", "for instance"];

/// Ratio of U+FFFD replacement characters above which content is treated as a
/// corrupted transcoding rather than prose.
const REPLACEMENT_CHAR_LIMIT: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct TextFeatures {
    /// Lowercased whitespace-split tokens.
    pub words: Vec<String>,
    pub total_words: usize,
    pub distinct_words: usize,
    /// Tokens containing a digit: cited figures, years, measurements.
    pub digit_tokens: usize,
    pub example_markers: usize,
    pub link_count: usize,
    /// Bullet or numbered list lines (structured data).
    pub list_lines: usize,
    /// Markdown headings or short label lines ending with a colon.
    pub heading_lines: usize,
    /// Non-empty blocks separated by blank lines.
    pub paragraph_count: usize,
    pub char_len: usize,
}

pub fn extract(content: &str) -> TextFeatures {
    let lower = content.to_lowercase();
    let words: Vec<String> = lower.split_whitespace().map(|w| w.to_string()).collect();
    let total_words = words.len();
    let distinct_words = words.iter().collect::<BTreeSet<_>>().len();
    let digit_tokens = words
        .iter()
        .filter(|w| w.chars().any(|c| c.is_ascii_digit()))
        .count();

    let example_markers = EXAMPLE_MARKERS
        .iter()
        .map(|m| lower.matches(m).count())
        .sum();

    let link_count = lower.matches("http://").count() + lower.matches("https://").count();

    let mut list_lines = 0;
    let mut heading_lines = 0;
    let mut paragraph_count = 0;
    let mut in_paragraph = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            in_paragraph = false;
            continue;
        }
        if !in_paragraph {
            paragraph_count += 1;
            in_paragraph = true;
        }
        if is_list_line(trimmed) {
            list_lines += 1;
        }
        if is_heading_line(trimmed) {
            heading_lines += 1;
        }
    }

    TextFeatures {
        words,
        total_words,
        distinct_words,
        digit_tokens,
        example_markers,
        link_count,
        list_lines,
        heading_lines,
        paragraph_count,
        char_len: content.chars().count(),
    }
}

fn is_list_line(trimmed: &str) -> bool {
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("| ") {
        return true;
    }
    // Numbered item: "1." or "1)"
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    matches!(trimmed[digits.len()..].chars().next(), Some('.') | Some(')'))
}

fn is_heading_line(trimmed: &str) -> bool {
    trimmed.starts_with('#') || (trimmed.len() <= 60 && trimmed.ends_with(':'))
}

/// Content the scorer must refuse: NUL bytes or a transcoding dominated by
/// replacement characters. Returns the reason, or None for scoreable content.
pub fn corruption_reason(content: &str) -> Option<String> {
    if content.contains('\u{0}') {
        return Some("content contains NUL bytes".to_string());
    }
    let total = content.chars().count();
    if total == 0 {
        return None;
    }
    let replacements = content.chars().filter(|&c| c == '\u{FFFD}').count();
    let ratio = replacements as f32 / total as f32;
    if ratio > REPLACEMENT_CHAR_LIMIT {
        return Some(format!(
            "replacement-character ratio {ratio:.3} exceeds {REPLACEMENT_CHAR_LIMIT}"
        ));
    }
    None
}
