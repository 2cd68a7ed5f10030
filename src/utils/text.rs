use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Tidy raw OCR/transcript output: collapse runs of spaces, trim every
/// line, and keep at most one blank line between paragraphs.
pub fn normalize_whitespace(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n").replace('\u{000C}', "\n");
    let collapsed = HORIZONTAL_WS.replace_all(&unified, " ");
    let trimmed_lines = collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES.replace_all(&trimmed_lines, "\n\n").trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_spaces_and_blank_lines() {
        let raw = "  Hello   World \r\n\r\n\r\n\r\nThis\tis  a test \n\u{000C}";
        assert_eq!(normalize_whitespace(raw), "Hello World\n\nThis is a test");
    }

    #[test]
    fn test_normalize_blank_input() {
        assert_eq!(normalize_whitespace(" \n \n\t"), "");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("Hello World\nThis is a test"), 6);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("résumé", 3), "rés");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 0), "");
    }
}
