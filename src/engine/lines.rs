use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::LineRecord;

static LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*$").expect("line regex compiles"));

/// Split a document into lines with absolute byte offsets.
///
/// The newline is never part of a line; a trailing `\r` is dropped as well.
pub fn split_lines(text: &str) -> Vec<LineRecord> {
    LINE_REGEX
        .find_iter(text)
        .enumerate()
        .map(|(index, found)| {
            let raw = found.as_str();
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            LineRecord {
                line_number: index + 1,
                text: line.to_string(),
                start_offset: found.start(),
                end_offset: found.start() + line.len(),
            }
        })
        .collect()
}

pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

pub fn char_width(text: &str) -> usize {
    text.chars().count()
}

pub fn max_line_width(text: &str) -> usize {
    text_shape(text).into_iter().max().unwrap_or(0)
}

pub fn text_shape(text: &str) -> Vec<usize> {
    text.lines().map(char_width).collect()
}

pub fn pad_line(line: &str, width: usize) -> Cow<'_, str> {
    let current = char_width(line);
    if current >= width {
        return Cow::Borrowed(line);
    }

    let mut padded = String::with_capacity(line.len() + width - current);
    padded.push_str(line);
    padded.extend(std::iter::repeat_n(' ', width - current));
    Cow::Owned(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_tracks_offsets_without_newlines() {
        let lines = split_lines("alpha\r\n\nbeta  \ngamma");

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "alpha");
        assert_eq!((lines[0].start_offset, lines[0].end_offset), (0, 5));
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[1].line_number, 2);
        assert_eq!(lines[2].text, "beta  ");
        assert_eq!(lines[2].start_offset, 8);
        assert_eq!(lines[3].text, "gamma");
        assert_eq!(lines[3].end_offset, 20);
    }

    #[test]
    fn blank_lines_are_whitespace_only() {
        assert!(is_blank(""));
        assert!(is_blank(" \t "));
        assert!(!is_blank("  x"));
    }

    #[test]
    fn pad_line_extends_to_width() {
        assert_eq!(pad_line("ab", 5), "ab   ");
        assert_eq!(pad_line("abcdef", 3), "abcdef");
        assert_eq!(max_line_width("a\nabcd\nab"), 4);
        assert_eq!(text_shape("a\nabcd\n\nab"), vec![1, 4, 0, 2]);
        assert_eq!(max_line_width("ab\r\nabcd\r\n"), 4);
    }
}
