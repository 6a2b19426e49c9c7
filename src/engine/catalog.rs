//! Atomic lexical categories a line of extracted text is decomposed into.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

/// Length value meaning "no upper bound" (or "not specified" for a minimum).
pub const UNBOUNDED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    DateWithCentury,
    DateTwoDigitYear,
    Number,
    Word,
    Phrase,
    PhraseOrWord,
    HorizontalWhitespace,
    AnyWhitespace,
    AnyChar,
}

#[derive(Debug)]
pub struct CategorySpec {
    pub pattern: &'static str,
    pub min_len: i32,
    pub max_len: i32,
    /// The pattern needs a repetition quantifier appended to express its length.
    pub is_wildcard: bool,
    pub short_code: &'static str,
    pub abbr: &'static str,
}

const DATE_WITH_CENTURY: CategorySpec = CategorySpec {
    pattern: r"\d{2}/\d{2}/\d{4}",
    min_len: 10,
    max_len: 10,
    is_wildcard: false,
    short_code: "D4",
    abbr: "DY4",
};

const DATE_TWO_DIGIT_YEAR: CategorySpec = CategorySpec {
    pattern: r"\d{2}/\d{2}/\d{2}",
    min_len: 8,
    max_len: 8,
    is_wildcard: false,
    short_code: "D2",
    abbr: "DY2",
};

const NUMBER: CategorySpec = CategorySpec {
    pattern: r"(?:\d[,.\d]*)?\d",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: false,
    short_code: "N",
    abbr: "NUM",
};

const WORD: CategorySpec = CategorySpec {
    pattern: r"\S+",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: false,
    short_code: "W",
    abbr: "WRD",
};

// A phrase has at least two words joined by single whitespace.
const PHRASE: CategorySpec = CategorySpec {
    pattern: r"\S+(?:\s\S+)+",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: false,
    short_code: "P",
    abbr: "PHR",
};

const PHRASE_OR_WORD: CategorySpec = CategorySpec {
    pattern: r"\S+(?:\s\S+)*",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: false,
    short_code: "PW",
    abbr: "PWD",
};

const HORIZONTAL_WHITESPACE: CategorySpec = CategorySpec {
    pattern: r"[ ]",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: true,
    short_code: "S",
    abbr: "WSH",
};

const ANY_WHITESPACE: CategorySpec = CategorySpec {
    pattern: r"\s",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: true,
    short_code: "SA",
    abbr: "WSA",
};

const ANY_CHAR: CategorySpec = CategorySpec {
    pattern: r".",
    min_len: 1,
    max_len: UNBOUNDED,
    is_wildcard: true,
    short_code: "A",
    abbr: "ANY",
};

impl TokenCategory {
    pub const ALL: [TokenCategory; 9] = [
        TokenCategory::DateWithCentury,
        TokenCategory::DateTwoDigitYear,
        TokenCategory::Number,
        TokenCategory::Word,
        TokenCategory::Phrase,
        TokenCategory::PhraseOrWord,
        TokenCategory::HorizontalWhitespace,
        TokenCategory::AnyWhitespace,
        TokenCategory::AnyChar,
    ];

    pub fn spec(self) -> &'static CategorySpec {
        match self {
            Self::DateWithCentury => &DATE_WITH_CENTURY,
            Self::DateTwoDigitYear => &DATE_TWO_DIGIT_YEAR,
            Self::Number => &NUMBER,
            Self::Word => &WORD,
            Self::Phrase => &PHRASE,
            Self::PhraseOrWord => &PHRASE_OR_WORD,
            Self::HorizontalWhitespace => &HORIZONTAL_WHITESPACE,
            Self::AnyWhitespace => &ANY_WHITESPACE,
            Self::AnyChar => &ANY_CHAR,
        }
    }

    pub fn pattern(self) -> &'static str {
        self.spec().pattern
    }

    pub fn short_code(self) -> &'static str {
        self.spec().short_code
    }

    pub fn abbr(self) -> &'static str {
        self.spec().abbr
    }

    pub fn is_whitespace(self) -> bool {
        matches!(self, Self::HorizontalWhitespace | Self::AnyWhitespace)
    }

    /// Word and phrase positions are interchangeable once a column has been
    /// seen holding both.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Word | Self::Phrase | Self::PhraseOrWord)
    }

    pub fn render(self, min_len: i32, max_len: i32) -> Result<String> {
        let spec = self.spec();
        if !spec.is_wildcard {
            return Ok(spec.pattern.to_string());
        }
        Ok(format!("{}{}", spec.pattern, render_quantifier(min_len, max_len)?))
    }
}

/// Select the repetition suffix for an occurrence range.
///
/// A negative `max_len` is unbounded; a negative `min_len` is unspecified.
pub fn render_quantifier(min_len: i32, max_len: i32) -> Result<String> {
    let quantifier = if max_len < 0 {
        match min_len {
            i32::MIN..=0 => "*".to_string(),
            1 => "+".to_string(),
            _ => format!("{{{min_len},}}"),
        }
    } else if max_len == 1 {
        match min_len {
            i32::MIN..=0 => "?".to_string(),
            1 => String::new(),
            _ => return Err(min_exceeds_max(min_len, max_len)),
        }
    } else if min_len < 0 {
        // regex has no `{,n}` form
        format!("{{0,{max_len}}}")
    } else if min_len > max_len {
        return Err(min_exceeds_max(min_len, max_len));
    } else if min_len == max_len {
        format!("{{{min_len}}}")
    } else {
        format!("{{{min_len},{max_len}}}")
    };

    Ok(quantifier)
}

fn min_exceeds_max(min_len: i32, max_len: i32) -> EngineError {
    EngineError::Construction(format!(
        "min_len={min_len} cannot be greater than max_len={max_len}"
    ))
}
