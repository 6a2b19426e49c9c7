use regex::Regex;
use tracing::trace;

use super::catalog::TokenCategory;
use super::error::{EngineError, Result};
use super::token::RegexToken;

/// Match of a token inside one line; offsets are line-relative bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
struct DictionaryEntry {
    token: RegexToken,
    anchored: Regex,
}

#[derive(Debug, Clone)]
pub struct RegexDictionary {
    entries: Vec<DictionaryEntry>,
}

impl RegexDictionary {
    pub fn with_tokens(tokens: Vec<RegexToken>) -> Result<Self> {
        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            token.validate()?;
            let pattern = format!("^{}", token.render()?);
            let anchored =
                Regex::new(&pattern).map_err(|err| EngineError::pattern(&pattern, err))?;
            entries.push(DictionaryEntry { token, anchored });
        }
        Ok(Self { entries })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &RegexToken> {
        self.entries.iter().map(|entry| &entry.token)
    }

    /// Classify the start of `text`.
    ///
    /// Exactly one entry must produce a non-empty match at offset zero; any
    /// other outcome means the dictionary does not cover its input language.
    pub fn token_first<'a>(&self, text: &'a str) -> Result<(&RegexToken, TokenMatch<'a>)> {
        for entry in &self.entries {
            let Some(found) = entry.anchored.find(text) else {
                continue;
            };

            if found.start() != 0 || found.is_empty() {
                return Err(EngineError::Consistency(format!(
                    "dictionary token {} matched {:?} at {}..{} instead of a non-empty prefix",
                    entry.token,
                    found.as_str(),
                    found.start(),
                    found.end()
                )));
            }

            trace!(token = %entry.token, matched = found.as_str(), "dictionary match");
            return Ok((
                &entry.token,
                TokenMatch {
                    text: found.as_str(),
                    start: found.start(),
                    end: found.end(),
                },
            ));
        }

        Err(EngineError::Consistency(format!(
            "no dictionary token matches the start of {:?}",
            text.chars().take(20).collect::<String>()
        )))
    }
}

impl Default for RegexDictionary {
    fn default() -> Self {
        let tokens = [
            TokenCategory::DateWithCentury,
            TokenCategory::DateTwoDigitYear,
            TokenCategory::Number,
            TokenCategory::Word,
            TokenCategory::HorizontalWhitespace,
            TokenCategory::AnyWhitespace,
        ]
        .into_iter()
        .map(RegexToken::new)
        .collect();

        Self::with_tokens(tokens).expect("catalog patterns compile")
    }
}
