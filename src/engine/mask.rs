use regex::Regex;

use super::catalog::TokenCategory;
use super::error::{EngineError, Result};
use super::sequence::TokenSequence;
use super::token::{Alignment, RegexToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    All,
    Multi,
}

/// A token sequence whose every token has `min_len == max_len`.
///
/// Built from the concrete layout of an anchor line, it doubles as a literal
/// column mask of that line.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTokenSequence {
    sequence: TokenSequence,
}

impl FixedTokenSequence {
    pub fn new(full_line_anchor: bool) -> Self {
        Self {
            sequence: TokenSequence::new(full_line_anchor),
        }
    }

    pub fn push(&mut self, token: RegexToken) -> Result<()> {
        if token.min_len != token.max_len {
            return Err(EngineError::Construction(format!(
                "fixed sequence token {token} must have min_len equal to max_len"
            )));
        }
        self.sequence.push(token)
    }

    pub fn tokens(&self) -> &[RegexToken] {
        &self.sequence.tokens
    }

    pub fn as_sequence(&self) -> &TokenSequence {
        &self.sequence
    }

    pub fn render(&self) -> Result<String> {
        self.sequence.render()
    }

    pub fn compile(&self) -> Result<Regex> {
        self.sequence.compile()
    }

    pub fn mask_str(&self, strategy: FillStrategy, fill: char, blank: char) -> String {
        let mut mask = String::new();
        for token in self.tokens() {
            let is_field = match strategy {
                FillStrategy::All => !token.is_whitespace(),
                FillStrategy::Multi => !token.is_whitespace() && token.is_multiline,
            };
            let ch = if is_field { fill } else { blank };
            let width = usize::try_from(token.min_len).unwrap_or(0);
            mask.extend(std::iter::repeat_n(ch, width));
        }
        mask
    }

    /// Continuation pattern: only multi-line columns keep capturing, every
    /// other column collapses into fixed-width horizontal whitespace.
    pub fn shadow(&self) -> Result<FixedTokenSequence> {
        let mut shadow = FixedTokenSequence::new(self.sequence.full_line_anchor);
        for token in self.tokens() {
            if token.is_whitespace() || !token.is_multiline {
                shadow.push(RegexToken::whitespace(token.min_len))?;
            } else {
                shadow.push(token.clone())?;
            }
        }
        Ok(shadow)
    }

    /// Copy with every left-aligned multi-line column widened by `shift`
    /// characters taken from the token right after it.
    pub fn adjusted(&self, shift: i32) -> Result<FixedTokenSequence> {
        let mut adjusted = self.clone();
        let tokens = &mut adjusted.sequence.tokens;

        for index in 0..tokens.len() {
            let token = &tokens[index];
            if !token.is_multiline || token.alignment != Alignment::Left {
                continue;
            }

            if let Some(next) = tokens.get(index + 1) {
                if next.min_len <= shift {
                    return Err(EngineError::Consistency(format!(
                        "alignment shift {shift} exceeds the {} characters of token {next} after column {}",
                        next.min_len,
                        tokens[index].name().unwrap_or("?"),
                    )));
                }
                let next = &mut tokens[index + 1];
                next.min_len -= shift;
                next.max_len -= shift;
            }

            let token = &mut tokens[index];
            token.min_len += shift;
            token.max_len += shift;
        }

        Ok(adjusted)
    }
}

pub fn field_token(name: &str, width: i32, template: Option<&RegexToken>) -> RegexToken {
    let mut token = RegexToken::new(TokenCategory::AnyChar)
        .with_len(width)
        .named(name);
    if let Some(template) = template {
        token.is_multiline = template.is_multiline;
        token.alignment = template.alignment;
    }
    token
}
