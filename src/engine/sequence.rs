use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::catalog::{TokenCategory, UNBOUNDED};
use super::error::{EngineError, Result};
use super::token::{RegexToken, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimOptions {
    pub trim_head: bool,
    pub trim_tail: bool,
    pub head_tolerance: i32,
    pub tail_tolerance: i32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            trim_head: true,
            trim_tail: true,
            head_tolerance: 4,
            tail_tolerance: 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenSequence {
    pub tokens: Vec<RegexToken>,
    pub full_line_anchor: bool,
}

impl TokenSequence {
    pub fn new(full_line_anchor: bool) -> Self {
        Self {
            tokens: Vec::new(),
            full_line_anchor,
        }
    }

    pub fn from_tokens(full_line_anchor: bool, tokens: Vec<RegexToken>) -> Result<Self> {
        let mut sequence = Self::new(full_line_anchor);
        for token in tokens {
            sequence.push(token)?;
        }
        Ok(sequence)
    }

    pub fn push(&mut self, token: RegexToken) -> Result<()> {
        token.validate()?;
        self.tokens.push(token);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<RegexToken> {
        self.tokens.pop()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn render(&self) -> Result<String> {
        self.render_anchored(self.full_line_anchor)
    }

    pub fn render_anchored(&self, anchor: bool) -> Result<String> {
        let body = self
            .tokens
            .iter()
            .map(RegexToken::render)
            .collect::<Result<Vec<String>>>()?
            .concat();

        if anchor {
            Ok(format!("^{body}$"))
        } else {
            Ok(body)
        }
    }

    pub fn compile(&self) -> Result<Regex> {
        let pattern = self.render()?;
        Regex::new(&pattern).map_err(|err| EngineError::pattern(&pattern, err))
    }

    pub fn fingerprint(&self) -> Result<String> {
        fingerprint_of(&self.tokens)
    }

    pub fn fingerprint_trimmed(&self, options: TrimOptions) -> Result<String> {
        let (head, tail) = self.trim_counts(options);
        fingerprint_of(&self.tokens[head..self.tokens.len() - tail])
    }

    pub fn token_str(&self) -> String {
        self.tokens.iter().map(RegexToken::token_str).collect()
    }

    pub fn token_by_name(&self, name: &str) -> Option<&RegexToken> {
        self.tokens.iter().find(|token| token.name() == Some(name))
    }

    pub fn set_multiline(&mut self, name: &str, is_multiline: bool) -> bool {
        match self.tokens.iter_mut().find(|token| token.name() == Some(name)) {
            Some(token) => {
                token.is_multiline = is_multiline;
                true
            }
            None => false,
        }
    }

    /// Copy where every non-whitespace token captures as `<prefix>_<n>`.
    pub fn with_field_captures(&self, prefix: &str) -> Self {
        let mut field_index = 0usize;
        let tokens = self
            .tokens
            .iter()
            .map(|token| {
                if token.is_whitespace() || token.capture {
                    return token.clone();
                }
                field_index += 1;
                token.clone().named(format!("{prefix}_{field_index}"))
            })
            .collect();

        Self {
            tokens,
            full_line_anchor: self.full_line_anchor,
        }
    }

    pub fn trim_counts(&self, options: TrimOptions) -> (usize, usize) {
        let is_padding = |token: &RegexToken, tolerance: i32| {
            token.is_whitespace() && token.max_len != UNBOUNDED && token.max_len <= tolerance
        };

        let head = if options.trim_head {
            self.tokens
                .iter()
                .take_while(|token| is_padding(token, options.head_tolerance))
                .count()
        } else {
            0
        };

        let tail = if options.trim_tail {
            self.tokens[head..]
                .iter()
                .rev()
                .take_while(|token| is_padding(token, options.tail_tolerance))
                .count()
        } else {
            0
        };

        (head, tail)
    }

    pub fn trim(&self, options: TrimOptions) -> TokenSequence {
        let (head, tail) = self.trim_counts(options);
        TokenSequence {
            tokens: self.tokens[head..self.tokens.len() - tail].to_vec(),
            full_line_anchor: self.full_line_anchor,
        }
    }

    /// Compare against another line shape, reconciling word/phrase ambiguity.
    ///
    /// On a match the word/phrase promotions and boundary-padding corrections
    /// are committed to `self`; on a mismatch `self` is left untouched.
    pub fn is_similar(&mut self, other: &TokenSequence, trim: bool) -> Result<bool> {
        let options = if trim {
            TrimOptions::default()
        } else {
            TrimOptions {
                trim_head: false,
                trim_tail: false,
                ..TrimOptions::default()
            }
        };
        let (self_head, self_tail) = self.trim_counts(options);
        let (other_head, other_tail) = other.trim_counts(options);

        let self_core = self.tokens.len() - self_head - self_tail;
        let other_core = other.tokens.len() - other_head - other_tail;
        let mut candidate = self.clone();

        for offset in 0..self_core.min(other_core) {
            let left = &mut candidate.tokens[self_head + offset];
            let right = &other.tokens[other_head + offset];
            if !reconcile_position(left, right) {
                return Ok(false);
            }
        }

        if self_core != other_core {
            debug!(
                self_len = self_core,
                other_len = other_core,
                "prefix match, discarded"
            );
            return Ok(false);
        }

        if self.tokens.len() != other.tokens.len() || self_head != other_head {
            if !fold_boundary(&mut candidate, other, Boundary::Head, self_head, other_head)? {
                return Ok(false);
            }
            let (_, candidate_tail) = candidate.trim_counts(options);
            if !fold_boundary(&mut candidate, other, Boundary::Tail, candidate_tail, other_tail)? {
                return Ok(false);
            }
        }

        *self = candidate;
        Ok(true)
    }
}

fn fingerprint_of(tokens: &[RegexToken]) -> Result<String> {
    Ok(tokens
        .iter()
        .map(RegexToken::type_signature)
        .collect::<Result<Vec<&str>>>()?
        .join("-"))
}

fn reconcile_position(left: &mut RegexToken, right: &RegexToken) -> bool {
    match (&left.kind, &right.kind) {
        (TokenKind::Category(a), TokenKind::Category(b)) if a == b => true,
        (TokenKind::Category(a), TokenKind::Category(b)) if a.is_textual() && b.is_textual() => {
            trace!(from = ?a, observed = ?b, "promoting position to phrase-or-word");
            left.kind = TokenKind::Category(TokenCategory::PhraseOrWord);
            true
        }
        (TokenKind::Category(_), _) | (_, TokenKind::Category(_)) => false,
        _ => left.render().ok() == right.render().ok(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Head,
    Tail,
}

/// Make a single padding token present on only one side optional on `target`.
///
/// Returns `false` when the sides differ by more than one padding token.
fn fold_boundary(
    target: &mut TokenSequence,
    other: &TokenSequence,
    boundary: Boundary,
    target_count: usize,
    other_count: usize,
) -> Result<bool> {
    if target_count == other_count {
        return Ok(true);
    }

    if target_count.abs_diff(other_count) > 1 {
        debug!(
            boundary = ?boundary,
            target = %target.token_str(),
            other = %other.token_str(),
            "padding differs by several tokens, not similar"
        );
        return Ok(false);
    }

    if target_count > other_count {
        let index = match boundary {
            Boundary::Head => 0,
            Boundary::Tail => target.tokens.len() - 1,
        };
        let token = &mut target.tokens[index];
        if !token.is_whitespace() {
            return Err(EngineError::Unsupported(format!(
                "extra {boundary:?} token {token} is not whitespace"
            )));
        }
        token.min_len = 0;
        return Ok(true);
    }

    let extra = match boundary {
        Boundary::Head => &other.tokens[0],
        Boundary::Tail => &other.tokens[other.tokens.len() - 1],
    };
    if !extra.is_whitespace() {
        return Err(EngineError::Unsupported(format!(
            "extra {boundary:?} token {extra} is not whitespace"
        )));
    }

    let optional = extra.clone().with_min_len(0);
    match boundary {
        Boundary::Head => target.tokens.insert(0, optional),
        Boundary::Tail => target.tokens.push(optional),
    }
    Ok(true)
}
