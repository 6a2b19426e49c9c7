use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{TokenCategory, UNBOUNDED};
use super::error::Result;
use super::generator::RegexGenerator;
use super::lines::{is_blank, split_lines};
use super::sequence::TokenSequence;
use super::token::RegexToken;
use crate::model::{LineRecord, ShapeSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    #[default]
    Exact,
    Similar,
}

/// Lines clustered under one shape, with a representative widened to
/// cover every member.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGroup {
    pub key: String,
    pub representative: TokenSequence,
    pub members: Vec<LineRecord>,
}

impl ShapeGroup {
    fn new(key: String, representative: TokenSequence) -> Self {
        Self {
            key,
            representative,
            members: Vec::new(),
        }
    }

    /// Widen the representative's per-token bounds to cover `observed`.
    ///
    /// Bounds only grow. A member whose tokens cannot be lined up with the
    /// representative leaves it untouched and `false` is returned.
    pub fn widen(&mut self, observed: &TokenSequence) -> bool {
        match widened(&self.representative, observed) {
            Ok(representative) => {
                self.representative = representative;
                true
            }
            Err(reason) => {
                warn!(
                    key = %self.key,
                    representative = %self.representative.token_str(),
                    observed = %observed.token_str(),
                    reason,
                    "skipping widening for member"
                );
                false
            }
        }
    }

    pub fn first_line(&self) -> Option<usize> {
        self.members.first().map(|member| member.line_number)
    }

    pub fn capturing_sequence(&self, prefix: &str) -> TokenSequence {
        self.representative.with_field_captures(prefix)
    }
}

fn widened(representative: &TokenSequence, observed: &TokenSequence) -> std::result::Result<TokenSequence, String> {
    let mut result = representative.clone();
    let tokens = &mut result.tokens;
    let observed = &observed.tokens;

    // A representative may carry optional leading padding the member lacks.
    let optional_head = match (tokens.first(), observed.first()) {
        (Some(first), Some(seen)) => first.is_whitespace() && !seen.is_whitespace(),
        _ => false,
    };
    let head = if optional_head {
        tokens[0].min_len = 0;
        1
    } else {
        0
    };

    if tokens.len() - head < observed.len() {
        return Err(format!(
            "member has {} tokens, representative only {}",
            observed.len(),
            tokens.len() - head
        ));
    }

    for (offset, token) in tokens[head..].iter_mut().enumerate() {
        let Some(seen) = observed.get(offset) else {
            if token.is_whitespace() {
                token.min_len = 0;
                continue;
            }
            return Err(format!("member ends before non-whitespace token {token}"));
        };

        if !compatible(token, seen) {
            return Err(format!("token {token} cannot absorb {seen}"));
        }

        token.min_len = token.min_len.min(seen.min_len);
        token.max_len = if token.max_len == UNBOUNDED || seen.max_len == UNBOUNDED {
            UNBOUNDED
        } else {
            token.max_len.max(seen.max_len)
        };
    }

    Ok(result)
}

fn compatible(token: &RegexToken, seen: &RegexToken) -> bool {
    match (token.category(), seen.category()) {
        (Some(a), Some(b)) if a == b => true,
        (Some(TokenCategory::PhraseOrWord), Some(b)) => b.is_textual(),
        (None, None) => token.render().ok() == seen.render().ok(),
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeGroups {
    pub strategy: GroupingStrategy,
    groups: Vec<ShapeGroup>,
}

impl ShapeGroups {
    pub fn generate(text: &str, generator: &RegexGenerator, strategy: GroupingStrategy) -> Result<Self> {
        let mut shapes = Self {
            strategy,
            groups: Vec::new(),
        };
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut skipped_blank = 0usize;

        for line in split_lines(text) {
            if is_blank(&line.text) {
                skipped_blank += 1;
                continue;
            }

            let sequence = generator.generate_token_sequence_and_verify_regex(&line.text)?;
            let index = match strategy {
                GroupingStrategy::Exact => {
                    let key = sequence.fingerprint()?;
                    match by_key.get(&key).copied() {
                        Some(index) => index,
                        None => shapes.open_group(&mut by_key, key, &sequence, line.line_number),
                    }
                }
                GroupingStrategy::Similar => {
                    let mut found = None;
                    for (index, group) in shapes.groups.iter_mut().enumerate() {
                        if group.representative.is_similar(&sequence, true)? {
                            found = Some(index);
                            break;
                        }
                    }
                    match found {
                        Some(index) => index,
                        None => {
                            let key = unique_key(&by_key, sequence.fingerprint()?);
                            shapes.open_group(&mut by_key, key, &sequence, line.line_number)
                        }
                    }
                }
            };

            let group = &mut shapes.groups[index];
            group.widen(&sequence);
            group.members.push(line);
        }

        info!(
            groups = shapes.groups.len(),
            skipped_blank,
            strategy = ?strategy,
            "grouped line shapes"
        );
        Ok(shapes)
    }

    fn open_group(
        &mut self,
        by_key: &mut HashMap<String, usize>,
        key: String,
        sequence: &TokenSequence,
        line_number: usize,
    ) -> usize {
        debug!(line = line_number, key = %key, tokens = %sequence.token_str(), "new shape group");
        let index = self.groups.len();
        by_key.insert(key.clone(), index);
        self.groups.push(ShapeGroup::new(key, sequence.clone()));
        index
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeGroup> {
        self.groups.iter()
    }

    pub fn get(&self, key: &str) -> Option<&ShapeGroup> {
        self.groups.iter().find(|group| group.key == key)
    }

    /// Apply each representative back to the document and count the lines it
    /// matches.
    pub fn summaries(&self, text: &str) -> Result<Vec<ShapeSummary>> {
        let lines = split_lines(text);
        let mut summaries = Vec::with_capacity(self.groups.len());

        for group in &self.groups {
            let regex = group.representative.compile()?;
            let document_match_count = lines.iter().filter(|line| regex.is_match(&line.text)).count();

            if document_match_count != group.members.len() {
                debug!(
                    key = %group.key,
                    members = group.members.len(),
                    matches = document_match_count,
                    "representative regex match count differs from member count"
                );
            }

            summaries.push(ShapeSummary {
                key: group.key.clone(),
                member_count: group.members.len(),
                first_line: group.first_line().unwrap_or(0),
                token_str: group.representative.token_str(),
                regex: regex.as_str().to_string(),
                document_match_count,
            });
        }

        Ok(summaries)
    }
}

fn unique_key(by_key: &HashMap<String, usize>, fingerprint: String) -> String {
    if !by_key.contains_key(&fingerprint) {
        return fingerprint;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{fingerprint}#{n}");
        if !by_key.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
