use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::error::{EngineError, Result};
use super::lines::{char_width, is_blank, max_line_width, pad_line, split_lines};
use super::mask::{FillStrategy, FixedTokenSequence, field_token};
use super::sequence::TokenSequence;
use super::token::{Alignment, RegexToken};
use crate::model::{FlatField, FlatRecord, GroupSpan, LineRecord, MatchRecord, ShadowLineRecord, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Consecutive blank lines a continuation block may span.
    pub whitespace_line_tolerance: usize,
    /// Largest drift, in characters, recovered for a continuation line.
    pub alignment_tolerance: i32,
    pub strict_alignment: bool,
    pub pad_lines: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            whitespace_line_tolerance: 1,
            alignment_tolerance: 6,
            strict_alignment: true,
            pad_lines: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOptions {
    pub join_str: String,
    pub trim: bool,
    pub extended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    New,
    Processing,
    Done,
}

struct Shadow {
    mask: FixedTokenSequence,
    regex: Regex,
    recoverable: bool,
}

/// One regex match inside a (possibly padded) line; byte offsets are
/// line-relative.
struct LineMatch {
    start: usize,
    end: usize,
    groups: Vec<(String, usize, usize)>,
}

#[derive(Debug)]
pub struct TextProcessor {
    sequence: TokenSequence,
    pattern: Regex,
    config: ProcessorConfig,
    state: ProcessorState,
    lines: Vec<LineRecord>,
    matched: Vec<MatchRecord>,
}

impl TextProcessor {
    pub fn new(sequence: TokenSequence, config: ProcessorConfig) -> Result<Self> {
        let pattern = sequence.compile()?;
        debug!(regex = pattern.as_str(), "compiled shape regex");
        Ok(Self {
            sequence,
            pattern,
            config,
            state: ProcessorState::New,
            lines: Vec::new(),
            matched: Vec::new(),
        })
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn config(&self) -> ProcessorConfig {
        self.config
    }

    pub fn regex(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn matched_lines(&self) -> &[MatchRecord] {
        &self.matched
    }

    pub fn process(&mut self, text: &str) -> Result<&[MatchRecord]> {
        self.state = ProcessorState::Processing;
        self.matched.clear();
        self.lines = split_lines(text);

        let pad_width = if self.config.pad_lines {
            max_line_width(text)
        } else {
            0
        };

        let mut shadow: Option<Shadow> = None;
        let mut blank_run = 0usize;
        let mut shadow_count = 0usize;

        for index in 0..self.lines.len() {
            let line = &self.lines[index];
            let line_number = line.line_number;

            if is_blank(&line.text) {
                blank_run += 1;
                if blank_run > self.config.whitespace_line_tolerance && shadow.take().is_some() {
                    trace!(line = line_number, "blank run closed continuation block");
                }
                continue;
            }
            blank_run = 0;

            let text: Cow<'_, str> = if self.config.pad_lines {
                pad_line(&line.text, pad_width)
            } else {
                Cow::Borrowed(line.text.as_str())
            };
            let real_len = line.text.len();

            let found = apply(&self.pattern, &text);
            if !found.is_empty() {
                for line_match in &found {
                    let mask = self.anchor_mask(&text, line_match)?;
                    shadow = Some(Shadow::from_mask(&mask)?);
                }
                let records = found
                    .iter()
                    .map(|line_match| MatchRecord {
                        line_number,
                        full_match: span(&line.text, real_len, line_match.start, line_match.end),
                        groups: group_spans(&line.text, real_len, &line_match.groups),
                        shadow_lines: Vec::new(),
                    })
                    .collect::<Vec<_>>();
                trace!(line = line_number, matches = records.len(), "anchor line");
                self.matched.extend(records);
                continue;
            }

            let Some(active) = &shadow else {
                continue;
            };

            let Some((adjustment, line_match)) = self.match_shadow(active, &text, line_number)? else {
                trace!(line = line_number, "line excluded");
                continue;
            };

            let record = ShadowLineRecord {
                line_number,
                adjustment,
                full_match: span(&line.text, real_len, line_match.start, line_match.end),
                groups: group_spans(&line.text, real_len, &line_match.groups),
            };
            let anchor = self.matched.last_mut().ok_or_else(|| {
                EngineError::Consistency(format!("shadow line {line_number} matched with no active anchor"))
            })?;
            anchor.shadow_lines.push(record);
            shadow_count += 1;
        }

        self.state = ProcessorState::Done;
        info!(
            lines = self.lines.len(),
            anchors = self.matched.len(),
            shadow_lines = shadow_count,
            "processed document"
        );
        Ok(&self.matched)
    }

    /// Fixed-width description of one anchor match: a gap before every
    /// group, the group itself, and the tail after the last group.
    fn anchor_mask(&self, text: &str, line_match: &LineMatch) -> Result<FixedTokenSequence> {
        let mut mask = FixedTokenSequence::new(self.sequence.full_line_anchor);
        let mut cursor = 0usize;

        for (name, start, end) in &line_match.groups {
            if *start < cursor {
                // nested inside an earlier group
                continue;
            }
            mask.push(RegexToken::whitespace(width(&text[cursor..*start])))?;
            let template = self.sequence.token_by_name(name);
            mask.push(field_token(name, width(&text[*start..*end]), template))?;
            cursor = *end;
        }
        mask.push(RegexToken::whitespace(width(&text[cursor..])))?;

        trace!(mask = %mask.mask_str(FillStrategy::All, 'x', ' '), "anchor mask");
        Ok(mask)
    }

    fn match_shadow(&self, active: &Shadow, text: &str, line_number: usize) -> Result<Option<(i32, LineMatch)>> {
        if let Some(found) = apply(&active.regex, text).pop() {
            return Ok(Some((0, found)));
        }
        if !active.recoverable {
            return Ok(None);
        }

        for shift in 1..=self.config.alignment_tolerance {
            let adjusted = match active.mask.adjusted(shift) {
                Ok(adjusted) => adjusted,
                Err(err @ EngineError::Consistency(_)) if !self.config.strict_alignment => {
                    warn!(line = line_number, shift, error = %err, "stopping alignment recovery");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };

            let regex = adjusted.compile()?;
            if let Some(found) = apply(&regex, text).pop() {
                debug!(line = line_number, shift, "recovered continuation alignment");
                return Ok(Some((shift, found)));
            }
        }

        debug!(
            line = line_number,
            tolerance = self.config.alignment_tolerance,
            "alignment recovery exhausted"
        );
        Ok(None)
    }

    fn ensure_done(&self) -> Result<()> {
        if self.state != ProcessorState::Done {
            return Err(EngineError::Usage(format!(
                "text processor is {:?}; process a document first",
                self.state
            )));
        }
        Ok(())
    }

    fn line_offset(&self, line_number: usize) -> usize {
        self.lines
            .get(line_number.saturating_sub(1))
            .map(|line| line.start_offset)
            .unwrap_or(0)
    }

    pub fn matches_absolute(&self) -> Result<Vec<MatchRecord>> {
        self.ensure_done()?;

        Ok(self
            .matched
            .iter()
            .map(|record| {
                let base = self.line_offset(record.line_number);
                MatchRecord {
                    line_number: record.line_number,
                    full_match: shift_span(&record.full_match, base),
                    groups: shift_groups(&record.groups, base),
                    shadow_lines: record
                        .shadow_lines
                        .iter()
                        .map(|shadow| {
                            let base = self.line_offset(shadow.line_number);
                            ShadowLineRecord {
                                line_number: shadow.line_number,
                                adjustment: shadow.adjustment,
                                full_match: shift_span(&shadow.full_match, base),
                                groups: shift_groups(&shadow.groups, base),
                            }
                        })
                        .collect(),
                }
            })
            .collect())
    }

    pub fn frame_objects(&self, options: &FrameOptions) -> Result<Vec<FlatRecord>> {
        self.ensure_done()?;
        let absolute = self.matches_absolute()?;
        let mut records = Vec::with_capacity(absolute.len());

        for anchor in &absolute {
            let mut record = FlatRecord::default();
            for group in &anchor.groups {
                record.fields.push(FlatField {
                    name: group.name.clone(),
                    value: group.text.clone(),
                    spans: if options.extended {
                        vec![(group.start, group.end)]
                    } else {
                        Vec::new()
                    },
                });
            }

            for shadow in &anchor.shadow_lines {
                for group in &shadow.groups {
                    let piece = if options.trim {
                        group.text.trim()
                    } else {
                        group.text.as_str()
                    };

                    match record.field_mut(&group.name) {
                        Some(field) => {
                            field.value.push_str(&options.join_str);
                            field.value.push_str(piece);
                            if options.extended {
                                field.spans.push((group.start, group.end));
                            }
                        }
                        None => record.fields.push(FlatField {
                            name: group.name.clone(),
                            value: piece.to_string(),
                            spans: if options.extended {
                                vec![(group.start, group.end)]
                            } else {
                                Vec::new()
                            },
                        }),
                    }
                }
            }

            records.push(record);
        }

        Ok(records)
    }
}

impl Shadow {
    fn from_mask(mask: &FixedTokenSequence) -> Result<Self> {
        let mask = mask.shadow()?;
        let regex = mask.compile()?;
        let recoverable = mask
            .tokens()
            .iter()
            .any(|token| token.is_multiline && token.alignment == Alignment::Left);
        trace!(regex = regex.as_str(), "shadow regex");
        Ok(Self {
            mask,
            regex,
            recoverable,
        })
    }
}

fn apply(regex: &Regex, text: &str) -> Vec<LineMatch> {
    regex
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let groups = regex
                .capture_names()
                .enumerate()
                .skip(1)
                .filter_map(|(index, name)| {
                    let found = captures.get(index)?;
                    let name = name
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("group_{index}"));
                    Some((name, found.start(), found.end()))
                })
                .collect();
            Some(LineMatch {
                start: whole.start(),
                end: whole.end(),
                groups,
            })
        })
        .collect()
}

fn width(text: &str) -> i32 {
    i32::try_from(char_width(text)).unwrap_or(i32::MAX)
}

/// Span over the real line; padding added for matching is cut off.
fn span(line: &str, real_len: usize, start: usize, end: usize) -> Span {
    let start = start.min(real_len);
    let end = end.min(real_len);
    Span {
        text: line[start..end].to_string(),
        start,
        end,
    }
}

fn group_spans(line: &str, real_len: usize, groups: &[(String, usize, usize)]) -> Vec<GroupSpan> {
    groups
        .iter()
        .map(|(name, start, end)| {
            let Span { text, start, end } = span(line, real_len, *start, *end);
            GroupSpan {
                name: name.clone(),
                text,
                start,
                end,
            }
        })
        .collect()
}

fn shift_span(span: &Span, base: usize) -> Span {
    Span {
        text: span.text.clone(),
        start: span.start + base,
        end: span.end + base,
    }
}

fn shift_groups(groups: &[GroupSpan], base: usize) -> Vec<GroupSpan> {
    groups
        .iter()
        .map(|group| GroupSpan {
            name: group.name.clone(),
            text: group.text.clone(),
            start: group.start + base,
            end: group.end + base,
        })
        .collect()
}
