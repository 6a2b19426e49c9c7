use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::catalog::TokenCategory;
use super::dictionary::{RegexDictionary, TokenMatch};
use super::error::{EngineError, Result};
use super::lines::{char_width, split_lines};
use super::sequence::TokenSequence;
use super::token::RegexToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub detect_phrases: bool,
    /// Widest whitespace run that may sit between two words of a phrase.
    pub phrase_space_tolerance: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            detect_phrases: true,
            phrase_space_tolerance: 1,
        }
    }
}

pub type GeneratedToken<'a> = (RegexToken, TokenMatch<'a>);

#[derive(Debug, Clone)]
pub struct RegexGenerator {
    dictionary: RegexDictionary,
    config: GeneratorConfig,
}

#[derive(Debug, Clone)]
pub struct LineSequence {
    pub line_number: usize,
    pub text: String,
    pub sequence: TokenSequence,
}

impl RegexGenerator {
    pub fn new(dictionary: RegexDictionary, config: GeneratorConfig) -> Result<Self> {
        // Phrase patterns join words with exactly one whitespace character.
        if config.phrase_space_tolerance > 1 {
            return Err(EngineError::Construction(format!(
                "phrase_space_tolerance={} is wider than the single whitespace a phrase pattern accepts",
                config.phrase_space_tolerance
            )));
        }
        Ok(Self { dictionary, config })
    }

    pub fn config(&self) -> GeneratorConfig {
        self.config
    }

    pub fn generate_tokens<'a>(&'a self, text: &'a str) -> TokenStream<'a> {
        self.generate_tokens_with(text, self.config.detect_phrases)
    }

    pub fn generate_tokens_with<'a>(&'a self, text: &'a str, detect_phrases: bool) -> TokenStream<'a> {
        TokenStream {
            dictionary: &self.dictionary,
            text,
            offset: 0,
            detect_phrases,
            phrase_space_tolerance: self.config.phrase_space_tolerance,
            phrase: Vec::new(),
            phrase_words: 0,
            ready: VecDeque::new(),
            failed: false,
        }
    }

    /// Tokenize one line into a full-line sequence and check that its own
    /// regex matches the line back.
    pub fn generate_token_sequence_and_verify_regex(&self, line_text: &str) -> Result<TokenSequence> {
        let mut sequence = TokenSequence::new(true);
        for generated in self.generate_tokens(line_text) {
            let (token, _) = generated?;
            sequence.push(token)?;
        }

        let regex = sequence.compile()?;
        if !regex.is_match(line_text) {
            return Err(EngineError::Consistency(format!(
                "generated regex '{}' does not match its source line {:?}",
                regex.as_str(),
                line_text
            )));
        }

        trace!(tokens = %sequence.token_str(), "verified line sequence");
        Ok(sequence)
    }

    pub fn line_sequences(&self, text: &str) -> Result<Vec<LineSequence>> {
        split_lines(text)
            .into_iter()
            .map(|line| {
                let sequence = self.generate_token_sequence_and_verify_regex(&line.text)?;
                Ok(LineSequence {
                    line_number: line.line_number,
                    text: line.text,
                    sequence,
                })
            })
            .collect()
    }
}

impl Default for RegexGenerator {
    fn default() -> Self {
        Self {
            dictionary: RegexDictionary::default(),
            config: GeneratorConfig::default(),
        }
    }
}

/// Single-pass cursor over the tokens of one line.
///
/// Words joined by narrow whitespace are buffered and, when two or more
/// words accumulated, collapsed into one `Phrase` token.
pub struct TokenStream<'a> {
    dictionary: &'a RegexDictionary,
    text: &'a str,
    offset: usize,
    detect_phrases: bool,
    phrase_space_tolerance: usize,
    phrase: Vec<GeneratedToken<'a>>,
    phrase_words: usize,
    ready: VecDeque<GeneratedToken<'a>>,
    failed: bool,
}

impl<'a> TokenStream<'a> {
    fn scan_next(&mut self) -> Result<GeneratedToken<'a>> {
        let source: &'a str = self.text;
        let dictionary: &'a RegexDictionary = self.dictionary;
        let (template, found) = dictionary.token_first(&source[self.offset..])?;

        let width = width_i32(found.text);
        let token = template.clone().with_len(width);
        let located = TokenMatch {
            text: found.text,
            start: self.offset + found.start,
            end: self.offset + found.end,
        };
        self.offset = located.end;
        Ok((token, located))
    }

    fn accept(&mut self, generated: GeneratedToken<'a>) {
        if !self.detect_phrases {
            self.ready.push_back(generated);
            return;
        }

        let category = generated.0.category();
        let in_phrase = !self.phrase.is_empty();

        match category {
            Some(TokenCategory::Word) => {
                self.phrase.push(generated);
                self.phrase_words += 1;
            }
            Some(TokenCategory::HorizontalWhitespace)
                if in_phrase
                    && usize::try_from(generated.0.max_len).unwrap_or(usize::MAX)
                        <= self.phrase_space_tolerance =>
            {
                self.phrase.push(generated);
            }
            _ => {
                self.close_phrase();
                self.ready.push_back(generated);
            }
        }
    }

    fn close_phrase(&mut self) {
        if self.phrase.is_empty() {
            return;
        }

        let mut buffered = std::mem::take(&mut self.phrase);
        let words = std::mem::replace(&mut self.phrase_words, 0);

        if words <= 1 {
            self.ready.extend(buffered);
            return;
        }

        let trailing_space = match buffered.last() {
            Some((token, _)) if token.is_whitespace() => buffered.pop(),
            _ => None,
        };

        let start = buffered.first().map(|(_, found)| found.start).unwrap_or(0);
        let end = buffered.last().map(|(_, found)| found.end).unwrap_or(start);
        let source: &'a str = self.text;
        let text = &source[start..end];
        debug!(phrase = text, words, "collapsed words into phrase");

        let phrase = RegexToken::new(TokenCategory::Phrase).with_len(width_i32(text));
        self.ready.push_back((phrase, TokenMatch { text, start, end }));
        if let Some(space) = trailing_space {
            self.ready.push_back(space);
        }
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = Result<GeneratedToken<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(generated) = self.ready.pop_front() {
                return Some(Ok(generated));
            }

            if self.failed {
                return None;
            }

            if self.offset >= self.text.len() {
                if self.phrase.is_empty() {
                    return None;
                }
                self.close_phrase();
                continue;
            }

            match self.scan_next() {
                Ok(generated) => self.accept(generated),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn width_i32(text: &str) -> i32 {
    i32::try_from(char_width(text)).unwrap_or(i32::MAX)
}
