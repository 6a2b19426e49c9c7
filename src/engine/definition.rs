//! Hand-authored table shapes loaded from JSON.

use serde::{Deserialize, Serialize};

use super::catalog::TokenCategory;
use super::error::{EngineError, Result};
use super::processor::{FrameOptions, ProcessorConfig};
use super::sequence::TokenSequence;
use super::token::{Alignment, CombineOp, RegexToken};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenDefinition {
    pub category: Option<TokenCategory>,
    pub pattern: Option<String>,
    pub any_of: Option<Vec<TokenDefinition>>,
    pub all_of: Option<Vec<TokenDefinition>>,
    pub len: Option<i32>,
    pub min_len: Option<i32>,
    pub max_len: Option<i32>,
    pub capture: bool,
    pub capture_name: Option<String>,
    pub multiline: bool,
    pub alignment: Option<Alignment>,
    pub wildcard: Option<bool>,
}

impl TokenDefinition {
    pub fn build(&self) -> Result<RegexToken> {
        let mut token = match (&self.category, &self.pattern, &self.any_of, &self.all_of) {
            (Some(category), None, None, None) => RegexToken::new(*category),
            (None, Some(pattern), None, None) => RegexToken::custom(pattern.clone()),
            (None, None, Some(parts), None) => RegexToken::composite(build_parts(parts)?, CombineOp::Or),
            (None, None, None, Some(parts)) => RegexToken::composite(build_parts(parts)?, CombineOp::And),
            _ => {
                return Err(EngineError::Construction(
                    "token definition must name exactly one of category, pattern, any_of, all_of"
                        .to_string(),
                ));
            }
        };

        if self.len.is_some() && (self.min_len.is_some() || self.max_len.is_some()) {
            return Err(EngineError::Construction(
                "len cannot be combined with min_len or max_len".to_string(),
            ));
        }
        if let Some(len) = self.len {
            token = token.with_len(len);
        }
        if let Some(min_len) = self.min_len {
            token = token.with_min_len(min_len);
        }
        if let Some(max_len) = self.max_len {
            token = token.with_max_len(max_len);
        }
        if let Some(is_wildcard) = self.wildcard {
            token = token.wildcard(is_wildcard);
        }
        if let Some(alignment) = self.alignment {
            token = token.aligned(alignment);
        }
        if self.capture {
            token = token.captured();
        }
        if let Some(name) = &self.capture_name {
            token = token.named(name.clone());
        }
        if self.multiline {
            token = token.multiline();
        }

        token.validate()?;
        Ok(token)
    }
}

fn build_parts(parts: &[TokenDefinition]) -> Result<Vec<RegexToken>> {
    parts.iter().map(TokenDefinition::build).collect()
}

fn default_full_line() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_full_line")]
    pub full_line: bool,
    pub tokens: Vec<TokenDefinition>,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub frame: FrameOptions,
}

impl ShapeDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| EngineError::Construction(format!("invalid shape definition: {err}")))
    }

    pub fn sequence(&self) -> Result<TokenSequence> {
        if self.tokens.is_empty() {
            return Err(EngineError::Construction(format!(
                "shape definition '{}' has no tokens",
                self.name
            )));
        }

        let tokens = self
            .tokens
            .iter()
            .map(TokenDefinition::build)
            .collect::<Result<Vec<_>>>()?;
        TokenSequence::from_tokens(self.full_line, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT_SHAPE: &str = r#"{
        "name": "statement",
        "tokens": [
            { "category": "horizontal_whitespace", "len": 1 },
            { "category": "date_two_digit_year", "capture_name": "Date" },
            { "category": "horizontal_whitespace", "min_len": 2, "max_len": 10 },
            { "category": "phrase_or_word", "capture_name": "Description", "multiline": true },
            { "category": "horizontal_whitespace", "min_len": 3 },
            { "any_of": [ { "category": "number" }, { "category": "horizontal_whitespace", "len": 1 } ],
              "capture_name": "Amount" },
            { "category": "horizontal_whitespace", "min_len": 0, "max_len": 4 }
        ],
        "processor": { "alignment_tolerance": 2 },
        "frame": { "join_str": " ", "trim": true }
    }"#;

    #[test]
    fn statement_shape_builds_expected_regex() {
        let definition = ShapeDefinition::from_json(STATEMENT_SHAPE).expect("definition parses");
        let sequence = definition.sequence().expect("sequence builds");

        assert_eq!(
            sequence.render().unwrap(),
            r"^[ ](?P<Date>\d{2}/\d{2}/\d{2})[ ]{2,10}(?P<Description>\S+(?:\s\S+)*)[ ]{3,}(?P<Amount>(?:\d[,.\d]*)?\d|[ ])[ ]{0,4}$"
        );
        assert!(sequence.token_by_name("Description").unwrap().is_multiline);
        assert_eq!(definition.processor.alignment_tolerance, 2);
        assert_eq!(definition.processor.whitespace_line_tolerance, 1);
        assert_eq!(definition.frame.join_str, " ");
        assert!(definition.full_line);
    }

    #[test]
    fn token_must_name_exactly_one_kind() {
        let both = TokenDefinition {
            category: Some(TokenCategory::Word),
            pattern: Some("[A-Z]+".to_string()),
            ..TokenDefinition::default()
        };
        assert!(matches!(both.build(), Err(EngineError::Construction(_))));
        assert!(matches!(
            TokenDefinition::default().build(),
            Err(EngineError::Construction(_))
        ));
    }

    #[test]
    fn unknown_category_is_a_construction_error() {
        let err = ShapeDefinition::from_json(r#"{ "tokens": [ { "category": "currency" } ] }"#)
            .expect_err("unknown category");
        assert!(matches!(err, EngineError::Construction(_)));
    }

    #[test]
    fn invalid_custom_pattern_reports_the_pattern() {
        let definition = ShapeDefinition::from_json(r#"{ "tokens": [ { "pattern": "[A-Z", "capture": true } ] }"#)
            .expect("definition parses");
        match definition.sequence() {
            Err(EngineError::Pattern { pattern, .. }) => assert_eq!(pattern, "([A-Z)"),
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn custom_wildcard_with_only_max_len_builds() {
        let definition = ShapeDefinition::from_json(
            r#"{ "tokens": [ { "pattern": "[A-Z]", "wildcard": true, "max_len": 5, "capture_name": "Code" } ] }"#,
        )
        .expect("definition parses");
        let regex = definition.sequence().expect("sequence builds").compile().unwrap();

        assert_eq!(regex.as_str(), "^(?P<Code>[A-Z]{0,5})$");
        assert!(regex.is_match("ABCDE"));
        assert!(!regex.is_match("ABCDEF"));
    }

    #[test]
    fn min_above_max_is_rejected() {
        let definition = TokenDefinition {
            category: Some(TokenCategory::AnyChar),
            min_len: Some(5),
            max_len: Some(2),
            ..TokenDefinition::default()
        };
        assert!(matches!(definition.build(), Err(EngineError::Construction(_))));
    }
}
