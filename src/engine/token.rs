use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::catalog::{TokenCategory, UNBOUNDED, render_quantifier};
use super::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    And,
    Or,
}

impl CombineOp {
    pub fn separator(self) -> &'static str {
        match self {
            Self::And => "",
            Self::Or => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Category(TokenCategory),
    /// Caller-supplied pattern with no canonical short code.
    Custom(String),
    Composite {
        parts: Vec<RegexToken>,
        op: CombineOp,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexToken {
    pub kind: TokenKind,
    pub min_len: i32,
    pub max_len: i32,
    pub capture: bool,
    pub capture_name: Option<String>,
    pub is_wildcard: bool,
    pub is_multiline: bool,
    pub alignment: Alignment,
}

impl RegexToken {
    pub fn new(category: TokenCategory) -> Self {
        let spec = category.spec();
        Self {
            kind: TokenKind::Category(category),
            min_len: spec.min_len,
            max_len: spec.max_len,
            capture: false,
            capture_name: None,
            is_wildcard: spec.is_wildcard,
            is_multiline: false,
            alignment: Alignment::Left,
        }
    }

    pub fn custom(pattern: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Custom(pattern.into()),
            min_len: UNBOUNDED,
            max_len: UNBOUNDED,
            capture: false,
            capture_name: None,
            is_wildcard: false,
            is_multiline: false,
            alignment: Alignment::Left,
        }
    }

    pub fn composite(parts: Vec<RegexToken>, op: CombineOp) -> Self {
        Self {
            kind: TokenKind::Composite { parts, op },
            min_len: UNBOUNDED,
            max_len: UNBOUNDED,
            capture: false,
            capture_name: None,
            is_wildcard: false,
            is_multiline: false,
            alignment: Alignment::Left,
        }
    }

    pub fn whitespace(len: i32) -> Self {
        Self::new(TokenCategory::HorizontalWhitespace).with_len(len)
    }

    pub fn with_len(mut self, len: i32) -> Self {
        self.min_len = len;
        self.max_len = len;
        self
    }

    pub fn with_min_len(mut self, min_len: i32) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_max_len(mut self, max_len: i32) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_bounds(self, min_len: i32, max_len: i32) -> Self {
        self.with_min_len(min_len).with_max_len(max_len)
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Naming a token always turns capturing on.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.capture_name = Some(name.into());
        self.capture = true;
        self
    }

    pub fn multiline(mut self) -> Self {
        self.is_multiline = true;
        self
    }

    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn wildcard(mut self, is_wildcard: bool) -> Self {
        self.is_wildcard = is_wildcard;
        self
    }

    pub fn category(&self) -> Option<TokenCategory> {
        match &self.kind {
            TokenKind::Category(category) => Some(*category),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.category()
            .map(TokenCategory::is_whitespace)
            .unwrap_or(false)
    }

    pub fn name(&self) -> Option<&str> {
        self.capture_name.as_deref().filter(|name| !name.is_empty())
    }

    fn base_pattern(&self) -> Result<String> {
        match &self.kind {
            TokenKind::Category(category) => Ok(category.pattern().to_string()),
            TokenKind::Custom(pattern) => Ok(pattern.clone()),
            TokenKind::Composite { parts, op } => {
                let rendered = parts
                    .iter()
                    .map(RegexToken::render)
                    .collect::<Result<Vec<String>>>()?;
                let joined = rendered.join(op.separator());
                if *op == CombineOp::Or && !self.capture {
                    Ok(format!("(?:{joined})"))
                } else {
                    Ok(joined)
                }
            }
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut fragment = self.base_pattern()?;

        if self.is_wildcard {
            fragment.push_str(&render_quantifier(self.min_len, self.max_len)?);
        }

        if self.capture {
            fragment = match self.name() {
                Some(name) => format!("(?P<{name}>{fragment})"),
                None => format!("({fragment})"),
            };
        }

        Ok(fragment)
    }

    /// Short code used in line fingerprints; only catalog tokens have one.
    pub fn type_signature(&self) -> Result<&'static str> {
        match &self.kind {
            TokenKind::Category(category) => Ok(category.short_code()),
            TokenKind::Custom(pattern) => Err(EngineError::Usage(format!(
                "custom token '{pattern}' has no type signature"
            ))),
            TokenKind::Composite { .. } => Err(EngineError::Usage(
                "composite token has no type signature".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_len >= 0 && self.max_len >= 0 && self.min_len > self.max_len {
            return Err(EngineError::Construction(format!(
                "min_len={} cannot be greater than max_len={} for token {}",
                self.min_len, self.max_len, self
            )));
        }

        if let TokenKind::Composite { parts, .. } = &self.kind {
            if parts.is_empty() {
                return Err(EngineError::Construction(
                    "composite token needs at least one part".to_string(),
                ));
            }
            for part in parts {
                part.validate()?;
            }
        }

        let fragment = self.render()?;
        Regex::new(&fragment).map_err(|err| EngineError::pattern(&fragment, err))?;
        Ok(())
    }

    pub fn token_str(&self) -> String {
        match &self.kind {
            TokenKind::Category(category) if self.min_len == self.max_len => {
                format!("{}{{{}}}", category.abbr(), self.max_len)
            }
            TokenKind::Category(category) => {
                format!("{}{{{},{}}}", category.abbr(), self.min_len, self.max_len)
            }
            _ => self
                .render()
                .unwrap_or_else(|err| format!("<invalid: {err}>")),
        }
    }
}

impl fmt::Display for RegexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token_str())
    }
}
