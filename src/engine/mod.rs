//! Regex tokenization and alignment engine.
//!
//! Lines are decomposed into typed tokens, grouped into table shapes, and a
//! shape is matched back against a document with multi-line fields followed
//! onto their continuation lines.

pub mod catalog;
pub mod definition;
pub mod dictionary;
pub mod error;
pub mod generator;
pub mod lines;
pub mod mask;
pub mod presets;
pub mod processor;
pub mod sequence;
pub mod shapes;
pub mod token;

pub use catalog::{TokenCategory, UNBOUNDED};
pub use definition::{ShapeDefinition, TokenDefinition};
pub use dictionary::RegexDictionary;
pub use error::{EngineError, Result};
pub use generator::{GeneratorConfig, RegexGenerator};
pub use mask::{FillStrategy, FixedTokenSequence};
pub use processor::{FrameOptions, ProcessorConfig, ProcessorState, TextProcessor};
pub use sequence::{TokenSequence, TrimOptions};
pub use shapes::{GroupingStrategy, ShapeGroup, ShapeGroups};
pub use token::{Alignment, CombineOp, RegexToken, TokenKind};

#[cfg(test)]
mod tests;
