use super::catalog::TokenCategory;
use super::error::Result;
use super::sequence::TokenSequence;
use super::token::{Alignment, CombineOp, RegexToken};

/// Row shape of an HDFC bank statement exported to layout-preserved text.
///
/// Only one of `Debit` and `Credit` carries an amount on any row; the other
/// column holds a single blank.
pub fn hdfc_statement() -> Result<TokenSequence> {
    let blank = RegexToken::whitespace(1);
    let gap = |min_len: i32, max_len: i32| {
        RegexToken::new(TokenCategory::HorizontalWhitespace).with_bounds(min_len, max_len)
    };
    let amount_or_blank = |name: &str| {
        RegexToken::composite(
            vec![
                RegexToken::new(TokenCategory::Number).with_bounds(1, 20),
                blank.clone(),
            ],
            CombineOp::Or,
        )
        .named(name)
    };

    TokenSequence::from_tokens(
        true,
        vec![
            blank.clone(),
            RegexToken::new(TokenCategory::DateTwoDigitYear).named("TransactionDate"),
            RegexToken::new(TokenCategory::HorizontalWhitespace).with_max_len(1),
            RegexToken::new(TokenCategory::Phrase)
                .named("Description")
                .multiline()
                .aligned(Alignment::Left),
            gap(10, 90),
            RegexToken::new(TokenCategory::Word)
                .with_bounds(15, 16)
                .named("ReferenceNum"),
            RegexToken::new(TokenCategory::HorizontalWhitespace).with_max_len(1),
            RegexToken::new(TokenCategory::DateTwoDigitYear).named("ValueDate"),
            gap(20, 36),
            amount_or_blank("Debit"),
            gap(10, 27),
            amount_or_blank("Credit"),
            gap(15, 30),
            RegexToken::new(TokenCategory::Number)
                .with_bounds(1, 20)
                .named("Balance"),
            gap(0, 4),
        ],
    )
}
