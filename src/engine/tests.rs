use proptest::prelude::*;

use super::*;

fn categories_and_text(generator: &RegexGenerator, text: &str) -> Vec<(TokenCategory, String)> {
    generator
        .generate_tokens(text)
        .map(|generated| {
            let (token, found) = generated.expect("token generated");
            (token.category().expect("catalog token"), found.text.to_string())
        })
        .collect()
}

#[test]
fn space_joined_words_collapse_into_one_phrase() {
    let generator = RegexGenerator::default();
    let tokens = generator
        .generate_tokens("foo bar  42")
        .collect::<Result<Vec<_>>>()
        .expect("tokens generated");

    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].0.category(), Some(TokenCategory::Phrase));
    assert_eq!((tokens[0].1.text, tokens[0].1.start, tokens[0].1.end), ("foo bar", 0, 7));
    assert_eq!(tokens[0].0.max_len, 7);
    assert_eq!(tokens[1].0.category(), Some(TokenCategory::HorizontalWhitespace));
    assert_eq!((tokens[1].0.min_len, tokens[1].0.max_len), (2, 2));
    assert_eq!(tokens[2].0.category(), Some(TokenCategory::Number));
    assert_eq!(tokens[2].1.text, "42");
}

#[test]
fn single_word_is_never_a_phrase() {
    let generator = RegexGenerator::default();
    assert_eq!(
        categories_and_text(&generator, "solo   42"),
        vec![
            (TokenCategory::Word, "solo".to_string()),
            (TokenCategory::HorizontalWhitespace, "   ".to_string()),
            (TokenCategory::Number, "42".to_string()),
        ]
    );
}

#[test]
fn phrase_releases_its_trailing_single_space() {
    let generator = RegexGenerator::default();
    // The final word still joins the open phrase at end of text, so this is
    // one phrase rather than `P-S-W`.
    assert_eq!(
        categories_and_text(&generator, "net amount due"),
        vec![(TokenCategory::Phrase, "net amount due".to_string())]
    );
    assert_eq!(
        categories_and_text(&generator, "net due 7"),
        vec![
            (TokenCategory::Phrase, "net due".to_string()),
            (TokenCategory::HorizontalWhitespace, " ".to_string()),
            (TokenCategory::Number, "7".to_string()),
        ]
    );
}

#[test]
fn phrase_detection_can_be_disabled() {
    let generator = RegexGenerator::default();
    let tokens = generator
        .generate_tokens_with("foo bar", false)
        .map(|generated| generated.expect("token generated").0.category())
        .collect::<Vec<_>>();
    assert_eq!(
        tokens,
        vec![
            Some(TokenCategory::Word),
            Some(TokenCategory::HorizontalWhitespace),
            Some(TokenCategory::Word),
        ]
    );
}

#[test]
fn generator_rejects_wide_phrase_tolerance() {
    let config = GeneratorConfig {
        phrase_space_tolerance: 2,
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        RegexGenerator::new(RegexDictionary::default(), config),
        Err(EngineError::Construction(_))
    ));
}

#[test]
fn uncovered_text_stops_generation_with_consistency_error() {
    let dictionary = RegexDictionary::with_tokens(vec![RegexToken::new(TokenCategory::Word)])
        .expect("dictionary builds");
    let generator = RegexGenerator::new(dictionary, GeneratorConfig::default()).expect("generator builds");

    let mut stream = generator.generate_tokens_with("alpha beta", false);
    assert!(matches!(stream.next(), Some(Ok(_))));
    assert!(matches!(stream.next(), Some(Err(EngineError::Consistency(_)))));
    assert!(stream.next().is_none());

    assert!(matches!(
        generator.generate_token_sequence_and_verify_regex("alpha beta"),
        Err(EngineError::Consistency(_))
    ));
}

#[test]
fn verified_sequence_is_full_line_anchored() {
    let generator = RegexGenerator::default();
    let sequence = generator
        .generate_token_sequence_and_verify_regex("  01/04/21   Book shop    12.00")
        .expect("sequence verifies");

    assert_eq!(sequence.fingerprint().unwrap(), "S-D2-S-P-S-N");
    assert_eq!(
        sequence.token_str(),
        "WSH{2}DY2{8}WSH{3}PHR{9}WSH{4}NUM{5}"
    );
    assert!(sequence.render().unwrap().starts_with('^'));
}

fn catalog_piece() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "12/04/2021",
        "12/04/21",
        "1,250.00",
        "42",
        "7",
        "INV42",
        "Balance",
        "Cr.",
    ])
}

proptest! {
    #[test]
    fn generated_regex_matches_its_source_line(
        lead in 0usize..3,
        pieces in prop::collection::vec((catalog_piece(), 0usize..4), 1..8),
    ) {
        let mut line = " ".repeat(lead);
        for (index, (piece, gap)) in pieces.iter().enumerate() {
            line.push_str(piece);
            let is_last = index + 1 == pieces.len();
            // pieces must stay separated to remain distinct tokens
            let gap = if is_last { *gap } else { (*gap).max(1) };
            line.push_str(&" ".repeat(gap));
        }

        let generator = RegexGenerator::default();
        let sequence = generator
            .generate_token_sequence_and_verify_regex(&line)
            .expect("generated regex matches");
        let regex = sequence.compile().expect("regex compiles");
        prop_assert!(regex.is_match(&line));
    }
}

const STATEMENT: &str = concat!(
    "  ACME LTD STATEMENT\n",
    "\n",
    "  01/04/21   Coffee        4.50\n",
    "  02/04/21   Book shop    12.00\n",
    "  03/04/21   Rent          900.00\n",
);

#[test]
fn exact_grouping_widens_representative_bounds() {
    let shapes = ShapeGroups::generate(STATEMENT, &RegexGenerator::default(), GroupingStrategy::Exact)
        .expect("shapes generated");

    let keys = shapes.iter().map(|group| group.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["S-P", "S-D2-S-W-S-N", "S-D2-S-P-S-N"]);

    let words = shapes.get("S-D2-S-W-S-N").expect("word rows grouped");
    assert_eq!(
        words.members.iter().map(|line| line.line_number).collect::<Vec<_>>(),
        vec![3, 5]
    );
    assert_eq!(
        words.representative.token_str(),
        "WSH{2}DY2{8}WSH{3}WRD{4,6}WSH{8,10}NUM{4,6}"
    );
    assert_eq!(
        words.representative.render().unwrap(),
        r"^[ ]{2}\d{2}/\d{2}/\d{2}[ ]{3}\S+[ ]{8,10}(?:\d[,.\d]*)?\d$"
    );

    let summaries = shapes.summaries(STATEMENT).expect("summaries computed");
    let words_summary = summaries
        .iter()
        .find(|summary| summary.key == "S-D2-S-W-S-N")
        .expect("summary present");
    assert_eq!(words_summary.member_count, 2);
    assert_eq!(words_summary.document_match_count, 2);
    assert_eq!(words_summary.first_line, 3);
}

#[test]
fn similar_grouping_merges_word_and_phrase_rows() {
    let shapes = ShapeGroups::generate(STATEMENT, &RegexGenerator::default(), GroupingStrategy::Similar)
        .expect("shapes generated");

    assert_eq!(shapes.len(), 2);
    let rows = shapes.get("S-D2-S-W-S-N").expect("rows grouped");
    assert_eq!(rows.members.len(), 3);
    assert_eq!(
        rows.representative.tokens[3].category(),
        Some(TokenCategory::PhraseOrWord)
    );
    assert_eq!(
        rows.representative.render().unwrap(),
        r"^[ ]{2}\d{2}/\d{2}/\d{2}[ ]{3}\S+(?:\s\S+)*[ ]{4,10}(?:\d[,.\d]*)?\d$"
    );

    let summaries = shapes.summaries(STATEMENT).expect("summaries computed");
    assert_eq!(summaries[1].document_match_count, 3);
}

#[test]
fn similar_grouping_opens_new_group_for_wider_padding_difference() {
    let shapes = ShapeGroups::generate(
        "alpha 12\nalpha 12 \t\n",
        &RegexGenerator::default(),
        GroupingStrategy::Similar,
    )
    .expect("grouping completes");

    let keys = shapes.iter().map(|group| group.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["W-S-N", "W-S-N-S-SA"]);
    assert_eq!(shapes.get("W-S-N").expect("bare rows").members.len(), 1);
}

#[test]
fn shape_grouping_is_idempotent() {
    let generator = RegexGenerator::default();
    for strategy in [GroupingStrategy::Exact, GroupingStrategy::Similar] {
        let first = ShapeGroups::generate(STATEMENT, &generator, strategy).expect("first run");
        let second = ShapeGroups::generate(STATEMENT, &generator, strategy).expect("second run");
        assert_eq!(first, second);
    }
}

#[test]
fn widening_makes_missing_trailing_padding_optional() {
    let generator = RegexGenerator::default();
    let padded = generator
        .generate_token_sequence_and_verify_regex("INV42   7  ")
        .expect("padded line");
    let bare = generator
        .generate_token_sequence_and_verify_regex("INV42   9")
        .expect("bare line");

    let mut group = ShapeGroup {
        key: padded.fingerprint().unwrap(),
        representative: padded.clone(),
        members: Vec::new(),
    };
    assert!(group.widen(&bare));
    assert_eq!(group.representative.tokens[3].min_len, 0);
    assert!(group.representative.compile().unwrap().is_match("INV42   9"));

    let mut mismatched = group.clone();
    let other = generator
        .generate_token_sequence_and_verify_regex("12/04/21   9")
        .expect("date line");
    assert!(!mismatched.widen(&other));
    assert_eq!(mismatched.representative, group.representative);
}

fn ledger_shape() -> TokenSequence {
    TokenSequence::from_tokens(
        true,
        vec![
            RegexToken::whitespace(1),
            RegexToken::new(TokenCategory::DateTwoDigitYear).named("Date"),
            RegexToken::new(TokenCategory::HorizontalWhitespace).with_bounds(2, 4),
            RegexToken::new(TokenCategory::Word).named("Description").multiline(),
            RegexToken::new(TokenCategory::HorizontalWhitespace).with_min_len(3),
            RegexToken::new(TokenCategory::Number).named("Amount"),
            RegexToken::new(TokenCategory::HorizontalWhitespace).with_bounds(0, 4),
        ],
    )
    .expect("ledger shape builds")
}

fn anchor(date: &str, description: &str, amount: &str) -> String {
    format!(" {date}  {description:<15}{amount:>6}")
}

fn continuation(text: &str) -> String {
    format!("{:11}{text}", "")
}

fn padded_config() -> ProcessorConfig {
    ProcessorConfig {
        pad_lines: true,
        ..ProcessorConfig::default()
    }
}

fn newline_frame() -> FrameOptions {
    FrameOptions {
        join_str: "\n".to_string(),
        trim: true,
        extended: false,
    }
}

fn process(lines: &[String], config: ProcessorConfig) -> TextProcessor {
    let mut processor = TextProcessor::new(ledger_shape(), config).expect("processor builds");
    processor.process(&lines.join("\n")).expect("document processed");
    processor
}

#[test]
fn multi_line_description_is_reassembled() {
    let lines = vec![
        anchor("01/04/21", "line1", "100.00"),
        continuation("line2"),
        continuation("line3"),
    ];
    let processor = process(&lines, padded_config());
    assert_eq!(processor.state(), ProcessorState::Done);

    let records = processor.frame_objects(&newline_frame()).expect("records built");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].names().collect::<Vec<_>>(),
        vec!["Date", "Description", "Amount"]
    );
    assert_eq!(records[0].get("Date"), Some("01/04/21"));
    assert_eq!(records[0].get("Description"), Some("line1\nline2\nline3"));
    assert_eq!(records[0].get("Amount"), Some("100.00"));
}

#[test]
fn rightward_continuation_drift_within_tolerance_is_recovered() {
    // Recovery only widens the multi-line column to the right; text that
    // starts left of the anchor's column is not recovered.
    let lines = vec![
        anchor("01/04/21", "line1", "100.00"),
        continuation("line2ab"),
    ];
    let processor = process(&lines, padded_config());

    let shadow_lines = &processor.matched_lines()[0].shadow_lines;
    assert_eq!(shadow_lines.len(), 1);
    assert_eq!(shadow_lines[0].adjustment, 2);
    assert_eq!(shadow_lines[0].groups[0].name, "Description");
    assert_eq!(shadow_lines[0].groups[0].text, "line2ab");
}

#[test]
fn leftward_continuation_drift_is_not_recovered() {
    let lines = vec![
        anchor("01/04/21", "line1", "100.00"),
        format!("{:10}line2", ""),
    ];
    let processor = process(&lines, padded_config());

    assert!(processor.matched_lines()[0].shadow_lines.is_empty());
}

#[test]
fn rightward_continuation_drift_beyond_tolerance_is_excluded() {
    let lines = vec![
        anchor("01/04/21", "line1", "100.00"),
        continuation("line2abc"),
    ];
    let config = ProcessorConfig {
        alignment_tolerance: 2,
        ..padded_config()
    };
    let processor = process(&lines, config);

    assert!(processor.matched_lines()[0].shadow_lines.is_empty());
    let records = processor.frame_objects(&newline_frame()).expect("records built");
    assert_eq!(records[0].get("Description"), Some("line1"));
}

#[test]
fn shift_wider_than_next_gap_is_fatal_only_in_strict_mode() {
    let lines = [
        anchor("01/04/21", "line1", "100.00"),
        format!("{:11}line2{:10}{:>6}", "", "", "9.99"),
    ];
    let text = lines.join("\n");

    let strict = ProcessorConfig {
        alignment_tolerance: 12,
        ..padded_config()
    };
    let mut processor = TextProcessor::new(ledger_shape(), strict).expect("processor builds");
    assert!(matches!(
        processor.process(&text),
        Err(EngineError::Consistency(_))
    ));

    let lenient = ProcessorConfig {
        strict_alignment: false,
        ..strict
    };
    let mut processor = TextProcessor::new(ledger_shape(), lenient).expect("processor builds");
    let matched = processor.process(&text).expect("lenient run completes");
    assert_eq!(matched.len(), 1);
    assert!(matched[0].shadow_lines.is_empty());
}

#[test]
fn blank_run_longer_than_tolerance_ends_the_record() {
    let kept = vec![
        anchor("01/04/21", "line1", "100.00"),
        String::new(),
        continuation("line2"),
    ];
    let processor = process(&kept, padded_config());
    assert_eq!(processor.matched_lines()[0].shadow_lines.len(), 1);

    let dropped = vec![
        anchor("01/04/21", "line1", "100.00"),
        String::new(),
        "   ".to_string(),
        continuation("line2"),
    ];
    let processor = process(&dropped, padded_config());
    assert!(processor.matched_lines()[0].shadow_lines.is_empty());
}

#[test]
fn every_anchor_starts_a_new_record() {
    let lines = vec![
        "PAGE 1".to_string(),
        anchor("01/04/21", "line1", "100.00"),
        continuation("line2"),
        anchor("02/04/21", "other", "7.00"),
        continuation("more"),
        "PAGE 2".to_string(),
    ];
    let processor = process(&lines, padded_config());

    let records = processor.frame_objects(&newline_frame()).expect("records built");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("Description"), Some("line1\nline2"));
    assert_eq!(records[1].get("Description"), Some("other\nmore"));
    assert_eq!(records[1].get("Amount"), Some("7.00"));
}

#[test]
fn absolute_offsets_include_line_start() {
    let lines = vec![
        "HEADER".to_string(),
        anchor("01/04/21", "line1", "100.00"),
        continuation("line2"),
    ];
    let processor = process(&lines, padded_config());

    let absolute = processor.matches_absolute().expect("offsets computed");
    let date = &absolute[0].groups[0];
    assert_eq!((date.name.as_str(), date.start, date.end), ("Date", 8, 16));

    let shadow = &absolute[0].shadow_lines[0];
    assert_eq!(shadow.line_number, 3);
    assert_eq!((shadow.groups[0].start, shadow.groups[0].end), (51, 56));
    assert_eq!(shadow.full_match.end, 56);

    let extended = FrameOptions {
        extended: true,
        ..newline_frame()
    };
    let records = processor.frame_objects(&extended).expect("records built");
    let description = records[0]
        .fields
        .iter()
        .find(|field| field.name == "Description")
        .expect("description field");
    assert_eq!(description.spans, vec![(18, 23), (51, 56)]);
}

#[test]
fn records_require_a_processed_document() {
    let processor = TextProcessor::new(ledger_shape(), ProcessorConfig::default()).expect("processor builds");
    assert_eq!(processor.state(), ProcessorState::New);
    assert!(matches!(
        processor.frame_objects(&FrameOptions::default()),
        Err(EngineError::Usage(_))
    ));
}

#[test]
fn statement_preset_follows_wrapped_narration() {
    let row = format!(
        " 01/04/21 {:<30}{:>16} 02/04/21{:>30}{:>20}{:>25}  ",
        "UPI-JOHN DOE-PAYMENT", "0000109876543210", "1,500.00", "", "25,000.00"
    );
    let wrapped = format!("{:10}REF 778812", "");
    let text = [row.as_str(), wrapped.as_str(), ""].join("\n");

    let mut processor = TextProcessor::new(presets::hdfc_statement().unwrap(), padded_config())
        .expect("processor builds");
    processor.process(&text).expect("statement processed");

    let frame = FrameOptions {
        join_str: " ".to_string(),
        trim: true,
        extended: false,
    };
    let records = processor.frame_objects(&frame).expect("records built");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("Description"),
        Some("UPI-JOHN DOE-PAYMENT REF 778812")
    );
    assert_eq!(records[0].get("Debit"), Some("1,500.00"));
    assert_eq!(records[0].get("Balance"), Some("25,000.00"));
}
