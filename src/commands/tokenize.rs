use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tabregex::engine::{GeneratorConfig, RegexDictionary, RegexGenerator};
use tracing::info;

use crate::cli::TokenizeArgs;

#[derive(Debug, Serialize)]
struct TokenizedLine {
    line_number: usize,
    fingerprint: String,
    token_str: String,
    regex: String,
}

pub fn run(args: TokenizeArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let config = GeneratorConfig {
        detect_phrases: !args.no_phrases,
        ..GeneratorConfig::default()
    };
    let generator = RegexGenerator::new(RegexDictionary::default(), config)
        .context("failed to build regex generator")?;

    let lines = generator
        .line_sequences(&text)
        .with_context(|| format!("failed to tokenize {}", args.input.display()))?
        .into_iter()
        .map(|line| {
            Ok(TokenizedLine {
                line_number: line.line_number,
                fingerprint: line.sequence.fingerprint()?,
                token_str: line.sequence.token_str(),
                regex: line.sequence.render()?,
            })
        })
        .collect::<tabregex::engine::Result<Vec<_>>>()
        .context("failed to render generated sequences")?;

    info!(path = %args.input.display(), lines = lines.len(), "tokenized input");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &lines)
            .context("failed to serialize tokenize json output")?;
        writeln!(output)?;
    } else {
        for line in &lines {
            writeln!(
                output,
                "{:>5}\t{}\t{}",
                line.line_number, line.fingerprint, line.token_str
            )?;
        }
    }
    output.flush()?;

    Ok(())
}
