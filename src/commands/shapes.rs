use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use tabregex::engine::{RegexGenerator, ShapeGroups};
use tabregex::model::ShapeSummary;
use tabregex::util::write_json_pretty;
use tracing::info;

use crate::cli::ShapesArgs;

pub fn run(args: ShapesArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let strategy = args.strategy.as_strategy();
    let shapes = ShapeGroups::generate(&text, &RegexGenerator::default(), strategy)
        .with_context(|| format!("failed to group line shapes of {}", args.input.display()))?;

    let summaries = shapes
        .summaries(&text)
        .context("failed to summarize shape groups")?
        .into_iter()
        .filter(|summary| summary.member_count >= args.min_members)
        .collect::<Vec<_>>();

    info!(
        path = %args.input.display(),
        groups = shapes.len(),
        reported = summaries.len(),
        "shape grouping complete"
    );

    if let Some(path) = &args.output {
        write_json_pretty(path, &summaries)?;
        info!(path = %path.display(), "wrote shape summaries");
    }

    if args.json {
        write_json_response(&summaries)
    } else {
        write_text_response(&summaries)
    }
}

fn write_json_response(summaries: &[ShapeSummary]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, summaries)
        .context("failed to serialize shapes json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(summaries: &[ShapeSummary]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Shapes: {}", summaries.len())?;
    for summary in summaries {
        writeln!(
            output,
            "{:<30}[{:>3}] matches={:<4} first_line={}",
            summary.key, summary.member_count, summary.document_match_count, summary.first_line
        )?;
        writeln!(output, "\ttokens={}", summary.token_str)?;
        writeln!(output, "\tregex={}", summary.regex)?;
    }

    output.flush()?;
    Ok(())
}
