use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tabregex::engine::{
    FrameOptions, ProcessorConfig, RegexGenerator, ShapeDefinition, ShapeGroups, TextProcessor,
    TokenSequence, presets,
};
use tabregex::model::{ExtractPaths, ExtractRunManifest, SourceEntry};
use tabregex::util::{
    ensure_directory, load_text, now_utc_string, sha256_file, utc_compact_string,
    write_json_pretty, write_records_csv,
};
use tracing::{info, warn};

use crate::cli::{ExtractArgs, OutputFormat};

const FIELD_PREFIX: &str = "field";

struct ResolvedShape {
    source: String,
    sequence: TokenSequence,
    processor: ProcessorConfig,
    frame: FrameOptions,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let shape = resolve_shape(&args)?;
    let processor_config = apply_processor_overrides(shape.processor, &args);
    let frame = apply_frame_overrides(shape.frame.clone(), &args);
    let shape_regex = shape
        .sequence
        .render()
        .context("failed to render shape regex")?;

    info!(
        shape = %shape.source,
        regex = %shape_regex,
        inputs = args.inputs.len(),
        "starting extraction"
    );

    ensure_directory(&args.output_dir)?;
    let run_id = utc_compact_string(Utc::now());

    let mut sources = Vec::with_capacity(args.inputs.len());
    let mut warnings = Vec::new();
    let mut used_stems = HashSet::new();
    let mut record_total = 0usize;

    for input in &args.inputs {
        let Some(text) = load_text(input) else {
            warnings.push(format!("skipped unreadable input {}", input.display()));
            sources.push(skipped_entry(input, "unreadable"));
            continue;
        };

        let sha256 = match sha256_file(input) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!(path = %input.display(), error = %err, "failed to hash input");
                None
            }
        };

        let mut processor = TextProcessor::new(shape.sequence.clone(), processor_config)
            .context("failed to build text processor")?;
        let matched = processor
            .process(&text)
            .with_context(|| format!("failed to process {}", input.display()))?;
        let anchor_count = matched.len();
        let shadow_line_count = matched.iter().map(|record| record.shadow_lines.len()).sum();

        let records = processor
            .frame_objects(&frame)
            .with_context(|| format!("failed to build records for {}", input.display()))?;
        if records.is_empty() {
            warnings.push(format!("no records matched in {}", input.display()));
        }

        let stem = unique_stem(input, &mut used_stems);
        let records_path = args
            .output_dir
            .join(format!("{stem}.records.{}", args.format.extension()));
        match args.format {
            OutputFormat::Json => write_json_pretty(&records_path, &records)?,
            OutputFormat::Csv => write_records_csv(&records_path, &records)?,
        }

        let matches_path = if args.with_matches {
            let path = args.output_dir.join(format!("{stem}.matches.json"));
            let absolute = processor
                .matches_absolute()
                .with_context(|| format!("failed to compute offsets for {}", input.display()))?;
            write_json_pretty(&path, &absolute)?;
            Some(path.display().to_string())
        } else {
            None
        };

        info!(
            path = %input.display(),
            anchors = anchor_count,
            shadow_lines = shadow_line_count,
            records = records.len(),
            output = %records_path.display(),
            "extracted records"
        );

        record_total += records.len();
        sources.push(SourceEntry {
            path: input.display().to_string(),
            sha256,
            status: "processed".to_string(),
            line_count: processor.lines().len(),
            anchor_count,
            shadow_line_count,
            record_count: records.len(),
            records_path: Some(records_path.display().to_string()),
            matches_path,
        });
    }

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        shape_regex,
        paths: ExtractPaths {
            output_dir: args.output_dir.display().to_string(),
            shape_source: shape.source,
        },
        sources,
        record_total,
        warnings,
    };

    let manifest_path = args.output_dir.join("extract_manifest.json");
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        path = %manifest_path.display(),
        records = manifest.record_total,
        warnings = manifest.warnings.len(),
        "extraction completed"
    );

    Ok(())
}

fn resolve_shape(args: &ExtractArgs) -> Result<ResolvedShape> {
    if let Some(path) = &args.shape {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let definition = ShapeDefinition::from_json(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let sequence = definition
            .sequence()
            .with_context(|| format!("invalid shape in {}", path.display()))?;
        return Ok(ResolvedShape {
            source: path.display().to_string(),
            sequence,
            processor: definition.processor,
            frame: definition.frame,
        });
    }

    if let Some(preset) = args.preset {
        return Ok(ResolvedShape {
            source: format!("preset:{}", preset.as_str()),
            sequence: presets::hdfc_statement().context("failed to build preset shape")?,
            processor: ProcessorConfig::default(),
            frame: FrameOptions::default(),
        });
    }

    if let Some(key) = &args.shape_key {
        return shape_from_key(args, key);
    }

    bail!("one of --shape, --preset or --shape-key is required")
}

fn shape_from_key(args: &ExtractArgs, key: &str) -> Result<ResolvedShape> {
    let Some(first) = args.inputs.first() else {
        bail!("--shape-key needs at least one --input");
    };
    let text = fs::read_to_string(first)
        .with_context(|| format!("failed to read {}", first.display()))?;

    let shapes = ShapeGroups::generate(&text, &RegexGenerator::default(), args.strategy.as_strategy())
        .with_context(|| format!("failed to group line shapes of {}", first.display()))?;
    let Some(group) = shapes.get(key) else {
        let known = shapes.iter().map(|group| group.key.as_str()).collect::<Vec<_>>();
        bail!(
            "no shape group '{key}' in {}; known keys: {}",
            first.display(),
            known.join(", ")
        );
    };

    let mut sequence = group.capturing_sequence(FIELD_PREFIX);
    for name in &args.multiline_fields {
        if !sequence.set_multiline(name, true) {
            bail!("shape '{key}' has no field named '{name}'");
        }
    }

    Ok(ResolvedShape {
        source: format!("shape-key:{key}@{}", first.display()),
        sequence,
        processor: ProcessorConfig::default(),
        frame: FrameOptions::default(),
    })
}

fn apply_processor_overrides(mut config: ProcessorConfig, args: &ExtractArgs) -> ProcessorConfig {
    if let Some(tolerance) = args.alignment_tolerance {
        config.alignment_tolerance = tolerance;
    }
    if let Some(tolerance) = args.whitespace_line_tolerance {
        config.whitespace_line_tolerance = tolerance;
    }
    if args.pad_lines {
        config.pad_lines = true;
    }
    if args.lenient_alignment {
        config.strict_alignment = false;
    }
    config
}

fn apply_frame_overrides(mut frame: FrameOptions, args: &ExtractArgs) -> FrameOptions {
    if let Some(join_str) = &args.join_str {
        frame.join_str = join_str.clone();
    }
    if args.shadow_trim {
        frame.trim = true;
    }
    if args.extended {
        frame.extended = true;
    }
    frame
}

fn skipped_entry(input: &Path, status: &str) -> SourceEntry {
    SourceEntry {
        path: input.display().to_string(),
        sha256: None,
        status: status.to_string(),
        line_count: 0,
        anchor_count: 0,
        shadow_line_count: 0,
        record_count: 0,
        records_path: None,
        matches_path: None,
    }
}

fn unique_stem(input: &Path, used: &mut HashSet<String>) -> String {
    let base = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "input".to_string());

    let mut stem = base.clone();
    let mut suffix = 2;
    while !used.insert(stem.clone()) {
        stem = format!("{base}-{suffix}");
        suffix += 1;
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StrategyArg;

    fn args(inputs: Vec<PathBuf>) -> ExtractArgs {
        ExtractArgs {
            inputs,
            shape: None,
            preset: None,
            shape_key: None,
            strategy: StrategyArg::Exact,
            multiline_fields: Vec::new(),
            join_str: None,
            shadow_trim: false,
            extended: false,
            alignment_tolerance: None,
            whitespace_line_tolerance: None,
            pad_lines: false,
            lenient_alignment: false,
            format: OutputFormat::Json,
            with_matches: false,
            output_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn cli_flags_override_definition_settings() {
        let mut args = args(Vec::new());
        args.alignment_tolerance = Some(2);
        args.lenient_alignment = true;
        args.join_str = Some(" ".to_string());
        args.shadow_trim = true;

        let config = apply_processor_overrides(ProcessorConfig::default(), &args);
        assert_eq!(config.alignment_tolerance, 2);
        assert_eq!(config.whitespace_line_tolerance, 1);
        assert!(!config.strict_alignment);

        let frame = apply_frame_overrides(FrameOptions::default(), &args);
        assert_eq!(frame.join_str, " ");
        assert!(frame.trim);
        assert!(!frame.extended);
    }

    #[test]
    fn shape_key_marks_requested_fields_multiline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ledger.txt");
        fs::write(&input, "  01/04/21   Coffee        4.50\n  03/04/21   Rent          900.00\n")
            .expect("write input");

        let mut args = args(vec![input]);
        args.shape_key = Some("S-D2-S-W-S-N".to_string());
        args.multiline_fields = vec!["field_2".to_string()];

        let shape = resolve_shape(&args).expect("shape resolved");
        let description = shape.sequence.token_by_name("field_2").expect("field_2");
        assert!(description.is_multiline);
        assert!(shape.sequence.token_by_name("field_1").is_some());

        args.multiline_fields = vec!["field_9".to_string()];
        assert!(resolve_shape(&args).is_err());
    }

    #[test]
    fn extraction_writes_records_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("statement.txt");
        let row = format!(
            " 01/04/21 {:<30}{:>16} 02/04/21{:>30}{:>20}{:>25}  ",
            "UPI-JOHN DOE-PAYMENT", "0000109876543210", "1,500.00", "", "25,000.00"
        );
        fs::write(&input, format!("{row}\n{:10}REF 778812\n", "")).expect("write input");

        let mut args = args(vec![input, dir.path().join("missing.txt")]);
        args.preset = Some(crate::cli::PresetArg::HdfcStatement);
        args.pad_lines = true;
        args.shadow_trim = true;
        args.join_str = Some(" ".to_string());
        args.format = OutputFormat::Csv;
        args.with_matches = true;
        args.output_dir = dir.path().join("out");

        run(args).expect("extraction succeeds");

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("out").join("extract_manifest.json")).expect("manifest"),
        )
        .expect("manifest json");
        assert_eq!(manifest["record_total"], 1);
        assert_eq!(manifest["sources"][0]["status"], "processed");
        assert_eq!(manifest["sources"][0]["shadow_line_count"], 1);
        assert_eq!(manifest["sources"][1]["status"], "unreadable");

        let csv = fs::read_to_string(dir.path().join("out").join("statement.records.csv")).expect("csv");
        assert!(csv.contains("UPI-JOHN DOE-PAYMENT REF 778812"));
        assert!(dir.path().join("out").join("statement.matches.json").exists());
    }
}
