use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabregex::engine::GroupingStrategy;

#[derive(Parser, Debug)]
#[command(
    name = "tabregex",
    version,
    about = "Recover tables from fixed-width text with generated regex shapes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Tokenize(TokenizeArgs),
    Shapes(ShapesArgs),
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TokenizeArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_phrases: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    Exact,
    Similar,
}

impl StrategyArg {
    pub fn as_strategy(self) -> GroupingStrategy {
        match self {
            Self::Exact => GroupingStrategy::Exact,
            Self::Similar => GroupingStrategy::Similar,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ShapesArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = StrategyArg::Exact)]
    pub strategy: StrategyArg,

    #[arg(long, default_value_t = 1)]
    pub min_members: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PresetArg {
    HdfcStatement,
}

impl PresetArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HdfcStatement => "hdfc-statement",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, conflicts_with_all = ["preset", "shape_key"])]
    pub shape: Option<PathBuf>,

    #[arg(long, value_enum, conflicts_with = "shape_key")]
    pub preset: Option<PresetArg>,

    /// Fingerprint of a shape group found in the first input.
    #[arg(long)]
    pub shape_key: Option<String>,

    #[arg(long, value_enum, default_value_t = StrategyArg::Exact)]
    pub strategy: StrategyArg,

    #[arg(long = "multiline-field", requires = "shape_key")]
    pub multiline_fields: Vec<String>,

    #[arg(long)]
    pub join_str: Option<String>,

    #[arg(long, default_value_t = false)]
    pub shadow_trim: bool,

    #[arg(long, default_value_t = false)]
    pub extended: bool,

    #[arg(long)]
    pub alignment_tolerance: Option<i32>,

    #[arg(long)]
    pub whitespace_line_tolerance: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub pad_lines: bool,

    #[arg(long, default_value_t = false)]
    pub lenient_alignment: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, default_value_t = false)]
    pub with_matches: bool,

    #[arg(long, default_value = "out")]
    pub output_dir: PathBuf,
}
