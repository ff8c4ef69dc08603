use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pics",
    version,
    about = "Decide which conformance tests apply to a device from its PICS declarations"
)]
pub struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate every test case of a filter request
    Filter(FilterArgs),
    /// Evaluate a single applicability expression
    Eval(EvalArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Filter request JSON (`pics_items` plus `spec_data` or `specification_id`)
    #[arg(long)]
    pub request: PathBuf,

    /// SQLite condition store for `specification_id` requests
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// YAML engine config
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub parser_url: Option<String>,

    /// Unique expressions per fallback batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Include evaluation steps in text output
    #[arg(long)]
    pub explain: bool,

    /// Exit 1 when no test case is applicable
    #[arg(long)]
    pub fail_on_empty: bool,
}

#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// Expression text, e.g. "IF A.1 AND NOT A.2 THEN M ELSE N/A"
    #[arg(long)]
    pub expr: String,

    /// PICS JSON: item list, `{"pics_items": [...]}` or an id to value object
    #[arg(long)]
    pub pics: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub parser_url: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
