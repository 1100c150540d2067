//! Run and seed command arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// Messages: a .json array or one message per line
    #[arg(long)]
    pub messages: PathBuf,

    /// System prompts: a directory of .txt/.md files or a YAML list of {name, content}
    #[arg(long)]
    pub prompts: PathBuf,

    /// Model id (defaults to default_model from the config)
    #[arg(long)]
    pub model: Option<String>,

    /// Name recorded with the run
    #[arg(long, default_value = "run")]
    pub name: String,

    #[arg(long)]
    pub parallel: Option<usize>,

    /// Run-level deadline in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Exit 1 when any item failed
    #[arg(long)]
    pub fail_on_errors: bool,

    /// Skip writing the run record
    #[arg(long)]
    pub no_record: bool,

    /// Print the full outcome as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct SeedArgs {
    /// JSON/YAML list of {question, prompt, answer}
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub model: Option<String>,
}
