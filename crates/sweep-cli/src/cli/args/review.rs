use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct RateArgs {
    pub run_id: String,

    /// 0-based message index within the run
    #[arg(long = "test")]
    pub test_idx: usize,

    /// System prompt name
    #[arg(long)]
    pub prompt: String,

    /// Defaults to the run's model
    #[arg(long)]
    pub model: Option<String>,

    /// 0 = not rated, 1 = poor ... 5 = excellent
    #[arg(long)]
    pub rating: u8,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Parser, Clone, Debug)]
pub struct StatsArgs {
    pub run_id: String,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ExportArgs {
    pub run_id: String,

    /// Write the JSON rows to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}
