use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod review;
pub mod run;
pub mod store;
pub use review::*;
pub use run::*;
pub use store::*;

#[derive(Parser)]
#[command(
    name = "sweep",
    version,
    about = "Batch-evaluate prompts against an LLM with a response cache and bounded fan-out"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Parser, Clone, Debug)]
pub struct GlobalArgs {
    /// Config file; when omitted, ./sweep.yaml is used if present
    #[arg(long, global = true, env = "SWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the local storage root from the config
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate every system prompt against every message
    Run(RunArgs),
    /// Pre-populate the cache from known answers
    Seed(SeedArgs),
    /// Inspect recorded runs
    Runs(RunsArgs),
    /// Rate one response of a recorded run (0-5)
    Rate(RateArgs),
    /// Rating statistics per prompt for a recorded run
    Stats(StatsArgs),
    /// Export a run's responses with their ratings, one row per message
    Export(ExportArgs),
    /// Response cache maintenance
    Cache(CacheArgs),
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "sweep",
            "--config",
            "x.yaml",
            "run",
            "--messages",
            "q.txt",
            "--prompts",
            "prompts/",
            "--parallel",
            "8",
            "--fail-on-errors",
        ])
        .unwrap();
        assert_eq!(cli.global.config, Some(PathBuf::from("x.yaml")));
        match cli.cmd {
            Command::Run(args) => {
                assert_eq!(args.parallel, Some(8));
                assert!(args.fail_on_errors);
                assert!(args.model.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_export_with_output_file() {
        let cli = Cli::try_parse_from(["sweep", "export", "run-1", "--out", "rows.json"]).unwrap();
        match cli.cmd {
            Command::Export(args) => {
                assert_eq!(args.run_id, "run-1");
                assert_eq!(args.out, Some(PathBuf::from("rows.json")));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn rate_requires_rating() {
        assert!(Cli::try_parse_from(["sweep", "rate", "run-1", "--test", "0", "--prompt", "p"]).is_err());
    }
}
