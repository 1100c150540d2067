use super::args::*;
use crate::exit_codes::SUCCESS;

pub(crate) mod cache;
pub(crate) mod context;
pub(crate) mod review;
pub(crate) mod run;
pub(crate) mod runs;
pub(crate) mod seed;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::Run(args) => run::run(&global, args).await,
        Command::Seed(args) => seed::run(&global, args).await,
        Command::Runs(args) => runs::run(&global, args).await,
        Command::Rate(args) => review::rate(&global, args).await,
        Command::Stats(args) => review::stats(&global, args).await,
        Command::Export(args) => review::export(&global, args).await,
        Command::Cache(args) => cache::run(&global, args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
