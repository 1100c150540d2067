use clap::{Parser, Subcommand};

#[derive(Parser, Clone, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub cmd: RunsSub,
}

#[derive(Subcommand, Clone, Debug)]
pub enum RunsSub {
    /// Recorded runs, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one run as JSON
    Show {
        id: String,
        /// Drop reasoning text up to a "Signature:" line from each response
        #[arg(long)]
        strip_preamble: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Parser, Clone, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub cmd: CacheSub,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheSub {
    /// Count cached responses
    Stats,
    /// Delete every cached response
    Clear,
}
