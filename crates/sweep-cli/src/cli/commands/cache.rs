use sweep_core::cache::CacheStore;

use super::context::Context;
use crate::cli::args::{CacheArgs, CacheSub, GlobalArgs};
use crate::exit_codes::SUCCESS;

pub(crate) async fn run(global: &GlobalArgs, args: CacheArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let cache = CacheStore::new(ctx.blobs.clone());
    match args.cmd {
        CacheSub::Stats => {
            let keys = cache.keys().await?;
            println!("backend={} entries={}", cache.backend_name(), keys.len());
        }
        CacheSub::Clear => {
            let removed = cache.clear().await?;
            eprintln!("cache cleared: removed={removed}");
        }
    }
    Ok(SUCCESS)
}
