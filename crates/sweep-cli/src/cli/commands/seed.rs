use sweep_core::cache::CacheStore;
use sweep_core::engine::dataset::load_seed_triples;

use super::context::Context;
use crate::cli::args::{GlobalArgs, SeedArgs};
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub(crate) async fn run(global: &GlobalArgs, args: SeedArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let triples = load_seed_triples(&args.file)?;
    let model = ctx.model(args.model.as_deref());

    let report = CacheStore::new(ctx.blobs.clone()).seed(&model, &triples).await;
    println!("seeded: written={} failed={}", report.written, report.failed);
    if report.written == 0 && report.failed > 0 {
        return Ok(CONFIG_ERROR);
    }
    Ok(SUCCESS)
}
