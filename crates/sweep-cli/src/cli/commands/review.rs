use anyhow::{anyhow, bail, Context as _};
use serde::Serialize;
use sweep_core::record::{BlobRunRecorder, RunRecord};
use sweep_core::review::{best_prompt_tally, export_rows, BestTally, ReviewStats, ReviewStore};

use super::context::Context;
use crate::cli::args::{ExportArgs, GlobalArgs, RateArgs, StatsArgs};
use crate::exit_codes::SUCCESS;

async fn load_run(ctx: &Context, id: &str) -> anyhow::Result<RunRecord> {
    BlobRunRecorder::new(ctx.blobs.clone())
        .load(id)
        .await?
        .ok_or_else(|| anyhow!("run not found: {id}"))
}

pub(crate) async fn rate(global: &GlobalArgs, args: RateArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let run = load_run(&ctx, &args.run_id).await?;

    let Some(prompt) = run.results.iter().find(|p| p.prompt_name == args.prompt) else {
        bail!("run {} has no prompt named {:?}", run.id, args.prompt);
    };
    if args.test_idx >= prompt.results.len() {
        bail!(
            "test index {} out of range (run has {} messages)",
            args.test_idx,
            prompt.results.len()
        );
    }

    let model = args.model.unwrap_or_else(|| run.model.clone());
    let annotation = ReviewStore::new(ctx.blobs.clone())
        .annotate(&run.id, args.test_idx, &args.prompt, &model, args.rating, args.notes)
        .await?;
    eprintln!(
        "rated: run={} test={} prompt={} model={} rating={}",
        run.id, args.test_idx, args.prompt, model, annotation.rating
    );
    Ok(SUCCESS)
}

#[derive(Serialize)]
struct PromptStats<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    stats: ReviewStats,
    best: BestTally,
}

pub(crate) async fn stats(global: &GlobalArgs, args: StatsArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let run = load_run(&ctx, &args.run_id).await?;
    let model = args.model.unwrap_or_else(|| run.model.clone());
    let book = ReviewStore::new(ctx.blobs.clone()).load(&run.id).await?;
    let tally = best_prompt_tally(&book, &model);

    let rows: Vec<PromptStats<'_>> = run
        .results
        .iter()
        .map(|p| PromptStats {
            prompt: &p.prompt_name,
            stats: ReviewStats::compute(&book, &p.prompt_name, &model, p.results.len()),
            best: tally.get(&p.prompt_name).copied().unwrap_or_default(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(SUCCESS);
    }
    println!("run={} model={}", run.id, model);
    for row in rows {
        let avg = row
            .stats
            .average
            .map_or_else(|| "n/a".to_string(), |a| format!("{a:.1}"));
        println!(
            "  {}: rated {}/{} avg={} excellent={} poor={} best={} tied={}",
            row.prompt,
            row.stats.rated,
            row.stats.total,
            avg,
            row.stats.excellent,
            row.stats.poor,
            row.best.sole,
            row.best.tied
        );
    }
    Ok(SUCCESS)
}

pub(crate) async fn export(global: &GlobalArgs, args: ExportArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let run = load_run(&ctx, &args.run_id).await?;
    let book = ReviewStore::new(ctx.blobs.clone()).load(&run.id).await?;
    let rows = export_rows(&run, &book);
    let body = serde_json::to_string_pretty(&rows)?;

    match args.out {
        Some(path) => {
            tokio::fs::write(&path, body + "\n")
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("exported: run={} rows={} file={}", run.id, rows.len(), path.display());
        }
        None => println!("{body}"),
    }
    Ok(SUCCESS)
}
