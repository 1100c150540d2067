use std::time::Duration;

use anyhow::Context as _;
use sweep_core::cache::CacheStore;
use sweep_core::engine::dataset::{load_messages, load_prompts};
use sweep_core::model::RunOutcome;
use sweep_core::record::{BlobRunRecorder, RunRecord, RunRecorder};
use sweep_core::report::logging_sink;
use sweep_core::Scheduler;

use super::context::Context;
use crate::cli::args::{GlobalArgs, RunArgs};
use crate::exit_codes::{ITEM_ERRORS, SUCCESS};

pub(crate) async fn run(global: &GlobalArgs, args: RunArgs) -> anyhow::Result<i32> {
    let mut ctx = Context::open(global)?;
    if let Some(p) = args.parallel {
        ctx.cfg.parallel = p.max(1);
    }
    if let Some(secs) = args.timeout_secs {
        ctx.cfg.run_timeout_secs = secs.max(1);
    }

    let messages = load_messages(&args.messages)?;
    let prompts = load_prompts(&args.prompts)?;
    let model = ctx.model(args.model.as_deref());

    let scheduler = Scheduler::from_config(&ctx.cfg, CacheStore::new(ctx.blobs.clone()), ctx.provider()?);
    let every = (messages.len() * prompts.len() / 10).max(1);
    let outcome = scheduler
        .run(&messages, &prompts, &model, Some(logging_sink(every)))
        .await?;

    if !args.no_record {
        let record = RunRecord::new(
            args.name.clone(),
            model.clone(),
            Some(args.messages.display().to_string()),
            outcome.clone(),
        );
        BlobRunRecorder::new(ctx.blobs.clone())
            .record(&record)
            .await
            .context("failed to record run")?;
        eprintln!("run recorded: id={}", record.id);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, ctx.cfg.run_timeout());
    }

    if args.fail_on_errors && outcome.summary.errors > 0 {
        return Ok(ITEM_ERRORS);
    }
    Ok(SUCCESS)
}

fn print_summary(outcome: &RunOutcome, timeout: Duration) {
    let s = &outcome.summary;
    println!(
        "prompts={} tests={} cached={} errors={}",
        s.total_prompts, s.total_tests, s.cached, s.errors
    );
    for pr in &outcome.results {
        let errors = pr.results.iter().filter(|r| r.is_error()).count();
        let cached = pr.results.iter().filter(|r| r.cached).count();
        println!(
            "  {}: {} ok, {} cached, {} failed",
            pr.prompt_name,
            pr.results.len() - errors,
            cached,
            errors
        );
    }
    if outcome.timed_out {
        eprintln!(
            "warning: run stopped at the {}s deadline; unfinished items are marked run_timeout",
            timeout.as_secs()
        );
    }
}
