use anyhow::anyhow;
use sweep_core::record::BlobRunRecorder;
use sweep_core::review::strip_reasoning_preamble;

use super::context::Context;
use crate::cli::args::{GlobalArgs, RunsArgs, RunsSub};
use crate::exit_codes::SUCCESS;

pub(crate) async fn run(global: &GlobalArgs, args: RunsArgs) -> anyhow::Result<i32> {
    let ctx = Context::open(global)?;
    let recorder = BlobRunRecorder::new(ctx.blobs.clone());

    match args.cmd {
        RunsSub::List { json } => {
            let runs = recorder.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                eprintln!("no recorded runs");
            } else {
                for r in runs {
                    println!(
                        "{}  {}  {}  model={} tests={} cached={} errors={}",
                        r.id,
                        r.created_at.to_rfc3339(),
                        r.name,
                        r.model,
                        r.summary.total_tests,
                        r.summary.cached,
                        r.summary.errors
                    );
                }
            }
        }
        RunsSub::Show { id, strip_preamble } => {
            let mut run = recorder
                .load(&id)
                .await?
                .ok_or_else(|| anyhow!("run not found: {id}"))?;
            if strip_preamble {
                for r in run.results.iter_mut().flat_map(|p| p.results.iter_mut()) {
                    r.response = strip_reasoning_preamble(&r.response).to_string();
                }
            }
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        RunsSub::Delete { id } => {
            recorder.delete(&id).await?;
            eprintln!("run deleted: id={id}");
        }
    }
    Ok(SUCCESS)
}
