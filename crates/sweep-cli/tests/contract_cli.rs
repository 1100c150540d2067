#![allow(deprecated)]
//! End-to-end contract for the `sweep` binary: exit codes, run recording,
//! cache reuse across invocations, and the review flow.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

fn workspace(provider_yaml: &str) -> TempDir {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    fs::write(
        dir.path().join("sweep.yaml"),
        format!(
            "version: 1\ndefault_model: test-model\nmax_retries: 1\nbase_backoff_ms: 1\nstorage:\n  backend: local\n  root: {}\nprovider:\n{}",
            store.display(),
            provider_yaml
        ),
    )
    .unwrap();
    fs::write(dir.path().join("messages.txt"), "What is Rust?\nName a crab.\n").unwrap();
    let prompts = dir.path().join("prompts");
    fs::create_dir(&prompts).unwrap();
    fs::write(prompts.join("plain.txt"), "{user_message}").unwrap();
    fs::write(prompts.join("pirate.md"), "Answer like a pirate. {user_message}").unwrap();
    dir
}

fn fake_workspace() -> TempDir {
    workspace("  kind: fake\n")
}

fn sweep(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sweep").unwrap();
    cmd.current_dir(dir)
        .env_remove("SWEEP_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

fn run_json(dir: &Path) -> Value {
    let out = sweep(dir)
        .args(["run", "--messages", "messages.txt", "--prompts", "prompts", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&out).expect("run --json must print JSON")
}

#[test]
fn test_second_run_is_served_from_cache() {
    let dir = fake_workspace();

    let first = run_json(dir.path());
    assert_eq!(first["summary"]["total_prompts"], 2);
    assert_eq!(first["summary"]["total_tests"], 4);
    assert_eq!(first["summary"]["cached"], 0);
    assert_eq!(first["results"][0]["prompt_name"], "pirate");
    assert_eq!(first["results"][1]["prompt_name"], "plain");
    assert_eq!(
        first["results"][1]["results"][0]["response"],
        "echo: What is Rust?"
    );

    let second = run_json(dir.path());
    assert_eq!(second["summary"]["cached"], 4);
    assert_eq!(second["summary"]["errors"], 0);

    let listing = sweep(dir.path())
        .args(["runs", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let runs: Value = serde_json::from_slice(&listing).unwrap();
    assert_eq!(runs.as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_dataset_exits_with_config_error() {
    let dir = fake_workspace();
    sweep(dir.path())
        .args(["run", "--messages", "nope.txt", "--prompts", "prompts"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dataset not found"));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = fake_workspace();
    sweep(dir.path())
        .args(["--config", "missing.yaml", "cache", "stats"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.yaml"));
}

#[test]
fn test_unknown_config_keys_are_rejected() {
    let dir = fake_workspace();
    fs::write(dir.path().join("bad.yaml"), "version: 1\nparalel: 3\n").unwrap();
    sweep(dir.path())
        .args(["--config", "bad.yaml", "cache", "stats"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("paralel"));
}

#[test]
fn test_missing_api_key_is_fatal() {
    let dir = workspace("  kind: anthropic\n  api_key_env: SWEEP_CONTRACT_KEY\n");
    sweep(dir.path())
        .env_remove("SWEEP_CONTRACT_KEY")
        .args(["run", "--messages", "messages.txt", "--prompts", "prompts"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SWEEP_CONTRACT_KEY"));
}

#[test]
fn test_item_errors_only_fail_the_process_when_asked() {
    // Nothing listens on the discard port, so every item fails with a network error.
    let dir = workspace(
        "  kind: anthropic\n  base_url: http://127.0.0.1:9\n  api_key_env: SWEEP_CONTRACT_KEY\n",
    );
    let args = ["run", "--messages", "messages.txt", "--prompts", "prompts", "--no-record"];

    sweep(dir.path())
        .env("SWEEP_CONTRACT_KEY", "sk-test")
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("errors=4"));

    sweep(dir.path())
        .env("SWEEP_CONTRACT_KEY", "sk-test")
        .args(args)
        .arg("--fail-on-errors")
        .assert()
        .code(1);
}

#[test]
fn test_seed_then_run_hits_cache() {
    let dir = fake_workspace();
    fs::write(
        dir.path().join("seed.json"),
        r#"[{"question": "What is Rust?", "prompt": "{user_message}", "answer": "A language."}]"#,
    )
    .unwrap();

    sweep(dir.path())
        .args(["seed", "--file", "seed.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("written=1"));

    let run = run_json(dir.path());
    assert_eq!(run["summary"]["cached"], 1);
    assert_eq!(run["results"][1]["results"][0]["response"], "A language.");
    assert_eq!(run["results"][1]["results"][0]["cached"], true);
}

#[test]
fn test_rate_and_stats_flow() {
    let dir = fake_workspace();
    run_json(dir.path());
    let listing = sweep(dir.path())
        .args(["runs", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let runs: Value = serde_json::from_slice(&listing).unwrap();
    let id = runs[0]["id"].as_str().unwrap().to_string();

    sweep(dir.path())
        .args(["rate", &id, "--test", "0", "--prompt", "pirate", "--rating", "5"])
        .assert()
        .success();
    sweep(dir.path())
        .args(["rate", &id, "--test", "0", "--prompt", "plain", "--rating", "2"])
        .assert()
        .success();
    sweep(dir.path())
        .args(["rate", &id, "--test", "1", "--prompt", "plain", "--rating", "7"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("out of range"));
    sweep(dir.path())
        .args(["rate", &id, "--test", "9", "--prompt", "plain", "--rating", "3"])
        .assert()
        .code(2);

    let out = sweep(dir.path())
        .args(["stats", &id, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stats: Value = serde_json::from_slice(&out).unwrap();
    let pirate = &stats[0];
    assert_eq!(pirate["prompt"], "pirate");
    assert_eq!(pirate["rated"], 1);
    assert_eq!(pirate["excellent"], 1);
    assert_eq!(pirate["best"]["sole"], 1);
    let plain = &stats[1];
    assert_eq!(plain["average"], 2.0);
    assert_eq!(plain["best"]["sole"], 0);
}

#[test]
fn test_export_joins_ratings_with_responses() {
    let dir = fake_workspace();
    run_json(dir.path());
    let listing = sweep(dir.path())
        .args(["runs", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let runs: Value = serde_json::from_slice(&listing).unwrap();
    let id = runs[0]["id"].as_str().unwrap().to_string();

    sweep(dir.path())
        .args([
            "rate", &id, "--test", "1", "--prompt", "plain", "--rating", "4", "--notes", "too literal",
        ])
        .assert()
        .success();

    let out = sweep(dir.path())
        .args(["export", &id])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["message"], "Name a crab.");
    assert_eq!(rows[1]["plain_test-model_response"], "echo: Name a crab.");
    assert_eq!(rows[1]["plain_test-model_rating"], 4);
    assert_eq!(rows[1]["plain_test-model_notes"], "too literal");
    assert_eq!(rows[0]["pirate_test-model_rating"], 0);

    sweep(dir.path())
        .args(["export", &id, "--out", "rows.json"])
        .assert()
        .success();
    let written: Value =
        serde_json::from_slice(&fs::read(dir.path().join("rows.json")).unwrap()).unwrap();
    assert_eq!(written, rows);

    sweep(dir.path())
        .args(["export", "no-such-run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("run not found"));
}

#[test]
fn test_cache_clear_empties_the_cache() {
    let dir = fake_workspace();
    run_json(dir.path());

    sweep(dir.path())
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries=4"));
    sweep(dir.path()).args(["cache", "clear"]).assert().success();
    sweep(dir.path())
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries=0"));
}
