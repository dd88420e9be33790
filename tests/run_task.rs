
use std::time::Duration;

use tek_core::{cancel_pair, CancelSignal};
use tekflow::errors::AppError;
use tekflow::run::{describe_plan, execute, load_spec, plan, run_params, with_deadline};
use test_support::{config, engine, fixture};

fn source_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("main.go"), "package main\n").expect("main.go");
    dir
}

#[tokio::test]
async fn run_exports_chained_source() {
    let source = source_dir();
    let out = tempfile::tempdir().expect("out");
    let cfg = config(source.path(), &out.path().join("result"));
    let spec = load_spec(&fixture("stamp.yaml"),
                         &run_params(&["greeting=hi".to_string()], &[]).expect("params")).expect("spec");

    let summary = execute(engine(), spec, &cfg, CancelSignal::never()).await.expect("run");

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.events, vec!["I", "S", "F", "S", "F", "C", "E"]);
    assert!(summary.run_fingerprint.is_some());
    let exported = out.path().join("result/workspace/source");
    assert_eq!(std::fs::read_to_string(exported.join("stamp.txt")).expect("stamp"), "hi\ndone\n");
    assert!(exported.join("main.go").is_file());
}

#[tokio::test]
async fn missing_source_directory_is_an_evaluation_error() {
    let out = tempfile::tempdir().expect("out");
    let cfg = config(&out.path().join("nowhere"), &out.path().join("result"));
    let spec = load_spec(&fixture("stamp.yaml"), &run_params(&[], &[]).expect("params")).expect("spec");

    let err = execute(engine(), spec, &cfg, CancelSignal::never()).await.expect_err("no source");
    assert_eq!(err.exit_code(), 4);
    assert!(!out.path().join("result").exists());
}

#[test]
fn plan_is_reproducible_with_a_seed() {
    let source = source_dir();
    let cfg = config(source.path(), source.path());
    let spec = load_spec(&fixture("stamp.yaml"), &run_params(&[], &[]).expect("params")).expect("spec");

    let first = describe_plan(&spec, &plan(engine(), &spec, &cfg).expect("plan"));
    let second = describe_plan(&spec, &plan(engine(), &spec, &cfg).expect("plan"));
    assert_eq!(first, second);
    assert_eq!(first["steps"][0]["name"], "write");
    assert!(first["steps"][0]["script"].as_str().expect("script path").starts_with("/tekton/scripts/write-"));
}

#[test]
fn unknown_param_reference_fails_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("broken.yaml");
    std::fs::write(&file,
                   "apiVersion: tekton.dev/v1\nkind: Task\nmetadata:\n  name: broken\nspec:\n  steps:\n    - name: s\n      image: alpine\n      script: echo $(params.nope)\n")
        .expect("write");
    let err = load_spec(&file, &run_params(&[], &[]).expect("params")).expect_err("invalid");
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn unreadable_task_file_is_a_descriptor_error() {
    let err = load_spec(&fixture("missing.yaml"), &run_params(&[], &[]).expect("params")).expect_err("missing");
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn deadline_cancels_the_run() {
    let (handle, signal) = cancel_pair();
    let result: Result<(), AppError> =
        with_deadline(std::future::pending(), Some(Duration::from_millis(20)), &handle).await;
    assert!(matches!(result, Err(AppError::Timeout(_))));
    assert!(signal.is_cancelled());
}
