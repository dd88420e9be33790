
use tek_core::constants::SOURCE_ROOT;
use tek_core::{CoreEngineError, Directory, FoldEventKind, FoldState, PipelineFolder, SeededSuffix, SnapshotEngine,
               TaskSpec, TaskStep, WorkspaceDecl};
use test_support::demo_engine;

fn script_step(name: &str, script: &str) -> TaskStep {
    TaskStep { name: name.into(),
               image: "alpine:3.20".into(),
               script: script.into(),
               ..Default::default() }
}

fn task(steps: Vec<TaskStep>) -> TaskSpec {
    TaskSpec { name: "build".into(),
               steps,
               workspaces: vec![WorkspaceDecl::new("source")] }
}

#[tokio::test]
async fn zero_steps_aggregate_is_initial_source() {
    let mut folder = PipelineFolder::new(demo_engine());
    let run = folder.run(task(vec![]), Directory::source("demo", "main")).await.expect("run");

    let initial = run.source_snapshot().cloned().expect("initialized");
    assert_eq!(run.aggregate().get(SOURCE_ROOT), Some(&initial));
    assert_eq!(folder.event_codes(run.run_id()), vec!["I", "C"]);
    assert!(folder.engine().backend().calls().is_empty());
}

#[tokio::test]
async fn script_step_runs_materialized_file() {
    let mut folder = PipelineFolder::new(demo_engine()).with_suffixes(SeededSuffix::new(3));
    let run = folder.run(task(vec![script_step("greet", "echo hi > greeting.txt")]),
                         Directory::source("demo", "main"))
                    .await
                    .expect("run");

    let calls = folder.engine().backend().calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.workdir, "/workspace/source");
    assert_eq!(call.script.as_deref(), Some("#!/bin/sh\nset -e\necho hi > greeting.txt"));
    assert!(call.argv[0].starts_with("/tekton/scripts/greet-"));
    assert_eq!(call.rootfs.get(&call.argv[0]).map(|e| e.permissions), Some(0o755));
    assert!(call.rootfs.contains("workspace/source/main.go"));

    let out = folder.engine()
                    .tree(run.aggregate().get(SOURCE_ROOT).expect("tracked"))
                    .expect("interned");
    assert_eq!(out.paths(), vec!["go.mod", "greeting.txt", "main.go"]);
}

#[tokio::test]
async fn second_step_sees_first_step_output() {
    let mut folder = PipelineFolder::new(demo_engine());
    let steps = vec![script_step("write", "echo alpha > a.txt"), script_step("read", "cat a.txt > b.txt")];
    let run = folder.run(task(steps), Directory::source("demo", "main")).await.expect("run");

    let calls = folder.engine().backend().calls();
    assert!(calls[1].rootfs.contains("workspace/source/a.txt"));

    let results = run.results();
    assert_eq!(results.len(), 2);
    let first = folder.engine().tree(&results[0].snapshot).expect("step 0");
    let last = folder.engine().tree(&results[1].snapshot).expect("step 1");
    assert!(first.contains("a.txt") && !first.contains("b.txt"));
    assert_eq!(last.get("b.txt").map(|e| e.contents.clone()), Some(b"alpha\n".to_vec()));
    assert!(last.contains("a.txt"));
    assert_eq!(run.aggregate().get(SOURCE_ROOT), Some(&results[1].snapshot));
    assert_eq!(run.running_source(), Some(&results[1].snapshot));
}

#[tokio::test]
async fn command_mode_execs_argv_verbatim() {
    let mut folder = PipelineFolder::new(demo_engine());
    let step = TaskStep { name: "noop".into(),
                          image: "golang:1.22".into(),
                          command: vec!["echo".into()],
                          args: vec!["$(params.packages)".into()],
                          ..Default::default() };
    folder.run(task(vec![step]), Directory::source("demo", "main")).await.expect("run");

    let calls = folder.engine().backend().calls();
    assert_eq!(calls[0].argv, vec!["echo", "$(params.packages)"]);
    assert!(calls[0].script.is_none());
}

#[tokio::test]
async fn step_by_step_advances_through_states() {
    let mut folder = PipelineFolder::new(demo_engine());
    let mut run = folder.start(task(vec![script_step("one", "touch one"), script_step("two", "touch two")]),
                               Directory::source("demo", "main"));
    assert_eq!(run.state(), FoldState::Init);
    assert_eq!(folder.advance(&mut run).await, Ok(FoldState::Step(0)));
    assert_eq!(folder.advance(&mut run).await, Ok(FoldState::Step(1)));
    assert_eq!(folder.advance(&mut run).await, Ok(FoldState::Done));
    assert_eq!(folder.advance(&mut run).await, Err(CoreEngineError::RunFinished));
    assert_eq!(folder.event_codes(run.run_id()), vec!["I", "S", "F", "S", "F", "C"]);
    assert!(run.run_fingerprint().is_some());
}

#[tokio::test]
async fn failing_step_aborts_the_run() {
    let mut folder = PipelineFolder::new(demo_engine());
    let steps = vec![script_step("broken", "cat missing.txt"), script_step("never", "touch x")];
    let mut run = folder.start(task(steps), Directory::source("demo", "main"));
    let err = folder.run_to_completion(&mut run).await.expect_err("must fail");

    assert!(matches!(&err, CoreEngineError::Evaluation(tek_core::EngineError::ExecFailed { code: Some(1), .. })));
    assert_eq!(run.state(), FoldState::Failed);
    assert_eq!(folder.advance(&mut run).await, Err(err.clone()));
    assert_eq!(folder.engine().backend().calls().len(), 1);

    let events = folder.events(run.run_id());
    assert_eq!(events.iter().map(|e| e.kind.code()).collect::<Vec<_>>(), vec!["I", "S", "X"]);
    assert!(matches!(&events[2].kind, FoldEventKind::StepFailed { step_index: 0, error, .. } if *error == err));
}

#[tokio::test]
async fn invalid_step_shape_fails_at_that_step() {
    let mut folder = PipelineFolder::new(demo_engine());
    let ambiguous = TaskStep { command: vec!["sh".into()], ..script_step("both", "echo") };
    let err = folder.run(task(vec![script_step("ok", "touch ok"), ambiguous]), Directory::source("demo", "main"))
                    .await
                    .expect_err("ambiguous");
    assert_eq!(err, CoreEngineError::AmbiguousExecution { step: "both".into() });
    assert_eq!(folder.engine().backend().calls().len(), 1);
}

#[tokio::test]
async fn unknown_source_fails_init() {
    let mut folder = PipelineFolder::new(demo_engine());
    let err = folder.run(task(vec![script_step("x", "touch x")]), Directory::source("demo", "nope"))
                    .await
                    .expect_err("missing branch");
    assert!(matches!(err, CoreEngineError::Evaluation(tek_core::EngineError::Source { .. })));
}

#[tokio::test]
async fn run_fingerprint_ignores_script_suffixes() {
    let steps = vec![script_step("write", "echo alpha > a.txt")];
    let mut a = PipelineFolder::new(demo_engine()).with_suffixes(SeededSuffix::new(1));
    let mut b = PipelineFolder::new(demo_engine()).with_suffixes(SeededSuffix::new(2));
    let ra = a.run(task(steps.clone()), Directory::source("demo", "main")).await.expect("a");
    let rb = b.run(task(steps), Directory::source("demo", "main")).await.expect("b");

    assert_ne!(a.engine().backend().calls()[0].argv, b.engine().backend().calls()[0].argv);
    assert_eq!(ra.results()[0].snapshot, rb.results()[0].snapshot);
    assert_eq!(ra.run_fingerprint(), rb.run_fingerprint());
}

#[tokio::test]
async fn equal_trees_resolve_to_equal_ids() {
    let engine = demo_engine();
    let a = engine.resolve(&Directory::source("demo", "main")).await.expect("a");
    let b = engine.resolve(&Directory::empty().with_directory("", Directory::source("demo", "main")))
                  .await
                  .expect("b");
    assert_eq!(a, b);
}
