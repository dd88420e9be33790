//! `PipelineFolder`: ejecución secuencial de una task sobre snapshots.
//!
//! Por step: bindings con el source vigente → contenedor → evaluación forzada
//! de `/workspace/source` → ese snapshot pasa a ser el source del siguiente
//! step y reemplaza la entrada del agregado (last-write-wins).

use std::path::Path;

use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use super::{FoldRun, FoldState};
use crate::cancel::CancelSignal;
use crate::constants::{ENGINE_VERSION, SOURCE_ROOT, TRACKED_OUTPUT_PATHS};
use crate::errors::CoreEngineError;
use crate::event::{EventStore, FoldEvent, FoldEventKind, InMemoryEventStore};
use crate::executor::{BuiltStep, StepExecutorBuilder};
use crate::export::{ExportReport, Exporter};
use crate::hashing::hash_value;
use crate::model::{AggregateOutput, ResolvedWorkspaceBinding, StepResult, TaskSpec, TaskStep};
use crate::script::{SuffixSource, UuidSuffix};
use crate::snapshot::{Directory, SnapshotEngine, SnapshotId};
use crate::workspace::WorkspaceBindings;

pub struct PipelineFolder<E, V = InMemoryEventStore>
    where E: SnapshotEngine,
          V: EventStore
{
    engine: E,
    event_store: V,
    builder: StepExecutorBuilder<Box<dyn SuffixSource>>,
    cancel: CancelSignal,
}

impl<E: SnapshotEngine> PipelineFolder<E, InMemoryEventStore> {
    /// Folder con ledger en memoria, sufijos aleatorios y sin cancelación.
    pub fn new(engine: E) -> Self {
        Self::with_event_store(engine, InMemoryEventStore::default())
    }
}

impl<E, V> PipelineFolder<E, V>
    where E: SnapshotEngine,
          V: EventStore
{
    pub fn with_event_store(engine: E, event_store: V) -> Self {
        Self { engine,
               event_store,
               builder: StepExecutorBuilder::new(Box::new(UuidSuffix)),
               cancel: CancelSignal::never() }
    }

    /// Reemplaza la fuente de sufijos de los scripts.
    pub fn with_suffixes(mut self, suffixes: impl SuffixSource + 'static) -> Self {
        self.builder = StepExecutorBuilder::new(Box::new(suffixes));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn event_store(&self) -> &V {
        &self.event_store
    }

    pub fn events(&self, run_id: Uuid) -> Vec<FoldEvent> {
        self.event_store.list(run_id)
    }

    /// Códigos compactos de los eventos de un run (`I`, `S`, `F`, `X`, `C`, `E`).
    pub fn event_codes(&self, run_id: Uuid) -> Vec<&'static str> {
        self.events(run_id).iter().map(|e| e.kind.code()).collect()
    }

    /// Prepara un run sin evaluar nada.
    pub fn start(&self, task: TaskSpec, source: Directory) -> FoldRun {
        FoldRun::new(task, source)
    }

    /// Ejecuta una transición y devuelve el estado alcanzado.
    pub async fn advance(&mut self, run: &mut FoldRun) -> Result<FoldState, CoreEngineError> {
        match run.state {
            FoldState::Init => self.initialize(run).await?,
            FoldState::Step(index) => self.fold_step(run, index).await?,
            FoldState::Done => return Err(CoreEngineError::RunFinished),
            FoldState::Failed => {
                return Err(run.failure
                              .clone()
                              .unwrap_or_else(|| CoreEngineError::Internal("failed run without error".into())))
            }
        }
        Ok(run.state)
    }

    pub async fn run_to_completion(&mut self, run: &mut FoldRun) -> Result<AggregateOutput, CoreEngineError> {
        while !run.is_done() {
            self.advance(run).await?;
        }
        Ok(run.aggregate.clone())
    }

    /// `start` + `run_to_completion`.
    pub async fn run(&mut self, task: TaskSpec, source: Directory) -> Result<FoldRun, CoreEngineError> {
        let mut run = self.start(task, source);
        self.run_to_completion(&mut run).await?;
        Ok(run)
    }

    /// Persiste el agregado de un run terminado.
    pub async fn export(&mut self, run: &FoldRun, destination: &Path) -> Result<ExportReport, CoreEngineError> {
        if !run.is_done() {
            return Err(CoreEngineError::Internal(format!("run {} has not completed", run.run_id)));
        }
        let report = self.cancel
                         .guard(Exporter::new(&self.engine).export(&run.aggregate, destination))
                         .await??;
        self.event_store.append_kind(run.run_id,
                                     FoldEventKind::ExportFinished { destination: destination.display().to_string(),
                                                                     tracked_paths: report.tracked_paths.clone() });
        Ok(report)
    }

    /// Dry run: construye el contenedor de cada step encadenando el source
    /// perezoso del anterior. No evalúa nada ni registra eventos.
    pub fn plan(&mut self, task: &TaskSpec, source: Directory) -> Result<Vec<BuiltStep>, CoreEngineError> {
        let mut bindings = WorkspaceBindings::resolve_all(&task.workspaces, &source)?;
        let mut planned = Vec::with_capacity(task.steps.len());
        for step in &task.steps {
            let built = self.builder.build(step, &bindings.for_step())?;
            bindings.rebind_source(built.output());
            planned.push(built);
        }
        Ok(planned)
    }

    async fn force(&self, directory: &Directory) -> Result<SnapshotId, CoreEngineError> {
        Ok(self.cancel.guard(self.engine.resolve(directory)).await??)
    }

    async fn initialize(&mut self, run: &mut FoldRun) -> Result<(), CoreEngineError> {
        let initial = run.initial_source.clone();
        // colisiones antes de traer el source
        let mut bindings = match WorkspaceBindings::resolve_all(&run.task.workspaces, &initial) {
            Ok(b) => b,
            Err(e) => return Err(run.fail(e)),
        };
        let source = match self.force(&initial).await {
            Ok(id) => id,
            Err(e) => {
                warn!("run {}: initial source failed: {e}", run.run_id);
                return Err(run.fail(e));
            }
        };
        bindings.rebind_source(Directory::snapshot(source.clone()));

        let workspaces = bindings.for_step().into_iter().map(|b| b.name).collect();
        self.event_store.append_kind(run.run_id,
                                     FoldEventKind::RunInitialized { task_name: run.task.name.clone(),
                                                                     step_count: run.task.steps.len(),
                                                                     source: source.clone(),
                                                                     workspaces });
        info!("run {} initialized: task '{}' ({} steps) on source {}",
              run.run_id,
              run.task.name,
              run.task.steps.len(),
              source.short());

        run.aggregate = AggregateOutput::seeded(TRACKED_OUTPUT_PATHS, &source);
        run.source_snapshot = Some(source.clone());
        run.running_source = Some(source);
        run.bindings = Some(bindings);
        self.next_or_complete(run, 0);
        Ok(())
    }

    async fn fold_step(&mut self, run: &mut FoldRun, index: usize) -> Result<(), CoreEngineError> {
        let step = run.task
                      .steps
                      .get(index)
                      .cloned()
                      .ok_or_else(|| CoreEngineError::Internal(format!("step {index} out of range")))?;
        let prepared = run.running_source.clone().zip(run.bindings.as_ref().map(WorkspaceBindings::for_step));
        let Some((input, mounts)) = prepared else {
            return Err(run.fail(CoreEngineError::Internal("step advanced before init".into())));
        };
        let fingerprint = step_fingerprint(index, &step, &input, &mounts);

        self.event_store.append_kind(run.run_id,
                                     FoldEventKind::StepStarted { step_index: index,
                                                                  step_name: step.name.clone() });
        info!("step {index} '{}' started ({})", step.name, step.image);

        let outcome = match self.builder.build(&step, &mounts) {
            Ok(built) => self.force(&built.output()).await,
            Err(e) => Err(e),
        };
        let snapshot = match outcome {
            Ok(id) => id,
            Err(error) => {
                warn!("step {index} '{}' failed: {error}", step.name);
                self.event_store.append_kind(run.run_id,
                                             FoldEventKind::StepFailed { step_index: index,
                                                                         step_name: step.name.clone(),
                                                                         error: error.clone(),
                                                                         fingerprint });
                return Err(run.fail(error));
            }
        };

        run.running_source = Some(snapshot.clone());
        if let Some(bindings) = run.bindings.as_mut() {
            bindings.rebind_source(Directory::snapshot(snapshot.clone()));
        }
        run.aggregate.fold(SOURCE_ROOT, snapshot.clone());
        run.results.push(StepResult { step_index: index,
                                      step_name: step.name.clone(),
                                      snapshot: snapshot.clone() });
        run.step_fingerprints.push(fingerprint.clone());

        self.event_store.append_kind(run.run_id,
                                     FoldEventKind::StepFinished { step_index: index,
                                                                   step_name: step.name.clone(),
                                                                   snapshot: snapshot.clone(),
                                                                   fingerprint });
        info!("step {index} '{}' finished -> {}", step.name, snapshot.short());

        self.next_or_complete(run, index + 1);
        Ok(())
    }

    fn next_or_complete(&mut self, run: &mut FoldRun, next: usize) {
        if next < run.task.steps.len() {
            run.state = FoldState::Step(next);
            return;
        }
        let run_fingerprint = hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "task": run.task.name,
            "source": run.source_snapshot,
            "step_fingerprints": run.step_fingerprints,
        }));
        self.event_store.append_kind(run.run_id,
                                     FoldEventKind::RunCompleted { run_fingerprint: run_fingerprint.clone(),
                                                                   aggregate: run.aggregate.clone() });
        info!("run {} completed ({})", run.run_id, &run_fingerprint[..12]);
        run.run_fingerprint = Some(run_fingerprint);
        run.state = FoldState::Done;
    }
}

/// Fingerprint estable de un step: no incluye el nombre aleatorio del script.
fn step_fingerprint(index: usize, step: &TaskStep, input: &SnapshotId, mounts: &[ResolvedWorkspaceBinding]) -> String {
    let workspaces: Vec<_> = mounts.iter().map(|b| json!([b.name, b.mount_path])).collect();
    hash_value(&json!({
        "engine_version": ENGINE_VERSION,
        "step_index": index,
        "step": {
            "name": step.name,
            "image": step.image,
            "command": step.command,
            "args": step.args,
            "script": step.script,
        },
        "input": input,
        "workspaces": workspaces,
    }))
}
