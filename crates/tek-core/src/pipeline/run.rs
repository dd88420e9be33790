//! Estado de un run del fold.

use uuid::Uuid;

use crate::errors::CoreEngineError;
use crate::model::{AggregateOutput, StepResult, TaskSpec};
use crate::snapshot::{Directory, SnapshotId};
use crate::workspace::WorkspaceBindings;

/// `Init -> Step(n) -> Done`. Un error en cualquier transición deja el run en
/// `Failed`; no hay reintentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldState {
    Init,
    /// Próximo step a ejecutar.
    Step(usize),
    Done,
    Failed,
}

/// Acumulador de un run: source vigente, bindings, agregado y resultados.
#[derive(Debug, Clone)]
pub struct FoldRun {
    pub(crate) run_id: Uuid,
    pub(crate) task: TaskSpec,
    pub(crate) initial_source: Directory,
    pub(crate) state: FoldState,
    pub(crate) source_snapshot: Option<SnapshotId>,
    pub(crate) running_source: Option<SnapshotId>,
    pub(crate) bindings: Option<WorkspaceBindings>,
    pub(crate) aggregate: AggregateOutput,
    pub(crate) results: Vec<StepResult>,
    pub(crate) step_fingerprints: Vec<String>,
    pub(crate) run_fingerprint: Option<String>,
    pub(crate) failure: Option<CoreEngineError>,
}

impl FoldRun {
    pub fn new(task: TaskSpec, initial_source: Directory) -> Self {
        Self { run_id: Uuid::new_v4(),
               task,
               initial_source,
               state: FoldState::Init,
               source_snapshot: None,
               running_source: None,
               bindings: None,
               aggregate: AggregateOutput::new(),
               results: Vec::new(),
               step_fingerprints: Vec::new(),
               run_fingerprint: None,
               failure: None }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }

    pub fn state(&self) -> FoldState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == FoldState::Done
    }

    /// Snapshot del source inicial, disponible tras `Init`.
    pub fn source_snapshot(&self) -> Option<&SnapshotId> {
        self.source_snapshot.as_ref()
    }

    /// Snapshot que verá el próximo step en `/workspace/source`.
    pub fn running_source(&self) -> Option<&SnapshotId> {
        self.running_source.as_ref()
    }

    pub fn bindings(&self) -> Option<&WorkspaceBindings> {
        self.bindings.as_ref()
    }

    pub fn aggregate(&self) -> &AggregateOutput {
        &self.aggregate
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn run_fingerprint(&self) -> Option<&str> {
        self.run_fingerprint.as_deref()
    }

    pub fn failure(&self) -> Option<&CoreEngineError> {
        self.failure.as_ref()
    }

    pub(crate) fn fail(&mut self, error: CoreEngineError) -> CoreEngineError {
        self.state = FoldState::Failed;
        self.failure = Some(error.clone());
        error
    }
}
