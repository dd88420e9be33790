//! Tipos de evento del fold y estructura `FoldEvent`.
//!
//! Cada run de `PipelineFolder` emite eventos a un `EventStore` append-only:
//! `RunInitialized` primero, luego pares `StepStarted`/`StepFinished` (o un
//! `StepFailed` terminal), y `RunCompleted` al cerrar. `ExportFinished` se
//! agrega si el agregado se persiste.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreEngineError;
use crate::model::AggregateOutput;
use crate::snapshot::SnapshotId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FoldEventKind {
    /// Source inicial evaluado y bindings resueltos. Primer evento de un run.
    RunInitialized {
        task_name: String,
        step_count: usize,
        source: SnapshotId,
        workspaces: Vec<String>,
    },
    StepStarted { step_index: usize, step_name: String },
    /// El step terminó; `snapshot` es la raíz del source resultante.
    StepFinished {
        step_index: usize,
        step_name: String,
        snapshot: SnapshotId,
        fingerprint: String,
    },
    /// Error terminal: el run no continúa.
    StepFailed {
        step_index: usize,
        step_name: String,
        error: CoreEngineError,
        fingerprint: String,
    },
    /// Cierre con el agregado final y el fingerprint del run (hash de los
    /// fingerprints de step en orden).
    RunCompleted { run_fingerprint: String, aggregate: AggregateOutput },
    ExportFinished { destination: String, tracked_paths: Vec<String> },
}

impl FoldEventKind {
    /// Código compacto, útil en tests y logs.
    pub fn code(&self) -> &'static str {
        match self {
            FoldEventKind::RunInitialized { .. } => "I",
            FoldEventKind::StepStarted { .. } => "S",
            FoldEventKind::StepFinished { .. } => "F",
            FoldEventKind::StepFailed { .. } => "X",
            FoldEventKind::RunCompleted { .. } => "C",
            FoldEventKind::ExportFinished { .. } => "E",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldEvent {
    pub seq: u64, // orden de append dentro del run
    pub run_id: Uuid,
    pub kind: FoldEventKind,
    pub ts: DateTime<Utc>, // no entra en fingerprints
}
