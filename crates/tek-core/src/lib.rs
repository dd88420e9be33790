//! tek-core: traducción de steps de una task a snapshots encadenados.
//!
//! Piezas, de las hojas hacia arriba:
//! - `script`: materializa scripts inline como archivos ejecutables.
//! - `workspace`: resuelve workspaces declarados a bindings montables.
//! - `executor`: construye el contenedor perezoso de un step.
//! - `pipeline`: fold secuencial de steps sobre el source vigente.
//! - `export`: persiste el agregado final.
//!
//! `snapshot` provee el álgebra perezosa (`Directory`, `Container`) y el
//! evaluador `LocalEngine`; `event` el ledger append-only de cada run.
pub mod cancel;
pub mod constants;
pub mod errors;
pub mod event;
pub mod executor;
pub mod export;
pub mod hashing;
pub mod model;
pub mod pipeline;
pub mod script;
pub mod snapshot;
pub mod workspace;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use errors::{CoreEngineError, EngineError};
pub use event::{EventStore, FoldEvent, FoldEventKind, InMemoryEventStore};
pub use executor::{BuiltStep, StepExecutorBuilder};
pub use export::{ExportReport, Exporter};
pub use model::{AggregateOutput, ResolvedWorkspaceBinding, StepMode, StepResult, TaskSpec, TaskStep, WorkspaceDecl};
pub use pipeline::{FoldRun, FoldState, PipelineFolder};
pub use script::{MaterializedScript, ScriptMaterializer, SeededSuffix, SuffixSource, UuidSuffix};
pub use snapshot::{Container, Directory, ExecBackend, ExecRequest, FsTree, LocalEngine, SnapshotEngine, SnapshotId,
                   SourceFetcher};
pub use workspace::WorkspaceBindings;
