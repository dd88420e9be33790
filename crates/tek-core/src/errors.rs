//! Errores específicos del core.
//!
//! `CoreEngineError` es el error de una ejecución del pipeline; `EngineError`
//! es el error que reporta el motor de snapshots al forzar una evaluación.
//! Ambos son `Clone + Serialize` porque se registran en el log de eventos.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("step '{step}' declares both a script and a command/args")]
    AmbiguousExecution { step: String },
    #[error("step '{step}' declares neither a script nor a command")]
    MissingExecution { step: String },
    #[error("step '{step}' has no image")]
    MissingImage { step: String },
    #[error("workspace '{0}' declared more than once")]
    DuplicateWorkspace(String),
    #[error("workspaces '{first}' and '{second}' both mount at '{path}'")]
    MountPathCollision { path: String, first: String, second: String },
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EngineError),
    #[error("export to '{destination}' failed: {reason}")]
    ExportFailed { destination: String, reason: String },
    #[error("export to '{destination}' was not ok")]
    ExportRejected { destination: String },
    #[error("run cancelled")]
    Cancelled,
    #[error("run already finished")]
    RunFinished,
    #[error("internal: {0}")]
    Internal(String),
}

/// Fallos del motor de snapshots (evaluación perezosa forzada).
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum EngineError {
    #[error("image '{image}' unavailable: {reason}")]
    ImageUnavailable { image: String, reason: String },
    #[error("exec {argv:?} exited with {code:?}: {stderr}")]
    ExecFailed { argv: Vec<String>, code: Option<i32>, stderr: String },
    #[error("container has no image")]
    MissingImage,
    #[error("source '{repository}' could not be retrieved: {reason}")]
    Source { repository: String, reason: String },
    #[error("unknown snapshot {0}")]
    UnknownSnapshot(String),
    #[error("io: {0}")]
    Io(String),
    #[error("backend: {0}")]
    Backend(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_wraps_into_evaluation() {
        let err: CoreEngineError = EngineError::MissingImage.into();
        assert_eq!(err.to_string(), "evaluation failed: container has no image");
    }

    #[test]
    fn io_error_keeps_message() {
        let err: EngineError = std::io::Error::other("disk gone").into();
        assert_eq!(err, EngineError::Io("disk gone".into()));
    }
}
