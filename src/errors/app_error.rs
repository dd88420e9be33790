use std::time::Duration;

use tek_core::CoreEngineError;
use tek_descriptor::DescriptorError;
use thiserror::Error;

/// Errores de la aplicación, agrupados por categoría de código de salida.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Engine(#[from] CoreEngineError),
    #[error("run exceeded its {0:?} deadline")]
    Timeout(Duration),
    #[error("invalid argument: {0}")]
    Argument(String),
}

impl AppError {
    /// descriptor 2, validación 3, evaluación 4, export 5, resto 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Descriptor(DescriptorError::Io { .. } | DescriptorError::Yaml(_) | DescriptorError::UnsupportedKind { .. }) => 2,
            AppError::Descriptor(DescriptorError::Substitution { .. } | DescriptorError::Validation(_)) => 3,
            AppError::Engine(e) => match e {
                CoreEngineError::AmbiguousExecution { .. }
                | CoreEngineError::MissingExecution { .. }
                | CoreEngineError::MissingImage { .. }
                | CoreEngineError::DuplicateWorkspace(_)
                | CoreEngineError::MountPathCollision { .. } => 3,
                CoreEngineError::Evaluation(_) => 4,
                CoreEngineError::ExportFailed { .. } | CoreEngineError::ExportRejected { .. } => 5,
                CoreEngineError::Cancelled | CoreEngineError::RunFinished | CoreEngineError::Internal(_) => 1,
            },
            AppError::Argument(_) => 2,
            AppError::Timeout(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tek_core::EngineError;

    #[test]
    fn categories_map_to_exit_codes() {
        assert_eq!(AppError::from(DescriptorError::Yaml("x".into())).exit_code(), 2);
        assert_eq!(AppError::from(DescriptorError::Validation(vec![])).exit_code(), 3);
        assert_eq!(AppError::from(CoreEngineError::MountPathCollision { path: "/a".into(),
                                                                        first: "a".into(),
                                                                        second: "b".into() }).exit_code(),
                   3);
        assert_eq!(AppError::from(CoreEngineError::Evaluation(EngineError::MissingImage)).exit_code(), 4);
        assert_eq!(AppError::from(CoreEngineError::ExportRejected { destination: "d".into() }).exit_code(), 5);
        assert_eq!(AppError::from(CoreEngineError::Cancelled).exit_code(), 1);
        assert_eq!(AppError::Timeout(Duration::from_secs(1)).exit_code(), 1);
    }

    #[test]
    fn transparent_messages() {
        let err = AppError::from(CoreEngineError::ExportRejected { destination: "out".into() });
        assert_eq!(err.to_string(), "export to 'out' was not ok");
    }
}
