//! Persistencia del agregado final.
//!
//! El engine reporta el export con una señal doble (`Ok(bool)` o error); aquí
//! se normaliza a un único `Result`:
//! - `Ok(true)`  → `ExportReport`
//! - `Ok(false)` → `CoreEngineError::ExportRejected`
//! - `Err(e)`    → `CoreEngineError::ExportFailed`

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::CoreEngineError;
use crate::model::AggregateOutput;
use crate::snapshot::SnapshotEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub destination: PathBuf,
    /// Rutas rastreadas escritas, relativas al destino.
    pub tracked_paths: Vec<String>,
}

pub struct Exporter<'a, E: SnapshotEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: SnapshotEngine + ?Sized> Exporter<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Escribe el agregado bajo `destination` (p.ej. `<dest>/workspace/source/...`).
    pub async fn export(&self, aggregate: &AggregateOutput, destination: &Path) -> Result<ExportReport, CoreEngineError> {
        let shown = destination.display().to_string();
        match self.engine.export(&aggregate.to_directory(), destination).await {
            Ok(true) => {
                info!("aggregate exported to {shown}");
                Ok(ExportReport { destination: destination.to_path_buf(),
                                  tracked_paths: aggregate.tracked_paths().into_iter().map(str::to_string).collect() })
            }
            Ok(false) => {
                warn!("engine refused export to {shown}");
                Err(CoreEngineError::ExportRejected { destination: shown })
            }
            Err(e) => Err(CoreEngineError::ExportFailed { destination: shown,
                                                          reason: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use crate::snapshot::{Directory, SnapshotId};
    use async_trait::async_trait;

    struct Answer(Result<bool, EngineError>);

    #[async_trait]
    impl SnapshotEngine for Answer {
        async fn resolve(&self, _directory: &Directory) -> Result<SnapshotId, EngineError> {
            Err(EngineError::Backend("unused".into()))
        }

        async fn export(&self, _directory: &Directory, _destination: &Path) -> Result<bool, EngineError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn dual_signal_is_normalized() {
        let agg = AggregateOutput::new();
        let dest = Path::new("/tmp/out");

        let ok = Exporter::new(&Answer(Ok(true))).export(&agg, dest).await.expect("ok");
        assert_eq!(ok.destination, PathBuf::from("/tmp/out"));

        assert_eq!(Exporter::new(&Answer(Ok(false))).export(&agg, dest).await,
                   Err(CoreEngineError::ExportRejected { destination: "/tmp/out".into() }));

        let failed = Exporter::new(&Answer(Err(EngineError::Io("read-only".into())))).export(&agg, dest).await;
        assert_eq!(failed,
                   Err(CoreEngineError::ExportFailed { destination: "/tmp/out".into(),
                                                       reason: "io: read-only".into() }));
    }
}
