//! Contratos del motor de snapshots.
//!
//! - `SnapshotEngine`: fuerza la evaluación de un `Directory` (punto de
//!   suspensión) y exporta árboles al filesystem del host.
//! - `ExecBackend`: ejecuta un único `exec` sobre el filesystem rastreado de
//!   un contenedor y devuelve el filesystem resultante.
//! - `SourceFetcher`: recupera el snapshot inicial del código fuente.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Directory, FsTree, SnapshotId};
use crate::errors::EngineError;

#[async_trait]
pub trait SnapshotEngine: Send + Sync {
    /// Evalúa `directory` y devuelve la identidad del árbol resultante.
    async fn resolve(&self, directory: &Directory) -> Result<SnapshotId, EngineError>;

    /// Escribe el árbol de `directory` en `destination`. `Ok(false)` indica
    /// que el engine rechazó el destino sin un error concreto.
    async fn export(&self, directory: &Directory, destination: &Path) -> Result<bool, EngineError>;
}

#[async_trait]
impl<T: SnapshotEngine + ?Sized> SnapshotEngine for Arc<T> {
    async fn resolve(&self, directory: &Directory) -> Result<SnapshotId, EngineError> {
        (**self).resolve(directory).await
    }

    async fn export(&self, directory: &Directory, destination: &Path) -> Result<bool, EngineError> {
        (**self).export(directory, destination).await
    }
}

/// Petición de ejecución de un comando dentro de un contenedor.
#[derive(Debug, Clone, Copy)]
pub struct ExecRequest<'a> {
    pub image: &'a str,
    pub workdir: &'a str,
    pub argv: &'a [String],
    /// Filesystem rastreado (montajes y archivos nuevos), relativo a `/`.
    pub rootfs: &'a FsTree,
}

#[async_trait]
pub trait ExecBackend: Send + Sync {
    /// Ejecuta `request.argv`; un código de salida distinto de cero es error.
    async fn exec(&self, request: ExecRequest<'_>) -> Result<FsTree, EngineError>;
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, repository: &str, branch: &str) -> Result<FsTree, EngineError>;
}
