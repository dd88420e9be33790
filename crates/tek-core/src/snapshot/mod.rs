//! Álgebra de snapshots inmutables.
//!
//! Un `Directory` o un `Container` es una descripción perezosa: construirlos
//! nunca ejecuta nada. Sólo `SnapshotEngine::resolve` y
//! `SnapshotEngine::export` fuerzan la evaluación. Los árboles evaluados
//! (`FsTree`) se identifican por contenido (`SnapshotId`).
//!
//! Módulos:
//! - `id`, `tree`: identidad y contenido de un snapshot evaluado.
//! - `directory`, `container`: builders puros sobre descriptores inmutables.
//! - `engine`: contratos (`SnapshotEngine`, `ExecBackend`, `SourceFetcher`).
//! - `local`: evaluador genérico con store direccionado por contenido.
//! - `fs`: lectura/escritura de árboles en el filesystem del host.

pub mod container;
pub mod directory;
pub mod engine;
pub mod fs;
pub mod id;
pub mod local;
pub mod tree;

pub use container::{Container, ContainerOp};
pub use directory::{Directory, DirectoryOp};
pub use engine::{ExecBackend, ExecRequest, SnapshotEngine, SourceFetcher};
pub use id::SnapshotId;
pub use local::LocalEngine;
pub use tree::{normalize_path, FsEntry, FsTree};
