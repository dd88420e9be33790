//! `Directory`: descripción perezosa de un árbol de archivos.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{normalize_path, Container, SnapshotId};
use crate::hashing::hash_value;

/// Operación que produce un directorio. Los operandos se comparten (`Arc`),
/// nunca se copian ni se mutan.
#[derive(Debug, PartialEq, Eq)]
pub enum DirectoryOp {
    /// Árbol vacío.
    Empty,
    /// Árbol ya evaluado e internado en el store del engine.
    Snapshot(SnapshotId),
    /// Código fuente a recuperar (`repository@branch`).
    Source { repository: String, branch: String },
    /// `base` con `child` montado en `path` (reemplaza lo que hubiera ahí).
    WithDirectory { base: Directory, path: String, child: Directory },
    /// Contenido de `path` dentro de un contenedor tras evaluarlo.
    FromContainer { container: Container, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    op: Arc<DirectoryOp>,
}

impl Directory {
    fn new(op: DirectoryOp) -> Self {
        Self { op: Arc::new(op) }
    }

    pub fn empty() -> Self {
        Self::new(DirectoryOp::Empty)
    }

    pub fn snapshot(id: SnapshotId) -> Self {
        Self::new(DirectoryOp::Snapshot(id))
    }

    pub fn source(repository: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::new(DirectoryOp::Source { repository: repository.into(),
                                        branch: branch.into() })
    }

    pub(crate) fn from_container(container: Container, path: &str) -> Self {
        Self::new(DirectoryOp::FromContainer { container,
                                               path: normalize_path(path) })
    }

    /// Nuevo directorio con `child` montado en `path`.
    pub fn with_directory(&self, path: &str, child: Directory) -> Self {
        Self::new(DirectoryOp::WithDirectory { base: self.clone(),
                                               path: normalize_path(path),
                                               child })
    }

    pub fn op(&self) -> &DirectoryOp {
        &self.op
    }

    /// Snapshot ya evaluado, si este directorio es uno.
    pub fn as_snapshot(&self) -> Option<&SnapshotId> {
        match self.op() {
            DirectoryOp::Snapshot(id) => Some(id),
            _ => None,
        }
    }

    /// Descripción estructural (no el contenido) usada para fingerprints.
    pub fn describe(&self) -> Value {
        match self.op() {
            DirectoryOp::Empty => json!("empty"),
            DirectoryOp::Snapshot(id) => json!({ "snapshot": id.as_str() }),
            DirectoryOp::Source { repository, branch } => json!({ "source": { "repository": repository, "branch": branch } }),
            DirectoryOp::WithDirectory { base, path, child } => json!({
                "with_directory": { "base": base.describe(), "path": path, "child": child.describe() }
            }),
            DirectoryOp::FromContainer { container, path } => json!({
                "from_container": { "container": container.describe(), "path": path }
            }),
        }
    }

    pub fn fingerprint(&self) -> String {
        hash_value(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_do_not_touch_operands() {
        let base = Directory::empty();
        let child = Directory::source("https://example.com/repo", "main");
        let mounted = base.with_directory("/workspace/source/", child.clone());
        assert_eq!(base, Directory::empty());
        match mounted.op() {
            DirectoryOp::WithDirectory { path, child: c, .. } => {
                assert_eq!(path, "workspace/source");
                assert_eq!(c, &child);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let a = Directory::source("repo", "main");
        let b = Directory::source("repo", "dev");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), Directory::source("repo", "main").fingerprint());
    }
}
