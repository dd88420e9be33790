//! Salida agregada del run.
//!
//! `AggregateOutput` guarda, por ruta rastreada, el snapshot más reciente
//! observado en esa ruta. El fold es last-write-wins: cada step reemplaza la
//! entrada completa, no se mezclan contenidos entre steps.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::snapshot::{normalize_path, Directory, SnapshotId};

/// Snapshot producido por un step en la raíz del source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_index: usize,
    pub step_name: String,
    pub snapshot: SnapshotId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOutput {
    entries: BTreeMap<String, SnapshotId>,
}

impl AggregateOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agregado inicial con `snapshot` en cada ruta rastreada.
    pub fn seeded(paths: &[&str], snapshot: &SnapshotId) -> Self {
        let mut out = Self::new();
        for p in paths {
            out.fold(p, snapshot.clone());
        }
        out
    }

    /// Reemplaza la entrada de `path`; devuelve el valor anterior.
    pub fn fold(&mut self, path: &str, snapshot: SnapshotId) -> Option<SnapshotId> {
        self.entries.insert(normalize_path(path), snapshot)
    }

    pub fn get(&self, path: &str) -> Option<&SnapshotId> {
        self.entries.get(&normalize_path(path))
    }

    pub fn tracked_paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directorio perezoso con cada snapshot montado en su ruta.
    pub fn to_directory(&self) -> Directory {
        self.entries
            .iter()
            .fold(Directory::empty(), |acc, (path, id)| acc.with_directory(path, Directory::snapshot(id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FsTree;

    fn id(content: &str) -> SnapshotId {
        let mut t = FsTree::new();
        t.insert_file("f", content.as_bytes().to_vec(), 0o644);
        t.digest()
    }

    #[test]
    fn fold_is_last_write_wins() {
        let mut agg = AggregateOutput::seeded(&["/workspace/source"], &id("0"));
        assert_eq!(agg.fold("/workspace/source/", id("1")), Some(id("0")));
        agg.fold("workspace/source", id("2"));
        assert_eq!(agg.get("/workspace/source"), Some(&id("2")));
        assert_eq!(agg.tracked_paths(), vec!["workspace/source"]);
    }
}
