//! Contenido de un snapshot evaluado.
//!
//! Un `FsTree` es un mapa ordenado ruta relativa normalizada → archivo. Sólo
//! se registran archivos regulares; los directorios son implícitos (un
//! directorio vacío no existe en el árbol). Todas las operaciones devuelven un
//! árbol nuevo o mutan un valor local que todavía no fue internado en un store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::SnapshotId;
use crate::hashing::{hash_bytes, hash_value};

/// Archivo regular dentro de un árbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEntry {
    pub contents: Vec<u8>,
    pub permissions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsTree {
    files: BTreeMap<String, FsEntry>,
}

/// Normaliza una ruta de contenedor a forma relativa sin `.`, `..` ni
/// separadores repetidos. La raíz (`/`) queda como cadena vacía.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

fn is_under(path: &str, prefix: &str) -> bool {
    prefix.is_empty() || path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

impl FsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta (o reemplaza) un archivo. Un archivo no puede convivir con un
    /// directorio del mismo nombre: se eliminan ancestros y descendientes en
    /// conflicto. Insertar en la raíz no tiene efecto.
    pub fn insert_file(&mut self, path: &str, contents: Vec<u8>, permissions: u32) {
        let path = normalize_path(path);
        if path.is_empty() {
            log::warn!("ignoring file insert at tree root");
            return;
        }
        self.remove_conflicts(&path);
        self.files.insert(path, FsEntry { contents, permissions });
    }

    pub fn get(&self, path: &str) -> Option<&FsEntry> {
        self.files.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FsEntry)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Directorios de primer nivel que contienen al menos un archivo.
    pub fn top_level_dirs(&self) -> Vec<&str> {
        let mut dirs: Vec<&str> = self.files.keys().filter_map(|k| k.split_once('/').map(|(top, _)| top)).collect();
        dirs.dedup();
        dirs
    }

    /// Árbol re-enraizado en `prefix` (lo que vería `directory(prefix)`).
    pub fn subtree(&self, prefix: &str) -> FsTree {
        let prefix = normalize_path(prefix);
        if prefix.is_empty() {
            return self.clone();
        }
        let files = self.files
                        .iter()
                        .filter_map(|(k, v)| {
                            k.strip_prefix(&prefix)
                             .and_then(|rest| rest.strip_prefix('/'))
                             .map(|rel| (rel.to_string(), v.clone()))
                        })
                        .collect();
        FsTree { files }
    }

    /// Devuelve un árbol nuevo donde todo lo que había bajo `prefix` fue
    /// reemplazado por `child` (semántica de montaje, no de merge).
    pub fn with_subtree(&self, prefix: &str, child: &FsTree) -> FsTree {
        let prefix = normalize_path(prefix);
        if prefix.is_empty() {
            return child.clone();
        }
        let mut out = self.clone();
        out.remove_conflicts(&prefix);
        for (rel, entry) in child.files.iter() {
            out.files.insert(format!("{prefix}/{rel}"), entry.clone());
        }
        out
    }

    /// Identidad por contenido: hash del listado canónico ruta → (modo, hash).
    pub fn digest(&self) -> SnapshotId {
        let mut listing = Map::new();
        for (path, entry) in self.files.iter() {
            listing.insert(path.clone(),
                           json!({ "mode": entry.permissions, "blake3": hash_bytes(&entry.contents) }));
        }
        SnapshotId::from_digest(hash_value(&Value::Object(listing)))
    }

    fn remove_conflicts(&mut self, path: &str) {
        self.files.retain(|k, _| !is_under(k, path));
        let mut ancestor = path;
        while let Some((parent, _)) = ancestor.rsplit_once('/') {
            self.files.remove(parent);
            ancestor = parent;
        }
    }
}
