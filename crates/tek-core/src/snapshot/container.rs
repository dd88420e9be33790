//! `Container`: descriptor inmutable de la ejecución de un step.
//!
//! Cada `with_*` devuelve un contenedor nuevo que comparte la historia previa;
//! nada se ejecuta hasta que alguien evalúa `directory(..)` con un
//! `SnapshotEngine`. Las operaciones se aplican en el orden en que se
//! agregaron.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{normalize_path, Directory};
use crate::hashing::hash_value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerOp {
    From { image: String },
    Workdir { path: String },
    NewFile { path: String, contents: String, permissions: u32 },
    Directory { path: String, directory: Directory },
    Exec { argv: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    ops: Arc<Vec<ContainerOp>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_image(image: impl Into<String>) -> Self {
        Self::new().push(ContainerOp::From { image: image.into() })
    }

    fn push(&self, op: ContainerOp) -> Self {
        let mut ops = Vec::with_capacity(self.ops.len() + 1);
        ops.extend(self.ops.iter().cloned());
        ops.push(op);
        Self { ops: Arc::new(ops) }
    }

    pub fn with_workdir(&self, path: impl Into<String>) -> Self {
        self.push(ContainerOp::Workdir { path: path.into() })
    }

    pub fn with_new_file(&self, path: impl Into<String>, contents: impl Into<String>, permissions: u32) -> Self {
        self.push(ContainerOp::NewFile { path: path.into(),
                                         contents: contents.into(),
                                         permissions })
    }

    pub fn with_directory(&self, path: impl Into<String>, directory: Directory) -> Self {
        self.push(ContainerOp::Directory { path: path.into(), directory })
    }

    pub fn with_exec(&self, argv: Vec<String>) -> Self {
        self.push(ContainerOp::Exec { argv })
    }

    /// Directorio perezoso con el contenido de `path` tras evaluar el contenedor.
    pub fn directory(&self, path: &str) -> Directory {
        Directory::from_container(self.clone(), path)
    }

    pub fn ops(&self) -> &[ContainerOp] {
        &self.ops
    }

    pub fn image(&self) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
                                 ContainerOp::From { image } => Some(image.as_str()),
                                 _ => None,
                             })
    }

    pub fn workdir(&self) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
                                 ContainerOp::Workdir { path } => Some(path.as_str()),
                                 _ => None,
                             })
    }

    /// argv del último exec declarado.
    pub fn exec_argv(&self) -> Option<&[String]> {
        self.ops.iter().rev().find_map(|op| match op {
                                 ContainerOp::Exec { argv } => Some(argv.as_slice()),
                                 _ => None,
                             })
    }

    /// Montajes en orden de aplicación (ruta normalizada, directorio).
    pub fn mounts(&self) -> Vec<(String, &Directory)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ContainerOp::Directory { path, directory } => Some((normalize_path(path), directory)),
                _ => None,
            })
            .collect()
    }

    pub fn describe(&self) -> Value {
        let ops: Vec<Value> = self.ops
                                  .iter()
                                  .map(|op| match op {
                                      ContainerOp::From { image } => json!({ "from": image }),
                                      ContainerOp::Workdir { path } => json!({ "workdir": path }),
                                      ContainerOp::NewFile { path, contents, permissions } => json!({
                                          "new_file": { "path": path, "contents": contents, "permissions": permissions }
                                      }),
                                      ContainerOp::Directory { path, directory } => json!({
                                          "directory": { "path": normalize_path(path), "content": directory.describe() }
                                      }),
                                      ContainerOp::Exec { argv } => json!({ "exec": argv }),
                                  })
                                  .collect();
        Value::Array(ops)
    }

    pub fn fingerprint(&self) -> String {
        hash_value(&self.describe())
    }
}
