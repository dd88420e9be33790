//! Resolución de workspaces a bindings montables.
//!
//! - Sin `mountPath` declarado: `WORKSPACE_ROOT/<nombre>`.
//! - `source`: siempre en `SOURCE_ROOT` y ligado al snapshot vigente del
//!   source, nunca a un directorio vacío.
//! - El resto arranca (y se queda) con un directorio vacío.
//!
//! `WorkspaceBindings` se crea una sola vez por run; sólo el binding `source`
//! se vuelve a ligar tras cada step. Las colisiones de ruta se detectan al
//! crearlo, antes de ejecutar nada.

use indexmap::IndexMap;
use log::debug;

use crate::constants::{SOURCE_ROOT, SOURCE_WORKSPACE, WORKSPACE_ROOT};
use crate::errors::CoreEngineError;
use crate::model::{ResolvedWorkspaceBinding, WorkspaceDecl};
use crate::snapshot::{normalize_path, Directory};

/// Ruta efectiva de montaje de un workspace.
pub fn effective_mount_path(workspace: &WorkspaceDecl) -> String {
    if workspace.name == SOURCE_WORKSPACE {
        SOURCE_ROOT.to_string()
    } else if workspace.mount_path.is_empty() {
        format!("{}/{}", WORKSPACE_ROOT, workspace.name)
    } else {
        workspace.mount_path.clone()
    }
}

/// Binding de un workspace dado el snapshot vigente del source.
pub fn resolve(workspace: &WorkspaceDecl, running_source: &Directory) -> ResolvedWorkspaceBinding {
    let content = if workspace.name == SOURCE_WORKSPACE { running_source.clone() } else { Directory::empty() };
    ResolvedWorkspaceBinding { name: workspace.name.clone(),
                               mount_path: effective_mount_path(workspace),
                               content }
}

#[derive(Debug, Clone)]
pub struct WorkspaceBindings {
    bindings: IndexMap<String, ResolvedWorkspaceBinding>,
}

impl WorkspaceBindings {
    /// Resuelve todas las declaraciones. Si la task no declara `source` se
    /// agrega uno implícito: el encadenamiento entre steps depende de él.
    pub fn resolve_all(declared: &[WorkspaceDecl], running_source: &Directory) -> Result<Self, CoreEngineError> {
        let mut bindings: IndexMap<String, ResolvedWorkspaceBinding> = IndexMap::new();
        for ws in declared {
            if bindings.contains_key(&ws.name) {
                return Err(CoreEngineError::DuplicateWorkspace(ws.name.clone()));
            }
            bindings.insert(ws.name.clone(), resolve(ws, running_source));
        }
        if !bindings.contains_key(SOURCE_WORKSPACE) {
            debug!("task declares no '{SOURCE_WORKSPACE}' workspace; binding it implicitly");
            bindings.insert(SOURCE_WORKSPACE.to_string(), resolve(&WorkspaceDecl::new(SOURCE_WORKSPACE), running_source));
        }

        let mut seen: IndexMap<String, &str> = IndexMap::new();
        for b in bindings.values() {
            let key = normalize_path(&b.mount_path);
            if let Some(first) = seen.get(&key) {
                return Err(CoreEngineError::MountPathCollision { path: format!("/{key}"),
                                                                 first: first.to_string(),
                                                                 second: b.name.clone() });
            }
            seen.insert(key, &b.name);
        }

        Ok(Self { bindings })
    }

    /// Liga `source` al snapshot producido por el último step.
    pub fn rebind_source(&mut self, running_source: Directory) {
        if let Some(source) = self.bindings.get_mut(SOURCE_WORKSPACE) {
            source.content = running_source;
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedWorkspaceBinding> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Orden de montaje para un step: declaración, con `source` al final.
    pub fn for_step(&self) -> Vec<ResolvedWorkspaceBinding> {
        let (source, mut rest): (Vec<_>, Vec<_>) = self.bindings.values().cloned().partition(|b| b.is_source());
        rest.extend(source);
        rest
    }
}
