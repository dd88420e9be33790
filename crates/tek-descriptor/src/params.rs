//! Datos del TaskRun que alimentan la sustitución.
use indexmap::IndexMap;
use log::warn;

use crate::document::{ParamValue, TaskDocument};
use crate::errors::DescriptorError;

/// Parámetro que recibe `"."` cuando el caller no provee ninguno.
pub const DEFAULT_PACKAGES_PARAM: &str = "packages";

/// Workspace ligado por el TaskRun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceBinding {
    pub name: String,
    /// Nombre del PersistentVolumeClaim, si lo hay.
    pub claim: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRunParams {
    /// `None` = `<task>-run`.
    pub name: Option<String>,
    pub namespace: String,
    pub uid: String,
    pub retry_count: u32,
    pub params: IndexMap<String, ParamValue>,
    pub workspaces: Vec<WorkspaceBinding>,
}

impl Default for TaskRunParams {
    fn default() -> Self {
        Self { name: None,
               namespace: "default".into(),
               uid: uuid::Uuid::new_v4().to_string(),
               retry_count: 0,
               params: IndexMap::new(),
               workspaces: Vec::new() }
    }
}

impl TaskRunParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_workspace(mut self, name: impl Into<String>, claim: Option<String>) -> Self {
        self.workspaces.push(WorkspaceBinding { name: name.into(), claim });
        self
    }

    pub fn task_run_name(&self, task_name: &str) -> String {
        self.name.clone().unwrap_or_else(|| format!("{task_name}-run"))
    }

    pub fn binding(&self, workspace: &str) -> Option<&WorkspaceBinding> {
        self.workspaces.iter().find(|w| w.name == workspace)
    }

    /// El TaskRun siempre liga `packages` a `"."` si la task lo declara y el
    /// caller no lo fijó; ese valor gana sobre el default de la task.
    pub fn with_default_bindings(&self, document: &TaskDocument) -> Self {
        let mut out = self.clone();
        let declared = document.spec.params.iter().any(|p| p.name == DEFAULT_PACKAGES_PARAM);
        if declared && !out.params.contains_key(DEFAULT_PACKAGES_PARAM) {
            out.params.insert(DEFAULT_PACKAGES_PARAM.into(), ParamValue::from("."));
        }
        out
    }
}

/// Valor efectivo de cada parámetro declarado: el del TaskRun o el default.
pub fn bind_params(document: &TaskDocument, run: &TaskRunParams) -> Result<IndexMap<String, ParamValue>, DescriptorError> {
    let mut bound = IndexMap::new();
    let mut problems = Vec::new();
    for spec in &document.spec.params {
        let Some(value) = run.params.get(&spec.name).or(spec.default.as_ref()) else {
            problems.push(format!("param '{}' has no value and no default", spec.name));
            continue;
        };
        if let Some(expected) = spec.param_type {
            if value.param_type() != expected {
                problems.push(format!("param '{}' expects {:?} but got {:?}",
                                      spec.name,
                                      expected,
                                      value.param_type()));
                continue;
            }
        }
        bound.insert(spec.name.clone(), value.clone());
    }
    for extra in run.params.keys().filter(|k| !document.spec.params.iter().any(|p| &p.name == *k)) {
        warn!("param '{extra}' is not declared by task '{}'; ignoring it", document.metadata.name);
    }
    if problems.is_empty() {
        Ok(bound)
    } else {
        Err(DescriptorError::Validation(problems))
    }
}
