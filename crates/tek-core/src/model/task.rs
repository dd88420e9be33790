//! Task ya resuelta: sin placeholders, lista para traducirse a contenedores.
//!
//! Estos tipos llegan desde el subsistema de sustitución; el core nunca vuelve
//! a interpretar sintaxis `$(...)`.
use serde::{Deserialize, Serialize};

use crate::errors::CoreEngineError;

/// Un step: imagen más script inline o vector command/args.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub script: String,
}

/// Superficie de ejecución activa de un step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMode<'a> {
    /// Cuerpo del script inline.
    Script(&'a str),
    /// `command ++ args`, en ese orden.
    Command(Vec<String>),
}

impl TaskStep {
    /// Determina el modo de ejecución. Script y command/args son excluyentes;
    /// un step sin ninguno de los dos no es ejecutable.
    pub fn mode(&self) -> Result<StepMode<'_>, CoreEngineError> {
        let has_command = !self.command.is_empty() || !self.args.is_empty();
        match (!self.script.is_empty(), has_command) {
            (true, true) => Err(CoreEngineError::AmbiguousExecution { step: self.name.clone() }),
            (true, false) => Ok(StepMode::Script(&self.script)),
            (false, true) => Ok(StepMode::Command(self.command.iter().chain(self.args.iter()).cloned().collect())),
            (false, false) => Err(CoreEngineError::MissingExecution { step: self.name.clone() }),
        }
    }
}

/// Declaración de workspace. `mount_path` vacío = derivado del nombre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDecl {
    pub name: String,
    #[serde(default, rename = "mountPath")]
    pub mount_path: String,
}

impl WorkspaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), mount_path: String::new() }
    }

    pub fn with_mount_path(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self { name: name.into(), mount_path: mount_path.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<TaskStep>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceDecl>,
}
