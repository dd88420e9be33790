//! `Task` + TaskRun → `TaskSpec` del core.
//!
//! defaults → ligado de params → sustitución → validación → conversión.
use log::info;
use tek_core::{TaskSpec, TaskStep, WorkspaceDecl};

use crate::defaults::set_defaults;
use crate::document::TaskDocument;
use crate::errors::DescriptorError;
use crate::params::{bind_params, TaskRunParams};
use crate::substitution::Substitutions;
use crate::validation::validate;

pub fn resolve(document: &TaskDocument, run: &TaskRunParams) -> Result<TaskSpec, DescriptorError> {
    let mut document = document.clone();
    set_defaults(&mut document);
    let run = run.with_default_bindings(&document);

    let params = bind_params(&document, &run)?;
    let resolved = Substitutions::new(&document, &run, params).apply(&document, &run)?;
    validate(&resolved)?;

    info!("resolved task '{}': {} steps, {} workspaces",
          resolved.metadata.name,
          resolved.spec.steps.len(),
          resolved.spec.workspaces.len());
    Ok(into_task_spec(resolved))
}

fn into_task_spec(document: TaskDocument) -> TaskSpec {
    TaskSpec { name: document.metadata.name,
               steps: document.spec
                              .steps
                              .into_iter()
                              .map(|s| TaskStep { name: s.name,
                                                  image: s.image,
                                                  command: s.command,
                                                  args: s.args,
                                                  script: s.script })
                              .collect(),
               workspaces: document.spec
                                   .workspaces
                                   .into_iter()
                                   .map(|w| WorkspaceDecl::with_mount_path(w.name, w.mount_path))
                                   .collect() }
}
