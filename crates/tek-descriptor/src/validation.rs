//! Validación estructural de un documento ya sustituido.
//!
//! Se acumulan todos los problemas en un único `DescriptorError::Validation`.
use std::collections::HashSet;

use tek_core::snapshot::normalize_path;

use crate::document::TaskDocument;
use crate::errors::DescriptorError;

/// Prefijo reservado por el runtime (scripts, resultados, exit codes).
const RESERVED_ROOT: &str = "tekton";

pub fn validate(document: &TaskDocument) -> Result<(), DescriptorError> {
    let mut problems = Vec::new();
    let spec = &document.spec;

    if document.metadata.name.is_empty() {
        problems.push("metadata.name is required".to_string());
    }
    if spec.steps.is_empty() {
        problems.push("spec.steps: expected at least one step".to_string());
    }

    let mut step_names = HashSet::new();
    for (i, step) in spec.steps.iter().enumerate() {
        if !step_names.insert(step.name.as_str()) {
            problems.push(format!("steps[{i}].name: duplicate step name '{}'", step.name));
        }
        if step.image.trim().is_empty() {
            problems.push(format!("steps[{i}].image: step '{}' has no image", step.name));
        }
        let has_command = !step.command.is_empty() || !step.args.is_empty();
        match (!step.script.is_empty(), has_command) {
            (true, true) => problems.push(format!("steps[{i}]: script cannot be combined with command or args")),
            (false, false) => problems.push(format!("steps[{i}]: step '{}' needs a script or a command", step.name)),
            _ => {}
        }
    }

    let mut ws_names = HashSet::new();
    let mut mount_paths = HashSet::new();
    for (i, ws) in spec.workspaces.iter().enumerate() {
        if !ws_names.insert(ws.name.as_str()) {
            problems.push(format!("workspaces[{i}].name: duplicate workspace name '{}'", ws.name));
        }
        let effective = if ws.mount_path.is_empty() {
            format!("workspace/{}", ws.name)
        } else {
            normalize_path(&ws.mount_path)
        };
        if effective == RESERVED_ROOT || effective.starts_with(&format!("{RESERVED_ROOT}/")) {
            problems.push(format!("workspaces[{i}].mountPath: '{}' is under reserved /{RESERVED_ROOT}", ws.mount_path));
        }
        if !mount_paths.insert(effective.clone()) {
            problems.push(format!("workspaces[{i}].mountPath: '/{effective}' is already used"));
        }
    }

    let mut param_names = HashSet::new();
    for (i, p) in spec.params.iter().enumerate() {
        if !param_names.insert(p.name.as_str()) {
            problems.push(format!("params[{i}].name: duplicate param '{}'", p.name));
        }
        if let (Some(declared), Some(default)) = (p.param_type, &p.default) {
            if default.param_type() != declared {
                problems.push(format!("params[{i}].default: expected {declared:?} for param '{}'", p.name));
            }
        }
    }

    let mut result_names = HashSet::new();
    for (i, r) in spec.results.iter().enumerate() {
        if !result_names.insert(r.name.as_str()) {
            problems.push(format!("results[{i}].name: duplicate result '{}'", r.name));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(DescriptorError::Validation(problems))
    }
}
