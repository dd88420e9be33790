//! Valores por defecto aplicados antes de sustituir.
//!
//! - params sin `type`: el tipo de su `default`, o `string`.
//! - steps sin nombre: `unnamed-<índice>`.
use crate::document::{ParamType, TaskDocument};

pub fn set_defaults(document: &mut TaskDocument) {
    for param in &mut document.spec.params {
        if param.param_type.is_none() {
            param.param_type = Some(param.default.as_ref().map(|d| d.param_type()).unwrap_or(ParamType::String));
        }
    }
    for (index, step) in document.spec.steps.iter_mut().enumerate() {
        if step.name.is_empty() {
            step.name = format!("unnamed-{index}");
        }
    }
}
