//! tek-descriptor: documentos Tekton `Task` → `TaskSpec` del core.
//!
//! `load_task`/`parse_task` leen el YAML, `resolve` aplica defaults,
//! sustitución de variables y validación.
pub mod defaults;
pub mod document;
pub mod errors;
pub mod loader;
pub mod params;
pub mod resolve;
pub mod substitution;
pub mod validation;

pub use document::{ParamSpec, ParamType, ParamValue, StepSpec, TaskDocument, WorkspaceSpec};
pub use errors::DescriptorError;
pub use loader::{load_task, parse_task};
pub use params::{TaskRunParams, WorkspaceBinding};
pub use resolve::resolve;
