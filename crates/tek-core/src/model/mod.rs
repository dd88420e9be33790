//! Modelos neutrales del core (TaskSpec, bindings de workspace, agregado).

pub mod aggregate;
pub mod binding;
pub mod task;

pub use aggregate::{AggregateOutput, StepResult};
pub use binding::ResolvedWorkspaceBinding;
pub use task::{StepMode, TaskSpec, TaskStep, WorkspaceDecl};
