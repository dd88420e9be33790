//! Errores de carga, sustitución y validación de documentos `Task`.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("cannot read '{path}': {reason}")]
    Io { path: String, reason: String },
    #[error("invalid task document: {0}")]
    Yaml(String),
    #[error("unsupported document '{api_version}' kind '{kind}' (expected tekton.dev/v1 Task)")]
    UnsupportedKind { api_version: String, kind: String },
    #[error("{field}: {reason}")]
    Substitution { field: String, reason: String },
    #[error("invalid task: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl DescriptorError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }
}

impl From<serde_yaml::Error> for DescriptorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}
