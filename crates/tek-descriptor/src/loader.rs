//! Lectura de documentos `Task` desde YAML.
use std::path::Path;

use log::debug;

use crate::document::{TaskDocument, SUPPORTED_API_VERSIONS, TASK_KIND};
use crate::errors::DescriptorError;

/// Parsea un documento y verifica `apiVersion`/`kind`.
pub fn parse_task(yaml: &str) -> Result<TaskDocument, DescriptorError> {
    let document: TaskDocument = serde_yaml::from_str(yaml)?;
    if document.kind != TASK_KIND || !SUPPORTED_API_VERSIONS.contains(&document.api_version.as_str()) {
        return Err(DescriptorError::UnsupportedKind { api_version: document.api_version,
                                                      kind: document.kind });
    }
    Ok(document)
}

pub fn load_task(path: &Path) -> Result<TaskDocument, DescriptorError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| DescriptorError::Io { path: path.display().to_string(),
                                                                               reason: e.to_string() })?;
    let document = parse_task(&yaml)?;
    debug!("loaded task '{}' from {} ({} steps)",
           document.metadata.name,
           path.display(),
           document.spec.steps.len());
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_kinds() {
        let err = parse_task("apiVersion: tekton.dev/v1\nkind: Pipeline\nmetadata:\n  name: p\n").expect_err("kind");
        assert_eq!(err,
                   DescriptorError::UnsupportedKind { api_version: "tekton.dev/v1".into(),
                                                      kind: "Pipeline".into() });
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(parse_task("kind: [unclosed"), Err(DescriptorError::Yaml(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_task(Path::new("/definitely/not/here.yaml")).expect_err("io");
        assert!(matches!(err, DescriptorError::Io { .. }));
    }
}
