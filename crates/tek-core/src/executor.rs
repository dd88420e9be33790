//! Traducción de un step resuelto a un contenedor perezoso.
//!
//! Orden de operaciones del contenedor:
//! imagen → workdir `SOURCE_ROOT` → montajes (source al final) → script → exec.
//! Nada se evalúa aquí.

use log::debug;

use crate::constants::SOURCE_ROOT;
use crate::errors::CoreEngineError;
use crate::model::{ResolvedWorkspaceBinding, StepMode, TaskStep};
use crate::script::{MaterializedScript, ScriptMaterializer, SuffixSource};
use crate::snapshot::{Container, Directory};

/// Descriptor de ejecución de un step.
#[derive(Debug, Clone)]
pub struct BuiltStep {
    pub container: Container,
    /// Presente sólo en modo script.
    pub script: Option<MaterializedScript>,
    pub argv: Vec<String>,
}

impl BuiltStep {
    /// Raíz del source tras ejecutar el step (perezosa).
    pub fn output(&self) -> Directory {
        self.container.directory(SOURCE_ROOT)
    }
}

pub struct StepExecutorBuilder<S: SuffixSource> {
    materializer: ScriptMaterializer<S>,
}

impl<S: SuffixSource> StepExecutorBuilder<S> {
    pub fn new(suffixes: S) -> Self {
        Self { materializer: ScriptMaterializer::new(suffixes) }
    }

    pub fn build(&mut self, step: &TaskStep, bindings: &[ResolvedWorkspaceBinding]) -> Result<BuiltStep, CoreEngineError> {
        if step.image.trim().is_empty() {
            return Err(CoreEngineError::MissingImage { step: step.name.clone() });
        }
        let mode = step.mode()?;

        let mut container = Container::from_image(step.image.as_str()).with_workdir(SOURCE_ROOT);
        let ordered = bindings.iter()
                              .filter(|b| !b.is_source())
                              .chain(bindings.iter().filter(|b| b.is_source()));
        for binding in ordered {
            container = container.with_directory(binding.mount_path.as_str(), binding.content.clone());
        }

        let (script, argv) = match mode {
            StepMode::Script(body) => {
                let script = self.materializer.materialize(&step.name, body);
                container = container.with_new_file(script.path.as_str(), script.content.as_str(), script.permissions);
                let argv = vec![script.path.clone()];
                (Some(script), argv)
            }
            StepMode::Command(argv) => (None, argv),
        };
        debug!("step '{}' -> {} ({:?})", step.name, step.image, argv);

        Ok(BuiltStep { container: container.with_exec(argv.clone()),
                       script,
                       argv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::SeededSuffix;
    use crate::snapshot::ContainerOp;

    fn binding(name: &str, path: &str) -> ResolvedWorkspaceBinding {
        ResolvedWorkspaceBinding { name: name.into(),
                                   mount_path: path.into(),
                                   content: Directory::empty() }
    }

    fn step() -> TaskStep {
        TaskStep { name: "build".into(),
                   image: "golang:1.22".into(),
                   ..Default::default() }
    }

    #[test]
    fn script_step_writes_file_then_execs_it() {
        let mut builder = StepExecutorBuilder::new(SeededSuffix::new(7));
        let built = builder.build(&TaskStep { script: "echo hi".into(), ..step() },
                                  &[binding("source", "/workspace/source")])
                           .expect("build");
        let script = built.script.clone().expect("script mode");
        assert_eq!(built.argv, vec![script.path.clone()]);
        assert!(script.path.starts_with("/tekton/scripts/build-"));

        let ops = built.container.ops();
        assert_eq!(ops[0], ContainerOp::From { image: "golang:1.22".into() });
        assert_eq!(ops[1], ContainerOp::Workdir { path: "/workspace/source".into() });
        assert!(matches!(&ops[2], ContainerOp::Directory { path, .. } if path == "/workspace/source"));
        assert_eq!(ops[3],
                   ContainerOp::NewFile { path: script.path.clone(),
                                          contents: "#!/bin/sh\nset -e\necho hi".into(),
                                          permissions: 0o755 });
        assert_eq!(ops[4], ContainerOp::Exec { argv: vec![script.path] });
    }

    #[test]
    fn command_step_execs_verbatim() {
        let mut builder = StepExecutorBuilder::new(SeededSuffix::new(7));
        let s = TaskStep { command: vec!["go".into()],
                           args: vec!["test".into(), "$(params.packages)".into()],
                           ..step() };
        let built = builder.build(&s, &[]).expect("build");
        assert!(built.script.is_none());
        assert_eq!(built.container.exec_argv(),
                   Some(&["go".to_string(), "test".to_string(), "$(params.packages)".to_string()][..]));
    }

    #[test]
    fn source_binding_is_attached_last() {
        let mut builder = StepExecutorBuilder::new(SeededSuffix::new(7));
        let s = TaskStep { command: vec!["true".into()], ..step() };
        let bindings = [binding("source", "/workspace/source"), binding("cache", "/workspace/cache")];
        let built = builder.build(&s, &bindings).expect("build");
        let paths: Vec<String> = built.container.mounts().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["workspace/cache", "workspace/source"]);
    }

    #[test]
    fn missing_image_is_rejected_before_mode() {
        let mut builder = StepExecutorBuilder::new(SeededSuffix::new(7));
        let s = TaskStep { image: String::new(), ..step() };
        assert_eq!(builder.build(&s, &[]).expect_err("no image"),
                   CoreEngineError::MissingImage { step: "build".into() });
    }
}
