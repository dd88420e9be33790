//! Sustitución de variables `$(...)` en un documento `Task`.
//!
//! Se aplica a `image`, `command`, `args` y `script` de cada step y al
//! `mountPath` de cada workspace. En `command`/`args`, un elemento que es
//! exactamente `$(params.x[*])` (o `$(params.x)` con `x` de tipo array) se
//! expande en varios elementos; en cualquier otro contexto un array completo
//! es un error.

mod reference;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::debug;
use tek_core::constants::RESULTS_DIR;
use tek_core::snapshot::normalize_path;

pub use reference::{parse_reference, scan, Reference, Segment, Selector};

use crate::document::{ParamValue, TaskDocument};
use crate::errors::DescriptorError;
use crate::params::TaskRunParams;

const STEPS_DIR: &str = "/tekton/steps";

#[derive(Debug, Clone)]
struct WorkspaceVars {
    path: String,
    bound: bool,
    claim: String,
    volume: String,
}

/// Tabla de valores de sustitución para un documento y un TaskRun.
#[derive(Debug, Clone)]
pub struct Substitutions {
    params: IndexMap<String, ParamValue>,
    context: HashMap<String, String>,
    workspaces: HashMap<String, WorkspaceVars>,
    results: HashSet<String>,
    steps: HashSet<String>,
}

impl Substitutions {
    /// `params` son los valores ya ligados (ver `bind_params`).
    pub fn new(document: &TaskDocument, run: &TaskRunParams, params: IndexMap<String, ParamValue>) -> Self {
        let task_name = document.metadata.name.clone();
        let context = HashMap::from([("task.name".to_string(), task_name.clone()),
                                     ("task.retry-count".to_string(), run.retry_count.to_string()),
                                     ("taskRun.name".to_string(), run.task_run_name(&task_name)),
                                     ("taskRun.namespace".to_string(), run.namespace.clone()),
                                     ("taskRun.uid".to_string(), run.uid.clone())]);
        Self { params,
               context,
               workspaces: HashMap::new(),
               results: document.spec.results.iter().map(|r| r.name.clone()).collect(),
               steps: document.spec.steps.iter().map(|s| s.name.clone()).collect() }
    }

    /// Documento con todas las referencias resueltas.
    pub fn apply(mut self, document: &TaskDocument, run: &TaskRunParams) -> Result<TaskDocument, DescriptorError> {
        let mut out = document.clone();

        for (i, ws) in out.spec.workspaces.iter_mut().enumerate() {
            ws.mount_path = self.apply_str(&ws.mount_path, &format!("workspaces[{i}].mountPath"))?;
        }
        for ws in &out.spec.workspaces {
            let binding = run.binding(&ws.name);
            let mount = if ws.mount_path.is_empty() { format!("/workspace/{}", ws.name) } else { ws.mount_path.clone() };
            let path = if ws.optional && binding.is_none() { String::new() } else { format!("/{}", normalize_path(&mount)) };
            // los workspaces obligatorios siempre se montan (vacíos si nadie los liga)
            let bound = binding.is_some() || !ws.optional;
            self.workspaces.insert(ws.name.clone(),
                                   WorkspaceVars { path,
                                                   bound,
                                                   claim: binding.and_then(|b| b.claim.clone()).unwrap_or_default(),
                                                   volume: if bound { ws.name.clone() } else { String::new() } });
        }

        for (i, step) in out.spec.steps.iter_mut().enumerate() {
            step.image = self.apply_str(&step.image, &format!("steps[{i}].image"))?;
            step.script = self.apply_str(&step.script, &format!("steps[{i}].script"))?;
            step.command = self.apply_array(&step.command, &format!("steps[{i}].command"))?;
            step.args = self.apply_array(&step.args, &format!("steps[{i}].args"))?;
        }
        Ok(out)
    }

    /// Sustitución en contexto string.
    pub fn apply_str(&self, input: &str, field: &str) -> Result<String, DescriptorError> {
        let mut out = String::with_capacity(input.len());
        for segment in scan(input) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr { raw, reference } => match self.render(&reference, raw, field)? {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(raw),
                },
            }
        }
        Ok(out)
    }

    /// Sustitución en contexto array (`command`, `args`).
    pub fn apply_array(&self, items: &[String], field: &str) -> Result<Vec<String>, DescriptorError> {
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let field = format!("{field}[{i}]");
            if let Some(expanded) = self.expand_whole_array(item, &field)? {
                out.extend(expanded);
            } else {
                out.push(self.apply_str(item, &field)?);
            }
        }
        Ok(out)
    }

    fn expand_whole_array(&self, item: &str, field: &str) -> Result<Option<Vec<String>>, DescriptorError> {
        let segments = scan(item);
        let [Segment::Expr { raw, reference: Reference::Param { name, selector } }] = segments.as_slice() else {
            return Ok(None);
        };
        match (self.param(name, raw, field)?, selector) {
            (ParamValue::Array(values), Selector::Whole | Selector::Star) => Ok(Some(values.clone())),
            _ => Ok(None),
        }
    }

    fn param(&self, name: &str, raw: &str, field: &str) -> Result<&ParamValue, DescriptorError> {
        self.params
            .get(name)
            .ok_or_else(|| DescriptorError::invalid(format!("{field}: non-existent variable `{raw}`")))
    }

    fn render(&self, reference: &Reference, raw: &str, field: &str) -> Result<Option<String>, DescriptorError> {
        let value = match reference {
            Reference::Param { name, selector } => Some(self.render_param(name, selector, raw, field)?),
            Reference::Context(key) => {
                let value = self.context.get(key).cloned();
                if value.is_none() {
                    debug!("{field}: leaving unknown context variable {raw}");
                }
                value
            }
            Reference::Workspace { name, field: attr } => {
                let vars = self.workspaces
                               .get(name)
                               .ok_or_else(|| DescriptorError::invalid(format!("{field}: non-existent variable `{raw}`")))?;
                Some(match attr.as_str() {
                    "path" => vars.path.clone(),
                    "bound" => vars.bound.to_string(),
                    "claim" => vars.claim.clone(),
                    "volume" => vars.volume.clone(),
                    _ => return Err(DescriptorError::invalid(format!("{field}: non-existent variable `{raw}`"))),
                })
            }
            Reference::Result(name) => {
                if !self.results.contains(name) {
                    return Err(DescriptorError::invalid(format!("{field}: non-existent variable `{raw}`")));
                }
                Some(format!("{RESULTS_DIR}/{name}"))
            }
            Reference::StepExitCode(step) => {
                self.steps.contains(step).then(|| format!("{STEPS_DIR}/step-{step}/exitCode"))
            }
            Reference::Malformed(_) => {
                return Err(DescriptorError::invalid(format!("{field}: malformed variable `{raw}`")));
            }
        };
        Ok(value)
    }

    fn render_param(&self, name: &str, selector: &Selector, raw: &str, field: &str) -> Result<String, DescriptorError> {
        match (self.param(name, raw, field)?, selector) {
            (ParamValue::String(s), Selector::Whole) => Ok(s.clone()),
            (ParamValue::Array(values), Selector::Index(i)) => {
                values.get(*i).cloned().ok_or_else(|| DescriptorError::Substitution {
                    field: field.to_string(),
                    reason: format!("index {i} out of range for `{raw}` ({} elements)", values.len()),
                })
            }
            (ParamValue::Object(map), Selector::Key(key)) => {
                map.get(key).cloned().ok_or_else(|| DescriptorError::Substitution {
                    field: field.to_string(),
                    reason: format!("object param '{name}' has no key '{key}'"),
                })
            }
            (ParamValue::Array(_), _) => Err(DescriptorError::invalid(format!(
                "{field}: array param `{raw}` can only be used as a whole element of command or args"
            ))),
            (value, _) => Err(DescriptorError::invalid(format!(
                "{field}: `{raw}` does not match the {:?} type of param '{name}'",
                value.param_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_task;

    fn subs(params: &[(&str, ParamValue)]) -> Substitutions {
        let doc = parse_task("apiVersion: tekton.dev/v1\nkind: Task\nmetadata: {name: golang-build}\nspec:\n  results: [{name: digest}]\n  steps: [{name: build, image: golang}]\n")
            .expect("doc");
        let run = TaskRunParams { uid: "uid-1".into(), ..TaskRunParams::new() };
        let bound = params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Substitutions::new(&doc, &run, bound)
    }

    #[test]
    fn string_context() {
        let s = subs(&[("packages", ParamValue::from("./..."))]);
        assert_eq!(s.apply_str("go build $(params.packages) in $(context.task.name)/$(context.taskRun.name)", "f")
                    .expect("render"),
                   "go build ./... in golang-build/golang-build-run");
        assert_eq!(s.apply_str("$(results.digest.path) $(steps.build.exitCode.path)", "f").expect("render"),
                   "/tekton/results/digest /tekton/steps/step-build/exitCode");
        assert_eq!(s.apply_str("$(pwd) $(context.unknown)", "f").expect("render"), "$(pwd) $(context.unknown)");
    }

    #[test]
    fn array_expansion_only_as_whole_element() {
        let s = subs(&[("flags", ParamValue::Array(vec!["-v".into(), "-race".into()]))]);
        let items: Vec<String> = vec!["test".into(), "$(params.flags[*])".into(), "first=$(params.flags[0])".into()];
        assert_eq!(s.apply_array(&items, "args").expect("expand"), vec!["test", "-v", "-race", "first=-v"]);

        let err = s.apply_str("echo $(params.flags)", "script").expect_err("array in string");
        assert!(matches!(err, DescriptorError::Validation(_)));
    }

    #[test]
    fn unknown_references_are_rejected() {
        let s = subs(&[]);
        for input in ["$(params.nope)", "$(results.other.path)", "$(workspaces.cache.path)"] {
            assert!(matches!(s.apply_str(input, "f"), Err(DescriptorError::Validation(_))), "{input}");
        }
    }

    #[test]
    fn object_keys() {
        let mut obj = IndexMap::new();
        obj.insert("url".to_string(), "https://example.com".to_string());
        let s = subs(&[("repo", ParamValue::Object(obj))]);
        assert_eq!(s.apply_str("$(params.repo.url)", "f").expect("key"), "https://example.com");
        assert!(matches!(s.apply_str("$(params.repo.branch)", "f"), Err(DescriptorError::Substitution { .. })));
    }
}
