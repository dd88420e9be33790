//! Orquestación de la aplicación: task YAML → `TaskSpec` → fold → export.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::Serialize;
use serde_json::{json, Value};
use tek_core::{AggregateOutput, BuiltStep, CancelHandle, CancelSignal, Directory, ExportReport, PipelineFolder,
               SeededSuffix, SnapshotEngine, StepResult, TaskSpec};
use tek_descriptor::{load_task, resolve, ParamValue, TaskRunParams};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::errors::AppError;

/// Resumen de un run exportado.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub task: String,
    pub steps: Vec<StepResult>,
    pub aggregate: AggregateOutput,
    pub run_fingerprint: Option<String>,
    pub export: ExportReport,
    pub events: Vec<&'static str>,
}

/// `name=value`. Valores que empiezan con `[` o `{` se leen como YAML
/// (arrays y objetos); el resto es string literal.
pub fn parse_param(raw: &str) -> Result<(String, ParamValue), AppError> {
    let (name, value) = raw.split_once('=')
                           .filter(|(name, _)| !name.trim().is_empty())
                           .ok_or_else(|| AppError::Argument(format!("param '{raw}' is not name=value")))?;
    let trimmed = value.trim_start();
    let value = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        serde_yaml::from_str(value).map_err(|e| AppError::Argument(format!("param '{name}': {e}")))?
    } else {
        ParamValue::String(value.to_string())
    };
    Ok((name.trim().to_string(), value))
}

/// `name` o `name=claim`.
pub fn parse_workspace(raw: &str) -> Result<(String, Option<String>), AppError> {
    let (name, claim) = match raw.split_once('=') {
        Some((name, claim)) => (name, Some(claim.to_string())),
        None => (raw, None),
    };
    if name.trim().is_empty() {
        return Err(AppError::Argument(format!("workspace '{raw}' has no name")));
    }
    Ok((name.trim().to_string(), claim))
}

/// Arma los parámetros del TaskRun a partir de los flags del CLI.
pub fn run_params(params: &[String], workspaces: &[String]) -> Result<TaskRunParams, AppError> {
    let mut run = TaskRunParams::new();
    for raw in params {
        let (name, value) = parse_param(raw)?;
        run = run.with_param(name, value);
    }
    for raw in workspaces {
        let (name, claim) = parse_workspace(raw)?;
        run = run.with_workspace(name, claim);
    }
    Ok(run)
}

/// Carga y resuelve una task: defaults, sustitución y validación.
pub fn load_spec(task_file: &Path, run: &TaskRunParams) -> Result<TaskSpec, AppError> {
    let document = load_task(task_file)?;
    Ok(resolve(&document, run)?)
}

pub fn initial_source(config: &RunConfig) -> Directory {
    Directory::source(config.repository.as_str(), config.branch.as_str())
}

fn folder_for<E: SnapshotEngine>(engine: E, config: &RunConfig, cancel: CancelSignal) -> PipelineFolder<E> {
    let folder = PipelineFolder::new(engine).with_cancel(cancel);
    match config.seed {
        Some(seed) => folder.with_suffixes(SeededSuffix::new(seed)),
        None => folder,
    }
}

/// Contenedores que ejecutaría cada step, sin evaluar nada.
pub fn plan<E: SnapshotEngine>(engine: E, spec: &TaskSpec, config: &RunConfig) -> Result<Vec<BuiltStep>, AppError> {
    let mut folder = folder_for(engine, config, CancelSignal::never());
    Ok(folder.plan(spec, initial_source(config))?)
}

/// Representación JSON de un plan.
pub fn describe_plan(spec: &TaskSpec, planned: &[BuiltStep]) -> Value {
    let steps: Vec<Value> = spec.steps
                                .iter()
                                .zip(planned)
                                .map(|(step, built)| {
                                    json!({
                                        "name": step.name,
                                        "argv": built.argv,
                                        "script": built.script.as_ref().map(|s| s.path.clone()),
                                        "container": built.container.describe(),
                                    })
                                })
                                .collect();
    json!({ "task": spec.name, "steps": steps })
}

/// Ejecuta todos los steps y exporta el agregado a `config.output`.
pub async fn execute<E: SnapshotEngine>(engine: E,
                                        spec: TaskSpec,
                                        config: &RunConfig,
                                        cancel: CancelSignal)
                                        -> Result<RunSummary, AppError> {
    let mut folder = folder_for(engine, config, cancel);
    let mut run = folder.start(spec, initial_source(config));
    info!("run {} for task '{}' from {}@{}",
          run.run_id(),
          run.task().name,
          config.repository,
          config.branch);
    folder.run_to_completion(&mut run).await?;
    let export = folder.export(&run, &config.output).await?;

    Ok(RunSummary { run_id: run.run_id(),
                    task: run.task().name.clone(),
                    steps: run.results().to_vec(),
                    aggregate: run.aggregate().clone(),
                    run_fingerprint: run.run_fingerprint().map(str::to_string),
                    export,
                    events: folder.event_codes(run.run_id()) })
}

/// Aplica un plazo a `work`; al vencer cancela el run en curso.
pub async fn with_deadline<T, Fut>(work: Fut, timeout: Option<Duration>, handle: &CancelHandle) -> Result<T, AppError>
    where Fut: Future<Output = Result<T, AppError>>
{
    let Some(limit) = timeout else {
        return work.await;
    };
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            handle.cancel();
            Err(AppError::Timeout(limit))
        }
    }
}
