use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::{error, warn};
use tek_core::{cancel_pair, LocalEngine};
use tek_runtime::{AutoFetcher, DockerBackend};
use tekflow::config::RunConfig;
use tekflow::errors::AppError;
use tekflow::run::{describe_plan, execute, load_spec, plan, run_params, with_deadline};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tekflow", version, about = "Run Tekton Tasks as chained container snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, resolve and validate a Task without running it
    Validate(TaskArgs),
    /// Print the container each step would run
    Plan(TaskArgs),
    /// Run every step and export the aggregate output
    Run {
        #[command(flatten)]
        task: TaskArgs,
        /// Export destination
        #[arg(long, env = "TEKFLOW_OUTPUT")]
        output: Option<PathBuf>,
        /// Abort the run after this many seconds
        #[arg(long, env = "TEKFLOW_TIMEOUT_SECS")]
        timeout: Option<u64>,
        /// Docker-compatible CLI used to run steps
        #[arg(long, env = "TEKFLOW_DOCKER")]
        docker: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TaskArgs {
    /// Task YAML file
    file: PathBuf,
    /// Parameter as name=value; arrays as name=[a,b]
    #[arg(short, long = "param")]
    params: Vec<String>,
    /// Workspace binding as name or name=claim
    #[arg(short, long = "workspace")]
    workspaces: Vec<String>,
    /// Git URL or local directory with the initial source
    #[arg(long, env = "TEKFLOW_REPOSITORY")]
    repository: Option<String>,
    #[arg(long, env = "TEKFLOW_BRANCH")]
    branch: Option<String>,
    /// Seed for reproducible script names
    #[arg(long, env = "TEKFLOW_SEED")]
    seed: Option<u64>,
}

impl TaskArgs {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(repository) = &self.repository {
            config.repository = repository.clone();
        }
        if let Some(branch) = &self.branch {
            config.branch = branch.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn engine(config: &RunConfig) -> LocalEngine<DockerBackend, AutoFetcher> {
    LocalEngine::new(DockerBackend::new().with_program(config.docker.as_str()), AutoFetcher::new())
}

async fn dispatch(command: Command) -> Result<(), AppError> {
    let mut config = RunConfig::from_env();
    match command {
        Command::Validate(args) => {
            args.apply(&mut config);
            let spec = load_spec(&args.file, &run_params(&args.params, &args.workspaces)?)?;
            println!("task '{}' is valid ({} steps, {} workspaces)",
                     spec.name,
                     spec.steps.len(),
                     spec.workspaces.len());
        }
        Command::Plan(args) => {
            args.apply(&mut config);
            let spec = load_spec(&args.file, &run_params(&args.params, &args.workspaces)?)?;
            let planned = plan(engine(&config), &spec, &config)?;
            let rendered = serde_json::to_string_pretty(&describe_plan(&spec, &planned))
                .map_err(|e| AppError::Argument(e.to_string()))?;
            println!("{rendered}");
        }
        Command::Run { task, output, timeout, docker } => {
            task.apply(&mut config);
            if let Some(output) = output {
                config.output = output;
            }
            if let Some(secs) = timeout {
                config.timeout = Some(std::time::Duration::from_secs(secs));
            }
            if let Some(docker) = docker {
                config.docker = docker;
            }
            let spec = load_spec(&task.file, &run_params(&task.params, &task.workspaces)?)?;

            let (handle, signal) = cancel_pair();
            let handle = Arc::new(handle);
            let on_interrupt = Arc::clone(&handle);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling run");
                    on_interrupt.cancel();
                }
            });

            let summary = with_deadline(execute(engine(&config), spec, &config, signal), config.timeout, &handle).await?;
            for step in &summary.steps {
                println!("step {} '{}' -> {}", step.step_index, step.step_name, step.snapshot.short());
            }
            println!("exported {} to {}",
                     summary.export.tracked_paths.join(", "),
                     summary.export.destination.display());
            if let Some(fingerprint) = &summary.run_fingerprint {
                println!("run fingerprint {fingerprint}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    tekflow::config::init_dotenv();

    let cli = Cli::parse();
    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
