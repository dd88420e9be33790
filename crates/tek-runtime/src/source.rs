//! Obtención del snapshot inicial del código fuente.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::info;
use tek_core::errors::EngineError;
use tek_core::snapshot::fs::read_tree;
use tek_core::{FsTree, SourceFetcher};

/// Entradas que nunca forman parte del snapshot.
const SKIPPED: &[&str] = &[".git"];

fn source_error(repository: &str, reason: impl Into<String>) -> EngineError {
    EngineError::Source { repository: repository.to_string(),
                          reason: reason.into() }
}

/// `git clone --depth 1 --branch <branch>` en un directorio temporal.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self { program: "git".into() }
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binario de git a usar.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, repository: &str, branch: &str) -> Result<FsTree, EngineError> {
        let temp = tempfile::tempdir()?;
        let checkout = temp.path().join("checkout");
        info!("cloning {repository}@{branch}");
        let output = tokio::process::Command::new(&self.program).args(["clone", "--depth", "1", "--branch", branch, repository])
                                                                .arg(&checkout)
                                                                .stdin(Stdio::null())
                                                                .kill_on_drop(true)
                                                                .output()
                                                                .await
                                                                .map_err(|e| {
                                                                    source_error(repository,
                                                                                 format!("cannot run '{}': {e}",
                                                                                         self.program))
                                                                })?;
        if !output.status.success() {
            return Err(source_error(repository, String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        read_tree(&checkout, SKIPPED).await
    }
}

/// Directorio local tratado como repositorio. `branch` se ignora.
#[derive(Debug, Clone, Default)]
pub struct PathFetcher {
    base: Option<PathBuf>,
}

impl PathFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rutas relativas se resuelven contra `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: Some(base.into()) }
    }

    fn locate(&self, repository: &str) -> PathBuf {
        match &self.base {
            Some(base) if Path::new(repository).is_relative() => base.join(repository),
            _ => PathBuf::from(repository),
        }
    }
}

#[async_trait]
impl SourceFetcher for PathFetcher {
    async fn fetch(&self, repository: &str, _branch: &str) -> Result<FsTree, EngineError> {
        let root = self.locate(repository);
        if !root.is_dir() {
            return Err(source_error(repository, format!("{} is not a directory", root.display())));
        }
        info!("importing {}", root.display());
        read_tree(&root, SKIPPED).await
    }
}

/// Directorio local si existe; si no, `git clone`.
#[derive(Debug, Clone, Default)]
pub struct AutoFetcher {
    git: GitFetcher,
    path: PathFetcher,
}

impl AutoFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceFetcher for AutoFetcher {
    async fn fetch(&self, repository: &str, branch: &str) -> Result<FsTree, EngineError> {
        if Path::new(repository).is_dir() {
            self.path.fetch(repository, branch).await
        } else {
            self.git.fetch(repository, branch).await
        }
    }
}
