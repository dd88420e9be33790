//! `LocalEngine`: evaluador del álgebra de snapshots.
//!
//! Interpreta `Directory`/`Container` delegando cada `exec` a un
//! `ExecBackend` y la recuperación del código fuente a un `SourceFetcher`.
//! Los árboles evaluados se internan en un store direccionado por contenido;
//! un contenedor ya evaluado (mismo fingerprint) no vuelve a ejecutarse
//! dentro de la vida del engine.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};

use super::{Container, ContainerOp, Directory, DirectoryOp, ExecBackend, ExecRequest, FsTree, SnapshotEngine, SnapshotId,
            SourceFetcher};
use crate::errors::EngineError;

type TreeFuture<'a> = Pin<Box<dyn Future<Output = Result<Arc<FsTree>, EngineError>> + Send + 'a>>;

pub struct LocalEngine<B, F>
    where B: ExecBackend,
          F: SourceFetcher
{
    backend: B,
    fetcher: F,
    store: DashMap<SnapshotId, Arc<FsTree>>,
    evaluated: DashMap<String, Arc<FsTree>>,
}

impl<B, F> LocalEngine<B, F>
    where B: ExecBackend,
          F: SourceFetcher
{
    pub fn new(backend: B, fetcher: F) -> Self {
        Self { backend,
               fetcher,
               store: DashMap::new(),
               evaluated: DashMap::new() }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Interna un árbol y devuelve su identidad.
    pub fn insert_tree(&self, tree: FsTree) -> SnapshotId {
        self.intern(Arc::new(tree))
    }

    /// Árbol previamente internado.
    pub fn tree(&self, id: &SnapshotId) -> Option<Arc<FsTree>> {
        self.store.get(id).map(|t| Arc::clone(t.value()))
    }

    pub fn snapshot_count(&self) -> usize {
        self.store.len()
    }

    fn intern(&self, tree: Arc<FsTree>) -> SnapshotId {
        let id = tree.digest();
        self.store.entry(id.clone()).or_insert(tree);
        id
    }

    fn evaluate<'a>(&'a self, directory: &'a Directory) -> TreeFuture<'a> {
        Box::pin(async move {
            match directory.op() {
                DirectoryOp::Empty => Ok(Arc::new(FsTree::new())),
                DirectoryOp::Snapshot(id) => self.tree(id).ok_or_else(|| EngineError::UnknownSnapshot(id.to_string())),
                DirectoryOp::Source { repository, branch } => {
                    info!("fetching source {repository}@{branch}");
                    let tree = self.fetcher.fetch(repository, branch).await?;
                    Ok(Arc::new(tree))
                }
                DirectoryOp::WithDirectory { base, path, child } => {
                    let base = self.evaluate(base).await?;
                    let child = self.evaluate(child).await?;
                    Ok(Arc::new(base.with_subtree(path, &child)))
                }
                DirectoryOp::FromContainer { container, path } => {
                    let rootfs = self.run_container(container).await?;
                    Ok(Arc::new(rootfs.subtree(path)))
                }
            }
        })
    }

    fn run_container<'a>(&'a self, container: &'a Container) -> TreeFuture<'a> {
        Box::pin(async move {
            let key = container.fingerprint();
            if let Some(done) = self.evaluated.get(&key).map(|t| Arc::clone(t.value())) {
                debug!("container {} already evaluated", &key[..12]);
                return Ok(done);
            }

            let mut image: Option<&str> = None;
            let mut workdir = "/";
            let mut rootfs = FsTree::new();
            for op in container.ops() {
                match op {
                    ContainerOp::From { image: i } => {
                        image = Some(i.as_str());
                        rootfs = FsTree::new();
                    }
                    ContainerOp::Workdir { path } => workdir = path.as_str(),
                    ContainerOp::NewFile { path, contents, permissions } => {
                        rootfs.insert_file(path, contents.as_bytes().to_vec(), *permissions)
                    }
                    ContainerOp::Directory { path, directory } => {
                        let child = self.evaluate(directory).await?;
                        rootfs = rootfs.with_subtree(path, &child);
                    }
                    ContainerOp::Exec { argv } => {
                        let image = image.ok_or(EngineError::MissingImage)?;
                        info!("exec {argv:?} in {image} (workdir {workdir})");
                        rootfs = self.backend
                                     .exec(ExecRequest { image,
                                                         workdir,
                                                         argv,
                                                         rootfs: &rootfs })
                                     .await?;
                    }
                }
            }

            let rootfs = Arc::new(rootfs);
            self.evaluated.insert(key, Arc::clone(&rootfs));
            Ok(rootfs)
        })
    }
}

#[async_trait]
impl<B, F> SnapshotEngine for LocalEngine<B, F>
    where B: ExecBackend,
          F: SourceFetcher
{
    async fn resolve(&self, directory: &Directory) -> Result<SnapshotId, EngineError> {
        let tree = self.evaluate(directory).await?;
        let id = self.intern(tree);
        debug!("resolved {} -> {}", &directory.fingerprint()[..12], id.short());
        Ok(id)
    }

    async fn export(&self, directory: &Directory, destination: &Path) -> Result<bool, EngineError> {
        if destination.exists() && !destination.is_dir() {
            log::warn!("export destination {} exists and is not a directory", destination.display());
            return Ok(false);
        }
        let tree = self.evaluate(directory).await?;
        super::fs::write_tree(&tree, destination).await?;
        info!("exported {} files to {}", tree.len(), destination.display());
        Ok(true)
    }
}
