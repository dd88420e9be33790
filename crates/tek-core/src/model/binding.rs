use crate::constants::SOURCE_WORKSPACE;
use crate::snapshot::Directory;

/// Workspace con su ruta efectiva y su contenido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkspaceBinding {
    pub name: String,
    pub mount_path: String,
    pub content: Directory,
}

impl ResolvedWorkspaceBinding {
    pub fn is_source(&self) -> bool {
        self.name == SOURCE_WORKSPACE
    }
}
