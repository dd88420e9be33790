//! Puente entre `FsTree` y el filesystem del host.
//!
//! Sólo archivos regulares: los symlinks se omiten (con un `debug!`) y los
//! directorios vacíos se pierden, igual que en el modelo de `FsTree`.

use std::path::{Path, PathBuf};

use log::debug;

use super::FsTree;
use crate::errors::EngineError;

/// Escribe `tree` bajo `root`, creando directorios intermedios.
pub async fn write_tree(tree: &FsTree, root: &Path) -> Result<(), EngineError> {
    tokio::fs::create_dir_all(root).await?;
    for (rel, entry) in tree.iter() {
        let full = root.join(rel);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, &entry.contents).await?;
        set_mode(&full, entry.permissions).await?;
    }
    Ok(())
}

/// Lee recursivamente `root` como árbol. Las entradas cuyo nombre esté en
/// `skip` (p.ej. `.git`) se ignoran en cualquier nivel.
pub async fn read_tree(root: &Path, skip: &[&str]) -> Result<FsTree, EngineError> {
    let mut tree = FsTree::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];
    while let Some((dir, rel)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if skip.contains(&name.as_str()) {
                continue;
            }
            let child_rel = if rel.is_empty() { name } else { format!("{rel}/{name}") };
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push((entry.path(), child_rel));
            } else if file_type.is_file() {
                let metadata = entry.metadata().await?;
                let contents = tokio::fs::read(entry.path()).await?;
                tree.insert_file(&child_rel, contents, mode_of(&metadata));
            } else {
                debug!("skipping non-regular entry {}", entry.path().display());
            }
        }
    }
    Ok(tree)
}

#[cfg(unix)]
fn mode_of(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(_metadata: &std::fs::Metadata) -> u32 {
    crate::constants::DEFAULT_FILE_PERMISSIONS
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), EngineError> {
    Ok(())
}
