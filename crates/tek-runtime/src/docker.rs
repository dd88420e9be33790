//! Ejecución de steps con `docker run`.
//!
//! El filesystem rastreado del contenedor se materializa en un directorio
//! temporal; cada directorio de primer nivel se monta con `-v` en su ruta
//! absoluta y, al terminar, se vuelve a leer. Lo que el proceso escriba fuera
//! de esos montajes se descarta. `/tekton` se monta siempre, con
//! `RESULTS_DIR` ya creado.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use tek_core::errors::EngineError;
use tek_core::snapshot::fs::{read_tree, write_tree};
use tek_core::constants::RESULTS_DIR;
use tek_core::snapshot::normalize_path;
use tek_core::{ExecBackend, ExecRequest, FsTree};

const IMAGE_MISSING_MARKERS: &[&str] = &["Unable to find image", "pull access denied", "manifest unknown"];

#[derive(Debug, Clone)]
pub struct DockerBackend {
    program: String,
    extra_args: Vec<String>,
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self { program: "docker".into(),
               extra_args: Vec::new() }
    }
}

impl DockerBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binario compatible con el CLI de docker (p.ej. `podman`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argumentos extra para `run` (p.ej. `--network=none`).
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Directorios de primer nivel a montar: los del árbol, el del workdir y
    /// el de resultados.
    fn mounted_dirs(request: &ExecRequest<'_>) -> Vec<String> {
        let mut dirs: Vec<String> = request.rootfs.top_level_dirs().into_iter().map(str::to_string).collect();
        let results = normalize_path(RESULTS_DIR);
        let workdir = normalize_path(request.workdir);
        for path in [workdir.as_str(), results.as_str()] {
            if let Some(top) = path.split('/').next().filter(|t| !t.is_empty()) {
                if !dirs.iter().any(|d| d == top) {
                    dirs.push(top.to_string());
                }
            }
        }
        dirs
    }

    /// Argumentos de `docker run` para `request` con el árbol en `scratch`.
    pub fn run_args(&self, request: &ExecRequest<'_>, scratch: &Path) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string(), "-w".to_string(), request.workdir.to_string()];
        for dir in Self::mounted_dirs(request) {
            args.push("-v".into());
            args.push(format!("{}:/{dir}", scratch.join(&dir).display()));
        }
        args.extend(self.extra_args.iter().cloned());
        if let Some((entrypoint, rest)) = request.argv.split_first() {
            args.push("--entrypoint".into());
            args.push(entrypoint.clone());
            args.push(request.image.to_string());
            args.extend(rest.iter().cloned());
        } else {
            args.push(request.image.to_string());
        }
        args
    }
}

#[async_trait]
impl ExecBackend for DockerBackend {
    async fn exec(&self, request: ExecRequest<'_>) -> Result<FsTree, EngineError> {
        let scratch = tempfile::tempdir()?;
        write_tree(request.rootfs, scratch.path()).await?;
        tokio::fs::create_dir_all(scratch.path().join(normalize_path(request.workdir))).await?;
        tokio::fs::create_dir_all(scratch.path().join(normalize_path(RESULTS_DIR))).await?;

        let args = self.run_args(&request, scratch.path());
        debug!("{} {}", self.program, args.join(" "));
        let output = tokio::process::Command::new(&self.program).args(&args)
                                                                .stdin(Stdio::null())
                                                                .kill_on_drop(true)
                                                                .output()
                                                                .await
                                                                .map_err(|e| {
                                                                    EngineError::Backend(format!("cannot run '{}': {e}",
                                                                                                 self.program))
                                                                })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if IMAGE_MISSING_MARKERS.iter().any(|m| stderr.contains(m)) {
                return Err(EngineError::ImageUnavailable { image: request.image.to_string(),
                                                           reason: stderr.trim().to_string() });
            }
            return Err(EngineError::ExecFailed { argv: request.argv.to_vec(),
                                                 code: output.status.code(),
                                                 stderr });
        }
        info!("{} {:?} ok", request.image, request.argv);

        let mut tree = request.rootfs.clone();
        for dir in Self::mounted_dirs(&request) {
            let sub = read_tree(&scratch.path().join(&dir), &[]).await?;
            tree = tree.with_subtree(&dir, &sub);
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rootfs() -> FsTree {
        let mut t = FsTree::new();
        t.insert_file("workspace/source/main.go", b"package main".to_vec(), 0o644);
        t.insert_file("tekton/scripts/build-abcde", b"#!/bin/sh\n".to_vec(), 0o755);
        t
    }

    #[test]
    fn run_args_mount_top_level_dirs_and_override_entrypoint() {
        let tree = rootfs();
        let argv = vec!["/tekton/scripts/build-abcde".to_string()];
        let request = ExecRequest { image: "golang:1.22",
                                    workdir: "/workspace/source",
                                    argv: &argv,
                                    rootfs: &tree };
        let args = DockerBackend::new().with_extra_args(vec!["--network=none".into()])
                                       .run_args(&request, Path::new("/scratch"));
        assert_eq!(args,
                   vec!["run",
                        "--rm",
                        "-w",
                        "/workspace/source",
                        "-v",
                        "/scratch/tekton:/tekton",
                        "-v",
                        "/scratch/workspace:/workspace",
                        "--network=none",
                        "--entrypoint",
                        "/tekton/scripts/build-abcde",
                        "golang:1.22"]);
    }

    #[test]
    fn workdir_is_mounted_even_when_empty() {
        let tree = FsTree::new();
        let argv = vec!["go".to_string(), "version".to_string()];
        let request = ExecRequest { image: "golang",
                                    workdir: "/workspace/source",
                                    argv: &argv,
                                    rootfs: &tree };
        let args = DockerBackend::new().run_args(&request, Path::new("/s"));
        assert!(args.contains(&"/s/workspace:/workspace".to_string()));
        assert!(args.contains(&"/s/tekton:/tekton".to_string()));
        assert_eq!(&args[args.len() - 3..], ["go", "golang", "version"]);
    }

    #[tokio::test]
    async fn missing_program_is_a_backend_error() {
        let tree = rootfs();
        let argv = vec!["true".to_string()];
        let request = ExecRequest { image: "alpine",
                                    workdir: "/workspace/source",
                                    argv: &argv,
                                    rootfs: &tree };
        let err = DockerBackend::new().with_program("tekflow-no-such-docker")
                                      .exec(request)
                                      .await
                                      .expect_err("no program");
        assert!(matches!(err, EngineError::Backend(_)));
    }

    /// Programa falso que tarda `delay` segundos y luego crea `marker`.
    #[cfg(unix)]
    fn slow_program(dir: &Path, marker: &Path, delay: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let program = dir.join("fake-docker");
        std::fs::write(&program,
                       format!("#!/bin/sh\nsleep {delay}\ntouch '{}'\n", marker.display()))
            .expect("write program");
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        program.display().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_exec_kills_the_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("marker");
        let program = slow_program(dir.path(), &marker, "1");
        let tree = rootfs();
        let argv = vec!["true".to_string()];
        let request = ExecRequest { image: "alpine",
                                    workdir: "/workspace/source",
                                    argv: &argv,
                                    rootfs: &tree };
        let backend = DockerBackend::new().with_program(program);
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(200), backend.exec(request)).await;
        assert!(outcome.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1800)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn results_dir_exists_during_exec() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let seen = dir.path().join("seen");
        let program = dir.path().join("fake-docker");
        // anota el -v de /tekton y comprueba que results exista en el host
        std::fs::write(&program,
                       format!("#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in *:/tekton) test -d \"${{a%:/tekton}}/results\" && touch '{}';; esac; done\nexit 0\n",
                               seen.display()))
            .expect("write program");
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let tree = FsTree::new();
        let argv = vec!["go".to_string(), "build".to_string()];
        let request = ExecRequest { image: "golang",
                                    workdir: "/workspace/source",
                                    argv: &argv,
                                    rootfs: &tree };
        DockerBackend::new().with_program(program.display().to_string())
                            .exec(request)
                            .await
                            .expect("exec");
        assert!(seen.exists());
    }
}
