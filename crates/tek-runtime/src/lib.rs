//! tek-runtime: backends concretos del motor de snapshots.
//!
//! - `DockerBackend`: ejecuta cada `exec` con el CLI de docker.
//! - `GitFetcher` / `PathFetcher` / `AutoFetcher`: obtienen el source inicial.
pub mod docker;
pub mod source;

pub use docker::DockerBackend;
pub use source::{AutoFetcher, GitFetcher, PathFetcher};
