//! tekflow: ejecuta Tekton `Task`s como una cadena de snapshots de contenedor.
//!
//! Los crates del workspace hacen el trabajo; aquí sólo vive la capa de
//! aplicación (configuración, errores con código de salida y orquestación).
pub mod config;
pub mod errors;
pub mod run;

pub use config::RunConfig;
pub use errors::AppError;
