//! Fold secuencial de steps sobre snapshots.
//!
//! `PipelineFolder` conduce la máquina de estados de un `FoldRun`, registra
//! el ledger de eventos y, al final, delega la persistencia en `Exporter`.

pub mod folder;
pub mod run;

pub use folder::PipelineFolder;
pub use run::{FoldRun, FoldState};
