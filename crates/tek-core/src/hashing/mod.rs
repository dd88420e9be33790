//! Módulo de hashing y canonicalización JSON.
//!
//! Toda identidad del core (snapshots, fingerprints de contenedor, de step y
//! de run) sale de estas funciones.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_bytes, hash_str, hash_value};
