//! Ledger append-only de un run del pipeline.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{FoldEvent, FoldEventKind};
