use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{FoldEvent, FoldEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore: Send {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, run_id: Uuid, kind: FoldEventKind) -> FoldEvent;
    /// Eventos de un run en orden ascendente de seq.
    fn list(&self, run_id: Uuid) -> Vec<FoldEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: HashMap<Uuid, Vec<FoldEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids de los runs registrados.
    pub fn runs(&self) -> Vec<Uuid> {
        self.inner.keys().copied().collect()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: FoldEventKind) -> FoldEvent {
        let events = self.inner.entry(run_id).or_default();
        let ev = FoldEvent { seq: events.len() as u64,
                             run_id,
                             kind,
                             ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<FoldEvent> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}

impl<T: EventStore + ?Sized> EventStore for &mut T {
    fn append_kind(&mut self, run_id: Uuid, kind: FoldEventKind) -> FoldEvent {
        (**self).append_kind(run_id, kind)
    }

    fn list(&self, run_id: Uuid) -> Vec<FoldEvent> {
        (**self).list(run_id)
    }
}
