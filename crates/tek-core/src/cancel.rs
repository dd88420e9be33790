//! Cancelación cooperativa de un run.
//!
//! `CancelHandle` es el lado que cancela; `CancelSignal` es el lado que cada
//! punto de suspensión (evaluación de source, de cada step, export) consulta
//! mediante `guard`. Se apoya en `tokio::sync::watch`.

use std::future::Future;

use tokio::sync::watch;

use crate::errors::CoreEngineError;

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Crea un par handle/señal enlazados.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace no falla aunque no queden receptores
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

impl CancelSignal {
    /// Señal que nunca se dispara.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Se completa cuando el run se cancela; si el handle desapareció sin
    /// cancelar, no se completa nunca.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Ejecuta `fut` salvo que el run se cancele antes de que termine.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, CoreEngineError>
        where F: Future<Output = T>
    {
        if self.is_cancelled() {
            return Err(CoreEngineError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CoreEngineError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
