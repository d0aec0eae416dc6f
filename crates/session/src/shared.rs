//! Thread-sichere Huelle um die Session
//!
//! Die Session selbst ist nicht thread-safe; alle Mutationen muessen
//! in einem einzigen globalen kritischen Abschnitt pro Instanz laufen,
//! damit zwei fast gleichzeitige Buzzes zu einer strikten,
//! lueckenlosen Rangfolge serialisiert werden.
//!
//! Unter dem Lock wird nie blockierendes I/O ausgefuehrt: Handler
//! nehmen den Guard, mutieren, ziehen eine Momentaufnahme und geben
//! den Guard frei, bevor sie broadcasten.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::session::Session;

/// Arc-geteilte, Mutex-geschuetzte Session
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    /// Erstellt eine neue geteilte Session (Runde 1, IDLE)
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Session::neu())),
        }
    }

    /// Nimmt den globalen Session-Lock
    ///
    /// Der Guard darf nicht ueber einen `.await`-Punkt gehalten werden.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock()
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitzbuzzer_core::types::ConnectionId;

    #[test]
    fn clone_teilt_inneren_state() {
        let a = SharedSession::neu();
        let b = a.clone();

        a.lock()
            .spieler_hinzufuegen(ConnectionId::new(), "Alpha")
            .unwrap();
        assert_eq!(b.lock().spieler_anzahl(), 1);
    }

    #[test]
    fn konkurrierende_buzzes_bleiben_lueckenlos() {
        let session = SharedSession::neu();
        let ids: Vec<ConnectionId> = (0..8)
            .map(|i| {
                let id = ConnectionId::new();
                session
                    .lock()
                    .spieler_hinzufuegen(id, &format!("Team {}", i))
                    .unwrap();
                id
            })
            .collect();
        session.lock().buzzer_oeffnen();

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let session = session.clone();
                std::thread::spawn(move || session.lock().buzz_erfassen(id).unwrap().rank)
            })
            .collect();

        let mut raenge: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        raenge.sort_unstable();
        assert_eq!(raenge, (1..=8).collect::<Vec<u32>>());
    }
}
