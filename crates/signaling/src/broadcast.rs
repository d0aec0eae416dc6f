//! Event-Broadcaster – Sendet Events an alle relevanten Clients
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen Clients
//! und stellt Methoden bereit, um Nachrichten gezielt oder rollenweise zu
//! senden.
//!
//! ## Selektives Broadcasting
//! - An alle Admin-Konsolen: `an_admins_senden`
//! - An alle Spieler: `an_spieler_senden`
//! - An eine einzelne Verbindung: `an_verbindung_senden`
//!
//! Neben Nachrichten kann der Broadcaster eine Verbindung auch aktiv
//! trennen (`verbindung_trennen`) – der Verbindungs-Task beendet sich
//! dann, sobald er den Befehl aus seiner Queue liest.

use blitzbuzzer_core::types::{ConnectionId, Role};
use blitzbuzzer_protocol::control::ControlMessage;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// SendeBefehl
// ---------------------------------------------------------------------------

/// Befehl an den Verbindungs-Task eines Clients
#[derive(Debug)]
pub enum SendeBefehl {
    /// Nachricht ueber die TCP-Verbindung ausliefern
    Nachricht(ControlMessage),
    /// Verbindung serverseitig schliessen (Kick, ClearPlayers)
    Trennen,
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub conn_id: ConnectionId,
    pub rolle: Role,
    pub tx: mpsc::Sender<SendeBefehl>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        self.befehl_senden(SendeBefehl::Nachricht(nachricht))
    }

    fn befehl_senden(&self, befehl: SendeBefehl) -> bool {
        match self.tx.try_send(befehl) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.conn_id, "Send-Queue voll – Befehl verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.conn_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach ConnectionId
    clients: DashMap<ConnectionId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Client und gibt seine Receive-Queue zurueck
    ///
    /// Der Verbindungs-Task liest aus der Queue und schreibt die Befehle
    /// auf die TCP-Verbindung. Registrierung geschieht nach dem Hello.
    pub fn client_registrieren(
        &self,
        conn_id: ConnectionId,
        rolle: Role,
    ) -> mpsc::Receiver<SendeBefehl> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner
            .clients
            .insert(conn_id, ClientSender { conn_id, rolle, tx });
        tracing::debug!(verbindung = %conn_id, rolle = %rolle, "Client beim Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client aus dem Broadcaster
    pub fn client_entfernen(&self, conn_id: &ConnectionId) {
        self.inner.clients.remove(conn_id);
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_registriert(&self, conn_id: &ConnectionId) -> bool {
        self.inner.clients.contains_key(conn_id)
    }

    /// Anzahl der registrierten Clients
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    ///
    /// Gibt `false` zurueck wenn die Verbindung unbekannt ist oder
    /// das Senden fehlschlaegt.
    pub fn an_verbindung_senden(&self, conn_id: &ConnectionId, nachricht: ControlMessage) -> bool {
        match self.inner.clients.get(conn_id) {
            Some(sender) => sender.senden(nachricht),
            None => false,
        }
    }

    /// Sendet eine Nachricht an alle Admin-Konsolen
    ///
    /// Gibt die Anzahl der erfolgreich beschickten Clients zurueck.
    pub fn an_admins_senden(&self, nachricht: ControlMessage) -> usize {
        self.an_rolle_senden(Role::Admin, nachricht)
    }

    /// Sendet eine Nachricht an alle Spieler
    pub fn an_spieler_senden(&self, nachricht: ControlMessage) -> usize {
        self.an_rolle_senden(Role::Player, nachricht)
    }

    fn an_rolle_senden(&self, rolle: Role, nachricht: ControlMessage) -> usize {
        let mut gesendet = 0;
        for eintrag in self.inner.clients.iter() {
            if eintrag.rolle == rolle && eintrag.senden(nachricht.clone()) {
                gesendet += 1;
            }
        }
        gesendet
    }

    /// Weist den Verbindungs-Task an, die Verbindung zu schliessen
    ///
    /// Der Client wird sofort aus dem Broadcaster entfernt; zuvor in
    /// seine Queue gelegte Nachrichten (z.B. `Kicked`) werden noch
    /// ausgeliefert bevor der Task sich beendet.
    pub fn verbindung_trennen(&self, conn_id: &ConnectionId) -> bool {
        match self.inner.clients.remove(conn_id) {
            Some((_, sender)) => sender.befehl_senden(SendeBefehl::Trennen),
            None => false,
        }
    }

}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blitzbuzzer_protocol::control::ControlPayload;

    fn test_nachricht() -> ControlMessage {
        ControlMessage::event(ControlPayload::OpenBuzzer)
    }

    #[tokio::test]
    async fn registrieren_und_einzeln_senden() {
        let broadcaster = EventBroadcaster::neu();
        let id = ConnectionId::new();
        let mut rx = broadcaster.client_registrieren(id, Role::Player);

        assert!(broadcaster.ist_registriert(&id));
        assert!(broadcaster.an_verbindung_senden(&id, test_nachricht()));

        match rx.recv().await {
            Some(SendeBefehl::Nachricht(msg)) => assert_eq!(msg.request_id, 0),
            anderes => panic!("Erwartet Nachricht, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn rollen_gruppen_sind_getrennt() {
        let broadcaster = EventBroadcaster::neu();
        let admin = ConnectionId::new();
        let spieler = ConnectionId::new();
        let mut admin_rx = broadcaster.client_registrieren(admin, Role::Admin);
        let mut spieler_rx = broadcaster.client_registrieren(spieler, Role::Player);

        assert_eq!(broadcaster.an_admins_senden(test_nachricht()), 1);
        assert!(admin_rx.try_recv().is_ok());
        assert!(spieler_rx.try_recv().is_err());

        assert_eq!(broadcaster.an_spieler_senden(test_nachricht()), 1);
        assert!(spieler_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn trennen_liefert_befehl_und_entfernt_client() {
        let broadcaster = EventBroadcaster::neu();
        let id = ConnectionId::new();
        let mut rx = broadcaster.client_registrieren(id, Role::Player);

        assert!(broadcaster.verbindung_trennen(&id));
        assert!(!broadcaster.ist_registriert(&id));

        match rx.recv().await {
            Some(SendeBefehl::Trennen) => {}
            anderes => panic!("Erwartet Trennen, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn senden_an_unbekannte_verbindung_schlaegt_fehl() {
        let broadcaster = EventBroadcaster::neu();
        assert!(!broadcaster.an_verbindung_senden(&ConnectionId::new(), test_nachricht()));
        assert!(!broadcaster.verbindung_trennen(&ConnectionId::new()));
    }

    #[tokio::test]
    async fn kicked_vor_trennen_bleibt_in_der_queue() {
        let broadcaster = EventBroadcaster::neu();
        let id = ConnectionId::new();
        let mut rx = broadcaster.client_registrieren(id, Role::Player);

        broadcaster.an_verbindung_senden(&id, ControlMessage::event(ControlPayload::Kicked));
        broadcaster.verbindung_trennen(&id);

        match rx.recv().await {
            Some(SendeBefehl::Nachricht(msg)) => {
                assert!(matches!(msg.payload, ControlPayload::Kicked));
            }
            anderes => panic!("Erwartet Kicked, bekam {:?}", anderes),
        }
        assert!(matches!(rx.recv().await, Some(SendeBefehl::Trennen)));
    }
}
