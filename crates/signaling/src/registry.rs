//! Verbindungs-Register – Wer ist gerade verbunden, und als was?
//!
//! Das Register fuehrt pro TCP-Verbindung die deklarierte Rolle und
//! (fuer Spieler nach erfolgreichem Join) den zugeordneten Teamnamen.
//! Es liefert die Rollen-Aufloesung fuer den Dispatcher und die
//! Verbindungs-Metadaten beim Kick.

use blitzbuzzer_core::types::{ConnectionId, Role};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

// ---------------------------------------------------------------------------
// ConnectionInfo
// ---------------------------------------------------------------------------

/// Metadaten einer registrierten Verbindung
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub conn_id: ConnectionId,
    pub rolle: Role,
    /// Teamname, sobald ein Spieler erfolgreich beigetreten ist
    pub team_name: Option<String>,
    /// Zeitpunkt der Registrierung
    pub verbunden_seit: Instant,
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Thread-safe Register aller Verbindungen mit deklarierter Rolle
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<ConnectionId, ConnectionInfo>>,
}

impl ConnectionRegistry {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Registriert eine Verbindung mit ihrer Rolle (nach dem Hello)
    pub fn registrieren(&self, conn_id: ConnectionId, rolle: Role) {
        self.inner.insert(
            conn_id,
            ConnectionInfo {
                conn_id,
                rolle,
                team_name: None,
                verbunden_seit: Instant::now(),
            },
        );
    }

    /// Ordnet einer Spieler-Verbindung ihren Teamnamen zu
    pub fn team_zuordnen(&self, conn_id: &ConnectionId, team_name: String) {
        if let Some(mut info) = self.inner.get_mut(conn_id) {
            info.team_name = Some(team_name);
        }
    }

    /// Entfernt eine Verbindung aus dem Register
    pub fn entfernen(&self, conn_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.inner.remove(conn_id).map(|(_, info)| info)
    }

    /// Rolle einer Verbindung
    pub fn rolle_von(&self, conn_id: &ConnectionId) -> Option<Role> {
        self.inner.get(conn_id).map(|info| info.rolle)
    }

    /// Teamname einer Verbindung (falls beigetreten)
    pub fn team_von(&self, conn_id: &ConnectionId) -> Option<String> {
        self.inner.get(conn_id).and_then(|info| info.team_name.clone())
    }

    /// Anzahl aller registrierten Verbindungen
    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }

    /// Anzahl der Admin-Verbindungen
    pub fn admin_anzahl(&self) -> usize {
        self.inner.iter().filter(|e| e.rolle == Role::Admin).count()
    }

    /// Anzahl der Spieler-Verbindungen
    pub fn spieler_anzahl(&self) -> usize {
        self.inner
            .iter()
            .filter(|e| e.rolle == Role::Player)
            .count()
    }

}

impl Default for ConnectionRegistry {
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

    #[test]
    fn registrieren_und_rolle_abfragen() {
        let register = ConnectionRegistry::neu();
        let id = ConnectionId::new();
        register.registrieren(id, Role::Admin);

        assert_eq!(register.rolle_von(&id), Some(Role::Admin));
        assert_eq!(register.anzahl(), 1);
        assert_eq!(register.admin_anzahl(), 1);
        assert_eq!(register.spieler_anzahl(), 0);
    }

    #[test]
    fn team_zuordnung_nach_join() {
        let register = ConnectionRegistry::neu();
        let id = ConnectionId::new();
        register.registrieren(id, Role::Player);
        assert_eq!(register.team_von(&id), None);

        register.team_zuordnen(&id, "Alpha".into());
        assert_eq!(register.team_von(&id), Some("Alpha".into()));
    }

    #[test]
    fn entfernen_gibt_info_zurueck() {
        let register = ConnectionRegistry::neu();
        let id = ConnectionId::new();
        register.registrieren(id, Role::Player);

        let info = register.entfernen(&id).expect("Info erwartet");
        assert_eq!(info.rolle, Role::Player);
        assert_eq!(register.anzahl(), 0);
        assert!(register.entfernen(&id).is_none());
    }
}
