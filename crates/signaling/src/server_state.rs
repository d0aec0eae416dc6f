//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt die geteilte Session und die Zustands-Manager als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use blitzbuzzer_session::SharedSession;
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::EventBroadcaster;
use crate::registry::ConnectionRegistry;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Clients
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Blitzbuzzer Server".to_string(),
            max_clients: 128,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Wettbewerbs-Session (Runden, Spieler, Buzzes)
    pub session: SharedSession,
    /// Verbindungs-Register (Rollen, Teamnamen)
    pub registry: ConnectionRegistry,
    /// Event-Broadcaster (Nachrichten an Clients senden)
    pub broadcaster: EventBroadcaster,
    /// Startzeitpunkt des Servers
    pub start_zeit: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen Server-Zustand
    pub fn neu(config: SignalingConfig, session: SharedSession) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            session,
            registry: ConnectionRegistry::neu(),
            broadcaster: EventBroadcaster::neu(),
            start_zeit: Instant::now(),
        })
    }

    /// Laufzeit des Servers in Sekunden
    pub fn uptime_sek(&self) -> u64 {
        self.start_zeit.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_konfiguration() {
        let config = SignalingConfig::default();
        assert_eq!(config.max_clients, 128);
        assert_eq!(config.keepalive_sek, 30);
    }

    #[test]
    fn state_erstellen() {
        let state = SignalingState::neu(SignalingConfig::default(), SharedSession::neu());
        assert_eq!(state.registry.anzahl(), 0);
        assert_eq!(state.broadcaster.client_anzahl(), 0);
    }
}
