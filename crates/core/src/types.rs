//! Gemeinsame Identifikations- und Zustandstypen fuer Blitzbuzzer
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird pro TCP-Verbindung beim Accept vergeben. Eine Verbindung, die
/// sich trennt und neu verbindet, bekommt eine neue ID – Verbindungen
/// werden nicht wiedervereint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Rolle einer Verbindung
///
/// Wird beim Hello-Handshake deklariert und bestimmt, welche Nachrichten
/// die Verbindung senden darf und welche Broadcasts sie empfaengt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Admin-Konsole: steuert Runden, sieht die volle Rangliste
    Admin,
    /// Spieler: tritt mit Teamnamen bei und buzzert
    Player,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Player => write!(f, "player"),
        }
    }
}

/// Zustand der aktuellen Runde
///
/// Bestimmt vollstaendig, welche Operationen legal sind:
/// Buzzes werden nur im Zustand `Open` angenommen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    /// Runde vorbereitet, Buzzer noch zu
    Idle,
    /// Buzzer offen, Buzzes werden angenommen
    Open,
    /// Buzzer geschlossen, Rangliste steht
    Closed,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "IDLE"),
            RoundPhase::Open => write!(f, "OPEN"),
            RoundPhase::Closed => write!(f, "CLOSED"),
        }
    }
}
