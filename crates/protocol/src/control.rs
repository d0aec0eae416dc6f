//! Control-Protokoll (TCP)
//!
//! Definiert alle Nachrichten die ueber die TCP-Verbindung zwischen
//! Admin-Konsole, Spieler-Clients und Server ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht traegt eine `request_id: u32` zur Zuordnung
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enum fuer typsichere Nachrichtentypen
//! - Der Rundenzustand wird je nach Publikum unterschiedlich
//!   projiziert: Spieler bekommen nur `{state, round_number}`,
//!   Admins zusaetzlich die volle Buzz-Rangliste

use blitzbuzzer_core::types::{Role, RoundPhase};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses und Join-Ablehnungen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    NotFound,
    // Beitritt
    JoinLocked,
    InvalidName,
    DuplicateName,
    // Buzz
    RoundNotOpen,
    UnknownPlayer,
    AlreadyBuzzed,
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Erste Nachricht jeder Verbindung: deklariert die Rolle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloRequest {
    /// Gewuenschte Rolle dieser Verbindung
    pub role: Role,
}

/// Bestaetigung des Handshakes
///
/// Der aktuelle Rundenzustand (und fuer Admins die Spielerliste)
/// folgt unmittelbar danach als separate Events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    /// Zugewiesene Rolle
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Spieler-Nachrichten
// ---------------------------------------------------------------------------

/// Beitrittsanfrage eines Spielers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Gewuenschter Teamname (wird serverseitig getrimmt und validiert)
    pub team_name: String,
}

/// Direkte Antwort auf eine Beitrittsanfrage
///
/// Der Sender darf das Ergebnis nicht aus einem spaeteren Broadcast
/// ableiten muessen – Erfolg und Fehlergrund stehen hier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub success: bool,
    /// Zugewiesener (getrimmter) Teamname bei Erfolg
    pub team_name: Option<String>,
    /// Beitrittsreihenfolge bei Erfolg
    pub join_order: Option<u64>,
    /// Ablehnungsgrund bei Misserfolg
    pub error: Option<ErrorCode>,
}

impl JoinResponse {
    /// Erstellt eine Erfolgs-Antwort
    pub fn erfolg(team_name: String, join_order: u64) -> Self {
        Self {
            success: true,
            team_name: Some(team_name),
            join_order: Some(join_order),
            error: None,
        }
    }

    /// Erstellt eine Ablehnung mit Fehlergrund
    pub fn abgelehnt(error: ErrorCode) -> Self {
        Self {
            success: false,
            team_name: None,
            join_order: None,
            error: Some(error),
        }
    }
}

/// Private Rang-Mitteilung an den buzzenden Spieler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuzzRankEvent {
    /// 1-basierter Ankunftsrang in der aktuellen Runde
    pub rank: u32,
}

// ---------------------------------------------------------------------------
// Admin-Nachrichten
// ---------------------------------------------------------------------------

/// Spieler per Teamnamen entfernen (Kick)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovePlayerRequest {
    pub team_name: String,
}

/// Beitritts-Sperre setzen oder aufheben
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockJoinsRequest {
    pub locked: bool,
}

// ---------------------------------------------------------------------------
// Server-Events
// ---------------------------------------------------------------------------

/// Ein erfasster Buzz innerhalb einer Runde
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzEntry {
    /// Teamname zum Buzz-Zeitpunkt (entkoppelt von spaeteren Aenderungen)
    pub team_name: String,
    /// 1-basierter Ankunftsrang
    pub rank: u32,
    /// Monotoner Zeitstempel in Nanosekunden seit Session-Start
    /// (nur fuer Audit/Export, nicht fuer die Rangbildung)
    pub timestamp_ns: u64,
}

/// Eintrag der Spielerliste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub team_name: String,
    /// Permanente Beitrittsreihenfolge (stabile Sortierung)
    pub join_order: u64,
    /// Hat dieses Team in der aktuellen Runde bereits gebuzzert?
    pub buzzed: bool,
    /// Verbindung noch aktiv?
    pub online: bool,
}

/// Rundenzustand-Event
///
/// Felder sind nur gesetzt wenn sie fuer das Publikum relevant sind:
/// Spieler erhalten `{state, round_number}`, Admins den vollen Zustand
/// inklusive Buzz-Rangliste.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStateEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    pub state: RoundPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buzzes: Option<Vec<BuzzEntry>>,
}

impl RoundStateEvent {
    /// Volle Projektion fuer die Admin-Konsole
    pub fn voll(round_number: u32, state: RoundPhase, buzzes: Vec<BuzzEntry>) -> Self {
        Self {
            round_number: Some(round_number),
            state,
            buzzes: Some(buzzes),
        }
    }

    /// Schlanke Projektion fuer Spieler (kein Blick auf die Rangliste)
    pub fn schlank(state: RoundPhase, round_number: Option<u32>) -> Self {
        Self {
            round_number,
            state,
            buzzes: None,
        }
    }
}

/// Aktualisierte Spielerliste (sortiert nach Beitrittsreihenfolge)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerListEvent {
    pub players: Vec<PlayerEntry>,
}

/// Ein Spieler ist beigetreten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedEvent {
    pub team_name: String,
    pub join_order: u64,
}

/// Ein Spieler hat die Verbindung verloren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftEvent {
    pub team_name: String,
}

/// Ein Buzz wurde erfasst (Admin-Benachrichtigung)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuzzReceivedEvent {
    pub team_name: String,
    pub rank: u32,
    pub timestamp_ns: u64,
}

/// Archivierte Runde im Export-Format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: u32,
    pub buzzes: Vec<BuzzEntry>,
}

/// Vollstaendige Sitzungsdaten (Historie plus laufende Runde)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDataResponse {
    pub rounds: Vec<RoundRecord>,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Handshake
    Hello(HelloRequest),
    HelloResponse(HelloResponse),

    // Admin -> Server
    OpenBuzzer,
    CloseBuzzer,
    ResetRound,
    NextRound,
    RemovePlayer(RemovePlayerRequest),
    LockJoins(LockJoinsRequest),
    ClearPlayers,
    GetSessionData,

    // Spieler -> Server
    Join(JoinRequest),
    Buzz,

    // Server -> Admin
    RoundState(RoundStateEvent),
    PlayerList(PlayerListEvent),
    PlayerJoined(PlayerJoinedEvent),
    PlayerLeft(PlayerLeftEvent),
    BuzzReceived(BuzzReceivedEvent),
    SessionData(SessionDataResponse),

    // Server -> Spieler
    JoinResult(JoinResponse),
    BuzzRank(BuzzRankEvent),
    Kicked,

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Fehler
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Nachricht traegt eine `request_id` die der Client vergibt.
/// Der Server kopiert die ID in die direkte Antwort; Broadcasts tragen
/// die `request_id` 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Eindeutige Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt ein Broadcast-Event (request_id 0)
    pub fn event(payload: ControlPayload) -> Self {
        Self::new(0, payload)
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
