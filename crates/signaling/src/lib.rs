//! blitzbuzzer-signaling – TCP Control Layer
//!
//! Dieser Crate implementiert das Gateway des Buzzer-Servers. Er
//! verwaltet TCP-Verbindungen, routet Nachrichten an die Handler und
//! faechert Zustandsaenderungen rollenspezifisch an alle Clients auf.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Hello deklariert die Rolle (Admin oder Spieler)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- AdminHandler   (Open, Close, Reset, NextRound, Kick, Lock, Clear, Export)
//!     +-- PlayerHandler  (Join, Buzz, Verbindungsabbruch)
//!
//! ConnectionRegistry – Wer ist verbunden, als welche Rolle
//! EventBroadcaster   – Events an Admin- und Spieler-Gruppen senden
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::{EventBroadcaster, SendeBefehl};
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use registry::ConnectionRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
