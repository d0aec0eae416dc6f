//! blitzbuzzer-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert den geschlossenen Nachrichtenwortschatz
//! zwischen Admin-Konsole, Spieler-Clients und Server sowie das
//! Frame-Format auf der TCP-Leitung.

pub mod control;
pub mod wire;

pub use control::{ControlMessage, ControlPayload, ErrorCode};
pub use wire::FrameCodec;
