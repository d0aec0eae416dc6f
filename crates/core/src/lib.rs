//! blitzbuzzer-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Blitzbuzzer-Crates gemeinsam genutzt werden: Verbindungs-IDs,
//! Rollen und der Rundenzustand.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ConnectionId, Role, RoundPhase};
