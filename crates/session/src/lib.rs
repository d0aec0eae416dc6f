//! blitzbuzzer-session – Session- und Runden-State-Machine
//!
//! Autoritatives In-Memory-Modell der Buzzer-Sitzung: Spieler,
//! Rundenlebenszyklus, Buzz-Rangfolge und Historie. Der Zustand lebt
//! nur im Speicher und beginnt bei jedem Prozessstart neu.

pub mod error;
pub mod session;
pub mod shared;

// Bequeme Re-Exporte
pub use error::{SessionError, SessionResult};
pub use session::{Beitritt, Buzz, Player, RoundArchive, RoundSnapshot, Session, SessionData};
pub use shared::SharedSession;
