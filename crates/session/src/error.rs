//! Fehlertypen fuer die Session-State-Machine
//!
//! Alle Fehler sind erwartbar und an den Aufrufer gerichtet – keiner
//! ist fatal fuer den Serverprozess. Ungueltige Eingaben erzeugen immer
//! ein typisiertes Ergebnis, nie eine Panik.

use thiserror::Error;

/// Fehler der Session-Operationen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Beitritt ist aktuell gesperrt
    #[error("Beitritt ist aktuell gesperrt")]
    BeitrittGesperrt,

    /// Teamname leer oder laenger als das Limit
    #[error("Ungueltiger Teamname: {0}")]
    UngueltigerName(String),

    /// Teamname bereits vergeben (Vergleich ohne Gross-/Kleinschreibung)
    #[error("Teamname bereits vergeben: {0}")]
    NameVergeben(String),

    /// Buzz ausserhalb einer offenen Runde
    #[error("Runde ist nicht offen")]
    RundeNichtOffen,

    /// Verbindung hat keinen registrierten Spieler
    #[error("Unbekannter Spieler")]
    UnbekannterSpieler,

    /// Spieler hat in dieser Runde bereits gebuzzert
    #[error("Bereits gebuzzert")]
    BereitsGebuzzert,
}

/// Result-Typ fuer Session-Operationen
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = SessionError::NameVergeben("Alpha".into());
        assert_eq!(e.to_string(), "Teamname bereits vergeben: Alpha");
        assert_eq!(
            SessionError::RundeNichtOffen.to_string(),
            "Runde ist nicht offen"
        );
    }
}
