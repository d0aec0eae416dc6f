//! blitzbuzzer-export – CSV- und JSON-Export der Sitzungsdaten
//!
//! Rendert die Sitzungsdaten (Historie plus laufende Runde) als CSV
//! oder pretty-printed JSON und schreibt sie mit Zeitstempel im
//! Dateinamen in ein Zielverzeichnis.
//!
//! ## CSV-Format
//! ```text
//! Round,Rank,Team Name
//! 1,1,"Team Alpha"
//! 1,2,"Team Bravo"
//! ```
//! Teamnamen stehen immer in Anfuehrungszeichen; enthaltene
//! Anfuehrungszeichen werden verdoppelt.

use blitzbuzzer_session::SessionData;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Schreiben der Datei fehlgeschlagen
    #[error("IO-Fehler beim Export: {0}")]
    Io(#[from] std::io::Error),

    /// JSON-Serialisierung fehlgeschlagen
    #[error("JSON-Serialisierung fehlgeschlagen: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Rendert die Sitzungsdaten als CSV
///
/// Eine Zeile pro Buzz; Runden ohne Buzzes erscheinen nicht.
pub fn csv_rendern(daten: &SessionData) -> String {
    let mut csv = String::from("Round,Rank,Team Name\n");
    for runde in &daten.rounds {
        for buzz in &runde.buzzes {
            csv.push_str(&format!(
                "{},{},\"{}\"\n",
                runde.round_number,
                buzz.rank,
                buzz.team_name.replace('"', "\"\"")
            ));
        }
    }
    csv
}

/// Rendert die Sitzungsdaten als pretty-printed JSON
pub fn json_rendern(daten: &SessionData) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(daten)?)
}

// ---------------------------------------------------------------------------
// Datei-Export
// ---------------------------------------------------------------------------

/// Dateiname mit Zeitstempel, z.B. `blitzbuzzer-results-20260829-143052.csv`
fn export_dateiname(endung: &str) -> String {
    let zeitstempel = chrono::Local::now().format("%Y%m%d-%H%M%S");
    format!("blitzbuzzer-results-{}.{}", zeitstempel, endung)
}

/// Schreibt die Sitzungsdaten als CSV in das Zielverzeichnis
///
/// Gibt den Pfad der geschriebenen Datei zurueck.
pub fn csv_exportieren(daten: &SessionData, verzeichnis: &Path) -> ExportResult<PathBuf> {
    let pfad = verzeichnis.join(export_dateiname("csv"));
    std::fs::write(&pfad, csv_rendern(daten))?;
    tracing::info!(pfad = %pfad.display(), "CSV-Export geschrieben");
    Ok(pfad)
}

/// Schreibt die Sitzungsdaten als JSON in das Zielverzeichnis
pub fn json_exportieren(daten: &SessionData, verzeichnis: &Path) -> ExportResult<PathBuf> {
    let pfad = verzeichnis.join(export_dateiname("json"));
    std::fs::write(&pfad, json_rendern(daten)?)?;
    tracing::info!(pfad = %pfad.display(), "JSON-Export geschrieben");
    Ok(pfad)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
