//! Session- und Runden-State-Machine
//!
//! Die `Session` ist das autoritative In-Memory-Modell der laufenden
//! Buzzer-Sitzung: Spieler-Registry, Rundenlebenszyklus, Buzz-Rangliste
//! und Rundenhistorie. Alle Mutationen und Invarianten leben hier.
//!
//! ## Rundenlebenszyklus
//! ```text
//! IDLE -> OPEN -> CLOSED -> IDLE (via Reset oder naechste Runde)
//! ```
//!
//! ## Invarianten
//! - Raenge einer Runde bilden eine lueckenlose Folge 1..N in
//!   Ankunftsreihenfolge
//! - Pro Spieler hoechstens ein Buzz pro Runde (`buzzed`-Flag)
//! - Teamnamen sind unter den aktuell registrierten Spielern eindeutig
//!   (ohne Gross-/Kleinschreibung); nach Entfernen ist der Name sofort
//!   wieder frei
//! - `join_counter` wird nie wiederverwendet

use blitzbuzzer_core::types::{ConnectionId, RoundPhase};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::error::{SessionError, SessionResult};

/// Maximale Laenge eines Teamnamens (nach Trimmen)
pub const MAX_TEAMNAME_LAENGE: usize = 30;

// ---------------------------------------------------------------------------
// Datenmodell
// ---------------------------------------------------------------------------

/// Ein registrierter Spieler
///
/// Bleibt nach einem Verbindungsabbruch als Offline-Eintrag in der
/// Registry, damit Rang- und Historien-Referenzen gueltig bleiben.
/// Ein Wiederbeitritt erzeugt einen neuen Eintrag mit neuer
/// Beitrittsreihenfolge – alte und neue Eintraege werden nicht
/// zusammengefuehrt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Getrimmter Teamname
    pub team_name: String,
    /// Permanente Beitrittsreihenfolge, unveraenderlich nach Vergabe
    pub join_order: u64,
    /// Hat in der aktuellen Runde gebuzzert
    pub buzzed: bool,
    /// Verbindung noch aktiv
    pub online: bool,
}

/// Ein erfasster Buzz, unveraenderlich nach Erstellung
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buzz {
    /// Teamname zum Buzz-Zeitpunkt
    pub team_name: String,
    /// 1-basierter Ankunftsrang
    pub rank: u32,
    /// Monotoner Zeitstempel in Nanosekunden seit Session-Start;
    /// nur fuer Audit/Export, die Rangbildung basiert auf der
    /// Ankunftsreihenfolge
    pub timestamp_ns: u64,
}

/// Archivierte Runde
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundArchive {
    pub round_number: u32,
    pub buzzes: Vec<Buzz>,
}

/// Momentaufnahme der aktuellen Runde
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round_number: u32,
    pub phase: RoundPhase,
    pub buzzes: Vec<Buzz>,
}

/// Vollstaendige Sitzungsdaten: Historie plus laufende Runde
#[derive(Debug, Clone, Serialize)]
pub struct SessionData {
    pub rounds: Vec<RoundArchive>,
}

/// Ergebnis eines erfolgreichen Beitritts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beitritt {
    pub team_name: String,
    pub join_order: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Autoritativer Zustand einer Buzzer-Sitzung
///
/// Genau eine Instanz pro Serverprozess, explizit konstruiert und dem
/// Gateway beim Start uebergeben. Nicht thread-safe – der Aufrufer
/// serialisiert alle Zugriffe (siehe [`crate::shared::SharedSession`]).
#[derive(Debug)]
pub struct Session {
    /// Aktuelle Rundennummer, beginnt bei 1, streng monoton steigend
    round_number: u32,
    /// Zustand der aktuellen Runde
    phase: RoundPhase,
    /// Buzzes der aktuellen Runde, Einfuegereihenfolge = Rangfolge
    buzzes: Vec<Buzz>,
    /// Historie abgeschlossener Runden, nur anhaengend
    rounds: Vec<RoundArchive>,
    /// Spieler-Registry, indiziert nach Verbindungs-ID
    players: HashMap<ConnectionId, Player>,
    /// Sperre fuer neue Beitritte
    join_locked: bool,
    /// Monoton steigender Beitrittszaehler, wird nie wiederverwendet
    join_counter: u64,
    /// Startzeitpunkt fuer monotone Buzz-Zeitstempel
    gestartet: Instant,
}

impl Session {
    /// Erstellt eine neue Session (Runde 1, Zustand IDLE)
    pub fn neu() -> Self {
        Self {
            round_number: 1,
            phase: RoundPhase::Idle,
            buzzes: Vec::new(),
            rounds: Vec::new(),
            players: HashMap::new(),
            join_locked: false,
            join_counter: 0,
            gestartet: Instant::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Spieler-Verwaltung
    // -----------------------------------------------------------------------

    /// Registriert einen neuen Spieler
    ///
    /// Validiert den Namen (getrimmt, 1–30 Zeichen, eindeutig ohne
    /// Gross-/Kleinschreibung unter den aktuell registrierten Spielern)
    /// und vergibt die naechste Beitrittsreihenfolge.
    pub fn spieler_hinzufuegen(
        &mut self,
        id: ConnectionId,
        roh_name: &str,
    ) -> SessionResult<Beitritt> {
        if self.join_locked {
            return Err(SessionError::BeitrittGesperrt);
        }

        let name = roh_name.trim();
        if name.is_empty() {
            return Err(SessionError::UngueltigerName(
                "Teamname darf nicht leer sein".into(),
            ));
        }
        if name.chars().count() > MAX_TEAMNAME_LAENGE {
            return Err(SessionError::UngueltigerName(format!(
                "Teamname darf hoechstens {} Zeichen haben",
                MAX_TEAMNAME_LAENGE
            )));
        }

        let name_klein = name.to_lowercase();
        if self
            .players
            .values()
            .any(|p| p.team_name.to_lowercase() == name_klein)
        {
            return Err(SessionError::NameVergeben(name.to_string()));
        }

        self.join_counter += 1;
        let beitritt = Beitritt {
            team_name: name.to_string(),
            join_order: self.join_counter,
        };
        self.players.insert(
            id,
            Player {
                team_name: beitritt.team_name.clone(),
                join_order: beitritt.join_order,
                buzzed: false,
                online: true,
            },
        );

        tracing::info!(
            verbindung = %id,
            team = %beitritt.team_name,
            reihenfolge = beitritt.join_order,
            "Spieler beigetreten"
        );
        Ok(beitritt)
    }

    /// Entfernt einen Spieler anhand der Verbindungs-ID (harter Delete)
    pub fn spieler_entfernen(&mut self, id: ConnectionId) -> Option<Player> {
        let entfernt = self.players.remove(&id);
        if let Some(ref p) = entfernt {
            tracing::info!(verbindung = %id, team = %p.team_name, "Spieler entfernt");
        }
        entfernt
    }

    /// Entfernt einen Spieler anhand des exakten Teamnamens (Kick)
    ///
    /// Gibt Verbindungs-ID und Datensatz zurueck, damit der Aufrufer
    /// die darunterliegende Verbindung trennen kann.
    pub fn spieler_nach_name_entfernen(
        &mut self,
        team_name: &str,
    ) -> Option<(ConnectionId, Player)> {
        let id = self
            .players
            .iter()
            .find(|(_, p)| p.team_name == team_name)
            .map(|(id, _)| *id)?;
        let player = self.players.remove(&id)?;
        tracing::info!(verbindung = %id, team = %player.team_name, "Spieler gekickt");
        Some((id, player))
    }

    /// Markiert einen Spieler als offline ohne ihn zu loeschen
    ///
    /// Der Eintrag bleibt erhalten, damit Historie und Rangliste weiter
    /// auf ihn verweisen koennen. Gibt den Spieler nur beim ersten
    /// Uebergang online -> offline zurueck; danach `None`.
    pub fn spieler_offline_setzen(&mut self, id: ConnectionId) -> Option<Player> {
        let player = self.players.get_mut(&id)?;
        if !player.online {
            return None;
        }
        player.online = false;
        Some(player.clone())
    }

    /// Entfernt alle Spieler und setzt den Beitrittszaehler zurueck
    ///
    /// Rundenzustand und Historie bleiben unberuehrt. Gibt die
    /// Verbindungs-IDs der entfernten Spieler zurueck, damit der
    /// Aufrufer genau diese Verbindungen trennen kann.
    pub fn spieler_leeren(&mut self) -> Vec<ConnectionId> {
        let entfernt: Vec<ConnectionId> = self.players.keys().copied().collect();
        self.players.clear();
        self.join_counter = 0;
        tracing::info!(anzahl = entfernt.len(), "Alle Spieler entfernt");
        entfernt
    }

    /// Setzt oder loest die Beitritts-Sperre
    pub fn beitritt_sperren(&mut self, gesperrt: bool) {
        self.join_locked = gesperrt;
        tracing::debug!(gesperrt, "Beitritts-Sperre gesetzt");
    }

    /// Gibt alle Spieler sortiert nach Beitrittsreihenfolge zurueck
    pub fn spieler_liste(&self) -> Vec<(ConnectionId, Player)> {
        let mut liste: Vec<(ConnectionId, Player)> = self
            .players
            .iter()
            .map(|(id, p)| (*id, p.clone()))
            .collect();
        liste.sort_by_key(|(_, p)| p.join_order);
        liste
    }

    /// Gibt den Spieler-Datensatz einer Verbindung zurueck
    pub fn spieler(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    // -----------------------------------------------------------------------
    // Runden-Verwaltung
    // -----------------------------------------------------------------------

    /// Oeffnet den Buzzer (nur aus IDLE legal)
    ///
    /// Leert die Buzz-Liste und setzt alle `buzzed`-Flags zurueck.
    /// Gibt `false` zurueck (keine Zustandsaenderung) wenn die Runde
    /// nicht IDLE ist.
    pub fn buzzer_oeffnen(&mut self) -> bool {
        if self.phase != RoundPhase::Idle {
            return false;
        }
        self.phase = RoundPhase::Open;
        self.buzzes.clear();
        self.buzz_flags_zuruecksetzen();
        tracing::info!(runde = self.round_number, "Buzzer geoeffnet");
        true
    }

    /// Schliesst den Buzzer (nur aus OPEN legal)
    pub fn buzzer_schliessen(&mut self) -> bool {
        if self.phase != RoundPhase::Open {
            return false;
        }
        self.phase = RoundPhase::Closed;
        tracing::info!(
            runde = self.round_number,
            buzzes = self.buzzes.len(),
            "Buzzer geschlossen"
        );
        true
    }

    /// Setzt die aktuelle Runde zurueck (aus jedem Zustand legal)
    ///
    /// Erzwingt IDLE und leert die Buzz-Liste. Archiviert nichts und
    /// erhoeht die Rundennummer nicht.
    pub fn runde_zuruecksetzen(&mut self) {
        self.phase = RoundPhase::Idle;
        self.buzzes.clear();
        self.buzz_flags_zuruecksetzen();
        tracing::info!(runde = self.round_number, "Runde zurueckgesetzt");
    }

    /// Archiviert die aktuelle Runde und beginnt die naechste
    ///
    /// Haengt `{round_number, buzzes}` an die Historie an, erhoeht die
    /// Rundennummer und erzwingt IDLE. Gibt die neue Rundennummer
    /// zurueck.
    pub fn naechste_runde(&mut self) -> u32 {
        self.rounds.push(RoundArchive {
            round_number: self.round_number,
            buzzes: std::mem::take(&mut self.buzzes),
        });
        self.round_number += 1;
        self.phase = RoundPhase::Idle;
        self.buzz_flags_zuruecksetzen();
        tracing::info!(runde = self.round_number, "Naechste Runde");
        self.round_number
    }

    // -----------------------------------------------------------------------
    // Buzz-Erfassung
    // -----------------------------------------------------------------------

    /// Erfasst einen Buzz fuer die gegebene Verbindung
    ///
    /// Der Rang ergibt sich rein aus der Reihenfolge erfolgreicher
    /// Aufrufe – der Aufrufer serialisiert konkurrierende Buzzes, damit
    /// die Folge 1..N lueckenlos bleibt.
    pub fn buzz_erfassen(&mut self, id: ConnectionId) -> SessionResult<Buzz> {
        if self.phase != RoundPhase::Open {
            return Err(SessionError::RundeNichtOffen);
        }

        let timestamp_ns = self.gestartet.elapsed().as_nanos() as u64;
        let player = self
            .players
            .get_mut(&id)
            .ok_or(SessionError::UnbekannterSpieler)?;

        if player.buzzed {
            return Err(SessionError::BereitsGebuzzert);
        }
        player.buzzed = true;

        let buzz = Buzz {
            team_name: player.team_name.clone(),
            rank: self.buzzes.len() as u32 + 1,
            timestamp_ns,
        };
        self.buzzes.push(buzz.clone());

        tracing::info!(
            team = %buzz.team_name,
            rang = buzz.rank,
            "Buzz erfasst"
        );
        Ok(buzz)
    }

    // -----------------------------------------------------------------------
    // Projektionen
    // -----------------------------------------------------------------------

    /// Momentaufnahme der aktuellen Runde
    pub fn runden_zustand(&self) -> RoundSnapshot {
        RoundSnapshot {
            round_number: self.round_number,
            phase: self.phase,
            buzzes: self.buzzes.clone(),
        }
    }

    /// Vollstaendige Sitzungsdaten fuer den Export
    ///
    /// Die laufende Runde wird der Historie angehaengt, damit auch ein
    /// Export mitten in einer Runde nichts verliert.
    pub fn sitzungsdaten(&self) -> SessionData {
        let mut rounds = self.rounds.clone();
        rounds.push(RoundArchive {
            round_number: self.round_number,
            buzzes: self.buzzes.clone(),
        });
        SessionData { rounds }
    }

    /// Aktuelle Rundennummer
    pub fn runden_nummer(&self) -> u32 {
        self.round_number
    }

    /// Aktueller Rundenzustand
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Ist der Beitritt aktuell gesperrt?
    pub fn ist_beitritt_gesperrt(&self) -> bool {
        self.join_locked
    }

    /// Anzahl registrierter Spieler (online und offline)
    pub fn spieler_anzahl(&self) -> usize {
        self.players.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn buzz_flags_zuruecksetzen(&mut self) {
        for player in self.players.values_mut() {
            player.buzzed = false;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
