//! Handler fuer alle Control-Nachrichten
//!
//! Jeder Handler ist fuer einen bestimmten Nachrichtentyp zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.
//!
//! ## Fan-out-Disziplin
//! Alle Handler folgen demselben Muster: Session sperren, mutieren,
//! Snapshots ziehen, Lock freigeben, dann broadcasten. Unter dem Lock
//! wird nie auf die TCP-Verbindungen geschrieben.

pub mod admin_handler;
pub mod player_handler;

use blitzbuzzer_core::types::{ConnectionId, Role};
use blitzbuzzer_protocol::control::{
    BuzzEntry, ControlMessage, ControlPayload, ErrorCode, PlayerEntry, PlayerListEvent,
    RoundStateEvent,
};
use blitzbuzzer_session::{Buzz, Player, RoundSnapshot, SessionError};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Konvertiert einen Session-Buzz in den Protokoll-Eintrag
pub(crate) fn buzz_eintrag(buzz: &Buzz) -> BuzzEntry {
    BuzzEntry {
        team_name: buzz.team_name.clone(),
        rank: buzz.rank,
        timestamp_ns: buzz.timestamp_ns,
    }
}

/// Konvertiert einen Session-Spieler in den Protokoll-Eintrag
pub(crate) fn spieler_eintrag(spieler: &Player) -> PlayerEntry {
    PlayerEntry {
        team_name: spieler.team_name.clone(),
        join_order: spieler.join_order,
        buzzed: spieler.buzzed,
        online: spieler.online,
    }
}

/// Volle Rundenzustand-Projektion aus einem Snapshot (Admin-Sicht)
pub(crate) fn runden_zustand_voll(snapshot: &RoundSnapshot) -> RoundStateEvent {
    RoundStateEvent::voll(
        snapshot.round_number,
        snapshot.phase,
        snapshot.buzzes.iter().map(buzz_eintrag).collect(),
    )
}

/// Spielerlisten-Event aus einem Listen-Snapshot
pub(crate) fn spieler_liste_event(liste: &[(ConnectionId, Player)]) -> PlayerListEvent {
    PlayerListEvent {
        players: liste.iter().map(|(_, p)| spieler_eintrag(p)).collect(),
    }
}

/// Uebersetzt Session-Fehler in Protokoll-Fehlercodes
pub(crate) fn fehler_code(fehler: &SessionError) -> ErrorCode {
    match fehler {
        SessionError::BeitrittGesperrt => ErrorCode::JoinLocked,
        SessionError::UngueltigerName(_) => ErrorCode::InvalidName,
        SessionError::NameVergeben(_) => ErrorCode::DuplicateName,
        SessionError::RundeNichtOffen => ErrorCode::RoundNotOpen,
        SessionError::UnbekannterSpieler => ErrorCode::UnknownPlayer,
        SessionError::BereitsGebuzzert => ErrorCode::AlreadyBuzzed,
    }
}

/// Initiale Events nach erfolgreichem Hello
///
/// Admins bekommen den vollen Rundenzustand plus Spielerliste, Spieler
/// nur die schlanke Projektion mit Rundennummer.
pub(crate) fn initiale_events(rolle: Role, state: &Arc<SignalingState>) -> Vec<ControlMessage> {
    let (zustand, liste) = {
        let session = state.session.lock();
        (session.runden_zustand(), session.spieler_liste())
    };

    match rolle {
        Role::Admin => vec![
            ControlMessage::event(ControlPayload::RoundState(runden_zustand_voll(&zustand))),
            ControlMessage::event(ControlPayload::PlayerList(spieler_liste_event(&liste))),
        ],
        Role::Player => vec![ControlMessage::event(ControlPayload::RoundState(
            RoundStateEvent::schlank(zustand.phase, Some(zustand.round_number)),
        ))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_codes_vollstaendig_abgebildet() {
        assert_eq!(
            fehler_code(&SessionError::BeitrittGesperrt),
            ErrorCode::JoinLocked
        );
        assert_eq!(
            fehler_code(&SessionError::NameVergeben("Alpha".into())),
            ErrorCode::DuplicateName
        );
        assert_eq!(
            fehler_code(&SessionError::BereitsGebuzzert),
            ErrorCode::AlreadyBuzzed
        );
    }
}
