//! Admin-Handler – Rundensteuerung, Spielerverwaltung, Export-Daten
//!
//! Admin-Kommandos bekommen keine direkte Antwort (ausser Fehler und
//! `GetSessionData`): die Admin-Konsole liest das Ergebnis aus dem
//! Broadcast, den sie wie jede andere Admin-Verbindung empfaengt.
//! Dadurch zeigen mehrere gleichzeitig verbundene Konsolen immer
//! denselben Stand.

use blitzbuzzer_protocol::control::{
    ControlMessage, ControlPayload, LockJoinsRequest, RemovePlayerRequest, RoundRecord,
    RoundStateEvent, SessionDataResponse,
};
use std::sync::Arc;

use super::{buzz_eintrag, runden_zustand_voll, spieler_liste_event};
use crate::server_state::SignalingState;

/// Oeffnet den Buzzer fuer die aktuelle Runde
///
/// Nur aus IDLE legal; auf illegalen Uebergang folgt kein Broadcast.
pub fn handle_open_buzzer(state: &Arc<SignalingState>) {
    let zustand = {
        let mut session = state.session.lock();
        if !session.buzzer_oeffnen() {
            return;
        }
        session.runden_zustand()
    };

    state.broadcaster.an_spieler_senden(ControlMessage::event(
        ControlPayload::RoundState(RoundStateEvent::schlank(zustand.phase, None)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::RoundState(runden_zustand_voll(&zustand)),
    ));
}

/// Schliesst den Buzzer (nur aus OPEN legal)
pub fn handle_close_buzzer(state: &Arc<SignalingState>) {
    let zustand = {
        let mut session = state.session.lock();
        if !session.buzzer_schliessen() {
            return;
        }
        session.runden_zustand()
    };

    state.broadcaster.an_spieler_senden(ControlMessage::event(
        ControlPayload::RoundState(RoundStateEvent::schlank(zustand.phase, None)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::RoundState(runden_zustand_voll(&zustand)),
    ));
}

/// Setzt die aktuelle Runde zurueck (aus jedem Zustand legal)
///
/// Die Spielerliste geht mit, weil der Reset die `buzzed`-Flags leert.
pub fn handle_reset_round(state: &Arc<SignalingState>) {
    let (zustand, liste) = {
        let mut session = state.session.lock();
        session.runde_zuruecksetzen();
        (session.runden_zustand(), session.spieler_liste())
    };

    state.broadcaster.an_spieler_senden(ControlMessage::event(
        ControlPayload::RoundState(RoundStateEvent::schlank(zustand.phase, None)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::RoundState(runden_zustand_voll(&zustand)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));
}

/// Archiviert die aktuelle Runde und beginnt die naechste
pub fn handle_next_round(state: &Arc<SignalingState>) {
    let (zustand, liste) = {
        let mut session = state.session.lock();
        session.naechste_runde();
        (session.runden_zustand(), session.spieler_liste())
    };

    // Spieler sehen die neue Rundennummer, aber nicht die Rangliste
    state.broadcaster.an_spieler_senden(ControlMessage::event(
        ControlPayload::RoundState(RoundStateEvent::schlank(
            zustand.phase,
            Some(zustand.round_number),
        )),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::RoundState(runden_zustand_voll(&zustand)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));
}

/// Entfernt einen Spieler per Teamnamen (Kick)
///
/// Der Spieler bekommt `Kicked`, danach trennt der Server die
/// Verbindung. Unbekannte Namen sind ein No-op.
pub fn handle_remove_player(request: RemovePlayerRequest, state: &Arc<SignalingState>) {
    let entfernt = {
        let mut session = state.session.lock();
        session
            .spieler_nach_name_entfernen(&request.team_name)
            .map(|(conn_id, spieler)| (conn_id, spieler, session.spieler_liste()))
    };

    let Some((conn_id, spieler, liste)) = entfernt else {
        tracing::debug!(team = %request.team_name, "Kick fuer unbekannten Teamnamen ignoriert");
        return;
    };

    tracing::info!(team = %spieler.team_name, verbindung = %conn_id, "Spieler entfernt");

    state
        .broadcaster
        .an_verbindung_senden(&conn_id, ControlMessage::event(ControlPayload::Kicked));
    state.broadcaster.verbindung_trennen(&conn_id);
    state.registry.entfernen(&conn_id);

    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));
}

/// Setzt die Beitritts-Sperre
pub fn handle_lock_joins(request: LockJoinsRequest, state: &Arc<SignalingState>) {
    state.session.lock().beitritt_sperren(request.locked);
    tracing::info!(gesperrt = request.locked, "Beitritts-Sperre geaendert");
}

/// Entfernt alle Spieler und trennt ihre Verbindungen
///
/// Anders als beim Einzel-Kick wird kein `Kicked` gesendet; die
/// Verbindungen werden kommentarlos geschlossen.
pub fn handle_clear_players(state: &Arc<SignalingState>) {
    // Erst unter dem Session-Lock leeren, dann genau die entfernten
    // Verbindungen trennen. Ein Join der nach dem Leeren serialisiert
    // wird, behaelt so seinen Session-Eintrag und seine Verbindung.
    let (entfernt, liste) = {
        let mut session = state.session.lock();
        let entfernt = session.spieler_leeren();
        (entfernt, session.spieler_liste())
    };

    for conn_id in &entfernt {
        state.broadcaster.verbindung_trennen(conn_id);
        state.registry.entfernen(conn_id);
    }

    tracing::info!("Alle Spieler entfernt");

    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));
}

/// Liefert die vollstaendigen Sitzungsdaten (Historie + laufende Runde)
pub fn handle_get_session_data(request_id: u32, state: &Arc<SignalingState>) -> ControlMessage {
    let daten = state.session.lock().sitzungsdaten();

    let rounds = daten
        .rounds
        .iter()
        .map(|runde| RoundRecord {
            round_number: runde.round_number,
            buzzes: runde.buzzes.iter().map(buzz_eintrag).collect(),
        })
        .collect();

    ControlMessage::new(
        request_id,
        ControlPayload::SessionData(SessionDataResponse { rounds }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SendeBefehl;
    use crate::server_state::SignalingConfig;
    use blitzbuzzer_core::types::{ConnectionId, Role, RoundPhase};
    use blitzbuzzer_session::SharedSession;
    use tokio::sync::mpsc;

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(SignalingConfig::default(), SharedSession::neu())
    }

    /// Registriert eine Verbindung in Broadcaster und Register
    fn verbinden(
        state: &Arc<SignalingState>,
        rolle: Role,
    ) -> (ConnectionId, mpsc::Receiver<SendeBefehl>) {
        let id = ConnectionId::new();
        state.registry.registrieren(id, rolle);
        let rx = state.broadcaster.client_registrieren(id, rolle);
        (id, rx)
    }

    fn naechste_nachricht(rx: &mut mpsc::Receiver<SendeBefehl>) -> ControlMessage {
        match rx.try_recv() {
            Ok(SendeBefehl::Nachricht(msg)) => msg,
            anderes => panic!("Erwartet Nachricht, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn open_buzzer_projiziert_rollenspezifisch() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (_, mut spieler_rx) = verbinden(&state, Role::Player);

        handle_open_buzzer(&state);

        // Spieler: schlanke Projektion ohne Rangliste
        let an_spieler = naechste_nachricht(&mut spieler_rx);
        match an_spieler.payload {
            ControlPayload::RoundState(e) => {
                assert_eq!(e.state, RoundPhase::Open);
                assert!(e.buzzes.is_none());
            }
            anderes => panic!("Erwartet RoundState, bekam {:?}", anderes),
        }

        // Admin: volle Projektion
        let an_admin = naechste_nachricht(&mut admin_rx);
        match an_admin.payload {
            ControlPayload::RoundState(e) => {
                assert_eq!(e.state, RoundPhase::Open);
                assert_eq!(e.buzzes, Some(vec![]));
                assert_eq!(e.round_number, Some(1));
            }
            anderes => panic!("Erwartet RoundState, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn illegaler_uebergang_broadcastet_nicht() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);

        // Close aus IDLE ist ein No-op
        handle_close_buzzer(&state);
        assert!(admin_rx.try_recv().is_err());

        // Open aus OPEN ebenfalls
        handle_open_buzzer(&state);
        let _ = naechste_nachricht(&mut admin_rx);
        handle_open_buzzer(&state);
        assert!(admin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn next_round_archiviert_und_informiert() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (_, mut spieler_rx) = verbinden(&state, Role::Player);

        handle_next_round(&state);

        let an_spieler = naechste_nachricht(&mut spieler_rx);
        match an_spieler.payload {
            ControlPayload::RoundState(e) => {
                assert_eq!(e.round_number, Some(2));
                assert_eq!(e.state, RoundPhase::Idle);
            }
            anderes => panic!("Erwartet RoundState, bekam {:?}", anderes),
        }

        // Admin: RoundState + PlayerList
        assert!(matches!(
            naechste_nachricht(&mut admin_rx).payload,
            ControlPayload::RoundState(_)
        ));
        assert!(matches!(
            naechste_nachricht(&mut admin_rx).payload,
            ControlPayload::PlayerList(_)
        ));

        // Runde 1 liegt jetzt im Archiv
        let daten = handle_get_session_data(9, &state);
        assert_eq!(daten.request_id, 9);
        match daten.payload {
            ControlPayload::SessionData(d) => {
                assert_eq!(d.rounds.len(), 2);
                assert_eq!(d.rounds[0].round_number, 1);
                assert_eq!(d.rounds[1].round_number, 2);
            }
            anderes => panic!("Erwartet SessionData, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn remove_player_kickt_und_trennt() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (spieler_id, mut spieler_rx) = verbinden(&state, Role::Player);
        state
            .session
            .lock()
            .spieler_hinzufuegen(spieler_id, "Alpha")
            .expect("Beitritt erwartet");

        handle_remove_player(
            RemovePlayerRequest {
                team_name: "Alpha".into(),
            },
            &state,
        );

        // Spieler: Kicked, dann Trennen
        assert!(matches!(
            naechste_nachricht(&mut spieler_rx).payload,
            ControlPayload::Kicked
        ));
        assert!(matches!(spieler_rx.try_recv(), Ok(SendeBefehl::Trennen)));
        assert!(state.registry.rolle_von(&spieler_id).is_none());

        // Admin: leere Spielerliste
        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerList(e) => assert!(e.players.is_empty()),
            anderes => panic!("Erwartet PlayerList, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn remove_player_unbekannter_name_ist_noop() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);

        handle_remove_player(
            RemovePlayerRequest {
                team_name: "Niemand".into(),
            },
            &state,
        );
        assert!(admin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_players_trennt_ohne_kicked() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (spieler_id, mut spieler_rx) = verbinden(&state, Role::Player);
        state
            .session
            .lock()
            .spieler_hinzufuegen(spieler_id, "Alpha")
            .expect("Beitritt erwartet");

        handle_clear_players(&state);

        // Kein Kicked, direkt Trennen
        assert!(matches!(spieler_rx.try_recv(), Ok(SendeBefehl::Trennen)));
        assert_eq!(state.session.lock().spieler_anzahl(), 0);

        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerList(e) => assert!(e.players.is_empty()),
            anderes => panic!("Erwartet PlayerList, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn clear_players_trennt_nur_beigetretene_spieler() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (beigetreten_id, mut beigetreten_rx) = verbinden(&state, Role::Player);
        let (nur_verbunden_id, mut nur_verbunden_rx) = verbinden(&state, Role::Player);
        state
            .session
            .lock()
            .spieler_hinzufuegen(beigetreten_id, "Alpha")
            .expect("Beitritt erwartet");

        handle_clear_players(&state);

        // Der beigetretene Spieler wird getrennt
        assert!(matches!(beigetreten_rx.try_recv(), Ok(SendeBefehl::Trennen)));
        assert!(state.registry.rolle_von(&beigetreten_id).is_none());

        // Die Verbindung ohne Session-Eintrag bleibt bestehen
        assert!(nur_verbunden_rx.try_recv().is_err());
        assert_eq!(
            state.registry.rolle_von(&nur_verbunden_id),
            Some(Role::Player)
        );

        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerList(e) => assert!(e.players.is_empty()),
            anderes => panic!("Erwartet PlayerList, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn lock_joins_sperrt_beitritt() {
        let state = test_state();
        handle_lock_joins(LockJoinsRequest { locked: true }, &state);
        assert!(state.session.lock().ist_beitritt_gesperrt());

        handle_lock_joins(LockJoinsRequest { locked: false }, &state);
        assert!(!state.session.lock().ist_beitritt_gesperrt());
    }
}
