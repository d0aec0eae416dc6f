//! Spieler-Handler – Beitritt, Buzz, Verbindungsabbruch
//!
//! Der Buzz-Pfad ist der zeitkritische Teil des Servers: Session
//! sperren, Rang vergeben, Snapshots ziehen, Lock freigeben, dann
//! broadcasten. Der Rang entsteht ausschliesslich unter dem Lock,
//! damit die Folge 1..N lueckenlos bleibt.

use blitzbuzzer_core::types::ConnectionId;
use blitzbuzzer_protocol::control::{
    BuzzRankEvent, BuzzReceivedEvent, ControlMessage, ControlPayload, JoinRequest, JoinResponse,
    PlayerJoinedEvent, PlayerLeftEvent,
};
use std::sync::Arc;

use super::{fehler_code, runden_zustand_voll, spieler_liste_event};
use crate::server_state::SignalingState;

/// Verarbeitet eine Beitrittsanfrage
///
/// Der Anfragende bekommt immer eine direkte Antwort mit Ergebnis und
/// ggf. Fehlergrund; die Admin-Konsolen werden nur bei Erfolg
/// informiert.
pub fn handle_join(
    request: JoinRequest,
    request_id: u32,
    conn_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> ControlMessage {
    let ergebnis = {
        let mut session = state.session.lock();
        session
            .spieler_hinzufuegen(conn_id, &request.team_name)
            .map(|beitritt| (beitritt, session.spieler_liste()))
    };

    match ergebnis {
        Ok((beitritt, liste)) => {
            state
                .registry
                .team_zuordnen(&conn_id, beitritt.team_name.clone());

            tracing::info!(
                team = %beitritt.team_name,
                reihenfolge = beitritt.join_order,
                verbindung = %conn_id,
                "Spieler beigetreten"
            );

            state.broadcaster.an_admins_senden(ControlMessage::event(
                ControlPayload::PlayerJoined(PlayerJoinedEvent {
                    team_name: beitritt.team_name.clone(),
                    join_order: beitritt.join_order,
                }),
            ));
            state.broadcaster.an_admins_senden(ControlMessage::event(
                ControlPayload::PlayerList(spieler_liste_event(&liste)),
            ));

            ControlMessage::new(
                request_id,
                ControlPayload::JoinResult(JoinResponse::erfolg(
                    beitritt.team_name,
                    beitritt.join_order,
                )),
            )
        }
        Err(fehler) => {
            tracing::debug!(verbindung = %conn_id, fehler = %fehler, "Beitritt abgelehnt");
            ControlMessage::new(
                request_id,
                ControlPayload::JoinResult(JoinResponse::abgelehnt(fehler_code(&fehler))),
            )
        }
    }
}

/// Verarbeitet einen Buzz
///
/// Bei Erfolg: privater Rang an den Buzzer, volle Lage an die Admins.
/// Fehlgeschlagene Buzzes (Runde zu, schon gebuzzert, unbekannter
/// Spieler) werden kommentarlos verworfen – im Rennen um den Buzzer
/// ist "keine Antwort" die erwartete Antwort auf einen zu spaeten
/// Druck.
pub fn handle_buzz(
    request_id: u32,
    conn_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    let ergebnis = {
        let mut session = state.session.lock();
        match session.buzz_erfassen(conn_id) {
            Ok(buzz) => Some((buzz, session.runden_zustand(), session.spieler_liste())),
            Err(fehler) => {
                tracing::debug!(verbindung = %conn_id, fehler = %fehler, "Buzz verworfen");
                None
            }
        }
    };

    let (buzz, zustand, liste) = ergebnis?;

    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::BuzzReceived(BuzzReceivedEvent {
            team_name: buzz.team_name.clone(),
            rank: buzz.rank,
            timestamp_ns: buzz.timestamp_ns,
        }),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::RoundState(runden_zustand_voll(&zustand)),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));

    Some(ControlMessage::new(
        request_id,
        ControlPayload::BuzzRank(BuzzRankEvent { rank: buzz.rank }),
    ))
}

/// Verarbeitet den Verbindungsabbruch eines Spielers
///
/// Der Spieler wird offline markiert, bleibt aber in der Liste (sein
/// Name bleibt vergeben, seine Buzzes bleiben gueltig). Wurde er zuvor
/// per Kick entfernt, ist das hier ein No-op.
pub fn verbindung_getrennt(conn_id: ConnectionId, state: &Arc<SignalingState>) {
    let ergebnis = {
        let mut session = state.session.lock();
        session
            .spieler_offline_setzen(conn_id)
            .map(|spieler| (spieler, session.spieler_liste()))
    };

    let Some((spieler, liste)) = ergebnis else {
        return;
    };

    tracing::info!(team = %spieler.team_name, verbindung = %conn_id, "Spieler offline");

    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerLeft(PlayerLeftEvent {
            team_name: spieler.team_name,
        }),
    ));
    state.broadcaster.an_admins_senden(ControlMessage::event(
        ControlPayload::PlayerList(spieler_liste_event(&liste)),
    ));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SendeBefehl;
    use crate::handlers::admin_handler::handle_open_buzzer;
    use crate::server_state::SignalingConfig;
    use blitzbuzzer_core::types::Role;
    use blitzbuzzer_protocol::control::ErrorCode;
    use blitzbuzzer_session::SharedSession;
    use tokio::sync::mpsc;

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(SignalingConfig::default(), SharedSession::neu())
    }

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
    async fn join_antwortet_direkt_und_informiert_admins() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (spieler_id, _spieler_rx) = verbinden(&state, Role::Player);

        let antwort = handle_join(
            JoinRequest {
                team_name: "  Team Alpha  ".into(),
            },
            7,
            spieler_id,
            &state,
        );

        assert_eq!(antwort.request_id, 7);
        match antwort.payload {
            ControlPayload::JoinResult(r) => {
                assert!(r.success);
                assert_eq!(r.team_name.as_deref(), Some("Team Alpha"));
                assert_eq!(r.join_order, Some(1));
            }
            anderes => panic!("Erwartet JoinResult, bekam {:?}", anderes),
        }

        // Register kennt jetzt den Teamnamen
        assert_eq!(state.registry.team_von(&spieler_id), Some("Team Alpha".into()));

        // Admins: PlayerJoined + PlayerList
        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerJoined(e) => assert_eq!(e.team_name, "Team Alpha"),
            anderes => panic!("Erwartet PlayerJoined, bekam {:?}", anderes),
        }
        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerList(e) => assert_eq!(e.players.len(), 1),
            anderes => panic!("Erwartet PlayerList, bekam {:?}", anderes),
        }
    }

    #[tokio::test]
    async fn abgelehnter_join_broadcastet_nicht() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (a, _rx_a) = verbinden(&state, Role::Player);
        let (b, _rx_b) = verbinden(&state, Role::Player);

        let _ = handle_join(JoinRequest { team_name: "Alpha".into() }, 1, a, &state);
        // Admin-Events des ersten Joins abraeumen
        let _ = naechste_nachricht(&mut admin_rx);
        let _ = naechste_nachricht(&mut admin_rx);

        // Duplikat (andere Schreibweise) wird abgelehnt
        let antwort = handle_join(JoinRequest { team_name: "ALPHA".into() }, 2, b, &state);
        match antwort.payload {
            ControlPayload::JoinResult(r) => {
                assert!(!r.success);
                assert_eq!(r.error, Some(ErrorCode::DuplicateName));
            }
            anderes => panic!("Erwartet JoinResult, bekam {:?}", anderes),
        }
        assert!(admin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn buzz_vergibt_raenge_und_informiert_admins() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (a, _rx_a) = verbinden(&state, Role::Player);
        let (b, _rx_b) = verbinden(&state, Role::Player);
        let _ = handle_join(JoinRequest { team_name: "Alpha".into() }, 1, a, &state);
        let _ = handle_join(JoinRequest { team_name: "Bravo".into() }, 1, b, &state);
        handle_open_buzzer(&state);
        // Join- und Open-Events abraeumen
        while admin_rx.try_recv().is_ok() {}

        let erster = handle_buzz(3, a, &state).expect("Buzz erwartet");
        match erster.payload {
            ControlPayload::BuzzRank(e) => assert_eq!(e.rank, 1),
            anderes => panic!("Erwartet BuzzRank, bekam {:?}", anderes),
        }

        let zweiter = handle_buzz(4, b, &state).expect("Buzz erwartet");
        match zweiter.payload {
            ControlPayload::BuzzRank(e) => assert_eq!(e.rank, 2),
            anderes => panic!("Erwartet BuzzRank, bekam {:?}", anderes),
        }

        // Pro Buzz: BuzzReceived + RoundState + PlayerList
        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::BuzzReceived(e) => {
                assert_eq!(e.team_name, "Alpha");
                assert_eq!(e.rank, 1);
            }
            anderes => panic!("Erwartet BuzzReceived, bekam {:?}", anderes),
        }
        assert!(matches!(
            naechste_nachricht(&mut admin_rx).payload,
            ControlPayload::RoundState(_)
        ));
        assert!(matches!(
            naechste_nachricht(&mut admin_rx).payload,
            ControlPayload::PlayerList(_)
        ));
    }

    #[tokio::test]
    async fn verspaeteter_buzz_bleibt_stumm() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (a, _rx_a) = verbinden(&state, Role::Player);
        let _ = handle_join(JoinRequest { team_name: "Alpha".into() }, 1, a, &state);
        while admin_rx.try_recv().is_ok() {}

        // Runde ist IDLE: kein Rang, keine Antwort, kein Broadcast
        assert!(handle_buzz(2, a, &state).is_none());
        assert!(admin_rx.try_recv().is_err());

        // Doppelbuzz ebenso
        handle_open_buzzer(&state);
        while admin_rx.try_recv().is_ok() {}
        assert!(handle_buzz(3, a, &state).is_some());
        assert!(handle_buzz(4, a, &state).is_none());
    }

    #[tokio::test]
    async fn verbindungsabbruch_markiert_offline() {
        let state = test_state();
        let (_, mut admin_rx) = verbinden(&state, Role::Admin);
        let (a, _rx_a) = verbinden(&state, Role::Player);
        let _ = handle_join(JoinRequest { team_name: "Alpha".into() }, 1, a, &state);
        while admin_rx.try_recv().is_ok() {}

        verbindung_getrennt(a, &state);

        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerLeft(e) => assert_eq!(e.team_name, "Alpha"),
            anderes => panic!("Erwartet PlayerLeft, bekam {:?}", anderes),
        }
        match naechste_nachricht(&mut admin_rx).payload {
            ControlPayload::PlayerList(e) => {
                assert_eq!(e.players.len(), 1);
                assert!(!e.players[0].online);
            }
            anderes => panic!("Erwartet PlayerList, bekam {:?}", anderes),
        }

        // Zweiter Abbruch derselben Verbindung ist ein No-op
        verbindung_getrennt(a, &state);
        assert!(admin_rx.try_recv().is_err());
    }
}
