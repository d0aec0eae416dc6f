//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt anhand der deklarierten Rolle den richtigen Handler und
//! gibt die direkte Antwort zurueck (falls es eine gibt).
//!
//! ## Rollenpruefung
//! - `Hello` nur als erste Nachricht (solange keine Rolle feststeht)
//! - Admin-Kommandos nur von Admin-Verbindungen
//! - `Join`/`Buzz` nur von Spieler-Verbindungen
//! - Alles andere vor dem Hello ist ein Protokollfehler

use blitzbuzzer_core::types::{ConnectionId, Role};
use blitzbuzzer_protocol::control::{ControlMessage, ControlPayload, ErrorCode, HelloResponse};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::{admin_handler, player_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-Adresse (nur fuer Logging)
    pub peer_addr: SocketAddr,
    /// Verbindungs-ID (vom Server vergeben)
    pub conn_id: ConnectionId,
    /// Deklarierte Rolle (None bis zum Hello)
    pub rolle: Option<Role>,
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ControlMessages an die entsprechenden Handler und
/// gibt die direkte Antwort-ControlMessage zurueck.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort gesendet werden
    /// soll (Admin-Kommandos antworten ueber den Broadcast, verworfene
    /// Buzzes ueberhaupt nicht).
    pub async fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;

        match message.payload {
            // ---------------------------------------------------------------
            // Handshake und Keepalive (rollenunabhaengig)
            // ---------------------------------------------------------------
            ControlPayload::Hello(req) => {
                if ctx.rolle.is_some() {
                    return Some(ControlMessage::error(
                        request_id,
                        ErrorCode::InvalidRequest,
                        "Rolle bereits deklariert",
                    ));
                }

                ctx.rolle = Some(req.role);
                self.state.registry.registrieren(ctx.conn_id, req.role);
                tracing::debug!(
                    peer = %ctx.peer_addr,
                    verbindung = %ctx.conn_id,
                    rolle = %req.role,
                    "Rolle deklariert"
                );

                Some(ControlMessage::new(
                    request_id,
                    ControlPayload::HelloResponse(HelloResponse { role: req.role }),
                ))
            }

            ControlPayload::Ping(ping) => {
                let jetzt = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                Some(ControlMessage::pong(request_id, ping.timestamp_ms, jetzt))
            }

            ControlPayload::Pong(_) => {
                tracing::trace!(verbindung = %ctx.conn_id, "Pong empfangen");
                None
            }

            // ---------------------------------------------------------------
            // Rollen-gebundene Nachrichten
            // ---------------------------------------------------------------
            payload => match ctx.rolle {
                None => Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Zuerst Hello senden",
                )),
                Some(Role::Admin) => self.dispatch_admin(payload, request_id, ctx),
                Some(Role::Player) => self.dispatch_player(payload, request_id, ctx),
            },
        }
    }

    /// Admin-Kommandos (Rundensteuerung, Spielerverwaltung, Export)
    fn dispatch_admin(
        &self,
        payload: ControlPayload,
        request_id: u32,
        ctx: &DispatcherContext,
    ) -> Option<ControlMessage> {
        match payload {
            ControlPayload::OpenBuzzer => {
                admin_handler::handle_open_buzzer(&self.state);
                None
            }
            ControlPayload::CloseBuzzer => {
                admin_handler::handle_close_buzzer(&self.state);
                None
            }
            ControlPayload::ResetRound => {
                admin_handler::handle_reset_round(&self.state);
                None
            }
            ControlPayload::NextRound => {
                admin_handler::handle_next_round(&self.state);
                None
            }
            ControlPayload::RemovePlayer(req) => {
                admin_handler::handle_remove_player(req, &self.state);
                None
            }
            ControlPayload::LockJoins(req) => {
                admin_handler::handle_lock_joins(req, &self.state);
                None
            }
            ControlPayload::ClearPlayers => {
                admin_handler::handle_clear_players(&self.state);
                None
            }
            ControlPayload::GetSessionData => {
                Some(admin_handler::handle_get_session_data(request_id, &self.state))
            }
            andere => {
                tracing::warn!(
                    verbindung = %ctx.conn_id,
                    nachricht = ?andere,
                    "Unerwartete Nachricht von Admin-Verbindung"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Nachricht fuer Admin-Verbindung nicht erlaubt",
                ))
            }
        }
    }

    /// Spieler-Nachrichten (Beitritt, Buzz)
    fn dispatch_player(
        &self,
        payload: ControlPayload,
        request_id: u32,
        ctx: &DispatcherContext,
    ) -> Option<ControlMessage> {
        match payload {
            ControlPayload::Join(req) => Some(player_handler::handle_join(
                req,
                request_id,
                ctx.conn_id,
                &self.state,
            )),
            ControlPayload::Buzz => player_handler::handle_buzz(request_id, ctx.conn_id, &self.state),
            andere => {
                tracing::warn!(
                    verbindung = %ctx.conn_id,
                    nachricht = ?andere,
                    "Unerwartete Nachricht von Spieler-Verbindung"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Nachricht fuer Spieler-Verbindung nicht erlaubt",
                ))
            }
        }
    }

    /// Aufraeumen beim Verbindungsende
    ///
    /// Spieler werden offline markiert und die Admins informiert;
    /// Admin-Verbindungen hinterlassen keinen Session-Zustand.
    pub fn verbindung_getrennt(&self, ctx: &DispatcherContext) {
        if ctx.rolle == Some(Role::Player) {
            player_handler::verbindung_getrennt(ctx.conn_id, &self.state);
        }
        self.state.broadcaster.client_entfernen(&ctx.conn_id);
        self.state.registry.entfernen(&ctx.conn_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
