//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Vor dem Hello ist die Verbindung anonym; danach haengt
//! sie am Broadcaster und bekommt die initialen Zustands-Events.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Client muss innerhalb von `verbindungs_timeout_sek` irgendetwas senden
//! - Bei Timeout wird die Verbindung getrennt

use blitzbuzzer_core::types::ConnectionId;
use blitzbuzzer_protocol::{control::ControlMessage, wire::FrameCodec};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::broadcast::SendeBefehl;
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::handlers;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// sendet Antworten zurueck. Laeuft in einem eigenen tokio-Task.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        // Framed-Stream mit FrameCodec einrichten
        let mut framed = Framed::new(stream, FrameCodec::new());

        // Ausgehende Befehls-Queue (Broadcaster -> TCP)
        // Wird nach dem Hello mit der Broadcaster-Queue der Verbindung
        // verknuepft
        let (sende_tx, mut sende_rx) = mpsc::channel::<SendeBefehl>(64);
        let mut registriert = false;

        let mut ctx = DispatcherContext {
            peer_addr,
            conn_id: ConnectionId::new(),
            rolle: None,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        let mut ping_request_id: u32 = 0;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                peer = %peer_addr,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );

                            // Dispatch
                            if let Some(antwort) = dispatcher.dispatch(nachricht, &mut ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }

                            // Nach dem Hello: Broadcaster-Queue abonnieren und
                            // initiale Zustands-Events ausliefern
                            if let Some(rolle) = ctx.rolle {
                                if !registriert {
                                    registriert = true;
                                    let mut recv_queue = self
                                        .state
                                        .broadcaster
                                        .client_registrieren(ctx.conn_id, rolle);
                                    // Separater Lese-Task fuer die Broadcast-Queue
                                    let sende_tx_clone = sende_tx.clone();
                                    tokio::spawn(async move {
                                        while let Some(befehl) = recv_queue.recv().await {
                                            if sende_tx_clone.send(befehl).await.is_err() {
                                                break;
                                            }
                                        }
                                    });

                                    let mut abbruch = false;
                                    for event in handlers::initiale_events(rolle, &self.state) {
                                        if let Err(e) = framed.send(event).await {
                                            tracing::warn!(
                                                peer = %peer_addr,
                                                fehler = %e,
                                                "Initiale Events fehlgeschlagen"
                                            );
                                            abbruch = true;
                                            break;
                                        }
                                    }
                                    if abbruch {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            // Verbindung geschlossen
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehender Befehl aus dem Broadcaster
                Some(befehl) = sende_rx.recv() => {
                    match befehl {
                        SendeBefehl::Nachricht(ausgehend) => {
                            if let Err(e) = framed.send(ausgehend).await {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    fehler = %e,
                                    "Broadcast-Senden fehlgeschlagen"
                                );
                                break;
                            }
                        }
                        SendeBefehl::Trennen => {
                            tracing::info!(peer = %peer_addr, "Verbindung serverseitig getrennt");
                            break;
                        }
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        ping_request_id = ping_request_id.wrapping_add(1);
                        let ts = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_millis() as u64;
                        let ping = ControlMessage::ping(ping_request_id, ts);

                        if let Err(e) = framed.send(ping).await {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        dispatcher.verbindung_getrennt(&ctx);
        tracing::debug!(peer = %peer_addr, verbindung = %ctx.conn_id, "Verbindung abgebaut");
    }
}
