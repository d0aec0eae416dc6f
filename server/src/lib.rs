//! blitzbuzzer-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use blitzbuzzer_session::SharedSession;
use blitzbuzzer_signaling::{SignalingConfig, SignalingServer, SignalingState};
use config::ServerConfig;
use std::net::SocketAddr;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Signaling-Server und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Session anlegen
    /// 2. TCP-Listener starten (Control-Protokoll)
    /// 3. Auf Ctrl-C warten
    /// 4. Verbindungen trennen, ggf. Sitzungsdaten exportieren
    pub async fn starten(self) -> Result<()> {
        let bind_addr: SocketAddr = self.config.tcp_bind_adresse().parse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %bind_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let session = SharedSession::neu();
        let signaling_config = SignalingConfig {
            server_name: self.config.server.name.clone(),
            max_clients: self.config.server.max_clients,
            keepalive_sek: self.config.netzwerk.keepalive_sek,
            verbindungs_timeout_sek: self.config.netzwerk.verbindungs_timeout_sek,
        };
        let state = SignalingState::neu(signaling_config, session.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let signaling = SignalingServer::neu(state, bind_addr);
        let signaling_task = tokio::spawn(signaling.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        shutdown_tx.send(true)?;
        signaling_task.await??;

        // Sitzungsdaten sichern bevor der Prozess endet
        if let Some(verzeichnis) = &self.config.export.verzeichnis {
            let daten = session.lock().sitzungsdaten();
            let pfad = std::path::Path::new(verzeichnis);
            std::fs::create_dir_all(pfad)?;
            blitzbuzzer_export::csv_exportieren(&daten, pfad)?;
            blitzbuzzer_export::json_exportieren(&daten, pfad)?;
        }

        Ok(())
    }
}
