/**
 * FIREGROUND KERNEL - Point d'entrée du service de télémétrie pompiers
 *
 * RÔLE : Orchestration des modules : config, flux MQTT, boucle d'ingestion,
 * health, API REST. Arrêt propre sur Ctrl-C.
 *
 * ARCHITECTURE : client MQTT -> canal borné -> boucle du flux (unique écrivain)
 * -> état partagé <- handlers HTTP (lecteurs).
 */

mod classify;
mod config;
mod feed;
mod health;
mod http;
mod ledger;
mod models;
mod mqtt;
mod notices;
mod projector;
mod selection;
mod state;
mod store;

use crate::config::load_config;
use crate::feed::run_feed_loop;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::mqtt::{health_topic, MqttFeed};
use crate::state::{new_state, DashboardState};

use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const INBOUND_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fireground_kernel=info")),
        )
        .init();

    let cfg = load_config().await;
    let addr: SocketAddr = cfg
        .http
        .bind
        .parse()
        .with_context(|| format!("adresse HTTP invalide: {}", cfg.http.bind))?;
    if cfg.http.api_key.is_none() {
        tracing::warn!("aucune clé API configurée (FIREGROUND_API_KEY), API ouverte");
    }

    let state = new_state(DashboardState::from_config(&cfg));
    let health_tracker = HealthTracker::new();

    // flux : MQTT -> canal -> boucle unique d'écriture
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
    let feed = MqttFeed::open(&cfg.mqtt, tx, health_tracker.clone());
    let feed_loop = tokio::spawn(run_feed_loop(
        state.clone(),
        rx,
        Duration::from_secs(cfg.alerts.sweep_interval_secs),
    ));

    let health_task = (cfg.health.publish_interval_secs > 0).then(|| {
        health_tracker.spawn_health_publisher(
            feed.client(),
            health_topic(&cfg.mqtt.topic_prefix),
            state.clone(),
            Duration::from_secs(cfg.health.publish_interval_secs),
        )
    });

    let app = http::build_router(AppState {
        state,
        health_tracker,
        api_key: cfg.http.api_key.clone(),
    });

    // sur erreur de bind, `feed` est libéré par son Drop
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind HTTP impossible sur {addr}"))?;
    tracing::info!(%addr, "API en écoute");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("arrêt demandé");
        })
        .await
        .context("serveur HTTP interrompu");

    // arrêt : health, puis flux MQTT (ferme le canal), puis fin de la boucle
    if let Some(task) = health_task {
        task.abort();
    }
    if let Err(e) = feed.close().await {
        tracing::warn!(error = %e, "fermeture MQTT incomplète");
    }
    if let Err(e) = feed_loop.await {
        tracing::warn!(error = %e, "boucle du flux terminée en erreur");
    }

    served
}
