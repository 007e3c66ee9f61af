/**
 * BOUCLE DU FLUX - Décodage des messages et application sur l'état partagé
 *
 * RÔLE : Unique tâche qui écrit l'état. Elle attend soit un message entrant
 * (canal alimenté par le client MQTT), soit un tic du balayage périodique.
 * Les deux ne s'exécutent jamais en même temps.
 *
 * FONCTIONNEMENT :
 * - le type d'événement = dernier segment du topic (telemetry, beacons_data, new_alert)
 * - payload invalide => warn avec le topic, état intact, on continue
 * - fermeture du canal => fin de la boucle (l'intervalle est libéré avec elle)
 */

use crate::models::{AlertRecord, BeaconSnapshot, BeaconsBatch, FirefighterSnapshot};
use crate::state::{DashboardState, Shared};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Ce que le client MQTT pousse dans le canal
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Publish { topic: String, payload: Vec<u8> },
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Telemetry(Box<FirefighterSnapshot>),
    Beacons(Option<Vec<BeaconSnapshot>>),
    Alert(AlertRecord),
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Telemetry,
    BeaconsData,
    NewAlert,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Telemetry, EventKind::BeaconsData, EventKind::NewAlert];

    pub fn suffix(self) -> &'static str {
        match self {
            EventKind::Telemetry => "telemetry",
            EventKind::BeaconsData => "beacons_data",
            EventKind::NewAlert => "new_alert",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        let last = topic.rsplit('/').next()?;
        Self::ALL.into_iter().find(|k| k.suffix() == last)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload {kind} invalide: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("télémétrie sans identifiant pompier")]
    MissingFirefighterId,
    #[error("alerte sans identifiant")]
    MissingAlertId,
    #[error("type d'événement inconnu pour le topic {0}")]
    UnknownKind(String),
}

/// Décode un message publié en événement. Rien n'est appliqué ici.
pub fn decode(topic: &str, payload: &[u8]) -> Result<FeedEvent, IngestError> {
    let kind = EventKind::from_topic(topic).ok_or_else(|| IngestError::UnknownKind(topic.to_string()))?;
    let malformed = |source| IngestError::Malformed { kind: kind.suffix(), source };

    match kind {
        EventKind::Telemetry => {
            let snap: FirefighterSnapshot = serde_json::from_slice(payload).map_err(malformed)?;
            if snap.id().trim().is_empty() {
                return Err(IngestError::MissingFirefighterId);
            }
            Ok(FeedEvent::Telemetry(Box::new(snap)))
        }
        EventKind::BeaconsData => {
            let batch: BeaconsBatch = serde_json::from_slice(payload).map_err(malformed)?;
            Ok(FeedEvent::Beacons(batch.beacons))
        }
        EventKind::NewAlert => {
            let record: AlertRecord = serde_json::from_slice(payload).map_err(malformed)?;
            if record.id.trim().is_empty() {
                return Err(IngestError::MissingAlertId);
            }
            Ok(FeedEvent::Alert(record))
        }
    }
}

fn handle(state: &Shared<DashboardState>, msg: InboundMessage) {
    let event = match msg {
        InboundMessage::Connected => FeedEvent::Connected,
        InboundMessage::Disconnected => FeedEvent::Disconnected,
        InboundMessage::Publish { topic, payload } => match decode(&topic, &payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "message rejeté");
                return;
            }
        },
    };
    state.lock().apply(event, OffsetDateTime::now_utc());
}

/// Boucle principale du flux ; retourne quand tous les émetteurs sont fermés
pub async fn run_feed_loop(
    state: Shared<DashboardState>,
    mut rx: mpsc::Receiver<InboundMessage>,
    sweep_every: Duration,
) {
    let mut sweep = tokio::time::interval(sweep_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(msg) => handle(&state, msg),
                    None => break,
                }
            }
            _ = sweep.tick() => {
                let report = state.lock().sweep(OffsetDateTime::now_utc());
                if report.alerts_expired > 0 {
                    tracing::debug!(expired = report.alerts_expired, "alertes expirées retirées");
                }
            }
        }
    }

    tracing::info!("canal du flux fermé, fin de la boucle");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state;
    use fireground_devkit::{payloads, FiregroundMessageBuilder};

    fn publish(kind: &str, body: serde_json::Value) -> InboundMessage {
        InboundMessage::Publish {
            topic: payloads::topic("fireground", kind),
            payload: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[test]
    fn test_kind_from_last_topic_segment() {
        assert_eq!(EventKind::from_topic("fireground/telemetry"), Some(EventKind::Telemetry));
        assert_eq!(EventKind::from_topic("site/7/beacons_data"), Some(EventKind::BeaconsData));
        assert_eq!(EventKind::from_topic("new_alert"), Some(EventKind::NewAlert));
        assert_eq!(EventKind::from_topic("fireground/telemetry/extra"), None);
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(
            decode("fireground/telemetry", b"{not json"),
            Err(IngestError::Malformed { kind: "telemetry", .. })
        ));
        assert!(matches!(
            decode("fireground/telemetry", br#"{"firefighter":{"id":"","name":"X"}}"#),
            Err(IngestError::MissingFirefighterId)
        ));
        assert!(matches!(
            decode("fireground/new_alert", br#"{"id":null,"type":"SOS"}"#),
            Err(IngestError::MissingAlertId)
        ));
        assert!(matches!(decode("fireground/weather", b"{}"), Err(IngestError::UnknownKind(_))));
    }

    #[test]
    fn test_decode_beacons_absent_array() {
        let event = decode("fireground/beacons_data", br#"{"source":"gw"}"#).unwrap();
        assert_eq!(event, FeedEvent::Beacons(None));
    }

    #[tokio::test]
    async fn test_loop_applies_messages_and_stops_on_close() {
        let state = new_state(DashboardState::default());
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(run_feed_loop(state.clone(), rx, Duration::from_secs(5)));

        tx.send(InboundMessage::Connected).await.unwrap();
        tx.send(publish(payloads::TELEMETRY, FiregroundMessageBuilder::telemetry("FF-1", "Jan", "Alpha").build()))
            .await
            .unwrap();
        tx.send(InboundMessage::Publish { topic: "fireground/telemetry".into(), payload: b"garbage".to_vec() })
            .await
            .unwrap();
        tx.send(publish(
            payloads::BEACONS_DATA,
            FiregroundMessageBuilder::beacons_batch(&[("B-01", "Klatka A")]),
        ))
        .await
        .unwrap();
        tx.send(publish(
            payloads::NEW_ALERT,
            FiregroundMessageBuilder::new_alert_now("A-1", "SOS", "FF-1", "Jan", 2),
        ))
        .await
        .unwrap();
        drop(tx);

        task.await.unwrap();

        let state = state.lock();
        let status = state.status();
        assert!(status.connected);
        assert_eq!(status.firefighters, 1);
        assert_eq!(status.packets, 2);
        assert_eq!(status.beacons, 1);
        assert_eq!(status.active_alerts, 1);
    }

    #[tokio::test]
    async fn test_periodic_sweep_drops_expired_alerts_only() {
        use time::format_description::well_known::Rfc3339;

        let state = new_state(DashboardState::default());
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(run_feed_loop(state.clone(), rx, Duration::from_millis(50)));

        let stale_at = OffsetDateTime::now_utc() - time::Duration::minutes(10);
        let mut stale = FiregroundMessageBuilder::new_alert_now("A-old", "SOS", "FF-1", "Jan", 2);
        stale["timestamp"] = serde_json::json!(stale_at.format(&Rfc3339).unwrap());
        tx.send(publish(payloads::NEW_ALERT, stale)).await.unwrap();
        tx.send(publish(
            payloads::NEW_ALERT,
            FiregroundMessageBuilder::new_alert_now("A-new", "MAN_DOWN", "FF-2", "Anna", 1),
        ))
        .await
        .unwrap();

        // aucun message après ceux-ci : seul le timer peut retirer A-old
        tokio::time::sleep(Duration::from_millis(250)).await;
        {
            let state = state.lock();
            assert_eq!(state.status().active_alerts, 1);
            assert!(state.ledger.contains("A-new"));
            assert!(!state.ledger.contains("A-old"));
        }

        drop(tx);
        task.await.unwrap();
    }
}
