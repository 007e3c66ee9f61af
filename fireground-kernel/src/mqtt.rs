/**
 * CLIENT MQTT DU FLUX - Contexte explicite open / close
 *
 * RÔLE : Connexion au broker, abonnement aux topics du flux, transfert des
 * messages bruts vers la boucle du flux via un canal borné.
 *
 * FONCTIONNEMENT :
 * - open : crée le client et lance la tâche qui pompe l'eventloop
 * - (ré)abonnement à chaque ConnAck ; ConnAck / erreur => Connected / Disconnected
 * - close : désabonnement + déconnexion propres, puis attente de la tâche
 * - Drop sans close : même chose en best-effort (try_*) puis abort de la tâche
 */

use crate::config::MqttConf;
use crate::feed::{EventKind, InboundMessage};
use crate::health::{HealthTracker, HEALTH_TOPIC_SUFFIX};
use rumqttc::{AsyncClient, ClientError, Event, Incoming, MqttOptions, Outgoing, QoS};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const RETRY_DELAY: Duration = Duration::from_secs(2);
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("client MQTT: {0}")]
    Client(#[from] ClientError),
}

/// Topics du flux pour un préfixe donné
pub fn feed_topics(prefix: &str) -> Vec<String> {
    let prefix = prefix.trim_end_matches('/');
    EventKind::ALL
        .into_iter()
        .map(|k| format!("{prefix}/{}", k.suffix()))
        .collect()
}

pub fn health_topic(prefix: &str) -> String {
    format!("{}/{HEALTH_TOPIC_SUFFIX}", prefix.trim_end_matches('/'))
}

pub struct MqttFeed {
    client: AsyncClient,
    topics: Vec<String>,
    pump: Option<JoinHandle<()>>,
}

impl MqttFeed {
    pub fn open(conf: &MqttConf, tx: mpsc::Sender<InboundMessage>, health: HealthTracker) -> Self {
        let mut opts = MqttOptions::new(&conf.client_id, &conf.host, conf.port);
        opts.set_keep_alive(Duration::from_secs(conf.keep_alive_secs.max(5)));
        opts.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(opts, 10);
        let topics = feed_topics(&conf.topic_prefix);
        tracing::info!(host = %conf.host, port = conf.port, topics = ?topics, "ouverture du flux MQTT");

        let pump = tokio::spawn(pump(client.clone(), eventloop, topics.clone(), tx, health));

        Self { client, topics, pump: Some(pump) }
    }

    /// Client partagé (publication du health)
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Fermeture propre : désabonnement, déconnexion, fin de la tâche de pompage
    pub async fn close(mut self) -> Result<(), FeedError> {
        let result = self.shutdown().await;
        if let Some(handle) = self.pump.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(CLOSE_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }
        tracing::info!("flux MQTT fermé");
        result
    }

    async fn shutdown(&self) -> Result<(), FeedError> {
        for topic in &self.topics {
            self.client.unsubscribe(topic.as_str()).await?;
        }
        self.client.disconnect().await?;
        Ok(())
    }
}

impl Drop for MqttFeed {
    fn drop(&mut self) {
        // close() a déjà tout libéré
        let Some(handle) = self.pump.take() else {
            return;
        };
        for topic in &self.topics {
            let _ = self.client.try_unsubscribe(topic.as_str());
        }
        let _ = self.client.try_disconnect();
        handle.abort();
    }
}

async fn pump(
    client: AsyncClient,
    mut eventloop: rumqttc::EventLoop,
    topics: Vec<String>,
    tx: mpsc::Sender<InboundMessage>,
    health: HealthTracker,
) {
    let mut connected = false;

    loop {
        let forward = match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                for topic in &topics {
                    if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        tracing::error!(topic = %topic, error = %e, "abonnement MQTT impossible");
                    }
                }
                connected = true;
                health.mark_mqtt_connected();
                tracing::info!("connecté au broker");
                Some(InboundMessage::Connected)
            }
            Ok(Event::Incoming(Incoming::Publish(p))) => Some(InboundMessage::Publish {
                topic: p.topic,
                payload: p.payload.to_vec(),
            }),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                health.mark_mqtt_disconnected();
                let _ = tx.send(InboundMessage::Disconnected).await;
                break;
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "erreur MQTT, nouvel essai dans {:?}", RETRY_DELAY);
                health.increment_reconnects();
                let was_connected = std::mem::replace(&mut connected, false);
                if was_connected && tx.send(InboundMessage::Disconnected).await.is_err() {
                    break;
                }
                tokio::time::sleep(RETRY_DELAY).await;
                None
            }
        };

        if let Some(msg) = forward {
            if tx.send(msg).await.is_err() {
                tracing::debug!("boucle du flux arrêtée, fin du pompage MQTT");
                break;
            }
        }
    }
}
