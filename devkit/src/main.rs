/*!
Fireground Sim - Simulateur de flux télémétrie

Publie sur MQTT un flux synthétique (telemetry toutes les secondes,
beacons_data toutes les 5s, une alerte de temps en temps) pour développer
le kernel et le dashboard sans matériel.

Variables d'environnement:
- FIREGROUND_MQTT_HOST (localhost), FIREGROUND_MQTT_PORT (1883)
- FIREGROUND_TOPIC_PREFIX (fireground)
- FIREGROUND_SIM_FIREFIGHTERS (4)
*/

use anyhow::{Context, Result};
use fireground_devkit::payloads::topic;
use fireground_devkit::scenario::{now_rfc3339, Scenario};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let host: String = env_or("FIREGROUND_MQTT_HOST", "localhost".to_string());
    let port: u16 = env_or("FIREGROUND_MQTT_PORT", 1883);
    let prefix: String = env_or("FIREGROUND_TOPIC_PREFIX", "fireground".to_string());
    let firefighters: usize = env_or("FIREGROUND_SIM_FIREFIGHTERS", 4);

    let mut opts = MqttOptions::new("fireground-sim", &host, port);
    opts.set_keep_alive(Duration::from_secs(15));
    let (client, mut eventloop) = AsyncClient::new(opts, 64);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                log::warn!("🔌 MQTT error: {e:?}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    log::info!(
        "🚒 simulating {} firefighters on {}:{} (prefix '{}') from {}",
        firefighters,
        host,
        port,
        prefix,
        now_rfc3339()
    );

    let scenario = Scenario::new(firefighters);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut tick: u64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for frame in scenario.frames(tick) {
                    let payload = serde_json::to_vec(&frame.payload)
                        .context("failed to serialize frame")?;
                    client
                        .publish(topic(&prefix, frame.kind), QoS::AtLeastOnce, false, payload)
                        .await
                        .context("failed to publish frame")?;
                    log::debug!("📤 published {}", frame.kind);
                }
                tick += 1;
            }
            _ = &mut shutdown => {
                log::info!("🛑 stopping simulator after {} ticks", tick);
                client.disconnect().await.ok();
                break;
            }
        }
    }

    Ok(())
}
