/**
 * HEALTH KERNEL - État d'infrastructure du service
 *
 * RÔLE : uptime, compteurs (pompiers, balises, alertes, paquets), état MQTT,
 * reconnexions et mémoire. Servi sur /system/health et publié périodiquement
 * sur <prefix>/kernel/health@v1.
 */

use crate::state::{DashboardState, Shared};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, QoS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub const HEALTH_TOPIC_SUFFIX: &str = "kernel/health@v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MqttStatus {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub firefighters_tracked: u32,
    pub beacons_tracked: u32,
    pub active_alerts: u32,
    pub packets_received: u64,
    pub memory_usage_mb: f32,
    pub mqtt_status: MqttStatus,
    pub mqtt_reconnects: u32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    mqtt_reconnects: Arc<AtomicU32>,
    mqtt_status: Arc<Mutex<MqttStatus>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            mqtt_reconnects: Arc::new(AtomicU32::new(0)),
            mqtt_status: Arc::new(Mutex::new(MqttStatus::Connecting)),
        }
    }

    pub fn mark_mqtt_connected(&self) {
        *self.mqtt_status.lock() = MqttStatus::Connected;
    }

    pub fn mark_mqtt_disconnected(&self) {
        *self.mqtt_status.lock() = MqttStatus::Disconnected;
    }

    pub fn increment_reconnects(&self) {
        self.mqtt_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.mqtt_status.lock() = MqttStatus::Reconnecting;
    }

    pub fn mqtt_status(&self) -> MqttStatus {
        *self.mqtt_status.lock()
    }

    pub fn get_health(&self, state: &Shared<DashboardState>) -> KernelHealth {
        let status = state.lock().status();

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            firefighters_tracked: status.firefighters as u32,
            beacons_tracked: status.beacons as u32,
            active_alerts: status.active_alerts as u32,
            packets_received: status.packets,
            memory_usage_mb: get_memory_usage_mb(),
            mqtt_status: self.mqtt_status(),
            mqtt_reconnects: self.mqtt_reconnects.load(Ordering::Relaxed),
        }
    }

    /// Publication périodique du health via le client du flux
    pub fn spawn_health_publisher(
        &self,
        client: AsyncClient,
        topic: String,
        state: Shared<DashboardState>,
        every: Duration,
    ) -> JoinHandle<()> {
        let tracker = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let health = tracker.get_health(&state);
                let payload = match serde_json::to_vec(&health) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "health non sérialisable");
                        continue;
                    }
                };
                match client.publish(topic.as_str(), QoS::AtLeastOnce, false, payload).await {
                    Ok(()) => tracing::debug!(
                        uptime = health.uptime_seconds,
                        firefighters = health.firefighters_tracked,
                        "health publié"
                    ),
                    Err(e) => tracing::warn!(error = %e, "échec publication health"),
                }
            }
        })
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|l| l.starts_with("VmRSS:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb as f32 / 1024.0;
            }
        }
    }

    0.0
}
