/**
 * CONFIGURATION KERNEL - kernel.yaml + surcharges d'environnement
 *
 * RÔLE : Broker MQTT, bind HTTP, vieillissement des alertes, politique stale.
 * Fichier absent, vide ou invalide => valeurs par défaut (l'invalidité est loggée).
 *
 * Variables : FIREGROUND_KERNEL_CONFIG (chemin), FIREGROUND_API_KEY (clé API).
 */

use crate::ledger::DuplicatePolicy;
use crate::store::StalePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lecture config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config YAML invalide: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config incohérente: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub mqtt: MqttConf,
    pub http: HttpConf,
    pub alerts: AlertsConf,
    pub roster: RosterConf,
    pub health: HealthConf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Préfixe des topics : <prefix>/telemetry, <prefix>/beacons_data, <prefix>/new_alert
    pub topic_prefix: String,
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "fireground-kernel".into(),
            keep_alive_secs: 15,
            topic_prefix: "fireground".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
    /// Clé attendue dans x-api-key ; None => API ouverte
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into(), api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConf {
    pub max_age_secs: u64,
    pub sweep_interval_secs: u64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for AlertsConf {
    fn default() -> Self {
        Self { max_age_secs: 180, sweep_interval_secs: 5, duplicate_policy: DuplicatePolicy::Replace }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConf {
    pub stale_after_secs: u64,
    /// 0 ou null => pas d'éviction
    pub evict_after_secs: Option<u64>,
}

impl Default for RosterConf {
    fn default() -> Self {
        Self { stale_after_secs: 90, evict_after_secs: Some(1800) }
    }
}

impl RosterConf {
    pub fn stale_policy(&self) -> StalePolicy {
        StalePolicy {
            stale_after: time::Duration::seconds(self.stale_after_secs as i64),
            evict_after: self
                .evict_after_secs
                .filter(|s| *s > 0)
                .map(|s| time::Duration::seconds(s as i64)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConf {
    /// 0 => pas de publication MQTT du health
    pub publish_interval_secs: u64,
}

impl Default for HealthConf {
    fn default() -> Self {
        Self { publish_interval_secs: 30 }
    }
}

/// Borne des fenêtres de temps (âge max, stale, éviction) : 30 jours
const MAX_WINDOW_SECS: u64 = 30 * 24 * 3600;

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.topic_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("mqtt.topic_prefix vide".into()));
        }
        if self.alerts.max_age_secs == 0 {
            return Err(ConfigError::Invalid("alerts.max_age_secs doit être > 0".into()));
        }
        let windows = [
            ("alerts.max_age_secs", Some(self.alerts.max_age_secs)),
            ("roster.stale_after_secs", Some(self.roster.stale_after_secs)),
            ("roster.evict_after_secs", self.roster.evict_after_secs),
        ];
        for (key, secs) in windows {
            if let Some(secs) = secs.filter(|s| *s > MAX_WINDOW_SECS) {
                return Err(ConfigError::Invalid(format!("{key}={secs} au-delà de {MAX_WINDOW_SECS} s")));
            }
        }
        // le balayage doit passer au moins toutes les 5 s
        if !(1..=5).contains(&self.alerts.sweep_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "alerts.sweep_interval_secs={} hors de [1, 5]",
                self.alerts.sweep_interval_secs
            )));
        }
        if self.http.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!("http.bind invalide: {}", self.http.bind)));
        }
        Ok(())
    }
}

pub async fn load_config_from(path: impl AsRef<Path>) -> Result<KernelConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(path = %path.display(), "pas de fichier config, usage config par défaut");
        return Ok(KernelConfig::default());
    }

    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if txt.trim().is_empty() {
        return Ok(KernelConfig::default());
    }

    let cfg: KernelConfig = serde_yaml::from_str(&txt)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Config du process : fichier invalide => log + config par défaut
pub async fn load_config() -> KernelConfig {
    let path = std::env::var("FIREGROUND_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = load_config_from(&path).await.unwrap_or_else(|e| {
        tracing::error!(path = %path, error = %e, "config rejetée, usage config par défaut");
        KernelConfig::default()
    });

    if let Ok(key) = std::env::var("FIREGROUND_API_KEY") {
        if !key.is_empty() {
            cfg.http.api_key = Some(key);
        }
    }
    cfg
}
