/**
 * MODÈLES DU FLUX - Snapshots pompiers, balises et alertes
 *
 * RÔLE : Types désérialisés depuis les topics telemetry / beacons_data / new_alert.
 * Tous les champs sauf les identifiants sont optionnels : une valeur absente
 * devient "inconnue" à l'affichage, jamais une erreur.
 *
 * Les tags textuels du flux (mouvement, stress, PASS, connexion, type d'alerte)
 * sont des enums fermés avec une variante de repli.
 */

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Snapshot complet d'un pompier ; chaque message remplace intégralement le précédent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirefighterSnapshot {
    pub firefighter: Identity,
    #[serde(default, deserialize_with = "nullable")]
    pub vitals: Vitals,
    #[serde(default, deserialize_with = "nullable")]
    pub scba: Scba,
    #[serde(default, deserialize_with = "nullable")]
    pub device: Device,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Position,
    #[serde(default, deserialize_with = "nullable")]
    pub barometer: Barometer,
    #[serde(default, deserialize_with = "nullable")]
    pub imu: Imu,
    #[serde(default, deserialize_with = "nullable")]
    pub pass_status: PassStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub recco: Recco,
    #[serde(default, deserialize_with = "nullable")]
    pub black_box: BlackBox,
    #[serde(default, deserialize_with = "nullable")]
    pub environment: Environment,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub uwb_measurements: Vec<UwbMeasurement>,
    /// Champs non modélisés, conservés tels quels
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FirefighterSnapshot {
    pub fn id(&self) -> &str {
        &self.firefighter.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub heart_rate_bpm: Option<f64>,
    #[serde(default)]
    pub hr_zone: Option<HrZone>,
    #[serde(default)]
    pub motion_state: Option<MotionState>,
    #[serde(default)]
    pub stress_level: Option<StressLevel>,
    #[serde(default)]
    pub skin_temperature_c: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scba {
    #[serde(default)]
    pub cylinder_pressure_bar: Option<f64>,
    #[serde(default)]
    pub remaining_time_min: Option<f64>,
    #[serde(default)]
    pub consumption_rate_lpm: Option<f64>,
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub alarms: ScbaAlarms,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScbaAlarms {
    #[serde(default, deserialize_with = "nullable")]
    pub low_pressure: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub very_low_pressure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub sos_button_pressed: bool,
    #[serde(default)]
    pub connection_primary: Option<ConnectionType>,
    #[serde(default)]
    pub lora_rssi_dbm: Option<f64>,
    #[serde(default)]
    pub firmware_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub gps: Option<Gps>,
    #[serde(default)]
    pub drift: Option<Drift>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    #[serde(default)]
    pub satellites: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    #[serde(default)]
    pub drift_total_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Barometer {
    #[serde(default)]
    pub pressure_pa: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub altitude_rel_m: Option<f64>,
    #[serde(default)]
    pub vertical_speed_mps: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub roll: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassStatus {
    #[serde(default)]
    pub status: Option<PassState>,
    #[serde(default, deserialize_with = "nullable")]
    pub alarm_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recco {
    #[serde(default, deserialize_with = "nullable")]
    pub detected: bool,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlackBox {
    #[serde(default, deserialize_with = "nullable")]
    pub recording: bool,
    #[serde(default)]
    pub storage_used_percent: Option<f64>,
}

/// Capteurs d'atmosphère portés par le pompier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub co_ppm: Option<f64>,
    #[serde(default)]
    pub co2_ppm: Option<f64>,
    #[serde(default)]
    pub o2_percent: Option<f64>,
    #[serde(default)]
    pub lel_percent: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    /// Capteurs additionnels (clé -> lecture), classés comme capteurs inconnus
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UwbMeasurement {
    #[serde(default)]
    pub beacon_id: Option<String>,
    #[serde(default)]
    pub beacon_name: Option<String>,
    #[serde(default)]
    pub range_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Stationary,
    Walking,
    Running,
    Crawling,
    Climbing,
    Fallen,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Moderate,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrZone {
    Rest,
    Light,
    Moderate,
    Hard,
    Max,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Active,
    Alarm,
    PreAlarm,
    Off,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Connected,
    Disconnected,
    Lora,
    Ble,
    Lte,
    #[serde(other)]
    Unknown,
}

/// Balise UWB / ancre ; la liste entière est remplacée à chaque lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload beacons_data : tableau absent => aucune mise à jour
#[derive(Debug, Clone, Deserialize)]
pub struct BeaconsBatch {
    #[serde(default)]
    pub beacons: Option<Vec<BeaconSnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertType {
    Sos,
    LowAir,
    CriticalVitals,
    NoMovement,
    /// Tag inconnu, conservé pour l'affichage
    Other(String),
}

impl AlertType {
    pub fn tag(&self) -> &str {
        match self {
            AlertType::Sos => "SOS",
            AlertType::LowAir => "LOW_AIR",
            AlertType::CriticalVitals => "CRITICAL_VITALS",
            AlertType::NoMovement => "NO_MOVEMENT",
            AlertType::Other(tag) => tag,
        }
    }

    /// Libellé opérateur
    pub fn message(&self) -> String {
        match self {
            AlertType::Sos => "SOS BUTTON PRESSED".to_string(),
            AlertType::LowAir => "CRITICAL AIR LEVEL".to_string(),
            AlertType::CriticalVitals => "CRITICAL VITAL SIGNS".to_string(),
            AlertType::NoMovement => "NO MOVEMENT DETECTED (>30s)".to_string(),
            AlertType::Other(tag) => format!("EVENT DETECTED: {tag}"),
        }
    }
}

impl From<String> for AlertType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "SOS" => AlertType::Sos,
            "LOW_AIR" => AlertType::LowAir,
            "CRITICAL_VITALS" => AlertType::CriticalVitals,
            "NO_MOVEMENT" => AlertType::NoMovement,
            _ => AlertType::Other(tag),
        }
    }
}

impl From<AlertType> for String {
    fn from(kind: AlertType) -> Self {
        match kind {
            AlertType::Other(tag) => tag,
            known => known.tag().to_string(),
        }
    }
}

/// Alerte poussée par le flux (new_alert)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    #[serde(default, deserialize_with = "id_string")]
    pub firefighter_id: String,
    #[serde(default)]
    pub firefighter_name: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    /// Horodatage de création ; absent => heure de réception
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

/// `null` traité comme la valeur par défaut du champ
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifiants acceptés en texte ou en nombre
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => s,
        Some(RawId::Int(n)) => n.to_string(),
        Some(RawId::Float(f)) => f.to_string(),
        None => String::new(),
    })
}
