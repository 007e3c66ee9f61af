/*!
Builders de payloads pour le flux Fireground

Produit des messages JSON conformes au format du flux télémétrie
(telemetry, beacons_data, new_alert) pour les tests et le simulateur.
*/

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Topics du flux, relatifs au préfixe configuré
pub const TELEMETRY: &str = "telemetry";
pub const BEACONS_DATA: &str = "beacons_data";
pub const NEW_ALERT: &str = "new_alert";

/// Construit le topic complet: "fireground" + "telemetry" -> "fireground/telemetry"
pub fn topic(prefix: &str, kind: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), kind)
}

/// Helper pour créer des messages formatés selon le flux Fireground
pub struct FiregroundMessageBuilder;

impl FiregroundMessageBuilder {
    /// Snapshot télémétrie minimal mais complet pour un pompier
    pub fn telemetry<S: Into<String>>(id: S, name: S, team: S) -> TelemetryBuilder {
        TelemetryBuilder::new(id.into(), name.into(), team.into())
    }

    /// Lot de balises (remplace la collection complète côté kernel)
    pub fn beacons_batch(beacons: &[(&str, &str)]) -> Value {
        let list: Vec<Value> = beacons
            .iter()
            .map(|(id, name)| {
                json!({
                    "id": id,
                    "name": name,
                    "battery_percent": 87,
                    "floor": 0,
                    "status": "online"
                })
            })
            .collect();
        json!({ "beacons": list })
    }

    /// Message beacons_data sans tableau (no-op côté kernel)
    pub fn beacons_absent() -> Value {
        json!({ "source": "uwb-gateway" })
    }

    /// Alerte avec horodatage explicite (RFC 3339)
    pub fn new_alert(
        id: &str,
        alert_type: &str,
        firefighter_id: &str,
        firefighter_name: &str,
        floor: i32,
        timestamp: DateTime<Utc>,
    ) -> Value {
        json!({
            "id": id,
            "type": alert_type,
            "firefighter_id": firefighter_id,
            "firefighter_name": firefighter_name,
            "floor": floor,
            "timestamp": timestamp.to_rfc3339()
        })
    }

    /// Alerte horodatée maintenant
    pub fn new_alert_now(
        id: &str,
        alert_type: &str,
        firefighter_id: &str,
        firefighter_name: &str,
        floor: i32,
    ) -> Value {
        Self::new_alert(id, alert_type, firefighter_id, firefighter_name, floor, Utc::now())
    }
}

/// Builder fluide pour un snapshot télémétrie
#[derive(Debug, Clone)]
pub struct TelemetryBuilder {
    id: String,
    name: String,
    team: String,
    rank: String,
    role: String,
    heart_rate: Option<u32>,
    stress: Option<String>,
    motion: Option<String>,
    pressure_bar: Option<f64>,
    remaining_min: Option<f64>,
    low_pressure: bool,
    very_low_pressure: bool,
    battery: Option<f64>,
    sos: bool,
    pass_alarm: bool,
    floor: Option<i32>,
    environment: Map<String, Value>,
}

impl TelemetryBuilder {
    fn new(id: String, name: String, team: String) -> Self {
        Self {
            id,
            name,
            team,
            rank: "sekc.".to_string(),
            role: "ratownik".to_string(),
            heart_rate: Some(92),
            stress: Some("low".to_string()),
            motion: Some("walking".to_string()),
            pressure_bar: Some(280.0),
            remaining_min: Some(42.0),
            low_pressure: false,
            very_low_pressure: false,
            battery: Some(80.0),
            sos: false,
            pass_alarm: false,
            floor: Some(1),
            environment: Map::new(),
        }
    }

    pub fn heart_rate(mut self, bpm: Option<u32>) -> Self {
        self.heart_rate = bpm;
        self
    }

    pub fn stress(mut self, level: &str) -> Self {
        self.stress = Some(level.to_string());
        self
    }

    pub fn motion(mut self, state: &str) -> Self {
        self.motion = Some(state.to_string());
        self
    }

    pub fn air(mut self, pressure_bar: Option<f64>, remaining_min: Option<f64>) -> Self {
        self.pressure_bar = pressure_bar;
        self.remaining_min = remaining_min;
        self
    }

    pub fn pressure_alarms(mut self, low: bool, very_low: bool) -> Self {
        self.low_pressure = low;
        self.very_low_pressure = very_low;
        self
    }

    pub fn battery(mut self, percent: Option<f64>) -> Self {
        self.battery = percent;
        self
    }

    pub fn sos(mut self, pressed: bool) -> Self {
        self.sos = pressed;
        self
    }

    pub fn pass_alarm(mut self, active: bool) -> Self {
        self.pass_alarm = active;
        self
    }

    pub fn floor(mut self, floor: i32) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Lecture capteur environnement (clé: co_ppm, co2_ppm, o2_percent, lel_percent, temperature_c)
    pub fn env(mut self, key: &str, value: f64) -> Self {
        self.environment.insert(key.to_string(), json!(value));
        self
    }

    pub fn build(self) -> Value {
        let pass_status = if self.pass_alarm { "alarm" } else { "active" };
        json!({
            "firefighter": {
                "id": self.id,
                "name": self.name,
                "rank": self.rank,
                "role": self.role,
                "team": self.team
            },
            "vitals": {
                "heart_rate_bpm": self.heart_rate,
                "hr_zone": "moderate",
                "motion_state": self.motion,
                "stress_level": self.stress,
                "skin_temperature_c": 36.8
            },
            "scba": {
                "cylinder_pressure_bar": self.pressure_bar,
                "remaining_time_min": self.remaining_min,
                "consumption_rate_lpm": 45.0,
                "battery_percent": 90,
                "alarms": {
                    "low_pressure": self.low_pressure,
                    "very_low_pressure": self.very_low_pressure
                }
            },
            "device": {
                "battery_percent": self.battery,
                "sos_button_pressed": self.sos,
                "connection_primary": "lora",
                "lora_rssi_dbm": -97,
                "firmware_version": "2.4.1"
            },
            "position": {
                "floor": self.floor,
                "accuracy_m": 0.8,
                "source": "uwb_fusion",
                "gps": { "satellites": 0 },
                "drift": { "drift_total_m": 0.4 }
            },
            "barometer": {
                "pressure_pa": 101325.0,
                "temperature_c": 24.0,
                "altitude_rel_m": 3.1,
                "vertical_speed_mps": 0.0
            },
            "imu": { "orientation": { "pitch": 2.0, "roll": -1.0 } },
            "pass_status": { "status": pass_status, "alarm_active": self.pass_alarm },
            "recco": { "detected": false },
            "black_box": { "recording": true, "storage_used_percent": 12 },
            "environment": Value::Object(self.environment),
            "heading_deg": 90,
            "uwb_measurements": [
                { "beacon_id": "B-01", "beacon_name": "Klatka A", "range_m": 4.2 }
            ]
        })
    }
}
