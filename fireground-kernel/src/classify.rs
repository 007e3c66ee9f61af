/**
 * CLASSIFICATION DES MÉTRIQUES - Seuils capteurs et constantes vitales
 *
 * RÔLE : Fonctions pures (capteur, valeur) -> niveau + couleur + drapeau d'alerte.
 * Aucun état partagé, aucun effet de bord.
 *
 * Table des seuils atmosphère (bornes évaluées du plus grave au moins grave) :
 * Capteur | Critique   | Avertissement        | Normal
 * --------|------------|----------------------|--------
 * CO      | > 100 ppm  | 50 - 100 ppm         | < 50
 * CO2     | > 5000 ppm | 1000 - 5000 ppm      | < 1000
 * O2      | < 18 %     | 18 - 19.5 % (excl.)  | >= 19.5
 * LEL     | > 25 %     | > 10 - 25 %          | <= 10
 * Temp    | > 60 °C    | > 40 - 60 °C         | <= 40
 */

use crate::models::{PassState, PassStatus, ScbaAlarms, StressLevel};
use serde::{Deserialize, Serialize};

pub const COLOR_NORMAL: &str = "#37f58c";
pub const COLOR_WARNING: &str = "#f5c637";
pub const COLOR_CRITICAL: &str = "#ff4d4d";
pub const COLOR_DEFAULT: &str = "#aaa";
pub const COLOR_BACKGROUND: &str = "#2b2f36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn is_alert(self) -> bool {
        matches!(self, Severity::Warning | Severity::Critical)
    }

    pub fn color(self) -> &'static str {
        match self {
            Severity::Unknown => COLOR_DEFAULT,
            Severity::Normal => COLOR_NORMAL,
            Severity::Warning => COLOR_WARNING,
            Severity::Critical => COLOR_CRITICAL,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Severity::Unknown => "",
            Severity::Normal => "metric-normal",
            Severity::Warning => "metric-warning",
            Severity::Critical => "metric-critical",
        }
    }
}

/// Capteurs d'atmosphère connus ; `Other` couvre toute clé non reconnue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    CoPpm,
    Co2Ppm,
    O2Percent,
    LelPercent,
    TemperatureC,
    #[serde(other)]
    Other,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::CoPpm,
        SensorKind::Co2Ppm,
        SensorKind::O2Percent,
        SensorKind::LelPercent,
        SensorKind::TemperatureC,
    ];

    pub fn from_key(key: &str) -> Self {
        match key {
            "co_ppm" => SensorKind::CoPpm,
            "co2_ppm" => SensorKind::Co2Ppm,
            "o2_percent" => SensorKind::O2Percent,
            "lel_percent" => SensorKind::LelPercent,
            "temperature_c" => SensorKind::TemperatureC,
            _ => SensorKind::Other,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            SensorKind::CoPpm => "co_ppm",
            SensorKind::Co2Ppm => "co2_ppm",
            SensorKind::O2Percent => "o2_percent",
            SensorKind::LelPercent => "lel_percent",
            SensorKind::TemperatureC => "temperature_c",
            SensorKind::Other => "other",
        }
    }

    fn tier(self, v: f64) -> Severity {
        match self {
            SensorKind::CoPpm if v > 100.0 => Severity::Critical,
            SensorKind::CoPpm if v >= 50.0 => Severity::Warning,
            SensorKind::Co2Ppm if v > 5000.0 => Severity::Critical,
            SensorKind::Co2Ppm if v >= 1000.0 => Severity::Warning,
            SensorKind::O2Percent if v < 18.0 => Severity::Critical,
            SensorKind::O2Percent if v < 19.5 => Severity::Warning,
            SensorKind::LelPercent if v > 25.0 => Severity::Critical,
            SensorKind::LelPercent if v > 10.0 => Severity::Warning,
            SensorKind::TemperatureC if v > 60.0 => Severity::Critical,
            SensorKind::TemperatureC if v > 40.0 => Severity::Warning,
            _ => Severity::Normal,
        }
    }
}

/// Résultat d'affichage d'une métrique (tuile du dashboard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricStatus {
    pub severity: Severity,
    pub color: &'static str,
    pub background: &'static str,
    pub css_class: &'static str,
    pub is_alert: bool,
}

impl From<Severity> for MetricStatus {
    fn from(severity: Severity) -> Self {
        let is_alert = severity.is_alert();
        Self {
            severity,
            color: severity.color(),
            // le fond ne prend la couleur du niveau qu'en alerte
            background: if is_alert { severity.color() } else { COLOR_BACKGROUND },
            css_class: severity.css_class(),
            is_alert,
        }
    }
}

/// Classifie une lecture capteur. Valeur absente => Unknown quel que soit le capteur.
pub fn classify(kind: SensorKind, value: Option<f64>) -> MetricStatus {
    match value.filter(|v| v.is_finite()) {
        None => Severity::Unknown.into(),
        Some(v) => kind.tier(v).into(),
    }
}

/// Variante par clé textuelle ("co_ppm", ...)
pub fn classify_key(key: &str, value: Option<f64>) -> MetricStatus {
    classify(SensorKind::from_key(key), value)
}

// --- Constantes vitales ---

pub fn heart_rate_tier(bpm: Option<f64>) -> Severity {
    match bpm {
        None => Severity::Unknown,
        Some(v) if v > 180.0 => Severity::Critical,
        Some(v) if v > 120.0 => Severity::Warning,
        Some(_) => Severity::Normal,
    }
}

/// Autonomie d'air, échelle de la carte résumé
pub fn air_time_tier(minutes: Option<f64>) -> Severity {
    match minutes {
        None => Severity::Unknown,
        Some(m) if m < 10.0 => Severity::Critical,
        Some(m) if m < 20.0 => Severity::Warning,
        Some(_) => Severity::Normal,
    }
}

/// Temps de travail restant, échelle de la vue détaillée
pub fn work_time_tier(minutes: Option<f64>) -> Severity {
    match minutes {
        None => Severity::Unknown,
        Some(m) if m < 5.0 => Severity::Critical,
        Some(m) if m < 10.0 => Severity::Warning,
        Some(_) => Severity::Normal,
    }
}

pub fn scba_pressure_tier(alarms: &ScbaAlarms) -> Severity {
    if alarms.very_low_pressure {
        Severity::Critical
    } else if alarms.low_pressure {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

pub fn stress_tier(level: Option<StressLevel>) -> Severity {
    match level {
        None => Severity::Unknown,
        Some(StressLevel::Critical) => Severity::Critical,
        Some(StressLevel::High) => Severity::Warning,
        Some(_) => Severity::Normal,
    }
}

pub fn pass_tier(pass: &PassStatus) -> Severity {
    if pass.alarm_active {
        Severity::Critical
    } else if pass.status == Some(PassState::PreAlarm) {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

pub fn tag_battery_tier(percent: Option<f64>) -> Severity {
    match percent {
        None => Severity::Unknown,
        Some(p) if p < 20.0 => Severity::Warning,
        Some(_) => Severity::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_co_tiers() {
        let critical = classify_key("co_ppm", Some(150.0));
        assert_eq!(critical.severity, Severity::Critical);
        assert!(critical.is_alert);
        assert_eq!(critical.color, COLOR_CRITICAL);
        assert_eq!(critical.background, COLOR_CRITICAL);

        let warning = classify_key("co_ppm", Some(75.0));
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.is_alert);

        let normal = classify_key("co_ppm", Some(20.0));
        assert_eq!(normal.severity, Severity::Normal);
        assert!(!normal.is_alert);
        assert_eq!(normal.background, COLOR_BACKGROUND);
        assert_eq!(normal.css_class, "metric-normal");
    }

    #[test]
    fn test_o2_tiers() {
        assert_eq!(classify_key("o2_percent", Some(17.0)).severity, Severity::Critical);
        assert_eq!(classify_key("o2_percent", Some(19.0)).severity, Severity::Warning);
        assert_eq!(classify_key("o2_percent", Some(20.9)).severity, Severity::Normal);
    }

    #[test]
    fn test_boundaries_take_first_branch() {
        assert_eq!(classify(SensorKind::CoPpm, Some(100.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::CoPpm, Some(50.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Co2Ppm, Some(5000.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Co2Ppm, Some(1000.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Co2Ppm, Some(999.0)).severity, Severity::Normal);
        assert_eq!(classify(SensorKind::O2Percent, Some(18.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::O2Percent, Some(19.5)).severity, Severity::Normal);
        assert_eq!(classify(SensorKind::LelPercent, Some(10.0)).severity, Severity::Normal);
        assert_eq!(classify(SensorKind::LelPercent, Some(25.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::TemperatureC, Some(40.0)).severity, Severity::Normal);
        assert_eq!(classify(SensorKind::TemperatureC, Some(60.0)).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::TemperatureC, Some(60.5)).severity, Severity::Critical);
    }

    #[test]
    fn test_absent_value_is_unknown_for_every_kind() {
        for kind in SensorKind::ALL.into_iter().chain([SensorKind::Other]) {
            let status = classify(kind, None);
            assert_eq!(status.severity, Severity::Unknown);
            assert!(!status.is_alert);
            assert_eq!(status.color, COLOR_DEFAULT);
            assert_eq!(status.css_class, "");
        }
    }

    #[test]
    fn test_unknown_sensor_is_always_normal() {
        let status = classify_key("radiation_usv", Some(9999.0));
        assert_eq!(status.severity, Severity::Normal);
        assert!(!status.is_alert);
    }

    #[test]
    fn test_vital_tiers() {
        assert_eq!(heart_rate_tier(Some(181.0)), Severity::Critical);
        assert_eq!(heart_rate_tier(Some(180.0)), Severity::Warning);
        assert_eq!(heart_rate_tier(Some(120.0)), Severity::Normal);
        assert_eq!(heart_rate_tier(None), Severity::Unknown);

        assert_eq!(air_time_tier(Some(9.0)), Severity::Critical);
        assert_eq!(air_time_tier(Some(19.0)), Severity::Warning);
        assert_eq!(work_time_tier(Some(9.0)), Severity::Warning);
        assert_eq!(work_time_tier(Some(4.0)), Severity::Critical);

        assert_eq!(stress_tier(Some(StressLevel::High)), Severity::Warning);
        assert_eq!(tag_battery_tier(Some(19.0)), Severity::Warning);

        let alarms = ScbaAlarms { low_pressure: true, very_low_pressure: true };
        assert_eq!(scba_pressure_tier(&alarms), Severity::Critical);

        let pass = PassStatus { status: Some(PassState::PreAlarm), alarm_active: false };
        assert_eq!(pass_tier(&pass), Severity::Warning);
    }
}
