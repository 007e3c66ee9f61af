/**
 * NOTIFICATIONS - Conditions actives d'un pompier
 *
 * RÔLE : Dérive d'un snapshot les conditions affichées dans le centre de
 * notifications de la vue détaillée.
 */

use crate::models::{FirefighterSnapshot, StressLevel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ScbaVeryLowPressure,
    ScbaLowPressure,
    PassAlarm,
    CriticalStress,
    SosPressed,
    LowTagBattery,
}

impl NoticeKind {
    pub fn level(self) -> NoticeLevel {
        match self {
            NoticeKind::ScbaLowPressure | NoticeKind::LowTagBattery => NoticeLevel::Warning,
            _ => NoticeLevel::Critical,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            NoticeKind::ScbaVeryLowPressure => "Critical SCBA pressure!",
            NoticeKind::ScbaLowPressure => "Low SCBA pressure",
            NoticeKind::PassAlarm => "PASS: no movement detected (ALARM)",
            NoticeKind::CriticalStress => "Critical stress level",
            NoticeKind::SosPressed => "SOS called!",
            NoticeKind::LowTagBattery => "Low tag battery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub level: NoticeLevel,
    pub text: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl Notice {
    pub fn new(kind: NoticeKind, at: OffsetDateTime) -> Self {
        Self { kind, level: kind.level(), text: kind.text(), at }
    }
}

/// Filtre de la liste de notifications (query `?notices=`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeFilter {
    #[default]
    All,
    Warning,
    Critical,
}

impl NoticeFilter {
    pub fn accepts(self, notice: &Notice) -> bool {
        match self {
            NoticeFilter::All => true,
            NoticeFilter::Warning => notice.level == NoticeLevel::Warning,
            NoticeFilter::Critical => notice.level == NoticeLevel::Critical,
        }
    }
}

/// Conditions actives, dans l'ordre d'affichage
pub fn active_notices(snap: &FirefighterSnapshot) -> Vec<NoticeKind> {
    let mut kinds = Vec::new();

    let alarms = &snap.scba.alarms;
    if alarms.very_low_pressure {
        kinds.push(NoticeKind::ScbaVeryLowPressure);
    } else if alarms.low_pressure {
        kinds.push(NoticeKind::ScbaLowPressure);
    }
    if snap.pass_status.alarm_active {
        kinds.push(NoticeKind::PassAlarm);
    }
    if snap.vitals.stress_level == Some(StressLevel::Critical) {
        kinds.push(NoticeKind::CriticalStress);
    }
    if snap.device.sos_button_pressed {
        kinds.push(NoticeKind::SosPressed);
    }
    if snap.device.battery_percent.is_some_and(|b| b < 20.0) {
        kinds.push(NoticeKind::LowTagBattery);
    }

    kinds
}
