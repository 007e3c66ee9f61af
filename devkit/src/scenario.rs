/*!
Scénario synthétique pour le simulateur de flux

Génère, pour un tick donné, les messages qu'un vrai réseau de balises et
de tags pompiers émettrait. Tout est déterministe (aucun aléa) pour que
les sessions de dev soient reproductibles.
*/

use crate::payloads::{self, FiregroundMessageBuilder};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

const NAMES: [&str; 6] = [
    "Jan Kowalski",
    "Anna Nowak",
    "Piotr Wiśniewski",
    "Marta Zielińska",
    "Tomasz Lewandowski",
    "Ewa Wójcik",
];
const TEAMS: [&str; 2] = ["Alpha", "Bravo"];
const ALERT_TYPES: [&str; 5] = ["SOS", "LOW_AIR", "CRITICAL_VITALS", "NO_MOVEMENT", "FALL_DETECTED"];

/// Un message prêt à publier: (kind, payload)
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub kind: &'static str,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    firefighters: usize,
    beacon_every: u64,
    alert_every: u64,
}

impl Scenario {
    pub fn new(firefighters: usize) -> Self {
        Self {
            firefighters: firefighters.max(1),
            beacon_every: 5,
            alert_every: 45,
        }
    }

    pub fn firefighter_id(index: usize) -> String {
        format!("FF-{:03}", index + 1)
    }

    /// Messages à émettre pour le tick `tick` (1 tick = 1 seconde)
    pub fn frames(&self, tick: u64) -> Vec<Frame> {
        let mut frames: Vec<Frame> = (0..self.firefighters)
            .map(|i| Frame {
                kind: payloads::TELEMETRY,
                payload: self.telemetry_for(i, tick),
            })
            .collect();

        if tick % self.beacon_every == 0 {
            frames.push(Frame {
                kind: payloads::BEACONS_DATA,
                payload: FiregroundMessageBuilder::beacons_batch(&[
                    ("B-01", "Klatka A"),
                    ("B-02", "Klatka B"),
                    ("B-03", "Hol parter"),
                ]),
            });
        }

        if tick > 0 && tick % self.alert_every == 0 {
            let n = (tick / self.alert_every) as usize;
            let index = n % self.firefighters;
            frames.push(Frame {
                kind: payloads::NEW_ALERT,
                payload: FiregroundMessageBuilder::new_alert_now(
                    &format!("A-{tick}"),
                    ALERT_TYPES[n % ALERT_TYPES.len()],
                    &Self::firefighter_id(index),
                    NAMES[index % NAMES.len()],
                    (index % 4) as i32,
                ),
            });
        }

        frames
    }

    fn telemetry_for(&self, index: usize, tick: u64) -> Value {
        let phase = (tick + index as u64 * 7) % 60;
        // Consommation d'air linéaire, recharge toutes les 30 min
        let elapsed_min = (tick % 1800) as f64 / 60.0;
        let remaining = (45.0 - elapsed_min - index as f64 * 3.0).max(0.0);
        let pressure = (300.0 * remaining / 45.0).round();
        let heart_rate = 90 + (phase as u32 * 3) % 110;
        let stress = match heart_rate {
            hr if hr > 180 => "critical",
            hr if hr > 150 => "high",
            hr if hr > 120 => "moderate",
            _ => "low",
        };
        let battery = (100.0 - (tick as f64 / 120.0) - index as f64 * 5.0).max(0.0);

        FiregroundMessageBuilder::telemetry(
            Self::firefighter_id(index),
            NAMES[index % NAMES.len()].to_string(),
            TEAMS[index % TEAMS.len()].to_string(),
        )
        .heart_rate(Some(heart_rate))
        .stress(stress)
        .motion(if phase < 50 { "walking" } else { "stationary" })
        .air(Some(pressure), Some(remaining.round()))
        .pressure_alarms(pressure < 110.0, pressure < 55.0)
        .battery(Some(battery.round()))
        .floor((index % 4) as i32)
        .env("co_ppm", 20.0 + phase as f64 * 2.0)
        .env("co2_ppm", 600.0 + phase as f64 * 30.0)
        .env("o2_percent", 20.9 - phase as f64 * 0.05)
        .env("lel_percent", phase as f64 * 0.4)
        .env("temperature_c", 25.0 + phase as f64)
        .build()
    }
}

/// Horodatage courant, utile pour les logs du simulateur
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
