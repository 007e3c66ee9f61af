/**
 * LIVE STATE STORE - Dernier snapshot connu par pompier + liste des balises
 *
 * RÔLE :
 * - Pompiers : table id -> snapshot, remplacement complet à chaque télémétrie
 * - Balises : collection remplacée en bloc à chaque lot beacons_data
 * - Compteur de paquets reçus (observabilité uniquement)
 *
 * Chaque entrée garde aussi son last_seen, l'historique de fréquence cardiaque
 * (20 derniers points) et l'historique des notifications (15 dernières).
 * Les entrées silencieuses depuis trop longtemps sont signalées "stale" puis
 * évincées par le balayage périodique.
 */

use crate::models::{BeaconSnapshot, FirefighterSnapshot};
use crate::notices::{active_notices, Notice, NoticeKind};
use std::collections::{HashMap, VecDeque};
use time::{Duration, OffsetDateTime};

pub const HR_HISTORY_LEN: usize = 20;
pub const NOTICE_HISTORY_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalePolicy {
    /// Au-delà : entrée affichée comme stale
    pub stale_after: Duration,
    /// Au-delà : entrée évincée au balayage (None = jamais)
    pub evict_after: Option<Duration>,
}

impl Default for StalePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::seconds(90),
            evict_after: Some(Duration::minutes(30)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedFirefighter {
    pub snapshot: FirefighterSnapshot,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
    pub hr_history: VecDeque<f64>,
    /// Plus récente en tête
    pub notices: VecDeque<Notice>,
    active: Vec<NoticeKind>,
}

impl TrackedFirefighter {
    fn new(snapshot: FirefighterSnapshot, now: OffsetDateTime) -> Self {
        let mut tracked = Self {
            snapshot: snapshot.clone(),
            first_seen: now,
            last_seen: now,
            hr_history: VecDeque::with_capacity(HR_HISTORY_LEN),
            notices: VecDeque::with_capacity(NOTICE_HISTORY_LEN),
            active: Vec::new(),
        };
        tracked.absorb(snapshot, now);
        tracked
    }

    fn absorb(&mut self, snapshot: FirefighterSnapshot, now: OffsetDateTime) {
        if let Some(bpm) = snapshot.vitals.heart_rate_bpm {
            if self.hr_history.len() == HR_HISTORY_LEN {
                self.hr_history.pop_front();
            }
            self.hr_history.push_back(bpm);
        }

        let active = active_notices(&snapshot);
        if active != self.active && !active.is_empty() {
            // le lot courant passe devant, dans l'ordre d'affichage
            for kind in active.iter().rev() {
                self.notices.push_front(Notice::new(*kind, now));
            }
            self.notices.truncate(NOTICE_HISTORY_LEN);
        }
        self.active = active;

        self.snapshot = snapshot;
        self.last_seen = now;
    }

    pub fn silence(&self, now: OffsetDateTime) -> Duration {
        now - self.last_seen
    }
}

#[derive(Debug, Default)]
pub struct LiveStateStore {
    firefighters: HashMap<String, TrackedFirefighter>,
    beacons: Vec<BeaconSnapshot>,
    packets: u64,
    policy: StalePolicy,
}

impl LiveStateStore {
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Remplace (ou crée) le snapshot du pompier. Retourne true si l'id était inconnu.
    pub fn apply_firefighter_update(&mut self, snapshot: FirefighterSnapshot, now: OffsetDateTime) -> bool {
        self.packets += 1;
        match self.firefighters.get_mut(snapshot.id()) {
            Some(tracked) => {
                tracked.absorb(snapshot, now);
                false
            }
            None => {
                let id = snapshot.id().to_string();
                self.firefighters.insert(id, TrackedFirefighter::new(snapshot, now));
                true
            }
        }
    }

    /// Lot de balises : None = message sans tableau, collection inchangée
    pub fn apply_beacon_batch(&mut self, beacons: Option<Vec<BeaconSnapshot>>) -> bool {
        self.packets += 1;
        match beacons {
            Some(list) => {
                self.beacons = list;
                true
            }
            None => false,
        }
    }

    /// Évince les pompiers silencieux depuis evict_after ; retourne les ids retirés
    pub fn evict_stale(&mut self, now: OffsetDateTime) -> Vec<String> {
        let Some(limit) = self.policy.evict_after else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        self.firefighters.retain(|id, tracked| {
            if tracked.silence(now) >= limit {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn is_stale(&self, tracked: &TrackedFirefighter, now: OffsetDateTime) -> bool {
        tracked.silence(now) > self.policy.stale_after
    }

    pub fn firefighter(&self, id: &str) -> Option<&TrackedFirefighter> {
        self.firefighters.get(id)
    }

    pub fn firefighters(&self) -> impl Iterator<Item = &TrackedFirefighter> {
        self.firefighters.values()
    }

    pub fn firefighter_count(&self) -> usize {
        self.firefighters.len()
    }

    pub fn beacons(&self) -> &[BeaconSnapshot] {
        &self.beacons
    }

    pub fn beacon(&self, id: &str) -> Option<&BeaconSnapshot> {
        self.beacons.iter().find(|b| b.id == id)
    }

    pub fn packet_count(&self) -> u64 {
        self.packets
    }
}
