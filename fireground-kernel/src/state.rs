/**
 * ÉTAT PARTAGÉ - Store + registre d'alertes + sélection sous un seul verrou
 *
 * RÔLE : Un seul écrivain (la boucle du flux) et des lecteurs HTTP.
 * Chaque événement est appliqué en entier sous le verrou : un lecteur ne voit
 * jamais un état à moitié mis à jour.
 */

use crate::config::KernelConfig;
use crate::feed::FeedEvent;
use crate::ledger::{AlertLedger, PushOutcome};
use crate::selection::Selection;
use crate::store::LiveStateStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub store: LiveStateStore,
    pub ledger: AlertLedger,
    pub selection: Selection,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub alerts_expired: usize,
    pub firefighters_evicted: usize,
}

/// Indicateurs de la barre d'état
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub connected: bool,
    pub packets: u64,
    pub firefighters: usize,
    pub beacons: usize,
    pub active_alerts: usize,
}

impl DashboardState {
    pub fn from_config(cfg: &KernelConfig) -> Self {
        Self {
            store: LiveStateStore::new(cfg.roster.stale_policy()),
            ledger: AlertLedger::new(
                time::Duration::seconds(cfg.alerts.max_age_secs as i64),
                cfg.alerts.duplicate_policy,
            ),
            selection: Selection::default(),
            connected: false,
        }
    }

    pub fn apply(&mut self, event: FeedEvent, now: OffsetDateTime) {
        match event {
            FeedEvent::Telemetry(snapshot) => {
                let id = snapshot.id().to_string();
                if self.store.apply_firefighter_update(*snapshot, now) {
                    tracing::info!(firefighter = %id, "nouveau pompier suivi");
                }
            }
            FeedEvent::Beacons(batch) => {
                let count = batch.as_ref().map(Vec::len);
                if self.store.apply_beacon_batch(batch) {
                    tracing::debug!(beacons = ?count, "lot de balises appliqué");
                }
            }
            FeedEvent::Alert(record) => {
                let id = record.id.clone();
                let firefighter = record.firefighter_id.clone();
                match self.ledger.push(record, now) {
                    PushOutcome::Inserted => {
                        tracing::info!(alert = %id, firefighter = %firefighter, "alerte reçue")
                    }
                    PushOutcome::Replaced => tracing::info!(alert = %id, "alerte répétée, âge réinitialisé"),
                    PushOutcome::Rejected => tracing::debug!(alert = %id, "alerte en double ignorée"),
                }
            }
            FeedEvent::Connected => self.connected = true,
            FeedEvent::Disconnected => self.connected = false,
        }
    }

    pub fn sweep(&mut self, now: OffsetDateTime) -> SweepReport {
        let alerts_expired = self.ledger.sweep(now);
        let evicted = self.store.evict_stale(now);
        for id in &evicted {
            tracing::info!(firefighter = %id, "pompier évincé (silence prolongé)");
        }
        SweepReport { alerts_expired, firefighters_evicted: evicted.len() }
    }

    pub fn status(&self) -> StatusView {
        StatusView {
            connected: self.connected,
            packets: self.store.packet_count(),
            firefighters: self.store.firefighter_count(),
            beacons: self.store.beacons().len(),
            active_alerts: self.ledger.len(),
        }
    }
}
