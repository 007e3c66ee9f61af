/**
 * REGISTRE D'ALERTES - Alertes transitoires poussées par le flux
 *
 * RÔLE : Liste ordonnée (plus récente en tête) des alertes new_alert.
 * Une alerte disparaît sur acquittement opérateur ou par vieillissement.
 *
 * FONCTIONNEMENT :
 * - push : insertion en tête ; id en double => politique Replace (défaut) ou Reject
 * - dismiss : suppression par id, no-op si absent
 * - sweep(now) : retire toute alerte d'âge >= max_age (borne incluse : 3 min pile => retirée)
 *
 * Le registre est passif : c'est la boucle du flux qui appelle sweep à intervalle fixe.
 */

use crate::models::AlertRecord;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// L'ancienne entrée est retirée, la nouvelle repart de zéro
    #[default]
    Replace,
    /// La nouvelle alerte est ignorée
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted,
    Replaced,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub record: AlertRecord,
    /// Horodatage de référence pour le vieillissement
    pub created_at: OffsetDateTime,
}

impl LedgerEntry {
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        now - self.created_at
    }
}

#[derive(Debug, Clone)]
pub struct AlertLedger {
    entries: VecDeque<LedgerEntry>,
    max_age: Duration,
    policy: DuplicatePolicy,
}

impl AlertLedger {
    pub const DEFAULT_MAX_AGE: Duration = Duration::minutes(3);

    pub fn new(max_age: Duration, policy: DuplicatePolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            max_age,
            policy,
        }
    }

    /// Ajoute une alerte en tête. Sans horodatage, l'heure de réception fait foi.
    /// Un remplacement repart de zéro même si le flux renvoie le même horodatage (QoS 1).
    pub fn push(&mut self, record: AlertRecord, now: OffsetDateTime) -> PushOutcome {
        let existing = self.entries.iter().position(|e| e.record.id == record.id);

        let (outcome, created_at) = match (existing, self.policy) {
            (Some(_), DuplicatePolicy::Reject) => return PushOutcome::Rejected,
            (Some(idx), DuplicatePolicy::Replace) => {
                self.entries.remove(idx);
                (PushOutcome::Replaced, record.timestamp.map_or(now, |ts| ts.max(now)))
            }
            (None, _) => (PushOutcome::Inserted, record.timestamp.unwrap_or(now)),
        };

        self.entries.push_front(LedgerEntry { record, created_at });
        outcome
    }

    /// Acquittement opérateur. Retourne false si l'id n'existe pas.
    pub fn dismiss(&mut self, id: &str) -> bool {
        match self.entries.iter().position(|e| e.record.id == id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Retire les alertes expirées ; idempotent pour un `now` donné
    pub fn sweep(&mut self, now: OffsetDateTime) -> usize {
        let before = self.entries.len();
        let max_age = self.max_age;
        self.entries.retain(|e| e.age(now) < max_age);
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn for_firefighter<'a>(&'a self, firefighter_id: &'a str) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.record.firefighter_id == firefighter_id)
    }

    pub fn has_alerts_for(&self, firefighter_id: &str) -> bool {
        self.for_firefighter(firefighter_id).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
impl AlertLedger {
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.record.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlertLedger {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_AGE, DuplicatePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertType;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2026-10-16 12:00:00 UTC);

    fn alert(id: &str, ff: &str, at: OffsetDateTime) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            alert_type: AlertType::Sos,
            firefighter_id: ff.to_string(),
            firefighter_name: Some("Jan Kowalski".into()),
            floor: Some(2),
            timestamp: Some(at),
        }
    }

    fn ids(ledger: &AlertLedger) -> Vec<String> {
        ledger.iter().map(|e| e.record.id.clone()).collect()
    }

    #[test]
    fn test_push_is_newest_first() {
        let mut ledger = AlertLedger::default();
        ledger.push(alert("a", "FF-1", T0), T0);
        ledger.push(alert("b", "FF-2", T0), T0);
        ledger.push(alert("c", "FF-1", T0), T0);
        assert_eq!(ids(&ledger), vec!["c", "b", "a"]);
        assert_eq!(ledger.for_firefighter("FF-1").count(), 2);
        assert!(ledger.has_alerts_for("FF-2"));
        assert!(!ledger.has_alerts_for("FF-3"));
    }

    #[test]
    fn test_duplicate_replace_resets_age() {
        let mut ledger = AlertLedger::default();
        ledger.push(alert("a", "FF-1", T0), T0);
        ledger.push(alert("b", "FF-1", T0), T0);

        let later = T0 + Duration::minutes(2);
        assert_eq!(ledger.push(alert("a", "FF-1", later), later), PushOutcome::Replaced);
        assert_eq!(ids(&ledger), vec!["a", "b"]);

        // "b" expire, "a" (réinitialisée) survit
        ledger.sweep(T0 + Duration::minutes(4));
        assert_eq!(ids(&ledger), vec!["a"]);
    }

    #[test]
    fn test_redelivered_alert_with_same_timestamp_resets_age() {
        let mut ledger = AlertLedger::default();
        let record = alert("a", "FF-1", T0);
        ledger.push(record.clone(), T0);

        let redelivered_at = T0 + Duration::seconds(170);
        assert_eq!(ledger.push(record, redelivered_at), PushOutcome::Replaced);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.iter().next().unwrap().created_at, redelivered_at);

        ledger.sweep(T0 + Duration::seconds(185));
        assert!(ledger.contains("a"));
        ledger.sweep(redelivered_at + AlertLedger::DEFAULT_MAX_AGE);
        assert!(!ledger.contains("a"));
    }

    #[test]
    fn test_duplicate_reject_keeps_original() {
        let mut ledger = AlertLedger::new(AlertLedger::DEFAULT_MAX_AGE, DuplicatePolicy::Reject);
        ledger.push(alert("a", "FF-1", T0), T0);
        let later = T0 + Duration::minutes(2);
        assert_eq!(ledger.push(alert("a", "FF-9", later), later), PushOutcome::Rejected);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.iter().next().unwrap().record.firefighter_id, "FF-1");
        assert_eq!(ledger.iter().next().unwrap().created_at, T0);
    }

    #[test]
    fn test_dismiss_absent_is_noop() {
        let mut ledger = AlertLedger::default();
        ledger.push(alert("a", "FF-1", T0), T0);
        assert!(!ledger.dismiss("zzz"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.dismiss("a"));
        assert!(ledger.is_empty());
        assert!(!ledger.dismiss("a"));
    }

    #[test]
    fn test_sweep_lifecycle_with_five_second_cadence() {
        let mut ledger = AlertLedger::default();
        ledger.push(alert("a", "FF-1", T0), T0);

        assert!(ledger.contains("a"));
        ledger.sweep(T0 + Duration::seconds(179));
        assert!(ledger.contains("a"));

        // balayage toutes les 5 s à partir d'une phase arbitraire
        let mut t = T0 + Duration::seconds(177);
        while t <= T0 + Duration::seconds(185) {
            ledger.sweep(t);
            t += Duration::seconds(5);
        }
        assert!(!ledger.contains("a"));
    }

    #[test]
    fn test_sweep_boundary_is_inclusive() {
        let mut ledger = AlertLedger::default();
        ledger.push(alert("a", "FF-1", T0), T0);
        ledger.sweep(T0 + Duration::seconds(180) - Duration::milliseconds(1));
        assert!(ledger.contains("a"));
        assert_eq!(ledger.sweep(T0 + Duration::seconds(180)), 1);
        assert!(!ledger.contains("a"));
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut once = AlertLedger::default();
        let mut twice = AlertLedger::default();
        for (id, offset) in [("a", 0), ("b", 60), ("c", 150)] {
            let at = T0 + Duration::seconds(offset);
            once.push(alert(id, "FF-1", at), at);
            twice.push(alert(id, "FF-1", at), at);
        }
        let now = T0 + Duration::seconds(200);
        once.sweep(now);
        twice.sweep(now);
        assert_eq!(twice.sweep(now), 0);
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), vec!["c", "b"]);
    }

    #[test]
    fn test_missing_timestamp_uses_receive_time() {
        let mut ledger = AlertLedger::default();
        let mut record = alert("a", "FF-1", T0);
        record.timestamp = None;
        let received = T0 + Duration::minutes(10);
        ledger.push(record, received);
        assert_eq!(ledger.iter().next().unwrap().created_at, received);
    }
}
