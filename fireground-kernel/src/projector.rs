/**
 * VIEW PROJECTOR - Vues dérivées servies au dashboard
 *
 * RÔLE : Fonctions pures (store, registre, filtres, now) -> vues sérialisables.
 * Recalculées à chaque requête, rien n'est mis en cache.
 *
 * FONCTIONNEMENT :
 * - recompute : liste filtrée (recherche ET équipe) puis triée, égalités départagées par id
 * - alarming : présence d'une alerte au registre OU dépassement télémétrique
 * - firefighter_detail : snapshot + niveaux par métrique + capteurs + historiques
 */

use crate::classify::{self, MetricStatus, SensorKind, Severity};
use crate::ledger::{AlertLedger, LedgerEntry};
use crate::models::{FirefighterSnapshot, MotionState, StressLevel};
use crate::notices::{Notice, NoticeFilter, NoticeLevel};
use crate::store::{LiveStateStore, TrackedFirefighter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Id,
    Name,
    BatteryAsc,
    BatteryDesc,
}

/// Contrôles de la liste (query string de GET /firefighters)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewFilters {
    #[serde(default)]
    pub search: String,
    /// None ou "all" => pas de filtre
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
}

impl ViewFilters {
    fn matches(&self, snap: &FirefighterSnapshot) -> bool {
        let needle = self.search.to_lowercase();
        let search_ok = needle.is_empty()
            || snap.firefighter.name.to_lowercase().contains(&needle)
            || snap.firefighter.id.to_lowercase().contains(&needle);

        let team_ok = match self.team.as_deref() {
            None | Some("all") | Some("") => true,
            Some(team) => snap.firefighter.team.as_deref() == Some(team),
        };

        search_ok && team_ok
    }
}

/// Dépassements télémétriques qui rendent une carte "en alarme"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryBreach {
    VeryLowPressure,
    CriticalStress,
    LowAirTime,
    HighHeartRate,
    LowBattery,
}

pub fn breaches(snap: &FirefighterSnapshot) -> Vec<TelemetryBreach> {
    let mut out = Vec::new();
    if snap.scba.alarms.very_low_pressure {
        out.push(TelemetryBreach::VeryLowPressure);
    }
    if snap.vitals.stress_level == Some(StressLevel::Critical) {
        out.push(TelemetryBreach::CriticalStress);
    }
    if snap.scba.remaining_time_min.is_some_and(|m| m < 10.0) {
        out.push(TelemetryBreach::LowAirTime);
    }
    if snap.vitals.heart_rate_bpm.is_some_and(|hr| hr > 180.0) {
        out.push(TelemetryBreach::HighHeartRate);
    }
    if snap.device.battery_percent.is_some_and(|b| b < 10.0) {
        out.push(TelemetryBreach::LowBattery);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    pub firefighter_id: String,
    pub firefighter_name: Option<String>,
    pub floor: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub age_seconds: i64,
}

impl AlertView {
    fn from_entry(entry: &LedgerEntry, now: OffsetDateTime) -> Self {
        let record = &entry.record;
        Self {
            id: record.id.clone(),
            alert_type: record.alert_type.tag().to_string(),
            message: record.alert_type.message(),
            firefighter_id: record.firefighter_id.clone(),
            firefighter_name: record.firefighter_name.clone(),
            floor: record.floor,
            created_at: entry.created_at,
            age_seconds: entry.age(now).whole_seconds().max(0),
        }
    }
}

/// Carte résumé d'un pompier
#[derive(Debug, Clone, Serialize)]
pub struct FirefighterView {
    pub id: String,
    pub name: String,
    pub rank: Option<String>,
    pub role: Option<String>,
    pub team: Option<String>,
    pub alarming: bool,
    pub breaches: Vec<TelemetryBreach>,
    pub alerts: Vec<AlertView>,
    pub heart_rate_bpm: Option<f64>,
    pub heart_rate_tier: Severity,
    pub floor: Option<i32>,
    pub battery_percent: Option<f64>,
    pub motion_state: Option<MotionState>,
    pub cylinder_pressure_bar: Option<f64>,
    pub remaining_time_min: Option<f64>,
    pub air_tier: Severity,
    pub stale: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

fn summarize(store: &LiveStateStore, ledger: &AlertLedger, tracked: &TrackedFirefighter, now: OffsetDateTime) -> FirefighterView {
    let snap = &tracked.snapshot;
    let alerts: Vec<AlertView> = ledger
        .for_firefighter(snap.id())
        .map(|e| AlertView::from_entry(e, now))
        .collect();
    let breaches = breaches(snap);

    FirefighterView {
        id: snap.firefighter.id.clone(),
        name: snap.firefighter.name.clone(),
        rank: snap.firefighter.rank.clone(),
        role: snap.firefighter.role.clone(),
        team: snap.firefighter.team.clone(),
        alarming: is_alarming(ledger, snap),
        breaches,
        alerts,
        heart_rate_bpm: snap.vitals.heart_rate_bpm,
        heart_rate_tier: classify::heart_rate_tier(snap.vitals.heart_rate_bpm),
        floor: snap.position.floor,
        battery_percent: snap.device.battery_percent,
        motion_state: snap.vitals.motion_state,
        cylinder_pressure_bar: snap.scba.cylinder_pressure_bar,
        remaining_time_min: snap.scba.remaining_time_min,
        air_tier: classify::air_time_tier(snap.scba.remaining_time_min),
        stale: store.is_stale(tracked, now),
        last_seen: tracked.last_seen,
    }
}

/// Alarme = alerte au registre OU dépassement télémétrique
pub fn is_alarming(ledger: &AlertLedger, snap: &FirefighterSnapshot) -> bool {
    ledger.has_alerts_for(snap.id()) || !breaches(snap).is_empty()
}

fn battery(snap: &FirefighterSnapshot) -> f64 {
    snap.device.battery_percent.unwrap_or(0.0)
}

fn compare(sort: SortKey, a: &FirefighterSnapshot, b: &FirefighterSnapshot) -> Ordering {
    let primary = match sort {
        SortKey::Id => Ordering::Equal,
        SortKey::Name => a
            .firefighter
            .name
            .to_lowercase()
            .cmp(&b.firefighter.name.to_lowercase()),
        SortKey::BatteryAsc => battery(a).total_cmp(&battery(b)),
        SortKey::BatteryDesc => battery(b).total_cmp(&battery(a)),
    };
    primary.then_with(|| a.firefighter.id.cmp(&b.firefighter.id))
}

/// Liste affichée : filtres combinés en ET, tri total
pub fn recompute(store: &LiveStateStore, ledger: &AlertLedger, filters: &ViewFilters, now: OffsetDateTime) -> Vec<FirefighterView> {
    let mut rows: Vec<&TrackedFirefighter> = store
        .firefighters()
        .filter(|t| filters.matches(&t.snapshot))
        .collect();
    rows.sort_by(|a, b| compare(filters.sort, &a.snapshot, &b.snapshot));
    rows.into_iter()
        .map(|t| summarize(store, ledger, t, now))
        .collect()
}

/// Équipes distinctes pour le menu de filtre
pub fn teams(store: &LiveStateStore) -> Vec<String> {
    store
        .firefighters()
        .filter_map(|t| t.snapshot.firefighter.team.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn alert_views(ledger: &AlertLedger, now: OffsetDateTime) -> Vec<AlertView> {
    ledger.iter().map(|e| AlertView::from_entry(e, now)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct VitalTiers {
    pub heart_rate: Severity,
    pub stress: Severity,
    pub scba_pressure: Severity,
    pub work_time: Severity,
    pub pass: Severity,
    pub tag_battery: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReading {
    pub sensor: SensorKind,
    pub key: String,
    pub value: Option<f64>,
    pub status: MetricStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirefighterDetail {
    pub summary: FirefighterView,
    pub snapshot: FirefighterSnapshot,
    pub tiers: VitalTiers,
    pub environment: Vec<EnvironmentReading>,
    pub notices: Vec<Notice>,
    pub notice_count: usize,
    pub has_critical_notices: bool,
    pub hr_history: Vec<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
}

pub fn firefighter_detail(
    store: &LiveStateStore,
    ledger: &AlertLedger,
    id: &str,
    notice_filter: NoticeFilter,
    now: OffsetDateTime,
) -> Option<FirefighterDetail> {
    let tracked = store.firefighter(id)?;
    let snap = &tracked.snapshot;
    let env = &snap.environment;

    let known = SensorKind::ALL.into_iter().map(|sensor| {
        let value = match sensor {
            SensorKind::CoPpm => env.co_ppm,
            SensorKind::Co2Ppm => env.co2_ppm,
            SensorKind::O2Percent => env.o2_percent,
            SensorKind::LelPercent => env.lel_percent,
            SensorKind::TemperatureC => env.temperature_c,
            SensorKind::Other => None,
        };
        EnvironmentReading { sensor, key: sensor.key().to_string(), value, status: classify::classify(sensor, value) }
    });
    let others = env.extra.iter().map(|(key, raw)| {
        let value = raw.as_f64();
        EnvironmentReading {
            sensor: SensorKind::from_key(key),
            key: key.clone(),
            value,
            status: classify::classify_key(key, value),
        }
    });
    let environment = known.chain(others).collect();

    Some(FirefighterDetail {
        summary: summarize(store, ledger, tracked, now),
        snapshot: snap.clone(),
        tiers: VitalTiers {
            heart_rate: classify::heart_rate_tier(snap.vitals.heart_rate_bpm),
            stress: classify::stress_tier(snap.vitals.stress_level),
            scba_pressure: classify::scba_pressure_tier(&snap.scba.alarms),
            work_time: classify::work_time_tier(snap.scba.remaining_time_min),
            pass: classify::pass_tier(&snap.pass_status),
            tag_battery: classify::tag_battery_tier(snap.device.battery_percent),
        },
        environment,
        notices: tracked
            .notices
            .iter()
            .filter(|n| notice_filter.accepts(n))
            .cloned()
            .collect(),
        notice_count: tracked.notices.len(),
        has_critical_notices: tracked.notices.iter().any(|n| n.level == NoticeLevel::Critical),
        hr_history: tracked.hr_history.iter().copied().collect(),
        first_seen: tracked.first_seen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertRecord;
    use fireground_devkit::FiregroundMessageBuilder;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2026-10-16 12:00:00 UTC);

    fn ingest(store: &mut LiveStateStore, payload: serde_json::Value) {
        let snap: FirefighterSnapshot = serde_json::from_value(payload).unwrap();
        store.apply_firefighter_update(snap, T0);
    }

    fn roster() -> LiveStateStore {
        let mut store = LiveStateStore::default();
        ingest(&mut store, FiregroundMessageBuilder::telemetry("FF-003", "Piotr Wiśniewski", "Bravo").battery(Some(55.0)).build());
        ingest(&mut store, FiregroundMessageBuilder::telemetry("FF-001", "Jan Kowalski", "Alpha").battery(Some(80.0)).build());
        ingest(&mut store, FiregroundMessageBuilder::telemetry("FF-002", "Anna Nowak", "Alpha").battery(None).build());
        ingest(&mut store, FiregroundMessageBuilder::telemetry("FF-004", "Adam Nowak", "Bravo").battery(Some(55.0)).build());
        store
    }

    fn ids(views: &[FirefighterView]) -> Vec<&str> {
        views.iter().map(|v| v.id.as_str()).collect()
    }

    fn filters(search: &str, team: Option<&str>, sort: SortKey) -> ViewFilters {
        ViewFilters { search: search.to_string(), team: team.map(str::to_string), sort }
    }

    #[test]
    fn test_default_sort_by_id() {
        let store = roster();
        let views = recompute(&store, &AlertLedger::default(), &ViewFilters::default(), T0);
        assert_eq!(ids(&views), vec!["FF-001", "FF-002", "FF-003", "FF-004"]);
    }

    #[test]
    fn test_battery_sorts_with_missing_as_zero_and_id_tiebreak() {
        let store = roster();
        let ledger = AlertLedger::default();
        let asc = recompute(&store, &ledger, &filters("", None, SortKey::BatteryAsc), T0);
        assert_eq!(ids(&asc), vec!["FF-002", "FF-003", "FF-004", "FF-001"]);

        let desc = recompute(&store, &ledger, &filters("", None, SortKey::BatteryDesc), T0);
        assert_eq!(ids(&desc), vec!["FF-001", "FF-003", "FF-004", "FF-002"]);
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let store = roster();
        let views = recompute(&store, &AlertLedger::default(), &filters("", None, SortKey::Name), T0);
        assert_eq!(ids(&views), vec!["FF-004", "FF-002", "FF-001", "FF-003"]);
    }

    #[test]
    fn test_search_matches_name_or_id_case_insensitive() {
        let store = roster();
        let ledger = AlertLedger::default();
        let by_name = recompute(&store, &ledger, &filters("NOWAK", None, SortKey::Id), T0);
        assert_eq!(ids(&by_name), vec!["FF-002", "FF-004"]);

        let by_id = recompute(&store, &ledger, &filters("ff-003", None, SortKey::Id), T0);
        assert_eq!(ids(&by_id), vec!["FF-003"]);
    }

    #[test]
    fn test_search_is_a_raw_substring() {
        let store = roster();
        let ledger = AlertLedger::default();
        let padded = recompute(&store, &ledger, &filters("nowak ", None, SortKey::Id), T0);
        assert!(padded.is_empty());

        let inner = recompute(&store, &ledger, &filters("a now", None, SortKey::Id), T0);
        assert_eq!(ids(&inner), vec!["FF-002", "FF-004"]);
    }

    #[test]
    fn test_search_and_team_filters_combine() {
        let store = roster();
        let ledger = AlertLedger::default();
        let none = recompute(&store, &ledger, &filters("Kowalski", Some("Bravo"), SortKey::Id), T0);
        assert!(none.is_empty());

        let all = recompute(&store, &ledger, &filters("Kowalski", Some("all"), SortKey::Id), T0);
        assert_eq!(ids(&all), vec!["FF-001"]);

        let bravo = recompute(&store, &ledger, &filters("", Some("Bravo"), SortKey::Id), T0);
        assert_eq!(ids(&bravo), vec!["FF-003", "FF-004"]);
    }

    #[test]
    fn test_alarming_from_ledger_only() {
        let store = roster();
        let mut ledger = AlertLedger::default();
        ledger.push(
            AlertRecord {
                id: "A-1".into(),
                alert_type: "NO_MOVEMENT".to_string().into(),
                firefighter_id: "FF-002".into(),
                firefighter_name: Some("Anna Nowak".into()),
                floor: Some(1),
                timestamp: Some(T0),
            },
            T0,
        );

        let views = recompute(&store, &ledger, &ViewFilters::default(), T0 + time::Duration::seconds(30));
        let anna = views.iter().find(|v| v.id == "FF-002").unwrap();
        assert!(anna.alarming);
        assert!(anna.breaches.is_empty());
        assert_eq!(anna.alerts.len(), 1);
        assert_eq!(anna.alerts[0].age_seconds, 30);
        assert!(views.iter().filter(|v| v.id != "FF-002").all(|v| !v.alarming));
    }

    #[test]
    fn test_each_breach_alone_triggers_alarm() {
        let base = || FiregroundMessageBuilder::telemetry("FF-9", "Test", "Alpha");
        let cases = [
            (base().pressure_alarms(true, true).build(), TelemetryBreach::VeryLowPressure),
            (base().stress("critical").build(), TelemetryBreach::CriticalStress),
            (base().air(Some(60.0), Some(9.0)).build(), TelemetryBreach::LowAirTime),
            (base().heart_rate(Some(181)).build(), TelemetryBreach::HighHeartRate),
            (base().battery(Some(9.0)).build(), TelemetryBreach::LowBattery),
        ];

        let ledger = AlertLedger::default();
        for (payload, expected) in cases {
            let mut store = LiveStateStore::default();
            ingest(&mut store, payload);
            let views = recompute(&store, &ledger, &ViewFilters::default(), T0);
            assert_eq!(views[0].breaches, vec![expected]);
            assert!(views[0].alarming);
            assert!(views[0].alerts.is_empty());
        }

        let calm: FirefighterSnapshot = serde_json::from_value(
            base().heart_rate(Some(180)).battery(Some(10.0)).air(Some(200.0), Some(10.0)).build(),
        )
        .unwrap();
        assert!(!is_alarming(&ledger, &calm));
    }

    #[test]
    fn test_absent_values_never_breach() {
        let snap: FirefighterSnapshot =
            serde_json::from_value(serde_json::json!({ "firefighter": { "id": "FF-1", "name": "X" } })).unwrap();
        assert!(breaches(&snap).is_empty());
    }

    #[test]
    fn test_teams_are_distinct_and_sorted() {
        assert_eq!(teams(&roster()), vec!["Alpha".to_string(), "Bravo".to_string()]);
    }

    #[test]
    fn test_detail_classifies_environment_and_filters_notices() {
        let mut store = LiveStateStore::default();
        ingest(
            &mut store,
            FiregroundMessageBuilder::telemetry("FF-1", "Jan", "Alpha")
                .env("co_ppm", 150.0)
                .env("o2_percent", 19.0)
                .env("h2s_ppm", 40.0)
                .pressure_alarms(true, false)
                .pass_alarm(true)
                .build(),
        );

        let detail =
            firefighter_detail(&store, &AlertLedger::default(), "FF-1", NoticeFilter::Warning, T0).unwrap();
        let co = detail.environment.iter().find(|r| r.sensor == SensorKind::CoPpm).unwrap();
        assert_eq!(co.status.severity, Severity::Critical);
        let o2 = detail.environment.iter().find(|r| r.sensor == SensorKind::O2Percent).unwrap();
        assert_eq!(o2.status.severity, Severity::Warning);
        let lel = detail.environment.iter().find(|r| r.sensor == SensorKind::LelPercent).unwrap();
        assert_eq!(lel.status.severity, Severity::Unknown);
        let h2s = detail.environment.iter().find(|r| r.key == "h2s_ppm").unwrap();
        assert_eq!(h2s.sensor, SensorKind::Other);
        assert_eq!(h2s.status.severity, Severity::Normal);
        assert!(!h2s.status.is_alert);
        assert_eq!(detail.environment.len(), 6);

        assert_eq!(detail.tiers.scba_pressure, Severity::Warning);
        assert_eq!(detail.tiers.pass, Severity::Critical);
        assert_eq!(detail.notice_count, 2);
        assert_eq!(detail.notices.len(), 1);
        assert!(detail.has_critical_notices);
        assert_eq!(detail.hr_history, vec![92.0]);

        assert!(firefighter_detail(&store, &AlertLedger::default(), "nope", NoticeFilter::All, T0).is_none());
    }
}
