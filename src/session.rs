//! Per-user dashboard state.
//!
//! A `DashboardSession` is what the presentation layer keeps between
//! interactions: the load set, running totals, edge state, alert history and
//! the bounded chart series. Every interaction is one method call that runs
//! to completion; engine failures leave the session untouched.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{self, LoadAdjustment};
use crate::error::EngineError;
use crate::models::{
    AlertKind, AlertRecord, EdgeState, LoadProfile, LogRecord, RunningTotals, Sample, Settings,
    Thresholds, TotalsView,
};
use crate::simulator::SampleSource;
use crate::store::{write_csv, ConfigStore, LogSink, StoreError};
use crate::tariff::{TariffPeriod, TariffSchedule};

// ---

#[derive(Debug, Error)]
pub enum SessionError {
    // ---
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("monitoring is not running")]
    NotMonitoring,

    #[error("alert {0} not found")]
    AlertNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionLimits {
    // ---
    /// Points kept in the chart series.
    pub max_data_points: usize,
    /// Entries kept in the alert history.
    pub max_alerts: usize,
    /// Simulated hours per wall-clock hour.
    pub time_scale: f64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_data_points: 200,
            max_alerts: 200,
            time_scale: 1.0,
        }
    }
}

/// One point of the historical chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power_kw: f64,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub sample: Sample,
    pub totals: TotalsView,
    pub new_alerts: Vec<AlertRecord>,
    pub update_counter: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub monitoring: bool,
    pub latest: Option<Sample>,
    pub totals: TotalsView,
    pub active_alerts: Vec<AlertKind>,
    pub update_counter: u64,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    NearLimit,
    Exceeded,
}

/// Share of the budget at which the status turns to near-limit.
const BUDGET_WARNING_FRACTION: f64 = 0.9;

#[derive(Debug, Clone, Serialize)]
pub struct EnergySummary {
    pub energy_consumed_kwh: f64,
    pub estimated_cost: f64,
    pub energy_budget: f64,
    pub remaining_budget: f64,
    pub budget_used_percent: f64,
    pub budget_status: BudgetStatus,
    pub tariff_period: TariffPeriod,
    pub current_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    pub unacknowledged: usize,
    pub by_kind: BTreeMap<AlertKind, usize>,
}

/// Must follow the field order of `SeriesPoint`.
const SERIES_COLUMNS: [&str; 5] = ["timestamp", "voltage", "current", "power_kw", "energy_kwh"];

/// Must follow the field order of `AlertRow`.
const ALERT_COLUMNS: [&str; 5] = ["id", "timestamp", "kind", "message", "acknowledged"];

#[derive(Serialize)]
struct AlertRow<'a> {
    id: Uuid,
    timestamp: NaiveDateTime,
    kind: AlertKind,
    message: &'a str,
    acknowledged: bool,
}

pub struct DashboardSession {
    // ---
    settings: Settings,
    totals: RunningTotals,
    edge_state: EdgeState,
    alerts: VecDeque<AlertRecord>,
    series: VecDeque<SeriesPoint>,
    latest: Option<Sample>,
    monitoring: bool,
    /// Offset-aware, so elapsed time is real time even across DST changes.
    last_tick: DateTime<FixedOffset>,
    started_at: NaiveDateTime,
    update_counter: u64,
    limits: SessionLimits,
    config_store: Arc<dyn ConfigStore>,
    log_sink: Arc<dyn LogSink>,
    source: Box<dyn SampleSource>,
}

impl DashboardSession {
    // ---
    pub fn new(
        settings: Settings,
        limits: SessionLimits,
        config_store: Arc<dyn ConfigStore>,
        log_sink: Arc<dyn LogSink>,
        source: Box<dyn SampleSource>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            settings,
            totals: RunningTotals::default(),
            edge_state: EdgeState::new(),
            alerts: VecDeque::new(),
            series: VecDeque::new(),
            latest: None,
            monitoring: false,
            last_tick: now,
            started_at: now.naive_local(),
            update_counter: 0,
            limits,
            config_store,
            log_sink,
            source,
        }
    }

    // --- Accessors

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn loads(&self) -> &[LoadProfile] {
        &self.settings.load_profiles
    }

    pub fn totals(&self) -> RunningTotals {
        self.totals
    }

    pub fn edge_state(&self) -> &EdgeState {
        &self.edge_state
    }

    pub fn alerts(&self) -> impl Iterator<Item = &AlertRecord> {
        self.alerts.iter()
    }

    pub fn history(&self) -> Vec<SeriesPoint> {
        self.series.iter().cloned().collect()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            monitoring: self.monitoring,
            latest: self.latest.clone(),
            totals: self.totals.view(&self.settings.thresholds),
            active_alerts: self.edge_state.iter().collect(),
            update_counter: self.update_counter,
            started_at: self.started_at,
        }
    }

    // --- Monitoring

    /// Returns `false` when monitoring was already running.
    pub fn start_monitoring(&mut self, now: DateTime<FixedOffset>) -> bool {
        // ---
        if self.monitoring {
            return false;
        }
        self.monitoring = true;
        self.started_at = now.naive_local();
        self.last_tick = now;
        info!("Monitoring started");
        true
    }

    /// Returns `false` when monitoring was not running.
    pub fn stop_monitoring(&mut self) -> bool {
        // ---
        if !self.monitoring {
            return false;
        }
        self.monitoring = false;
        info!("Monitoring stopped");
        true
    }

    /// Run one evaluation cycle at time `now`.
    ///
    /// Elapsed time is measured on the absolute timeline; the sample and the
    /// tariff period use the local wall-clock reading of `now`.
    ///
    /// The in-memory state is committed first; the log record is then written
    /// from that committed snapshot. A log failure is reported in the trace
    /// output and does not roll the tick back.
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> Result<TickReport, SessionError> {
        // ---
        if !self.monitoring {
            return Err(SessionError::NotMonitoring);
        }

        // Checked before drawing so a rejected tick leaves the source untouched
        let elapsed_hours = hours_between(self.last_tick, now) * self.limits.time_scale;
        if !elapsed_hours.is_finite() || elapsed_hours < 0.0 {
            return Err(EngineError::validation(format!(
                "clock went backwards: {} is before the last tick at {}",
                now, self.last_tick
            ))
            .into());
        }
        let sample = self
            .source
            .next_sample(&self.settings.load_profiles, now.naive_local());

        let outcome = engine::evaluate_tick(
            &self.totals,
            &sample,
            elapsed_hours,
            &self.settings.load_profiles,
            &self.settings.thresholds,
            &self.settings.tariff,
            &self.edge_state,
        )?;

        self.totals = outcome.totals;
        self.edge_state = outcome.edge_state;
        self.last_tick = now;
        self.latest = Some(sample.clone());
        self.update_counter += 1;
        self.push_point(SeriesPoint {
            timestamp: sample.timestamp,
            voltage: sample.voltage,
            current: sample.current,
            power_kw: sample.power_kw,
            energy_kwh: self.totals.energy_consumed_kwh,
        });

        let new_alerts: Vec<AlertRecord> =
            outcome.alerts.into_iter().map(AlertRecord::new).collect();
        for record in &new_alerts {
            warn!(kind = %record.alert.kind, "{}", record.alert.message);
            self.push_alert(record.clone());
        }

        debug!(
            delta_kwh = outcome.delta_kwh,
            delta_cost = outcome.delta_cost,
            rate = outcome.rate,
            "Tick {} evaluated",
            self.update_counter
        );

        if self.settings.logging_enabled {
            let record = LogRecord::new(&sample, &self.totals);
            if let Err(e) = self.log_sink.append(&record) {
                error!("Failed to log data: {}", e);
            }
        }

        Ok(TickReport {
            sample,
            totals: self.totals.view(&self.settings.thresholds),
            new_alerts,
            update_counter: self.update_counter,
        })
    }

    /// Zero the totals and series. Loads, settings and alert history stay.
    pub fn clear_data(&mut self, now: DateTime<FixedOffset>) {
        // ---
        self.totals = RunningTotals::default();
        self.edge_state = EdgeState::new();
        self.series.clear();
        self.latest = None;
        self.update_counter = 0;
        self.started_at = now.naive_local();
        self.last_tick = now;
        info!("All monitoring data cleared");
    }

    // --- Loads

    pub fn toggle_load(&mut self, name: &str, enabled: bool) -> Result<LoadProfile, SessionError> {
        // ---
        let updated = engine::toggle_load(&self.settings.load_profiles, name, enabled)?;
        self.settings.load_profiles = updated;
        info!(
            "Load '{}' turned {}",
            name,
            if enabled { "ON" } else { "OFF" }
        );
        self.load(name)
    }

    pub fn adjust_load(
        &mut self,
        name: &str,
        adjustment: LoadAdjustment,
    ) -> Result<LoadProfile, SessionError> {
        // ---
        let updated = engine::adjust_load(&self.settings.load_profiles, name, adjustment)?;
        self.settings.load_profiles = updated;
        info!("Load '{}' adjusted: {:?}", name, adjustment);
        self.load(name)
    }

    /// Switch every load off; returns how many were on.
    pub fn emergency_shutdown(&mut self) -> usize {
        // ---
        let switched_off = self
            .settings
            .load_profiles
            .iter()
            .filter(|load| load.enabled)
            .count();
        self.settings.load_profiles = engine::apply_emergency_shutdown(&self.settings.load_profiles);
        warn!("EMERGENCY SHUTDOWN: {} loads deactivated", switched_off);
        switched_off
    }

    fn load(&self, name: &str) -> Result<LoadProfile, SessionError> {
        self.settings
            .load_profiles
            .iter()
            .find(|load| load.name == name)
            .cloned()
            .ok_or_else(|| {
                EngineError::NotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    // --- Alerts

    pub fn acknowledge_alert(&mut self, id: Uuid) -> Result<(), SessionError> {
        // ---
        let record = self
            .alerts
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(SessionError::AlertNotFound(id))?;
        record.alert.acknowledged = true;
        Ok(())
    }

    /// Returns the number of alerts removed.
    pub fn clear_alerts(&mut self) -> usize {
        let removed = self.alerts.len();
        self.alerts.clear();
        info!("Alert history cleared ({} entries)", removed);
        removed
    }

    pub fn alert_summary(&self) -> AlertSummary {
        // ---
        let mut summary = AlertSummary {
            total: self.alerts.len(),
            ..AlertSummary::default()
        };
        for record in &self.alerts {
            *summary.by_kind.entry(record.alert.kind).or_insert(0) += 1;
            if !record.alert.acknowledged {
                summary.unacknowledged += 1;
            }
        }
        summary
    }

    pub fn export_alerts_csv(&self) -> Result<String, SessionError> {
        // ---
        let rows = self.alerts.iter().map(|record| AlertRow {
            id: record.id,
            timestamp: record.alert.timestamp,
            kind: record.alert.kind,
            message: &record.alert.message,
            acknowledged: record.alert.acknowledged,
        });
        Ok(write_csv(&ALERT_COLUMNS, rows)?)
    }

    pub fn export_history_csv(&self) -> Result<String, SessionError> {
        Ok(write_csv(&SERIES_COLUMNS, self.series.iter())?)
    }

    // --- Energy

    pub fn energy_summary(&self, now: NaiveDateTime) -> EnergySummary {
        // ---
        let thresholds = &self.settings.thresholds;
        let tariff = &self.settings.tariff;
        let used = self.totals.energy_consumed_kwh;
        let fraction = used / thresholds.energy_budget;

        // Same boundary as the budget alert: exactly on budget is not over it
        let budget_status = if fraction > 1.0 {
            BudgetStatus::Exceeded
        } else if fraction >= BUDGET_WARNING_FRACTION {
            BudgetStatus::NearLimit
        } else {
            BudgetStatus::Ok
        };
        let period = tariff.period_at(now);

        EnergySummary {
            energy_consumed_kwh: used,
            estimated_cost: self.totals.estimated_cost,
            energy_budget: thresholds.energy_budget,
            remaining_budget: self.totals.remaining_budget(thresholds),
            budget_used_percent: fraction * 100.0,
            budget_status,
            tariff_period: period,
            current_rate: tariff.rate_for(period),
        }
    }

    // --- Settings

    /// Validate, persist, then apply. Nothing changes if either step fails.
    pub fn update_thresholds(&mut self, thresholds: Thresholds) -> Result<(), SessionError> {
        // ---
        thresholds.validate()?;
        let candidate = Settings {
            thresholds,
            ..self.settings.clone()
        };
        self.config_store.save(&candidate)?;
        self.settings = candidate;
        info!("Alert thresholds updated");
        Ok(())
    }

    /// Validate, persist, then apply. Nothing changes if either step fails.
    pub fn update_tariff(&mut self, tariff: TariffSchedule) -> Result<(), SessionError> {
        // ---
        tariff.validate()?;
        let candidate = Settings {
            tariff,
            ..self.settings.clone()
        };
        self.config_store.save(&candidate)?;
        self.settings = candidate;
        info!("Tariff rates updated");
        Ok(())
    }

    pub fn set_logging_enabled(&mut self, enabled: bool) {
        self.settings.logging_enabled = enabled;
    }

    pub fn save_settings(&self) -> Result<(), SessionError> {
        self.config_store.save(&self.settings)?;
        info!("Configuration saved");
        Ok(())
    }

    /// Returns `false` when the store holds nothing yet.
    pub fn load_settings(&mut self) -> Result<bool, SessionError> {
        // ---
        match self.config_store.load()? {
            Some(settings) => {
                self.settings = settings;
                info!("Configuration loaded");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restore default thresholds and tariff. Load profiles are kept.
    pub fn reset_to_defaults(&mut self) {
        self.settings.thresholds = Thresholds::default();
        self.settings.tariff = TariffSchedule::default();
        info!("System reset to default settings");
    }

    // --- Internals

    fn push_point(&mut self, point: SeriesPoint) {
        self.series.push_back(point);
        while self.series.len() > self.limits.max_data_points {
            self.series.pop_front();
        }
    }

    fn push_alert(&mut self, record: AlertRecord) {
        self.alerts.push_back(record);
        while self.alerts.len() > self.limits.max_alerts {
            self.alerts.pop_front();
        }
    }
}

fn hours_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::{MemoryConfigStore, MemoryLogSink};
    use crate::simulator::SimulatedSource;
    use chrono::{Duration, TimeZone};

    /// Replays a fixed reading on every tick.
    struct FixedSource {
        voltage: f64,
        current: f64,
        power_kw: f64,
    }

    impl SampleSource for FixedSource {
        fn next_sample(&mut self, _loads: &[LoadProfile], at: NaiveDateTime) -> Sample {
            Sample::new(at, self.voltage, self.current, self.power_kw)
        }
    }

    /// Central European summer clock.
    fn cest() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    fn t0() -> DateTime<FixedOffset> {
        cet().with_ymd_and_hms(2025, 3, 26, 12, 0, 0).unwrap()
    }

    struct Harness {
        session: DashboardSession,
        store: Arc<MemoryConfigStore>,
        sink: Arc<MemoryLogSink>,
    }

    fn harness(settings: Settings, power_kw: f64) -> Harness {
        // ---
        let store = Arc::new(MemoryConfigStore::new());
        let sink = Arc::new(MemoryLogSink::new());
        let session = DashboardSession::new(
            settings,
            SessionLimits {
                max_data_points: 3,
                max_alerts: 2,
                time_scale: 1.0,
            },
            store.clone(),
            sink.clone(),
            Box::new(FixedSource {
                voltage: 230.0,
                current: 40.0,
                power_kw,
            }),
            t0(),
        );
        Harness {
            session,
            store,
            sink,
        }
    }

    fn flat_settings(rate: f64) -> Settings {
        Settings {
            tariff: TariffSchedule::flat(rate),
            ..Settings::default()
        }
    }

    #[test]
    fn test_tick_requires_monitoring() {
        // ---
        let mut h = harness(Settings::default(), 10.0);
        assert!(matches!(h.session.tick(t0()), Err(SessionError::NotMonitoring)));
        assert!(h.sink.records().is_empty());
    }

    #[test]
    fn test_tick_accrues_elapsed_energy_and_logs() {
        // ---
        let mut h = harness(flat_settings(2.0), 10.0);
        assert!(h.session.start_monitoring(t0()));
        assert!(!h.session.start_monitoring(t0()));

        let report = h.session.tick(t0() + Duration::minutes(30)).unwrap();

        assert_eq!(report.totals.energy_consumed_kwh, 5.0);
        assert_eq!(report.totals.estimated_cost, 10.0);
        assert_eq!(report.totals.remaining_budget, 995.0);
        assert_eq!(report.update_counter, 1);

        let records = h.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].energy_consumed_kwh, 5.0);
        assert_eq!(records[0].estimated_cost, 10.0);

        let csv = h.session.export_history_csv().unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, SERIES_COLUMNS.join(","));
    }

    #[test]
    fn test_time_scale_multiplies_elapsed() {
        // ---
        let mut h = harness(flat_settings(1.0), 10.0);
        h.session.limits.time_scale = 60.0;
        h.session.start_monitoring(t0());

        let report = h.session.tick(t0() + Duration::minutes(1)).unwrap();
        assert!((report.totals.energy_consumed_kwh - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_going_backwards_leaves_state_unchanged() {
        // ---
        let mut h = harness(flat_settings(1.0), 10.0);
        h.session.start_monitoring(t0());
        h.session.tick(t0() + Duration::hours(1)).unwrap();
        let before = h.session.totals();

        let result = h.session.tick(t0());

        assert!(matches!(
            result,
            Err(SessionError::Engine(EngineError::Validation(_)))
        ));
        assert_eq!(h.session.totals(), before);
        assert_eq!(h.session.status().update_counter, 1);
        assert_eq!(h.sink.records().len(), 1);

        // The next valid tick continues from the last committed one
        let report = h.session.tick(t0() + Duration::hours(2)).unwrap();
        assert_eq!(report.totals.energy_consumed_kwh, 20.0);
    }

    #[test]
    fn test_shutdown_stops_accrual() {
        // ---
        let mut h = harness(flat_settings(1.0), 10.0);
        h.session.start_monitoring(t0());

        assert_eq!(h.session.emergency_shutdown(), 2);
        assert_eq!(h.session.emergency_shutdown(), 0);

        let report = h.session.tick(t0() + Duration::hours(3)).unwrap();
        assert_eq!(report.totals.energy_consumed_kwh, 0.0);
        assert_eq!(report.totals.estimated_cost, 0.0);
    }

    #[test]
    fn test_alerts_are_edge_triggered_and_bounded() {
        // ---
        let settings = Settings {
            thresholds: Thresholds {
                max_power: 5.0,
                ..Thresholds::default()
            },
            ..flat_settings(1.0)
        };
        let mut h = harness(settings, 10.0);
        h.session.start_monitoring(t0());

        let mut new_counts = Vec::new();
        for minute in 1..=5 {
            let report = h.session.tick(t0() + Duration::minutes(minute)).unwrap();
            new_counts.push(report.new_alerts.len());
        }
        assert_eq!(new_counts, vec![1, 0, 0, 0, 0]);

        let summary = h.session.alert_summary();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.unacknowledged, 1);
        assert_eq!(summary.by_kind.get(&AlertKind::PowerHigh), Some(&1));
        assert_eq!(
            h.session.status().active_alerts,
            vec![AlertKind::PowerHigh]
        );

        // Series keeps only the newest points
        let history = h.session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[2].timestamp,
            (t0() + Duration::minutes(5)).naive_local()
        );
    }

    #[test]
    fn test_acknowledge_and_clear_alerts() {
        // ---
        let settings = Settings {
            thresholds: Thresholds {
                max_voltage: 200.0,
                ..Thresholds::default()
            },
            ..flat_settings(1.0)
        };
        let mut h = harness(settings, 1.0);
        h.session.start_monitoring(t0());
        let report = h.session.tick(t0() + Duration::minutes(1)).unwrap();
        let id = report.new_alerts[0].id;

        h.session.acknowledge_alert(id).unwrap();
        assert_eq!(h.session.alert_summary().unacknowledged, 0);

        let unknown = Uuid::new_v4();
        assert!(matches!(
            h.session.acknowledge_alert(unknown),
            Err(SessionError::AlertNotFound(u)) if u == unknown
        ));

        let csv = h.session.export_alerts_csv().unwrap();
        assert!(csv.starts_with("id,timestamp,kind,message,acknowledged"));
        assert!(csv.contains("voltage-high"));

        assert_eq!(h.session.clear_alerts(), 1);
        assert_eq!(h.session.alert_summary(), AlertSummary::default());
    }

    #[test]
    fn test_toggle_unknown_load_keeps_loads() {
        // ---
        let mut h = harness(Settings::default(), 1.0);
        let before = h.session.loads().to_vec();

        let result = h.session.toggle_load("Sauna", true);

        assert!(matches!(
            result,
            Err(SessionError::Engine(EngineError::NotFound { .. }))
        ));
        assert_eq!(h.session.loads(), before.as_slice());

        let hvac = h.session.toggle_load("HVAC", true).unwrap();
        assert!(hvac.enabled);
    }

    #[test]
    fn test_update_thresholds_persists_or_rejects() {
        // ---
        let mut h = harness(Settings::default(), 1.0);

        let bad = Thresholds {
            energy_budget: -5.0,
            ..Thresholds::default()
        };
        assert!(h.session.update_thresholds(bad).is_err());
        assert_eq!(h.session.settings().thresholds, Thresholds::default());
        assert!(h.store.load().unwrap().is_none());

        let good = Thresholds {
            energy_budget: 500.0,
            ..Thresholds::default()
        };
        h.session.update_thresholds(good).unwrap();
        assert_eq!(h.session.settings().thresholds, good);
        assert_eq!(h.store.load().unwrap().unwrap().thresholds, good);
    }

    #[test]
    fn test_load_and_reset_settings() {
        // ---
        let mut h = harness(Settings::default(), 1.0);
        assert!(!h.session.load_settings().unwrap());

        let stored = Settings {
            tariff: TariffSchedule::flat(9.0),
            ..Settings::default()
        };
        h.store.save(&stored).unwrap();
        assert!(h.session.load_settings().unwrap());
        assert_eq!(h.session.settings().tariff, TariffSchedule::flat(9.0));

        h.session.toggle_load("HVAC", true).unwrap();
        h.session.reset_to_defaults();
        assert_eq!(h.session.settings().tariff, TariffSchedule::default());
        assert!(h.session.loads().iter().any(|l| l.name == "HVAC" && l.enabled));
    }

    #[test]
    fn test_energy_summary_budget_status() {
        // ---
        let settings = Settings {
            thresholds: Thresholds {
                energy_budget: 10.0,
                ..Thresholds::default()
            },
            ..flat_settings(1.0)
        };
        let mut h = harness(settings, 9.5);
        h.session.start_monitoring(t0());

        let summary = h.session.energy_summary(t0().naive_local());
        assert_eq!(summary.budget_status, BudgetStatus::Ok);
        assert_eq!(summary.tariff_period, TariffPeriod::Peak);

        h.session.tick(t0() + Duration::hours(1)).unwrap();
        let summary = h.session.energy_summary(t0().naive_local());
        assert_eq!(summary.budget_status, BudgetStatus::NearLimit);
        assert_eq!(summary.remaining_budget, 0.5);

        h.session.tick(t0() + Duration::hours(2)).unwrap();
        let summary = h.session.energy_summary(t0().naive_local());
        assert_eq!(summary.budget_status, BudgetStatus::Exceeded);
        assert_eq!(summary.remaining_budget, -9.0);
    }

    #[test]
    fn test_clear_data_resets_totals() {
        // ---
        let mut h = harness(flat_settings(1.0), 10.0);
        h.session.start_monitoring(t0());
        h.session.tick(t0() + Duration::hours(1)).unwrap();

        h.session.clear_data(t0() + Duration::hours(1));

        assert_eq!(h.session.totals(), RunningTotals::default());
        assert!(h.session.history().is_empty());
        assert!(h.session.edge_state().is_empty());
        let csv = h.session.export_history_csv().unwrap();
        assert_eq!(csv, "timestamp,voltage,current,power_kw,energy_kwh\n");
    }

    #[test]
    fn test_logging_can_be_disabled() {
        // ---
        let mut h = harness(flat_settings(1.0), 10.0);
        h.session.set_logging_enabled(false);
        h.session.start_monitoring(t0());
        h.session.tick(t0() + Duration::minutes(5)).unwrap();

        assert!(h.sink.records().is_empty());
    }

    #[test]
    fn test_energy_exactly_on_budget_is_not_exceeded() {
        // ---
        let settings = Settings {
            thresholds: Thresholds {
                energy_budget: 10.0,
                ..Thresholds::default()
            },
            ..flat_settings(1.0)
        };
        let mut h = harness(settings, 10.0);
        h.session.start_monitoring(t0());

        let report = h.session.tick(t0() + Duration::hours(1)).unwrap();
        let summary = h.session.energy_summary(t0().naive_local());

        assert_eq!(summary.remaining_budget, 0.0);
        assert!(report.new_alerts.is_empty());
        assert_eq!(summary.budget_status, BudgetStatus::NearLimit);
    }

    #[test]
    fn test_spring_forward_accrues_real_elapsed_time() {
        // ---
        let mut h = harness(flat_settings(1.0), 60.0);
        // 01:50 CET, then 03:10 CEST on 2025-03-30: twenty real minutes
        let before = cet().with_ymd_and_hms(2025, 3, 30, 1, 50, 0).unwrap();
        let after = cest().with_ymd_and_hms(2025, 3, 30, 3, 10, 0).unwrap();
        h.session.start_monitoring(before);

        let report = h.session.tick(after).unwrap();

        assert!((report.totals.energy_consumed_kwh - 20.0).abs() < 1e-9);
        assert_eq!(report.sample.timestamp, after.naive_local());
    }

    #[test]
    fn test_fall_back_ticks_are_accepted() {
        // ---
        let mut h = harness(flat_settings(1.0), 60.0);
        // 02:50 CEST, then 02:10 CET on 2025-10-26: twenty real minutes later
        let before = cest().with_ymd_and_hms(2025, 10, 26, 2, 50, 0).unwrap();
        let after = cet().with_ymd_and_hms(2025, 10, 26, 2, 10, 0).unwrap();
        h.session.start_monitoring(before);

        let report = h.session.tick(after).unwrap();

        assert!((report.totals.energy_consumed_kwh - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejected_tick_does_not_advance_the_source() {
        // ---
        let session_with_seed = || {
            DashboardSession::new(
                flat_settings(1.0),
                SessionLimits::default(),
                Arc::new(MemoryConfigStore::new()),
                Arc::new(MemoryLogSink::new()),
                Box::new(SimulatedSource::seeded(11)),
                t0(),
            )
        };
        let mut rejected_first = session_with_seed();
        let mut clean = session_with_seed();
        rejected_first.start_monitoring(t0());
        clean.start_monitoring(t0());

        assert!(rejected_first.tick(t0() - Duration::minutes(5)).is_err());
        assert_eq!(rejected_first.status().update_counter, 0);

        let at = t0() + Duration::minutes(5);
        let a = rejected_first.tick(at).unwrap();
        let b = clean.tick(at).unwrap();
        assert_eq!(a.sample, b.sample);
    }

    #[test]
    fn test_empty_exports_still_carry_headers() {
        // ---
        let h = harness(Settings::default(), 1.0);

        assert_eq!(
            h.session.export_history_csv().unwrap(),
            "timestamp,voltage,current,power_kw,energy_kwh\n"
        );
        assert_eq!(
            h.session.export_alerts_csv().unwrap(),
            "id,timestamp,kind,message,acknowledged\n"
        );
    }
}
