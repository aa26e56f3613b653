//! Data models for the load monitoring pipeline.
//!
//! Units: voltage in volts, current in amps, power in kilowatts, energy in
//! kilowatt-hours. Timestamps are site-local wall-clock time.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::tariff::TariffSchedule;

// ---

/// One controllable simulated load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    // ---
    pub name: String,
    /// Nominal draw in amps.
    pub current_rating: f64,
    pub power_factor: f64,
    pub enabled: bool,
}

impl LoadProfile {
    // ---
    pub fn new(name: impl Into<String>, current_rating: f64, power_factor: f64, enabled: bool) -> Self {
        Self {
            name: name.into(),
            current_rating,
            power_factor,
            enabled,
        }
    }

    /// Estimated draw in kW at the given supply voltage.
    pub fn estimated_power_kw(&self, voltage: f64) -> f64 {
        voltage * self.current_rating * self.power_factor / 1000.0
    }

    pub fn validate(&self) -> EngineResult<()> {
        // ---
        if self.name.trim().is_empty() {
            return Err(EngineError::validation("load name must not be empty"));
        }
        if !(self.current_rating.is_finite() && self.current_rating > 0.0) {
            return Err(EngineError::validation(format!(
                "load '{}': current rating must be positive, got {}",
                self.name, self.current_rating
            )));
        }
        if !(self.power_factor > 0.0 && self.power_factor <= 1.0) {
            return Err(EngineError::validation(format!(
                "load '{}': power factor must be in (0, 1], got {}",
                self.name, self.power_factor
            )));
        }
        Ok(())
    }
}

/// Validate every profile and reject duplicate names.
pub fn validate_load_set(loads: &[LoadProfile]) -> EngineResult<()> {
    // ---
    let mut seen = BTreeSet::new();
    for load in loads {
        load.validate()?;
        if !seen.insert(load.name.as_str()) {
            return Err(EngineError::validation(format!(
                "duplicate load name '{}'",
                load.name
            )));
        }
    }
    Ok(())
}

/// The load set a fresh installation starts with.
pub fn default_load_profiles() -> Vec<LoadProfile> {
    vec![
        LoadProfile::new("Lighting", 50.0, 0.9, true),
        LoadProfile::new("HVAC", 200.0, 0.85, false),
        LoadProfile::new("Computers", 80.0, 0.95, true),
        LoadProfile::new("Industrial", 400.0, 0.8, false),
    ]
}

/// Alert limits. Replaced wholesale on settings save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    // ---
    pub max_voltage: f64,
    pub max_current: f64,
    /// kW
    pub max_power: f64,
    /// kWh
    pub energy_budget: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_voltage: 250.0,
            max_current: 150.0,
            max_power: 30.0,
            energy_budget: 1000.0,
        }
    }
}

impl Thresholds {
    // ---
    pub fn validate(&self) -> EngineResult<()> {
        // ---
        let fields = [
            ("max_voltage", self.max_voltage),
            ("max_current", self.max_current),
            ("max_power", self.max_power),
            ("energy_budget", self.energy_budget),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::validation(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One simulated measurement. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    // ---
    pub timestamp: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power_kw: f64,
}

impl Sample {
    // ---
    pub fn new(timestamp: NaiveDateTime, voltage: f64, current: f64, power_kw: f64) -> Self {
        Self {
            timestamp,
            voltage,
            current,
            power_kw,
        }
    }

    /// Build a sample whose power is derived from the electrical readings.
    pub fn from_readings(
        timestamp: NaiveDateTime,
        voltage: f64,
        current: f64,
        power_factor: f64,
    ) -> Self {
        Self::new(timestamp, voltage, current, voltage * current * power_factor / 1000.0)
    }
}

/// Session accumulators. The remaining budget is derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningTotals {
    // ---
    pub energy_consumed_kwh: f64,
    pub estimated_cost: f64,
}

impl RunningTotals {
    // ---
    /// May go negative, signalling an overrun.
    pub fn remaining_budget(&self, thresholds: &Thresholds) -> f64 {
        thresholds.energy_budget - self.energy_consumed_kwh
    }

    pub fn view(&self, thresholds: &Thresholds) -> TotalsView {
        TotalsView {
            energy_consumed_kwh: self.energy_consumed_kwh,
            estimated_cost: self.estimated_cost,
            remaining_budget: self.remaining_budget(thresholds),
        }
    }
}

/// Display snapshot of the running totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalsView {
    pub energy_consumed_kwh: f64,
    pub estimated_cost: f64,
    pub remaining_budget: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    VoltageHigh,
    CurrentHigh,
    PowerHigh,
    BudgetExceeded,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::VoltageHigh,
        AlertKind::CurrentHigh,
        AlertKind::PowerHigh,
        AlertKind::BudgetExceeded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::VoltageHigh => "voltage-high",
            AlertKind::CurrentHigh => "current-high",
            AlertKind::PowerHigh => "power-high",
            AlertKind::BudgetExceeded => "budget-exceeded",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub acknowledged: bool,
}

/// An alert as kept in a session's history, addressable by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub alert: Alert,
}

impl AlertRecord {
    pub fn new(alert: Alert) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert,
        }
    }
}

/// Alert kinds that were above their threshold as of the last tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeState(BTreeSet<AlertKind>);

impl EdgeState {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, kind: AlertKind) -> bool {
        self.0.contains(&kind)
    }

    /// Returns `true` when the kind was not already active.
    pub fn activate(&mut self, kind: AlertKind) -> bool {
        self.0.insert(kind)
    }

    /// Returns `true` when the kind was active.
    pub fn clear(&mut self, kind: AlertKind) -> bool {
        self.0.remove(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = AlertKind> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<AlertKind> for EdgeState {
    fn from_iter<I: IntoIterator<Item = AlertKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flat row appended to the historical log after each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    // ---
    pub timestamp: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
    /// kW
    pub power: f64,
    pub energy_consumed_kwh: f64,
    pub estimated_cost: f64,
}

impl LogRecord {
    pub fn new(sample: &Sample, totals: &RunningTotals) -> Self {
        Self {
            timestamp: sample.timestamp,
            voltage: sample.voltage,
            current: sample.current,
            power: sample.power_kw,
            energy_consumed_kwh: totals.energy_consumed_kwh,
            estimated_cost: totals.estimated_cost,
        }
    }
}

/// Everything the config store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // ---
    pub thresholds: Thresholds,
    pub tariff: TariffSchedule,
    pub load_profiles: Vec<LoadProfile>,
    #[serde(default = "default_logging_enabled")]
    pub logging_enabled: bool,
}

fn default_logging_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            tariff: TariffSchedule::default(),
            load_profiles: default_load_profiles(),
            logging_enabled: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> EngineResult<()> {
        self.thresholds.validate()?;
        self.tariff.validate()?;
        validate_load_set(&self.load_profiles)
    }
}
