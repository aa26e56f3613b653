//! Threshold evaluation and cost accrual.
//!
//! Pure logic: nothing here reads the clock, the disk or the network. The
//! caller owns the running totals, the edge state and the load set, passes
//! them in for every tick and keeps what comes back. Inputs are borrowed, so
//! a rejected tick leaves the caller's state exactly as it was.

use chrono::NaiveDateTime;

use crate::error::{EngineError, EngineResult};
use crate::models::{Alert, AlertKind, EdgeState, LoadProfile, RunningTotals, Sample, Thresholds};
use crate::tariff::TariffSchedule;

// ---

/// Result of one successful tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    // ---
    pub totals: RunningTotals,
    /// Newly triggered alerts, in voltage, current, power, budget order.
    pub alerts: Vec<Alert>,
    pub edge_state: EdgeState,
    pub delta_kwh: f64,
    pub delta_cost: f64,
    /// Tariff rate applied to this tick.
    pub rate: f64,
}

/// Evaluate one sample against the thresholds and accrue energy and cost.
///
/// Energy accrues as `power_kw * elapsed_hours`, but only while at least one
/// load is enabled. An alert is emitted on the transition of its kind from
/// inactive to active; a kind that stays over its limit emits nothing more
/// until it has dropped back under and crossed again.
///
/// Returns [`EngineError::Validation`] for negative or non-finite readings,
/// elapsed time or previous totals, and for invalid thresholds or tariff.
pub fn evaluate_tick(
    prev_totals: &RunningTotals,
    sample: &Sample,
    elapsed_hours: f64,
    loads: &[LoadProfile],
    thresholds: &Thresholds,
    tariff: &TariffSchedule,
    edge_state: &EdgeState,
) -> EngineResult<TickOutcome> {
    // ---
    validate_tick_inputs(prev_totals, sample, elapsed_hours)?;
    thresholds.validate()?;
    tariff.validate()?;

    let any_enabled = loads.iter().any(|load| load.enabled);
    let delta_kwh = if any_enabled {
        sample.power_kw * elapsed_hours
    } else {
        0.0
    };

    let rate = tariff.rate_at(sample.timestamp);
    let delta_cost = delta_kwh * rate;

    let totals = RunningTotals {
        energy_consumed_kwh: prev_totals.energy_consumed_kwh + delta_kwh,
        estimated_cost: prev_totals.estimated_cost + delta_cost,
    };
    let remaining = totals.remaining_budget(thresholds);

    let mut edges = edge_state.clone();
    let mut alerts = Vec::new();
    let ts = sample.timestamp;

    check_edge(
        &mut edges,
        &mut alerts,
        AlertKind::VoltageHigh,
        sample.voltage > thresholds.max_voltage,
        ts,
        || {
            format!(
                "HIGH VOLTAGE: {:.1} V (limit {:.1} V)",
                sample.voltage, thresholds.max_voltage
            )
        },
    );
    check_edge(
        &mut edges,
        &mut alerts,
        AlertKind::CurrentHigh,
        sample.current > thresholds.max_current,
        ts,
        || {
            format!(
                "HIGH CURRENT: {:.1} A (limit {:.1} A)",
                sample.current, thresholds.max_current
            )
        },
    );
    check_edge(
        &mut edges,
        &mut alerts,
        AlertKind::PowerHigh,
        sample.power_kw > thresholds.max_power,
        ts,
        || {
            format!(
                "HIGH POWER: {:.2} kW (limit {:.2} kW)",
                sample.power_kw, thresholds.max_power
            )
        },
    );
    check_edge(
        &mut edges,
        &mut alerts,
        AlertKind::BudgetExceeded,
        remaining < 0.0,
        ts,
        || {
            format!(
                "ENERGY BUDGET EXCEEDED: {:.2}/{:.2} kWh",
                totals.energy_consumed_kwh, thresholds.energy_budget
            )
        },
    );

    Ok(TickOutcome {
        totals,
        alerts,
        edge_state: edges,
        delta_kwh,
        delta_cost,
        rate,
    })
}

fn validate_tick_inputs(
    prev_totals: &RunningTotals,
    sample: &Sample,
    elapsed_hours: f64,
) -> EngineResult<()> {
    // ---
    let values = [
        ("elapsed_hours", elapsed_hours),
        ("sample.voltage", sample.voltage),
        ("sample.current", sample.current),
        ("sample.power_kw", sample.power_kw),
        ("energy_consumed_kwh", prev_totals.energy_consumed_kwh),
        ("estimated_cost", prev_totals.estimated_cost),
    ];
    for (name, value) in values {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::validation(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

/// Apply the edge-trigger rule for one alert kind.
fn check_edge(
    edges: &mut EdgeState,
    alerts: &mut Vec<Alert>,
    kind: AlertKind,
    is_over: bool,
    timestamp: NaiveDateTime,
    message: impl FnOnce() -> String,
) {
    // ---
    if is_over {
        if edges.activate(kind) {
            alerts.push(Alert {
                kind,
                message: message(),
                timestamp,
                acknowledged: false,
            });
        }
    } else {
        edges.clear(kind);
    }
}

/// Switch every load off. Idempotent.
pub fn apply_emergency_shutdown(loads: &[LoadProfile]) -> Vec<LoadProfile> {
    loads
        .iter()
        .map(|load| LoadProfile {
            enabled: false,
            ..load.clone()
        })
        .collect()
}

/// Replace the `enabled` flag of the named load; no other load changes.
pub fn toggle_load(loads: &[LoadProfile], name: &str, enabled: bool) -> EngineResult<Vec<LoadProfile>> {
    // ---
    let index = find_load(loads, name)?;
    let mut updated = loads.to_vec();
    updated[index].enabled = enabled;
    Ok(updated)
}

/// Requested changes to one load's electrical parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAdjustment {
    pub current_rating: Option<f64>,
    pub power_factor: Option<f64>,
}

/// Upper bound for a single load's rating, in amps.
pub const MAX_LOAD_CURRENT: f64 = 500.0;

/// Change the rating and/or power factor of the named load.
pub fn adjust_load(
    loads: &[LoadProfile],
    name: &str,
    adjustment: LoadAdjustment,
) -> EngineResult<Vec<LoadProfile>> {
    // ---
    let index = find_load(loads, name)?;
    let mut profile = loads[index].clone();

    if let Some(current) = adjustment.current_rating {
        if current > MAX_LOAD_CURRENT {
            return Err(EngineError::validation(format!(
                "load '{name}': current rating {current} A exceeds {MAX_LOAD_CURRENT} A"
            )));
        }
        profile.current_rating = current;
    }
    if let Some(pf) = adjustment.power_factor {
        profile.power_factor = pf;
    }
    profile.validate()?;

    let mut updated = loads.to_vec();
    updated[index] = profile;
    Ok(updated)
}

fn find_load(loads: &[LoadProfile], name: &str) -> EngineResult<usize> {
    loads
        .iter()
        .position(|load| load.name == name)
        .ok_or_else(|| EngineError::NotFound {
            name: name.to_string(),
        })
}
