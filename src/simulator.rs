//! Synthetic sample generation.
//!
//! The generator is a collaborator of the engine, not part of it: the engine
//! only relies on the field contract of [`Sample`]. `SimulatedSource` models
//! a 230 V supply with small jitter, rare excursions, per-load current noise
//! and an always-on background draw.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::models::{LoadProfile, Sample};

// ---

const NOMINAL_VOLTAGE: f64 = 230.0;
const VOLTAGE_JITTER: f64 = 5.0;
const VOLTAGE_EXCURSION_CHANCE: f64 = 0.01;
const VOLTAGE_EXCURSION: f64 = 30.0;

/// Fraction of a load's rating used as uniform noise.
const CURRENT_JITTER: f64 = 0.1;
const CURRENT_SPIKE_CHANCE: f64 = 0.005;
const CURRENT_SPIKE_MIN: f64 = 10.0;
const CURRENT_SPIKE_MAX: f64 = 30.0;

const BACKGROUND_CURRENT_MIN: f64 = 3.0;
const BACKGROUND_CURRENT_MAX: f64 = 8.0;
const BACKGROUND_POWER_FACTOR: f64 = 0.92;

const VOLTAGE_RANGE: (f64, f64) = (180.0, 270.0);
const CURRENT_RANGE: (f64, f64) = (0.0, 600.0);
/// Watts.
const POWER_RANGE: (f64, f64) = (0.0, 150_000.0);

/// Produces one sample per tick.
pub trait SampleSource: Send {
    fn next_sample(&mut self, loads: &[LoadProfile], at: NaiveDateTime) -> Sample;
}

pub struct SimulatedSource {
    rng: StdRng,
}

impl SimulatedSource {
    // ---
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SampleSource for SimulatedSource {
    fn next_sample(&mut self, loads: &[LoadProfile], at: NaiveDateTime) -> Sample {
        // ---
        let mut voltage_offset = self.rng.gen_range(-VOLTAGE_JITTER..=VOLTAGE_JITTER);
        if self.rng.gen_bool(VOLTAGE_EXCURSION_CHANCE) {
            let excursion = self.rng.gen_range(-VOLTAGE_EXCURSION..=VOLTAGE_EXCURSION);
            voltage_offset += excursion;
            warn!("Voltage fluctuation detected: {:+.1} V", excursion);
        }
        let supply = NOMINAL_VOLTAGE + voltage_offset;

        let mut total_current = 0.0;
        let mut total_power_w = 0.0;

        for load in loads.iter().filter(|load| load.enabled) {
            let mut variation =
                self.rng.gen_range(-CURRENT_JITTER..=CURRENT_JITTER) * load.current_rating;
            if self.rng.gen_bool(CURRENT_SPIKE_CHANCE) {
                let spike = self.rng.gen_range(CURRENT_SPIKE_MIN..=CURRENT_SPIKE_MAX);
                variation += spike;
                warn!("Current spike in {}: +{:.1} A", load.name, spike);
            }
            let load_current = (load.current_rating + variation).max(0.0);
            total_current += load_current;
            total_power_w += supply * load_current * load.power_factor;
        }

        let background =
            self.rng.gen_range(BACKGROUND_CURRENT_MIN..=BACKGROUND_CURRENT_MAX);
        total_current += background;
        total_power_w += supply * background * BACKGROUND_POWER_FACTOR;

        let voltage = round_to(supply.clamp(VOLTAGE_RANGE.0, VOLTAGE_RANGE.1), 1);
        let current = round_to(total_current.clamp(CURRENT_RANGE.0, CURRENT_RANGE.1), 1);
        let power_w = total_power_w.clamp(POWER_RANGE.0, POWER_RANGE.1).round();

        Sample::new(at, voltage, current, power_w / 1000.0)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
