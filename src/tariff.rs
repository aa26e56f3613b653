//! Time-of-use tariff: which rate applies at a given wall-clock time.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffPeriod {
    Peak,
    OffPeak,
    Shoulder,
}

impl fmt::Display for TariffPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TariffPeriod::Peak => "peak",
            TariffPeriod::OffPeak => "off_peak",
            TariffPeriod::Shoulder => "shoulder",
        };
        f.write_str(s)
    }
}

/// Hour windows `[start, end)` for peak and off-peak. Any hour outside both
/// is shoulder. A window with `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffWindows {
    // ---
    pub peak_start_hour: u32,
    pub peak_end_hour: u32,
    pub off_peak_start_hour: u32,
    pub off_peak_end_hour: u32,
}

impl Default for TariffWindows {
    fn default() -> Self {
        Self {
            peak_start_hour: 8,
            peak_end_hour: 20,
            off_peak_start_hour: 0,
            off_peak_end_hour: 6,
        }
    }
}

impl TariffWindows {
    // ---
    pub fn period_at(&self, at: NaiveDateTime) -> TariffPeriod {
        // ---
        let hour = at.hour();
        if in_window(hour, self.peak_start_hour, self.peak_end_hour) {
            TariffPeriod::Peak
        } else if in_window(hour, self.off_peak_start_hour, self.off_peak_end_hour) {
            TariffPeriod::OffPeak
        } else {
            TariffPeriod::Shoulder
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        // ---
        let bounds = [
            ("peak_start_hour", self.peak_start_hour),
            ("peak_end_hour", self.peak_end_hour),
            ("off_peak_start_hour", self.off_peak_start_hour),
            ("off_peak_end_hour", self.off_peak_end_hour),
        ];
        for (name, hour) in bounds {
            if hour > 24 {
                return Err(EngineError::validation(format!(
                    "{name} must be within 0..=24, got {hour}"
                )));
            }
        }
        Ok(())
    }
}

fn in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Currency per kWh for each period, plus the window rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffSchedule {
    // ---
    pub peak_rate: f64,
    pub off_peak_rate: f64,
    pub shoulder_rate: f64,
    #[serde(default)]
    pub windows: TariffWindows,
}

impl Default for TariffSchedule {
    fn default() -> Self {
        Self {
            peak_rate: 5.75,
            off_peak_rate: 3.50,
            shoulder_rate: 4.25,
            windows: TariffWindows::default(),
        }
    }
}

impl TariffSchedule {
    // ---
    /// A schedule that charges the same rate around the clock.
    pub fn flat(rate: f64) -> Self {
        Self {
            peak_rate: rate,
            off_peak_rate: rate,
            shoulder_rate: rate,
            windows: TariffWindows::default(),
        }
    }

    pub fn period_at(&self, at: NaiveDateTime) -> TariffPeriod {
        self.windows.period_at(at)
    }

    pub fn rate_for(&self, period: TariffPeriod) -> f64 {
        match period {
            TariffPeriod::Peak => self.peak_rate,
            TariffPeriod::OffPeak => self.off_peak_rate,
            TariffPeriod::Shoulder => self.shoulder_rate,
        }
    }

    pub fn rate_at(&self, at: NaiveDateTime) -> f64 {
        self.rate_for(self.period_at(at))
    }

    pub fn validate(&self) -> EngineResult<()> {
        // ---
        let rates = [
            ("peak_rate", self.peak_rate),
            ("off_peak_rate", self.off_peak_rate),
            ("shoulder_rate", self.shoulder_rate),
        ];
        for (name, rate) in rates {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(EngineError::validation(format!(
                    "{name} must be a non-negative number, got {rate}"
                )));
            }
        }
        self.windows.validate()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_default_window_boundaries() {
        // ---
        let tariff = TariffSchedule::default();

        assert_eq!(tariff.period_at(at(0, 0)), TariffPeriod::OffPeak);
        assert_eq!(tariff.period_at(at(5, 59)), TariffPeriod::OffPeak);
        assert_eq!(tariff.period_at(at(6, 0)), TariffPeriod::Shoulder);
        assert_eq!(tariff.period_at(at(7, 59)), TariffPeriod::Shoulder);
        assert_eq!(tariff.period_at(at(8, 0)), TariffPeriod::Peak);
        assert_eq!(tariff.period_at(at(19, 59)), TariffPeriod::Peak);
        assert_eq!(tariff.period_at(at(20, 0)), TariffPeriod::Shoulder);
        assert_eq!(tariff.period_at(at(23, 30)), TariffPeriod::Shoulder);
    }

    #[test]
    fn test_rate_follows_period() {
        // ---
        let tariff = TariffSchedule::default();
        assert_eq!(tariff.rate_at(at(12, 0)), 5.75);
        assert_eq!(tariff.rate_at(at(3, 0)), 3.50);
        assert_eq!(tariff.rate_at(at(21, 0)), 4.25);
    }

    #[test]
    fn test_wrapping_off_peak_window() {
        // ---
        let tariff = TariffSchedule {
            windows: TariffWindows {
                peak_start_hour: 9,
                peak_end_hour: 17,
                off_peak_start_hour: 22,
                off_peak_end_hour: 6,
            },
            ..TariffSchedule::default()
        };

        assert_eq!(tariff.period_at(at(23, 0)), TariffPeriod::OffPeak);
        assert_eq!(tariff.period_at(at(2, 0)), TariffPeriod::OffPeak);
        assert_eq!(tariff.period_at(at(7, 0)), TariffPeriod::Shoulder);
        assert_eq!(tariff.period_at(at(10, 0)), TariffPeriod::Peak);
    }

    #[test]
    fn test_validation_rejects_negative_rate() {
        // ---
        assert!(TariffSchedule::default().validate().is_ok());
        assert!(TariffSchedule::flat(0.0).validate().is_ok());
        assert!(TariffSchedule::flat(-0.01).validate().is_err());

        let bad_window = TariffSchedule {
            windows: TariffWindows {
                peak_end_hour: 25,
                ..TariffWindows::default()
            },
            ..TariffSchedule::default()
        };
        assert!(bad_window.validate().is_err());
    }
}
