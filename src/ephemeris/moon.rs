//! Lunar phase, illumination, age and syzygy instants.
//!
//! `phase = elongation / 360` lies in [0, 1): 0 is new moon, 0.5 full moon.
//! The illuminated fraction is tied to it by `(1 − cos 2π·phase) · 50` percent
//! and is never computed independently.
//!
//! Syzygies are searched within 40 days of the instant. When a search comes
//! back empty or fails, the instant ±15 days is reported instead; this is a
//! rough placeholder, not an estimate of the true syzygy.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::constants::{Degree, SYNODIC_MONTH};
use crate::ephemeris::Ephemeris;
use crate::skyclock_errors::SkyclockError;
use crate::time::{add_days, days_between, epoch_from_utc, utc_from_epoch};

const SYZYGY_WINDOW_DAYS: f64 = 40.0;
const FALLBACK_DAYS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseName {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl PhaseName {
    const ORDER: [PhaseName; 8] = [
        PhaseName::NewMoon,
        PhaseName::WaxingCrescent,
        PhaseName::FirstQuarter,
        PhaseName::WaxingGibbous,
        PhaseName::FullMoon,
        PhaseName::WaningGibbous,
        PhaseName::LastQuarter,
        PhaseName::WaningCrescent,
    ];

    /// Eight buckets of 1/8 each, centered on the principal phases.
    pub fn from_phase(phase: f64) -> Self {
        let index = (phase * 8.0 + 0.5).floor().rem_euclid(8.0) as usize;
        PhaseName::ORDER[index.min(7)]
    }
}

impl std::fmt::Display for PhaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PhaseName::NewMoon => "New Moon",
            PhaseName::WaxingCrescent => "Waxing Crescent",
            PhaseName::FirstQuarter => "First Quarter",
            PhaseName::WaxingGibbous => "Waxing Gibbous",
            PhaseName::FullMoon => "Full Moon",
            PhaseName::WaningGibbous => "Waning Gibbous",
            PhaseName::LastQuarter => "Last Quarter",
            PhaseName::WaningCrescent => "Waning Crescent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoonPhase {
    /// Fraction of the synodic cycle in [0, 1).
    pub phase: f64,
    /// Illuminated fraction of the disc, percent.
    pub illumination: f64,
    pub phase_name: PhaseName,
    /// Days since the previous new moon.
    pub age_days: f64,
    pub previous_new_moon: DateTime<Utc>,
    pub next_new_moon: DateTime<Utc>,
    pub next_full_moon: DateTime<Utc>,
}

/// Illuminated percentage for a phase value.
pub fn illumination_percent(phase: f64) -> f64 {
    (1.0 - (2.0 * std::f64::consts::PI * phase).cos()) * 50.0
}

impl Ephemeris {
    /// Lunar phase at `instant`.
    ///
    /// Errors
    /// ----------
    /// * Only when the source cannot provide the Moon's elongation at `instant`.
    ///   Syzygy search failures are absorbed.
    pub fn moon_phase(&self, instant: &DateTime<Utc>) -> Result<MoonPhase, SkyclockError> {
        let epoch = epoch_from_utc(instant);
        let elongation = self.source().moon_elongation(&epoch)?;
        let phase = (elongation / 360.0).rem_euclid(1.0);

        let previous_new_moon = self.syzygy(instant, 0.0, -SYZYGY_WINDOW_DAYS);
        let age_days = match previous_new_moon {
            Some(previous) => days_between(&previous, instant),
            None => phase * SYNODIC_MONTH,
        };

        Ok(MoonPhase {
            phase,
            illumination: illumination_percent(phase),
            phase_name: PhaseName::from_phase(phase),
            age_days,
            previous_new_moon: previous_new_moon
                .unwrap_or_else(|| add_days(instant, -FALLBACK_DAYS)),
            next_new_moon: self
                .syzygy(instant, 0.0, SYZYGY_WINDOW_DAYS)
                .unwrap_or_else(|| add_days(instant, FALLBACK_DAYS)),
            next_full_moon: self
                .syzygy(instant, 180.0, SYZYGY_WINDOW_DAYS)
                .unwrap_or_else(|| add_days(instant, FALLBACK_DAYS)),
        })
    }

    fn syzygy(&self, instant: &DateTime<Utc>, target: Degree, window: f64) -> Option<DateTime<Utc>> {
        match self
            .source()
            .search_moon_phase(target, &epoch_from_utc(instant), window)
        {
            Ok(Some(epoch)) => Some(utc_from_epoch(&epoch)),
            Ok(None) => {
                debug!("No lunar elongation {target}° within {window} days of {instant}");
                None
            }
            Err(err) => {
                debug!("Lunar elongation {target}° search failed near {instant}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod moon_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_illumination_law() {
        assert_abs_diff_eq!(illumination_percent(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(illumination_percent(0.25), 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(illumination_percent(0.5), 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(illumination_percent(0.75), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_phase_buckets() {
        assert_eq!(PhaseName::from_phase(0.0), PhaseName::NewMoon);
        assert_eq!(PhaseName::from_phase(0.05), PhaseName::NewMoon);
        assert_eq!(PhaseName::from_phase(0.1), PhaseName::WaxingCrescent);
        assert_eq!(PhaseName::from_phase(0.25), PhaseName::FirstQuarter);
        assert_eq!(PhaseName::from_phase(0.5), PhaseName::FullMoon);
        assert_eq!(PhaseName::from_phase(0.74), PhaseName::LastQuarter);
        assert_eq!(PhaseName::from_phase(0.97), PhaseName::NewMoon);
        assert_eq!(PhaseName::WaningGibbous.to_string(), "Waning Gibbous");
    }

    #[test]
    fn test_moon_phase_mid_january_2024() {
        let ephem = Ephemeris::default();
        // Waxing crescent three days after the 2024-01-11 new moon
        let instant = Utc.with_ymd_and_hms(2024, 1, 14, 12, 0, 0).unwrap();
        let moon = ephem.moon_phase(&instant).unwrap();

        assert_eq!(moon.phase_name, PhaseName::WaxingCrescent);
        assert_abs_diff_eq!(moon.age_days, 3.0, epsilon = 0.05);
        assert_abs_diff_eq!(moon.illumination, illumination_percent(moon.phase), epsilon = 1e-12);

        let expected_full = Utc.with_ymd_and_hms(2024, 1, 25, 17, 54, 0).unwrap();
        assert!((moon.next_full_moon - expected_full).num_minutes().abs() < 10);
        assert!(moon.previous_new_moon < instant);
        assert!(moon.next_new_moon > moon.next_full_moon);
    }
}
