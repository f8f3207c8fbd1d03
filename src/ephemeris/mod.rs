//! # Ephemeris façade
//!
//! [`Ephemeris`] turns the raw primitives of an [`EphemerisSource`] into the
//! values published by `skyclock`. It is a thin, cloneable handle around an
//! `Arc<dyn EphemerisSource>`; every query is a pure function of its inputs.
//!
//! ## Queries
//!
//! | Query | Module | Failure policy |
//! |---|---|---|
//! | [`Ephemeris::planetary_positions`] | [`planets`] | failing bodies are logged and omitted |
//! | [`Ephemeris::astronomical_position`] | [`planets`] | error returned to the caller |
//! | [`Ephemeris::moon_phase`] | [`moon`] | syzygy search failures fall back to ±15 days |
//! | [`Ephemeris::sun_moon_times`] | [`riseset`] | each missing event is `None` |
//! | [`Ephemeris::coordinate_conversion`] | [`conversion`] | infallible |
//! | [`Ephemeris::upcoming_eclipses`] | [`eclipses`] | a failing search stops silently |
//! | [`Ephemeris::equation_of_time`] | here | error returned to the caller |
//!
//! All public instants are [`chrono::DateTime<Utc>`]; conversion to
//! [`hifitime::Epoch`] happens at this boundary through [`crate::time`].
//!
//! ## Approximations
//!
//! Apparent magnitudes, constellation labels and galactic coordinates are
//! deliberately simplified; see the respective modules.

pub mod conversion;
pub mod eclipses;
pub mod moon;
pub mod planets;
pub mod riseset;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::constants::{DAYS_PER_CENTURY, RADH, RADSEC};
use crate::earth_orientation::{nutation, obleq, to_spherical};
use crate::ephem_source::vsop::Vsop87Ephemeris;
use crate::ephem_source::{normalize_to_pm180, Body, EphemerisSource};
use crate::skyclock_errors::SkyclockError;
use crate::time::{epoch_from_utc, julian_centuries_tt};

pub use conversion::{CoordinateConversion, EquatorialCoordinates, GalacticCoordinates, HorizontalCoordinates};
pub use eclipses::{EclipseEvent, EclipseType};
pub use moon::{MoonPhase, PhaseName};
pub use planets::CelestialBodyPosition;
pub use riseset::SunMoonTimes;

/// Cloneable handle on an ephemeris source.
#[derive(Clone)]
pub struct Ephemeris {
    source: Arc<dyn EphemerisSource>,
}

impl Default for Ephemeris {
    fn default() -> Self {
        Ephemeris::new(Arc::new(Vsop87Ephemeris::new()))
    }
}

impl std::fmt::Debug for Ephemeris {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ephemeris").finish_non_exhaustive()
    }
}

impl Ephemeris {
    pub fn new(source: Arc<dyn EphemerisSource>) -> Self {
        Ephemeris { source }
    }

    /// The underlying collaborator.
    pub fn source(&self) -> &dyn EphemerisSource {
        self.source.as_ref()
    }

    /// Greenwich apparent sidereal time at `instant`, hours in [0, 24).
    pub fn greenwich_sidereal_time(&self, instant: &DateTime<Utc>) -> f64 {
        self.source.sidereal_time(&epoch_from_utc(instant))
    }

    /// Equation of time in minutes (apparent − mean solar time).
    ///
    /// Meeus eq. 28.3: `E = L0 − 0.0057183° − α + Δψ cos ε`, with `α` the
    /// apparent right ascension of the Sun from the source. Positive values
    /// mean the true Sun is ahead of the mean Sun.
    pub fn equation_of_time(&self, instant: &DateTime<Utc>) -> Result<f64, SkyclockError> {
        let epoch = epoch_from_utc(instant);
        let t = julian_centuries_tt(&epoch);
        let mean_longitude = 280.46646 + 36000.76983 * t + 0.0003032 * t * t;

        let sun = self.source.geocentric_position(Body::Sun, &epoch)?;
        let (ra, _, _) = to_spherical(&sun);

        let tjm = crate::constants::T2000 + t * DAYS_PER_CENTURY;
        let (dpsi, _) = nutation(tjm);
        let nutation_term = (dpsi * RADSEC * obleq(tjm).cos()).to_degrees();

        let e = normalize_to_pm180(mean_longitude - 0.0057183 - (ra / RADH) * 15.0 + nutation_term);
        Ok(e * 4.0)
    }
}

#[cfg(test)]
mod ephemeris_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_equation_of_time_extremes() {
        let ephem = Ephemeris::default();

        // Early November maximum, about +16.4 min
        let november = Utc.with_ymd_and_hms(2024, 11, 3, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(ephem.equation_of_time(&november).unwrap(), 16.4, epsilon = 0.3);

        // Mid-February minimum, about −14.2 min
        let february = Utc.with_ymd_and_hms(2024, 2, 11, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(ephem.equation_of_time(&february).unwrap(), -14.2, epsilon = 0.3);
    }

    #[test]
    fn test_equation_of_time_bounded() {
        let ephem = Ephemeris::default();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for day in (0..365).step_by(5) {
            let instant = start + chrono::Duration::days(day);
            let e = ephem.equation_of_time(&instant).unwrap();
            assert!(e.abs() < 17.0, "EoT {e} on day {day}");
        }
    }
}
