//! Per-body positions: equatorial and horizontal coordinates, distance,
//! approximate apparent magnitude and zodiacal constellation.
//!
//! The magnitude is `H + 5·log10(r·Δ)` with `r` the heliocentric and `Δ` the
//! geocentric distance in AU. The phase-angle term is ignored, so the value is
//! an approximation only (it can be off by a magnitude for Mercury and Venus).
//!
//! The constellation label comes from a table of zodiacal bands in ecliptic
//! longitude; it ignores ecliptic latitude and the real IAU boundaries.

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::constants::{Degree, Hours};
use crate::earth_orientation::{equatorial_to_ecliptic, to_spherical, true_obliquity};
use crate::ephem_source::Body;
use crate::ephemeris::Ephemeris;
use crate::geodesy::Observer;
use crate::skyclock_errors::SkyclockError;
use crate::time::epoch_from_utc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialBodyPosition {
    pub body: Body,
    /// Topocentric right ascension, hours in [0, 24).
    pub right_ascension: Hours,
    /// Topocentric declination, degrees.
    pub declination: Degree,
    pub altitude: Degree,
    pub azimuth: Degree,
    /// Geocentric distance, AU.
    pub distance_au: f64,
    pub magnitude: f64,
    pub constellation: &'static str,
    /// `altitude > 0`.
    pub is_visible: bool,
}

/// Absolute magnitude H used by the magnitude approximation.
fn absolute_magnitude(body: Body) -> f64 {
    match body {
        Body::Sun => -26.74,
        Body::Moon => 0.21,
        Body::Mercury => -0.42,
        Body::Venus => -4.40,
        Body::Mars => -1.52,
        Body::Jupiter => -9.40,
        Body::Saturn => -8.88,
        Body::Uranus => -7.19,
        Body::Neptune => -6.87,
    }
}

/// Apparent magnitude approximation, see the module documentation.
pub fn approximate_magnitude(body: Body, heliocentric: f64, geocentric: f64) -> f64 {
    let distance_product = match body {
        Body::Sun => geocentric,
        _ => heliocentric * geocentric,
    };
    absolute_magnitude(body) + 5.0 * distance_product.log10()
}

/// Upper ecliptic-longitude bound of each zodiacal band, in increasing order.
const ZODIAC_BANDS: [(Degree, &str); 13] = [
    (28.7, "Pisces"),
    (53.4, "Aries"),
    (90.1, "Taurus"),
    (118.0, "Gemini"),
    (138.0, "Cancer"),
    (173.9, "Leo"),
    (218.0, "Virgo"),
    (241.0, "Libra"),
    (247.7, "Scorpius"),
    (266.3, "Ophiuchus"),
    (299.7, "Sagittarius"),
    (327.5, "Capricornus"),
    (351.6, "Aquarius"),
];

/// Zodiacal constellation containing an ecliptic longitude (degrees in [0, 360)).
pub fn zodiac_constellation(ecliptic_longitude: Degree) -> &'static str {
    ZODIAC_BANDS
        .iter()
        .find(|(upper, _)| ecliptic_longitude < *upper)
        .map(|(_, name)| *name)
        .unwrap_or("Pisces")
}

impl Ephemeris {
    /// Position of a single body for an observer.
    ///
    /// Arguments
    /// -----------------
    /// * `body`: any [`Body`], including the Sun and the Moon.
    /// * `instant`: UTC instant.
    /// * `observer`: site used for the topocentric correction and the horizontal frame.
    ///
    /// Errors
    /// ----------
    /// * Whatever the ephemeris source reports for this body and instant.
    pub fn astronomical_position(
        &self,
        body: Body,
        instant: &DateTime<Utc>,
        observer: &Observer,
    ) -> Result<CelestialBodyPosition, SkyclockError> {
        let source = self.source();
        let epoch = epoch_from_utc(instant);

        let topo = source.topocentric_position(body, &epoch, observer)?;
        let geocentric = source.geocentric_position(body, &epoch)?;
        let heliocentric = source.heliocentric_distance(body, &epoch)?;

        let ecliptic = equatorial_to_ecliptic(&geocentric, true_obliquity(epoch.to_mjd_tt_days()));
        let (ecl_lon, _, _) = to_spherical(&ecliptic);

        Ok(CelestialBodyPosition {
            body,
            right_ascension: topo.right_ascension,
            declination: topo.declination,
            altitude: topo.altitude,
            azimuth: topo.azimuth,
            distance_au: geocentric.norm(),
            magnitude: approximate_magnitude(body, heliocentric, geocentric.norm()),
            constellation: zodiac_constellation(ecl_lon.to_degrees()),
            is_visible: topo.altitude > 0.0,
        })
    }

    /// Positions of the seven classical planets.
    ///
    /// A body whose computation fails is logged at `warn` level and left out;
    /// this call never fails as a whole.
    pub fn planetary_positions(
        &self,
        instant: &DateTime<Utc>,
        observer: &Observer,
    ) -> Vec<CelestialBodyPosition> {
        Body::PLANETS
            .iter()
            .filter_map(|&body| match self.astronomical_position(body, instant, observer) {
                Ok(position) => Some(position),
                Err(err) => {
                    warn!("Skipping {body} in planetary positions: {err}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod planets_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn paris() -> Observer {
        Observer::new(48.8566, 2.3522, 35.0).unwrap()
    }

    #[test]
    fn test_zodiac_constellation() {
        assert_eq!(zodiac_constellation(0.0), "Pisces");
        assert_eq!(zodiac_constellation(30.0), "Aries");
        assert_eq!(zodiac_constellation(245.0), "Scorpius");
        assert_eq!(zodiac_constellation(250.0), "Ophiuchus");
        assert_eq!(zodiac_constellation(355.0), "Pisces");
    }

    #[test]
    fn test_approximate_magnitude() {
        // Jupiter near opposition: r = 5.0 AU, Δ = 4.0 AU
        assert_abs_diff_eq!(approximate_magnitude(Body::Jupiter, 5.0, 4.0), -2.89, epsilon = 0.01);
        assert_abs_diff_eq!(approximate_magnitude(Body::Sun, 0.0, 1.0), -26.74, epsilon = 1e-12);
    }

    #[test]
    fn test_seven_planets_in_range() {
        let ephem = Ephemeris::default();
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 22, 0, 0).unwrap();
        let positions = ephem.planetary_positions(&instant, &paris());

        assert_eq!(positions.len(), 7);
        for p in &positions {
            assert!((-90.0..=90.0).contains(&p.altitude), "{p:?}");
            assert!((0.0..360.0).contains(&p.azimuth), "{p:?}");
            assert!((0.0..24.0).contains(&p.right_ascension), "{p:?}");
            assert_eq!(p.is_visible, p.altitude > 0.0);
            assert!(p.distance_au > 0.0);
        }
    }

    #[test]
    fn test_planetary_positions_idempotent() {
        let ephem = Ephemeris::default();
        let instant = Utc.with_ymd_and_hms(2030, 1, 1, 3, 30, 0).unwrap();
        let first = ephem.planetary_positions(&instant, &paris());
        let second = ephem.planetary_positions(&instant, &paris());
        assert_eq!(first, second);
    }

    #[test]
    fn test_sun_position_at_solstice() {
        let ephem = Ephemeris::default();
        let instant = Utc.with_ymd_and_hms(2024, 6, 20, 21, 0, 0).unwrap();
        let sun = ephem
            .astronomical_position(Body::Sun, &instant, &paris())
            .unwrap();
        assert_abs_diff_eq!(sun.declination, 23.44, epsilon = 0.01);
        assert_abs_diff_eq!(sun.right_ascension, 6.0, epsilon = 0.01);

        // Ecliptic longitude ≈ 99.5° ten days later
        let july = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let sun = ephem.astronomical_position(Body::Sun, &july, &paris()).unwrap();
        assert_eq!(sun.constellation, "Gemini");
    }
}
