//! # VSOP87 / ELP-2000 ephemeris
//!
//! Default implementation of [`EphemerisSource`] backed by registry theories:
//!
//! - **Planets and Sun**: VSOP87D heliocentric coordinates (ecliptic and equinox
//!   of date) from the [`vsop87`] crate. The Sun is the reflected Earth vector.
//! - **Moon**: ELP-2000/82 geocentric coordinates from [`astro::lunar`].
//!
//! This module only changes frames: heliocentric → geocentric, a single
//! light-time iteration for planets, annual aberration for the Sun, nutation in
//! longitude, then the true obliquity to reach the true equator of date.
//!
//! Supported range: Julian centuries |T| ≤ 10 around J2000 (years 1000–3000).
//! Outside of it every primitive fails with [`SkyclockError::EphemerisUnavailable`].

use astro::lunar;
use hifitime::Epoch;
use nalgebra::Vector3;
use vsop87::{vsop87d, SphericalCoordinates};

use crate::constants::{Degree, Hours, AU, RADH, RADSEC};
use crate::earth_orientation::{ecliptic_to_equatorial, equequ, nutation, true_obliquity, unit_vector};
use crate::ephem_source::{normalize_degrees, normalize_hours, Body, EphemerisSource};
use crate::skyclock_errors::SkyclockError;
use crate::time::{gmst, julian_centuries_tt};

/// Light travel time for one AU, in days.
const LIGHT_TIME_PER_AU: f64 = 0.005_775_518_3;

/// Constant of annual aberration over 1 AU, degrees.
const ABERRATION_DEG: f64 = 20.4898 / 3600.0;

/// Largest |T| (Julian centuries from J2000) accepted.
const SUPPORTED_CENTURIES: f64 = 10.0;

/// Heliocentric VSOP87D coordinates of a planet, or of the Earth for [`Body::Sun`].
fn vsop87d_of(body: Body, jde: f64) -> Option<SphericalCoordinates> {
    let coords = match body {
        Body::Sun => vsop87d::earth(jde),
        Body::Mercury => vsop87d::mercury(jde),
        Body::Venus => vsop87d::venus(jde),
        Body::Mars => vsop87d::mars(jde),
        Body::Jupiter => vsop87d::jupiter(jde),
        Body::Saturn => vsop87d::saturn(jde),
        Body::Uranus => vsop87d::uranus(jde),
        Body::Neptune => vsop87d::neptune(jde),
        Body::Moon => return None,
    };
    Some(coords)
}

/// Rectangular ecliptic-of-date vector, AU.
fn rectangular(coords: &SphericalCoordinates) -> Vector3<f64> {
    unit_vector(coords.longitude(), coords.latitude()) * coords.distance()
}

fn earth_vector(jde: f64) -> Vector3<f64> {
    rectangular(&vsop87d::earth(jde))
}

/// Ecliptic longitude and latitude (radians) and length of an ecliptic vector.
fn ecliptic_spherical(v: &Vector3<f64>) -> (f64, f64, f64) {
    let distance = v.norm();
    (v.y.atan2(v.x), (v.z / distance).asin(), distance)
}

/// Ecliptic of date (mean equinox) → true equator of date.
fn apparent_equatorial(lon: f64, lat: f64, distance: f64, mjd_tt: f64) -> Vector3<f64> {
    let (dpsi, _) = nutation(mjd_tt);
    let ecl = unit_vector(lon + dpsi * RADSEC, lat) * distance;
    ecliptic_to_equatorial(&ecl, true_obliquity(mjd_tt))
}

/// Default ephemeris provider: VSOP87D planets and Sun, ELP-2000/82 Moon.
#[derive(Debug, Default, Clone, Copy)]
pub struct Vsop87Ephemeris;

impl Vsop87Ephemeris {
    pub fn new() -> Self {
        Vsop87Ephemeris
    }

    /// Julian Ephemeris Day of `epoch`, rejecting epochs out of the supported range.
    fn jde(&self, epoch: &Epoch) -> Result<f64, SkyclockError> {
        let t = julian_centuries_tt(epoch);
        if !t.is_finite() || t.abs() > SUPPORTED_CENTURIES {
            return Err(SkyclockError::EphemerisUnavailable(format!(
                "epoch {epoch} is outside the supported range (years 1000 to 3000)"
            )));
        }
        Ok(epoch.to_jde_tt_days())
    }

    /// Apparent geocentric ecliptic longitude of the Sun without nutation (radians), and distance (AU).
    fn sun_ecliptic(jde: f64) -> (f64, f64, f64) {
        let earth = vsop87d::earth(jde);
        let distance = earth.distance();
        let lon = earth.longitude() + std::f64::consts::PI - (ABERRATION_DEG / distance).to_radians();
        (lon, -earth.latitude(), distance)
    }

    fn sun_vector(jde: f64, mjd_tt: f64) -> Vector3<f64> {
        let (lon, lat, distance) = Self::sun_ecliptic(jde);
        apparent_equatorial(lon, lat, distance, mjd_tt)
    }

    /// Geocentric Moon on the mean ecliptic of date: longitude, latitude (radians), distance (AU).
    fn moon_ecliptic(jde: f64) -> (f64, f64, f64) {
        let (point, distance_km) = lunar::geocent_ecl_pos(jde);
        (point.long, point.lat, distance_km / AU)
    }

    fn moon_vector(jde: f64, mjd_tt: f64) -> Vector3<f64> {
        let (lon, lat, distance) = Self::moon_ecliptic(jde);
        apparent_equatorial(lon, lat, distance, mjd_tt)
    }

    fn planet_vector(body: Body, jde: f64, mjd_tt: f64) -> Option<Vector3<f64>> {
        let earth = earth_vector(jde);
        let geometric = rectangular(&vsop87d_of(body, jde)?) - earth;

        // One light-time iteration
        let tau = geometric.norm() * LIGHT_TIME_PER_AU;
        let retarded = rectangular(&vsop87d_of(body, jde - tau)?) - earth;

        let (lon, lat, distance) = ecliptic_spherical(&retarded);
        Some(apparent_equatorial(lon, lat, distance, mjd_tt))
    }
}

impl EphemerisSource for Vsop87Ephemeris {
    fn geocentric_position(&self, body: Body, epoch: &Epoch) -> Result<Vector3<f64>, SkyclockError> {
        let jde = self.jde(epoch)?;
        let mjd_tt = epoch.to_mjd_tt_days();
        match body {
            Body::Sun => Ok(Self::sun_vector(jde, mjd_tt)),
            Body::Moon => Ok(Self::moon_vector(jde, mjd_tt)),
            planet => Self::planet_vector(planet, jde, mjd_tt)
                .ok_or_else(|| SkyclockError::EphemerisUnavailable(format!("no theory for {planet}"))),
        }
    }

    fn heliocentric_distance(&self, body: Body, epoch: &Epoch) -> Result<f64, SkyclockError> {
        let jde = self.jde(epoch)?;
        match body {
            Body::Sun => Ok(0.0),
            Body::Moon => {
                let mjd_tt = epoch.to_mjd_tt_days();
                Ok((Self::moon_vector(jde, mjd_tt) - Self::sun_vector(jde, mjd_tt)).norm())
            }
            planet => vsop87d_of(planet, jde)
                .map(|coords| coords.distance())
                .ok_or_else(|| SkyclockError::EphemerisUnavailable(format!("no theory for {planet}"))),
        }
    }

    fn sidereal_time(&self, epoch: &Epoch) -> Hours {
        let gast = gmst(epoch.to_mjd_utc_days()) + equequ(epoch.to_mjd_tt_days());
        normalize_hours(gast / RADH)
    }

    fn moon_elongation(&self, epoch: &Epoch) -> Result<Degree, SkyclockError> {
        let jde = self.jde(epoch)?;
        let (moon_lon, _, _) = Self::moon_ecliptic(jde);
        let (sun_lon, _, _) = Self::sun_ecliptic(jde);
        Ok(normalize_degrees((moon_lon - sun_lon).to_degrees()))
    }
}

#[cfg(test)]
mod vsop_test {
    use super::*;
    use crate::earth_orientation::to_spherical;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sun_meeus_example_25b() {
        // 1992 October 13.0 TD: geometric Θ = 199.907372°, R = 0.99760775 AU
        let earth = vsop87d::earth(2_448_908.5);
        let lon = normalize_degrees(earth.longitude().to_degrees() + 180.0);
        assert_abs_diff_eq!(lon, 199.907_372, epsilon = 2e-4);
        assert_abs_diff_eq!(earth.distance(), 0.997_607_75, epsilon = 1e-6);
    }

    #[test]
    fn test_moon_meeus_example_47a() {
        // 1992 April 12.0 TD
        let (lon, lat, dist) = Vsop87Ephemeris::moon_ecliptic(2_448_724.5);
        assert_abs_diff_eq!(normalize_degrees(lon.to_degrees()), 133.162_655, epsilon = 1e-3);
        assert_abs_diff_eq!(lat.to_degrees(), -3.229_126, epsilon = 1e-3);
        assert_abs_diff_eq!(dist * AU, 368_409.7, epsilon = 1.0);
    }

    #[test]
    fn test_venus_meeus_example_33a() {
        // 1992 December 20.0 TD: α = 21h04m41.454s, δ = −18°53′16.84″, Δ = 0.910947 AU
        let jde = 2_448_976.5;
        let v = Vsop87Ephemeris::planet_vector(Body::Venus, jde, jde - 2_400_000.5).unwrap();
        let (ra, dec, dist) = to_spherical(&v);
        assert_abs_diff_eq!(ra / RADH, 21.078_182, epsilon = 2e-3);
        assert_abs_diff_eq!(dec.to_degrees(), -18.888_01, epsilon = 0.02);
        assert_abs_diff_eq!(dist, 0.910_947, epsilon = 1e-4);
    }

    #[test]
    fn test_out_of_range_epoch() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(3500, 1, 1);
        let err = Vsop87Ephemeris.geocentric_position(Body::Mars, &epoch).unwrap_err();
        assert!(matches!(err, SkyclockError::EphemerisUnavailable(_)));
    }

    #[test]
    fn test_elongation_range() {
        let source = Vsop87Ephemeris;
        let start = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        for day in 0..60 {
            let epoch = start + hifitime::Unit::Day * day as f64;
            let elong = source.moon_elongation(&epoch).unwrap();
            assert!((0.0..360.0).contains(&elong));
        }
    }

    #[test]
    fn test_planet_heliocentric_distances() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let source = Vsop87Ephemeris;
        let jupiter = source.heliocentric_distance(Body::Jupiter, &epoch).unwrap();
        let neptune = source.heliocentric_distance(Body::Neptune, &epoch).unwrap();
        assert!((4.9..5.5).contains(&jupiter));
        assert!((29.7..30.4).contains(&neptune));
    }

    #[test]
    fn test_sidereal_time_at_j2000() {
        // GMST at 2000-01-01 12:00 UT1 is 18.697 h
        let epoch = Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0);
        assert_abs_diff_eq!(Vsop87Ephemeris.sidereal_time(&epoch), 18.697_4, epsilon = 2e-3);
    }
}
