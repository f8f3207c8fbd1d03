//! # Observer & geodetic frames
//!
//! This module owns the observer representation shared by every other part of
//! `skyclock`, and the pure geodetic transforms derived from it:
//!
//! - [`Observer`]: validated geodetic site (latitude, longitude, altitude) with an
//!   optional accuracy radius and capture instant, plus its **precomputed
//!   Earth-centered, Earth-fixed** (ECEF) position.
//! - [`to_coordinate_frame`]: (lat, lon, alt) → [`CoordinateFrame`], i.e. WGS84
//!   Cartesian XYZ and the UTM zone/easting/northing/hemisphere.
//! - [`timezone`]: longitude-based timezone estimation.
//!
//! ## Conventions
//!
//! - Latitudes and longitudes in **degrees**, longitude **east positive**.
//! - Altitude in **meters** above the WGS84 ellipsoid.
//! - Cartesian coordinates in **meters**.
//!
//! ```text
//! X = (N + h) cosφ cosλ
//! Y = (N + h) cosφ sinλ
//! Z = (N (1 − e²) + h) sinφ          with N = a / sqrt(1 − e² sin²φ)
//! ```
//!
//! ## Invariants
//!
//! - An [`Observer`] always holds a latitude in [-90, 90] and a longitude in
//!   [-180, 180]; out-of-range input is rejected, never clamped.
//! - `hemisphere == 'N'` iff latitude ≥ 0, and `zone ∈ [1, 60]`.
//! - Observers are immutable: a new fix produces a new value.
//!
//! ## See also
//! ------------
//! * [`timezone::estimate_timezone`] – Offset/name heuristic from longitude.
//! * [`crate::ephemeris`] – Consumes [`Observer::equatorial_position`] for topocentric corrections.

pub mod timezone;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use ordered_float::NotNan;
use serde::Serialize;

use crate::constants::{
    Degree, Meter, Radian, AU_METERS, UTM_FALSE_EASTING, UTM_FALSE_NORTHING, UTM_K0, WGS84_A,
    WGS84_E2,
};
use crate::earth_orientation::rotmt;
use crate::geolocation::PositionFix;
use crate::skyclock_errors::SkyclockError;

/// Earth-centered, Earth-fixed Cartesian coordinates in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cartesian {
    pub x: Meter,
    pub y: Meter,
    pub z: Meter,
}

/// Universal Transverse Mercator coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UtmCoordinate {
    /// Zone number in [1, 60].
    pub zone: u8,
    pub easting: Meter,
    pub northing: Meter,
    /// `'N'` for latitudes ≥ 0, `'S'` otherwise.
    pub hemisphere: char,
}

/// Derived, read-only geodetic frame of an observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateFrame {
    pub cartesian: Cartesian,
    pub utm: UtmCoordinate,
}

/// Observer site on the WGS84 ellipsoid.
///
/// Units
/// -----
/// * `latitude`, `longitude`: degrees (east positive).
/// * `altitude`, `accuracy`: meters.
/// * `ecef`: meters, precomputed at construction.
///
/// See also
/// ------------
/// * [`Observer::new`] – Validating constructor.
/// * [`Observer::from_fix`] – Build from a geolocation fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observer {
    latitude: NotNan<f64>,
    longitude: NotNan<f64>,
    altitude: NotNan<f64>,
    accuracy: Option<NotNan<f64>>,
    captured_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    ecef: Vector3<f64>,
}

impl Observer {
    /// Create a new observer from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: Geodetic latitude in **degrees**, within [-90, 90].
    /// * `longitude`: Longitude in **degrees** east, within [-180, 180].
    /// * `altitude`: Height above the ellipsoid in **meters**.
    ///
    /// Return
    /// ----------
    /// * A constructed [`Observer`] with precomputed ECEF position.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::InvalidLatitude`] / [`SkyclockError::InvalidLongitude`] when out of range.
    /// * [`SkyclockError::NotANumber`] when any input is NaN.
    pub fn new(latitude: Degree, longitude: Degree, altitude: Meter) -> Result<Self, SkyclockError> {
        let (lat, lon) = validate_coordinates(latitude, longitude)?;
        let alt = NotNan::new(altitude)?;

        Ok(Observer {
            latitude: lat,
            longitude: lon,
            altitude: alt,
            accuracy: None,
            captured_at: None,
            ecef: geodetic_to_ecef(latitude, longitude, altitude),
        })
    }

    /// Build an observer from a geolocation fix, keeping its accuracy and timestamp.
    ///
    /// A fix without altitude is placed on the ellipsoid (altitude 0).
    pub fn from_fix(fix: &PositionFix) -> Result<Self, SkyclockError> {
        let mut observer = Observer::new(fix.latitude, fix.longitude, fix.altitude.unwrap_or(0.0))?;
        observer.accuracy = fix.accuracy.map(NotNan::new).transpose()?;
        observer.captured_at = Some(fix.timestamp);
        Ok(observer)
    }

    /// Attach an accuracy radius (meters) to a manually entered observer.
    pub fn with_accuracy(mut self, accuracy: Meter) -> Result<Self, SkyclockError> {
        self.accuracy = Some(NotNan::new(accuracy)?);
        Ok(self)
    }

    pub fn latitude(&self) -> Degree {
        self.latitude.into_inner()
    }

    pub fn longitude(&self) -> Degree {
        self.longitude.into_inner()
    }

    pub fn altitude(&self) -> Meter {
        self.altitude.into_inner()
    }

    pub fn accuracy(&self) -> Option<Meter> {
        self.accuracy.map(NotNan::into_inner)
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    /// Precomputed Earth-fixed position in meters.
    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }

    /// Geodetic frame of this observer. Infallible since the observer is already validated.
    pub fn frame(&self) -> CoordinateFrame {
        CoordinateFrame {
            cartesian: Cartesian {
                x: self.ecef.x,
                y: self.ecef.y,
                z: self.ecef.z,
            },
            utm: utm_from_geodetic(self.latitude(), self.longitude()),
        }
    }

    /// Geocentric position of the observer in the true equator of date, in **AU**.
    ///
    /// Arguments
    /// ---------
    /// * `gast`: Greenwich apparent sidereal time in **radians**.
    ///
    /// The Earth-fixed vector is turned by `+gast` around the polar axis, so a
    /// site at longitude λ ends up at right ascension `gast + λ`.
    pub fn equatorial_position(&self, gast: Radian) -> Vector3<f64> {
        rotmt(gast, 2) * self.ecef / AU_METERS
    }
}

/// Check latitude/longitude ranges, rejecting NaN first.
pub fn validate_coordinates(
    latitude: Degree,
    longitude: Degree,
) -> Result<(NotNan<f64>, NotNan<f64>), SkyclockError> {
    let lat = NotNan::new(latitude)?;
    let lon = NotNan::new(longitude)?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(SkyclockError::InvalidLatitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(SkyclockError::InvalidLongitude(longitude));
    }
    Ok((lat, lon))
}

/// Convert geodetic coordinates into the observer's [`CoordinateFrame`].
///
/// Arguments
/// -----------------
/// * `latitude`, `longitude`: degrees (east positive).
/// * `altitude`: meters above the WGS84 ellipsoid.
///
/// Return
/// ----------
/// * The Cartesian and UTM coordinates of the site.
///
/// Errors
/// ----------
/// * Range errors when latitude ∉ [-90, 90] or longitude ∉ [-180, 180].
pub fn to_coordinate_frame(
    latitude: Degree,
    longitude: Degree,
    altitude: Meter,
) -> Result<CoordinateFrame, SkyclockError> {
    Ok(Observer::new(latitude, longitude, altitude)?.frame())
}

/// Prime-vertical radius of curvature N(φ) in meters.
fn prime_vertical_radius(lat: Radian) -> Meter {
    WGS84_A / (1.0 - WGS84_E2 * lat.sin().powi(2)).sqrt()
}

fn geodetic_to_ecef(latitude: Degree, longitude: Degree, altitude: Meter) -> Vector3<f64> {
    let phi = latitude.to_radians();
    let lambda = longitude.to_radians();
    let n = prime_vertical_radius(phi);

    Vector3::new(
        (n + altitude) * phi.cos() * lambda.cos(),
        (n + altitude) * phi.cos() * lambda.sin(),
        (n * (1.0 - WGS84_E2) + altitude) * phi.sin(),
    )
}

/// UTM zone of a longitude, `floor((lon + 180) / 6) + 1` capped at 60.
pub fn utm_zone(longitude: Degree) -> u8 {
    (((longitude + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8
}

/// Transverse Mercator projection relative to the zone's central meridian
/// (Snyder, *Map Projections: A Working Manual*, eq. 8-9 to 8-10).
fn utm_from_geodetic(latitude: Degree, longitude: Degree) -> UtmCoordinate {
    let zone = utm_zone(longitude);
    let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;

    let e2 = WGS84_E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let phi = latitude.to_radians();
    let n = prime_vertical_radius(phi);
    let t = phi.tan().powi(2);
    let c = ep2 * phi.cos().powi(2);
    let a = phi.cos() * (longitude - central_meridian).to_radians();

    let m = WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let mut northing = UTM_K0
        * (m + n
            * phi.tan()
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    let hemisphere = if latitude >= 0.0 { 'N' } else { 'S' };
    if hemisphere == 'S' {
        northing += UTM_FALSE_NORTHING;
    }

    UtmCoordinate {
        zone,
        easting,
        northing,
        hemisphere,
    }
}

#[cfg(test)]
mod geodesy_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ecef_equator_prime_meridian() {
        let frame = to_coordinate_frame(0.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(frame.cartesian.x, WGS84_A, epsilon = 1e-6);
        assert_relative_eq!(frame.cartesian.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(frame.cartesian.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ecef_north_pole() {
        // Polar radius b = a (1 − f)
        let frame = to_coordinate_frame(90.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(frame.cartesian.z, 6_356_752.314_245, epsilon = 1e-3);
    }

    #[test]
    fn test_utm_central_meridian() {
        // On a central meridian the easting is the false easting exactly
        let frame = to_coordinate_frame(45.0, 3.0, 0.0).unwrap();
        assert_eq!(frame.utm.zone, 31);
        assert_relative_eq!(frame.utm.easting, 500_000.0, epsilon = 1e-6);
        // Meridian arc to 45°N scaled by k0
        assert_relative_eq!(frame.utm.northing, 4_982_950.4, epsilon = 1.0);
    }

    #[test]
    fn test_utm_known_point() {
        // New York City hall, 18T 583959 4507351
        let frame = to_coordinate_frame(40.7128, -74.0060, 0.0).unwrap();
        assert_eq!(frame.utm.zone, 18);
        assert_relative_eq!(frame.utm.easting, 583_959.4, epsilon = 1.0);
        assert_relative_eq!(frame.utm.northing, 4_507_351.0, epsilon = 1.0);
    }

    #[test]
    fn test_zone_edges() {
        assert_eq!(utm_zone(-180.0), 1);
        assert_eq!(utm_zone(180.0), 60);
        assert_eq!(utm_zone(0.0), 31);
        assert_eq!(utm_zone(-0.000_1), 30);
    }

    #[test]
    fn test_range_errors() {
        assert_eq!(
            to_coordinate_frame(90.5, 0.0, 0.0),
            Err(SkyclockError::InvalidLatitude(90.5))
        );
        assert_eq!(
            to_coordinate_frame(0.0, -180.5, 0.0),
            Err(SkyclockError::InvalidLongitude(-180.5))
        );
        assert_eq!(
            to_coordinate_frame(f64::NAN, 0.0, 0.0),
            Err(SkyclockError::NotANumber)
        );
    }

    #[test]
    fn test_from_fix_keeps_metadata() {
        let fix = PositionFix {
            latitude: 51.5,
            longitude: -0.12,
            altitude: None,
            accuracy: Some(25.0),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let obs = Observer::from_fix(&fix).unwrap();
        assert_eq!(obs.altitude(), 0.0);
        assert_eq!(obs.accuracy(), Some(25.0));
        assert_eq!(obs.captured_at(), Some(fix.timestamp));
    }

    #[test]
    fn test_equatorial_position_rotates_with_sidereal_time() {
        let obs = Observer::new(0.0, 90.0, 0.0).unwrap();
        // At GAST = 0 a site at 90°E points to RA 6h, i.e. +y
        let r = obs.equatorial_position(0.0);
        assert!(r.y > 0.0 && r.x.abs() < 1e-12);

        // At GAST = 90° it has turned to RA 12h, i.e. −x
        let r = obs.equatorial_position(std::f64::consts::FRAC_PI_2);
        assert!(r.x < 0.0 && r.y.abs() < 1e-12);
        assert_relative_eq!(r.norm(), WGS84_A / AU_METERS, epsilon = 1e-15);
    }
}
