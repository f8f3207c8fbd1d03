//! # Ephemeris vector collaborator
//!
//! [`EphemerisSource`] is the seam between `skyclock` and whatever computes raw
//! body positions. An implementation only has to provide four primitives:
//!
//! | Primitive | Meaning |
//! |---|---|
//! | [`geocentric_position`](EphemerisSource::geocentric_position) | apparent geocentric vector, AU, true equator and equinox of date |
//! | [`heliocentric_distance`](EphemerisSource::heliocentric_distance) | Sun–body distance, AU |
//! | [`sidereal_time`](EphemerisSource::sidereal_time) | Greenwich apparent sidereal time, hours |
//! | [`moon_elongation`](EphemerisSource::moon_elongation) | Moon − Sun ecliptic longitude, degrees in [0, 360) |
//!
//! Everything else is a provided method built on those: topocentric horizontal
//! coordinates, and the search primitives of [`search`] (altitude crossings,
//! rise/set, hour angle, moon phase, lunar and solar eclipses).
//!
//! [`vsop::Vsop87Ephemeris`] is the default provider, built on the VSOP87 and
//! ELP-2000/82 theories.
//!
//! ## Time arguments
//!
//! Instants are [`hifitime::Epoch`] values. Search windows are expressed in
//! days relative to a start epoch; a negative window searches backward where
//! noted.

pub mod search;
pub mod vsop;

use hifitime::Epoch;
use nalgebra::Vector3;
use serde::Serialize;

use crate::constants::{Degree, Hours, RADEG, RADH};
use crate::earth_orientation::to_spherical;
use crate::geodesy::Observer;
use crate::skyclock_errors::SkyclockError;

pub use search::{
    Crossing, EclipseKind, LocalSolarEclipse, LunarEclipseInfo, SolarEclipseInfo,
};

/// Bodies known to the ephemeris collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Body {
    /// The seven classical planets reported by planetary position queries.
    pub const PLANETS: [Body; 7] = [
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
        }
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Topocentric apparent coordinates of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopocentricPosition {
    /// Right ascension, hours in [0, 24).
    pub right_ascension: Hours,
    /// Declination, degrees.
    pub declination: Degree,
    /// Altitude above the horizon, degrees in [-90, 90].
    pub altitude: Degree,
    /// Azimuth from north through east, degrees in [0, 360).
    pub azimuth: Degree,
    /// Topocentric distance, AU.
    pub distance: f64,
}

/// Convert equatorial coordinates to horizontal ones.
///
/// Arguments
/// -----------------
/// * `ra`: right ascension in hours.
/// * `dec`: declination in degrees.
/// * `lst`: local apparent sidereal time in hours.
/// * `latitude`: observer latitude in degrees.
///
/// Return
/// ----------
/// * `(altitude, azimuth)` in degrees, altitude in [-90, 90], azimuth in [0, 360).
pub fn equatorial_to_horizontal(ra: Hours, dec: Degree, lst: Hours, latitude: Degree) -> (Degree, Degree) {
    let h = (lst - ra) * RADH;
    let dec = dec * RADEG;
    let phi = latitude * RADEG;

    let sin_alt = phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos();
    let alt = sin_alt.clamp(-1.0, 1.0).asin();

    let az = (-dec.cos() * h.sin()).atan2(dec.sin() * phi.cos() - dec.cos() * phi.sin() * h.cos());

    (alt.to_degrees(), normalize_degrees(az.to_degrees()))
}

/// Wrap an angle into [0, 360).
pub fn normalize_degrees(deg: Degree) -> Degree {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Wrap an angle into (-180, 180].
pub fn normalize_to_pm180(deg: Degree) -> Degree {
    let d = normalize_degrees(deg);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Wrap an hour value into [0, 24).
pub fn normalize_hours(hours: Hours) -> Hours {
    let h = hours.rem_euclid(24.0);
    if h >= 24.0 {
        0.0
    } else {
        h
    }
}

/// Source of apparent body positions and the searches built on them.
pub trait EphemerisSource: Send + Sync {
    /// Apparent geocentric position of `body` in AU, true equator and equinox of date.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::EphemerisUnavailable`] when the epoch is outside the supported range.
    fn geocentric_position(&self, body: Body, epoch: &Epoch) -> Result<Vector3<f64>, SkyclockError>;

    /// Distance between the Sun and `body`, in AU (0 for the Sun itself).
    fn heliocentric_distance(&self, body: Body, epoch: &Epoch) -> Result<f64, SkyclockError>;

    /// Greenwich apparent sidereal time, hours in [0, 24).
    fn sidereal_time(&self, epoch: &Epoch) -> Hours;

    /// Geocentric elongation of the Moon, `λ_moon − λ_sun`, degrees in [0, 360).
    ///
    /// 0° is new moon, 180° full moon.
    fn moon_elongation(&self, epoch: &Epoch) -> Result<Degree, SkyclockError>;

    /// Position of `body` relative to the observer, in AU, true equator of date.
    fn topocentric_vector(
        &self,
        body: Body,
        epoch: &Epoch,
        observer: &Observer,
    ) -> Result<Vector3<f64>, SkyclockError> {
        let geocentric = self.geocentric_position(body, epoch)?;
        let gast = self.sidereal_time(epoch) * RADH;
        Ok(geocentric - observer.equatorial_position(gast))
    }

    /// Topocentric equatorial and horizontal coordinates of `body`.
    fn topocentric_position(
        &self,
        body: Body,
        epoch: &Epoch,
        observer: &Observer,
    ) -> Result<TopocentricPosition, SkyclockError> {
        let topo = self.topocentric_vector(body, epoch, observer)?;
        let (ra, dec, distance) = to_spherical(&topo);
        let ra_hours = normalize_hours(ra / RADH);
        let dec_deg = dec.to_degrees();

        let lst = self.sidereal_time(epoch) + observer.longitude() / 15.0;
        let (altitude, azimuth) = equatorial_to_horizontal(ra_hours, dec_deg, lst, observer.latitude());

        Ok(TopocentricPosition {
            right_ascension: ra_hours,
            declination: dec_deg,
            altitude,
            azimuth,
            distance,
        })
    }

    /// First instant within `limit_days` of `start` where the topocentric altitude
    /// of `body` crosses `altitude` in the given direction.
    fn search_altitude(
        &self,
        body: Body,
        observer: &Observer,
        start: &Epoch,
        limit_days: f64,
        altitude: Degree,
        direction: Crossing,
    ) -> Result<Option<Epoch>, SkyclockError> {
        search::altitude_crossing(self, body, observer, start, limit_days, |_| altitude, direction)
    }

    /// Rise (`Crossing::Ascending`) or set (`Crossing::Descending`) of the upper limb,
    /// including standard refraction.
    fn search_rise_set(
        &self,
        body: Body,
        observer: &Observer,
        start: &Epoch,
        limit_days: f64,
        direction: Crossing,
    ) -> Result<Option<Epoch>, SkyclockError> {
        search::rise_set(self, body, observer, start, limit_days, direction)
    }

    /// First instant within `limit_days` where the local hour angle of `body`
    /// equals `hour_angle` hours (0 = upper culmination).
    fn search_hour_angle(
        &self,
        body: Body,
        observer: &Observer,
        start: &Epoch,
        limit_days: f64,
        hour_angle: Hours,
    ) -> Result<Option<Epoch>, SkyclockError> {
        search::hour_angle(self, body, observer, start, limit_days, hour_angle)
    }

    /// Instant where the Moon's elongation equals `target` degrees.
    ///
    /// A positive `limit_days` returns the first such instant after `start`, a
    /// negative one the last such instant before `start`.
    fn search_moon_phase(
        &self,
        target: Degree,
        start: &Epoch,
        limit_days: f64,
    ) -> Result<Option<Epoch>, SkyclockError> {
        search::moon_phase(self, target, start, limit_days)
    }

    /// First lunar eclipse whose peak falls within `limit_days` after `start`.
    fn search_lunar_eclipse(
        &self,
        start: &Epoch,
        limit_days: f64,
    ) -> Result<Option<LunarEclipseInfo>, SkyclockError> {
        search::lunar_eclipse(self, start, limit_days)
    }

    /// First solar eclipse whose peak falls within `limit_days` after `start`,
    /// with local circumstances when an observer is given.
    fn search_solar_eclipse(
        &self,
        start: &Epoch,
        limit_days: f64,
        observer: Option<&Observer>,
    ) -> Result<Option<SolarEclipseInfo>, SkyclockError> {
        search::solar_eclipse(self, start, limit_days, observer)
    }
}
