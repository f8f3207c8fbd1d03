//! Conversion of an arbitrary equatorial direction into the observer's
//! horizontal frame and into galactic coordinates.
//!
//! The galactic transform rotates through the J2000 galactic pole but is
//! applied directly to coordinates of date, without precessing them back to
//! J2000. Expect errors of a few tenths of a degree away from J2000; this is
//! not a rigorous galactic-coordinate transform.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{Degree, Hours};
use crate::ephem_source::{equatorial_to_horizontal, normalize_degrees, normalize_hours};
use crate::ephemeris::Ephemeris;
use crate::geodesy::Observer;

/// Right ascension and declination of the north galactic pole, J2000.
const GALACTIC_POLE_RA: Degree = 192.85948;
const GALACTIC_POLE_DEC: Degree = 27.12825;
/// Galactic longitude of the north celestial pole, J2000.
const NCP_GALACTIC_LONGITUDE: Degree = 122.93192;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquatorialCoordinates {
    pub right_ascension: Hours,
    pub declination: Degree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizontalCoordinates {
    pub altitude: Degree,
    pub azimuth: Degree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GalacticCoordinates {
    pub longitude: Degree,
    pub latitude: Degree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateConversion {
    pub equatorial: EquatorialCoordinates,
    pub horizontal: HorizontalCoordinates,
    /// Approximate, see the module documentation.
    pub galactic: GalacticCoordinates,
}

/// Galactic longitude and latitude of an equatorial direction, degrees.
pub fn equatorial_to_galactic(ra: Hours, dec: Degree) -> GalacticCoordinates {
    let alpha = (ra * 15.0).to_radians();
    let delta = dec.to_radians();
    let alpha_g = GALACTIC_POLE_RA.to_radians();
    let delta_g = GALACTIC_POLE_DEC.to_radians();

    let sin_b = delta.sin() * delta_g.sin() + delta.cos() * delta_g.cos() * (alpha - alpha_g).cos();
    let latitude = sin_b.clamp(-1.0, 1.0).asin();

    let y = delta.cos() * (alpha - alpha_g).sin();
    let x = delta.sin() * delta_g.cos() - delta.cos() * delta_g.sin() * (alpha - alpha_g).cos();
    let longitude = NCP_GALACTIC_LONGITUDE - y.atan2(x).to_degrees();

    GalacticCoordinates {
        longitude: normalize_degrees(longitude),
        latitude: latitude.to_degrees(),
    }
}

impl Ephemeris {
    /// Horizontal and galactic coordinates of the direction (`ra` hours, `dec` degrees).
    ///
    /// The local sidereal time is the Greenwich apparent sidereal time of the
    /// source plus the observer's east longitude. No refraction is applied.
    pub fn coordinate_conversion(
        &self,
        ra: Hours,
        dec: Degree,
        instant: &DateTime<Utc>,
        observer: &Observer,
    ) -> CoordinateConversion {
        let ra = normalize_hours(ra);
        let lst = self.greenwich_sidereal_time(instant) + observer.longitude() / 15.0;
        let (altitude, azimuth) = equatorial_to_horizontal(ra, dec, lst, observer.latitude());

        CoordinateConversion {
            equatorial: EquatorialCoordinates {
                right_ascension: ra,
                declination: dec,
            },
            horizontal: HorizontalCoordinates { altitude, azimuth },
            galactic: equatorial_to_galactic(ra, dec),
        }
    }
}
