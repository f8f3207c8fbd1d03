use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{ArcSec, Radian, DAYS_PER_CENTURY, RADEG, RADSEC, T2000};

/// Compute the mean obliquity of the ecliptic at a given epoch (IAU 1976 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * Mean obliquity of the ecliptic in radians.
///
/// The obliquity ε is a cubic polynomial in Julian centuries since J2000,
/// evaluated with Horner's method:
///
/// ```text
/// ε = ((ob3 * t + ob2) * t + ob1) * t + ob0;
/// ```
pub fn obleq(tjm: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (tjm - T2000) / DAYS_PER_CENTURY;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Low-precision nutation angles (Δψ, Δε) in arcseconds.
///
/// Only the four dominant terms of the IAU 1980 series are kept, driven by the
/// longitude of the Moon's ascending node and the mean longitudes of the Sun
/// and Moon. Accuracy is about 0.5″ in Δψ and 0.1″ in Δε, well below what the
/// sidereal-time and apparent-position consumers of this crate can resolve.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
pub fn nutation(tjm: f64) -> (ArcSec, ArcSec) {
    let t = (tjm - T2000) / DAYS_PER_CENTURY;

    let node = (125.04452 - 1934.136261 * t) * RADEG;
    let sun_lon = (280.4665 + 36000.7698 * t) * RADEG;
    let moon_lon = (218.3165 + 481267.8813 * t) * RADEG;

    let dpsi = -17.20 * node.sin() - 1.32 * (2.0 * sun_lon).sin() - 0.23 * (2.0 * moon_lon).sin()
        + 0.21 * (2.0 * node).sin();
    let deps = 9.20 * node.cos() + 0.57 * (2.0 * sun_lon).cos() + 0.10 * (2.0 * moon_lon).cos()
        - 0.09 * (2.0 * node).cos();

    (dpsi, deps)
}

/// True obliquity of the ecliptic (mean obliquity + Δε), in radians.
pub fn true_obliquity(tjm: f64) -> Radian {
    let (_, deps) = nutation(tjm);
    obleq(tjm) + deps * RADSEC
}

/// Compute the equation of the equinoxes (Δψ·cos ε) in radians.
///
/// Added to the mean sidereal time it gives the apparent sidereal time.
pub fn equequ(tjm: f64) -> Radian {
    let (dpsi, _) = nutation(tjm);
    RADSEC * dpsi * obleq(tjm).cos()
}

/// Rotation matrix of angle `alpha` (radians) around axis `k` (0 = x, 1 = y, 2 = z).
///
/// The rotation is active: applied to a vector it turns the vector by `+alpha`.
pub fn rotmt(alpha: f64, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        _ => Vector3::z_axis(),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Rotate a vector from ecliptic to equatorial axes for an obliquity `eps` (radians).
pub fn ecliptic_to_equatorial(v: &Vector3<f64>, eps: Radian) -> Vector3<f64> {
    rotmt(eps, 0) * v
}

/// Rotate a vector from equatorial to ecliptic axes for an obliquity `eps` (radians).
pub fn equatorial_to_ecliptic(v: &Vector3<f64>, eps: Radian) -> Vector3<f64> {
    rotmt(-eps, 0) * v
}

/// Unit vector for spherical angles (longitude, latitude) in radians.
pub fn unit_vector(lon: Radian, lat: Radian) -> Vector3<f64> {
    let (slon, clon) = lon.sin_cos();
    let (slat, clat) = lat.sin_cos();
    Vector3::new(clat * clon, clat * slon, slat)
}

/// Spherical angles `(longitude, latitude, norm)` of a cartesian vector.
///
/// Longitude is normalized to [0, 2π), latitude lies in [-π/2, π/2].
pub fn to_spherical(v: &Vector3<f64>) -> (Radian, Radian, f64) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let lon = v.y.atan2(v.x).rem_euclid(std::f64::consts::TAU);
    let lat = (v.z / r).clamp(-1.0, 1.0).asin();
    (lon, lat, r)
}

#[cfg(test)]
mod earth_orientation_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_obleq_at_j2000() {
        assert_abs_diff_eq!(obleq(T2000) / RADEG, 23.439_291_1, epsilon = 1e-6);
    }

    #[test]
    fn test_nutation_magnitude() {
        // Δψ never exceeds ~19″ and Δε ~10″
        for k in 0..200 {
            let tjm = T2000 + k as f64 * 97.3;
            let (dpsi, deps) = nutation(tjm);
            assert!(dpsi.abs() < 19.5, "dpsi = {dpsi}");
            assert!(deps.abs() < 10.5, "deps = {deps}");
        }
    }

    #[test]
    fn test_ecliptic_equatorial_round_trip() {
        let eps = obleq(T2000);
        let v = Vector3::new(0.3, -0.8, 0.1);
        let back = equatorial_to_ecliptic(&ecliptic_to_equatorial(&v, eps), eps);
        assert_abs_diff_eq!(back, v, epsilon = 1e-15);
    }

    #[test]
    fn test_ecliptic_pole_maps_to_obliquity() {
        let eps = 23.44 * RADEG;
        // Ecliptic longitude 90° lies at declination +ε
        let eq = ecliptic_to_equatorial(&Vector3::new(0.0, 1.0, 0.0), eps);
        let (_, dec, _) = to_spherical(&eq);
        assert_abs_diff_eq!(dec, eps, epsilon = 1e-12);
    }

    #[test]
    fn test_to_spherical() {
        let (lon, lat, r) = to_spherical(&unit_vector(4.0, -0.5));
        assert_abs_diff_eq!(lon, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
    }
}
