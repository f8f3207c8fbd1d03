//! # Search primitives
//!
//! Event orchestration on top of the four [`EphemerisSource`] primitives. The
//! positions themselves always come from the source; this module only locates
//! instants.
//!
//! - **Hour angle and moon phase**: coarse scan of a wrapped angle with a fixed
//!   step, looking for a sign change in the requested direction, then
//!   **bisection** of the bracket down to ~10 ms. Angles are wrapped into
//!   (-180°, 180°]; the jump from +180° to −180° produces a sign change too, so
//!   those brackets are only accepted when `|f(a) − f(b)| < 270°`.
//! - **Altitude crossings**: the window is first cut at every upper and lower
//!   culmination of the body. Altitude is monotonic between two culminations,
//!   so each segment holds at most one crossing and short dips below a
//!   threshold around an extremum are never stepped over.
//!
//! Eclipses are searched on top of the syzygies: full moons for lunar eclipses
//! (Earth shadow radii with the Danjon 2 % enlargement), new moons for solar
//! eclipses (Sun/Moon disc geometry including lunar parallax). The instant of
//! greatest eclipse is located with a golden-section minimization of the
//! relevant angular distance.
//!
//! A search that does not bracket an event returns `Ok(None)`; errors only come
//! from the underlying source.

use hifitime::Epoch;
use nalgebra::Vector3;
use serde::Serialize;

use crate::constants::{Degree, Hours, AU, EARTH_RADIUS_KM, MOON_RADIUS_KM, SUN_RADIUS_KM};
use crate::ephem_source::{normalize_to_pm180, Body, EphemerisSource, TopocentricPosition};
use crate::geodesy::Observer;
use crate::skyclock_errors::SkyclockError;

/// Coarse scan step for hour-angle functions (days).
const HOUR_ANGLE_STEP_DAYS: f64 = 1.0 / 24.0;

/// Minimal spacing between two culminations of the same kind (days).
const CULMINATION_GAP_DAYS: f64 = 0.5;

/// Coarse scan step for the lunar elongation (days). The elongation moves at most ~15°/day.
const PHASE_STEP_DAYS: f64 = 1.0;

/// Bisection convergence (days), ~8.6 ms.
const CONVERGENCE_DAYS: f64 = 1e-7;

const MAX_BISECTIONS: usize = 64;

/// Standard horizontal refraction, degrees.
const REFRACTION_DEG: Degree = 34.0 / 60.0;

/// Atmospheric enlargement of the Earth's shadow.
const DANJON_ENLARGEMENT: f64 = 1.02;

/// Syzygies with a larger Sun–Moon/shadow offset cannot produce an eclipse (degrees).
const ECLIPSE_OFFSET_LIMIT_DEG: Degree = 2.0;

/// Half width of the window around a syzygy searched for greatest eclipse (days).
const ECLIPSE_HALF_WINDOW_DAYS: f64 = 0.25;

/// Half width of the window around the global peak searched for local circumstances (days).
const LOCAL_HALF_WINDOW_DAYS: f64 = 0.2;

/// Direction of a threshold crossing, in increasing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// The function goes from below to above the threshold (rise, dawn).
    Ascending,
    /// The function goes from above to below the threshold (set, dusk).
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EclipseKind {
    Penumbral,
    Partial,
    Total,
    Annular,
}

impl std::fmt::Display for EclipseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EclipseKind::Penumbral => "penumbral",
            EclipseKind::Partial => "partial",
            EclipseKind::Total => "total",
            EclipseKind::Annular => "annular",
        };
        f.write_str(label)
    }
}

/// Geocentric circumstances of a lunar eclipse.
#[derive(Debug, Clone, PartialEq)]
pub struct LunarEclipseInfo {
    pub kind: EclipseKind,
    /// Greatest eclipse: minimum distance between the Moon and the shadow axis.
    pub peak: Epoch,
    /// Fraction of the lunar disc inside the umbra at peak, 0 for penumbral eclipses.
    pub obscuration: f64,
    /// Classic umbral magnitude (negative for penumbral eclipses).
    pub umbral_magnitude: f64,
    pub penumbral_begin: Option<Epoch>,
    pub penumbral_end: Option<Epoch>,
}

impl LunarEclipseInfo {
    /// Penumbral duration in minutes, when both contacts were found.
    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.penumbral_begin, self.penumbral_end) {
            (Some(begin), Some(end)) => Some((end - begin).to_seconds() / 60.0),
            _ => None,
        }
    }
}

/// Circumstances of a solar eclipse as seen from one observer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolarEclipse {
    /// Minimum topocentric Sun–Moon separation.
    pub maximum: Epoch,
    /// Fraction of the solar disc covered at maximum.
    pub obscuration: f64,
    /// Sun altitude at maximum, degrees.
    pub sun_altitude: Degree,
    pub partial_begin: Option<Epoch>,
    pub partial_end: Option<Epoch>,
}

impl LocalSolarEclipse {
    pub fn is_visible(&self) -> bool {
        self.obscuration > 0.0 && self.sun_altitude > 0.0
    }

    /// Duration of the partial phase in minutes, when both contacts were found.
    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.partial_begin, self.partial_end) {
            (Some(begin), Some(end)) => Some((end - begin).to_seconds() / 60.0),
            _ => None,
        }
    }
}

/// Global circumstances of a solar eclipse.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarEclipseInfo {
    pub kind: EclipseKind,
    /// Minimum geocentric Sun–Moon separation.
    pub peak: Epoch,
    /// Largest fraction of the solar disc covered anywhere on Earth (approximation).
    pub obscuration: f64,
    pub local: Option<LocalSolarEclipse>,
}

fn epoch_at(mjd: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd)
}

/// A non-finite sample means the source cannot be searched around `mjd`.
fn finite(mjd: f64, value: f64) -> Result<f64, SkyclockError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SkyclockError::SearchFailed(format!(
            "search function is not finite at MJD {mjd:.5}"
        )))
    }
}

fn is_crossing(fa: f64, fb: f64, direction: Crossing, wrapped: bool) -> bool {
    if wrapped && (fa - fb).abs() >= 270.0 {
        return false;
    }
    match direction {
        Crossing::Ascending => fa < 0.0 && fb >= 0.0,
        Crossing::Descending => fa >= 0.0 && fb < 0.0,
    }
}

/// Refine a bracketed root of `f` between `ta` and `tb`.
fn bisect<F>(f: &F, mut ta: f64, mut fa: f64, mut tb: f64) -> Result<f64, SkyclockError>
where
    F: Fn(f64) -> Result<f64, SkyclockError>,
{
    for _ in 0..MAX_BISECTIONS {
        if tb - ta < CONVERGENCE_DAYS {
            break;
        }
        let tm = 0.5 * (ta + tb);
        let fm = finite(tm, f(tm)?)?;
        if (fa < 0.0) == (fm < 0.0) {
            ta = tm;
            fa = fm;
        } else {
            tb = tm;
        }
    }
    Ok(0.5 * (ta + tb))
}

/// Root of `f` in `[ta, tb]` when the end points have opposite signs.
fn contact<F>(f: &F, ta: f64, tb: f64) -> Result<Option<f64>, SkyclockError>
where
    F: Fn(f64) -> Result<f64, SkyclockError>,
{
    let fa = f(ta)?;
    let fb = f(tb)?;
    if (fa < 0.0) == (fb < 0.0) {
        return Ok(None);
    }
    bisect(f, ta, fa, tb).map(Some)
}

/// Coarse scan + bisection for a crossing of zero by `f`.
///
/// A negative `limit_days` scans backward and returns the latest crossing
/// before `start_mjd`; `direction` always refers to increasing time.
fn find_crossing<F>(
    f: F,
    start_mjd: f64,
    limit_days: f64,
    step: f64,
    direction: Crossing,
    wrapped: bool,
) -> Result<Option<f64>, SkyclockError>
where
    F: Fn(f64) -> Result<f64, SkyclockError>,
{
    let forward = limit_days >= 0.0;
    let end = start_mjd + limit_days;

    let mut t_prev = start_mjd;
    let mut f_prev = finite(t_prev, f(t_prev)?)?;

    loop {
        let t_next = if forward {
            (t_prev + step).min(end)
        } else {
            (t_prev - step).max(end)
        };
        if t_next == t_prev {
            return Ok(None);
        }
        let f_next = finite(t_next, f(t_next)?)?;

        let (ta, fa, tb, fb) = if forward {
            (t_prev, f_prev, t_next, f_next)
        } else {
            (t_next, f_next, t_prev, f_prev)
        };

        if is_crossing(fa, fb, direction, wrapped) {
            return bisect(&f, ta, fa, tb).map(Some);
        }

        t_prev = t_next;
        f_prev = f_next;
    }
}

/// Golden-section minimization of `f` over `[a, b]`.
///
/// Returns the abscissa of the minimum and the function value there.
fn golden_minimize<F>(f: F, mut a: f64, mut b: f64) -> Result<(f64, f64), SkyclockError>
where
    F: Fn(f64) -> Result<f64, SkyclockError>,
{
    const INV_PHI: f64 = 0.618_033_988_749_894_8;

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = finite(c, f(c)?)?;
    let mut fd = finite(d, f(d)?)?;

    while b - a > 10.0 * CONVERGENCE_DAYS {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = finite(c, f(c)?)?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = finite(d, f(d)?)?;
        }
    }

    let t = 0.5 * (a + b);
    Ok((t, f(t)?))
}

/// Area of the intersection of two discs of radii `r1`, `r2` whose centers are `d` apart.
pub fn disc_overlap_area(d: f64, r1: f64, r2: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return std::f64::consts::PI * r1.min(r2).powi(2);
    }

    let alpha = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let beta = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = 0.5
        * ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2))
            .max(0.0)
            .sqrt();

    r1 * r1 * alpha + r2 * r2 * beta - kite
}

/// Angular radius (degrees) of a sphere of `radius_km` seen from `distance_au`.
fn angular_radius(radius_km: f64, distance_au: f64) -> Degree {
    (radius_km / (distance_au * AU)).clamp(-1.0, 1.0).asin().to_degrees()
}

fn separation_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> Degree {
    a.angle(b).to_degrees()
}

/// Instants in `[a, b]` (MJD) at which `body` crosses the local meridian, above or below the pole.
fn culminations<S>(
    source: &S,
    body: Body,
    observer: &Observer,
    a: f64,
    b: f64,
) -> Result<Vec<f64>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let mut marks = Vec::new();
    for target in [0.0, 12.0] {
        let mut cursor = a;
        while cursor < b {
            let Some(t) = hour_angle_mjd(source, body, observer, cursor, b - cursor, target)? else {
                break;
            };
            marks.push(t);
            cursor = t + CULMINATION_GAP_DAYS;
        }
    }
    marks.sort_by(f64::total_cmp);
    Ok(marks)
}

/// See [`EphemerisSource::search_altitude`].
pub(crate) fn altitude_crossing<S, T>(
    source: &S,
    body: Body,
    observer: &Observer,
    start: &Epoch,
    limit_days: f64,
    target: T,
    direction: Crossing,
) -> Result<Option<Epoch>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
    T: Fn(&TopocentricPosition) -> Degree,
{
    let f = |mjd: f64| -> Result<f64, SkyclockError> {
        let pos = source.topocentric_position(body, &epoch_at(mjd), observer)?;
        Ok(pos.altitude - target(&pos))
    };

    let start_mjd = start.to_mjd_utc_days();
    let forward = limit_days >= 0.0;
    let (a, b) = if forward {
        (start_mjd, start_mjd + limit_days)
    } else {
        (start_mjd + limit_days, start_mjd)
    };

    let mut bounds = vec![a];
    bounds.extend(culminations(source, body, observer, a, b)?.into_iter().filter(|t| *t > a && *t < b));
    bounds.push(b);
    let values = bounds
        .iter()
        .map(|&t| finite(t, f(t)?))
        .collect::<Result<Vec<_>, _>>()?;

    let mut brackets = (0..bounds.len() - 1).filter(|&i| is_crossing(values[i], values[i + 1], direction, false));
    let picked = if forward { brackets.next() } else { brackets.last() };

    match picked {
        Some(i) => Ok(Some(epoch_at(bisect(&f, bounds[i], values[i], bounds[i + 1])?))),
        None => Ok(None),
    }
}

/// See [`EphemerisSource::search_rise_set`].
///
/// The threshold is the altitude of the body's center when its upper limb
/// touches the refracted horizon: `−(34′ + semidiameter)`.
pub(crate) fn rise_set<S>(
    source: &S,
    body: Body,
    observer: &Observer,
    start: &Epoch,
    limit_days: f64,
    direction: Crossing,
) -> Result<Option<Epoch>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let threshold = move |pos: &TopocentricPosition| -> Degree {
        let semidiameter = match body {
            Body::Sun => angular_radius(SUN_RADIUS_KM, pos.distance),
            Body::Moon => angular_radius(MOON_RADIUS_KM, pos.distance),
            _ => 0.0,
        };
        -(REFRACTION_DEG + semidiameter)
    };
    altitude_crossing(source, body, observer, start, limit_days, threshold, direction)
}

fn hour_angle_mjd<S>(
    source: &S,
    body: Body,
    observer: &Observer,
    start_mjd: f64,
    limit_days: f64,
    hour_angle: Hours,
) -> Result<Option<f64>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let f = |mjd: f64| -> Result<f64, SkyclockError> {
        let epoch = epoch_at(mjd);
        let pos = source.topocentric_position(body, &epoch, observer)?;
        let lst = source.sidereal_time(&epoch) + observer.longitude() / 15.0;
        Ok(normalize_to_pm180((lst - pos.right_ascension - hour_angle) * 15.0))
    };

    find_crossing(f, start_mjd, limit_days, HOUR_ANGLE_STEP_DAYS, Crossing::Ascending, true)
}

/// See [`EphemerisSource::search_hour_angle`].
pub(crate) fn hour_angle<S>(
    source: &S,
    body: Body,
    observer: &Observer,
    start: &Epoch,
    limit_days: f64,
    hour_angle: Hours,
) -> Result<Option<Epoch>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    Ok(hour_angle_mjd(source, body, observer, start.to_mjd_utc_days(), limit_days, hour_angle)?.map(epoch_at))
}

/// See [`EphemerisSource::search_moon_phase`].
pub(crate) fn moon_phase<S>(
    source: &S,
    target: Degree,
    start: &Epoch,
    limit_days: f64,
) -> Result<Option<Epoch>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let f = |mjd: f64| -> Result<f64, SkyclockError> {
        Ok(normalize_to_pm180(source.moon_elongation(&epoch_at(mjd))? - target))
    };

    Ok(find_crossing(
        f,
        start.to_mjd_utc_days(),
        limit_days,
        PHASE_STEP_DAYS,
        Crossing::Ascending,
        true,
    )?
    .map(epoch_at))
}

/// Earth shadow geometry at the Moon's distance, all angles in degrees.
struct ShadowGeometry {
    /// Angle between the Moon and the anti-solar point.
    offset: Degree,
    moon_radius: Degree,
    umbra: Degree,
    penumbra: Degree,
}

fn shadow_geometry<S>(source: &S, mjd: f64) -> Result<ShadowGeometry, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let epoch = epoch_at(mjd);
    let sun = source.geocentric_position(Body::Sun, &epoch)?;
    let moon = source.geocentric_position(Body::Moon, &epoch)?;

    let sun_km = sun.norm() * AU;
    let moon_km = moon.norm() * AU;

    let pi_sun = (EARTH_RADIUS_KM / sun_km).asin().to_degrees();
    let pi_moon = (EARTH_RADIUS_KM / moon_km).asin().to_degrees();
    let sun_radius = (SUN_RADIUS_KM / sun_km).asin().to_degrees();

    Ok(ShadowGeometry {
        offset: separation_deg(&moon, &(-sun)),
        moon_radius: (MOON_RADIUS_KM / moon_km).asin().to_degrees(),
        umbra: DANJON_ENLARGEMENT * (pi_moon + pi_sun - sun_radius),
        penumbra: DANJON_ENLARGEMENT * (pi_moon + pi_sun + sun_radius),
    })
}

fn classify_lunar(geometry: &ShadowGeometry) -> Option<EclipseKind> {
    let near_edge = geometry.offset - geometry.moon_radius;
    let far_edge = geometry.offset + geometry.moon_radius;

    if near_edge >= geometry.penumbra {
        None
    } else if far_edge <= geometry.umbra {
        Some(EclipseKind::Total)
    } else if near_edge < geometry.umbra {
        Some(EclipseKind::Partial)
    } else {
        Some(EclipseKind::Penumbral)
    }
}

fn lunar_eclipse_at_full_moon<S>(
    source: &S,
    full_moon_mjd: f64,
) -> Result<Option<LunarEclipseInfo>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    if shadow_geometry(source, full_moon_mjd)?.offset > ECLIPSE_OFFSET_LIMIT_DEG {
        return Ok(None);
    }

    let (peak_mjd, _) = golden_minimize(
        |mjd| Ok(shadow_geometry(source, mjd)?.offset),
        full_moon_mjd - ECLIPSE_HALF_WINDOW_DAYS,
        full_moon_mjd + ECLIPSE_HALF_WINDOW_DAYS,
    )?;
    let geometry = shadow_geometry(source, peak_mjd)?;

    let Some(kind) = classify_lunar(&geometry) else {
        return Ok(None);
    };

    let moon_area = std::f64::consts::PI * geometry.moon_radius.powi(2);
    let obscuration = (disc_overlap_area(geometry.offset, geometry.umbra, geometry.moon_radius)
        / moon_area)
        .clamp(0.0, 1.0);
    let umbral_magnitude =
        (geometry.umbra - geometry.offset + geometry.moon_radius) / (2.0 * geometry.moon_radius);

    // Outer limb on the penumbra boundary
    let penumbral_contact = |mjd: f64| -> Result<f64, SkyclockError> {
        let g = shadow_geometry(source, mjd)?;
        Ok(g.offset - g.moon_radius - g.penumbra)
    };
    let begin = contact(&penumbral_contact, peak_mjd - ECLIPSE_HALF_WINDOW_DAYS, peak_mjd)?;
    let end = contact(&penumbral_contact, peak_mjd, peak_mjd + ECLIPSE_HALF_WINDOW_DAYS)?;

    Ok(Some(LunarEclipseInfo {
        kind,
        peak: epoch_at(peak_mjd),
        obscuration,
        umbral_magnitude,
        penumbral_begin: begin.map(epoch_at),
        penumbral_end: end.map(epoch_at),
    }))
}

/// See [`EphemerisSource::search_lunar_eclipse`].
pub(crate) fn lunar_eclipse<S>(
    source: &S,
    start: &Epoch,
    limit_days: f64,
) -> Result<Option<LunarEclipseInfo>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let end = start.to_mjd_utc_days() + limit_days;
    let mut cursor = start.to_mjd_utc_days();

    while cursor < end {
        let Some(full_moon) = moon_phase(source, 180.0, &epoch_at(cursor), end - cursor)? else {
            return Ok(None);
        };
        let full_moon_mjd = full_moon.to_mjd_utc_days();

        if let Some(eclipse) = lunar_eclipse_at_full_moon(source, full_moon_mjd)? {
            return Ok(Some(eclipse));
        }
        cursor = full_moon_mjd + 1.0;
    }
    Ok(None)
}

/// Geocentric Sun/Moon disc geometry, all angles in degrees.
struct SolarGeometry {
    separation: Degree,
    /// π_moon − π_sun: how far parallax can shift the Moon relative to the Sun.
    parallax: Degree,
    sun_radius: Degree,
    /// Lunar semidiameter seen from the sub-lunar point.
    moon_radius: Degree,
}

fn solar_geometry<S>(source: &S, mjd: f64) -> Result<SolarGeometry, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let epoch = epoch_at(mjd);
    let sun = source.geocentric_position(Body::Sun, &epoch)?;
    let moon = source.geocentric_position(Body::Moon, &epoch)?;

    let sun_km = sun.norm() * AU;
    let moon_km = moon.norm() * AU;

    let pi_sun = (EARTH_RADIUS_KM / sun_km).asin().to_degrees();
    let pi_moon = (EARTH_RADIUS_KM / moon_km).asin().to_degrees();

    Ok(SolarGeometry {
        separation: separation_deg(&sun, &moon),
        parallax: pi_moon - pi_sun,
        sun_radius: (SUN_RADIUS_KM / sun_km).asin().to_degrees(),
        moon_radius: (MOON_RADIUS_KM / (moon_km - EARTH_RADIUS_KM)).asin().to_degrees(),
    })
}

fn local_solar_eclipse<S>(
    source: &S,
    peak_mjd: f64,
    observer: &Observer,
) -> Result<LocalSolarEclipse, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let topocentric_separation = |mjd: f64| -> Result<f64, SkyclockError> {
        let epoch = epoch_at(mjd);
        let sun = source.topocentric_vector(Body::Sun, &epoch, observer)?;
        let moon = source.topocentric_vector(Body::Moon, &epoch, observer)?;
        Ok(separation_deg(&sun, &moon))
    };

    let (max_mjd, min_separation) = golden_minimize(
        topocentric_separation,
        peak_mjd - LOCAL_HALF_WINDOW_DAYS,
        peak_mjd + LOCAL_HALF_WINDOW_DAYS,
    )?;

    let max_epoch = epoch_at(max_mjd);
    let sun = source.topocentric_position(Body::Sun, &max_epoch, observer)?;
    let moon = source.topocentric_position(Body::Moon, &max_epoch, observer)?;
    let sun_radius = angular_radius(SUN_RADIUS_KM, sun.distance);
    let moon_radius = angular_radius(MOON_RADIUS_KM, moon.distance);

    let sun_area = std::f64::consts::PI * sun_radius.powi(2);
    let obscuration =
        (disc_overlap_area(min_separation, sun_radius, moon_radius) / sun_area).clamp(0.0, 1.0);

    let (begin, end) = if obscuration > 0.0 {
        let limb_contact =
            |mjd: f64| -> Result<f64, SkyclockError> { Ok(topocentric_separation(mjd)? - sun_radius - moon_radius) };
        (
            contact(&limb_contact, peak_mjd - LOCAL_HALF_WINDOW_DAYS, max_mjd)?,
            contact(&limb_contact, max_mjd, peak_mjd + LOCAL_HALF_WINDOW_DAYS)?,
        )
    } else {
        (None, None)
    };

    Ok(LocalSolarEclipse {
        maximum: max_epoch,
        obscuration,
        sun_altitude: sun.altitude,
        partial_begin: begin.map(epoch_at),
        partial_end: end.map(epoch_at),
    })
}

fn solar_eclipse_at_new_moon<S>(
    source: &S,
    new_moon_mjd: f64,
    observer: Option<&Observer>,
) -> Result<Option<SolarEclipseInfo>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    if solar_geometry(source, new_moon_mjd)?.separation > ECLIPSE_OFFSET_LIMIT_DEG {
        return Ok(None);
    }

    let (peak_mjd, _) = golden_minimize(
        |mjd| Ok(solar_geometry(source, mjd)?.separation),
        new_moon_mjd - ECLIPSE_HALF_WINDOW_DAYS,
        new_moon_mjd + ECLIPSE_HALF_WINDOW_DAYS,
    )?;
    let geometry = solar_geometry(source, peak_mjd)?;

    // Smallest separation reachable from some point of the Earth's surface
    let axis_miss = geometry.separation - geometry.parallax;
    let best_separation = axis_miss.max(0.0);
    if best_separation >= geometry.sun_radius + geometry.moon_radius {
        return Ok(None);
    }

    let kind = if axis_miss <= (geometry.moon_radius - geometry.sun_radius).abs() {
        if geometry.moon_radius >= geometry.sun_radius {
            EclipseKind::Total
        } else {
            EclipseKind::Annular
        }
    } else {
        EclipseKind::Partial
    };

    let sun_area = std::f64::consts::PI * geometry.sun_radius.powi(2);
    let obscuration = (disc_overlap_area(best_separation, geometry.sun_radius, geometry.moon_radius)
        / sun_area)
        .clamp(0.0, 1.0);

    let local = observer
        .map(|obs| local_solar_eclipse(source, peak_mjd, obs))
        .transpose()?;

    Ok(Some(SolarEclipseInfo {
        kind,
        peak: epoch_at(peak_mjd),
        obscuration,
        local,
    }))
}

/// See [`EphemerisSource::search_solar_eclipse`].
pub(crate) fn solar_eclipse<S>(
    source: &S,
    start: &Epoch,
    limit_days: f64,
    observer: Option<&Observer>,
) -> Result<Option<SolarEclipseInfo>, SkyclockError>
where
    S: EphemerisSource + ?Sized,
{
    let end = start.to_mjd_utc_days() + limit_days;
    let mut cursor = start.to_mjd_utc_days();

    while cursor < end {
        let Some(new_moon) = moon_phase(source, 0.0, &epoch_at(cursor), end - cursor)? else {
            return Ok(None);
        };
        let new_moon_mjd = new_moon.to_mjd_utc_days();

        if let Some(eclipse) = solar_eclipse_at_new_moon(source, new_moon_mjd, observer)? {
            return Ok(Some(eclipse));
        }
        cursor = new_moon_mjd + 1.0;
    }
    Ok(None)
}
