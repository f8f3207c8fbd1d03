//! Civil time ⇄ astronomical time bridge.
//!
//! Public instants in `skyclock` are civil [`chrono::DateTime<Utc>`] values; the
//! ephemeris layer works on [`hifitime::Epoch`] so that the TT − UTC offset
//! (leap seconds + 32.184 s) is handled by hifitime. This module converts between
//! the two through the UTC Modified Julian Date, and computes the Greenwich mean
//! sidereal time.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use hifitime::Epoch;

use crate::constants::{Hours, DAYS_PER_CENTURY, DPI, MJD, MJD_UNIX_EPOCH, SECONDS_PER_DAY, T2000};

/// Convert a civil UTC instant to a hifitime [`Epoch`] (UTC time scale).
pub fn epoch_from_utc(instant: &DateTime<Utc>) -> Epoch {
    Epoch::from_mjd_utc(mjd_from_utc(instant))
}

/// Convert a hifitime [`Epoch`] back to a civil UTC instant, rounded to the millisecond.
pub fn utc_from_epoch(epoch: &Epoch) -> DateTime<Utc> {
    utc_from_mjd(epoch.to_mjd_utc_days())
}

/// UTC Modified Julian Date of a civil instant.
pub fn mjd_from_utc(instant: &DateTime<Utc>) -> MJD {
    instant.timestamp_millis() as f64 / (SECONDS_PER_DAY * 1000.0) + MJD_UNIX_EPOCH
}

/// Civil instant of a UTC Modified Julian Date, rounded to the millisecond.
///
/// Values outside chrono's representable range saturate to the Unix epoch.
pub fn utc_from_mjd(mjd: MJD) -> DateTime<Utc> {
    let millis = ((mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY * 1000.0).round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

/// Julian centuries of TT elapsed since J2000.0 for an epoch.
pub fn julian_centuries_tt(epoch: &Epoch) -> f64 {
    (epoch.to_mjd_tt_days() - T2000) / DAYS_PER_CENTURY
}

/// Shift an instant by a fractional number of days.
pub fn add_days(instant: &DateTime<Utc>, days: f64) -> DateTime<Utc> {
    *instant + Duration::milliseconds((days * SECONDS_PER_DAY * 1000.0).round() as i64)
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (*to - *from).num_milliseconds() as f64 / (SECONDS_PER_DAY * 1000.0)
}

/// Render a fractional hour value as a time of day on `date`.
///
/// `hours` is expected in `[0, 24)`; the result is anchored at midnight of `date`.
pub fn time_of_day(date: NaiveDate, hours: Hours) -> NaiveDateTime {
    let millis = (hours * 3_600_000.0).round() as i64;
    date.and_time(chrono::NaiveTime::MIN) + Duration::milliseconds(millis)
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 ≈ UTC time scale).
///
/// # Arguments
/// * `tjm` - Modified Julian Date
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # Details
/// The GMST is computed in two steps:
/// 1. A cubic polynomial (coefficients C0–C3) gives GMST at 0h UT1 in seconds.
/// 2. The fraction of the day is added, scaled by the ratio of sidereal to solar day.
///
/// # References
/// * IAU 1982, IERS Conventions 1996/2000.
pub fn gmst(tjm: MJD) -> f64 {
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / DAYS_PER_CENTURY;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;

    let h = (tjm - itjm) * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_mjd_from_utc() {
        let instant = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(mjd_from_utc(&instant), 59215.0);

        let instant = Utc.with_ymd_and_hms(2021, 1, 2, 12, 0, 0).unwrap();
        assert_eq!(mjd_from_utc(&instant), 59216.5);
    }

    #[test]
    fn test_epoch_round_trip_keeps_millis() {
        let instant = Utc.with_ymd_and_hms(2024, 4, 8, 18, 17, 21).unwrap()
            + Duration::milliseconds(250);
        let back = utc_from_epoch(&epoch_from_utc(&instant));
        assert_eq!(back, instant);
    }

    #[test]
    fn test_julian_centuries_at_j2000() {
        // TT − UTC was 64.184 s in January 2000
        let instant = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let t = julian_centuries_tt(&epoch_from_utc(&instant));
        assert_abs_diff_eq!(t, 64.184 / SECONDS_PER_DAY / DAYS_PER_CENTURY, epsilon = 1e-9);
    }

    #[test]
    fn test_time_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let t = time_of_day(date, 6.5);
        assert_eq!(t, date.and_hms_opt(6, 30, 0).unwrap());
    }

    #[test]
    fn test_gmst() {
        let tut = 57028.478514610404;
        assert_abs_diff_eq!(gmst(tut), 4.851925725092499, epsilon = 1e-12);

        assert_abs_diff_eq!(gmst(T2000), 4.894961212789145, epsilon = 1e-12);
    }
}
