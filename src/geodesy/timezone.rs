//! Longitude-based timezone estimation.
//!
//! The offset is the 15°-per-hour approximation `round(lon / 15) × 60` minutes.
//! A representative IANA zone is then looked up for that whole-hour offset
//! (one per hemisphere) with `chrono-tz`, which supplies the zone name, the
//! current abbreviation and the DST flag. Offsets without a representative
//! fall back to a synthesized `UTC±H:MM` label.
//!
//! This is an approximation: political zone boundaries are ignored and the
//! reported offset never includes DST.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::Serialize;

use crate::constants::Degree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimezoneEstimate {
    pub name: String,
    pub abbreviation: String,
    /// Longitude approximation, a multiple of 60 within [-720, 840].
    pub offset_minutes: i32,
    pub is_dst: bool,
}

/// Representative zones per whole-hour offset: (hours, northern, southern).
const REPRESENTATIVE_ZONES: [(i32, Tz, Tz); 24] = [
    (-11, Tz::Pacific__Pago_Pago, Tz::Pacific__Pago_Pago),
    (-10, Tz::Pacific__Honolulu, Tz::Pacific__Tahiti),
    (-9, Tz::America__Anchorage, Tz::Pacific__Gambier),
    (-8, Tz::America__Los_Angeles, Tz::Pacific__Pitcairn),
    (-7, Tz::America__Denver, Tz::America__Denver),
    (-6, Tz::America__Chicago, Tz::Pacific__Galapagos),
    (-5, Tz::America__New_York, Tz::America__Lima),
    (-4, Tz::America__Halifax, Tz::America__Santiago),
    (-3, Tz::America__Cayenne, Tz::America__Sao_Paulo),
    (-2, Tz::Atlantic__South_Georgia, Tz::Atlantic__South_Georgia),
    (-1, Tz::Atlantic__Azores, Tz::Atlantic__Azores),
    (0, Tz::Europe__London, Tz::Atlantic__St_Helena),
    (1, Tz::Europe__Paris, Tz::Africa__Luanda),
    (2, Tz::Europe__Athens, Tz::Africa__Johannesburg),
    (3, Tz::Europe__Moscow, Tz::Indian__Antananarivo),
    (4, Tz::Asia__Dubai, Tz::Indian__Mauritius),
    (5, Tz::Asia__Karachi, Tz::Indian__Kerguelen),
    (6, Tz::Asia__Dhaka, Tz::Indian__Chagos),
    (7, Tz::Asia__Bangkok, Tz::Asia__Jakarta),
    (8, Tz::Asia__Shanghai, Tz::Australia__Perth),
    (9, Tz::Asia__Tokyo, Tz::Asia__Jayapura),
    (10, Tz::Asia__Vladivostok, Tz::Australia__Sydney),
    (11, Tz::Asia__Magadan, Tz::Pacific__Noumea),
    (12, Tz::Asia__Kamchatka, Tz::Pacific__Auckland),
];

/// Whole-hour offset of a longitude, `round(lon / 15)` restricted to [-12, 14].
///
/// NaN yields 0.
pub fn offset_hours(longitude: Degree) -> i32 {
    (longitude / 15.0).round().clamp(-12.0, 14.0) as i32
}

/// Estimate the timezone of an observer at the current wall-clock instant.
///
/// Never fails; see [`estimate_timezone_at`].
pub fn estimate_timezone(latitude: Degree, longitude: Degree) -> TimezoneEstimate {
    estimate_timezone_at(latitude, longitude, &Utc::now())
}

/// Estimate the timezone of an observer, evaluating DST at `at`.
///
/// Arguments
/// -----------------
/// * `latitude`: degrees, only its sign is used (hemisphere of the representative zone).
/// * `longitude`: degrees east.
/// * `at`: instant used for the abbreviation and DST state.
///
/// Return
/// ----------
/// * A [`TimezoneEstimate`]; unresolvable offsets produce a `UTC±H:MM` label with `is_dst = false`.
pub fn estimate_timezone_at(
    latitude: Degree,
    longitude: Degree,
    at: &DateTime<Utc>,
) -> TimezoneEstimate {
    let hours = offset_hours(longitude);
    let offset_minutes = hours * 60;

    let zone = REPRESENTATIVE_ZONES
        .iter()
        .find(|(h, _, _)| *h == hours)
        .map(|(_, north, south)| if latitude >= 0.0 { *north } else { *south });

    match zone {
        Some(tz) => {
            let local = at.with_timezone(&tz);
            let is_dst = local.offset().dst_offset() != Duration::zero();
            TimezoneEstimate {
                name: tz.name().to_string(),
                abbreviation: local.format("%Z").to_string(),
                offset_minutes,
                is_dst,
            }
        }
        None => {
            let label = utc_offset_label(offset_minutes);
            TimezoneEstimate {
                name: label.clone(),
                abbreviation: label,
                offset_minutes,
                is_dst: false,
            }
        }
    }
}

/// `UTC±H:MM` label for an offset in minutes.
pub fn utc_offset_label(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.abs();
    format!("UTC{sign}{}:{:02}", abs / 60, abs % 60)
}

#[cfg(test)]
mod timezone_test {
    use super::*;
    use chrono::TimeZone;

    fn january() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn july() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_york() {
        let winter = estimate_timezone_at(40.7128, -74.0060, &january());
        assert_eq!(winter.offset_minutes, -300);
        assert_eq!(winter.name, "America/New_York");
        assert_eq!(winter.abbreviation, "EST");
        assert!(!winter.is_dst);

        let summer = estimate_timezone_at(40.7128, -74.0060, &july());
        assert_eq!(summer.offset_minutes, -300);
        assert_eq!(summer.abbreviation, "EDT");
        assert!(summer.is_dst);
    }

    #[test]
    fn test_tokyo() {
        let tz = estimate_timezone_at(35.6762, 139.6503, &july());
        assert_eq!(tz.offset_minutes, 540);
        assert_eq!(tz.name, "Asia/Tokyo");
        assert!(!tz.is_dst);
    }

    #[test]
    fn test_southern_hemisphere_dst() {
        let tz = estimate_timezone_at(-33.8688, 151.2093, &january());
        assert_eq!(tz.offset_minutes, 600);
        assert_eq!(tz.name, "Australia/Sydney");
        assert!(tz.is_dst);
    }

    #[test]
    fn test_fallback_label() {
        let tz = estimate_timezone_at(-10.0, -179.0, &january());
        assert_eq!(tz.offset_minutes, -720);
        assert_eq!(tz.name, "UTC-12:00");
        assert!(!tz.is_dst);
    }

    #[test]
    fn test_offset_invariants() {
        let mut lon = -180.0;
        while lon <= 180.0 {
            let tz = estimate_timezone_at(0.0, lon, &january());
            assert!((-720..=840).contains(&tz.offset_minutes));
            assert_eq!(tz.offset_minutes % 60, 0);
            lon += 2.5;
        }
    }

    #[test]
    fn test_utc_offset_label() {
        assert_eq!(utc_offset_label(0), "UTC+0:00");
        assert_eq!(utc_offset_label(330), "UTC+5:30");
        assert_eq!(utc_offset_label(-720), "UTC-12:00");
    }
}
