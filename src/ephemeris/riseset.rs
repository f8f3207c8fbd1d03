//! Sun and Moon rise/set, solar noon and the three twilight tiers.
//!
//! Each event is searched over the civil day starting at local midnight.
//! A missing event (polar day or night, a Moon that does not rise that day, a
//! failing source) leaves its field `None`; nothing here returns an error.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use hifitime::Epoch;
use log::debug;
use serde::Serialize;

use crate::constants::Degree;
use crate::ephem_source::{Body, Crossing};
use crate::ephemeris::Ephemeris;
use crate::geodesy::Observer;
use crate::skyclock_errors::SkyclockError;
use crate::time::{epoch_from_utc, utc_from_epoch};

const DAY: f64 = 1.0;

const CIVIL_TWILIGHT: Degree = -6.0;
const NAUTICAL_TWILIGHT: Degree = -12.0;
const ASTRONOMICAL_TWILIGHT: Degree = -18.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SunMoonTimes {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub solar_noon: Option<DateTime<Utc>>,
    pub moonrise: Option<DateTime<Utc>>,
    pub moonset: Option<DateTime<Utc>>,
    pub civil_dawn: Option<DateTime<Utc>>,
    pub civil_dusk: Option<DateTime<Utc>>,
    pub nautical_dawn: Option<DateTime<Utc>>,
    pub nautical_dusk: Option<DateTime<Utc>>,
    pub astronomical_dawn: Option<DateTime<Utc>>,
    pub astronomical_dusk: Option<DateTime<Utc>>,
}

/// Absorb a search outcome into an optional instant.
fn found(event: &str, outcome: Result<Option<Epoch>, SkyclockError>) -> Option<DateTime<Utc>> {
    match outcome {
        Ok(found) => found.map(|epoch| utc_from_epoch(&epoch)),
        Err(err) => {
            debug!("{event} search failed: {err}");
            None
        }
    }
}

/// UTC instant of local midnight for the civil date of `date`.
fn local_midnight(date: &DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    date.timezone()
        .from_local_datetime(&date.date_naive().and_time(NaiveTime::MIN))
        .single()
        .map(|midnight| midnight.with_timezone(&Utc))
}

impl Ephemeris {
    /// Rise, set and twilight instants for the civil day of `date`.
    ///
    /// Arguments
    /// -----------------
    /// * `date`: any instant of the wanted day, in the observer's civil offset.
    /// * `observer`: the site; `None` yields an all-`None` result.
    pub fn sun_moon_times(
        &self,
        date: &DateTime<FixedOffset>,
        observer: Option<&Observer>,
    ) -> SunMoonTimes {
        let (Some(observer), Some(midnight)) = (observer, local_midnight(date)) else {
            return SunMoonTimes::default();
        };

        let source = self.source();
        let start = epoch_from_utc(&midnight);

        let rise_set = |body: Body, direction: Crossing, event: &str| {
            found(event, source.search_rise_set(body, observer, &start, DAY, direction))
        };
        let twilight = |altitude: Degree, direction: Crossing, event: &str| {
            found(
                event,
                source.search_altitude(Body::Sun, observer, &start, DAY, altitude, direction),
            )
        };

        SunMoonTimes {
            sunrise: rise_set(Body::Sun, Crossing::Ascending, "sunrise"),
            sunset: rise_set(Body::Sun, Crossing::Descending, "sunset"),
            solar_noon: found(
                "solar noon",
                source.search_hour_angle(Body::Sun, observer, &start, DAY, 0.0),
            ),
            moonrise: rise_set(Body::Moon, Crossing::Ascending, "moonrise"),
            moonset: rise_set(Body::Moon, Crossing::Descending, "moonset"),
            civil_dawn: twilight(CIVIL_TWILIGHT, Crossing::Ascending, "civil dawn"),
            civil_dusk: twilight(CIVIL_TWILIGHT, Crossing::Descending, "civil dusk"),
            nautical_dawn: twilight(NAUTICAL_TWILIGHT, Crossing::Ascending, "nautical dawn"),
            nautical_dusk: twilight(NAUTICAL_TWILIGHT, Crossing::Descending, "nautical dusk"),
            astronomical_dawn: twilight(ASTRONOMICAL_TWILIGHT, Crossing::Ascending, "astronomical dawn"),
            astronomical_dusk: twilight(ASTRONOMICAL_TWILIGHT, Crossing::Descending, "astronomical dusk"),
        }
    }
}

#[cfg(test)]
mod riseset_test {
    use super::*;

    fn paris_summer_day() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_no_observer_gives_empty_result() {
        let times = Ephemeris::default().sun_moon_times(&paris_summer_day(), None);
        assert_eq!(times, SunMoonTimes::default());
    }

    #[test]
    fn test_paris_summer_ordering() {
        let paris = Observer::new(48.8566, 2.3522, 35.0).unwrap();
        let times = Ephemeris::default().sun_moon_times(&paris_summer_day(), Some(&paris));

        let sunrise = times.sunrise.unwrap();
        let sunset = times.sunset.unwrap();
        let noon = times.solar_noon.unwrap();
        let civil_dawn = times.civil_dawn.unwrap();
        let nautical_dawn = times.nautical_dawn.unwrap();

        assert!(nautical_dawn < civil_dawn);
        assert!(civil_dawn < sunrise);
        assert!(sunrise < noon && noon < sunset);
        assert!(times.civil_dusk.unwrap() > sunset);

        // Paris sunrise 03:47 UTC, sunset 19:56 UTC in mid-June
        let expected_rise = Utc.with_ymd_and_hms(2024, 6, 15, 3, 47, 0).unwrap();
        let expected_set = Utc.with_ymd_and_hms(2024, 6, 15, 19, 56, 0).unwrap();
        assert!((sunrise - expected_rise).num_minutes().abs() <= 3);
        assert!((sunset - expected_set).num_minutes().abs() <= 3);

        // The Sun never goes 18° below the horizon at 48.9°N in June
        assert!(times.astronomical_dawn.is_none());
        assert!(times.astronomical_dusk.is_none());
    }

    #[test]
    fn test_polar_night() {
        let svalbard = Observer::new(78.2232, 15.6267, 0.0).unwrap();
        let date = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 12, 21, 12, 0, 0)
            .unwrap();
        let times = Ephemeris::default().sun_moon_times(&date, Some(&svalbard));
        assert!(times.sunrise.is_none());
        assert!(times.sunset.is_none());
        // Upper culmination still happens
        assert!(times.solar_noon.is_some());
    }
}
