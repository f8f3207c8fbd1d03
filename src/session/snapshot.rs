//! Immutable view of the session aggregate, and the event that carries it.

use std::sync::Arc;

use serde::Serialize;

use crate::clock::{ClockMode, ClockReadings, ClockState};
use crate::ephemeris::{CelestialBodyPosition, EclipseEvent, MoonPhase, SunMoonTimes};
use crate::geodesy::timezone::TimezoneEstimate;
use crate::geodesy::{CoordinateFrame, Observer};
use crate::geolocation::GeolocationError;

/// Which mutation produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Sent once, to the new subscriber only.
    Subscribed,
    ClockTick,
    OffsetChanged,
    TimezoneChanged,
    LocationChanged,
    TimeChanged,
    ModeChanged,
    AstronomyRefreshed,
    EclipsesRefreshed,
    GpsTrackingChanged,
    GeolocationFailed(GeolocationError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub observer: Option<Observer>,
    pub frame: Option<CoordinateFrame>,
    pub timezone: Option<TimezoneEstimate>,
    pub clock: ClockState,
    pub readings: ClockReadings,
    pub mode: ClockMode,
    /// Empty while no observer is set.
    pub planets: Vec<CelestialBodyPosition>,
    pub moon: Option<MoonPhase>,
    pub sun_moon_times: SunMoonTimes,
    pub eclipses: Vec<EclipseEvent>,
    pub gps_tracking: bool,
    /// Last geolocation failure, as a message for the user.
    pub last_error: Option<String>,
}

/// A mutation and the aggregate right after it.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub snapshot: Arc<SessionSnapshot>,
}

#[cfg(test)]
impl SessionSnapshot {
    pub(crate) fn empty_for_tests() -> Self {
        use crate::clock::SiderealReading;
        use chrono::{TimeZone, Utc};

        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SessionSnapshot {
            observer: None,
            frame: None,
            timezone: None,
            clock: ClockState {
                instant,
                manual_offset_minutes: 0,
                timezone: "UTC".into(),
                latitude: 0.0,
                longitude: 0.0,
                mode: ClockMode::Live,
            },
            readings: ClockReadings {
                utc: instant,
                solar: None,
                sidereal: SiderealReading {
                    hours: 0.0,
                    time_of_day: instant.naive_utc(),
                },
            },
            mode: ClockMode::Live,
            planets: Vec::new(),
            moon: None,
            sun_moon_times: SunMoonTimes::default(),
            eclipses: Vec::new(),
            gps_tracking: false,
            last_error: None,
        }
    }
}
