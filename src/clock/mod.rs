//! # Clock: one logical instant, three readings
//!
//! [`Clock`] keeps a single "current instant" and derives from it:
//!
//! 1. **UTC**, the instant itself.
//! 2. **Apparent solar time**: UTC + longitude/15 h + equation of time.
//! 3. **Local sidereal time**: Greenwich apparent sidereal time + longitude/15 h,
//!    wrapped into [0, 24) hours and rendered as a time of day.
//!
//! ## Modes
//!
//! - [`ClockMode::Live`]: [`Clock::tick`] moves the instant to the wall clock
//!   plus the manual offset. Ticks never move the instant backward.
//! - [`ClockMode::TimeTravel`]: the instant is pinned by [`Clock::set_time`],
//!   [`Clock::jump_to_time`] or [`Clock::jump_by`]; ticks leave it alone.
//!
//! Longitudes are east-positive. [`Clock::set_location`] stores raw values
//! without range validation; requesting a coordinate frame is where ranges
//! are checked.
//!
//! The wall clock is injected through [`WallClock`] so that tests can drive it.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::constants::{Degree, Hours};
use crate::ephem_source::normalize_hours;
use crate::ephemeris::Ephemeris;
use crate::skyclock_errors::SkyclockError;
use crate::time::{add_days, time_of_day};

/// Source of the current wall-clock time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockMode {
    Live,
    TimeTravel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockState {
    pub instant: DateTime<Utc>,
    pub manual_offset_minutes: i64,
    /// Display label only, never used in computations.
    pub timezone: String,
    pub latitude: Degree,
    pub longitude: Degree,
    pub mode: ClockMode,
}

/// Local sidereal time as a wrapped hour value and as a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiderealReading {
    pub hours: Hours,
    /// `hours` anchored at midnight of the current local calendar day.
    pub time_of_day: NaiveDateTime,
}

/// All readings of the clock at its current instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockReadings {
    pub utc: DateTime<Utc>,
    /// `None` when the equation of time cannot be evaluated.
    pub solar: Option<NaiveDateTime>,
    pub sidereal: SiderealReading,
}

pub struct Clock {
    state: ClockState,
    wall: Arc<dyn WallClock>,
    ephemeris: Ephemeris,
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock").field("state", &self.state).finish_non_exhaustive()
    }
}

impl Clock {
    /// A live clock at the wall-clock time, located at (0°, 0°) and labeled `UTC`.
    pub fn new(wall: Arc<dyn WallClock>, ephemeris: Ephemeris) -> Self {
        let state = ClockState {
            instant: wall.now(),
            manual_offset_minutes: 0,
            timezone: "UTC".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            mode: ClockMode::Live,
        };
        Clock {
            state,
            wall,
            ephemeris,
        }
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    pub fn mode(&self) -> ClockMode {
        self.state.mode
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.state.instant
    }

    fn live_instant(&self) -> DateTime<Utc> {
        self.wall.now() + Duration::minutes(self.state.manual_offset_minutes)
    }

    /// Advance a live clock to the wall clock plus the manual offset.
    ///
    /// Return
    /// ----------
    /// * `true` when the instant moved. Time-travel clocks never move here,
    ///   and a wall clock stepping backward leaves the instant unchanged.
    pub fn tick(&mut self) -> bool {
        if self.state.mode != ClockMode::Live {
            return false;
        }
        let next = self.live_instant();
        if next > self.state.instant {
            self.state.instant = next;
            true
        } else {
            false
        }
    }

    /// Set the manual offset applied on top of the wall clock.
    ///
    /// In live mode the instant is re-derived at once, which may move it backward.
    pub fn set_offset(&mut self, minutes: i64) {
        self.state.manual_offset_minutes = minutes;
        if self.state.mode == ClockMode::Live {
            self.state.instant = self.live_instant();
        }
    }

    pub fn set_location(&mut self, latitude: Degree, longitude: Degree) {
        self.state.latitude = latitude;
        self.state.longitude = longitude;
    }

    pub fn set_timezone(&mut self, name: impl Into<String>) {
        self.state.timezone = name.into();
    }

    /// Pin the instant and switch to time-travel mode.
    pub fn set_time(&mut self, instant: DateTime<Utc>) {
        self.state.instant = instant;
        self.state.mode = ClockMode::TimeTravel;
    }

    pub fn jump_to_time(&mut self, instant: DateTime<Utc>) {
        self.set_time(instant);
    }

    /// Pin the instant `delta` away from the current one.
    pub fn jump_by(&mut self, delta: Duration) {
        let target = self.state.instant + delta;
        self.set_time(target);
    }

    /// Back to live mode at the wall clock plus the manual offset.
    pub fn reset_to_now(&mut self) {
        self.state.mode = ClockMode::Live;
        self.state.instant = self.live_instant();
    }

    /// Local calendar day, taken from local mean time at the clock's longitude.
    fn local_date(&self) -> NaiveDate {
        add_days(&self.state.instant, self.state.longitude / 360.0).date_naive()
    }

    /// Apparent solar time at the clock's longitude.
    ///
    /// Errors
    /// ----------
    /// * When the ephemeris cannot give the Sun's position for the equation of time.
    pub fn solar_time(&self) -> Result<NaiveDateTime, SkyclockError> {
        let equation = self.ephemeris.equation_of_time(&self.state.instant)?;
        let shift_minutes = self.state.longitude * 4.0 + equation;
        Ok(add_days(&self.state.instant, shift_minutes / 1440.0).naive_utc())
    }

    /// Local sidereal time at the clock's longitude.
    pub fn sidereal_time(&self) -> SiderealReading {
        let gast = self.ephemeris.greenwich_sidereal_time(&self.state.instant);
        let hours = normalize_hours(gast + self.state.longitude / 15.0);
        SiderealReading {
            hours,
            time_of_day: time_of_day(self.local_date(), hours),
        }
    }

    pub fn readings(&self) -> ClockReadings {
        ClockReadings {
            utc: self.state.instant,
            solar: self.solar_time().ok(),
            sidereal: self.sidereal_time(),
        }
    }
}
