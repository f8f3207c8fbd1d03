mod common;

use chrono::Duration;
use skyclock::clock::{Clock, ClockMode};
use skyclock::Ephemeris;

use crate::common::{utc, ManualWallClock};

#[test]
fn test_solar_time_near_utc_at_greenwich() {
    // Sample the whole year: |EoT| never exceeds ~16.5 min
    for month in 1..=12 {
        let instant = utc(2025, month, 15, 9, 30);
        let wall = ManualWallClock::at(instant);
        let clock = Clock::new(wall, Ephemeris::default());

        let solar = clock.solar_time().unwrap();
        let drift = (solar - instant.naive_utc()).num_seconds().abs();
        assert!(drift <= 20 * 60, "month {month}: {drift} s");
    }
}

#[test]
fn test_solar_time_one_hour_east() {
    let instant = utc(2025, 6, 1, 12, 0);
    let mut clock = Clock::new(ManualWallClock::at(instant), Ephemeris::default());
    clock.set_location(0.0, 15.0);

    let solar = clock.solar_time().unwrap();
    let expected = instant.naive_utc() + Duration::hours(1);
    assert!((solar - expected).num_minutes().abs() <= 20);
}

#[test]
fn test_live_clock_never_goes_backward() {
    let wall = ManualWallClock::at(utc(2025, 6, 1, 0, 0));
    let mut clock = Clock::new(wall.clone(), Ephemeris::default());

    let mut previous = clock.instant();
    let steps = [1, 1, -5, 2, 0, -1, 3];
    for step in steps {
        wall.advance(Duration::seconds(step));
        clock.tick();
        assert!(clock.instant() >= previous);
        previous = clock.instant();
    }
    assert_eq!(clock.mode(), ClockMode::Live);
}

#[test]
fn test_readings_share_one_instant() {
    let instant = utc(2024, 12, 21, 18, 0);
    let mut clock = Clock::new(ManualWallClock::at(instant), Ephemeris::default());
    clock.set_location(51.4779, -0.0015);
    clock.set_timezone("Europe/London");

    let readings = clock.readings();
    assert_eq!(readings.utc, instant);
    assert!(readings.solar.is_some());
    assert!((0.0..24.0).contains(&readings.sidereal.hours));
    assert_eq!(clock.state().timezone, "Europe/London");
}
