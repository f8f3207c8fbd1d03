mod common;

use approx::assert_abs_diff_eq;
use chrono::{FixedOffset, TimeZone};
use skyclock::ephemeris::moon::illumination_percent;
use skyclock::ephemeris::{EclipseType, PhaseName};
use skyclock::{Body, Ephemeris, Observer};

use crate::common::{assert_close_minutes, assert_horizontal_in_range, utc};

fn greenwich() -> Observer {
    Observer::new(51.4779, -0.0015, 46.0).unwrap()
}

#[test]
fn test_planet_positions_are_pure_and_in_range() {
    let ephem = Ephemeris::default();
    let observer = Observer::new(-33.8688, 151.2093, 58.0).unwrap();

    for hour in [0, 6, 12, 18] {
        let instant = utc(2026, 2, 14, hour, 0);
        let first = ephem.planetary_positions(&instant, &observer);
        assert_eq!(first.len(), 7);
        first.iter().for_each(assert_horizontal_in_range);
        assert_eq!(first, ephem.planetary_positions(&instant, &observer));
    }
}

#[test]
fn test_jupiter_is_the_brightest_outer_planet() {
    let ephem = Ephemeris::default();
    let instant = utc(2025, 1, 10, 22, 0);
    let positions = ephem.planetary_positions(&instant, &greenwich());

    let magnitude = |body: Body| {
        positions
            .iter()
            .find(|p| p.body == body)
            .map(|p| p.magnitude)
            .unwrap()
    };
    assert!(magnitude(Body::Jupiter) < magnitude(Body::Saturn));
    assert!(magnitude(Body::Saturn) < magnitude(Body::Uranus));
    assert!(magnitude(Body::Uranus) < magnitude(Body::Neptune));
}

#[test]
fn test_moon_phase_follows_cosine_law() {
    let ephem = Ephemeris::default();
    let start = utc(2025, 1, 1, 0, 0);
    for day in 0..30 {
        let instant = start + chrono::Duration::days(day);
        let moon = ephem.moon_phase(&instant).unwrap();
        assert!((0.0..1.0).contains(&moon.phase));
        assert_abs_diff_eq!(moon.illumination, illumination_percent(moon.phase), epsilon = 1e-9);
        assert_eq!(moon.phase_name, PhaseName::from_phase(moon.phase));
        assert!(moon.age_days >= 0.0 && moon.age_days < 30.0);
        assert!(moon.next_new_moon > instant && moon.next_full_moon > instant);
    }
}

#[test]
fn test_full_moon_of_march_2025() {
    // Full moon 2025-03-14 06:55 UTC, during a total lunar eclipse
    let moon = Ephemeris::default().moon_phase(&utc(2025, 3, 10, 0, 0)).unwrap();
    assert_close_minutes(moon.next_full_moon, utc(2025, 3, 14, 6, 55), 10.0);
}

#[test]
fn test_greenwich_times_in_winter() {
    let ephem = Ephemeris::default();
    let date = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 12, 21, 12, 0, 0)
        .unwrap();
    let times = ephem.sun_moon_times(&date, Some(&greenwich()));

    // Sunrise 08:04, sunset 15:53, noon 11:58 UTC
    assert_close_minutes(times.sunrise.unwrap(), utc(2024, 12, 21, 8, 4), 3.0);
    assert_close_minutes(times.sunset.unwrap(), utc(2024, 12, 21, 15, 53), 3.0);
    assert_close_minutes(times.solar_noon.unwrap(), utc(2024, 12, 21, 11, 58), 2.0);

    let astro_dawn = times.astronomical_dawn.unwrap();
    let nautical_dawn = times.nautical_dawn.unwrap();
    let civil_dawn = times.civil_dawn.unwrap();
    assert!(astro_dawn < nautical_dawn && nautical_dawn < civil_dawn);

    let civil_dusk = times.civil_dusk.unwrap();
    let nautical_dusk = times.nautical_dusk.unwrap();
    let astro_dusk = times.astronomical_dusk.unwrap();
    assert!(civil_dusk < nautical_dusk && nautical_dusk < astro_dusk);
}

#[test]
fn test_brief_civil_twilight_dip_is_reported() {
    // Civil day starting at 12:00 UTC; the Sun spends ~43 min below −6° after midnight
    let ephem = Ephemeris::default();
    let observer = Observer::new(60.45, -7.5, 0.0).unwrap();
    let date = FixedOffset::west_opt(12 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 20, 18, 0, 0)
        .unwrap();
    let times = ephem.sun_moon_times(&date, Some(&observer));

    assert_close_minutes(times.civil_dusk.unwrap(), utc(2024, 6, 21, 0, 11), 3.0);
    assert_close_minutes(times.civil_dawn.unwrap(), utc(2024, 6, 21, 0, 54), 3.0);
    assert!(times.nautical_dusk.is_none() && times.nautical_dawn.is_none());
    assert!(times.sunset.unwrap() < times.civil_dusk.unwrap());
}

#[test]
fn test_eclipse_window_of_two_years() {
    let ephem = Ephemeris::default();
    let events = ephem.upcoming_eclipses(&utc(2025, 1, 1, 0, 0), Some(&greenwich()), 730.0);

    // 2025: 2 lunar + 2 solar, 2026: 2 lunar + 2 solar
    assert_eq!(events.len(), 8);
    assert!(events.windows(2).all(|w| w[0].peak < w[1].peak));
    assert_eq!(events.iter().filter(|e| e.eclipse_type == EclipseType::Lunar).count(), 4);
    for event in &events {
        assert!((0.0..=1.0).contains(&event.magnitude), "{event:?}");
    }

    // The 2026-08-12 total solar eclipse is partial but well visible from London
    let august = events
        .iter()
        .find(|e| e.eclipse_type == EclipseType::Solar && e.peak.format("%Y-%m").to_string() == "2026-08")
        .unwrap();
    assert!(august.is_visible);
    assert!(august.magnitude > 0.7);
}

#[test]
fn test_coordinate_conversion_of_the_sun() {
    let ephem = Ephemeris::default();
    let instant = utc(2025, 4, 1, 10, 0);
    let observer = greenwich();

    let sun = ephem.astronomical_position(Body::Sun, &instant, &observer).unwrap();
    let converted = ephem.coordinate_conversion(sun.right_ascension, sun.declination, &instant, &observer);

    assert_abs_diff_eq!(converted.horizontal.altitude, sun.altitude, epsilon = 1e-6);
    assert_abs_diff_eq!(converted.horizontal.azimuth, sun.azimuth, epsilon = 1e-6);
    assert!((-90.0..=90.0).contains(&converted.galactic.latitude));
}
