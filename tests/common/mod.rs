#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use approx::assert_abs_diff_eq;
use chrono::{DateTime, TimeZone, Utc};
use skyclock::clock::WallClock;
use skyclock::ephemeris::CelestialBodyPosition;
use skyclock::geolocation::GeolocationProvider;
use skyclock::session::{EventKind, ObservationSession, SessionEvent, SessionParams};
use skyclock::Ephemeris;

/// Wall clock moved by hand, for deterministic live-mode tests.
pub struct ManualWallClock(Mutex<DateTime<Utc>>);

impl ManualWallClock {
    pub fn at(instant: DateTime<Utc>) -> Arc<Self> {
        Arc::new(ManualWallClock(Mutex::new(instant)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Route `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Short search window so that session tests stay fast.
pub fn fast_params() -> SessionParams {
    SessionParams::builder()
        .eclipse_search_days(200.0)
        .geolocation_timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn session_at(
    instant: DateTime<Utc>,
    geolocation: Arc<dyn GeolocationProvider>,
) -> (ObservationSession, Arc<ManualWallClock>) {
    init_logger();
    let wall = ManualWallClock::at(instant);
    let session = ObservationSession::new(fast_params(), Ephemeris::default(), geolocation, wall.clone());
    (session, wall)
}

/// Handler recording the kind of every event it receives.
pub fn recorder() -> (Arc<Mutex<Vec<EventKind>>>, impl Fn(&SessionEvent) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event: &SessionEvent| sink.lock().unwrap().push(event.kind))
}

pub fn assert_horizontal_in_range(position: &CelestialBodyPosition) {
    assert!((-90.0..=90.0).contains(&position.altitude), "{position:?}");
    assert!((0.0..360.0).contains(&position.azimuth), "{position:?}");
    assert_eq!(position.is_visible, position.altitude > 0.0);
}

pub fn assert_close_minutes(a: DateTime<Utc>, b: DateTime<Utc>, minutes: f64) {
    let diff = (a - b).num_seconds() as f64 / 60.0;
    assert_abs_diff_eq!(diff, 0.0, epsilon = minutes);
}

/// Wall clock following tokio's (pausable) clock from a fixed UTC origin.
pub struct TokioWallClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioWallClock {
    pub fn at(origin: DateTime<Utc>) -> Arc<Self> {
        Arc::new(TokioWallClock {
            origin,
            started: tokio::time::Instant::now(),
        })
    }
}

impl WallClock for TokioWallClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap();
        self.origin + elapsed
    }
}
