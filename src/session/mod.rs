//! # Observation session
//!
//! [`ObservationSession`] ties the [`Clock`], the geodesy of the current
//! [`Observer`] and the [`Ephemeris`] together under one mutable aggregate, and
//! publishes every mutation as a [`SessionEvent`] carrying an immutable
//! [`SessionSnapshot`].
//!
//! ## Lifecycle
//!
//! 1. Construct with [`ObservationSession::new`] (or
//!    [`ObservationSession::with_system_clock`]). The Moon phase is computed at once.
//! 2. [`start`](ObservationSession::start) spawns the periodic tasks on the
//!    current tokio runtime, one per [`TimerKind`]:
//!    - `Clock` ticks every `clock_interval` (only when `start_live` is set),
//!    - `Astronomy` refreshes planets, Moon and rise/set every `astronomy_interval`,
//!    - `Eclipses` rescans immediately, then every `eclipse_interval`.
//! 3. [`shutdown`](ObservationSession::shutdown) cancels every task and the GPS
//!    watch, drops all subscribers and rejects further mutations with
//!    [`SkyclockError::SessionClosed`].
//!
//! ## Modes
//!
//! Any explicit [`set_time`](ObservationSession::set_time) (or jump) moves the
//! clock to time travel; [`reset_to_now`](ObservationSession::reset_to_now)
//! brings it back to live. Both recompute astronomy and eclipses for the new instant.
//!
//! ## Dispatch
//!
//! Each mutation is applied, the snapshot is built and all handlers run in
//! registration order, all while the session lock is held. Subscribers
//! therefore never see a half-updated aggregate and events are never
//! interleaved. The flip side: a handler must not call back into the session,
//! or it will deadlock. Handlers get everything they need in the event.
//!
//! Concurrent `set_location` calls are last-write-wins. A GPS fix arriving
//! after a manual entry replaces it.

pub mod bus;
pub mod params;
pub mod snapshot;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::clock::{Clock, ClockMode, SystemWallClock, WallClock};
use crate::ephem_source::Body;
use crate::ephemeris::{CelestialBodyPosition, EclipseEvent, Ephemeris, MoonPhase, SunMoonTimes};
use crate::geodesy::timezone::{estimate_timezone_at, TimezoneEstimate};
use crate::geodesy::{CoordinateFrame, Observer};
use crate::geolocation::{GeolocationError, GeolocationProvider, PositionFix};
use crate::skyclock_errors::SkyclockError;

pub use bus::{EventBus, Subscription};
pub use params::{SessionParams, SessionParamsBuilder};
pub use snapshot::{EventKind, SessionEvent, SessionSnapshot};

/// Independently cancellable periodic tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Clock,
    Astronomy,
    Eclipses,
}

struct SessionState {
    clock: Clock,
    observer: Option<Observer>,
    frame: Option<CoordinateFrame>,
    timezone: Option<TimezoneEstimate>,
    planets: Vec<CelestialBodyPosition>,
    moon: Option<MoonPhase>,
    sun_moon_times: SunMoonTimes,
    eclipses: Vec<EclipseEvent>,
    gps_tracking: bool,
    last_error: Option<String>,
    closed: bool,
    timers: HashMap<TimerKind, JoinHandle<()>>,
    gps_watch: Option<JoinHandle<()>>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            observer: self.observer.clone(),
            frame: self.frame,
            timezone: self.timezone.clone(),
            clock: self.clock.state().clone(),
            readings: self.clock.readings(),
            mode: self.clock.mode(),
            planets: self.planets.clone(),
            moon: self.moon.clone(),
            sun_moon_times: self.sun_moon_times.clone(),
            eclipses: self.eclipses.clone(),
            gps_tracking: self.gps_tracking,
            last_error: self.last_error.clone(),
        }
    }

    /// Civil offset used to pick the local day for rise/set searches.
    fn civil_offset(&self) -> FixedOffset {
        self.timezone
            .as_ref()
            .and_then(|tz| FixedOffset::east_opt(tz.offset_minutes * 60))
            .unwrap_or_else(|| Utc.fix())
    }
}

struct Inner {
    state: Mutex<SessionState>,
    bus: Arc<EventBus>,
    params: SessionParams,
    ephemeris: Ephemeris,
    geolocation: Arc<dyn GeolocationProvider>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_astronomy(&self, state: &mut SessionState) {
        let instant = state.clock.instant();

        state.planets = state
            .observer
            .as_ref()
            .map(|observer| self.ephemeris.planetary_positions(&instant, observer))
            .unwrap_or_default();

        state.moon = match self.ephemeris.moon_phase(&instant) {
            Ok(moon) => Some(moon),
            Err(err) => {
                warn!("Moon phase unavailable at {instant}: {err}");
                None
            }
        };

        let local = instant.with_timezone(&state.civil_offset());
        state.sun_moon_times = self
            .ephemeris
            .sun_moon_times(&local, state.observer.as_ref());
    }

    fn refresh_eclipses(&self, state: &mut SessionState) {
        let instant = state.clock.instant();
        state.eclipses = self.ephemeris.upcoming_eclipses(
            &instant,
            state.observer.as_ref(),
            self.params.eclipse_search_days,
        );
        debug!("Eclipse rescan from {instant}: {} events", state.eclipses.len());
    }

    /// Install a new observer and everything derived from it.
    fn apply_observer(&self, state: &mut SessionState, observer: Observer) {
        let timezone = estimate_timezone_at(
            observer.latitude(),
            observer.longitude(),
            &state.clock.instant(),
        );
        state
            .clock
            .set_location(observer.latitude(), observer.longitude());
        state.clock.set_timezone(timezone.name.clone());
        state.frame = Some(observer.frame());
        state.timezone = Some(timezone);
        state.observer = Some(observer);

        self.refresh_astronomy(state);
        self.refresh_eclipses(state);
    }
}

/// Cloneable handle on one observation session.
#[derive(Clone)]
pub struct ObservationSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ObservationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationSession")
            .field("params", &self.inner.params)
            .field("subscribers", &self.inner.bus.len())
            .finish_non_exhaustive()
    }
}

impl ObservationSession {
    /// Create a session with no observer, in live mode at `wall.now()`.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: refresh cadences, eclipse window and geolocation timeout.
    /// * `ephemeris`: façade over the ephemeris collaborator.
    /// * `geolocation`: device used by GPS tracking and [`locate_once`](Self::locate_once).
    /// * `wall`: wall clock driving live mode.
    pub fn new(
        params: SessionParams,
        ephemeris: Ephemeris,
        geolocation: Arc<dyn GeolocationProvider>,
        wall: Arc<dyn WallClock>,
    ) -> Self {
        let inner = Inner {
            state: Mutex::new(SessionState {
                clock: Clock::new(wall, ephemeris.clone()),
                observer: None,
                frame: None,
                timezone: None,
                planets: Vec::new(),
                moon: None,
                sun_moon_times: SunMoonTimes::default(),
                eclipses: Vec::new(),
                gps_tracking: false,
                last_error: None,
                closed: false,
                timers: HashMap::new(),
                gps_watch: None,
            }),
            bus: Arc::new(EventBus::new()),
            params,
            ephemeris,
            geolocation,
        };
        {
            let mut state = inner.lock();
            inner.refresh_astronomy(&mut state);
        }

        ObservationSession {
            inner: Arc::new(inner),
        }
    }

    /// Session on the operating system clock and the built-in ephemeris.
    pub fn with_system_clock(
        params: SessionParams,
        geolocation: Arc<dyn GeolocationProvider>,
    ) -> Self {
        Self::new(
            params,
            Ephemeris::default(),
            geolocation,
            Arc::new(SystemWallClock),
        )
    }

    pub fn params(&self) -> &SessionParams {
        &self.inner.params
    }

    pub fn ephemeris(&self) -> &Ephemeris {
        &self.inner.ephemeris
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Current aggregate. Still available after shutdown.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    /// Apply `change` under the lock, then broadcast `kind` (or the kind
    /// returned by `change`, when it picks one).
    fn mutate<F, R>(&self, kind: EventKind, change: F) -> Result<R, SkyclockError>
    where
        F: FnOnce(&Inner, &mut SessionState) -> Result<(R, Option<EventKind>), SkyclockError>,
    {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(SkyclockError::SessionClosed);
        }
        let (result, picked) = change(&self.inner, &mut state)?;
        let event = SessionEvent {
            kind: picked.unwrap_or(kind),
            snapshot: Arc::new(state.snapshot()),
        };
        self.inner.bus.dispatch(&event);
        Ok(result)
    }

    /// Register a handler.
    ///
    /// The handler is called once right away with [`EventKind::Subscribed`] and
    /// the current snapshot, then after every mutation until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::SessionClosed`] after shutdown.
    pub fn subscribe<F>(&self, handler: F) -> Result<Subscription, SkyclockError>
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let state = self.inner.lock();
        if state.closed {
            return Err(SkyclockError::SessionClosed);
        }
        let handler: bus::Handler = Arc::new(handler);
        handler(&SessionEvent {
            kind: EventKind::Subscribed,
            snapshot: Arc::new(state.snapshot()),
        });
        let id = self.inner.bus.register(handler);
        Ok(Subscription::new(id, &self.inner.bus))
    }

    /// Set the observer from manual coordinates.
    ///
    /// Errors
    /// ----------
    /// * Range errors from [`Observer::new`]; the session is left untouched.
    pub fn set_location(
        &self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
    ) -> Result<(), SkyclockError> {
        let observer = Observer::new(latitude, longitude, altitude)?;
        self.mutate(EventKind::LocationChanged, |inner, state| {
            inner.apply_observer(state, observer);
            Ok(((), None))
        })
    }

    fn apply_fix(&self, fix: &PositionFix) -> Result<Observer, SkyclockError> {
        let observer = Observer::from_fix(fix)?;
        self.mutate(EventKind::LocationChanged, |inner, state| {
            inner.apply_observer(state, observer.clone());
            state.last_error = None;
            Ok((observer, None))
        })
    }

    fn report_geolocation_error(&self, error: GeolocationError) -> Result<(), SkyclockError> {
        warn!("Geolocation failed: {error}");
        self.mutate(EventKind::GeolocationFailed(error), |_, state| {
            state.last_error = Some(error.to_string());
            Ok(((), None))
        })
    }

    pub fn set_offset(&self, minutes: i64) -> Result<(), SkyclockError> {
        self.mutate(EventKind::OffsetChanged, |_, state| {
            state.clock.set_offset(minutes);
            Ok(((), None))
        })
    }

    /// Replace the timezone label shown by the clock. Offsets are not recomputed.
    pub fn set_timezone(&self, name: &str) -> Result<(), SkyclockError> {
        self.mutate(EventKind::TimezoneChanged, |_, state| {
            state.clock.set_timezone(name);
            Ok(((), None))
        })
    }

    fn travel<F>(&self, move_clock: F) -> Result<(), SkyclockError>
    where
        F: FnOnce(&mut Clock),
    {
        self.mutate(EventKind::TimeChanged, |inner, state| {
            let before = state.clock.mode();
            move_clock(&mut state.clock);
            inner.refresh_astronomy(state);
            inner.refresh_eclipses(state);

            let after = state.clock.mode();
            if before != after {
                info!("Clock mode {before:?} -> {after:?} at {}", state.clock.instant());
                Ok(((), Some(EventKind::ModeChanged)))
            } else {
                Ok(((), None))
            }
        })
    }

    /// Pin the session to `instant` (time travel).
    pub fn set_time(&self, instant: DateTime<Utc>) -> Result<(), SkyclockError> {
        self.travel(|clock| clock.set_time(instant))
    }

    pub fn jump_to_time(&self, instant: DateTime<Utc>) -> Result<(), SkyclockError> {
        self.travel(|clock| clock.jump_to_time(instant))
    }

    pub fn jump_by(&self, delta: chrono::Duration) -> Result<(), SkyclockError> {
        self.travel(|clock| clock.jump_by(delta))
    }

    /// Return to live mode at the wall clock.
    pub fn reset_to_now(&self) -> Result<(), SkyclockError> {
        self.travel(Clock::reset_to_now)
    }

    /// One live clock step. Broadcasts only when the instant moved.
    pub fn tick(&self) -> Result<bool, SkyclockError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(SkyclockError::SessionClosed);
        }
        let moved = state.clock.tick();
        if moved {
            let event = SessionEvent {
                kind: EventKind::ClockTick,
                snapshot: Arc::new(state.snapshot()),
            };
            self.inner.bus.dispatch(&event);
        }
        Ok(moved)
    }

    /// Recompute planets, Moon phase and rise/set times at the current instant.
    pub fn refresh_astronomy(&self) -> Result<(), SkyclockError> {
        self.mutate(EventKind::AstronomyRefreshed, |inner, state| {
            inner.refresh_astronomy(state);
            Ok(((), None))
        })
    }

    /// Rescan eclipses over `eclipse_search_days` from the current instant.
    pub fn refresh_eclipses(&self) -> Result<(), SkyclockError> {
        self.mutate(EventKind::EclipsesRefreshed, |inner, state| {
            inner.refresh_eclipses(state);
            Ok(((), None))
        })
    }

    /// Position of one body for the current observer and instant.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::LocationNotSet`] when no observer has been set.
    /// * [`SkyclockError::SessionClosed`] after shutdown.
    /// * Errors of the ephemeris collaborator.
    pub fn astronomical_position(&self, body: Body) -> Result<CelestialBodyPosition, SkyclockError> {
        let state = self.inner.lock();
        if state.closed {
            return Err(SkyclockError::SessionClosed);
        }
        let observer = state.observer.as_ref().ok_or(SkyclockError::LocationNotSet)?;
        self.inner
            .ephemeris
            .astronomical_position(body, &state.clock.instant(), observer)
    }

    /// Spawn the periodic tasks on the current tokio runtime.
    ///
    /// Calling it again restarts every task.
    ///
    /// # Errors
    /// * [`SkyclockError::InvalidSessionParameter`] when the parameters break a rule of
    ///   [`SessionParams::validate`]; nothing is spawned.
    /// * [`SkyclockError::SessionClosed`] after shutdown.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn start(&self) -> Result<(), SkyclockError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(SkyclockError::SessionClosed);
        }
        self.inner.params.validate()?;
        for (_, handle) in state.timers.drain() {
            handle.abort();
        }

        let params = &self.inner.params;
        let mut plan = vec![
            (TimerKind::Astronomy, params.astronomy_interval, false),
            (TimerKind::Eclipses, params.eclipse_interval, true),
        ];
        if params.start_live {
            plan.insert(0, (TimerKind::Clock, params.clock_interval, false));
        }

        for (kind, period, immediate) in plan {
            debug!("Starting {kind:?} timer every {period:?}");
            let handle = self.spawn_timer(kind, period, immediate);
            state.timers.insert(kind, handle);
        }
        info!("Observation session started");
        Ok(())
    }

    fn spawn_timer(&self, kind: TimerKind, period: std::time::Duration, immediate: bool) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let first = if immediate { Instant::now() } else { Instant::now() + period };
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let session = ObservationSession { inner };
                let outcome = match kind {
                    TimerKind::Clock => session.tick().map(|_| ()),
                    TimerKind::Astronomy => session.refresh_astronomy(),
                    TimerKind::Eclipses => session.refresh_eclipses(),
                };
                if outcome.is_err() {
                    break;
                }
            }
        })
    }

    /// Cancel one periodic task. Returns `false` when it was not running.
    pub fn cancel_timer(&self, kind: TimerKind) -> bool {
        match self.inner.lock().timers.remove(&kind) {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled {kind:?} timer");
                true
            }
            None => false,
        }
    }

    pub fn is_timer_running(&self, kind: TimerKind) -> bool {
        self.inner
            .lock()
            .timers
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Follow the geolocation device: every fix replaces the observer.
    ///
    /// Device errors are reported as [`EventKind::GeolocationFailed`] events and
    /// keep the watch alive. Enabling while already tracking starts no second watch.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn enable_gps_tracking(&self) -> Result<(), SkyclockError> {
        let weak = Arc::downgrade(&self.inner);
        self.mutate(EventKind::GpsTrackingChanged, |inner, state| {
            if state.gps_tracking {
                return Ok(((), None));
            }
            let mut fixes = inner.geolocation.watch_position();
            let handle = tokio::spawn(async move {
                while let Some(outcome) = fixes.recv().await {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let session = ObservationSession { inner };
                    let applied = match outcome {
                        Ok(fix) => session.apply_fix(&fix).map(|_| ()),
                        Err(err) => session.report_geolocation_error(err),
                    };
                    match applied {
                        Err(SkyclockError::SessionClosed) => return,
                        Err(err) => warn!("Ignoring GPS fix: {err}"),
                        Ok(()) => {}
                    }
                }
                if let Some(inner) = weak.upgrade() {
                    ObservationSession { inner }.watch_ended();
                }
            });
            state.gps_watch = Some(handle);
            state.gps_tracking = true;
            info!("GPS tracking enabled");
            Ok(((), None))
        })
    }

    fn watch_ended(&self) {
        let outcome = self.mutate(EventKind::GpsTrackingChanged, |_, state| {
            state.gps_tracking = false;
            state.gps_watch = None;
            Ok(((), None))
        });
        if outcome.is_ok() {
            info!("GPS watch stream ended");
        }
    }

    /// Stop following the device. The last fix stays as the observer.
    pub fn disable_gps_tracking(&self) -> Result<(), SkyclockError> {
        self.mutate(EventKind::GpsTrackingChanged, |_, state| {
            if let Some(handle) = state.gps_watch.take() {
                handle.abort();
            }
            if state.gps_tracking {
                info!("GPS tracking disabled");
            }
            state.gps_tracking = false;
            Ok(((), None))
        })
    }

    /// Ask the device for one fix and make it the observer.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::Geolocation`] with [`GeolocationError::Timeout`] when no
    ///   answer arrives within `geolocation_timeout`, or the device's own error.
    ///   The failure is also broadcast and kept as `last_error`.
    /// * [`SkyclockError::SessionClosed`] if the session was shut down, even
    ///   while the request was pending; the fix is then discarded.
    pub async fn locate_once(&self) -> Result<Observer, SkyclockError> {
        if self.is_closed() {
            return Err(SkyclockError::SessionClosed);
        }
        let pending = self.inner.geolocation.current_position();
        let outcome = match tokio::time::timeout(self.inner.params.geolocation_timeout, pending).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(GeolocationError::Unavailable),
            Err(_) => Err(GeolocationError::Timeout),
        };

        match outcome {
            Ok(fix) => self.apply_fix(&fix),
            Err(err) => {
                self.report_geolocation_error(err)?;
                Err(err.into())
            }
        }
    }

    /// Tear the session down: cancel timers and the GPS watch, drop all
    /// subscribers. Idempotent; nothing is broadcast.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.gps_tracking = false;
        for (_, handle) in state.timers.drain() {
            handle.abort();
        }
        if let Some(handle) = state.gps_watch.take() {
            handle.abort();
        }
        self.inner.bus.clear();
        info!("Observation session shut down");
    }

    pub fn mode(&self) -> ClockMode {
        self.inner.lock().clock.mode()
    }
}
