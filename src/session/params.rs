//! # Observation session parameters
//!
//! [`SessionParams`] holds the refresh cadence of each data family and the
//! geolocation timeout. Build it through [`SessionParams::builder`]; `build()`
//! rejects zero or NaN intervals.
//!
//! | Parameter | Default | Rule |
//! |---|---|---|
//! | `clock_interval` | 1 s | > 0 |
//! | `astronomy_interval` | 30 s | > 0 |
//! | `eclipse_interval` | 6 h | > 0 |
//! | `eclipse_search_days` | 730 | ≥ 1, finite |
//! | `geolocation_timeout` | 10 s | > 0 |
//! | `start_live` | `true` | |

use std::cmp::Ordering::{Equal, Greater};
use std::fmt;
use std::time::Duration;

use crate::skyclock_errors::SkyclockError;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Live clock tick period.
    pub clock_interval: Duration,
    /// Planets, Moon phase and rise/set refresh period.
    pub astronomy_interval: Duration,
    /// Eclipse rescan period.
    pub eclipse_interval: Duration,
    /// Forward eclipse search window, days.
    pub eclipse_search_days: f64,
    pub geolocation_timeout: Duration,
    /// Whether [`start`](crate::session::ObservationSession::start) spawns the live clock tick.
    pub start_live: bool,
}

impl SessionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent builder starting from the defaults.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use skyclock::session::SessionParams;
    ///
    /// let params = SessionParams::builder()
    ///     .astronomy_interval(Duration::from_secs(60))
    ///     .eclipse_search_days(365.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(params.clock_interval, Duration::from_secs(1));
    /// ```
    pub fn builder() -> SessionParamsBuilder {
        SessionParamsBuilder::new()
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        SessionParams {
            clock_interval: Duration::from_secs(1),
            astronomy_interval: Duration::from_secs(30),
            eclipse_interval: Duration::from_secs(6 * 3600),
            eclipse_search_days: 730.0,
            geolocation_timeout: Duration::from_secs(10),
            start_live: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionParamsBuilder {
    params: SessionParams,
}

impl Default for SessionParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: SessionParams::default(),
        }
    }

    pub fn clock_interval(mut self, v: Duration) -> Self {
        self.params.clock_interval = v;
        self
    }
    pub fn astronomy_interval(mut self, v: Duration) -> Self {
        self.params.astronomy_interval = v;
        self
    }
    pub fn eclipse_interval(mut self, v: Duration) -> Self {
        self.params.eclipse_interval = v;
        self
    }
    pub fn eclipse_search_days(mut self, v: f64) -> Self {
        self.params.eclipse_search_days = v;
        self
    }
    pub fn geolocation_timeout(mut self, v: Duration) -> Self {
        self.params.geolocation_timeout = v;
        self
    }
    pub fn start_live(mut self, v: bool) -> Self {
        self.params.start_live = v;
        self
    }

    /// Return true iff x >= 1.0, finite and comparable.
    #[inline]
    fn ge1(x: f64) -> bool {
        x.is_finite() && matches!(x.partial_cmp(&1.0), Some(Greater) | Some(Equal))
    }

    /// Validate and produce the parameters.
    ///
    /// Errors
    /// ----------
    /// * [`SkyclockError::InvalidSessionParameter`] naming the first offending field.
    pub fn build(self) -> Result<SessionParams, SkyclockError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl SessionParams {
    /// Check every rule of the parameter table.
    ///
    /// Fields are public, so values built by hand are checked again when a
    /// session starts.
    pub fn validate(&self) -> Result<(), SkyclockError> {
        let intervals = [
            ("clock_interval", self.clock_interval),
            ("astronomy_interval", self.astronomy_interval),
            ("eclipse_interval", self.eclipse_interval),
            ("geolocation_timeout", self.geolocation_timeout),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(SkyclockError::InvalidSessionParameter(format!(
                "{name} must be > 0"
            )));
        }

        if !SessionParamsBuilder::ge1(self.eclipse_search_days) {
            return Err(SkyclockError::InvalidSessionParameter(
                "eclipse_search_days must be a finite value >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 40;
            writeln!(f, "Observation Session Parameters")?;
            writeln!(f, "------------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Refresh cadences]")?;
            line!(
                "clock_interval      = {:?}",
                self.clock_interval,
                "Live clock tick"
            )?;
            line!(
                "astronomy_interval  = {:?}",
                self.astronomy_interval,
                "Planets, Moon and rise/set refresh"
            )?;
            line!(
                "eclipse_interval    = {:?}",
                self.eclipse_interval,
                "Eclipse rescan"
            )?;

            writeln!(f, "\n[Searches and devices]")?;
            line!(
                "eclipse_search_days = {:.1} d",
                self.eclipse_search_days,
                "Forward eclipse window"
            )?;
            line!(
                "geolocation_timeout = {:?}",
                self.geolocation_timeout,
                "One-shot fix deadline"
            )?;
            line!("start_live          = {}", self.start_live, "Tick on start")?;

            Ok(())
        } else {
            write!(
                f,
                "SessionParams(clock={:?}, astronomy={:?}, eclipses={:?}, window={:.0}d, gps_timeout={:?}, live={})",
                self.clock_interval,
                self.astronomy_interval,
                self.eclipse_interval,
                self.eclipse_search_days,
                self.geolocation_timeout,
                self.start_live,
            )
        }
    }
}

#[cfg(test)]
mod params_test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SessionParams::builder().build().unwrap();
        assert_eq!(p, SessionParams::default());
        assert_eq!(p.astronomy_interval, Duration::from_secs(30));
        assert_eq!(p.eclipse_interval, Duration::from_secs(21_600));
        assert_eq!(p.eclipse_search_days, 730.0);
        assert!(p.start_live);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = SessionParams::builder()
            .eclipse_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SkyclockError::InvalidSessionParameter("eclipse_interval must be > 0".into())
        );
    }

    #[test]
    fn test_rejects_bad_search_window() {
        for days in [0.5, f64::NAN, f64::INFINITY, -3.0] {
            assert!(SessionParams::builder()
                .eclipse_search_days(days)
                .build()
                .is_err());
        }
    }

    #[test]
    fn test_validate_hand_built_params() {
        let p = SessionParams {
            astronomy_interval: Duration::ZERO,
            ..SessionParams::default()
        };
        assert_eq!(
            p.validate().unwrap_err(),
            SkyclockError::InvalidSessionParameter("astronomy_interval must be > 0".into())
        );
        assert!(SessionParams::default().validate().is_ok());
    }

    #[test]
    fn test_display() {
        let p = SessionParams::default();
        assert_eq!(
            p.to_string(),
            "SessionParams(clock=1s, astronomy=30s, eclipses=21600s, window=730d, gps_timeout=10s, live=true)"
        );
        let table = format!("{p:#}");
        assert!(table.starts_with("Observation Session Parameters"));
        assert!(table.contains("eclipse_search_days = 730.0 d"));
    }
}
