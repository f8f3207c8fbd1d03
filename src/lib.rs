//! # Skyclock
//!
//! Observer-centric sky clock: where the observer stands, what time it is in
//! several senses, and what the sky looks like from there.
//!
//! ## Subsystems
//!
//! - [`geodesy`]: validated [`Observer`], WGS84 ECEF and UTM frames, and a
//!   longitude-based timezone estimate.
//! - [`clock`]: UTC, apparent solar and local sidereal readings, with live and
//!   time-travel modes.
//! - [`ephemeris`]: planets, Moon phase, rise/set and twilight, coordinate
//!   conversions and upcoming eclipses, on top of an
//!   [`ephem_source::EphemerisSource`] (VSOP87 and ELP-2000/82 by default).
//! - [`session`]: [`ObservationSession`] ties the three together, drives the
//!   periodic refreshes on tokio and notifies subscribers of every change.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skyclock::geolocation::UnavailableGeolocation;
//! use skyclock::{Body, ObservationSession, SessionParams};
//!
//! let session =
//!     ObservationSession::with_system_clock(SessionParams::default(), Arc::new(UnavailableGeolocation));
//! session.set_location(48.8566, 2.3522, 35.0)?;
//! let mars = session.astronomical_position(Body::Mars)?;
//! println!("Mars at {:.1}° altitude", mars.altitude);
//! # Ok::<(), skyclock::SkyclockError>(())
//! ```

pub mod clock;
pub mod constants;
pub mod earth_orientation;
pub mod ephem_source;
pub mod ephemeris;
pub mod geodesy;
pub mod geolocation;
pub mod session;
pub mod skyclock_errors;
pub mod time;

pub use ephem_source::Body;
pub use ephemeris::Ephemeris;
pub use geodesy::Observer;
pub use session::{ObservationSession, SessionParams};
pub use skyclock_errors::SkyclockError;
