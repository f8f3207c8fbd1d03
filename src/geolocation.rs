//! # Geolocation collaborator
//!
//! The observation session never talks to a GPS device directly. It consumes a
//! [`GeolocationProvider`], which exposes a one-shot fix and a continuous watch
//! stream as tokio channels:
//!
//! - [`GeolocationProvider::current_position`] returns a `oneshot::Receiver`
//!   resolving to a single [`PositionFix`] or a [`GeolocationError`].
//! - [`GeolocationProvider::watch_position`] returns an unbounded `mpsc::Receiver`
//!   that yields one item per fix until the provider drops the sender or the
//!   receiver is dropped (which is how a watch is cancelled).
//!
//! Two ready-made providers are included: [`FixedGeolocation`] (a static device,
//! also handy in tests) and [`UnavailableGeolocation`] (a platform without
//! positioning support).

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::constants::{Degree, Meter};

/// A single position report from a geolocation device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFix {
    pub latitude: Degree,
    pub longitude: Degree,
    /// Altitude above the ellipsoid, when the device reports one.
    pub altitude: Option<Meter>,
    /// Horizontal accuracy radius in meters.
    pub accuracy: Option<Meter>,
    pub timestamp: DateTime<Utc>,
}

/// Device or platform failure while acquiring a position.
///
/// Every variant is recoverable: the caller may retry the operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeolocationError {
    #[error("Location permission denied. Allow location access and try again.")]
    PermissionDenied,

    #[error("Location information is unavailable.")]
    Unavailable,

    #[error("The request to get your location timed out.")]
    Timeout,

    #[error("Geolocation is not supported on this platform.")]
    NotSupported,
}

pub type FixResult = Result<PositionFix, GeolocationError>;

/// Source of position fixes.
pub trait GeolocationProvider: Send + Sync {
    /// Request a single fix.
    fn current_position(&self) -> oneshot::Receiver<FixResult>;

    /// Start a continuous watch. Dropping the receiver cancels the watch.
    fn watch_position(&self) -> mpsc::UnboundedReceiver<FixResult>;
}

/// Provider that always reports the same position.
///
/// The watch stream yields the fix once and then stays open, like a device
/// that does not move.
#[derive(Debug, Clone)]
pub struct FixedGeolocation {
    fix: PositionFix,
    hold_open: bool,
}

impl FixedGeolocation {
    pub fn new(latitude: Degree, longitude: Degree, altitude: Option<Meter>) -> Self {
        FixedGeolocation {
            fix: PositionFix {
                latitude,
                longitude,
                altitude,
                accuracy: Some(10.0),
                timestamp: Utc::now(),
            },
            hold_open: true,
        }
    }

    /// Close the watch stream right after the first fix instead of keeping it open.
    pub fn closing_after_first_fix(mut self) -> Self {
        self.hold_open = false;
        self
    }
}

impl GeolocationProvider for FixedGeolocation {
    fn current_position(&self) -> oneshot::Receiver<FixResult> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(PositionFix {
            timestamp: Utc::now(),
            ..self.fix.clone()
        }));
        rx
    }

    fn watch_position(&self) -> mpsc::UnboundedReceiver<FixResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(PositionFix {
            timestamp: Utc::now(),
            ..self.fix.clone()
        }));
        if self.hold_open {
            // Parked until the receiver side goes away.
            tokio::spawn(async move { tx.closed().await });
        }
        rx
    }
}

/// Provider for platforms without any positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGeolocation;

impl GeolocationProvider for UnavailableGeolocation {
    fn current_position(&self) -> oneshot::Receiver<FixResult> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(GeolocationError::NotSupported));
        rx
    }

    fn watch_position(&self) -> mpsc::UnboundedReceiver<FixResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Err(GeolocationError::NotSupported));
        rx
    }
}

#[cfg(test)]
mod geolocation_test {
    use super::*;

    #[tokio::test]
    async fn test_fixed_provider_one_shot() {
        let provider = FixedGeolocation::new(48.85, 2.35, Some(35.0));
        let fix = provider.current_position().await.unwrap().unwrap();
        assert_eq!(fix.latitude, 48.85);
        assert_eq!(fix.longitude, 2.35);
        assert_eq!(fix.altitude, Some(35.0));
    }

    #[tokio::test]
    async fn test_fixed_provider_watch_closing() {
        let provider = FixedGeolocation::new(10.0, 20.0, None).closing_after_first_fix();
        let mut rx = provider.watch_position();
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let err = UnavailableGeolocation
            .current_position()
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err, GeolocationError::NotSupported);
        assert_eq!(
            err.to_string(),
            "Geolocation is not supported on this platform."
        );
    }
}
