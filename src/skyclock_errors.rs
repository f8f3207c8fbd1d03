use thiserror::Error;

use crate::geolocation::GeolocationError;

#[derive(Error, Debug)]
pub enum SkyclockError {
    #[error("Latitude must be between -90 and 90 degrees, got {0}")]
    InvalidLatitude(f64),

    #[error("Longitude must be between -180 and 180 degrees, got {0}")]
    InvalidLongitude(f64),

    #[error("Coordinate value is NaN")]
    NotANumber,

    #[error("Location not set")]
    LocationNotSet,

    #[error("Geolocation failed: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Ephemeris data unavailable: {0}")]
    EphemerisUnavailable(String),

    /// The searched function produced a non-finite value.
    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Invalid session parameter: {0}")]
    InvalidSessionParameter(String),

    #[error("Observation session has been shut down")]
    SessionClosed,
}

impl From<ordered_float::FloatIsNan> for SkyclockError {
    fn from(_: ordered_float::FloatIsNan) -> Self {
        SkyclockError::NotANumber
    }
}

impl SkyclockError {
    /// True for input-validation failures (out-of-range or NaN coordinates).
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            SkyclockError::InvalidLatitude(_)
                | SkyclockError::InvalidLongitude(_)
                | SkyclockError::NotANumber
        )
    }
}

impl PartialEq for SkyclockError {
    fn eq(&self, other: &Self) -> bool {
        use SkyclockError::*;
        match (self, other) {
            (InvalidLatitude(a), InvalidLatitude(b)) => a == b,
            (InvalidLongitude(a), InvalidLongitude(b)) => a == b,
            (Geolocation(a), Geolocation(b)) => a == b,
            (EphemerisUnavailable(a), EphemerisUnavailable(b)) => a == b,
            (SearchFailed(a), SearchFailed(b)) => a == b,
            (InvalidSessionParameter(a), InvalidSessionParameter(b)) => a == b,

            (NotANumber, NotANumber) => true,
            (LocationNotSet, LocationNotSet) => true,
            (SessionClosed, SessionClosed) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod skyclock_errors_test {
    use super::*;

    #[test]
    fn test_location_not_set_message() {
        assert_eq!(SkyclockError::LocationNotSet.to_string(), "Location not set");
    }

    #[test]
    fn test_range_error_classification() {
        assert!(SkyclockError::InvalidLatitude(91.0).is_range_error());
        assert!(SkyclockError::InvalidLongitude(-181.0).is_range_error());
        assert!(!SkyclockError::LocationNotSet.is_range_error());
    }

    #[test]
    fn test_from_float_is_nan() {
        let err: SkyclockError = ordered_float::FloatIsNan.into();
        assert_eq!(err, SkyclockError::NotANumber);
    }
}
