//! Forward search of solar and lunar eclipses over a window of days.
//!
//! Each eclipse type is scanned independently: after an eclipse is found, the
//! cursor moves ten days past its peak and the search resumes. A failing search
//! step ends the scan for that type only, keeping what was already found.

use chrono::{DateTime, Utc};
use hifitime::{Epoch, Unit};
use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::ephem_source::{Body, EclipseKind, LunarEclipseInfo, SolarEclipseInfo};
use crate::ephemeris::Ephemeris;
use crate::geodesy::Observer;
use crate::skyclock_errors::SkyclockError;
use crate::time::{epoch_from_utc, utc_from_epoch};

/// Gap between two eclipses of the same type is always more than a month.
const CURSOR_STEP_DAYS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EclipseType {
    Solar,
    Lunar,
}

impl std::fmt::Display for EclipseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EclipseType::Solar => f.write_str("solar"),
            EclipseType::Lunar => f.write_str("lunar"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EclipseEvent {
    pub eclipse_type: EclipseType,
    pub kind: EclipseKind,
    /// Greatest eclipse, geocentric.
    pub peak: DateTime<Utc>,
    /// Areal obscuration in [0, 1]: umbral coverage of the Moon for lunar
    /// eclipses, solar disc coverage (local when visible, else global) for solar ones.
    pub magnitude: f64,
    pub is_visible: bool,
    /// Local maximum of a solar eclipse seen from the observer.
    pub local_max: Option<DateTime<Utc>>,
    pub duration_minutes: Option<f64>,
}

impl Ephemeris {
    /// Eclipses with a peak within `days` after `start`, sorted by peak.
    ///
    /// Without an observer every event is reported as not visible and solar
    /// events carry no local circumstances.
    pub fn upcoming_eclipses(
        &self,
        start: &DateTime<Utc>,
        observer: Option<&Observer>,
        days: f64,
    ) -> Vec<EclipseEvent> {
        let start = epoch_from_utc(start);
        let end = start + days * Unit::Day;

        let lunar = self.scan(&start, &end, EclipseType::Lunar, |cursor, limit| {
            let found = self.source().search_lunar_eclipse(cursor, limit)?;
            Ok(found.map(|info| (info.peak, self.lunar_event(&info, observer))))
        });
        let solar = self.scan(&start, &end, EclipseType::Solar, |cursor, limit| {
            let found = self.source().search_solar_eclipse(cursor, limit, observer)?;
            Ok(found.map(|info| (info.peak, solar_event(&info))))
        });

        lunar
            .into_iter()
            .merge_by(solar, |a, b| a.peak <= b.peak)
            .collect()
    }

    fn scan<F>(&self, start: &Epoch, end: &Epoch, eclipse_type: EclipseType, mut step: F) -> Vec<EclipseEvent>
    where
        F: FnMut(&Epoch, f64) -> Result<Option<(Epoch, EclipseEvent)>, SkyclockError>,
    {
        let mut events = Vec::new();
        let mut cursor = *start;

        while cursor < *end {
            let limit = (*end - cursor).to_unit(Unit::Day);
            match step(&cursor, limit) {
                Ok(Some((peak, event))) => {
                    events.push(event);
                    cursor = peak + CURSOR_STEP_DAYS * Unit::Day;
                }
                Ok(None) => break,
                Err(err) => {
                    debug!("Stopping {eclipse_type} eclipse search at {cursor}: {err}");
                    break;
                }
            }
        }
        events
    }

    fn lunar_event(&self, info: &LunarEclipseInfo, observer: Option<&Observer>) -> EclipseEvent {
        let is_visible = observer.is_some_and(|observer| {
            self.source()
                .topocentric_position(Body::Moon, &info.peak, observer)
                .map(|moon| moon.altitude > 0.0)
                .unwrap_or_else(|err| {
                    debug!("Moon altitude unavailable at lunar eclipse peak: {err}");
                    false
                })
        });

        EclipseEvent {
            eclipse_type: EclipseType::Lunar,
            kind: info.kind,
            peak: utc_from_epoch(&info.peak),
            magnitude: info.obscuration,
            is_visible,
            local_max: None,
            duration_minutes: info.duration_minutes(),
        }
    }
}

fn solar_event(info: &SolarEclipseInfo) -> EclipseEvent {
    let visible_local = info.local.as_ref().filter(|local| local.is_visible());

    EclipseEvent {
        eclipse_type: EclipseType::Solar,
        kind: info.kind,
        peak: utc_from_epoch(&info.peak),
        magnitude: visible_local.map_or(info.obscuration, |local| local.obscuration),
        is_visible: visible_local.is_some(),
        local_max: visible_local.map(|local| utc_from_epoch(&local.maximum)),
        duration_minutes: visible_local.and_then(|local| local.duration_minutes()),
    }
}
