//! # Constants and type definitions for Skyclock
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the `skyclock` library.
//!
//! ## Overview
//!
//! - WGS84 ellipsoid parameters used by the geodesy module
//! - Unit conversions (degrees ↔ radians, days ↔ seconds, AU ↔ meters)
//! - Reference epochs (J2000.0, Unix epoch in MJD)
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of days in a Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// Astronomical Unit in meters
pub const AU_METERS: f64 = AU * 1000.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// MJD of the Unix epoch (1970-01-01 00:00:00 UTC)
pub const MJD_UNIX_EPOCH: f64 = 40587.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Hours → radians
pub const RADH: f64 = DPI / 24.0;

/// WGS84 semi-major axis in meters
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 first eccentricity squared, e² = f(2 − f)
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// UTM central meridian scale factor
pub const UTM_K0: f64 = 0.9996;

/// UTM false easting in meters
pub const UTM_FALSE_EASTING: f64 = 500_000.0;

/// UTM false northing in meters, applied in the southern hemisphere
pub const UTM_FALSE_NORTHING: f64 = 10_000_000.0;

/// Mean synodic month in days
pub const SYNODIC_MONTH: f64 = 29.530_588_853;

/// Sun nominal radius in km (IAU 2015 Resolution B3)
pub const SUN_RADIUS_KM: f64 = 696_000.0;

/// Moon mean radius in km
pub const MOON_RADIUS_KM: f64 = 1737.4;

/// Earth equatorial radius in km
pub const EARTH_RADIUS_KM: f64 = WGS84_A / 1000.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Time of day or angle in hours
pub type Hours = f64;
/// Distance in meters
pub type Meter = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
