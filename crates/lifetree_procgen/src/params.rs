use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading host-supplied inputs
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("invalid hex color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// Shape, foliage and lighting controls for the life tree
///
/// Field names serialize in camelCase (`trunkHeight`, `timeOfDay`, ...).
/// Values outside the documented bounds are clamped by [`TreeParams::clamped`],
/// never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeParams {
    pub trunk_height: f32,
    pub trunk_radius: f32,
    pub branch_levels: u32,
    pub branch_density: f32,
    /// Tilt of child branches away from vertical, in degrees
    pub branch_angle: f32,
    /// Scales living leaves per canopy branch. Only applies before the first
    /// fallen leaf (under 50 days lived); after that the green total follows
    /// the remaining-life ratio.
    pub leaf_density: f32,
    pub leaf_size: f32,
    pub canopy_spread: f32,
    pub wind_strength: f32,
    pub sun_intensity: f32,
    /// Hours, 0-24
    pub time_of_day: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            trunk_height: 8.0,
            trunk_radius: 0.5,
            branch_levels: 5,
            branch_density: 1.0,
            branch_angle: 35.0,
            leaf_density: 1.0,
            leaf_size: 0.5,
            canopy_spread: 1.0,
            wind_strength: 0.3,
            sun_intensity: 1.0,
            time_of_day: 12.0,
        }
    }
}

impl TreeParams {
    pub const TRUNK_HEIGHT: (f32, f32) = (2.0, 20.0);
    pub const TRUNK_RADIUS: (f32, f32) = (0.1, 2.0);
    pub const BRANCH_LEVELS: (u32, u32) = (3, 7);
    pub const BRANCH_DENSITY: (f32, f32) = (0.3, 1.5);
    pub const BRANCH_ANGLE: (f32, f32) = (10.0, 80.0);
    pub const LEAF_DENSITY: (f32, f32) = (0.1, 2.0);
    pub const LEAF_SIZE: (f32, f32) = (0.1, 2.0);
    pub const CANOPY_SPREAD: (f32, f32) = (0.5, 2.0);
    pub const WIND_STRENGTH: (f32, f32) = (0.0, 1.0);
    pub const SUN_INTENSITY: (f32, f32) = (0.0, 2.0);

    /// Return a copy with every field forced into its documented range.
    ///
    /// Non-finite values fall back to the field's default. `time_of_day`
    /// wraps so that 24 reads as midnight.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let clamped = Self {
            trunk_height: clamp_field(self.trunk_height, Self::TRUNK_HEIGHT, defaults.trunk_height),
            trunk_radius: clamp_field(self.trunk_radius, Self::TRUNK_RADIUS, defaults.trunk_radius),
            branch_levels: self
                .branch_levels
                .clamp(Self::BRANCH_LEVELS.0, Self::BRANCH_LEVELS.1),
            branch_density: clamp_field(self.branch_density, Self::BRANCH_DENSITY, defaults.branch_density),
            branch_angle: clamp_field(self.branch_angle, Self::BRANCH_ANGLE, defaults.branch_angle),
            leaf_density: clamp_field(self.leaf_density, Self::LEAF_DENSITY, defaults.leaf_density),
            leaf_size: clamp_field(self.leaf_size, Self::LEAF_SIZE, defaults.leaf_size),
            canopy_spread: clamp_field(self.canopy_spread, Self::CANOPY_SPREAD, defaults.canopy_spread),
            wind_strength: clamp_field(self.wind_strength, Self::WIND_STRENGTH, defaults.wind_strength),
            sun_intensity: clamp_field(self.sun_intensity, Self::SUN_INTENSITY, defaults.sun_intensity),
            time_of_day: wrap_hour(self.time_of_day, defaults.time_of_day),
        };

        if clamped != *self {
            log::debug!("Clamped tree params: {:?} -> {:?}", self, clamped);
        }

        clamped
    }
}

fn clamp_field(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn wrap_hour(hour: f32, fallback: f32) -> f32 {
    if !hour.is_finite() {
        return fallback;
    }
    let wrapped = hour.rem_euclid(24.0);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs
    if wrapped >= 24.0 {
        0.0
    } else {
        wrapped
    }
}

/// Life statistics computed upstream by the host
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeStats {
    pub days_lived: f64,
    pub days_remaining: f64,
    /// Years
    pub current_age: f64,
    /// Percent of expected lifespan elapsed, 0-100
    pub life_percentage: f64,
}

impl LifeStats {
    pub const DAYS_PER_YEAR: f64 = 365.25;

    /// Derive age and percentage from the two day counts
    pub fn from_days(days_lived: f64, days_remaining: f64) -> Self {
        let stats = Self {
            days_lived,
            days_remaining,
            current_age: 0.0,
            life_percentage: 0.0,
        }
        .sanitized();

        let total = stats.days_lived + stats.days_remaining;
        Self {
            current_age: stats.days_lived / Self::DAYS_PER_YEAR,
            life_percentage: if total > 0.0 { stats.days_lived / total * 100.0 } else { 0.0 },
            ..stats
        }
    }

    /// Replace negative and non-finite values with zero
    pub fn sanitized(&self) -> Self {
        Self {
            days_lived: non_negative(self.days_lived),
            days_remaining: non_negative(self.days_remaining),
            current_age: non_negative(self.current_age),
            life_percentage: non_negative(self.life_percentage),
        }
    }

    /// `days_remaining / (days_lived + days_remaining)`, or 0 with no data
    pub fn remaining_ratio(&self) -> f64 {
        let stats = self.sanitized();
        let total = stats.days_lived + stats.days_remaining;
        if total > 0.0 {
            (stats.days_remaining / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Host palette, linear RGB. Only used for tinting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub primary: Vec3,
    pub secondary: Vec3,
    pub accent: Vec3,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: Vec3::new(0.30, 0.69, 0.31),
            secondary: Vec3::new(0.55, 0.43, 0.39),
            accent: Vec3::new(1.0, 0.76, 0.03),
        }
    }
}

impl ThemeColors {
    pub fn from_hex(primary: &str, secondary: &str, accent: &str) -> Result<Self, ParamError> {
        Ok(Self {
            primary: parse_hex_color(primary)?,
            secondary: parse_hex_color(secondary)?,
            accent: parse_hex_color(accent)?,
        })
    }
}

/// Parse `#rrggbb` (leading `#` optional) into 0-1 RGB
pub fn parse_hex_color(hex: &str) -> Result<Vec3, ParamError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParamError::InvalidColor(hex.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| ParamError::InvalidColor(hex.to_string()))
    };

    Ok(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
