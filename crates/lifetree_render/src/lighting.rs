//! Time-of-day lighting.
//!
//! Four bands drive sky color, sun color and light intensities. Dawn and
//! dusk interpolate between the night values and the warm horizon values the
//! day band starts and ends on, so every output is continuous over the full
//! 24 hours.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use lifetree_procgen::ThemeColors;

const NIGHT_SKY: Vec3 = Vec3::new(0.04, 0.06, 0.16);
const HORIZON_SKY: Vec3 = Vec3::new(0.98, 0.62, 0.42);
const ZENITH_SKY: Vec3 = Vec3::new(0.53, 0.81, 0.92);

const NIGHT_SUN: Vec3 = Vec3::new(0.45, 0.50, 0.80);
const HORIZON_SUN: Vec3 = Vec3::new(1.0, 0.62, 0.32);
const ZENITH_SUN: Vec3 = Vec3::new(1.0, 0.97, 0.90);

pub const NIGHT_AMBIENT: f32 = 0.2;
pub const HORIZON_AMBIENT: f32 = 0.4;
pub const PEAK_AMBIENT: f32 = 0.8;

pub const NIGHT_SUN_INTENSITY: f32 = 0.1;
pub const HORIZON_SUN_INTENSITY: f32 = 0.5;
pub const PEAK_SUN_INTENSITY: f32 = 1.2;

/// Distance of the sun from the scene origin
pub const SUN_ORBIT_RADIUS: f32 = 50.0;
pub const SKY_TINT: f32 = 0.10;
pub const SUN_TINT: f32 = 0.05;
pub const FOG_NEAR: f32 = 40.0;
pub const FOG_FAR: f32 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingBand {
    Night,
    Dawn,
    Day,
    Dusk,
}

impl LightingBand {
    /// Band for an hour in `[0, 24)`; other values are wrapped first
    pub fn for_hour(hour: f32) -> Self {
        let hour = wrap_hour(hour);
        if (6.0..8.0).contains(&hour) {
            LightingBand::Dawn
        } else if (8.0..18.0).contains(&hour) {
            LightingBand::Day
        } else if (18.0..20.0).contains(&hour) {
            LightingBand::Dusk
        } else {
            LightingBand::Night
        }
    }
}

/// Everything the renderer needs from the lighting model for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingState {
    pub band: LightingBand,
    pub time_of_day: f32,
    pub sky_color: Vec3,
    pub fog_color: Vec3,
    pub fog_near: f32,
    pub fog_far: f32,
    pub sun_color: Vec3,
    pub sun_position: Vec3,
    /// Direction the light travels, from the sun towards the origin
    pub sun_direction: Vec3,
    pub sun_intensity: f32,
    pub ambient_intensity: f32,
}

impl Default for LightingState {
    fn default() -> Self {
        compute_lighting(12.0, 1.0, &ThemeColors::default())
    }
}

fn wrap_hour(hour: f32) -> f32 {
    if !hour.is_finite() {
        return 0.0;
    }
    let wrapped = hour.rem_euclid(24.0);
    if wrapped >= 24.0 {
        0.0
    } else {
        wrapped
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sun on a circular orbit: below the horizon at midnight, overhead at noon
pub fn sun_position(hour: f32) -> Vec3 {
    let angle = (wrap_hour(hour) / 24.0) * TAU - PI / 2.0;
    Vec3::new(
        angle.cos() * SUN_ORBIT_RADIUS,
        angle.sin() * SUN_ORBIT_RADIUS,
        angle.sin() * SUN_ORBIT_RADIUS * 0.5,
    )
}

/// Pure lighting model.
///
/// `sun_scale` multiplies the directional intensity; the theme's primary
/// color tints the sky and sun.
pub fn compute_lighting(time_of_day: f32, sun_scale: f32, theme: &ThemeColors) -> LightingState {
    let hour = wrap_hour(time_of_day);
    let band = LightingBand::for_hour(hour);

    let (sky, sun, ambient, sun_intensity) = match band {
        LightingBand::Night => (NIGHT_SKY, NIGHT_SUN, NIGHT_AMBIENT, NIGHT_SUN_INTENSITY),
        LightingBand::Dawn => {
            let t = (hour - 6.0) / 2.0;
            (
                NIGHT_SKY.lerp(HORIZON_SKY, t),
                NIGHT_SUN.lerp(HORIZON_SUN, t),
                lerp(NIGHT_AMBIENT, HORIZON_AMBIENT, t),
                lerp(NIGHT_SUN_INTENSITY, HORIZON_SUN_INTENSITY, t),
            )
        }
        LightingBand::Day => {
            let s = (((hour - 8.0) / 10.0) * PI).sin();
            (
                HORIZON_SKY.lerp(ZENITH_SKY, s),
                HORIZON_SUN.lerp(ZENITH_SUN, s),
                lerp(HORIZON_AMBIENT, PEAK_AMBIENT, s),
                lerp(HORIZON_SUN_INTENSITY, PEAK_SUN_INTENSITY, s),
            )
        }
        LightingBand::Dusk => {
            let t = (hour - 18.0) / 2.0;
            (
                HORIZON_SKY.lerp(NIGHT_SKY, t),
                HORIZON_SUN.lerp(NIGHT_SUN, t),
                lerp(HORIZON_AMBIENT, NIGHT_AMBIENT, t),
                lerp(HORIZON_SUN_INTENSITY, NIGHT_SUN_INTENSITY, t),
            )
        }
    };

    let sky_color = sky.lerp(theme.primary, SKY_TINT);
    let sun_color = sun.lerp(theme.primary, SUN_TINT);
    let position = sun_position(hour);
    let sun_scale = if sun_scale.is_finite() { sun_scale.max(0.0) } else { 1.0 };

    LightingState {
        band,
        time_of_day: hour,
        sky_color,
        fog_color: sky_color,
        fog_near: FOG_NEAR,
        fog_far: FOG_FAR,
        sun_color,
        sun_position: position,
        sun_direction: (Vec3::ZERO - position).normalize_or_zero(),
        sun_intensity: sun_intensity * sun_scale,
        ambient_intensity: ambient,
    }
}

/// Holds the lighting state the render loop reads each frame
#[derive(Debug, Clone, Default)]
pub struct LightingEnvironmentController {
    state: LightingState,
}

impl LightingEnvironmentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the model for new params or theme
    pub fn apply(&mut self, time_of_day: f32, sun_scale: f32, theme: &ThemeColors) -> &LightingState {
        let band = self.state.band;
        self.state = compute_lighting(time_of_day, sun_scale, theme);
        if band != self.state.band {
            log::debug!("Lighting band {:?} -> {:?} at {:.2}h", band, self.state.band, self.state.time_of_day);
        }
        &self.state
    }

    pub fn state(&self) -> &LightingState {
        &self.state
    }
}
