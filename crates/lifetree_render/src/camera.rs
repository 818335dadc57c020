use std::f32::consts::PI;

use glam::{Mat4, Vec3};

pub const DEFAULT_RADIUS: f32 = 30.0;
pub const DEFAULT_PHI: f32 = PI / 3.0;
pub const DEFAULT_THETA: f32 = PI / 4.0;
pub const MIN_RADIUS: f32 = 10.0;
pub const MAX_RADIUS: f32 = 100.0;
/// Keeps phi off the poles
pub const PHI_EPSILON: f32 = 0.01;
/// Radians per pixel of drag
pub const ROTATE_SPEED: f32 = 0.005;
pub const ZOOM_OUT_FACTOR: f32 = 1.1;
pub const ZOOM_IN_FACTOR: f32 = 0.9;
/// Look-at point, a little above the ground so the canopy is centered
pub const ORBIT_TARGET: Vec3 = Vec3::new(0.0, 5.0, 0.0);

/// 3D Camera with view and projection matrices
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, target: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov: 60.0_f32.to_radians(),
            aspect_ratio,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Get the view matrix (camera transform)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio (for window resize)
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }
}

/// Orbit position around a fixed target.
///
/// `phi` is the polar angle from +Y, `theta` the azimuth around Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
    pub target: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            phi: DEFAULT_PHI,
            theta: DEFAULT_THETA,
            target: ORBIT_TARGET,
        }
    }
}

impl CameraState {
    /// Spherical to Cartesian, relative to the target
    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + Vec3::new(
                self.radius * sin_phi * self.theta.sin(),
                self.radius * self.phi.cos(),
                self.radius * sin_phi * self.theta.cos(),
            )
    }
}

/// Orbit camera driven by drag and scroll input
#[derive(Debug, Clone)]
pub struct CameraController {
    state: CameraState,
    pub min_radius: f32,
    pub max_radius: f32,
    pub rotate_speed: f32,
    camera: Camera,
}

impl CameraController {
    pub fn new(aspect_ratio: f32) -> Self {
        let state = CameraState::default();
        let mut controller = Self {
            state,
            min_radius: MIN_RADIUS,
            max_radius: MAX_RADIUS,
            rotate_speed: ROTATE_SPEED,
            camera: Camera::new(state.position(), state.target, aspect_ratio),
        };
        controller.update_position();
        controller
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Pointer drag by `(dx, dy)` pixels
    pub fn on_drag(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.state.theta -= dx * self.rotate_speed;
        self.state.phi = (self.state.phi + dy * self.rotate_speed).clamp(PHI_EPSILON, PI - PHI_EPSILON);
        self.update_position();
    }

    /// Wheel input, browser convention: positive `delta_y` zooms out.
    /// Only the sign matters; zero is ignored.
    pub fn on_scroll(&mut self, delta_y: f32) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let factor = if delta_y > 0.0 { ZOOM_OUT_FACTOR } else { ZOOM_IN_FACTOR };
        self.state.radius = (self.state.radius * factor).clamp(self.min_radius, self.max_radius);
        self.update_position();
    }

    /// Back to `(30, π/3, π/4)`
    pub fn reset(&mut self) {
        self.state = CameraState::default();
        self.update_position();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.camera.set_aspect_ratio(aspect_ratio);
    }

    /// Recompute the camera position and re-aim it at the target
    pub fn update_position(&mut self) {
        self.camera.position = self.state.position();
        self.camera.target = self.state.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_bounds(controller: &CameraController) {
        let state = controller.state();
        assert!(state.phi > 0.0 && state.phi < PI, "phi = {}", state.phi);
        assert!(state.phi >= PHI_EPSILON && state.phi <= PI - PHI_EPSILON);
        assert!(state.radius >= MIN_RADIUS && state.radius <= MAX_RADIUS, "radius = {}", state.radius);
    }

    #[test]
    fn test_default_position() {
        let controller = CameraController::new(16.0 / 9.0);
        let camera = controller.camera();
        assert!((camera.position.distance(ORBIT_TARGET) - DEFAULT_RADIUS).abs() < 1e-3);
        assert_eq!(camera.target, ORBIT_TARGET);
        assert!(camera.position.y > ORBIT_TARGET.y);
    }

    #[test]
    fn test_drag_updates_angles() {
        let mut controller = CameraController::new(1.0);
        controller.on_drag(100.0, -20.0);
        let state = controller.state();
        assert!((state.theta - (DEFAULT_THETA - 0.5)).abs() < 1e-5);
        assert!((state.phi - (DEFAULT_PHI - 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_phi_clamped_at_poles() {
        let mut controller = CameraController::new(1.0);
        controller.on_drag(0.0, -1e6);
        assert_eq!(controller.state().phi, PHI_EPSILON);
        controller.on_drag(0.0, 1e6);
        assert_eq!(controller.state().phi, PI - PHI_EPSILON);
    }

    #[test]
    fn test_scroll_direction() {
        let mut controller = CameraController::new(1.0);
        controller.on_scroll(1.0);
        assert!((controller.state().radius - 33.0).abs() < 1e-4);
        controller.on_scroll(-5.0);
        assert!((controller.state().radius - 29.7).abs() < 1e-4);
        controller.on_scroll(0.0);
        assert!((controller.state().radius - 29.7).abs() < 1e-4);
    }

    #[test]
    fn test_large_scroll_clamps_to_max() {
        let mut controller = CameraController::new(1.0);
        for _ in 0..12 {
            controller.on_scroll(1.0);
        }
        assert!(controller.state().radius > 90.0 && controller.state().radius < MAX_RADIUS);
        controller.on_scroll(1e9);
        assert_eq!(controller.state().radius, MAX_RADIUS);
        controller.on_scroll(1e9);
        assert_eq!(controller.state().radius, MAX_RADIUS);
    }

    #[test]
    fn test_zoom_in_clamps_to_min() {
        let mut controller = CameraController::new(1.0);
        for _ in 0..50 {
            controller.on_scroll(-1.0);
        }
        assert_eq!(controller.state().radius, MIN_RADIUS);
    }

    #[test]
    fn test_bounds_hold_after_random_input() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(17);
        let mut controller = CameraController::new(1.0);

        for _ in 0..5000 {
            if rng.gen_bool(0.5) {
                controller.on_drag(rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0));
            } else {
                controller.on_scroll(rng.gen_range(-300.0..300.0));
            }
            assert_in_bounds(&controller);
        }
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut controller = CameraController::new(1.0);
        controller.on_drag(f32::NAN, 3.0);
        controller.on_scroll(f32::INFINITY);
        assert_eq!(*controller.state(), CameraState::default());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut controller = CameraController::new(1.0);
        controller.on_drag(321.0, 77.0);
        controller.on_drag(-12.0, -500.0);
        controller.on_scroll(1.0);
        controller.reset();

        let state = controller.state();
        assert_eq!(state.radius, 30.0);
        assert_eq!(state.phi, PI / 3.0);
        assert_eq!(state.theta, PI / 4.0);
        assert_eq!(controller.camera().position, CameraState::default().position());
    }

    #[test]
    fn test_view_projection_is_finite() {
        let mut controller = CameraController::new(4.0 / 3.0);
        controller.on_drag(0.0, -1e6);
        let vp = controller.camera().view_projection_matrix();
        assert!(vp.is_finite());
    }
}
