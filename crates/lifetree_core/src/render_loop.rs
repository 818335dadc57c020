use glam::Vec3;
use lifetree_procgen::{Leaf, LifeStats, ThemeColors, TreeParams, TreeSeed};
use lifetree_render::{FrameView, RenderError, SceneRenderer};

use crate::input::ViewInput;
use crate::scene::SceneContext;

/// Per-frame driver for one visualization.
///
/// Owns the scene and the renderer. Every rebuild releases the renderer's
/// buffers before the new tree is installed. After `dispose` the loop refuses
/// to draw or rebuild and returns [`RenderError::Released`].
pub struct RenderLoop<R: SceneRenderer> {
    scene: SceneContext,
    renderer: Option<R>,
    wind_time: f32,
    running: bool,
    frame_count: u64,
}

impl<R: SceneRenderer> RenderLoop<R> {
    /// Install the scene into the renderer. The loop starts running.
    pub fn new(scene: SceneContext, mut renderer: R) -> Result<Self, RenderError> {
        renderer.install(scene.skeleton(), scene.foliage())?;
        Ok(Self {
            scene,
            renderer: Some(renderer),
            wind_time: 0.0,
            running: true,
            frame_count: 0,
        })
    }

    /// Advance wind by `dt` seconds, sway the canopy and draw.
    ///
    /// Returns `Ok(false)` when stopped. Negative or non-finite `dt` counts as zero.
    pub fn tick(&mut self, dt: f32) -> Result<bool, RenderError> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Err(RenderError::Released);
        };
        if !self.running {
            return Ok(false);
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.wind_time += dt;

        let wind_strength = self.scene.params().wind_strength;
        apply_wind(&mut self.scene.foliage_mut().green, self.wind_time, wind_strength);

        let frame = FrameView {
            camera: self.scene.camera().camera(),
            lighting: self.scene.lighting(),
            foliage: self.scene.foliage(),
        };
        renderer.draw(&frame)?;
        self.frame_count += 1;

        Ok(true)
    }

    pub fn start(&mut self) {
        if self.renderer.is_some() {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop and free renderer resources. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.running = false;
        if let Some(mut renderer) = self.renderer.take() {
            renderer.release();
            log::info!("Render loop disposed after {} frames", self.frame_count);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.renderer.is_none()
    }

    pub fn set_params(&mut self, params: TreeParams) -> Result<(), RenderError> {
        self.rebuild_with(|scene| scene.set_params(params))
    }

    pub fn set_stats(&mut self, stats: LifeStats) -> Result<(), RenderError> {
        self.rebuild_with(|scene| scene.set_stats(stats))
    }

    pub fn set_theme(&mut self, theme: ThemeColors) -> Result<(), RenderError> {
        self.rebuild_with(|scene| scene.set_theme(theme))
    }

    /// Grow a new tree from `seed`
    pub fn regenerate(&mut self, seed: TreeSeed) -> Result<(), RenderError> {
        self.rebuild_with(|scene| scene.set_seed(seed))
    }

    fn rebuild_with(&mut self, change: impl FnOnce(&mut SceneContext)) -> Result<(), RenderError> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Err(RenderError::Released);
        };

        renderer.release();
        change(&mut self.scene);
        renderer.install(self.scene.skeleton(), self.scene.foliage())
    }

    pub fn on_drag(&mut self, dx: f32, dy: f32) {
        self.scene.camera_mut().on_drag(dx, dy);
    }

    pub fn on_scroll(&mut self, delta_y: f32) {
        self.scene.camera_mut().on_scroll(delta_y);
    }

    pub fn reset_camera(&mut self) {
        self.scene.camera_mut().reset();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.scene.camera_mut().set_aspect_ratio(width as f32 / height as f32);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    /// Route pointer input to the camera. Keys are left to the host.
    pub fn handle(&mut self, input: ViewInput) -> bool {
        match input {
            ViewInput::Drag { dx, dy } => {
                self.on_drag(dx, dy);
                true
            }
            ViewInput::Scroll { delta_y } => {
                self.on_scroll(delta_y);
                true
            }
            ViewInput::Key(_) => false,
        }
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }

    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    pub fn wind_time(&self) -> f32 {
        self.wind_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl<R: SceneRenderer> Drop for RenderLoop<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Cosmetic sway of living leaves around their generated rotation
pub fn apply_wind(leaves: &mut [Leaf], time: f32, strength: f32) {
    for leaf in leaves.iter_mut().filter(|leaf| leaf.is_green) {
        let p = leaf.position;
        let sway = Vec3::new(
            (time * 1.5 + p.x).sin() * 0.1 * strength,
            (time * 0.7 + p.y).sin() * 0.05 * strength,
            (time * 1.2 + p.z).cos() * 0.1 * strength,
        );
        leaf.rotation = leaf.base_rotation + sway;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifetree_procgen::{Foliage, TreeSkeleton};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Calls {
        installs: usize,
        releases: usize,
        draws: usize,
        resizes: Vec<(u32, u32)>,
        installed_branches: usize,
        installed_leaves: usize,
        drawn_leaves: usize,
    }

    #[derive(Clone, Default)]
    struct FakeRenderer {
        calls: Rc<RefCell<Calls>>,
        fail_draw: bool,
    }

    impl SceneRenderer for FakeRenderer {
        fn install(&mut self, skeleton: &TreeSkeleton, foliage: &Foliage) -> Result<(), RenderError> {
            let mut calls = self.calls.borrow_mut();
            calls.installs += 1;
            calls.installed_branches = skeleton.len();
            calls.installed_leaves = foliage.len();
            Ok(())
        }

        fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
            if self.fail_draw {
                return Err(RenderError::NoAdapter);
            }
            let mut calls = self.calls.borrow_mut();
            calls.draws += 1;
            calls.drawn_leaves = frame.foliage.len();
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.borrow_mut().resizes.push((width, height));
        }

        fn release(&mut self) {
            self.calls.borrow_mut().releases += 1;
        }
    }

    fn scene() -> SceneContext {
        SceneContext::new(
            TreeParams::default(),
            LifeStats::from_days(7300.0, 14600.0),
            ThemeColors::default(),
            TreeSeed::new(3),
            1.0,
        )
    }

    fn render_loop() -> (RenderLoop<FakeRenderer>, Rc<RefCell<Calls>>) {
        let renderer = FakeRenderer::default();
        let calls = renderer.calls.clone();
        let render_loop = RenderLoop::new(scene(), renderer).unwrap();
        (render_loop, calls)
    }

    fn leaf(position: Vec3, is_green: bool) -> Leaf {
        Leaf {
            position,
            base_rotation: Vec3::new(0.1, 0.2, 0.3),
            rotation: Vec3::new(0.1, 0.2, 0.3),
            size: 0.5,
            color: glam::Vec4::ONE,
            is_green,
            branch: None,
        }
    }

    #[test]
    fn test_new_installs_scene() {
        let (render_loop, calls) = render_loop();
        let calls = calls.borrow();
        assert_eq!(calls.installs, 1);
        assert_eq!(calls.installed_branches, render_loop.scene().skeleton().len());
        assert_eq!(calls.installed_leaves, render_loop.scene().foliage().len());
        assert!(render_loop.is_running());
    }

    #[test]
    fn test_tick_draws_and_advances_wind() {
        let (mut render_loop, calls) = render_loop();
        assert!(render_loop.tick(0.5).unwrap());
        assert!(render_loop.tick(0.25).unwrap());
        assert!((render_loop.wind_time() - 0.75).abs() < 1e-6);
        assert_eq!(render_loop.frame_count(), 2);
        assert_eq!(calls.borrow().draws, 2);
        assert_eq!(calls.borrow().drawn_leaves, render_loop.scene().foliage().len());
    }

    #[test]
    fn test_bad_dt_does_not_move_wind() {
        let (mut render_loop, _) = render_loop();
        render_loop.tick(1.0).unwrap();
        render_loop.tick(-3.0).unwrap();
        render_loop.tick(f32::NAN).unwrap();
        render_loop.tick(f32::INFINITY).unwrap();
        assert_eq!(render_loop.wind_time(), 1.0);
    }

    #[test]
    fn test_stopped_loop_does_not_draw() {
        let (mut render_loop, calls) = render_loop();
        render_loop.stop();
        assert!(!render_loop.tick(1.0).unwrap());
        assert_eq!(calls.borrow().draws, 0);
        assert_eq!(render_loop.wind_time(), 0.0);

        render_loop.start();
        assert!(render_loop.tick(1.0).unwrap());
        assert_eq!(calls.borrow().draws, 1);
    }

    #[test]
    fn test_rebuild_releases_before_install() {
        let (mut render_loop, calls) = render_loop();
        render_loop.set_params(TreeParams { branch_levels: 3, ..Default::default() }).unwrap();
        render_loop.set_stats(LifeStats::from_days(1000.0, 1000.0)).unwrap();
        render_loop.set_theme(ThemeColors::default()).unwrap();
        render_loop.regenerate(TreeSeed::new(99)).unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.installs, 5);
        assert_eq!(calls.releases, 4);
        assert_eq!(calls.installed_branches, render_loop.scene().skeleton().len());
        assert_eq!(render_loop.scene().foliage().fallen.len(), 20);
    }

    #[test]
    fn test_rebuild_keeps_camera_and_wind() {
        let (mut render_loop, _) = render_loop();
        render_loop.on_drag(-40.0, 25.0);
        render_loop.tick(2.0).unwrap();
        let camera = *render_loop.scene().camera().state();

        render_loop.regenerate(TreeSeed::new(11)).unwrap();
        assert_eq!(*render_loop.scene().camera().state(), camera);
        assert_eq!(render_loop.wind_time(), 2.0);
    }

    #[test]
    fn test_dispose_releases_once_and_refuses_work() {
        let (mut render_loop, calls) = render_loop();
        render_loop.dispose();
        render_loop.dispose();
        assert!(render_loop.is_disposed());
        assert_eq!(calls.borrow().releases, 1);

        assert!(matches!(render_loop.tick(0.1), Err(RenderError::Released)));
        assert!(matches!(
            render_loop.set_params(TreeParams::default()),
            Err(RenderError::Released)
        ));
        render_loop.start();
        assert!(!render_loop.is_running());
        assert_eq!(calls.borrow().installs, 1);
    }

    #[test]
    fn test_drop_disposes() {
        let (render_loop, calls) = render_loop();
        drop(render_loop);
        assert_eq!(calls.borrow().releases, 1);
    }

    #[test]
    fn test_draw_error_propagates() {
        let renderer = FakeRenderer {
            fail_draw: true,
            ..Default::default()
        };
        let mut render_loop = RenderLoop::new(scene(), renderer).unwrap();
        assert!(render_loop.tick(0.1).is_err());
        assert_eq!(render_loop.frame_count(), 0);
    }

    #[test]
    fn test_input_reaches_camera() {
        let (mut render_loop, calls) = render_loop();
        let start = *render_loop.scene().camera().state();

        assert!(render_loop.handle(ViewInput::Scroll { delta_y: 1.0 }));
        assert!(render_loop.scene().camera().state().radius > start.radius);
        assert!(render_loop.handle(ViewInput::Drag { dx: 10.0, dy: 0.0 }));
        assert!(render_loop.scene().camera().state().theta < start.theta);
        assert!(!render_loop.handle(ViewInput::Key(winit::keyboard::KeyCode::KeyR)));

        render_loop.reset_camera();
        assert_eq!(*render_loop.scene().camera().state(), start);

        render_loop.resize(800, 400);
        render_loop.resize(0, 400);
        assert_eq!(calls.borrow().resizes, vec![(800, 400)]);
        assert_eq!(render_loop.scene().camera().camera().aspect_ratio, 2.0);
    }

    #[test]
    fn test_wind_sways_green_leaves_only() {
        let mut leaves = vec![leaf(Vec3::new(1.0, 2.0, 3.0), true), leaf(Vec3::new(1.0, 0.0, 3.0), false)];
        apply_wind(&mut leaves, 4.0, 1.0);

        let expected = Vec3::new(
            0.1 + (4.0f32 * 1.5 + 1.0).sin() * 0.1,
            0.2 + (4.0f32 * 0.7 + 2.0).sin() * 0.05,
            0.3 + (4.0f32 * 1.2 + 3.0).cos() * 0.1,
        );
        assert!((leaves[0].rotation - expected).length() < 1e-6);
        assert_eq!(leaves[1].rotation, leaves[1].base_rotation);
    }

    #[test]
    fn test_no_wind_keeps_base_rotation() {
        let mut leaves = vec![leaf(Vec3::new(5.0, 6.0, 7.0), true)];
        for step in 0..10 {
            apply_wind(&mut leaves, step as f32 * 0.3, 0.0);
            assert_eq!(leaves[0].rotation, leaves[0].base_rotation);
        }
    }

    #[test]
    fn test_sway_is_bounded() {
        let mut leaves = vec![leaf(Vec3::new(-2.0, 9.0, 0.5), true)];
        for step in 0..200 {
            apply_wind(&mut leaves, step as f32 * 0.05, 1.0);
            let offset = leaves[0].rotation - leaves[0].base_rotation;
            assert!(offset.x.abs() <= 0.1 + 1e-6);
            assert!(offset.y.abs() <= 0.05 + 1e-6);
            assert!(offset.z.abs() <= 0.1 + 1e-6);
        }
    }
}
