use lifetree_procgen::{
    distribute_foliage, generate_tree, Foliage, LifeStats, ThemeColors, TreeParams, TreeSeed, TreeSkeleton,
};
use lifetree_render::{CameraController, LightingEnvironmentController, LightingState};

/// All state of one visualization instance.
///
/// Tree and foliage are regenerated from scratch whenever params, stats,
/// theme or seed change. The camera is left alone by rebuilds.
pub struct SceneContext {
    params: TreeParams,
    stats: LifeStats,
    theme: ThemeColors,
    seed: TreeSeed,
    skeleton: TreeSkeleton,
    foliage: Foliage,
    lighting: LightingEnvironmentController,
    camera: CameraController,
    generation: u64,
}

impl SceneContext {
    pub fn new(params: TreeParams, stats: LifeStats, theme: ThemeColors, seed: TreeSeed, aspect_ratio: f32) -> Self {
        let mut scene = Self {
            params: params.clamped(),
            stats: stats.sanitized(),
            theme,
            seed,
            skeleton: TreeSkeleton::default(),
            foliage: Foliage::default(),
            lighting: LightingEnvironmentController::new(),
            camera: CameraController::new(aspect_ratio),
            generation: 0,
        };
        scene.rebuild();
        scene
    }

    /// Drop the current tree and generate a new one from the current inputs
    pub fn rebuild(&mut self) {
        self.skeleton = generate_tree(&self.params, self.seed);
        self.foliage = distribute_foliage(&self.skeleton, &self.params, &self.stats, self.seed);
        self.lighting
            .apply(self.params.time_of_day, self.params.sun_intensity, &self.theme);
        self.generation += 1;

        log::info!(
            "Life tree #{} built: {} branches, {} green leaves, {} fallen leaves ({:?}, {:.1}h)",
            self.generation,
            self.skeleton.len(),
            self.foliage.green.len(),
            self.foliage.fallen.len(),
            self.lighting.state().band,
            self.params.time_of_day,
        );
    }

    pub fn set_params(&mut self, params: TreeParams) {
        self.params = params.clamped();
        self.rebuild();
    }

    pub fn set_stats(&mut self, stats: LifeStats) {
        self.stats = stats.sanitized();
        self.rebuild();
    }

    pub fn set_theme(&mut self, theme: ThemeColors) {
        self.theme = theme;
        self.rebuild();
    }

    pub fn set_seed(&mut self, seed: TreeSeed) {
        self.seed = seed;
        self.rebuild();
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    pub fn stats(&self) -> &LifeStats {
        &self.stats
    }

    pub fn theme(&self) -> &ThemeColors {
        &self.theme
    }

    pub fn seed(&self) -> TreeSeed {
        self.seed
    }

    pub fn skeleton(&self) -> &TreeSkeleton {
        &self.skeleton
    }

    pub fn foliage(&self) -> &Foliage {
        &self.foliage
    }

    pub fn foliage_mut(&mut self) -> &mut Foliage {
        &mut self.foliage
    }

    pub fn lighting(&self) -> &LightingState {
        self.lighting.state()
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.camera
    }

    /// Number of rebuilds so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
