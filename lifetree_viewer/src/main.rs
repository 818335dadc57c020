mod config;

use lifetree_core::{App, AppError, KeyCode, RenderLoop, SceneContext, ViewHandler, ViewInput};
use lifetree_procgen::TreeSeed;
use lifetree_render::{GpuSceneRenderer, RenderError};

use config::ViewerConfig;

/// Wind presets cycled by `W`
const WIND_STEPS: [f32; 4] = [0.0, 0.3, 0.6, 1.0];

/// Next preset strictly above `current`, wrapping to calm
fn next_wind(current: f32) -> f32 {
    WIND_STEPS
        .iter()
        .copied()
        .find(|step| *step > current + 1e-3)
        .unwrap_or(WIND_STEPS[0])
}

struct Viewer {
    render_loop: RenderLoop<GpuSceneRenderer>,
}

impl Viewer {
    fn on_key(&mut self, code: KeyCode) -> Result<(), RenderError> {
        let mut params = *self.render_loop.scene().params();

        match code {
            KeyCode::KeyR => {
                self.render_loop.reset_camera();
                println!("[CAMERA] Reset");
            }
            KeyCode::Space => {
                if self.render_loop.is_running() {
                    self.render_loop.stop();
                    println!("[LOOP] Paused");
                } else {
                    self.render_loop.start();
                    println!("[LOOP] Running");
                }
            }
            KeyCode::BracketLeft | KeyCode::BracketRight => {
                let step = if code == KeyCode::BracketLeft { -1.0 } else { 1.0 };
                params.time_of_day += step;
                self.render_loop.set_params(params)?;
                println!(
                    "[LIGHT] {:.1}h ({:?})",
                    self.render_loop.scene().params().time_of_day,
                    self.render_loop.scene().lighting().band
                );
            }
            KeyCode::KeyW => {
                params.wind_strength = next_wind(params.wind_strength);
                self.render_loop.set_params(params)?;
                println!("[WIND] Strength {:.1}", params.wind_strength);
            }
            KeyCode::KeyN => {
                let seed = TreeSeed::new(rand::random());
                self.render_loop.regenerate(seed)?;
                println!("[TREE] Reseeded: {}", seed.value);
            }
            _ => {}
        }

        Ok(())
    }
}

impl ViewHandler for Viewer {
    fn on_input(&mut self, input: ViewInput) {
        match input {
            ViewInput::Key(code) => {
                if let Err(err) = self.on_key(code) {
                    log::error!("Key {:?} failed: {}", code, err);
                }
            }
            other => {
                self.render_loop.handle(other);
            }
        }
    }

    fn on_frame(&mut self, dt: f32) -> Result<(), AppError> {
        self.render_loop.tick(dt)?;
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.render_loop.resize(width, height);
    }

    fn on_exit(&mut self) {
        self.render_loop.dispose();
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    App::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let stats = config.life_stats();
    let theme = config.theme_colors()?;
    let seed = config.tree_seed();

    println!("=== LIFE TREE ===\n");
    println!("[STATS] Age {:.1} years, {:.1}% of life lived", stats.current_age, stats.life_percentage);
    println!("[TREE] Seed: {}", seed.value);
    println!("[KEYS] R reset camera | Space pause | [ ] time of day | W wind | N new tree\n");

    let app = App::new(config.window.title.clone(), config.window.width, config.window.height);
    app.run(|context| {
        let scene = SceneContext::new(config.params, stats, theme, seed, context.aspect_ratio());
        let renderer = GpuSceneRenderer::new(context);
        let render_loop = RenderLoop::new(scene, renderer)?;
        println!("=== RENDERING ACTIVE ===\n");
        Ok(Viewer { render_loop })
    })?;

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("{}", err);
        eprintln!("lifetree_viewer: {}", err);
        std::process::exit(1);
    }
}
