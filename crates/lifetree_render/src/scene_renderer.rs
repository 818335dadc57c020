use lifetree_procgen::{
    branch_mesh, ground_mesh, Foliage, TreeSkeleton, BARK_COLOR, BRANCH_RADIAL_SEGMENTS, GROUND_COLOR,
    GROUND_RADIUS,
};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::leaf_pipeline::{LeafInstance, LeafPipeline};
use crate::lighting::LightingState;
use crate::mesh_pipeline::{MeshBuffers, MeshPipeline};
use crate::uniforms::{SceneBindings, SceneUniforms};
use crate::GraphicsContext;

const GROUND_SEGMENTS: u32 = 64;
const GROUND_NOISE_SEED: u32 = 1587;

/// Everything drawn in one frame
pub struct FrameView<'a> {
    pub camera: &'a Camera,
    pub lighting: &'a LightingState,
    pub foliage: &'a Foliage,
}

/// Seam between the render loop and whatever owns the GPU.
///
/// `install` takes a freshly generated tree, `release` frees everything the
/// last `install` allocated. Both may be called any number of times.
pub trait SceneRenderer {
    fn install(&mut self, skeleton: &TreeSkeleton, foliage: &Foliage) -> Result<(), RenderError>;

    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError>;

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn release(&mut self);
}

/// wgpu implementation of [`SceneRenderer`]
pub struct GpuSceneRenderer {
    context: GraphicsContext,
    bindings: SceneBindings,
    mesh_pipeline: MeshPipeline,
    leaf_pipeline: LeafPipeline,
    ground: Option<MeshBuffers>,
    branches: Option<MeshBuffers>,
    instances: Vec<LeafInstance>,
}

impl GpuSceneRenderer {
    pub fn new(context: GraphicsContext) -> Self {
        let device = context.device();
        let format = context.surface_format();
        let bindings = SceneBindings::new(device);
        let mesh_pipeline = MeshPipeline::new(device, format, &bindings.layout);
        let leaf_pipeline = LeafPipeline::new(device, format, &bindings.layout);

        log::info!("Scene pipelines created ({:?})", format);

        Self {
            context,
            bindings,
            mesh_pipeline,
            leaf_pipeline,
            ground: None,
            branches: None,
            instances: Vec::new(),
        }
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.aspect_ratio()
    }
}

impl SceneRenderer for GpuSceneRenderer {
    fn install(&mut self, skeleton: &TreeSkeleton, foliage: &Foliage) -> Result<(), RenderError> {
        self.release();

        let device = self.context.device();
        self.branches = MeshBuffers::new(device, "Branch", &branch_mesh(skeleton, BARK_COLOR, BRANCH_RADIAL_SEGMENTS));
        self.ground = MeshBuffers::new(
            device,
            "Ground",
            &ground_mesh(GROUND_RADIUS, GROUND_SEGMENTS, GROUND_COLOR, GROUND_NOISE_SEED),
        );
        self.instances = Vec::with_capacity(foliage.len());

        Ok(())
    }

    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
        self.instances.clear();
        self.instances.extend(frame.foliage.iter().map(LeafInstance::from_leaf));
        self.leaf_pipeline
            .upload_instances(self.context.device(), self.context.queue(), &self.instances);

        self.bindings
            .update(self.context.queue(), &SceneUniforms::new(frame.camera, frame.lighting));

        let Some(output) = self.context.acquire_frame()? else {
            return Ok(());
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sky = frame.lighting.sky_color;
        let mut encoder = self.context.device().create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Life Tree Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Life Tree Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: sky.x as f64,
                            g: sky.y as f64,
                            b: sky.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.mesh_pipeline.render(
                &mut render_pass,
                &self.bindings.bind_group,
                self.ground.iter().chain(self.branches.iter()),
            );
            self.leaf_pipeline.render(&mut render_pass, &self.bindings.bind_group);
        }

        self.context.queue().submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn release(&mut self) {
        for mesh in self.ground.take().into_iter().chain(self.branches.take()) {
            mesh.destroy();
        }
        self.leaf_pipeline.release();
        self.instances = Vec::new();
    }
}
