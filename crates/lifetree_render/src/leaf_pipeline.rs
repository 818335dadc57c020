use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::{Buffer, Device, Queue, RenderPipeline};

use lifetree_procgen::Leaf;

use crate::DEPTH_FORMAT;

/// Per-leaf instance data: transform and RGBA color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LeafInstance {
    pub model_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl LeafInstance {
    pub fn from_leaf(leaf: &Leaf) -> Self {
        let model = Mat4::from_scale_rotation_translation(Vec3::splat(leaf.size), leaf.orientation(), leaf.position);
        Self {
            model_matrix: model.to_cols_array_2d(),
            color: leaf.color.to_array(),
        }
    }
}

/// Instanced, alpha-blended leaf quads. The quad itself is built in the shader.
pub struct LeafPipeline {
    pipeline: RenderPipeline,
    instance_buffer: Option<Buffer>,
    capacity: usize,
    instance_count: u32,
}

impl LeafPipeline {
    pub fn new(device: &Device, surface_format: wgpu::TextureFormat, scene_layout: &wgpu::BindGroupLayout) -> Self {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Leaf Pipeline Layout"),
            bind_group_layouts: &[scene_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Leaf Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../assets/shaders/leaf.wgsl").into()),
        });

        let vec4_size = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Leaf Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LeafInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        // Model Matrix (4x vec4)
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 5,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                        wgpu::VertexAttribute {
                            offset: vec4_size,
                            shader_location: 6,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                        wgpu::VertexAttribute {
                            offset: vec4_size * 2,
                            shader_location: 7,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                        wgpu::VertexAttribute {
                            offset: vec4_size * 3,
                            shader_location: 8,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                        // Color
                        wgpu::VertexAttribute {
                            offset: vec4_size * 4,
                            shader_location: 9,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Semi-transparent: test against depth, don't write it
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            instance_buffer: None,
            capacity: 0,
            instance_count: 0,
        }
    }

    /// Write this frame's leaf transforms, growing the buffer if needed
    pub fn upload_instances(&mut self, device: &Device, queue: &Queue, instances: &[LeafInstance]) {
        self.instance_count = instances.len() as u32;
        if instances.is_empty() {
            return;
        }

        if instances.len() > self.capacity || self.instance_buffer.is_none() {
            self.release();
            self.capacity = instances.len().next_power_of_two();
            self.instance_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Leaf Instance Buffer"),
                size: (self.capacity * std::mem::size_of::<LeafInstance>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            log::debug!("Leaf instance buffer sized for {} leaves", self.capacity);
        }

        if let Some(buffer) = &self.instance_buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Drop the instance buffer
    pub fn release(&mut self) {
        if let Some(buffer) = self.instance_buffer.take() {
            buffer.destroy();
        }
        self.capacity = 0;
        self.instance_count = 0;
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, scene_bind_group: &'a wgpu::BindGroup) {
        let Some(buffer) = &self.instance_buffer else {
            return;
        };
        if self.instance_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, scene_bind_group, &[]);
        render_pass.set_vertex_buffer(0, buffer.slice(..));
        render_pass.draw(0..6, 0..self.instance_count); // 6 vertices for quad (2 triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_instance_from_leaf() {
        let leaf = Leaf {
            position: Vec3::new(1.0, 2.0, 3.0),
            base_rotation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            size: 0.5,
            color: Vec4::new(0.2, 0.6, 0.2, 0.85),
            is_green: true,
            branch: Some(4),
        };
        let instance = LeafInstance::from_leaf(&leaf);
        let model = Mat4::from_cols_array_2d(&instance.model_matrix);

        assert_eq!(model.transform_point3(Vec3::ZERO), leaf.position);
        assert!((model.transform_vector3(Vec3::X).length() - 0.5).abs() < 1e-6);
        assert_eq!(instance.color, [0.2, 0.6, 0.2, 0.85]);
    }

    #[test]
    fn test_instance_stride() {
        assert_eq!(std::mem::size_of::<LeafInstance>(), 80);
    }
}
