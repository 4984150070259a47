use std::collections::HashMap;

use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::config::ViewerConfig;
use crate::controller::{FrameRenderer, FrameView};
use crate::model::{Camera, ModelKind, ParticlePool, SceneModel, Shading};
use crate::ui;
use crate::utils::{create_marker_mesh, MeshBuffer, Vertex};
use crate::view::GpuContext;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const MARKER_SIZE: f32 = 0.2;
const MARKER_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const INITIAL_PARTICLE_CAPACITY: usize = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Billboard axes for particles, w unused.
    pub right: [f32; 4],
    pub up: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        let (right, up) = camera.billboard_axes();
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            right: right.extend(0.0).to_array(),
            up: up.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sky: [f32; 4],
    pub ground: [f32; 4],
    /// x: ambient intensity, y: hemisphere intensity
    pub params: [f32; 4],
}

impl LightingUniform {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            sky: [1.0; 4],
            ground: [1.0; 4],
            params: [config.scene.ambient_intensity, config.scene.hemisphere_intensity, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub transform: [[f32; 4]; 4],
    /// x: emissive, y: 1.0 when lit
    pub params: [f32; 4],
}

impl ModelUniform {
    pub fn new(transform: Mat4, shading: Shading) -> Self {
        let params = match shading {
            Shading::Lit { emissive } => [emissive, 1.0, 0.0, 0.0],
            Shading::Unlit => [0.0, 0.0, 0.0, 0.0],
        };
        Self { transform: transform.to_cols_array_2d(), params }
    }

    pub fn for_model(model: &SceneModel) -> Self {
        Self::new(model.transform(), model.model.shading)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub center: [f32; 3],
    pub size: f32,
    pub opacity: f32,
}

/// One billboard per live particle, across all effects.
pub fn particle_instances(pool: &ParticlePool) -> Vec<ParticleInstance> {
    pool.effects()
        .iter()
        .flat_map(|effect| {
            effect.world_positions().map(move |p| ParticleInstance {
                center: p.to_array(),
                size: effect.size,
                opacity: effect.opacity,
            })
        })
        .collect()
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer { ty: BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}

// Shared camera + lighting bindings (group 0)
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
            uniform_entry(1, ShaderStages::FRAGMENT),
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

pub fn create_model_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    model_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("model_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("model_pipeline_layout"),
        bind_group_layouts: &[camera_layout, model_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("model_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // the gift is double sided
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub fn create_particle_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("particle_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/particles.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("particle_pipeline_layout"),
        bind_group_layouts: &[camera_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("particle_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32 },
                    wgpu::VertexAttribute { offset: 16, shader_location: 2, format: wgpu::VertexFormat::Float32 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // test against the scene but never occlude each other
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// Mesh plus its per-draw uniform.
struct GpuModel {
    mesh: MeshBuffer,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuModel {
    fn new(device: &Device, layout: &BindGroupLayout, mesh: MeshBuffer, uniform: ModelUniform, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
        });
        Self { mesh, uniform: buffer, bind_group }
    }

    fn draw(&self, rp: &mut RenderPass<'_>) {
        if self.mesh.index_count == 0 {
            return;
        }
        rp.set_bind_group(1, &self.bind_group, &[]);
        rp.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        rp.set_index_buffer(self.mesh.index_buffer.slice(..), IndexFormat::Uint32);
        rp.draw_indexed(0..self.mesh.index_count, 0, 0..1);
    }
}

/// wgpu renderer for the session, shared by native and web.
pub struct Renderer {
    gpu: GpuContext,
    depth_view: TextureView,
    camera: CameraResources,
    model_layout: BindGroupLayout,
    model_pipeline: RenderPipeline,
    particle_pipeline: RenderPipeline,
    models: HashMap<ModelKind, GpuModel>,
    marker: GpuModel,
    particle_buffer: wgpu::Buffer,
    particle_capacity: usize,
    clear_color: Color,

    egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_input: Option<egui::RawInput>,
    pixels_per_point: f32,
}

fn create_particle_buffer(device: &Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("particle_instances"),
        size: (capacity * std::mem::size_of::<ParticleInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Renderer {
    pub fn new(gpu: GpuContext, config: &ViewerConfig) -> Self {
        let device = gpu.device.as_ref();
        let (_, depth_view) = create_depth_texture(device, gpu.config.width, gpu.config.height);

        let camera = create_camera_resources(device);
        gpu.queue
            .write_buffer(&camera.lighting_buffer, 0, bytemuck::bytes_of(&LightingUniform::from_config(config)));

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_bind_group_layout"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT)],
        });
        let model_pipeline = create_model_pipeline(device, gpu.format, &camera.bind_group_layout, &model_layout);
        let particle_pipeline = create_particle_pipeline(device, gpu.format, &camera.bind_group_layout);

        let marker = GpuModel::new(
            device,
            &model_layout,
            create_marker_mesh(MARKER_SIZE, MARKER_COLOR).upload(device),
            ModelUniform::new(Mat4::IDENTITY, Shading::Unlit),
            "marker",
        );

        let [r, g, b] = config.scene.background_rgb();
        let egui_ctx = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        Self {
            depth_view,
            camera,
            model_layout,
            model_pipeline,
            particle_pipeline,
            models: HashMap::new(),
            marker,
            particle_buffer: create_particle_buffer(device, INITIAL_PARTICLE_CAPACITY),
            particle_capacity: INITIAL_PARTICLE_CAPACITY,
            clear_color: Color { r, g, b, a: 1.0 },
            egui_ctx,
            egui_renderer,
            egui_input: None,
            pixels_per_point: 1.0,
            gpu,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu.config.width, self.gpu.config.height)
    }

    pub fn egui_ctx(&self) -> &egui::Context {
        &self.egui_ctx
    }

    pub fn set_pixels_per_point(&mut self, ppp: f32) {
        if ppp.is_finite() && ppp > 0.0 {
            self.pixels_per_point = ppp;
        }
    }

    /// Use this input for the next overlay pass instead of a bare default.
    pub fn queue_egui_input(&mut self, input: egui::RawInput) {
        self.egui_input = Some(input);
    }

    /// Follow a window size change. Returns true when anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !self.gpu.resize(width, height) {
            return false;
        }
        let (_, depth_view) = create_depth_texture(self.gpu.device.as_ref(), width, height);
        self.depth_view = depth_view;
        tracing::debug!(width, height, "surface resized");
        true
    }

    /// Upload newly ready models and refresh every model's uniform.
    fn sync_models(&mut self, frame: &FrameView<'_>) {
        let device = self.gpu.device.as_ref();
        for kind in [ModelKind::Machine, ModelKind::Gift] {
            let Some(model) = frame.scene.model(kind) else { continue };
            let uniform = ModelUniform::for_model(model);
            match self.models.get(&kind) {
                Some(gpu_model) => {
                    self.gpu.queue.write_buffer(&gpu_model.uniform, 0, bytemuck::bytes_of(&uniform));
                }
                None => {
                    let mesh = model.model.mesh.upload(device);
                    tracing::debug!(model = kind.label(), indices = mesh.index_count, "uploaded model");
                    self.models
                        .insert(kind, GpuModel::new(device, &self.model_layout, mesh, uniform, kind.label()));
                }
            }
        }

        if let Some(position) = frame.scene.marker() {
            let uniform = ModelUniform::new(Mat4::from_translation(position), Shading::Unlit);
            self.gpu.queue.write_buffer(&self.marker.uniform, 0, bytemuck::bytes_of(&uniform));
        }
    }

    /// Write particle instances, growing the buffer when needed.
    fn sync_particles(&mut self, particles: &ParticlePool) -> u32 {
        let instances = particle_instances(particles);
        if instances.is_empty() {
            return 0;
        }
        if instances.len() > self.particle_capacity {
            self.particle_capacity = instances.len().next_power_of_two();
            self.particle_buffer = create_particle_buffer(self.gpu.device.as_ref(), self.particle_capacity);
        }
        self.gpu.queue.write_buffer(&self.particle_buffer, 0, bytemuck::cast_slice(&instances));
        instances.len() as u32
    }

    fn egui_raw_input(&mut self) -> egui::RawInput {
        let (width, height) = self.size();
        let mut raw_input = self.egui_input.take().unwrap_or_default();
        if raw_input.screen_rect.is_none() {
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(width as f32 / self.pixels_per_point, height as f32 / self.pixels_per_point),
            ));
        }
        raw_input
    }

    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), SurfaceError> {
        self.sync_models(frame);
        let particle_count = self.sync_particles(frame.particles);
        self.gpu.queue.write_buffer(
            &self.camera.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(frame.camera)),
        );

        let raw_input = self.egui_raw_input();
        self.egui_ctx.set_pixels_per_point(self.pixels_per_point);
        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, frame.hud);
        let primitives = self
            .egui_ctx
            .tessellate(std::mem::take(&mut full_output.shapes), self.pixels_per_point);
        let (width, height) = self.size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.pixels_per_point,
        };

        let output = self.gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let device = self.gpu.device.as_ref();
        let queue = self.gpu.queue.as_ref();
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Clear(self.clear_color), store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.model_pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            for kind in [ModelKind::Machine, ModelKind::Gift] {
                let visible = frame.scene.model(kind).is_some_and(|m| m.visible);
                if let (true, Some(gpu_model)) = (visible, self.models.get(&kind)) {
                    gpu_model.draw(&mut rp);
                }
            }
            if frame.scene.marker().is_some() {
                self.marker.draw(&mut rp);
            }

            if particle_count > 0 {
                rp.set_pipeline(&self.particle_pipeline);
                rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);
                rp.set_vertex_buffer(0, self.particle_buffer.slice(..));
                rp.draw(0..6, 0..particle_count);
            }
        }

        // Upload egui textures
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, &mut encoder, &primitives, &screen_descriptor);

        // Render egui overlay
        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl FrameRenderer for Renderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        match self.draw(frame) {
            Ok(()) => {}
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                self.gpu.reconfigure();
            }
            Err(SurfaceError::Timeout) => tracing::debug!("surface timeout, frame skipped"),
            Err(e) => tracing::error!(error = %e, "frame skipped"),
        }
    }
}
