//! wgpu renderer for [`SceneFrame`]s.
//!
//! Particles and stars are additive glow billboards. With post effects the
//! scene is drawn into an HDR target and run through [`post::PostChain`];
//! without them it goes straight to the swapchain.

mod helpers;
mod post;
mod targets;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use warp_core::{DeviceProfile, SceneFrame};

use post::PostChain;
use targets::{RenderTargets, HDR_FORMAT};

static PARTICLES_WGSL: &str = include_str!("../shaders/particles.wgsl");
static POST_WGSL: &str = include_str!("../shaders/post.wgsl");

const PARTICLE_SIZE: f32 = 0.6;
const CAMERA_Z: f32 = 100.0;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.004,
    g: 0.0,
    b: 0.012,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

struct PostLayer {
    targets: RenderTargets,
    chain: PostChain,
}

pub struct GpuState<'w> {
    window: &'w Window,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    quad_vb: wgpu::Buffer,
    particle_pipeline: wgpu::RenderPipeline,
    particle_vb: wgpu::Buffer,
    particle_capacity: usize,
    star_pipeline: wgpu::RenderPipeline,
    star_vb: Option<wgpu::Buffer>,
    star_capacity: usize,
    post: Option<PostLayer>,
    width: u32,
    height: u32,
    time: f32,
}

impl<'w> GpuState<'w> {
    pub async fn new(window: &'w Window, profile: &DeviceProfile) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!(
            "[render] adapter={} format={:?} post={}",
            adapter.get_info().name,
            format,
            profile.post_effects_enabled
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particles"),
            source: wgpu::ShaderSource::Wgsl(PARTICLES_WGSL.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[helpers::uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Quad corners for two triangles
        let quad_vertices: [f32; 12] = [
            -0.5, -0.5, 0.5, -0.5, 0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, 0.5,
        ];
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vb"),
            contents: bytemuck::cast_slice(&quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let post = profile.post_effects_enabled.then(|| {
            let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("post"),
                source: wgpu::ShaderSource::Wgsl(POST_WGSL.into()),
            });
            let targets = RenderTargets::new(&device, config.width, config.height);
            let chain = PostChain::new(&device, &post_shader, &targets, format);
            PostLayer { targets, chain }
        });
        let scene_format = if post.is_some() { HDR_FORMAT } else { format };

        let particle_pipeline = helpers::make_glow_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "vs_particle",
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<warp_core::InstanceTransform>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 1,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32,
                        offset: 12,
                        shader_location: 2,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 16,
                        shader_location: 3,
                    },
                ],
            },
            scene_format,
        );
        let star_pipeline = helpers::make_glow_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "vs_star",
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 1,
                }],
            },
            scene_format,
        );

        let particle_capacity = profile.particle_count.max(1);
        let particle_vb = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle_vb"),
            size: (std::mem::size_of::<warp_core::InstanceTransform>() * particle_capacity) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let star_capacity = if profile.ambient_layer_enabled {
            profile.ambient_star_count
        } else {
            0
        };
        let star_vb = (star_capacity > 0).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("star_vb"),
                size: (std::mem::size_of::<[f32; 3]>() * star_capacity) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            width: config.width,
            height: config.height,
            config,
            uniform_buffer,
            bind_group,
            quad_vb,
            particle_pipeline,
            particle_vb,
            particle_capacity,
            star_pipeline,
            star_vb,
            star_capacity,
            post,
            time: 0.0,
        })
    }

    pub fn window(&self) -> &'w Window {
        self.window
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.width = new_size.width;
        self.height = new_size.height;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        if let Some(post) = self.post.as_mut() {
            post.targets.recreate(&self.device, self.width, self.height);
            post.chain.rebuild(&self.device, &post.targets);
        }
    }

    fn view_proj(&self, camera_x: f32) -> [[f32; 4]; 4] {
        let aspect = self.width as f32 / self.height as f32;
        let proj = Mat4::perspective_rh(75f32.to_radians(), aspect, 0.1, 1000.0);
        let view = Mat4::look_at_rh(Vec3::new(camera_x, 0.0, CAMERA_Z), Vec3::ZERO, Vec3::Y);
        (proj * view).to_cols_array_2d()
    }

    pub fn render(&mut self, scene: &SceneFrame<'_>, dt_sec: f32) -> Result<(), wgpu::SurfaceError> {
        self.time += dt_sec;
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let flash = if scene.material.flash_active { 1.0 } else { 0.0 };
        let star_rotation = scene.stars.as_ref().map_or(0.0, |s| s.rotation);
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&SceneUniforms {
                view_proj: self.view_proj(scene.camera_x),
                color: scene.material.to_rgba(),
                params: [star_rotation, self.time, flash, PARTICLE_SIZE],
            }),
        );

        let particles = &scene.particles[..scene.particles.len().min(self.particle_capacity)];
        self.queue
            .write_buffer(&self.particle_vb, 0, bytemuck::cast_slice(particles));

        let mut star_count = 0;
        if let (Some(stars), Some(vb)) = (scene.stars.as_ref(), self.star_vb.as_ref()) {
            let n = stars.positions.len().min(self.star_capacity);
            let packed: Vec<[f32; 3]> = stars.positions[..n].iter().map(|p| p.to_array()).collect();
            self.queue.write_buffer(vb, 0, bytemuck::cast_slice(&packed));
            star_count = n as u32;
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let target = self
                .post
                .as_ref()
                .map_or(&view, |p| &p.targets.hdr_view);
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
            if let (Some(vb), true) = (self.star_vb.as_ref(), star_count > 0) {
                rpass.set_pipeline(&self.star_pipeline);
                rpass.set_vertex_buffer(1, vb.slice(..));
                rpass.draw(0..6, 0..star_count);
            }
            rpass.set_pipeline(&self.particle_pipeline);
            rpass.set_vertex_buffer(1, self.particle_vb.slice(..));
            rpass.draw(0..6, 0..particles.len() as u32);
        }

        if let (Some(post), Some(effects)) = (self.post.as_ref(), scene.post.as_ref()) {
            post.chain
                .run(&self.queue, &mut encoder, &post.targets, &view, effects, flash);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
