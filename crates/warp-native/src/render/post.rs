//! Bloom and chromatic aberration over the offscreen scene color.
//!
//! bright pass (hdr → bloom_a) → blur H (bloom_a → bloom_b) → blur V
//! (bloom_b → bloom_a) → composite (hdr + bloom_a → swapchain). Every pass
//! reads its own uniform buffer: queue writes all land before the encoder runs.

use warp_core::PostEffects;

use super::helpers;
use super::targets::{RenderTargets, HDR_FORMAT};

#[repr(C)]
#[derive(Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct PostUniforms {
    resolution: [f32; 2],
    blur_dir: [f32; 2],
    bloom_strength: f32,
    threshold: f32,
    chromatic_offset_px: f32,
    flash: f32,
}

struct PassUniforms {
    bright: wgpu::Buffer,
    blur_h: wgpu::Buffer,
    blur_v: wgpu::Buffer,
    composite: wgpu::Buffer,
}

struct PostBindGroups {
    bright: wgpu::BindGroup,
    blur_h: wgpu::BindGroup,
    blur_v: wgpu::BindGroup,
    composite_scene: wgpu::BindGroup,
    composite_bloom: wgpu::BindGroup,
}

pub(crate) struct PostChain {
    bgl0: wgpu::BindGroupLayout, // tex+sampler+uniform
    bgl1: wgpu::BindGroupLayout, // tex+sampler
    sampler: wgpu::Sampler,
    uniforms: PassUniforms,
    bind_groups: PostBindGroups,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
}

impl PostChain {
    pub(crate) fn new(
        device: &wgpu::Device,
        post_shader: &wgpu::ShaderModule,
        targets: &RenderTargets,
        swap_format: wgpu::TextureFormat,
    ) -> Self {
        let [tex0, samp0] = helpers::texture_layout_entries(0);
        let bgl0 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl0"),
            entries: &[
                tex0,
                samp0,
                helpers::uniform_layout_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let bgl1 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl1"),
            entries: &helpers::texture_layout_entries(0),
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_linear"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let uniform = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<PostUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniforms = PassUniforms {
            bright: uniform("post_bright"),
            blur_h: uniform("post_blur_h"),
            blur_v: uniform("post_blur_v"),
            composite: uniform("post_composite"),
        };

        let pl_bright_blur = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_0"),
            bind_group_layouts: &[&bgl0],
            push_constant_ranges: &[],
        });
        let pl_composite = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_comp"),
            bind_group_layouts: &[&bgl0, &bgl1],
            push_constant_ranges: &[],
        });
        let bright_pipeline = helpers::make_post_pipeline(
            device,
            &pl_bright_blur,
            post_shader,
            "fs_bright",
            HDR_FORMAT,
            None,
        );
        let blur_pipeline = helpers::make_post_pipeline(
            device,
            &pl_bright_blur,
            post_shader,
            "fs_blur",
            HDR_FORMAT,
            None,
        );
        let composite_pipeline = helpers::make_post_pipeline(
            device,
            &pl_composite,
            post_shader,
            "fs_composite",
            swap_format,
            Some(wgpu::BlendState::REPLACE),
        );

        let bind_groups = build_bind_groups(device, &bgl0, &bgl1, &sampler, &uniforms, targets);
        Self {
            bgl0,
            bgl1,
            sampler,
            uniforms,
            bind_groups,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
        }
    }

    /// Bind groups reference the target views, so rebuild after a resize.
    pub(crate) fn rebuild(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_groups = build_bind_groups(
            device,
            &self.bgl0,
            &self.bgl1,
            &self.sampler,
            &self.uniforms,
            targets,
        );
    }

    pub(crate) fn run(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        output: &wgpu::TextureView,
        effects: &PostEffects,
        flash: f32,
    ) {
        let base = PostUniforms {
            resolution: targets.bloom_resolution(),
            blur_dir: [0.0, 0.0],
            bloom_strength: effects.bloom_strength,
            threshold: effects.bloom_threshold,
            chromatic_offset_px: effects.chromatic_offset_px,
            flash,
        };
        let write = |buffer: &wgpu::Buffer, u: PostUniforms| {
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&u));
        };
        write(&self.uniforms.bright, base);
        write(
            &self.uniforms.blur_h,
            PostUniforms {
                blur_dir: [1.0, 0.0],
                ..base
            },
        );
        write(
            &self.uniforms.blur_v,
            PostUniforms {
                blur_dir: [0.0, 1.0],
                ..base
            },
        );
        write(
            &self.uniforms.composite,
            PostUniforms {
                resolution: targets.resolution(),
                ..base
            },
        );

        let bg = &self.bind_groups;
        blit(
            encoder,
            "bright_pass",
            &targets.bloom_a_view,
            &self.bright_pipeline,
            &bg.bright,
            None,
        );
        blit(
            encoder,
            "blur_h",
            &targets.bloom_b_view,
            &self.blur_pipeline,
            &bg.blur_h,
            None,
        );
        blit(
            encoder,
            "blur_v",
            &targets.bloom_a_view,
            &self.blur_pipeline,
            &bg.blur_v,
            None,
        );
        blit(
            encoder,
            "composite",
            output,
            &self.composite_pipeline,
            &bg.composite_scene,
            Some(&bg.composite_bloom),
        );
    }
}

fn build_bind_groups(
    device: &wgpu::Device,
    bgl0: &wgpu::BindGroupLayout,
    bgl1: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    uniforms: &PassUniforms,
    targets: &RenderTargets,
) -> PostBindGroups {
    let with_uniform = |label: &str, view: &wgpu::TextureView, buffer: &wgpu::Buffer| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bgl0,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
        })
    };
    PostBindGroups {
        bright: with_uniform("bg_bright", &targets.hdr_view, &uniforms.bright),
        blur_h: with_uniform("bg_blur_h", &targets.bloom_a_view, &uniforms.blur_h),
        blur_v: with_uniform("bg_blur_v", &targets.bloom_b_view, &uniforms.blur_v),
        composite_scene: with_uniform("bg_composite", &targets.hdr_view, &uniforms.composite),
        composite_bloom: device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_bloom_a_only"),
            layout: bgl1,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.bloom_a_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }),
    }
}

pub(crate) fn blit(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bg0: &wgpu::BindGroup,
    bg1: Option<&wgpu::BindGroup>,
) {
    let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    r.set_pipeline(pipeline);
    r.set_bind_group(0, bg0, &[]);
    if let Some(g1) = bg1 {
        r.set_bind_group(1, g1, &[]);
    }
    r.draw(0..3, 0..1);
}
