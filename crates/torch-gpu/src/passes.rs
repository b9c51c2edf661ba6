use torch_core::{DrawUniforms, FormUniforms, PostUniforms, SurfaceId, BOKEH_WGSL, DRAW_WGSL, FORM_WGSL};

use super::helpers;
use super::targets::{FeedbackTargets, FEEDBACK_FORMAT};

/// Pipelines, layouts and uniform buffers for the three passes. Created
/// once; only the bind groups in [`InputBindGroups`] depend on surface size.
pub(crate) struct PassResources {
    pub(crate) input_bgl: wgpu::BindGroupLayout, // tex+sampler+uniform
    pub(crate) audio_bgl: wgpu::BindGroupLayout, // unfilterable audio texture
    pub(crate) form_uniforms: wgpu::Buffer,
    pub(crate) draw_uniforms: wgpu::Buffer,
    pub(crate) post_uniforms: wgpu::Buffer,
    pub(crate) form_pipeline: wgpu::RenderPipeline,
    pub(crate) draw_pipeline: wgpu::RenderPipeline,
    pub(crate) post_pipeline: wgpu::RenderPipeline,
    pub(crate) sampler: wgpu::Sampler,
}

pub(crate) fn create_pass_resources(
    device: &wgpu::Device,
    swap_format: wgpu::TextureFormat,
) -> PassResources {
    let input_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("pass_input_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });
    let audio_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("audio_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
            },
            count: None,
        }],
    });

    let pl_single = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pl_pass"),
        bind_group_layouts: &[&input_bgl],
        push_constant_ranges: &[],
    });
    let pl_draw = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pl_draw"),
        bind_group_layouts: &[&input_bgl, &audio_bgl],
        push_constant_ranges: &[],
    });

    let form_shader = helpers::pass_shader(device, "form_shader", FORM_WGSL);
    let draw_shader = helpers::pass_shader(device, "draw_shader", DRAW_WGSL);
    let bokeh_shader = helpers::pass_shader(device, "bokeh_shader", BOKEH_WGSL);
    let form_pipeline = helpers::make_fullscreen_pipeline(
        device,
        "form_pipeline",
        &pl_single,
        &form_shader,
        "fs_form",
        FEEDBACK_FORMAT,
    );
    let draw_pipeline = helpers::make_fullscreen_pipeline(
        device,
        "draw_pipeline",
        &pl_draw,
        &draw_shader,
        "fs_draw",
        FEEDBACK_FORMAT,
    );
    let post_pipeline = helpers::make_fullscreen_pipeline(
        device,
        "post_pipeline",
        &pl_single,
        &bokeh_shader,
        "fs_bokeh",
        swap_format,
    );

    // Nearest filtering keeps the feedback field from blurring frame to frame.
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("feedback_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    PassResources {
        form_uniforms: helpers::uniform_buffer(
            device,
            "form_uniforms",
            std::mem::size_of::<FormUniforms>(),
        ),
        draw_uniforms: helpers::uniform_buffer(
            device,
            "draw_uniforms",
            std::mem::size_of::<DrawUniforms>(),
        ),
        post_uniforms: helpers::uniform_buffer(
            device,
            "post_uniforms",
            std::mem::size_of::<PostUniforms>(),
        ),
        input_bgl,
        audio_bgl,
        form_pipeline,
        draw_pipeline,
        post_pipeline,
        sampler,
    }
}

/// Group 0 for each pass, one per feedback surface it may read from.
pub(crate) struct InputBindGroups {
    form: [wgpu::BindGroup; 2],
    draw: [wgpu::BindGroup; 2],
    post: [wgpu::BindGroup; 2],
}

impl InputBindGroups {
    pub(crate) fn new(device: &wgpu::Device, res: &PassResources, targets: &FeedbackTargets) -> Self {
        let make = |label: &str, view: &wgpu::TextureView, uniforms: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &res.input_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&res.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
        };
        let (a, b) = (&targets.a_view, &targets.b_view);
        Self {
            form: [
                make("bg_form_from_a", a, &res.form_uniforms),
                make("bg_form_from_b", b, &res.form_uniforms),
            ],
            draw: [
                make("bg_draw_from_a", a, &res.draw_uniforms),
                make("bg_draw_from_b", b, &res.draw_uniforms),
            ],
            post: [
                make("bg_post_from_a", a, &res.post_uniforms),
                make("bg_post_from_b", b, &res.post_uniforms),
            ],
        }
    }

    pub(crate) fn get(&self, stage: torch_core::Stage, input: SurfaceId) -> Option<&wgpu::BindGroup> {
        let slot = match input {
            SurfaceId::FeedbackA => 0,
            SurfaceId::FeedbackB => 1,
            SurfaceId::Screen => return None,
        };
        let set = match stage {
            torch_core::Stage::Form => &self.form,
            torch_core::Stage::Draw => &self.draw,
            torch_core::Stage::Post => &self.post,
        };
        Some(&set[slot])
    }
}

/// Modulation rows as an `R32Float` texture, one texel row per order.
pub(crate) struct AudioTexture {
    pub(crate) tex: wgpu::Texture,
    pub(crate) bind_group: wgpu::BindGroup,
    cols: u32,
    rows: u32,
}

impl AudioTexture {
    pub(crate) fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, cols: u32, rows: u32) -> Self {
        let (cols, rows) = (cols.max(1), rows.max(1));
        let (tex, view) = helpers::create_color_texture(
            device,
            "audio_tex",
            cols,
            rows,
            wgpu::TextureFormat::R32Float,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_audio"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });
        Self {
            tex,
            bind_group,
            cols,
            rows,
        }
    }

    pub(crate) fn matches(&self, cols: u32, rows: u32) -> bool {
        self.cols == cols.max(1) && self.rows == rows.max(1)
    }

    pub(crate) fn write(&self, queue: &wgpu::Queue, data: &[f32]) {
        if data.len() != (self.cols * self.rows) as usize {
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.cols * 4),
                rows_per_image: Some(self.rows),
            },
            wgpu::Extent3d {
                width: self.cols,
                height: self.rows,
                depth_or_array_layers: 1,
            },
        );
    }
}
