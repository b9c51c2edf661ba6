//! wgpu implementation of the torch render backend.
//!
//! One `GpuRenderer` owns the presentation surface, the two feedback
//! textures and the three pass pipelines. Frames are recorded into a single
//! command encoder between `begin_frame` and `end_frame`.

mod helpers;
mod passes;
mod targets;

use thiserror::Error;
use torch_core::clock::FrameTime;
use torch_core::{ModulationTexture, PassInvocation, RenderBackend, Shape, Stage, SurfaceId};

use passes::{AudioTexture, InputBindGroups, PassResources};
use targets::FeedbackTargets;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("request_device error: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("{0:?} has no bind group for input {1:?}")]
    MissingInput(Stage, SurfaceId),
    #[error("pass recorded outside begin_frame/end_frame")]
    NoFrame,
}

impl GpuError {
    /// Whether the frame loop should stop rather than skip a frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Surface(wgpu::SurfaceError::OutOfMemory))
    }
}

struct Frame {
    surface_tex: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct GpuRenderer<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    passes: PassResources,
    targets: FeedbackTargets,
    inputs: InputBindGroups,
    audio: AudioTexture,
    frame: Option<Frame>,
}

impl<'a> GpuRenderer<'a> {
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'a>>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let shape = Shape::new(width, height);
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(target)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // Default limits so older WebGPU implementations accept the request
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: shape.width,
            height: shape.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "gpu: {} ({:?}), surface {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            shape.width,
            shape.height
        );

        let passes = passes::create_pass_resources(&device, format);
        let targets = FeedbackTargets::new(&device, shape);
        let inputs = InputBindGroups::new(&device, &passes, &targets);
        let audio = AudioTexture::new(&device, &passes.audio_bgl, 1, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            passes,
            targets,
            inputs,
            audio,
            frame: None,
        })
    }

    pub fn size(&self) -> Shape {
        Shape::new(self.config.width, self.config.height)
    }

    /// Re-apply the surface configuration after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

impl RenderBackend for GpuRenderer<'_> {
    type Error = GpuError;

    fn resize_surfaces(&mut self, shape: Shape) -> Result<(), GpuError> {
        // A frame in flight refers to the old textures; drop it unpresented.
        self.frame = None;
        self.config.width = shape.width;
        self.config.height = shape.height;
        self.surface.configure(&self.device, &self.config);
        self.targets.recreate(&self.device, shape);
        self.inputs = InputBindGroups::new(&self.device, &self.passes, &self.targets);
        Ok(())
    }

    fn begin_frame(&mut self, _time: FrameTime) -> Result<(), GpuError> {
        let surface_tex = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.reconfigure();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let view = surface_tex
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        self.frame = Some(Frame {
            surface_tex,
            view,
            encoder,
        });
        Ok(())
    }

    fn upload_modulation(&mut self, texture: &ModulationTexture) -> Result<(), GpuError> {
        let (cols, rows) = (texture.cols() as u32, texture.rows() as u32);
        if !self.audio.matches(cols, rows) {
            log::debug!("audio texture {cols}x{rows}");
            self.audio = AudioTexture::new(&self.device, &self.passes.audio_bgl, cols, rows);
        }
        self.audio.write(&self.queue, texture.data());
        Ok(())
    }

    fn render_fullscreen(&mut self, pass: &PassInvocation) -> Result<(), GpuError> {
        let frame = self.frame.as_mut().ok_or(GpuError::NoFrame)?;
        let bg0 = self
            .inputs
            .get(pass.stage, pass.input)
            .ok_or(GpuError::MissingInput(pass.stage, pass.input))?;
        let (pipeline, uniforms, bg1) = match pass.stage {
            Stage::Form => (&self.passes.form_pipeline, &self.passes.form_uniforms, None),
            Stage::Draw => (
                &self.passes.draw_pipeline,
                &self.passes.draw_uniforms,
                Some(&self.audio.bind_group),
            ),
            Stage::Post => (&self.passes.post_pipeline, &self.passes.post_uniforms, None),
        };
        // Each uniform buffer is used by exactly one pass per submit.
        self.queue
            .write_buffer(uniforms, 0, pass.uniforms.as_bytes());
        let target = match self.targets.view(pass.target) {
            Some(view) => view,
            None => &frame.view,
        };
        helpers::blit(
            &mut frame.encoder,
            pass.stage.label(),
            target,
            pipeline,
            bg0,
            bg1,
        );
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        let frame = self.frame.take().ok_or(GpuError::NoFrame)?;
        self.queue.submit(Some(frame.encoder.finish()));
        frame.surface_tex.present();
        Ok(())
    }
}
