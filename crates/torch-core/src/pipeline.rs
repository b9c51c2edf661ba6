//! The three-pass feedback pipeline: Form, Draw, Post.
//!
//! [`Renderer`] owns everything that evolves per frame (clock, order
//! sampler, modulation texture, surface roles) and drives a
//! [`RenderBackend`] through a fixed sequence of full-screen passes. The
//! backend owns the pixels; the renderer only decides what each pass reads,
//! writes and is parameterised with.

use std::sync::Arc;

use crate::analyse::{mean_weight, peak_pos, PeakPos};
use crate::audio::{AudioSource, ModulationTexture, OrderIndex, OrderSampler};
use crate::clock::{FrameClock, FrameTime};
use crate::constants::{MAX_PASS_DT_SEC, REFERENCE_FPS};
use crate::error::{Result, TorchError};
use crate::params::Params;
use crate::surfaces::{FeedbackRoles, Shape, SurfaceId, SurfaceManager};

const DEBUG_LOG_EVERY: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Form,
    Draw,
    Post,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Form => "form_pass",
            Self::Draw => "draw_pass",
            Self::Post => "post_pass",
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FormUniforms {
    pub time: f32,
    pub dt: f32,
    pub view_size: [f32; 2],
    pub view_res: [f32; 2],
    pub falloff: f32,
    pub grow: f32,
    pub grow_limit: f32,
    pub jitter: f32,
    pub past_alpha: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub time: f32,
    pub dt: f32,
    pub view_size: [f32; 2],
    pub view_res: [f32; 2],
    pub peak: f32,
    pub peak_pos: f32,
    pub mean: f32,
    pub harmonies: f32,
    pub attenuate: f32,
    pub silent: f32,
    pub sound_smooth: f32,
    pub sound_warp: f32,
    pub noise_warp: f32,
    pub noise_speed: f32,
    pub noise_scale: f32,
    pub spin: f32,
    pub radius: f32,
    pub thick: f32,
    pub other_radius: f32,
    pub other_thick: f32,
    pub other_edge: f32,
    pub now_alpha: f32,
    /// Row of the modulation texture the light shapes read.
    pub order: f32,
    pub bins: f32,
    pub _pad0: f32,
    pub _pad1: f32,
    pub ambient: [f32; 4],
    pub emit: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub radius: f32,
    pub amount: f32,
    pub _pad: [f32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassUniforms {
    Form(FormUniforms),
    Draw(DrawUniforms),
    Post(PostUniforms),
}

impl PassUniforms {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Form(u) => bytemuck::bytes_of(u),
            Self::Draw(u) => bytemuck::bytes_of(u),
            Self::Post(u) => bytemuck::bytes_of(u),
        }
    }
}

/// One full-screen pass: read `input`, write `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassInvocation {
    pub stage: Stage,
    pub target: SurfaceId,
    pub input: SurfaceId,
    pub uniforms: PassUniforms,
}

/// Storage and execution of the three passes.
///
/// Calls arrive in a fixed order each frame: `begin_frame`,
/// `upload_modulation`, then `render_fullscreen` for Form, Draw and Post,
/// then `end_frame`. `resize_surfaces` is only ever called between frames
/// and must leave both feedback surfaces zeroed at the new shape.
pub trait RenderBackend {
    type Error;

    fn resize_surfaces(&mut self, shape: Shape) -> Result<(), Self::Error>;
    fn begin_frame(&mut self, time: FrameTime) -> Result<(), Self::Error>;
    fn upload_modulation(&mut self, texture: &ModulationTexture) -> Result<(), Self::Error>;
    fn render_fullscreen(&mut self, pass: &PassInvocation) -> Result<(), Self::Error>;
    fn end_frame(&mut self) -> Result<(), Self::Error>;
}

/// What a rendered frame looked like from the renderer's side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub index: u64,
    pub time: FrameTime,
    pub peak: PeakPos,
    pub mean: f32,
    pub shape: Shape,
}

pub struct Renderer {
    params: Arc<Params>,
    clock: FrameClock,
    sampler: OrderSampler,
    modulation: ModulationTexture,
    reduce_order: OrderIndex,
    surfaces: SurfaceManager,
    allocated: Option<Shape>,
    frames: u64,
    debug: bool,
}

impl Renderer {
    pub fn new(params: Arc<Params>, bins: usize, debug: bool) -> Result<Self> {
        Self::with_clock(params, bins, debug, FrameClock::new())
    }

    pub fn with_clock(
        params: Arc<Params>,
        bins: usize,
        debug: bool,
        clock: FrameClock,
    ) -> Result<Self> {
        if bins == 0 {
            return Err(TorchError::NoBins);
        }
        let sampler = OrderSampler::new(bins, params.audio_orders)?;
        let modulation = ModulationTexture::for_sampler(&sampler);
        let reduce_order = sampler.order(-1)?;
        log::info!(
            "renderer: {bins} bins, {} orders, mode {}",
            params.audio_orders,
            params.audio_mode
        );
        for pair in params.serialize() {
            log::info!("{pair}");
        }
        Ok(Self {
            params,
            clock,
            sampler,
            modulation,
            reduce_order,
            surfaces: SurfaceManager::new(),
            allocated: None,
            frames: 0,
            debug,
        })
    }

    pub fn params(&self) -> &Arc<Params> {
        &self.params
    }

    pub fn sampler(&self) -> &OrderSampler {
        &self.sampler
    }

    pub fn modulation(&self) -> &ModulationTexture {
        &self.modulation
    }

    pub fn shape(&self) -> Shape {
        self.surfaces.shape()
    }

    pub fn roles(&self) -> &FeedbackRoles {
        self.surfaces.roles()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// The current parameters as a shareable query string.
    pub fn share_query(&self) -> String {
        self.params.query_string()
    }

    /// Swap in a re-constructed parameter set. Surfaces keep their contents;
    /// the order sampler is only rebuilt if the order count changed.
    pub fn apply_params(&mut self, params: Arc<Params>) -> Result<()> {
        if params.audio_orders != self.sampler.max_order() {
            let sampler = OrderSampler::new(self.sampler.bins(), params.audio_orders)?;
            self.reduce_order = sampler.order(-1)?;
            self.modulation = ModulationTexture::for_sampler(&sampler);
            self.sampler = sampler;
        }
        self.params = params;
        log::info!("params applied: {}", self.params.query_string());
        Ok(())
    }

    /// Adopt a new viewport size, reallocating surfaces only if it changed.
    pub fn resize<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<bool, B::Error> {
        if self.surfaces.resize(width, height).is_none() && self.allocated.is_some() {
            return Ok(false);
        }
        self.allocate(backend)?;
        Ok(true)
    }

    fn allocate<B: RenderBackend>(&mut self, backend: &mut B) -> Result<(), B::Error> {
        let shape = self.surfaces.shape();
        log::debug!("allocating surfaces {}x{}", shape.width, shape.height);
        backend.resize_surfaces(shape)?;
        self.allocated = Some(shape);
        Ok(())
    }

    /// Advance one frame: tick the clock, sample audio, run Form, Draw and
    /// Post in that order.
    pub fn render_frame<B, A>(&mut self, backend: &mut B, audio: &mut A) -> Result<FrameReport, B::Error>
    where
        B: RenderBackend,
        A: AudioSource + ?Sized,
    {
        if self.allocated != Some(self.surfaces.shape()) {
            self.allocate(backend)?;
        }

        let time = self.clock.tick();
        self.sampler.sample(time.dt, self.params.audio_mode, audio);
        self.modulation.rebuild(&self.sampler);
        let reduced = self.sampler.data_order(self.reduce_order);
        let peak = peak_pos(reduced);
        let mean = mean_weight(reduced, self.params.mean_fulcrum);

        let shape = self.surfaces.shape();
        let roles = *self.surfaces.roles();
        let pass_time = FrameTime {
            time: time.time,
            dt: time.dt.min(MAX_PASS_DT_SEC),
        };

        backend.begin_frame(time)?;
        backend.upload_modulation(&self.modulation)?;
        backend.render_fullscreen(&PassInvocation {
            stage: Stage::Form,
            target: roles.form_target(),
            input: roles.past(),
            uniforms: PassUniforms::Form(self.form_uniforms(pass_time, shape)),
        })?;
        backend.render_fullscreen(&PassInvocation {
            stage: Stage::Draw,
            target: roles.draw_target(),
            input: roles.form_target(),
            uniforms: PassUniforms::Draw(self.draw_uniforms(pass_time, shape, peak, mean)),
        })?;
        backend.render_fullscreen(&PassInvocation {
            stage: Stage::Post,
            target: SurfaceId::Screen,
            input: roles.draw_target(),
            uniforms: PassUniforms::Post(self.post_uniforms(pass_time, shape)),
        })?;
        backend.end_frame()?;

        self.surfaces.roles_mut().finish_frame(roles.draw_target());
        let report = FrameReport {
            index: self.frames,
            time,
            peak,
            mean,
            shape,
        };
        self.frames += 1;
        if self.debug && report.index % DEBUG_LOG_EVERY == 0 {
            log::debug!(
                "frame {} t={:.2} dt={:.4} peak={:.3}@{:.3} mean={:.3}",
                report.index,
                time.time,
                time.dt,
                peak.peak,
                peak.pos,
                mean
            );
        }
        Ok(report)
    }

    fn form_uniforms(&self, t: FrameTime, shape: Shape) -> FormUniforms {
        let p = &self.params;
        FormUniforms {
            time: t.time as f32,
            dt: t.dt as f32,
            view_size: shape.view_size().to_array(),
            view_res: shape.view_res().to_array(),
            falloff: p.falloff,
            grow: p.grow,
            grow_limit: p.grow_limit,
            jitter: p.jitter,
            past_alpha: p.past_alpha,
            _pad: 0.0,
        }
    }

    fn draw_uniforms(&self, t: FrameTime, shape: Shape, peak: PeakPos, mean: f32) -> DrawUniforms {
        let p = &self.params;
        DrawUniforms {
            time: t.time as f32,
            dt: t.dt as f32,
            view_size: shape.view_size().to_array(),
            view_res: shape.view_res().to_array(),
            peak: peak.peak,
            peak_pos: peak.pos,
            mean,
            harmonies: p.harmonies,
            attenuate: p.attenuate,
            silent: p.silent,
            sound_smooth: p.sound_smooth,
            sound_warp: p.sound_warp,
            noise_warp: p.noise_warp,
            noise_speed: p.noise_speed,
            noise_scale: p.noise_scale,
            spin: p.spin,
            radius: p.radius,
            thick: p.thick,
            other_radius: p.other_radius,
            other_thick: p.other_thick,
            other_edge: p.other_edge,
            now_alpha: p.now_alpha,
            order: self.reduce_order.get() as f32,
            bins: self.sampler.bins() as f32,
            _pad0: 0.0,
            _pad1: 0.0,
            ambient: p.ambient,
            emit: p.emit,
        }
    }

    fn post_uniforms(&self, t: FrameTime, shape: Shape) -> PostUniforms {
        PostUniforms {
            resolution: shape.view_res().to_array(),
            time: t.time as f32,
            radius: self.params.bokeh_radius,
            amount: self.params.bokeh_amount,
            _pad: [0.0; 3],
        }
    }
}

/// Per-frame tunables are expressed at 60 fps; scale them by elapsed frames.
pub fn frame_scale(dt: f32) -> f32 {
    dt * REFERENCE_FPS as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_shader_layouts() {
        assert_eq!(std::mem::size_of::<FormUniforms>(), 48);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 144);
        assert_eq!(std::mem::size_of::<PostUniforms>(), 32);
        assert_eq!(std::mem::offset_of!(DrawUniforms, ambient), 112);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Form.label(), "form_pass");
        assert_eq!(Stage::Post.label(), "post_pass");
    }
}
