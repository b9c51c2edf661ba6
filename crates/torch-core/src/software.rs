//! CPU reference backend.
//!
//! Runs the same three passes as the WGSL shaders on plain `Vec4` buffers.
//! Used for headless runs and for checking feedback behaviour in tests;
//! nothing here is tuned for speed.

use std::convert::Infallible;
use std::f32::consts::TAU;

use glam::{Vec2, Vec3, Vec4};

use crate::audio::ModulationTexture;
use crate::clock::FrameTime;
use crate::pipeline::{
    frame_scale, DrawUniforms, FormUniforms, PassInvocation, PassUniforms, PostUniforms,
    RenderBackend,
};
use crate::surfaces::{Shape, SurfaceId};

const BOKEH_TAPS: usize = 12;
const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug, Default)]
pub struct SoftwareBackend {
    shape: Shape,
    feedback_a: Vec<Vec4>,
    feedback_b: Vec<Vec4>,
    screen: Vec<Vec4>,
    scratch: Vec<Vec4>,
    modulation: Vec<f32>,
    modulation_cols: usize,
    allocations: usize,
    frames: u64,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of times surfaces have been (re)allocated.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn surface(&self, id: SurfaceId) -> &[Vec4] {
        match id {
            SurfaceId::FeedbackA => &self.feedback_a,
            SurfaceId::FeedbackB => &self.feedback_b,
            SurfaceId::Screen => &self.screen,
        }
    }

    pub fn pixel(&self, id: SurfaceId, x: u32, y: u32) -> Vec4 {
        let x = x.min(self.shape.width - 1) as usize;
        let y = y.min(self.shape.height - 1) as usize;
        self.surface(id)[y * self.shape.width as usize + x]
    }

    fn surface_mut(&mut self, id: SurfaceId) -> &mut Vec<Vec4> {
        match id {
            SurfaceId::FeedbackA => &mut self.feedback_a,
            SurfaceId::FeedbackB => &mut self.feedback_b,
            SurfaceId::Screen => &mut self.screen,
        }
    }

    fn modulation_at(&self, row: usize, x: f32) -> f32 {
        if self.modulation_cols == 0 {
            return 0.0;
        }
        let col = ((x.clamp(0.0, 1.0) * self.modulation_cols as f32) as usize)
            .min(self.modulation_cols - 1);
        self.modulation
            .get(row * self.modulation_cols + col)
            .copied()
            .unwrap_or(0.0)
    }

    fn run_pass(&mut self, pass: &PassInvocation) {
        let shape = self.shape;
        let mut out = std::mem::take(&mut self.scratch);
        out.clear();
        out.reserve(shape.texel_count());
        {
            let input = self.surface(pass.input);
            let sample = |uv: Vec2| sample_nearest(input, shape, uv);
            for y in 0..shape.height {
                for x in 0..shape.width {
                    let uv = Vec2::new(
                        (x as f32 + 0.5) / shape.width as f32,
                        (y as f32 + 0.5) / shape.height as f32,
                    );
                    let texel = match &pass.uniforms {
                        PassUniforms::Form(u) => form(u, uv, &sample),
                        PassUniforms::Draw(u) => draw(u, uv, sample(uv), |row, x| {
                            self.modulation_at(row, x)
                        }),
                        PassUniforms::Post(u) => post(u, uv, &sample),
                    };
                    out.push(texel);
                }
            }
        }
        let target = self.surface_mut(pass.target);
        std::mem::swap(target, &mut out);
        self.scratch = out;
    }
}

impl RenderBackend for SoftwareBackend {
    type Error = Infallible;

    fn resize_surfaces(&mut self, shape: Shape) -> Result<(), Self::Error> {
        let n = shape.texel_count();
        self.shape = shape;
        self.feedback_a = vec![Vec4::ZERO; n];
        self.feedback_b = vec![Vec4::ZERO; n];
        self.screen = vec![Vec4::ZERO; n];
        self.scratch = Vec::with_capacity(n);
        self.allocations += 1;
        Ok(())
    }

    fn begin_frame(&mut self, _time: FrameTime) -> Result<(), Self::Error> {
        Ok(())
    }

    fn upload_modulation(&mut self, texture: &ModulationTexture) -> Result<(), Self::Error> {
        self.modulation.clear();
        self.modulation.extend_from_slice(texture.data());
        self.modulation_cols = texture.cols();
        Ok(())
    }

    fn render_fullscreen(&mut self, pass: &PassInvocation) -> Result<(), Self::Error> {
        debug_assert_ne!(pass.input, pass.target);
        self.run_pass(pass);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), Self::Error> {
        self.frames += 1;
        Ok(())
    }
}

fn sample_nearest(buf: &[Vec4], shape: Shape, uv: Vec2) -> Vec4 {
    if buf.is_empty() {
        return Vec4::ZERO;
    }
    let x = ((uv.x * shape.width as f32).floor() as i64).clamp(0, shape.width as i64 - 1);
    let y = ((uv.y * shape.height as f32).floor() as i64).clamp(0, shape.height as i64 - 1);
    buf[y as usize * shape.width as usize + x as usize]
}

/// Cheap deterministic hash in `[0, 1)`, mirrored in the shaders.
pub fn hash21(p: Vec2) -> f32 {
    let h = (p.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.547;
    h - h.floor()
}

fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let a = hash21(i);
    let b = hash21(i + Vec2::X);
    let c = hash21(i + Vec2::Y);
    let d = hash21(i + Vec2::ONE);
    let ab = a + (b - a) * u.x;
    let cd = c + (d - c) * u.x;
    ab + (cd - ab) * u.y
}

fn ring(d: f32, radius: f32, thick: f32) -> f32 {
    (1.0 - (d - radius).abs() / thick.max(1e-6)).max(0.0)
}

fn form(u: &FormUniforms, uv: Vec2, sample: impl Fn(Vec2) -> Vec4) -> Vec4 {
    let offset = Vec2::new(
        hash21(uv + Vec2::splat(u.time)) * 2.0 - 1.0,
        hash21(Vec2::new(uv.y, uv.x) - Vec2::splat(u.time)) * 2.0 - 1.0,
    ) * u.jitter;
    let past = sample(uv + offset);
    let s = frame_scale(u.dt);
    let field = (past.w * (1.0 - u.falloff * s) + u.grow * s).min(u.grow_limit);
    (past.truncate() * u.past_alpha).extend(field)
}

fn draw(u: &DrawUniforms, uv: Vec2, formed: Vec4, audio: impl Fn(usize, f32) -> f32) -> Vec4 {
    let view_size = Vec2::from(u.view_size);
    let mut p = (uv * 2.0 - Vec2::ONE) * view_size;

    let warp = value_noise(p / u.noise_scale.max(1e-6) + Vec2::splat(u.time * u.noise_speed));
    p += Vec2::splat((warp - 0.5) * u.noise_warp);

    let angle = p.y.atan2(p.x) + u.time * u.spin * TAU;
    let around = (angle / TAU * u.harmonies).rem_euclid(1.0);
    let row = u.order as usize;
    let raw = audio(row, around);
    let smooth = audio(row, (around + u.sound_smooth * 0.5).rem_euclid(1.0));
    let sound = (raw + (smooth - raw) * u.sound_smooth - u.silent).max(0.0);

    let d = p.length();
    let now = ring(d, u.radius + sound * u.sound_warp * 100.0, u.thick);
    let other = ring(d, u.other_radius + u.peak_pos * u.sound_warp * 100.0, u.other_thick)
        .powf(u.other_edge.max(1e-3))
        * u.mean.abs();
    let light = (now + other) * u.now_alpha;

    let emit = Vec3::new(u.emit[0], u.emit[1], u.emit[2]) * u.emit[3];
    let ambient = Vec3::new(u.ambient[0], u.ambient[1], u.ambient[2]) * u.ambient[3];
    let lit = ambient * u.attenuate * formed.w * (1.0 + u.peak.abs());
    (formed.truncate() + emit * light + lit).extend(formed.w)
}

fn post(u: &PostUniforms, uv: Vec2, sample: impl Fn(Vec2) -> Vec4) -> Vec4 {
    let center = sample(uv);
    let res = Vec2::from(u.resolution).max(Vec2::ONE);
    let mut sum = Vec3::ZERO;
    for i in 0..BOKEH_TAPS {
        let r = ((i as f32 + 0.5) / BOKEH_TAPS as f32).sqrt() * u.radius;
        let a = i as f32 * GOLDEN_ANGLE;
        let offset = Vec2::new(a.cos(), a.sin()) * r / res;
        sum += sample(uv + offset).truncate();
    }
    let blurred = sum / BOKEH_TAPS as f32;
    let mix = (u.amount * 0.01).clamp(0.0, 1.0);
    center.truncate().lerp(blurred, mix).extend(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_in_unit_range() {
        for i in 0..100 {
            let h = hash21(Vec2::new(i as f32 * 0.37, i as f32 * 1.3));
            assert!((0.0..1.0).contains(&h));
        }
    }

    #[test]
    fn form_grows_toward_limit() {
        let u = FormUniforms {
            dt: 1.0 / 60.0,
            grow: 0.5,
            grow_limit: 0.8,
            past_alpha: 1.0,
            ..Default::default()
        };
        let a = form(&u, Vec2::splat(0.5), |_| Vec4::ZERO);
        assert!((a.w - 0.5).abs() < 1e-5);
        let b = form(&u, Vec2::splat(0.5), |_| a);
        assert!((b.w - 0.8).abs() < 1e-6);
    }

    #[test]
    fn resize_zeroes_and_counts() {
        let mut b = SoftwareBackend::new();
        b.resize_surfaces(Shape::new(3, 2)).unwrap();
        assert_eq!(b.surface(SurfaceId::FeedbackA).len(), 6);
        assert!(b.surface(SurfaceId::FeedbackB).iter().all(|p| *p == Vec4::ZERO));
        assert_eq!(b.allocations(), 1);
    }
}
