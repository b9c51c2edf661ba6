// Frame loop behaviour: pass ordering, surface roles, resize and feedback
// stability, using a recording backend and the CPU reference backend.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use torch_core::clock::{FixedStepSource, FrameClock, FrameTime};
use torch_core::pipeline::{PassInvocation, PassUniforms, RenderBackend, Renderer, Stage};
use torch_core::surfaces::{Shape, SurfaceId};
use torch_core::{ModulationTexture, Params, SilentSource, SoftwareBackend};

const DT: f64 = 1.0 / 60.0;

#[derive(Default)]
struct Recording {
    resizes: Vec<Shape>,
    frames: Vec<Vec<PassInvocation>>,
    /// Surfaces written since the last resize.
    written: HashSet<SurfaceId>,
    /// Per pass: whether its input had been written since the last resize.
    input_was_written: Vec<bool>,
    modulation_uploads: usize,
}

impl RenderBackend for Recording {
    type Error = Infallible;

    fn resize_surfaces(&mut self, shape: Shape) -> Result<(), Self::Error> {
        self.resizes.push(shape);
        self.written.clear();
        Ok(())
    }

    fn begin_frame(&mut self, _time: FrameTime) -> Result<(), Self::Error> {
        self.frames.push(Vec::new());
        Ok(())
    }

    fn upload_modulation(&mut self, _texture: &ModulationTexture) -> Result<(), Self::Error> {
        self.modulation_uploads += 1;
        Ok(())
    }

    fn render_fullscreen(&mut self, pass: &PassInvocation) -> Result<(), Self::Error> {
        self.input_was_written.push(self.written.contains(&pass.input));
        self.written.insert(pass.target);
        if let Some(frame) = self.frames.last_mut() {
            frame.push(*pass);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn renderer(params: Params) -> Renderer {
    let clock = FrameClock::with_source(Box::new(FixedStepSource::new(DT)));
    Renderer::with_clock(Arc::new(params), 16, false, clock).unwrap()
}

fn never_fails<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => match e {},
    }
}

#[test]
fn passes_run_in_fixed_order() {
    let mut r = renderer(Params::default());
    let mut backend = Recording::default();
    let mut audio = SilentSource::new(16);
    for _ in 0..3 {
        never_fails(r.render_frame(&mut backend, &mut audio));
    }
    assert_eq!(backend.frames.len(), 3);
    assert_eq!(backend.modulation_uploads, 3);
    for frame in &backend.frames {
        let stages: Vec<Stage> = frame.iter().map(|p| p.stage).collect();
        assert_eq!(stages, vec![Stage::Form, Stage::Draw, Stage::Post]);
        assert!(matches!(frame[0].uniforms, PassUniforms::Form(_)));
        assert!(matches!(frame[1].uniforms, PassUniforms::Draw(_)));
        assert!(matches!(frame[2].uniforms, PassUniforms::Post(_)));
    }
}

#[test]
fn form_reads_what_draw_wrote_last_frame() {
    let mut r = renderer(Params::default());
    let mut backend = Recording::default();
    let mut audio = SilentSource::new(16);
    for _ in 0..6 {
        never_fails(r.render_frame(&mut backend, &mut audio));
    }
    for (n, frame) in backend.frames.iter().enumerate() {
        let (form, draw, post) = (&frame[0], &frame[1], &frame[2]);
        assert_ne!(form.target, form.input, "frame {n}: form reads its own target");
        assert_eq!(draw.input, form.target, "frame {n}");
        assert_ne!(draw.target, draw.input, "frame {n}");
        assert_eq!(post.input, draw.target, "frame {n}");
        assert_eq!(post.target, SurfaceId::Screen);
        if n > 0 {
            let previous_draw = &backend.frames[n - 1][1];
            assert_eq!(form.input, previous_draw.target, "frame {n}");
        }
    }
}

#[test]
fn first_frame_reads_zeroed_surface_at_requested_size() {
    let mut r = renderer(Params::default());
    let mut backend = Recording::default();
    let mut audio = SilentSource::new(16);
    never_fails(r.resize(&mut backend, 0, 0));
    assert!(never_fails(r.resize(&mut backend, 800, 600)));
    let report = never_fails(r.render_frame(&mut backend, &mut audio));
    assert_eq!(report.index, 0);
    assert_eq!(report.shape, Shape::new(800, 600));
    assert_eq!(backend.resizes, vec![Shape::new(1, 1), Shape::new(800, 600)]);
    // Form's past has never been written: it is the zeroed allocation.
    assert!(!backend.input_was_written[0]);
    assert!(backend.input_was_written[1]);
    match backend.frames[0][0].uniforms {
        PassUniforms::Form(u) => {
            assert_eq!(u.view_res, [800.0, 600.0]);
            assert!((u.view_size[0] - 800.0 / 600.0).abs() < 1e-6);
            assert!((u.view_size[1] - 1.0).abs() < 1e-6);
            assert_eq!(u.dt, 0.0);
        }
        other => panic!("unexpected first pass {other:?}"),
    }
}

#[test]
fn resize_is_idempotent() {
    let mut r = renderer(Params::default());
    let mut backend = SoftwareBackend::new();
    let mut audio = SilentSource::new(16);
    assert!(never_fails(r.resize(&mut backend, 12, 9)));
    assert!(!never_fails(r.resize(&mut backend, 12, 9)));
    never_fails(r.render_frame(&mut backend, &mut audio));
    assert!(!never_fails(r.resize(&mut backend, 12, 9)));
    assert_eq!(backend.allocations(), 1);
    assert_eq!(backend.shape(), Shape::new(12, 9));

    assert!(never_fails(r.resize(&mut backend, 0, 0)));
    assert_eq!(backend.shape(), Shape::new(1, 1));
    assert_eq!(backend.allocations(), 2);
}

#[test]
fn unsized_renderer_allocates_one_by_one() {
    let mut r = renderer(Params::default());
    let mut backend = SoftwareBackend::new();
    let mut audio = SilentSource::new(16);
    never_fails(r.render_frame(&mut backend, &mut audio));
    assert_eq!(backend.shape(), Shape::new(1, 1));
    assert_eq!(backend.allocations(), 1);
}

#[test]
fn large_dt_is_clamped_for_passes_only() {
    let clock = FrameClock::with_source(Box::new(FixedStepSource::new(2.0)));
    let mut r = Renderer::with_clock(Arc::new(Params::default()), 16, false, clock).unwrap();
    let mut backend = Recording::default();
    let mut audio = SilentSource::new(16);
    never_fails(r.render_frame(&mut backend, &mut audio));
    let report = never_fails(r.render_frame(&mut backend, &mut audio));
    assert!((report.time.dt - 2.0).abs() < 1e-9);
    match backend.frames[1][0].uniforms {
        PassUniforms::Form(u) => assert!((u.dt - 0.25).abs() < 1e-6),
        other => panic!("unexpected pass {other:?}"),
    }
}

#[test]
fn form_field_grows_then_holds_without_growth() {
    let mut r = renderer(Params::default());
    let mut backend = SoftwareBackend::new();
    let mut audio = SilentSource::new(16);
    never_fails(r.resize(&mut backend, 8, 6));
    for _ in 0..30 {
        never_fails(r.render_frame(&mut backend, &mut audio));
    }
    let drawn = r.roles().past();
    let grown = backend.pixel(drawn, 3, 3).w;
    assert!(grown > 0.0, "form field did not grow");

    let frozen = Params::from_query("grow=0&falloff=0");
    assert_eq!(frozen.grow, 0.0);
    r.apply_params(Arc::new(frozen)).unwrap();
    let before: Vec<f32> = backend.surface(drawn).iter().map(|p| p.w).collect();
    for _ in 0..1000 {
        never_fails(r.render_frame(&mut backend, &mut audio));
    }
    let after: Vec<f32> = backend.surface(r.roles().past()).iter().map(|p| p.w).collect();
    assert_eq!(before.len(), after.len());
    for (i, (b, a)) in before.iter().zip(&after).enumerate() {
        assert!((b - a).abs() < 1e-6, "texel {i} drifted from {b} to {a}");
    }
}

#[test]
fn software_frames_stay_finite() {
    let mut r = renderer(Params::default());
    let mut backend = SoftwareBackend::new();
    let mut audio = SilentSource::new(16);
    never_fails(r.resize(&mut backend, 16, 12));
    for _ in 0..20 {
        never_fails(r.render_frame(&mut backend, &mut audio));
    }
    assert_eq!(backend.frames(), 20);
    for id in [SurfaceId::FeedbackA, SurfaceId::FeedbackB, SurfaceId::Screen] {
        assert!(backend.surface(id).iter().all(|p| p.is_finite()), "{id:?}");
    }
}

#[test]
fn apply_params_rebuilds_orders() {
    let mut r = renderer(Params::default());
    assert_eq!(r.sampler().max_order(), 2);
    assert_eq!(r.modulation().rows(), 3);
    r.apply_params(Arc::new(Params::from_query("audioOrders=4"))).unwrap();
    assert_eq!(r.sampler().max_order(), 4);
    assert_eq!(r.modulation().rows(), 5);
    assert!(r.share_query().contains("audioOrders=4"));
}
