//! Core of the torch audio-reactive feedback renderer.
//!
//! Everything here is platform independent: the frame clock, audio
//! triggering and reduction, parameters, surface roles and the pass
//! sequence. GPU and host integration live in sibling crates.

pub mod analyse;
pub mod audio;
pub mod clock;
pub mod constants;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod software;
pub mod surfaces;
pub mod throttle;

pub use analyse::{mean_weight, peak_pos, PeakPos};
pub use audio::{
    AudioMode, AudioSource, ModulationTexture, OrderIndex, OrderSampler, SilentSource,
    SpectrumAnalyser, TriggerError,
};
pub use clock::{FixedStepSource, FrameClock, FrameTime, InstantSource, TimeSource};
pub use error::TorchError;
pub use params::{ParamStore, ParamValue, Params, QueryOverrides};
pub use pipeline::{
    DrawUniforms, FormUniforms, FrameReport, PassInvocation, PassUniforms, PostUniforms,
    RenderBackend, Renderer, Stage,
};
pub use software::SoftwareBackend;
pub use surfaces::{FeedbackRoles, Shape, SurfaceId, SurfaceManager};
pub use throttle::ResizeThrottle;

pub static FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");
pub static FORM_WGSL: &str = include_str!("../shaders/form.wgsl");
pub static DRAW_WGSL: &str = include_str!("../shaders/draw.wgsl");
pub static BOKEH_WGSL: &str = include_str!("../shaders/bokeh.wgsl");
