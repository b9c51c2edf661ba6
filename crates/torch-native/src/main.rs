//! torch - audio-reactive feedback visualizer (native front-end)
//!
//! Captures the default audio input, renders the Form/Draw/Post feedback
//! loop into a winit window.
//!
//! Keys: S logs the shareable state URL, R re-reads parameters, Esc quits.

mod capture;
mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use capture::CaptureSource;
use cli::Args;
use torch_core::constants::BIN_COUNT;
use torch_core::{AudioSource, ParamStore, Renderer, ResizeThrottle, SilentSource};
use torch_gpu::GpuRenderer;

struct App {
    args: Args,
    store: ParamStore,
    renderer: Renderer,
    audio: Box<dyn AudioSource>,
    throttle: ResizeThrottle,
    started: Instant,

    window: Option<Arc<Window>>,
    gpu: Option<GpuRenderer<'static>>,
}

impl App {
    fn initialize(args: Args) -> anyhow::Result<Self> {
        let store = ParamStore::new(args.overrides()?);
        let params = store.params();
        if !params.track.is_empty() {
            log::info!("track playback is web-only; using the default input device");
        }
        let audio: Box<dyn AudioSource> = match CaptureSource::start() {
            Ok(source) => Box::new(source),
            Err(e) => {
                log::warn!("audio capture unavailable ({e:#}); rendering without audio");
                Box::new(SilentSource::new(BIN_COUNT))
            }
        };
        let renderer = Renderer::new(params, audio.bin_count(), args.debug)?;
        Ok(Self {
            args,
            store,
            renderer,
            audio,
            throttle: ResizeThrottle::default(),
            started: Instant::now(),
            window: None,
            gpu: None,
        })
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn apply_size(&mut self, (width, height): (u32, u32)) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match self.renderer.resize(gpu, width, height) {
            Ok(true) => log::debug!("resized to {width}x{height}"),
            Ok(false) => {}
            Err(e) => log::warn!("resize failed: {e}"),
        }
    }

    fn reload_params(&mut self) {
        let overrides = match self.args.overrides() {
            Ok(q) => q,
            Err(e) => {
                log::warn!("keeping current params: {e:#}");
                return;
            }
        };
        let params = self.store.apply(overrides);
        if let Err(e) = self.renderer.apply_params(params) {
            log::warn!("params rejected: {e}");
        }
    }

    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match self.renderer.render_frame(gpu, &mut self.audio) {
            Ok(_) => {}
            Err(e) if e.is_fatal() => {
                log::error!("{e}");
                event_loop.exit();
            }
            Err(e) => log::debug!("frame skipped: {e}"),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(size) = self.throttle.poll(self.now()) {
            self.apply_size(size);
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("torch")
            .with_inner_size(winit::dpi::PhysicalSize::new(self.args.width, self.args.height));
        let window = match event_loop.create_window(attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("window: {e}");
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();
        let gpu = match pollster::block_on(GpuRenderer::new(
            Arc::clone(&window),
            size.width,
            size.height,
        )) {
            Ok(gpu) => gpu,
            Err(e) => {
                log::error!("gpu: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.apply_size((size.width, size.height));
        log::info!("running; S shares state, R reloads params, Esc quits");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let now = self.now();
                if let Some(size) = self.throttle.notify((size.width, size.height), now) {
                    self.apply_size(size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyS => {
                    log::info!("{}", self.renderer.params().share_url(&self.args.share_base));
                }
                KeyCode::KeyR => self.reload_params(),
                _ => {}
            },
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let mut app = App::initialize(args)?;
    let event_loop = EventLoop::new().context("event loop")?;
    event_loop.run_app(&mut app).context("event loop")?;
    Ok(())
}
