#![cfg(target_arch = "wasm32")]
//! Browser front-end: WebGPU canvas, WebAudio track analysis and the
//! `requestAnimationFrame` loop.

mod audio;
mod dom;

use std::cell::RefCell;
use std::rc::Rc;

use instant::Instant;
use torch_core::constants::BIN_COUNT;
use torch_core::{AudioSource, ParamStore, QueryOverrides, Renderer, ResizeThrottle, SilentSource};
use torch_gpu::GpuRenderer;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use audio::TrackPlayer;

struct WebState {
    store: ParamStore,
    renderer: Renderer,
    gpu: GpuRenderer<'static>,
    audio: Box<dyn AudioSource>,
    player: Option<TrackPlayer>,
    throttle: ResizeThrottle,
    canvas: web::HtmlCanvasElement,
    started: Instant,
    stopped: bool,
}

impl WebState {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn apply_size(&mut self, size: (u32, u32)) {
        dom::set_canvas_size(&self.canvas, size);
        if let Err(e) = self.renderer.resize(&mut self.gpu, size.0, size.1) {
            log::warn!("resize failed: {e}");
        }
    }

    fn frame(&mut self) {
        if let Some(size) = self.throttle.poll(self.now()) {
            self.apply_size(size);
        }
        match self.renderer.render_frame(&mut self.gpu, &mut self.audio) {
            Ok(_) => {}
            Err(e) if e.is_fatal() => {
                log::error!("{e}; stopping");
                self.stopped = true;
            }
            Err(e) => log::debug!("frame skipped: {e}"),
        }
    }

    fn apply_overrides(&mut self, overrides: QueryOverrides) {
        let params = self.store.apply(overrides);
        if let Err(e) = self.renderer.apply_params(params) {
            log::warn!("params rejected: {e}");
        }
    }
}

thread_local! {
    static STATE: RefCell<Option<Rc<RefCell<WebState>>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let location = web::window().map(|w| w.location());
    let query = location
        .and_then(|l| l.search().ok())
        .unwrap_or_default();
    let debug = QueryOverrides::parse(&query).contains("debug");
    console_log::init_with_level(if debug { log::Level::Debug } else { log::Level::Info }).ok();
    log::info!("torch-web starting");

    spawn_local(async move {
        let canvas = match dom::window_document().map(|d| dom::find_or_create_canvas(&d)) {
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                log::error!("init error: {:?}", e);
                return;
            }
            None => {
                log::error!("init error: no document");
                return;
            }
        };
        if let Err(e) = initialize(canvas, &query, debug).await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

/// Build the renderer on `canvas` with parameters from `query` and start
/// the frame loop.
pub async fn initialize(
    canvas: web::HtmlCanvasElement,
    query: &str,
    debug: bool,
) -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;

    let store = ParamStore::from_query(query);
    let params = store.params();

    let (player, audio): (Option<TrackPlayer>, Box<dyn AudioSource>) = if params.track.is_empty() {
        log::warn!("no track= given; rendering without audio");
        (None, Box::new(SilentSource::new(BIN_COUNT)))
    } else {
        match TrackPlayer::new(&params) {
            Ok((player, analyser)) => (Some(player), Box::new(analyser)),
            Err(e) => {
                log::warn!("audio unavailable ({e:#}); rendering without audio");
                (None, Box::new(SilentSource::new(BIN_COUNT)))
            }
        }
    };

    let size = dom::canvas_backing_size(&canvas);
    dom::set_canvas_size(&canvas, size);
    let gpu = GpuRenderer::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), size.0, size.1)
        .await
        .map_err(|e| anyhow::anyhow!(format!("WebGPU init error: {e}")))?;
    let renderer = Renderer::new(params, audio.bin_count(), debug)?;

    let state = Rc::new(RefCell::new(WebState {
        store,
        renderer,
        gpu,
        audio,
        player,
        throttle: ResizeThrottle::default(),
        canvas: canvas.clone(),
        started: Instant::now(),
        stopped: false,
    }));
    state.borrow_mut().apply_size(size);
    STATE.with(|s| *s.borrow_mut() = Some(state.clone()));

    // Throttled resize
    {
        let state = state.clone();
        dom::on_event(&window, "resize", move || {
            let mut st = state.borrow_mut();
            let size = dom::canvas_backing_size(&st.canvas);
            let now = st.now();
            if let Some(size) = st.throttle.notify(size, now) {
                st.apply_size(size);
            }
        });
    }

    // Autoplay is usually blocked until a gesture
    {
        let state = state.clone();
        dom::on_event(&document, "click", move || {
            if let Some(player) = &state.borrow().player {
                player.play();
            }
        });
        if let Some(player) = &state.borrow().player {
            player.play();
        }
    }

    {
        let state = state.clone();
        dom::add_button(&document, "show state", move || {
            let Some(w) = web::window() else {
                return;
            };
            let href = w.location().href().unwrap_or_default();
            let url = state.borrow().renderer.params().share_url(&href);
            let _ = w.prompt_with_message_and_default("Current state:", &url);
        })?;
    }

    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let mut st = state.borrow_mut();
        st.frame();
        if st.stopped {
            return;
        }
        if let (Some(w), Some(cb)) = (web::window(), tick_clone.borrow().as_ref()) {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut()>));
    if let (Some(w), Some(cb)) = (web::window(), tick.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
    Ok(())
}

/// Rebuild parameters from `query`, or from the page URL when omitted.
#[wasm_bindgen]
pub fn apply_params(query: Option<String>) {
    let query = query
        .or_else(|| web::window().and_then(|w| w.location().search().ok()))
        .unwrap_or_default();
    STATE.with(|s| {
        if let Some(state) = s.borrow().as_ref() {
            state.borrow_mut().apply_overrides(QueryOverrides::parse(&query));
        }
    });
}
