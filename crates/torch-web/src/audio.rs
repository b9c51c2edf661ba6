//! Track playback through WebAudio and the analyser that feeds the renderer.

use anyhow::anyhow;
use torch_core::audio::{AudioMode, AudioSource};
use torch_core::constants::{ANALYSER_MAX_DB, ANALYSER_MIN_DB, ANALYSER_SMOOTHING, FFT_SIZE};
use torch_core::params::{track_source, Params};
use web_sys as web;

/// Byte-range `AnalyserNode` output scaled to `[0, 1]`.
pub struct WebAnalyser {
    node: web::AnalyserNode,
    bytes: Vec<u8>,
}

impl WebAnalyser {
    pub fn new(node: web::AnalyserNode) -> Self {
        let bins = node.frequency_bin_count() as usize;
        Self {
            node,
            bytes: vec![0; bins],
        }
    }
}

impl AudioSource for WebAnalyser {
    fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    fn current_samples(&mut self, mode: AudioMode, out: &mut [f32]) {
        match mode {
            AudioMode::Frequencies => self.node.get_byte_frequency_data(&mut self.bytes),
            AudioMode::Waveform => self.node.get_byte_time_domain_data(&mut self.bytes),
        }
        for (o, &b) in out.iter_mut().zip(&self.bytes) {
            *o = b as f32 / 255.0;
        }
    }
}

/// Audio graph for one track: element -> analyser (-> speakers unless muted).
pub struct TrackPlayer {
    ctx: web::AudioContext,
    element: web::HtmlAudioElement,
}

impl TrackPlayer {
    pub fn new(params: &Params) -> anyhow::Result<(Self, WebAnalyser)> {
        let js = |e: wasm_bindgen::JsValue| anyhow!(format!("{:?}", e));
        let ctx = web::AudioContext::new().map_err(js)?;
        let src = track_source(&params.track);
        let element = web::HtmlAudioElement::new_with_src(&src).map_err(js)?;
        element.set_cross_origin(Some("anonymous"));
        element.set_loop(true);

        let node = ctx.create_media_element_source(&element).map_err(js)?;
        let analyser = ctx.create_analyser().map_err(js)?;
        analyser.set_fft_size(FFT_SIZE as u32);
        analyser.set_smoothing_time_constant(ANALYSER_SMOOTHING as f64);
        analyser.set_min_decibels(ANALYSER_MIN_DB as f64);
        analyser.set_max_decibels(ANALYSER_MAX_DB as f64);
        node.connect_with_audio_node(&analyser).map_err(js)?;
        if !params.muted {
            analyser
                .connect_with_audio_node(&ctx.destination())
                .map_err(js)?;
        }
        log::info!("track: {src}{}", if params.muted { " (muted)" } else { "" });

        Ok((Self { ctx, element }, WebAnalyser::new(analyser)))
    }

    /// Start (or resume) playback. Browsers refuse until a user gesture, so
    /// this is also wired to clicks.
    pub fn play(&self) {
        let _ = self.ctx.resume();
        match self.element.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::debug!("play deferred until a gesture: {:?}", e);
                }
            }),
            Err(e) => log::debug!("play failed: {:?}", e),
        }
    }
}
