//! Renderer parameters: hard-coded defaults overridden by query values.
//!
//! `Params` is built once and shared immutably; refreshing parameters means
//! building a new `Params` and handing it to the renderer.

pub mod query;
pub mod track;

pub use query::{decode_component, encode_component, QueryOverrides};
pub use track::track_source;

use std::fmt;
use std::sync::Arc;

use crate::audio::AudioMode;
use crate::constants::MAX_AUDIO_ORDERS;

/// Serialisation order of every named parameter.
pub const PARAM_NAMES: &[&str] = &[
    "track",
    "audioMode",
    "audioOrders",
    "harmonies",
    "falloff",
    "attenuate",
    "silent",
    "soundSmooth",
    "soundWarp",
    "noiseWarp",
    "noiseSpeed",
    "noiseScale",
    "meanFulcrum",
    "grow",
    "growLimit",
    "spin",
    "radius",
    "thick",
    "otherRadius",
    "otherThick",
    "otherEdge",
    "jitter",
    "nowAlpha",
    "pastAlpha",
    "bokehRadius",
    "bokehAmount",
    "ambient",
    "emit",
];

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Text(String),
    Mode(AudioMode),
    Count(usize),
    Float(f32),
    Color([f32; 4]),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Mode(m) => write!(f, "{m}"),
            Self::Count(n) => write!(f, "{n}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Color([r, g, b, a]) => write!(f, "{r},{g},{b},{a}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// Audio track URL, as given (see [`track_source`] for the playable form).
    pub track: String,
    pub audio_mode: AudioMode,
    /// Highest order tracked by the order sampler.
    pub audio_orders: usize,
    pub muted: bool,

    // Draw: audio response
    pub harmonies: f32,
    pub attenuate: f32,
    pub silent: f32,
    pub sound_smooth: f32,
    pub sound_warp: f32,
    pub mean_fulcrum: f32,

    // Draw: noise and motion
    pub noise_warp: f32,
    pub noise_speed: f32,
    pub noise_scale: f32,
    pub spin: f32,

    // Draw: light shapes
    pub radius: f32,
    pub thick: f32,
    pub other_radius: f32,
    pub other_thick: f32,
    pub other_edge: f32,
    pub now_alpha: f32,
    pub ambient: [f32; 4],
    pub emit: [f32; 4],

    // Form: feedback field
    pub falloff: f32,
    pub grow: f32,
    pub grow_limit: f32,
    pub jitter: f32,
    pub past_alpha: f32,

    // Post
    pub bokeh_radius: f32,
    pub bokeh_amount: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            track: String::new(),
            audio_mode: AudioMode::Frequencies,
            audio_orders: 2,
            muted: false,
            harmonies: 1.0,
            attenuate: 0.02,
            silent: 0.0,
            sound_smooth: 0.3,
            sound_warp: 0.007,
            mean_fulcrum: 0.4,
            noise_warp: 0.1,
            noise_speed: 0.001,
            noise_scale: 0.3,
            spin: 0.0001,
            radius: 0.3,
            thick: 0.005,
            other_radius: 0.2,
            other_thick: 0.03,
            other_edge: 4.0,
            now_alpha: 1.0,
            ambient: [1.0, 1.0, 1.0, 1.0],
            emit: [1.0, 1.0, 1.0, 1.0],
            falloff: 0.00001,
            grow: 0.0005,
            grow_limit: 1.6,
            jitter: 0.002,
            past_alpha: 0.99,
            bokeh_radius: 8.0,
            bokeh_amount: 60.0,
        }
    }
}

impl Params {
    /// Resolve every parameter: a present, well-formed override wins,
    /// anything else falls back to the default without failing.
    pub fn from_overrides(q: &QueryOverrides) -> Self {
        let d = Self::default();
        Self {
            track: q.get("track").map(str::to_string).unwrap_or(d.track),
            audio_mode: resolve_with(q, "audioMode", d.audio_mode, AudioMode::parse),
            audio_orders: resolve_with(q, "audioOrders", d.audio_orders, parse_orders),
            muted: q.contains("muted"),
            harmonies: float(q, "harmonies", d.harmonies),
            attenuate: float(q, "attenuate", d.attenuate),
            silent: float(q, "silent", d.silent),
            sound_smooth: float(q, "soundSmooth", d.sound_smooth),
            sound_warp: float(q, "soundWarp", d.sound_warp),
            mean_fulcrum: float(q, "meanFulcrum", d.mean_fulcrum),
            noise_warp: float(q, "noiseWarp", d.noise_warp),
            noise_speed: float(q, "noiseSpeed", d.noise_speed),
            noise_scale: float(q, "noiseScale", d.noise_scale),
            spin: float(q, "spin", d.spin),
            radius: float(q, "radius", d.radius),
            thick: float(q, "thick", d.thick),
            other_radius: float(q, "otherRadius", d.other_radius),
            other_thick: float(q, "otherThick", d.other_thick),
            other_edge: float(q, "otherEdge", d.other_edge),
            now_alpha: float(q, "nowAlpha", d.now_alpha),
            ambient: resolve_with(q, "ambient", d.ambient, parse_color),
            emit: resolve_with(q, "emit", d.emit, parse_color),
            falloff: float(q, "falloff", d.falloff),
            grow: float(q, "grow", d.grow),
            grow_limit: float(q, "growLimit", d.grow_limit),
            jitter: float(q, "jitter", d.jitter),
            past_alpha: float(q, "pastAlpha", d.past_alpha),
            bokeh_radius: float(q, "bokehRadius", d.bokeh_radius),
            bokeh_amount: float(q, "bokehAmount", d.bokeh_amount),
        }
    }

    pub fn from_query(query: &str) -> Self {
        Self::from_overrides(&QueryOverrides::parse(query))
    }

    /// Look a parameter up by its query name.
    pub fn value(&self, name: &str) -> Option<ParamValue> {
        use ParamValue::*;
        let v = match name {
            "track" => Text(self.track.clone()),
            "audioMode" => Mode(self.audio_mode),
            "audioOrders" => Count(self.audio_orders),
            "harmonies" => Float(self.harmonies),
            "falloff" => Float(self.falloff),
            "attenuate" => Float(self.attenuate),
            "silent" => Float(self.silent),
            "soundSmooth" => Float(self.sound_smooth),
            "soundWarp" => Float(self.sound_warp),
            "noiseWarp" => Float(self.noise_warp),
            "noiseSpeed" => Float(self.noise_speed),
            "noiseScale" => Float(self.noise_scale),
            "meanFulcrum" => Float(self.mean_fulcrum),
            "grow" => Float(self.grow),
            "growLimit" => Float(self.grow_limit),
            "spin" => Float(self.spin),
            "radius" => Float(self.radius),
            "thick" => Float(self.thick),
            "otherRadius" => Float(self.other_radius),
            "otherThick" => Float(self.other_thick),
            "otherEdge" => Float(self.other_edge),
            "jitter" => Float(self.jitter),
            "nowAlpha" => Float(self.now_alpha),
            "pastAlpha" => Float(self.past_alpha),
            "bokehRadius" => Float(self.bokeh_radius),
            "bokehAmount" => Float(self.bokeh_amount),
            "ambient" => Color(self.ambient),
            "emit" => Color(self.emit),
            _ => return None,
        };
        Some(v)
    }

    /// Ordered `name=value` pairs, values percent-encoded. `muted` is
    /// appended as a bare flag when set.
    pub fn serialize(&self) -> Vec<String> {
        let mut out = PARAM_NAMES
            .iter()
            .filter_map(|&name| {
                let value = self.value(name)?;
                Some(format!("{name}={}", encode_component(&value.to_string())))
            })
            .collect::<Vec<_>>();
        if self.muted {
            out.push("muted".to_string());
        }
        out
    }

    pub fn query_string(&self) -> String {
        self.serialize().join("&")
    }

    /// `base` with its query (and fragment) replaced by the current state.
    pub fn share_url(&self, base: &str) -> String {
        let base = base.split(['?', '#']).next().unwrap_or(base);
        format!("{base}?{}", self.query_string())
    }
}

/// Owns the raw overrides and the parameters resolved from them.
#[derive(Clone, Debug)]
pub struct ParamStore {
    overrides: QueryOverrides,
    params: Arc<Params>,
}

impl ParamStore {
    pub fn new(overrides: QueryOverrides) -> Self {
        let params = Arc::new(Params::from_overrides(&overrides));
        Self { overrides, params }
    }

    pub fn from_query(query: &str) -> Self {
        Self::new(QueryOverrides::parse(query))
    }

    pub fn params(&self) -> Arc<Params> {
        Arc::clone(&self.params)
    }

    pub fn overrides(&self) -> &QueryOverrides {
        &self.overrides
    }

    pub fn resolve(&self, name: &str) -> Option<ParamValue> {
        self.params.value(name)
    }

    /// Replace the overrides and rebuild the parameters from scratch.
    pub fn apply(&mut self, overrides: QueryOverrides) -> Arc<Params> {
        *self = Self::new(overrides);
        self.params()
    }
}

fn resolve_with<T>(
    q: &QueryOverrides,
    name: &str,
    default: T,
    parse: impl FnOnce(&str) -> Option<T>,
) -> T {
    let Some(raw) = q.get(name) else {
        return default;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    parse(raw).unwrap_or_else(|| {
        log::debug!("ignoring malformed {name}={raw:?}");
        default
    })
}

fn float(q: &QueryOverrides, name: &str, default: f32) -> f32 {
    resolve_with(q, name, default, |s| {
        s.parse::<f32>().ok().filter(|v| v.is_finite())
    })
}

fn parse_orders(s: &str) -> Option<usize> {
    let n = s.parse::<usize>().ok()?;
    if n > MAX_AUDIO_ORDERS {
        log::debug!("audioOrders={n} capped at {MAX_AUDIO_ORDERS}");
    }
    Some(n.min(MAX_AUDIO_ORDERS))
}

/// `r,g,b,a`, optionally bracketed; three components get alpha 1.
fn parse_color(s: &str) -> Option<[f32; 4]> {
    let cleaned = s.replace(['[', ']'], "");
    let parts = cleaned
        .split(',')
        .map(|c| c.trim().parse::<f32>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        &[r, g, b] => Some([r, g, b, 1.0]),
        &[r, g, b, a] => Some([r, g, b, a]),
        _ => None,
    }
}
