// Shared timing/analysis tuning constants used by the core and both frontends.

// Analyser
pub const FFT_SIZE: usize = 1 << 11; // matches the WebAudio analyser configuration
pub const BIN_COUNT: usize = FFT_SIZE / 2;
pub const ANALYSER_SMOOTHING: f32 = 0.8; // AnalyserNode smoothingTimeConstant
pub const ANALYSER_MIN_DB: f32 = -100.0;
pub const ANALYSER_MAX_DB: f32 = -30.0;

// Order sampler
pub const MAX_AUDIO_ORDERS: usize = 8; // rows in the modulation texture, minus the raw row
pub const ORDER_HALF_LIFE_SEC: f32 = 0.06; // order k smooths with a half-life of k * this

// Signal reducer
pub const MEAN_WEIGHT_FALLOFF: f32 = 4.0; // exp(-falloff * distance) weighting around the fulcrum

// Frame pacing
pub const REFERENCE_FPS: f64 = 60.0; // per-frame tunables are expressed at this rate
pub const MAX_PASS_DT_SEC: f64 = 0.25; // dt clamp for passes that integrate over time

// Host resize coalescing (trailing edge)
pub const RESIZE_THROTTLE_SEC: f64 = 0.2;
