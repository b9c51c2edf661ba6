//! Scalar summaries of a sample buffer.
//!
//! Both reducers are single linear passes with no internal state.

use crate::constants::MEAN_WEIGHT_FALLOFF;

/// Largest sample and where it sits, normalised to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeakPos {
    pub peak: f32,
    pub pos: f32,
}

/// Scan for the maximum value. Ties keep the lowest index; `pos` is
/// `index / (len - 1)`, or 0 for buffers of length 0 or 1.
pub fn peak_pos(samples: &[f32]) -> PeakPos {
    let Some((&first, rest)) = samples.split_first() else {
        return PeakPos::default();
    };
    let mut peak = first;
    let mut index = 0usize;
    for (i, &v) in rest.iter().enumerate() {
        if v > peak {
            peak = v;
            index = i + 1;
        }
    }
    let pos = if samples.len() > 1 {
        index as f32 / (samples.len() - 1) as f32
    } else {
        0.0
    };
    PeakPos { peak, pos }
}

/// Weighted mean biased toward the `fulcrum` position (0 = first sample,
/// 1 = last).
///
/// Sample `i` at normalised position `p = i / (len - 1)` is weighted by
/// `exp(-MEAN_WEIGHT_FALLOFF * |p - fulcrum|)`. Weights are strictly positive
/// and fall off monotonically with distance from the fulcrum, so moving the
/// fulcrum toward 1 never lowers the result for a rising buffer.
pub fn mean_weight(samples: &[f32], fulcrum: f32) -> f32 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let fulcrum = fulcrum.clamp(0.0, 1.0);
    let span = (n - 1).max(1) as f32;
    let mut sum = 0.0f32;
    let mut total = 0.0f32;
    for (i, &v) in samples.iter().enumerate() {
        let p = if n > 1 { i as f32 / span } else { 0.0 };
        let w = (-MEAN_WEIGHT_FALLOFF * (p - fulcrum).abs()).exp();
        sum += v * w;
        total += w;
    }
    sum / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_of_empty_is_zero() {
        assert_eq!(peak_pos(&[]), PeakPos { peak: 0.0, pos: 0.0 });
    }

    #[test]
    fn peak_single_sample() {
        assert_eq!(peak_pos(&[0.7]), PeakPos { peak: 0.7, pos: 0.0 });
    }

    #[test]
    fn mean_of_constant_is_constant() {
        let s = [0.25f32; 9];
        for f in [0.0, 0.3, 1.0] {
            assert!((mean_weight(&s, f) - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn mean_clamps_fulcrum() {
        let s = [0.0, 0.5, 1.0];
        assert_eq!(mean_weight(&s, 7.0), mean_weight(&s, 1.0));
        assert_eq!(mean_weight(&s, -2.0), mean_weight(&s, 0.0));
    }
}
