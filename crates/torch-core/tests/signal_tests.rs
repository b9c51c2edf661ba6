// Reducer and order sampler behaviour, driven through the public API.

use torch_core::audio::{AudioMode, AudioSource, OrderSampler};
use torch_core::{mean_weight, peak_pos};

const DT: f64 = 1.0 / 60.0;

/// Source whose output can be changed between samples.
struct Scripted {
    value: Vec<f32>,
}

impl AudioSource for Scripted {
    fn bin_count(&self) -> usize {
        self.value.len()
    }

    fn current_samples(&mut self, _mode: AudioMode, out: &mut [f32]) {
        out.copy_from_slice(&self.value);
    }
}

#[test]
fn peak_pos_picks_first_of_equal_maxima() {
    let p = peak_pos(&[0.1, 0.9, 0.3, 0.9, 0.2]);
    assert!((p.peak - 0.9).abs() < 1e-6);
    assert!((p.pos - 0.25).abs() < 1e-6);
}

#[test]
fn peak_pos_points_at_its_peak() {
    let buffers: [&[f32]; 4] = [
        &[0.0, 0.0, 0.0],
        &[0.3, 0.7, 0.1, 0.65, 0.7],
        &[1.0, 0.2],
        &[0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.95],
    ];
    for s in buffers {
        let p = peak_pos(s);
        assert!((0.0..=1.0).contains(&p.pos));
        let index = (p.pos * (s.len() - 1) as f32).round() as usize;
        assert!((s[index] - p.peak).abs() < 1e-6, "{s:?}");
    }
    assert_eq!(peak_pos(&[0.0; 8]).peak, 0.0);
}

#[test]
fn peak_pos_edge_lengths() {
    let empty = peak_pos(&[]);
    assert_eq!((empty.peak, empty.pos), (0.0, 0.0));
    let single = peak_pos(&[0.4]);
    assert!((single.peak - 0.4).abs() < 1e-6);
    assert_eq!(single.pos, 0.0);
    let last = peak_pos(&[0.0, 0.1, 0.2, 1.0]);
    assert!((last.pos - 1.0).abs() < 1e-6);
}

#[test]
fn mean_weight_stays_within_sample_bounds() {
    let samples = [0.2, 0.8, 0.5, 0.1, 0.9, 0.4];
    let (lo, hi) = (0.1, 0.9);
    for step in 0..=10 {
        let f = step as f32 / 10.0;
        let m = mean_weight(&samples, f);
        assert!(m >= lo - 1e-6 && m <= hi + 1e-6, "mean {m} out of bounds at fulcrum {f}");
    }
}

#[test]
fn mean_weight_rises_with_fulcrum_on_rising_input() {
    let samples: Vec<f32> = (0..32).map(|i| i as f32 / 31.0).collect();
    let mut prev = mean_weight(&samples, 0.0);
    for step in 1..=20 {
        let m = mean_weight(&samples, step as f32 / 20.0);
        assert!(m >= prev - 1e-6, "mean decreased at step {step}");
        prev = m;
    }
}

#[test]
fn mean_weight_of_constant_is_constant() {
    let m = mean_weight(&[0.5; 10], 0.3);
    assert!((m - 0.5).abs() < 1e-6);
    assert_eq!(mean_weight(&[], 0.5), 0.0);
}

#[test]
fn constant_input_keeps_higher_orders_at_rest() {
    let mut s = OrderSampler::new(4, 2).unwrap();
    let mut src = Scripted { value: vec![1.0; 4] };
    for _ in 0..120 {
        s.sample(DT, AudioMode::Frequencies, &mut src);
    }
    for k in 1..=2 {
        let row = s.data_order(s.order(k).unwrap());
        assert!(row.iter().all(|v| v.abs() < 1e-3), "order {k}: {row:?}");
    }
}

#[test]
fn step_input_spikes_then_settles() {
    let mut s = OrderSampler::new(3, 2).unwrap();
    let mut src = Scripted { value: vec![0.0; 3] };
    for _ in 0..10 {
        s.sample(DT, AudioMode::Frequencies, &mut src);
    }
    src.value = vec![1.0; 3];
    s.sample(DT, AudioMode::Frequencies, &mut src);
    let first = s.order(1).unwrap();
    assert!(s.data_order(first)[0] > 0.1);

    for _ in 0..120 {
        s.sample(DT, AudioMode::Frequencies, &mut src);
    }
    for k in 1..=2 {
        let row = s.data_order(s.order(k).unwrap());
        assert!(row.iter().all(|v| v.abs() < 1e-3), "order {k} did not settle: {row:?}");
    }
}

#[test]
fn last_order_alias_matches_highest() {
    let mut s = OrderSampler::new(5, 3).unwrap();
    let mut src = Scripted { value: vec![0.0, 0.5, 1.0, 0.5, 0.0] };
    s.sample(DT, AudioMode::Waveform, &mut src);
    src.value.reverse();
    src.value[0] = 0.9;
    s.sample(DT, AudioMode::Waveform, &mut src);
    let alias = s.order(-1).unwrap();
    assert_eq!(alias, s.highest());
    assert_eq!(s.data_order(alias), s.data_order(s.order(3).unwrap()));
}

#[test]
fn order_zero_is_latest_raw_buffer() {
    let mut s = OrderSampler::new(3, 2).unwrap();
    let mut src = Scripted { value: vec![0.1, 0.2, 0.3] };
    s.sample(DT, AudioMode::Frequencies, &mut src);
    src.value = vec![0.9, 0.8, 0.7];
    s.sample(DT, AudioMode::Frequencies, &mut src);
    assert_eq!(s.data_order(s.order(0).unwrap()), &[0.9, 0.8, 0.7]);
}

#[test]
fn zero_dt_leaves_orders_untouched() {
    let mut s = OrderSampler::new(2, 1).unwrap();
    let mut src = Scripted { value: vec![0.0; 2] };
    s.sample(DT, AudioMode::Frequencies, &mut src);
    src.value = vec![1.0; 2];
    s.sample(0.0, AudioMode::Frequencies, &mut src);
    assert_eq!(s.data_order(s.order(1).unwrap()), &[0.0, 0.0]);
}
