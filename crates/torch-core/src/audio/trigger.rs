//! Multi-order audio triggering.
//!
//! Order 0 is the raw sample buffer. Each higher order is an exponentially
//! smoothed per-bin delta of the order below it, giving the renderer slow
//! envelopes and fast derivatives from one input without per-effect filters.

use smallvec::SmallVec;
use thiserror::Error;

use super::{AudioMode, AudioSource};
use crate::constants::{MAX_AUDIO_ORDERS, ORDER_HALF_LIFE_SEC};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("order {requested} is outside 0..={max_order}")]
    OrderOutOfRange { requested: isize, max_order: usize },
    #[error("at most {max} orders are supported, got {0}", max = MAX_AUDIO_ORDERS)]
    TooManyOrders(usize),
    #[error("expected {expected} half-lives, got {got}")]
    HalfLifeCount { expected: usize, got: usize },
}

/// An order resolved against a sampler's configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderIndex(usize);

impl OrderIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

pub struct OrderSampler {
    bins: usize,
    max_order: usize,
    // seconds, one per order >= 1
    half_lives: SmallVec<[f32; MAX_AUDIO_ORDERS]>,
    orders: Vec<Vec<f32>>,
    previous: Vec<Vec<f32>>,
    primed: bool,
}

impl OrderSampler {
    /// Default smoothing: order `k` uses a half-life of `k * ORDER_HALF_LIFE_SEC`.
    pub fn new(bins: usize, max_order: usize) -> Result<Self, TriggerError> {
        let half_lives = (1..=max_order)
            .map(|k| k as f32 * ORDER_HALF_LIFE_SEC)
            .collect::<Vec<_>>();
        Self::with_half_lives(bins, max_order, &half_lives)
    }

    pub fn with_half_lives(
        bins: usize,
        max_order: usize,
        half_lives: &[f32],
    ) -> Result<Self, TriggerError> {
        if max_order > MAX_AUDIO_ORDERS {
            return Err(TriggerError::TooManyOrders(max_order));
        }
        if half_lives.len() != max_order {
            return Err(TriggerError::HalfLifeCount {
                expected: max_order,
                got: half_lives.len(),
            });
        }
        Ok(Self {
            bins,
            max_order,
            half_lives: half_lives.iter().copied().collect(),
            orders: vec![vec![0.0; bins]; max_order + 1],
            previous: vec![vec![0.0; bins]; max_order + 1],
            primed: false,
        })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Resolve `n` to an order; negative values count down from the highest
    /// (`-1` is `max_order`).
    pub fn order(&self, n: isize) -> Result<OrderIndex, TriggerError> {
        let resolved = if n < 0 {
            self.max_order as isize + 1 + n
        } else {
            n
        };
        if resolved < 0 || resolved > self.max_order as isize {
            return Err(TriggerError::OrderOutOfRange {
                requested: n,
                max_order: self.max_order,
            });
        }
        Ok(OrderIndex(resolved as usize))
    }

    /// The most processed order.
    pub fn highest(&self) -> OrderIndex {
        OrderIndex(self.max_order)
    }

    pub fn data_order(&self, index: OrderIndex) -> &[f32] {
        &self.orders[index.0]
    }

    /// All orders, lowest first.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.orders.iter().map(Vec::as_slice)
    }

    /// Interpolation weight for one step of `dt` seconds with the given
    /// half-life. Zero or negative `dt` leaves the state unchanged.
    pub fn smoothing_factor(half_life: f32, dt: f64) -> f32 {
        if dt <= 0.0 {
            return 0.0;
        }
        if half_life <= 0.0 {
            return 1.0;
        }
        1.0 - 0.5f64.powf(dt / half_life as f64) as f32
    }

    /// Pull a fresh buffer from `source` and propagate it through every order.
    pub fn sample<S: AudioSource + ?Sized>(&mut self, dt: f64, mode: AudioMode, source: &mut S) {
        for (prev, cur) in self.previous.iter_mut().zip(self.orders.iter()) {
            prev.copy_from_slice(cur);
        }
        source.current_samples(mode, &mut self.orders[0]);
        if !self.primed {
            // Treat the first buffer as steady state so order 1+ starts at rest.
            self.previous[0].copy_from_slice(&self.orders[0]);
            self.primed = true;
        }

        for k in 1..=self.max_order {
            let alpha = Self::smoothing_factor(self.half_lives[k - 1], dt);
            let (lower, upper) = self.orders.split_at_mut(k);
            let below = &lower[k - 1];
            let below_prev = &self.previous[k - 1];
            for ((v, &now), &before) in upper[0].iter_mut().zip(below).zip(below_prev) {
                let delta = now - before;
                *v += (delta - *v) * alpha;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentSource;

    #[test]
    fn rejects_unknown_orders_up_front() {
        let s = OrderSampler::new(4, 2).unwrap();
        assert_eq!(s.order(-1).unwrap().get(), 2);
        assert_eq!(s.order(-3).unwrap().get(), 0);
        assert!(matches!(
            s.order(3),
            Err(TriggerError::OrderOutOfRange { requested: 3, max_order: 2 })
        ));
        assert!(s.order(-4).is_err());
    }

    #[test]
    fn rejects_too_many_orders() {
        assert!(matches!(
            OrderSampler::new(4, MAX_AUDIO_ORDERS + 1),
            Err(TriggerError::TooManyOrders(_))
        ));
    }

    #[test]
    fn smoothing_factor_halves_per_half_life() {
        let a = OrderSampler::smoothing_factor(0.1, 0.1);
        assert!((a - 0.5).abs() < 1e-6);
        assert_eq!(OrderSampler::smoothing_factor(0.1, 0.0), 0.0);
        assert!(OrderSampler::smoothing_factor(0.1, 100.0) <= 1.0);
    }

    #[test]
    fn zero_order_sampler_is_raw_passthrough() {
        let mut s = OrderSampler::new(3, 0).unwrap();
        s.sample(1.0 / 60.0, AudioMode::Frequencies, &mut SilentSource::new(3));
        assert_eq!(s.data_order(s.highest()), &[0.0, 0.0, 0.0]);
    }
}
