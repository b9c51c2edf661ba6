//! Packed order rows for GPU sampling.

use super::OrderSampler;

/// `rows x cols` row-major array, one row per order (order 0 first).
///
/// Allocated once for a sampler configuration and overwritten in place every
/// frame.
#[derive(Clone, Debug)]
pub struct ModulationTexture {
    cols: usize,
    rows: usize,
    data: Vec<f32>,
}

impl ModulationTexture {
    pub fn for_sampler(sampler: &OrderSampler) -> Self {
        let cols = sampler.bins();
        let rows = sampler.max_order() + 1;
        Self {
            cols,
            rows,
            data: vec![0.0; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, order: usize) -> &[f32] {
        &self.data[order * self.cols..(order + 1) * self.cols]
    }

    /// Copy every order of `sampler` into place. The sampler must have the
    /// configuration this texture was built for.
    pub fn rebuild(&mut self, sampler: &OrderSampler) {
        debug_assert_eq!(sampler.bins(), self.cols);
        debug_assert_eq!(sampler.max_order() + 1, self.rows);
        for (dst, src) in self.data.chunks_exact_mut(self.cols.max(1)).zip(sampler.rows()) {
            dst.copy_from_slice(src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioMode, AudioSource};

    struct Ramp;

    impl AudioSource for Ramp {
        fn bin_count(&self) -> usize {
            4
        }

        fn current_samples(&mut self, _mode: AudioMode, out: &mut [f32]) {
            for (i, v) in out.iter_mut().enumerate() {
                *v = i as f32 * 0.25;
            }
        }
    }

    #[test]
    fn rebuild_packs_rows_in_order() {
        let mut sampler = OrderSampler::new(4, 2).unwrap();
        let mut tex = ModulationTexture::for_sampler(&sampler);
        assert_eq!((tex.rows(), tex.cols()), (3, 4));
        sampler.sample(1.0 / 60.0, AudioMode::Frequencies, &mut Ramp);
        let ptr = tex.data().as_ptr();
        tex.rebuild(&sampler);
        assert_eq!(tex.row(0), &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(tex.row(2), sampler.data_order(sampler.highest()));
        assert_eq!(ptr, tex.data().as_ptr());
    }
}
