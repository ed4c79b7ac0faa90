//! Bounded perturbation for bitmap and audio outputs.
//!
//! Every noised element is shifted by a fresh `sample` drawn uniformly from
//! `[-0.5, 0.5]` on every call. Pixel channels move by an integer spread
//! evenly over `-amplitude..=amplitude`, where the amplitude is
//! `floor(magnitude * 255)`; audio bins add `sample * magnitude` directly.
//! Samples are never cached, so repeated reads see fresh noise.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform samples in `[-0.5, 0.5]`.
///
/// The perturbation routines are provided methods so a deterministic source
/// only has to supply samples.
pub trait NoiseSource {
    fn sample(&mut self) -> f64;

    /// Perturb every element of a pixel buffer (WebGL `readPixels` layout).
    fn perturb_pixels(&mut self, data: &mut [u8], magnitude: f64) {
        let amplitude = channel_amplitude(magnitude);
        if amplitude == 0 {
            return;
        }
        for value in data.iter_mut() {
            *value = shift_channel(*value, self.sample(), amplitude);
        }
    }

    /// Perturb the colour channels of an RGBA buffer, leaving alpha intact
    /// (2D `ImageData` layout).
    fn perturb_rgb(&mut self, data: &mut [u8], magnitude: f64) {
        let amplitude = channel_amplitude(magnitude);
        if amplitude == 0 {
            return;
        }
        for pixel in data.chunks_mut(4) {
            for value in pixel.iter_mut().take(3) {
                *value = shift_channel(*value, self.sample(), amplitude);
            }
        }
    }

    /// Perturb frequency bins in place.
    fn perturb_bins(&mut self, data: &mut [f32], magnitude: f64) {
        for bin in data.iter_mut() {
            *bin += (magnitude * self.sample()) as f32;
        }
    }
}

/// Shared handle: one source feeds every injector of a browsing context.
pub type SharedNoise = Rc<RefCell<dyn NoiseSource>>;

/// `floor(magnitude * 255)`, the largest per-channel shift allowed.
pub fn channel_amplitude(magnitude: f64) -> u32 {
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return 0;
    }
    (magnitude * 255.0).floor().min(255.0) as u32
}

// 2a+1 equal-width buckets, so an amplitude of 1 still moves two thirds
// of the channels. Only the exact endpoints overshoot and are clamped back.
fn shift_channel(value: u8, sample: f64, amplitude: u32) -> u8 {
    let amplitude = amplitude as i32;
    let spread = (2 * amplitude + 1) as f64;
    let delta = (sample.clamp(-0.5, 0.5) * spread).round() as i32;
    (value as i32 + delta.clamp(-amplitude, amplitude)).clamp(0, 255) as u8
}

/// Entropy-seeded source used in production.
pub struct RandomNoise {
    rng: StdRng,
}

impl RandomNoise {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn shared() -> SharedNoise {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl Default for RandomNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for RandomNoise {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(-0.5..=0.5)
    }
}

/// Reproducible source for diagnostics and tests. Still re-sampled on every
/// call; only the sequence is fixed by the seed.
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn shared(seed: u64) -> SharedNoise {
        Rc::new(RefCell::new(Self::new(seed)))
    }
}

impl NoiseSource for SeededNoise {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(-0.5..=0.5)
    }
}

/// Cycles through a fixed list of samples.
pub struct ScriptedNoise {
    samples: Vec<f64>,
    next: usize,
}

impl ScriptedNoise {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples, next: 0 }
    }

    pub fn shared(samples: Vec<f64>) -> SharedNoise {
        Rc::new(RefCell::new(Self::new(samples)))
    }
}

impl NoiseSource for ScriptedNoise {
    fn sample(&mut self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sample = self.samples[self.next % self.samples.len()];
        self.next += 1;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_amplitude() {
        assert_eq!(channel_amplitude(0.1), 25);
        assert_eq!(channel_amplitude(1.0), 255);
        assert_eq!(channel_amplitude(4.0), 255);
        assert_eq!(channel_amplitude(0.001), 0);
        assert_eq!(channel_amplitude(-0.3), 0);
        assert_eq!(channel_amplitude(f64::NAN), 0);
    }

    #[test]
    fn test_extreme_samples_hit_bound() {
        let mut noise = ScriptedNoise::new(vec![0.5, -0.5]);
        let mut data = [100u8, 100, 100, 100];
        noise.perturb_pixels(&mut data, 0.1);
        // amplitude 25: the extreme samples land exactly on the bound
        assert_eq!(data, [125, 75, 125, 75]);
    }

    #[test]
    fn test_rgb_leaves_alpha() {
        let mut noise = ScriptedNoise::new(vec![0.5]);
        let mut data = [10u8, 20, 30, 255, 40, 50, 60, 128];
        noise.perturb_rgb(&mut data, 0.2);
        assert_eq!(data[3], 255);
        assert_eq!(data[7], 128);
        assert_eq!(data[0], 61);
        assert_eq!(data[4], 91);
    }

    #[test]
    fn test_unit_amplitude_still_moves_channels() {
        assert_eq!(channel_amplitude(0.005), 1);
        let mut noise = ScriptedNoise::new(vec![0.2, -0.2, 0.4, 0.1]);
        let mut data = [100u8; 4];
        noise.perturb_pixels(&mut data, 0.005);
        assert_eq!(data, [101, 99, 101, 100]);
    }

    #[test]
    fn test_seeded_unit_amplitude_is_not_silent() {
        let mut noise = SeededNoise::new(3);
        let original = vec![128u8; 1024];
        let mut data = original.clone();
        noise.perturb_pixels(&mut data, 0.005);
        assert!(data.iter().all(|v| (*v as i32 - 128).abs() <= 1));
        let moved = data.iter().filter(|v| **v != 128).count();
        assert!(moved > 512, "only {} of 1024 channels moved", moved);
    }

    #[test]
    fn test_clamped_at_edges() {
        let mut noise = ScriptedNoise::new(vec![0.5, -0.5]);
        let mut data = [250u8, 3];
        noise.perturb_pixels(&mut data, 0.5);
        assert_eq!(data, [255, 0]);
    }

    #[test]
    fn test_random_noise_within_bounds() {
        let mut noise = RandomNoise::new();
        let original = vec![128u8; 4096];
        let mut data = original.clone();
        noise.perturb_pixels(&mut data, 0.05);
        let amplitude = channel_amplitude(0.05) as i32;
        for (a, b) in original.iter().zip(data.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= amplitude);
        }
        assert_ne!(original, data);
    }

    #[test]
    fn test_audio_bins() {
        let mut noise = ScriptedNoise::new(vec![0.5, -0.25]);
        let mut bins = [-100.0f32, -100.0];
        noise.perturb_bins(&mut bins, 0.002);
        assert!((bins[0] - -99.999).abs() < 1e-4);
        assert!((bins[1] - -100.0005).abs() < 1e-4);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SeededNoise::new(7);
        let mut b = SeededNoise::new(7);
        for _ in 0..32 {
            let s = a.sample();
            assert_eq!(s, b.sample());
            assert!((-0.5..=0.5).contains(&s));
        }
    }
}
