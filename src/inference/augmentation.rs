//! Test-time augmentation
//!
//! Label-preserving perturbations applied to the resized, un-normalized image
//! before it is normalized and sent to the network. All randomness comes from
//! an explicit RNG so a fixed seed reproduces the exact variants.

use image::{imageops, Rgb32FImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Configuration for test-time augmentation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtaConfig {
    /// Probability of a horizontal flip (0.0 - 1.0)
    pub horizontal_flip_prob: f32,
    /// Probability of a vertical flip (0.0 - 1.0)
    pub vertical_flip_prob: f32,
    /// Additive brightness range (±brightness_delta on the [0, 1] scale)
    pub brightness_delta: f32,
    /// Lower bound of the contrast factor
    pub contrast_lower: f32,
    /// Upper bound of the contrast factor
    pub contrast_upper: f32,
}

impl Default for TtaConfig {
    fn default() -> Self {
        Self {
            horizontal_flip_prob: 0.5,
            vertical_flip_prob: 0.5,
            brightness_delta: 0.15,
            contrast_lower: 0.85,
            contrast_upper: 1.15,
        }
    }
}

/// Produces randomly perturbed copies of an image
#[derive(Clone, Debug, Default)]
pub struct Augmenter {
    config: TtaConfig,
}

impl Augmenter {
    pub fn new(config: TtaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TtaConfig {
        &self.config
    }

    /// Apply one random rotation/flip/brightness/contrast chain
    pub fn augment(&self, img: &Rgb32FImage, rng: &mut ChaCha8Rng) -> Rgb32FImage {
        let quarter_turns: u8 = rng.gen_range(0..4);
        let mut result = rotate_quarter_turns(img, quarter_turns);

        if rng.gen::<f32>() < self.config.horizontal_flip_prob {
            imageops::flip_horizontal_in_place(&mut result);
        }

        if rng.gen::<f32>() < self.config.vertical_flip_prob {
            imageops::flip_vertical_in_place(&mut result);
        }

        if self.config.brightness_delta > 0.0 {
            let delta =
                rng.gen_range(-self.config.brightness_delta..=self.config.brightness_delta);
            adjust_brightness(&mut result, delta);
        }

        if self.config.contrast_upper > self.config.contrast_lower {
            let factor = rng.gen_range(self.config.contrast_lower..=self.config.contrast_upper);
            adjust_contrast(&mut result, factor);
        }

        result
    }

    /// Generate `count` independent variants of the same image
    pub fn variants(
        &self,
        img: &Rgb32FImage,
        count: usize,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Rgb32FImage> {
        (0..count).map(|_| self.augment(img, rng)).collect()
    }
}

/// Rotate clockwise by `turns` × 90 degrees
fn rotate_quarter_turns(img: &Rgb32FImage, turns: u8) -> Rgb32FImage {
    match turns % 4 {
        1 => imageops::rotate90(img),
        2 => imageops::rotate180(img),
        3 => imageops::rotate270(img),
        _ => img.clone(),
    }
}

/// Add `delta` to every channel, clamped to [0, 1]
fn adjust_brightness(img: &mut Rgb32FImage, delta: f32) {
    for value in img.iter_mut() {
        *value = (*value + delta).clamp(0.0, 1.0);
    }
}

/// Scale each channel around its own mean by `factor`, clamped to [0, 1]
fn adjust_contrast(img: &mut Rgb32FImage, factor: f32) {
    let num_pixels = (img.width() * img.height()) as f64;
    if num_pixels == 0.0 {
        return;
    }

    let mut sums = [0.0f64; 3];
    for pixel in img.pixels() {
        for c in 0..3 {
            sums[c] += pixel[c] as f64;
        }
    }
    let means = sums.map(|s| (s / num_pixels) as f32);

    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel[c] = (means[c] + factor * (pixel[c] - means[c])).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use rand::SeedableRng;

    fn create_test_image() -> Rgb32FImage {
        ImageBuffer::from_fn(16, 16, |x, y| {
            Rgb([x as f32 / 16.0, y as f32 / 16.0, 0.5])
        })
    }

    #[test]
    fn test_default_recipe() {
        let config = TtaConfig::default();
        assert_eq!(config.horizontal_flip_prob, 0.5);
        assert_eq!(config.vertical_flip_prob, 0.5);
        assert_eq!(config.brightness_delta, 0.15);
        assert_eq!((config.contrast_lower, config.contrast_upper), (0.85, 1.15));
    }

    #[test]
    fn test_variants_keep_shape_and_range() {
        let aug = Augmenter::default();
        let img = create_test_image();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let variants = aug.variants(&img, 8, &mut rng);
        assert_eq!(variants.len(), 8);
        for v in &variants {
            assert_eq!(v.dimensions(), (16, 16));
            assert!(v.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_same_seed_same_variants() {
        let aug = Augmenter::default();
        let img = create_test_image();

        let a = aug.variants(&img, 4, &mut ChaCha8Rng::seed_from_u64(7));
        let b = aug.variants(&img, 4, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_variants_are_independent_draws() {
        let aug = Augmenter::default();
        let img = create_test_image();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let variants = aug.variants(&img, 6, &mut rng);
        assert!(variants.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_zero_variants() {
        let aug = Augmenter::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(aug.variants(&create_test_image(), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_rotation_moves_corner() {
        let mut img = Rgb32FImage::new(4, 4);
        img.put_pixel(0, 0, Rgb([1.0, 1.0, 1.0]));

        let rotated = rotate_quarter_turns(&img, 1);
        assert_eq!(rotated.get_pixel(3, 0)[0], 1.0);
        assert_eq!(rotate_quarter_turns(&img, 4), img);
    }

    #[test]
    fn test_brightness_clamps() {
        let mut img = create_test_image();
        adjust_brightness(&mut img, 0.15);
        assert!(img.iter().all(|&p| p <= 1.0));
        assert!((img.get_pixel(0, 0)[0] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_contrast_preserves_channel_mean() {
        let mut img = create_test_image();
        let before: f32 = img.pixels().map(|p| p[0]).sum::<f32>() / 256.0;
        adjust_contrast(&mut img, 0.9);
        let after: f32 = img.pixels().map(|p| p[0]).sum::<f32>() / 256.0;
        assert!((before - after).abs() < 1e-3);
    }
}
