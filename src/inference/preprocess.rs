//! Image loading and preprocessing
//!
//! Every inference call site goes through [`Preprocessor`], so the original
//! image, its augmented variants and the top-3 pass share one normalization.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, Rgb32FImage};
use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, SaccharumError};

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// Caffe-style per-channel means, BGR order on the 0-255 range
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Pixel normalization convention the network was trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Plain scaling to [0, 1]
    Unit,
    /// (x - mean) / std with ImageNet statistics
    #[default]
    ImageNet,
    /// RGB -> BGR, 0-255 range, per-channel mean subtraction (ResNet50 style)
    Caffe,
}

impl Normalization {
    /// Normalize one channel value given in [0, 1]; `channel` is the RGB index
    fn apply(self, value: f32, channel: usize) -> f32 {
        match self {
            Normalization::Unit => value,
            Normalization::ImageNet => (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
            Normalization::Caffe => value * 255.0 - CAFFE_MEAN_BGR[2 - channel],
        }
    }

    /// Output channel slot for an RGB channel index
    fn slot(self, channel: usize) -> usize {
        match self {
            Normalization::Caffe => 2 - channel,
            _ => channel,
        }
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Normalization::Unit => write!(f, "unit"),
            Normalization::ImageNet => write!(f, "imagenet"),
            Normalization::Caffe => write!(f, "caffe"),
        }
    }
}

/// Batched model input in NCHW layout, batch size 1
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl ImageTensor {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// `[batch, channels, height, width]`
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }
}

/// Decodes, resizes and normalizes images for the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    image_size: u32,
    normalization: Normalization,
}

impl Preprocessor {
    pub fn new(image_size: u32, normalization: Normalization) -> Self {
        Self {
            image_size,
            normalization,
        }
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Decode raw bytes into an image, guessing the container format
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| SaccharumError::Decode(e.to_string()))
    }

    /// Read and decode an image file
    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(SaccharumError::PathNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
            .map_err(|e| SaccharumError::Decode(format!("{}: {}", path.display(), e)))
    }

    /// Convert to RGB and resize to the model resolution, values in [0, 1]
    ///
    /// This is the un-normalized image that augmentation operates on.
    pub fn resize(&self, image: &DynamicImage) -> Rgb32FImage {
        image
            .resize_exact(self.image_size, self.image_size, FilterType::Triangle)
            .to_rgb32f()
    }

    /// Normalize an RGB [0, 1] image into a `[1, 3, H, W]` tensor
    pub fn normalize(&self, image: &Rgb32FImage) -> ImageTensor {
        let (width, height) = image.dimensions();
        let num_pixels = (width * height) as usize;

        let mut data = vec![0.0f32; 3 * num_pixels];
        for (i, pixel) in image.pixels().enumerate() {
            for c in 0..3 {
                let slot = self.normalization.slot(c);
                data[slot * num_pixels + i] = self.normalization.apply(pixel[c], c);
            }
        }

        ImageTensor {
            data,
            shape: [1, 3, height as usize, width as usize],
        }
    }

    /// Full pipeline for a decoded image: resize then normalize
    pub fn preprocess(&self, image: &DynamicImage) -> ImageTensor {
        self.normalize(&self.resize(image))
    }
}
