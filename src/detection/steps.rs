use image::{DynamicImage, GrayImage};
use std::sync::Arc;

use crate::config::PreprocessConfig;
use crate::detection::preprocessing;

/// One enhancement stage applied to a grayscale region
pub trait PreprocessStep: Send + Sync {
    fn process(&self, image: GrayImage) -> GrayImage;

    /// Human-readable name for this step (used in logs and debug output)
    fn name(&self) -> &str;
}

pub const GRAYSCALE_STEP_NAME: &str = "Grayscale Conversion";

/// Upscale by a fixed factor with cubic interpolation
pub struct UpscaleStep {
    pub factor: u32,
}

impl PreprocessStep for UpscaleStep {
    fn process(&self, image: GrayImage) -> GrayImage {
        preprocessing::upscale(&image, self.factor)
    }

    fn name(&self) -> &str {
        "Upscale"
    }
}

/// Tile-based contrast enhancement
pub struct ClaheStep {
    pub clip_limit: f32,
    pub tile_grid: u32,
}

impl PreprocessStep for ClaheStep {
    fn process(&self, image: GrayImage) -> GrayImage {
        preprocessing::equalize_local(&image, self.clip_limit, self.tile_grid)
    }

    fn name(&self) -> &str {
        "Local Contrast"
    }
}

/// Non-local means denoising
pub struct DenoiseStep {
    pub strength: f32,
    pub patch_size: u32,
    pub search_size: u32,
}

impl PreprocessStep for DenoiseStep {
    fn process(&self, image: GrayImage) -> GrayImage {
        preprocessing::denoise(&image, self.strength, self.patch_size, self.search_size)
    }

    fn name(&self) -> &str {
        "Denoise"
    }
}

/// Global Otsu threshold
pub struct BinarizeStep;

impl PreprocessStep for BinarizeStep {
    fn process(&self, image: GrayImage) -> GrayImage {
        preprocessing::binarize_otsu(&image)
    }

    fn name(&self) -> &str {
        "Otsu Binarization"
    }
}

/// Morphological dilation to reconnect broken strokes
pub struct DilateStep {
    pub radius: u8,
}

impl PreprocessStep for DilateStep {
    fn process(&self, image: GrayImage) -> GrayImage {
        preprocessing::dilate(&image, self.radius)
    }

    fn name(&self) -> &str {
        "Dilate"
    }
}

/// Ordered enhancement chain turning a cropped region into a binary image.
/// Grayscale conversion always runs first; the remaining steps run in the
/// order they were added.
#[derive(Clone, Default)]
pub struct RegionPreprocessor {
    steps: Vec<Arc<dyn PreprocessStep>>,
}

impl RegionPreprocessor {
    /// Create a preprocessor that only converts to grayscale
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Standard chain: upscale, CLAHE, denoise, Otsu, dilate
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new()
            .add_step(Arc::new(UpscaleStep { factor: config.scale }))
            .add_step(Arc::new(ClaheStep {
                clip_limit: config.clip_limit,
                tile_grid: config.tile_grid,
            }))
            .add_step(Arc::new(DenoiseStep {
                strength: config.denoise_strength,
                patch_size: config.patch_size,
                search_size: config.search_size,
            }))
            .add_step(Arc::new(BinarizeStep))
            .add_step(Arc::new(DilateStep {
                radius: config.dilate_radius,
            }))
    }

    pub fn add_step(mut self, step: Arc<dyn PreprocessStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        std::iter::once(GRAYSCALE_STEP_NAME)
            .chain(self.steps.iter().map(|s| s.name()))
            .collect()
    }

    pub fn preprocess(&self, region: &DynamicImage) -> GrayImage {
        self.preprocess_with(region, |_, _, _| {})
    }

    /// Run the chain, handing every intermediate image to `inspect` together
    /// with its 1-based stage number and step name.
    pub fn preprocess_with<F>(&self, region: &DynamicImage, mut inspect: F) -> GrayImage
    where
        F: FnMut(usize, &str, &GrayImage),
    {
        let mut image = preprocessing::to_grayscale(region);
        inspect(1, GRAYSCALE_STEP_NAME, &image);

        for (idx, step) in self.steps.iter().enumerate() {
            image = step.process(image);
            inspect(idx + 2, step.name(), &image);
        }

        image
    }
}
