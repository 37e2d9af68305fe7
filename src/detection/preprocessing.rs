use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use super::{clahe, denoise};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Upscale by an integer factor with cubic interpolation
pub fn upscale(img: &GrayImage, factor: u32) -> GrayImage {
    if factor <= 1 {
        return img.clone();
    }
    let (width, height) = img.dimensions();
    imageops::resize(img, width * factor, height * factor, FilterType::CatmullRom)
}

/// Contrast-limited adaptive histogram equalization
pub fn equalize_local(img: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    clahe::equalize_adaptive(img, clip_limit, tile_grid)
}

/// Non-local means denoising
pub fn denoise(img: &GrayImage, strength: f32, patch_size: u32, search_size: u32) -> GrayImage {
    denoise::nl_means(img, strength, patch_size, search_size)
}

/// Binarize with the Otsu threshold: above the level becomes white, the rest black
pub fn binarize_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    let mut binary = img.clone();
    for pixel in binary.pixels_mut() {
        pixel[0] = if pixel[0] > level { 255 } else { 0 };
    }
    binary
}

/// Grow white areas with a square structuring element of side `2 * radius + 1`
pub fn dilate(img: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    morphology::dilate(img, Norm::LInf, radius)
}
