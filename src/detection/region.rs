use image::{DynamicImage, GenericImageView};

use crate::models::DetectionBox;

/// Pixel rectangle inside the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of cropping one detection box out of the source image
#[derive(Debug, Clone)]
pub enum Extraction {
    Region {
        image: DynamicImage,
        bbox: BoundingBox,
    },
    /// Too small after clipping to be worth reading
    Skip,
}

impl Extraction {
    pub fn is_skip(&self) -> bool {
        matches!(self, Extraction::Skip)
    }
}

/// Expand `detection` by `margin` on every side, clip to the image and crop it.
pub fn expand_and_clip(
    detection: &DetectionBox,
    margin: u32,
    img_width: u32,
    img_height: u32,
) -> BoundingBox {
    // Detector coordinates are truncated, not rounded
    let margin = i64::from(margin);
    let x1 = (detection.x1 as i64 - margin).clamp(0, i64::from(img_width));
    let y1 = (detection.y1 as i64 - margin).clamp(0, i64::from(img_height));
    let x2 = (detection.x2 as i64 + margin).clamp(0, i64::from(img_width));
    let y2 = (detection.y2 as i64 + margin).clamp(0, i64::from(img_height));

    BoundingBox {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1).max(0) as u32,
        height: (y2 - y1).max(0) as u32,
    }
}

/// Crop the region for one detection box, or `Skip` if either side of the
/// clipped rectangle is below `min_size`.
pub fn extract(
    image: &DynamicImage,
    detection: &DetectionBox,
    margin: u32,
    min_size: u32,
) -> Extraction {
    let (img_width, img_height) = image.dimensions();
    let bbox = expand_and_clip(detection, margin, img_width, img_height);

    if bbox.width < min_size || bbox.height < min_size || bbox.width == 0 || bbox.height == 0 {
        return Extraction::Skip;
    }

    Extraction::Region {
        image: image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height),
        bbox,
    }
}
