use image::DynamicImage;
use rten_imageproc::BoundingRect;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::detection::ocr::{ImageSource, OcrModels};
use crate::models::DetectionBox;

/// Pretrained object detector: image in, boxes out
pub trait Detector: Send + Sync {
    /// Detector identifier used in logs
    fn name(&self) -> &str;

    /// Load whatever the detector needs before the first image. Setup
    /// problems surface here instead of on every request.
    fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Boxes in source image pixel coordinates, in the detector's own order
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<DetectionBox>>;
}

/// Boxes produced ahead of time by an external detector and stored as a JSON
/// array of [`DetectionBox`]
#[derive(Debug, Clone)]
pub struct DetectionFile {
    path: PathBuf,
}

impl DetectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<Vec<DetectionBox>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            anyhow::anyhow!("Failed to read detections {}: {}", self.path.display(), e)
        })?;
        let boxes: Vec<DetectionBox> = serde_json::from_str(&content)?;
        Ok(boxes)
    }
}

impl Detector for DetectionFile {
    fn name(&self) -> &str {
        "detection-file"
    }

    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<DetectionBox>> {
        let boxes = self.load()?;
        debug!(path = %self.path.display(), count = boxes.len(), "Loaded detections");
        Ok(boxes)
    }
}

/// Uses the ocrs text detection model as a word detector. Every detected word
/// becomes one box of class `"word"`.
pub struct OcrsWordDetector {
    models: Arc<OcrModels>,
}

impl OcrsWordDetector {
    pub const CLASS: &'static str = "word";

    pub fn new(models: Arc<OcrModels>) -> Self {
        Self { models }
    }
}

impl Detector for OcrsWordDetector {
    fn name(&self) -> &str {
        "ocrs-words"
    }

    fn prepare(&self) -> anyhow::Result<()> {
        self.models.engine().map(|_| ())
    }

    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<DetectionBox>> {
        let engine = self.models.engine()?;

        let img = image.to_rgb8();
        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| anyhow::anyhow!("Invalid detector input: {e:?}"))?;
        let ocr_input = engine.prepare_input(img_source)?;

        let words = engine.detect_words(&ocr_input)?;
        // Reading order, so results follow the page
        let lines = engine.find_text_lines(&ocr_input, &words);

        Ok(lines
            .iter()
            .flatten()
            .map(|word| {
                let rect = word.bounding_rect();
                DetectionBox::new(
                    rect.left() as f32,
                    rect.top() as f32,
                    rect.right() as f32,
                    rect.bottom() as f32,
                )
                .with_class(Self::CLASS, 1.0)
            })
            .collect())
    }
}
