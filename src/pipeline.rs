use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, RegionConfig};
use crate::detection::region::{self, Extraction};
use crate::detection::{Detector, MultiConfigOcr, RegionPreprocessor, TextRecognizer};
use crate::dictionary::DefinitionResolver;
use crate::error::{PipelineError, Result};
use crate::models::{DetectedWord, DetectionBox, PipelineResult, WordEntry};
use crate::words::WordList;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to every region stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    /// Path for one debug image, e.g. `03_upscale/02.png`, creating the step
    /// directory. `None` when debug mode is off or the directory can't be made.
    fn debug_path(&self, step_index: usize, step_name: &str, item: usize) -> Option<PathBuf> {
        let debug_config = self.debug.as_ref().filter(|d| d.enabled)?;

        let step_dir_name = format!(
            "{:02}_{}",
            step_index,
            step_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        if let Err(e) = std::fs::create_dir_all(&step_dir) {
            warn!("Failed to create debug directory {}: {}", step_dir.display(), e);
            return None;
        }

        Some(step_dir.join(format!("{:02}.png", item)))
    }
}

fn save_debug<I>(
    context: &PipelineContext,
    step_index: usize,
    step_name: &str,
    item: usize,
    save: I,
) where
    I: FnOnce(&Path) -> image::ImageResult<()>,
{
    if let Some(path) = context.debug_path(step_index, step_name, item) {
        match save(&path) {
            Ok(()) => debug!("Debug: saved {}", path.display()),
            Err(e) => warn!("Failed to save debug image {}: {}", path.display(), e),
        }
    }
}

/// CPU-bound half of the pipeline: detection boxes in, one optional word per
/// usable box out
pub struct RegionReader {
    region: RegionConfig,
    preprocessor: RegionPreprocessor,
    ocr: MultiConfigOcr,
    context: PipelineContext,
}

impl RegionReader {
    pub fn new(
        region: RegionConfig,
        preprocessor: RegionPreprocessor,
        ocr: MultiConfigOcr,
    ) -> Self {
        Self {
            region,
            preprocessor,
            ocr,
            context: PipelineContext::default(),
        }
    }

    /// Extract, enhance and read every box in detection order. Boxes that are
    /// too small are dropped; unreadable regions yield `None`.
    pub fn read_words(
        &self,
        image: &DynamicImage,
        detections: &[DetectionBox],
    ) -> Vec<Option<DetectedWord>> {
        save_debug(&self.context, 0, "input", 1, |path| image.save(path));

        detections
            .iter()
            .enumerate()
            .filter_map(|(idx, detection)| {
                let item = idx + 1;
                match region::extract(image, detection, self.region.margin, self.region.min_size) {
                    Extraction::Skip => {
                        debug!(box_index = idx, "Region too small, skipped");
                        None
                    }
                    Extraction::Region { image: cropped, bbox } => {
                        debug!(
                            box_index = idx,
                            x = bbox.x,
                            y = bbox.y,
                            width = bbox.width,
                            height = bbox.height,
                            "Reading region"
                        );
                        save_debug(&self.context, 1, "region", item, |path| cropped.save(path));

                        let processed =
                            self.preprocessor.preprocess_with(&cropped, |stage, name, img| {
                                save_debug(&self.context, stage + 1, name, item, |path| {
                                    img.save(path)
                                });
                            });
                        Some(self.ocr.recognize(&processed))
                    }
                }
            })
            .collect()
    }
}

/// Detection-to-definition pipeline.
///
/// Construction prepares the detector and recognizer, so missing models fail
/// here rather than as empty results.
///
/// Only an undecodable image, a failing detector or a crashed region worker
/// fail a request; everything else ends up inside the [`PipelineResult`].
pub struct WordPipeline {
    detector: Arc<dyn Detector>,
    reader: Arc<RegionReader>,
    resolver: DefinitionResolver,
    max_concurrent_lookups: usize,
}

impl WordPipeline {
    pub fn new(
        detector: Arc<dyn Detector>,
        recognizer: Arc<dyn TextRecognizer>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        detector.prepare()?;
        recognizer.prepare()?;

        let reader = RegionReader::new(
            config.region.clone(),
            RegionPreprocessor::from_config(&config.preprocess),
            MultiConfigOcr::new(recognizer, config.ocr.profiles.clone()),
        );

        Ok(Self {
            detector,
            reader: Arc::new(reader),
            resolver: DefinitionResolver::new(&config.lookup)?,
            max_concurrent_lookups: config.lookup.max_concurrent.max(1),
        })
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        let reader = Arc::get_mut(&mut self.reader)
            .ok_or_else(|| anyhow::anyhow!("Pipeline is already in use"))?;
        reader.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    /// Read and decode an image file, then run the pipeline on it
    pub async fn run_path(&self, path: &Path) -> Result<PipelineResult> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Input(format!("{}: {}", path.display(), e)))?;
        self.run_bytes(&bytes).await
    }

    /// Decode an encoded image, then run the pipeline on it
    pub async fn run_bytes(&self, bytes: &[u8]) -> Result<PipelineResult> {
        let image =
            image::load_from_memory(bytes).map_err(|e| PipelineError::Input(e.to_string()))?;
        self.run(image).await
    }

    /// Detect boxes with the configured detector, then run the pipeline
    pub async fn run(&self, image: DynamicImage) -> Result<PipelineResult> {
        let image = Arc::new(image);
        let detector = self.detector.clone();
        let detect_image = image.clone();

        let detections = tokio::task::spawn_blocking(move || detector.detect(&detect_image))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?
            .map_err(|e| PipelineError::Detector(format!("{e:#}")))?;

        info!(detector = self.detector.name(), boxes = detections.len(), "Detection finished");
        self.run_detections(image, detections).await
    }

    /// Run everything after detection for boxes that are already known
    pub async fn run_detections(
        &self,
        image: Arc<DynamicImage>,
        detections: Vec<DetectionBox>,
    ) -> Result<PipelineResult> {
        let reader = self.reader.clone();
        let box_count = detections.len();

        let words = tokio::task::spawn_blocking(move || reader.read_words(&image, &detections))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;

        let regions = words.len();
        let words = WordList::aggregate(words);
        info!(boxes = box_count, regions, words = words.len(), "Regions read");

        Ok(self.define(words).await)
    }

    /// Look every word up, at most `max_concurrent` at a time, keeping the
    /// order of `words`
    pub async fn define(&self, words: WordList) -> PipelineResult {
        let definitions: Vec<_> = stream::iter(words.iter())
            .map(|word| self.resolver.resolve(word))
            .buffered(self.max_concurrent_lookups)
            .collect()
            .await;

        let entries = words
            .into_iter()
            .zip(definitions)
            .map(|(word, definition)| WordEntry { word, definition })
            .collect();

        PipelineResult { entries }
    }
}
