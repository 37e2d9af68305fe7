use image::{DynamicImage, GrayImage};
pub use ocrs::{ImageSource, OcrEngine};  // Re-export for use in other modules
use ocrs::{OcrEngineParams, OcrInput};
use parking_lot::Mutex;
use rten::Model;
use rten_imageproc::{RectF, RotatedRect};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::models::{DetectedWord, OcrCandidate};

/// Layout assumption the OCR engine makes about a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrProfile {
    /// The region holds one line of text
    SingleLine,
    /// The region holds exactly one word
    SingleWord,
    /// The region holds a uniform block of text
    Block,
}

impl OcrProfile {
    /// Arbitration order used unless configured otherwise
    pub const DEFAULT: [OcrProfile; 3] = [
        OcrProfile::SingleLine,
        OcrProfile::SingleWord,
        OcrProfile::Block,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OcrProfile::SingleLine => "single_line",
            OcrProfile::SingleWord => "single_word",
            OcrProfile::Block => "block",
        }
    }
}

/// Trait that OCR backends implement
pub trait TextRecognizer: Send + Sync {
    /// Engine identifier used in logs
    fn name(&self) -> &str;

    /// Load models or other resources ahead of the first region
    fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Read the tokens in `region` under one layout profile, in reading order
    fn recognize(
        &self,
        region: &GrayImage,
        profile: OcrProfile,
    ) -> anyhow::Result<Vec<OcrCandidate>>;
}

/// Pick the highest-confidence candidate with non-blank text. Equal scores
/// keep the earlier candidate; NaN scores never win.
pub fn select_best<I>(candidates: I) -> Option<OcrCandidate>
where
    I: IntoIterator<Item = OcrCandidate>,
{
    candidates
        .into_iter()
        .filter(|c| !c.text.trim().is_empty() && !c.confidence.is_nan())
        .fold(None, |best, candidate| match best {
            Some(best) if candidate.confidence <= best.confidence => Some(best),
            _ => Some(candidate),
        })
}

/// Runs every configured profile over a region and arbitrates one word
pub struct MultiConfigOcr {
    recognizer: Arc<dyn TextRecognizer>,
    profiles: Vec<OcrProfile>,
}

impl MultiConfigOcr {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, profiles: Vec<OcrProfile>) -> Self {
        Self { recognizer, profiles }
    }

    pub fn with_default_profiles(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self::new(recognizer, OcrProfile::DEFAULT.to_vec())
    }

    /// Candidates from all profiles, flattened in profile order. A profile
    /// whose engine call fails contributes nothing.
    pub fn candidates(&self, region: &GrayImage) -> Vec<OcrCandidate> {
        self.profiles
            .iter()
            .flat_map(|profile| match self.recognizer.recognize(region, *profile) {
                Ok(candidates) => {
                    debug!(
                        profile = profile.name(),
                        count = candidates.len(),
                        "OCR profile finished"
                    );
                    candidates
                }
                Err(e) => {
                    warn!(
                        engine = self.recognizer.name(),
                        profile = profile.name(),
                        "OCR profile failed: {e:#}"
                    );
                    Vec::new()
                }
            })
            .collect()
    }

    /// Best normalized reading of `region`, or `None` if nothing usable was read
    pub fn recognize(&self, region: &GrayImage) -> Option<DetectedWord> {
        let best = select_best(self.candidates(region))?;
        let word = DetectedWord::normalize(&best.text);

        match &word {
            Some(word) => debug!(
                raw = %best.text,
                confidence = best.confidence,
                %word,
                "Region recognized"
            ),
            None => debug!(raw = %best.text, "Best candidate has no letters"),
        }

        word
    }
}

/// Default model location used by ocrs-cli
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Initialize OCR engine with the models in `model_dir`
pub fn init_ocr_engine(model_dir: &Path) -> anyhow::Result<OcrEngine> {
    let detection_model_path = model_dir.join("text-detection.rten");
    let recognition_model_path = model_dir.join("text-recognition.rten");

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Lazily loaded ocrs engine shared by every request and every component that
/// needs it. The models are loaded at most once.
pub struct OcrModels {
    model_dir: PathBuf,
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrModels {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            engine: Mutex::new(None),
        }
    }

    pub fn from_config(config: &OcrConfig) -> anyhow::Result<Self> {
        let model_dir = match &config.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir()?,
        };
        Ok(Self::new(model_dir))
    }

    /// The shared engine, loading it on first use. The lock is released
    /// before the caller runs any inference.
    pub fn engine(&self) -> anyhow::Result<Arc<OcrEngine>> {
        let mut guard = self.engine.lock();
        if let Some(engine) = guard.as_ref() {
            return Ok(engine.clone());
        }

        info!(model_dir = %self.model_dir.display(), "Loading OCR models");
        let engine = Arc::new(init_ocr_engine(&self.model_dir)?);
        *guard = Some(engine.clone());
        info!("OCR engine initialized successfully");
        Ok(engine)
    }
}

/// Share of alphabetic characters in `token`, as a percentage
pub fn alphabetic_score(token: &str) -> f32 {
    let total = token.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    100.0 * letters as f32 / total as f32
}

/// `TextRecognizer` backed by the ocrs detection and recognition models.
///
/// ocrs reports no per-token recognition score, so tokens are scored with
/// [`alphabetic_score`].
pub struct OcrsRecognizer {
    models: Arc<OcrModels>,
}

impl OcrsRecognizer {
    pub fn new(models: Arc<OcrModels>) -> Self {
        Self { models }
    }
}

impl OcrsRecognizer {
    /// Line boxes to recognize under `profile`. Only `Block` runs text
    /// detection; the other profiles read the whole region as one line.
    fn line_boxes(
        engine: &OcrEngine,
        input: &OcrInput,
        region: &GrayImage,
        profile: OcrProfile,
    ) -> anyhow::Result<Vec<Vec<RotatedRect>>> {
        match profile {
            OcrProfile::Block => {
                let words = engine.detect_words(input)?;
                Ok(engine.find_text_lines(input, &words))
            }
            OcrProfile::SingleLine | OcrProfile::SingleWord => {
                let (width, height) = region.dimensions();
                let full = RectF::from_tlbr(0.0, 0.0, height as f32, width as f32);
                Ok(vec![vec![RotatedRect::from_rect(full)]])
            }
        }
    }
}

/// Split recognized line texts into tokens the way `profile` reads a region.
/// `SingleWord` joins each line into one token; the other profiles yield one
/// token per whitespace-separated word.
pub fn split_tokens<S: AsRef<str>>(lines: &[S], profile: OcrProfile) -> Vec<String> {
    let tokens: Vec<String> = match profile {
        OcrProfile::SingleWord => lines
            .iter()
            .map(|line| line.as_ref().split_whitespace().collect::<String>())
            .collect(),
        OcrProfile::SingleLine | OcrProfile::Block => lines
            .iter()
            .flat_map(|line| line.as_ref().split_whitespace().map(str::to_string))
            .collect(),
    };

    tokens.into_iter().filter(|t| !t.is_empty()).collect()
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    fn prepare(&self) -> anyhow::Result<()> {
        self.models.engine().map(|_| ())
    }

    fn recognize(
        &self,
        region: &GrayImage,
        profile: OcrProfile,
    ) -> anyhow::Result<Vec<OcrCandidate>> {
        let engine = self.models.engine()?;

        // Convert to RGB8 format for OCR
        let img = DynamicImage::ImageLuma8(region.clone()).to_rgb8();
        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| anyhow::anyhow!("Invalid OCR input: {e:?}"))?;
        let ocr_input = engine.prepare_input(img_source)?;

        let lines = Self::line_boxes(&engine, &ocr_input, region, profile)?;
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = engine
            .recognize_text(&ocr_input, &lines)?
            .into_iter()
            .flatten()
            .map(|line| line.to_string())
            .collect();

        Ok(split_tokens(&texts, profile)
            .into_iter()
            .map(|t| {
                let score = alphabetic_score(&t);
                OcrCandidate::new(t, score)
            })
            .collect())
    }
}
