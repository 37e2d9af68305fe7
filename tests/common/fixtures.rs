use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wordlens::config::AppConfig;
use wordlens::detection::OcrProfile;
use wordlens::{DetectionBox, Detector, OcrCandidate, TextRecognizer, WordPipeline};

/// Box around "TREE" in [`two_word_image`]; its region is 140px wide after upscaling
pub const TREE_BOX: (f32, f32, f32, f32) = (10.0, 10.0, 70.0, 40.0);
/// Box around "ROCK" in [`two_word_image`]; its region is 180px wide after upscaling
pub const ROCK_BOX: (f32, f32, f32, f32) = (100.0, 10.0, 180.0, 40.0);

pub fn detection(coords: (f32, f32, f32, f32)) -> DetectionBox {
    DetectionBox::new(coords.0, coords.1, coords.2, coords.3).with_class("word", 0.9)
}

/// 200x60 light image with a dark block of "glyph" strokes inside each box
pub fn two_word_image() -> DynamicImage {
    let img = RgbImage::from_fn(200, 60, |x, y| {
        let in_box = |(x1, y1, x2, y2): (f32, f32, f32, f32)| {
            let (x, y) = (x as f32, y as f32);
            x >= x1 + 4.0 && x < x2 - 4.0 && y >= y1 + 6.0 && y < y2 - 6.0
        };
        let stroke = x % 6 < 3;
        if (in_box(TREE_BOX) || in_box(ROCK_BOX)) && stroke {
            Rgb([25, 25, 25])
        } else {
            Rgb([235, 235, 230])
        }
    });
    DynamicImage::ImageRgb8(img)
}

/// PNG encoding of `image`
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Detector returning fixed boxes and counting its calls
#[derive(Default)]
pub struct FixedDetector {
    pub boxes: Vec<DetectionBox>,
    pub calls: AtomicUsize,
}

impl FixedDetector {
    pub fn new(boxes: Vec<DetectionBox>) -> Arc<Self> {
        Arc::new(Self {
            boxes,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<DetectionBox>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.boxes.clone())
    }
}

pub struct FailingDetector;

impl Detector for FailingDetector {
    fn name(&self) -> &str {
        "failing"
    }

    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<DetectionBox>> {
        anyhow::bail!("model weights corrupted")
    }
}

/// Recognizer answering by the width of the preprocessed region, the same
/// way for every profile
#[derive(Default)]
pub struct WidthRecognizer {
    pub by_width: HashMap<u32, Vec<OcrCandidate>>,
    pub calls: AtomicUsize,
}

impl WidthRecognizer {
    pub fn new(readings: Vec<(u32, &str, f32)>) -> Arc<Self> {
        let mut by_width: HashMap<u32, Vec<OcrCandidate>> = HashMap::new();
        for (width, text, confidence) in readings {
            by_width
                .entry(width)
                .or_default()
                .push(OcrCandidate::new(text, confidence));
        }
        Arc::new(Self {
            by_width,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for WidthRecognizer {
    fn name(&self) -> &str {
        "by-width"
    }

    fn recognize(
        &self,
        region: &GrayImage,
        _profile: OcrProfile,
    ) -> anyhow::Result<Vec<OcrCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_width.get(&region.width()).cloned().unwrap_or_default())
    }
}

/// Readings for [`two_word_image`]: "TREE" and "ROCK"
pub fn two_word_recognizer() -> Arc<WidthRecognizer> {
    WidthRecognizer::new(vec![(140, "TREE", 91.0), (140, "TRE3", 60.0), (180, "ROCK", 88.0)])
}

/// Dictionary entry JSON with one noun meaning
pub fn entry_json(word: &str, definition: &str) -> serde_json::Value {
    serde_json::json!([{
        "word": word,
        "meanings": [{
            "partOfSpeech": "noun",
            "definitions": [{"definition": definition}]
        }]
    }])
}

/// Mock dictionary service serving `found` words, 404 for everything else
pub async fn dictionary_server(found: &[(&str, &str)]) -> MockServer {
    let mock_server = MockServer::start().await;

    for (word, definition) in found {
        Mock::given(method("GET"))
            .and(path(format!("/entries/{word}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(word, definition)))
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(10)
        .mount(&mock_server)
        .await;

    mock_server
}

/// Default config pointed at the mock dictionary
pub fn test_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.lookup.base_url = format!("{}/entries", server.uri());
    config.lookup.timeout_secs = 1;
    config
}

pub fn build_pipeline(
    detector: Arc<dyn Detector>,
    recognizer: Arc<dyn TextRecognizer>,
    server: &MockServer,
) -> WordPipeline {
    WordPipeline::new(detector, recognizer, &test_config(server)).expect("Failed to build pipeline")
}
