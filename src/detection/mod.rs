//! Region-level vision: turning detection boxes into words.
//!
//! Each detection box is cropped ([`region`]), enhanced ([`steps`]) and read
//! under several OCR profiles ([`ocr`]).

pub mod clahe;
pub mod denoise;
pub mod detector;
pub mod ocr;
pub mod preprocessing;
pub mod region;
pub mod steps;

pub use detector::{DetectionFile, Detector, OcrsWordDetector};
pub use ocr::{MultiConfigOcr, OcrModels, OcrProfile, OcrsRecognizer, TextRecognizer};
pub use region::{BoundingBox, Extraction};
pub use steps::{PreprocessStep, RegionPreprocessor};
