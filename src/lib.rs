pub mod config;
pub mod detection;
pub mod dictionary;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod words;

pub use config::AppConfig;
pub use detection::{
    DetectionFile, Detector, OcrModels, OcrsRecognizer, OcrsWordDetector, TextRecognizer,
};
pub use dictionary::DefinitionResolver;
pub use error::PipelineError;
pub use models::{
    DefinitionResult, DetectedWord, DetectionBox, Meaning, OcrCandidate, PipelineResult, WordEntry,
};
pub use pipeline::{DebugConfig, PipelineContext, RegionReader, WordPipeline};
pub use words::WordList;
