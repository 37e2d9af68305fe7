use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Axis-aligned box reported by the object detector, in source image pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub score: f32,
}

impl DetectionBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            class: String::new(),
            score: 1.0,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>, score: f32) -> Self {
        self.class = class.into();
        self.score = score;
        self
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One token read by the OCR engine under a single configuration profile
#[derive(Debug, Clone, PartialEq)]
pub struct OcrCandidate {
    pub text: String,
    /// Engine-reported score. Only comparable, not bounded.
    pub confidence: f32,
}

impl OcrCandidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A lowercase, purely alphabetic, non-empty word
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DetectedWord(String);

impl DetectedWord {
    /// Strip every non-alphabetic character and lowercase the rest.
    /// Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let word: String = raw
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(char::to_lowercase)
            .collect();

        if word.is_empty() { None } else { Some(Self(word)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DetectedWord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One part-of-speech group from a dictionary entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meaning {
    pub part_of_speech: String,
    pub definitions: Vec<String>,
}

/// Outcome of looking a single word up in the definition service
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionResult {
    Found(Vec<Meaning>),
    NotFound,
    LookupError(String),
}

impl DefinitionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DefinitionResult::Found(_))
    }

    pub fn meanings(&self) -> &[Meaning] {
        match self {
            DefinitionResult::Found(meanings) => meanings,
            _ => &[],
        }
    }
}

pub const NOT_FOUND_MESSAGE: &str = "Definition not found";

impl Serialize for DefinitionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DefinitionResult::Found(meanings) => {
                let mut state = serializer.serialize_struct("DefinitionData", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("meanings", meanings)?;
                state.end()
            }
            DefinitionResult::NotFound => {
                let mut state = serializer.serialize_struct("DefinitionData", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", NOT_FOUND_MESSAGE)?;
                state.end()
            }
            DefinitionResult::LookupError(message) => {
                let mut state = serializer.serialize_struct("DefinitionData", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", message)?;
                state.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordEntry {
    pub word: DetectedWord,
    #[serde(rename = "definition_data")]
    pub definition: DefinitionResult,
}

/// Final response: one entry per distinct word, in first-detection order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PipelineResult {
    pub entries: Vec<WordEntry>,
}

impl PipelineResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn words(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.word.as_str()).collect()
    }
}
