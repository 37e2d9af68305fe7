//! Runtime configuration
//!
//! Pipeline tuning stored in TOML format. Every section falls back to its
//! defaults, so a config file only needs the values it changes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detection::ocr::OcrProfile;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region extraction
    pub region: RegionConfig,
    /// Region enhancement before OCR
    pub preprocess: PreprocessConfig,
    /// OCR engine and profiles
    pub ocr: OcrConfig,
    /// Dictionary lookups
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Pixels added on every side of a detection box
    pub margin: u32,
    /// Regions narrower or shorter than this are dropped
    pub min_size: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            margin: 5,
            min_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Upscale factor
    pub scale: u32,
    /// CLAHE clip limit
    pub clip_limit: f32,
    /// CLAHE tiles per axis
    pub tile_grid: u32,
    /// Non-local means filter strength
    pub denoise_strength: f32,
    /// Non-local means patch side (odd)
    pub patch_size: u32,
    /// Non-local means search window side (odd)
    pub search_size: u32,
    /// Dilation radius; 1 is a 3x3 square
    pub dilate_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            clip_limit: 2.0,
            tile_grid: 8,
            denoise_strength: 3.0,
            patch_size: 7,
            search_size: 21,
            dilate_radius: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// Defaults to `~/.cache/ocrs`.
    pub model_dir: Option<PathBuf>,
    /// Profiles tried on every region, in arbitration order
    pub profiles: Vec<OcrProfile>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            profiles: OcrProfile::DEFAULT.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Word is appended as the last path segment
    pub base_url: String,
    pub timeout_secs: u64,
    /// Definitions kept per part of speech
    pub max_definitions: usize,
    /// Lookups in flight per request
    pub max_concurrent: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            timeout_secs: 10,
            max_definitions: 2,
            max_concurrent: 4,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Per-user config location, e.g. `~/.config/wordlens/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "wordlens")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
