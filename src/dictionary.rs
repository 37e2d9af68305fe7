//! Definition lookups against a dictionary web service.
//!
//! The service answers `GET {base_url}/{word}` with a JSON array of entries;
//! every shape it can answer with is folded into a [`DefinitionResult`] here.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LookupConfig;
use crate::models::{DefinitionResult, DetectedWord, Meaning};

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    meanings: Vec<EntryMeaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryMeaning {
    #[serde(default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<EntryDefinition>,
}

#[derive(Debug, Deserialize)]
struct EntryDefinition {
    definition: String,
}

/// Resolves words to dictionary meanings. Lookups never fail: transport,
/// status and payload problems come back as [`DefinitionResult::LookupError`].
#[derive(Clone, Debug)]
pub struct DefinitionResolver {
    client: Client,
    base_url: String,
    max_definitions: usize,
}

impl DefinitionResolver {
    pub fn new(config: &LookupConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_definitions: config.max_definitions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn resolve(&self, word: &DetectedWord) -> DefinitionResult {
        let url = format!("{}/{}", self.base_url, word);
        debug!(%word, %url, "Looking up definition");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%word, "Definition lookup failed: {e}");
                return DefinitionResult::LookupError(describe_transport_error(&e));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%word, "No definition found");
            return DefinitionResult::NotFound;
        }
        if !status.is_success() {
            warn!(%word, %status, "Definition service returned an error status");
            return DefinitionResult::LookupError(format!("Definition service returned {status}"));
        }

        match response.json::<Vec<Entry>>().await {
            Ok(entries) => self.meanings_from(entries),
            Err(e) => {
                warn!(%word, "Malformed definition payload: {e}");
                DefinitionResult::LookupError(format!("Malformed definition payload: {e}"))
            }
        }
    }

    /// Meanings of the first entry, each trimmed to `max_definitions`.
    /// Parts of speech without any definition are skipped.
    fn meanings_from(&self, entries: Vec<Entry>) -> DefinitionResult {
        let Some(entry) = entries.into_iter().next() else {
            return DefinitionResult::NotFound;
        };

        let meanings: Vec<Meaning> = entry
            .meanings
            .into_iter()
            .filter(|m| !m.definitions.is_empty())
            .map(|m| Meaning {
                part_of_speech: m.part_of_speech,
                definitions: m
                    .definitions
                    .into_iter()
                    .take(self.max_definitions)
                    .map(|d| d.definition)
                    .collect(),
            })
            .collect();

        if meanings.is_empty() {
            DefinitionResult::NotFound
        } else {
            DefinitionResult::Found(meanings)
        }
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Definition lookup timed out".to_string()
    } else if e.is_connect() {
        format!("Could not reach definition service: {e}")
    } else {
        format!("Definition lookup failed: {e}")
    }
}
