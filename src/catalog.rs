use crate::model::Track;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CATALOG_ENV: &str = "ENCORE_CATALOG";

/// One portfolio item as authored in the catalogue file. External links are
/// display-only; the core never follows them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub description: String,
    pub media_url: String,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub bandcamp_url: Option<String>,
}

impl CatalogEntry {
    pub fn to_track(&self, artist: &str) -> Track {
        Track {
            id: self.id,
            title: self.title.clone(),
            artist: artist.to_string(),
            media_url: self.media_url.clone(),
            artwork_url: self.artwork_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub artist: String,
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Catalogue path from an explicit flag or the `ENCORE_CATALOG`
    /// environment override.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        env::var(CATALOG_ENV).ok().map(PathBuf::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalogue {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalogue {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Construction invariants for track descriptors: ids unique, title and
    /// media locator non-empty. Descriptors handed to the coordinator are
    /// never validated again downstream.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.id) {
                anyhow::bail!("duplicate catalogue id {}", entry.id);
            }
            if entry.title.trim().is_empty() {
                anyhow::bail!("catalogue id {} has an empty title", entry.id);
            }
            if entry.media_url.trim().is_empty() {
                anyhow::bail!("catalogue id {} has no media locator", entry.id);
            }
        }
        Ok(())
    }

    /// Filter categories in authoring order, with "All" first.
    pub fn categories(&self) -> Vec<String> {
        let mut out = vec![String::from("All")];
        for entry in &self.entries {
            if !out.contains(&entry.category) {
                out.push(entry.category.clone());
            }
        }
        out
    }

    pub fn entries_in(&self, category: &str) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| category == "All" || entry.category == category)
            .collect()
    }

    /// The built-in portfolio, used when no catalogue file is configured.
    pub fn sample() -> Self {
        let entry = |id, title: &str, category: &str, description: &str, media: &str| CatalogEntry {
            id,
            title: title.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            media_url: format!("media/{media}"),
            artwork_url: Some(format!("artwork/{media}.jpg")),
            spotify_url: None,
            youtube_url: None,
            bandcamp_url: None,
        };

        Self {
            artist: String::from("Alex Marlowe"),
            entries: vec![
                entry(
                    1,
                    "City Lights Serenade",
                    "Original Composition",
                    "An atmospheric instrumental piece exploring urban nocturnal soundscapes, blending jazz harmonies with electronic textures.",
                    "city-lights-serenade.mp3",
                ),
                entry(
                    2,
                    "Whispering Woods (Film Score)",
                    "Film Score",
                    "A haunting orchestral score for an indie short film about nature, mystery, and ancient spirits.",
                    "whispering-woods.mp3",
                ),
                entry(
                    3,
                    "Rhythm of the Soul (Live)",
                    "Live Performance",
                    "An energetic recording from a live jazz fusion performance, showcasing improvisation and tight grooves.",
                    "rhythm-of-the-soul.mp3",
                ),
                entry(
                    4,
                    "Electronic Dreams (Collab)",
                    "Collaboration",
                    "A collaborative track blending melodic techno with organic sounds.",
                    "electronic-dreams.mp3",
                ),
                entry(
                    5,
                    "Ambient Echoes Vol. 1",
                    "Album",
                    "A full-length ambient album of lush soundscapes and gentle textures.",
                    "ambient-echoes.mp3",
                ),
                entry(
                    6,
                    "Jazz Cafe Sessions",
                    "EP",
                    "Smooth jazz pieces recorded in an intimate cafe setting.",
                    "jazz-cafe-sessions.mp3",
                ),
            ],
        }
    }
}
