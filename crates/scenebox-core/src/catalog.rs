//! Catalog data supplied by the persistent store.
//!
//! The engine never talks to the database; the surrounding application
//! hands it these records to decide which sources to load into which
//! channel.

use crate::error::{Result, SceneboxError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Broad usage category of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCategory {
    Ambience,
    Music,
    #[serde(rename = "SFX")]
    Sfx,
}

/// Setting a sound fits into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundGenre {
    Fantasy,
    #[serde(rename = "Sci-Fi")]
    SciFi,
    Modern,
}

/// A catalogued audio clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// File name relative to the sounds directory.
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    /// Duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<SoundCategory>,
    #[serde(default)]
    pub genres: Vec<SoundGenre>,
}

/// One entry of a scene's playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    pub sound_id: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

/// An ordered playlist of sounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

impl Scene {
    /// Items sorted by position. Equal positions keep insertion order.
    pub fn ordered_items(&self) -> Vec<&SceneItem> {
        let mut items: Vec<&SceneItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.position);
        items
    }
}

/// In-memory snapshot of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub sounds: Vec<Sound>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl Library {
    /// Parse a library from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a library file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Find a sound by ID.
    pub fn sound(&self, id: &str) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id == id)
    }

    /// Find a scene by ID or name.
    pub fn scene(&self, key: &str) -> Option<&Scene> {
        self.scenes
            .iter()
            .find(|s| s.id == key)
            .or_else(|| self.scenes.iter().find(|s| s.name == key))
    }

    /// Resolve a scene's items to sounds, in playlist order.
    pub fn resolve_scene<'a>(
        &'a self,
        scene: &'a Scene,
    ) -> Result<Vec<(&'a SceneItem, &'a Sound)>> {
        scene
            .ordered_items()
            .into_iter()
            .map(|item| {
                self.sound(&item.sound_id)
                    .map(|sound| (item, sound))
                    .ok_or_else(|| {
                        SceneboxError::NotFound(format!(
                            "sound {} referenced by scene {}",
                            item.sound_id, scene.name
                        ))
                    })
            })
            .collect()
    }

    /// Sounds matching a category.
    pub fn sounds_in_category(&self, category: SoundCategory) -> impl Iterator<Item = &Sound> {
        self.sounds
            .iter()
            .filter(move |s| s.categories.contains(&category))
    }
}
