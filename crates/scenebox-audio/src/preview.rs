//! One-at-a-time sound preview, as used by a library browser.

use crate::graph::AudioNode;
use crate::track::Track;
use scenebox_core::{Result, Sound};
use std::path::PathBuf;
use tracing::debug;

pub struct Preview {
    target: AudioNode,
    sounds_dir: PathBuf,
    current: Option<Track>,
}

impl Preview {
    /// Previews play into `target`, resolving file names against `sounds_dir`.
    pub fn new(target: AudioNode, sounds_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            sounds_dir: sounds_dir.into(),
            current: None,
        }
    }

    /// Id of the sound currently loaded.
    pub fn current(&self) -> Option<String> {
        self.current.as_ref().map(Track::id)
    }

    /// Track of the sound currently loaded.
    pub fn track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Pause or resume `sound` if it is the loaded one, otherwise replace
    /// the loaded sound with it and start playing. Returns whether `sound`
    /// is now playing.
    pub fn toggle(&mut self, sound: &Sound) -> Result<bool> {
        if let Some(track) = self.current.as_ref().filter(|t| t.id() == sound.id) {
            if track.paused() {
                track.play().into_result()?;
                return Ok(true);
            }
            track.pause();
            return Ok(false);
        }

        if let Some(previous) = self.current.take() {
            debug!(previous = %previous.id(), next = %sound.name, "Replacing preview");
            previous.close();
        }

        let path = self.sounds_dir.join(&sound.file_name);
        let track = Track::new(path.to_string_lossy().into_owned(), self.target.context())?;
        track.set_id(sound.id.clone());
        if let Err(e) = track.node().connect(&self.target) {
            track.close();
            return Err(e.into());
        }
        self.current = Some(track.clone());
        track.play().into_result()?;
        Ok(true)
    }

    /// Pause and release the loaded sound.
    pub fn stop(&mut self) {
        if let Some(track) = self.current.take() {
            track.close();
        }
    }
}
