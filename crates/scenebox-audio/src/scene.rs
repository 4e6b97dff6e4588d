//! Loading catalog scenes into a channel.

use crate::channel::Channel;
use crate::track::Track;
use scenebox_core::{Library, Result, Scene};
use std::path::Path;
use tracing::info;

/// Create one track per scene item, in playlist order, and attach them to
/// `channel`. Track ids are the sound ids; item loop flags are applied.
///
/// Files are resolved against `sounds_dir`. A file that fails to decode still
/// yields a track; the failure is reported when that track is played.
pub fn load_scene(
    channel: &mut Channel,
    library: &Library,
    scene: &Scene,
    sounds_dir: &Path,
) -> Result<Vec<Track>> {
    let items = library.resolve_scene(scene)?;
    let mut tracks = Vec::with_capacity(items.len());
    for (item, sound) in items {
        let path = sounds_dir.join(&sound.file_name);
        let track = Track::new(path.to_string_lossy().into_owned(), channel.context())?;
        track.set_id(sound.id.clone());
        track.set_looping(item.looping);
        channel.add_track(&track)?;
        tracks.push(track);
    }
    info!(scene = %scene.name, channel = %channel.id(), tracks = tracks.len(), "Scene loaded");
    Ok(tracks)
}
