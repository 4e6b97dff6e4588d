//! Integration tests for catalog scenes and sound previews.

use crate::fixtures::{constant_wav, TempDir, RATE};
use scenebox_audio::{load_scene, AudioContext, Mixer, Preview};
use scenebox_core::{human_time_interval, Library, SceneboxError};

const LIBRARY: &str = r#"{
    "sounds": [
        {"id": "rain", "name": "Rain", "fileName": "rain.wav", "durationMs": 500,
         "categories": ["Ambience"]},
        {"id": "bell", "name": "Bell", "fileName": "bell.wav", "durationMs": 250,
         "categories": ["SFX"]},
        {"id": "ghost", "name": "Ghost", "fileName": "ghost.wav"}
    ],
    "scenes": [
        {"id": "s1", "name": "Chapel", "items": [
            {"soundId": "bell", "position": 1},
            {"soundId": "rain", "position": 0, "loop": true}
        ]},
        {"id": "s2", "name": "Haunted", "items": [
            {"soundId": "ghost", "position": 0},
            {"soundId": "nobody", "position": 1}
        ]}
    ]
}"#;

fn sounds() -> TempDir {
    let dir = TempDir::new();
    dir.write("rain.wav", &constant_wav(RATE, 3000, 0.5));
    dir.write("bell.wav", &constant_wav(RATE, 3000, 0.25));
    dir
}

#[test]
fn scene_loads_in_playlist_order() {
    let dir = sounds();
    let library = Library::from_json(LIBRARY).unwrap();
    let scene = library.scene("Chapel").unwrap();

    let mut mixer = Mixer::new(AudioContext::new(RATE)).unwrap();
    let channel = mixer.add_channel(Some("scene")).unwrap();
    let tracks = load_scene(channel, &library, scene, dir.path()).unwrap();

    let ids: Vec<String> = tracks.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["rain", "bell"]);
    assert!(tracks[0].looping());
    assert!(!tracks[1].looping());
    assert_eq!(channel.tracks().count(), 2);

    let duration_ms = (tracks[1].duration().unwrap() * 1000.0).round() as u64;
    assert_eq!(human_time_interval(duration_ms), "00:00");
    assert_eq!(library.sound("rain").unwrap().duration_ms, 500);

    channel.play(Some("bell")).into_result().unwrap();
    assert!(tracks[1].playing());
    assert!(!tracks[0].playing());
}

#[test]
fn scene_with_unknown_sound_is_rejected() {
    let dir = sounds();
    let library = Library::from_json(LIBRARY).unwrap();
    let scene = library.scene("s2").unwrap();
    let mut mixer = Mixer::new(AudioContext::new(RATE)).unwrap();
    let channel = mixer.add_channel(None).unwrap();
    assert!(matches!(
        load_scene(channel, &library, scene, dir.path()),
        Err(SceneboxError::NotFound(_))
    ));
    assert_eq!(channel.tracks().count(), 0);
}

#[test]
fn preview_toggles_and_replaces() {
    let dir = sounds();
    let library = Library::from_json(LIBRARY).unwrap();
    let rain = library.sound("rain").unwrap();
    let bell = library.sound("bell").unwrap();

    let ctx = AudioContext::new(RATE);
    let mut preview = Preview::new(ctx.destination(), dir.path());

    assert!(preview.toggle(rain).unwrap());
    assert_eq!(preview.current().as_deref(), Some("rain"));
    let rain_track = preview.track().unwrap().clone();

    // Same sound pauses, then resumes.
    assert!(!preview.toggle(rain).unwrap());
    assert!(rain_track.paused());
    assert!(preview.toggle(rain).unwrap());
    assert!(rain_track.playing());

    // Another sound replaces it.
    assert!(preview.toggle(bell).unwrap());
    assert_eq!(preview.current().as_deref(), Some("bell"));
    assert!(rain_track.paused());
    assert!(!rain_track.node().is_alive());

    // Only the destination and the playing preview remain.
    assert_eq!(ctx.node_count(), 2);
    preview.stop();
    assert!(preview.current().is_none());
    assert_eq!(ctx.node_count(), 1);
}

#[test]
fn preview_of_missing_file_reports_error() {
    let dir = sounds();
    let library = Library::from_json(LIBRARY).unwrap();
    let ghost = library.sound("ghost").unwrap();
    let ctx = AudioContext::new(RATE);
    let mut preview = Preview::new(ctx.destination(), dir.path());
    assert!(matches!(
        preview.toggle(ghost),
        Err(SceneboxError::Transport(_))
    ));
}
