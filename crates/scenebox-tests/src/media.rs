//! Integration tests for decoding and playing media sources.

use crate::fixtures::{all_near, constant_wav, wav_bytes, TempDir, RATE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scenebox_audio::{AudioBuffer, AudioContext, MediaElement, Mixer, Track};
use scenebox_core::SceneboxError;

#[test]
fn data_uri_track_plays_through_channel() {
    let wav = constant_wav(RATE, i16::MAX / 2, 0.5);
    let uri = format!("data:audio/wav;base64,{}", STANDARD.encode(wav));

    let mut mixer = Mixer::new(AudioContext::new(RATE)).unwrap();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let track = channel.input(uri).unwrap().into_track().unwrap();
    assert!((track.duration().unwrap() - 0.5).abs() < 1e-6);

    track.play().into_result().unwrap();
    assert!(all_near(&ctx.render(256), 0.5));
}

#[test]
fn stereo_file_keeps_channels_apart() {
    let dir = TempDir::new();
    let frames: Vec<i16> = (0..480).flat_map(|_| [i16::MAX, 0]).collect();
    let path = dir.write("left.wav", &wav_bytes(RATE, 2, &frames));

    let buffer = AudioBuffer::load(&path.to_string_lossy()).unwrap();
    assert_eq!(buffer.frames(), 480);
    for frame in buffer.samples().chunks_exact(2) {
        assert!(frame[0] > 0.99);
        assert!(frame[1].abs() < 1e-6);
    }
}

#[test]
fn lower_rate_media_is_resampled() {
    let wav = constant_wav(8000, 4000, 0.25);
    let element = MediaElement::from_buffer(AudioBuffer::decode(wav, Some("wav")).unwrap());
    let ctx = AudioContext::new(RATE);
    let track = Track::new(element, &ctx).unwrap();
    track.node().connect(&ctx.destination()).unwrap();
    track.play().into_result().unwrap();

    // A quarter second at the context rate consumes the whole clip.
    ctx.render((RATE / 4) as usize - 1);
    assert!(!track.ended());
    ctx.render(16);
    assert!(track.ended());
    assert!(!track.playing());
}

#[test]
fn looping_track_never_ends() {
    let wav = constant_wav(RATE, 1000, 0.01);
    let uri = format!("data:audio/x-wav;base64,{}", STANDARD.encode(wav));
    let ctx = AudioContext::new(RATE);
    let track = Track::new(uri, &ctx).unwrap();
    track.set_looping(true);
    track.play().into_result().unwrap();
    ctx.render(RATE as usize);
    assert!(track.playing());
    assert!(track.time() < 0.01);
}

#[test]
fn unreadable_sources_fail_at_play() {
    let ctx = AudioContext::new(RATE);
    for src in [
        "https://example.com/sound.mp3",
        "data:audio/wav;base64,not-base64!",
        "/nowhere/sound.wav",
    ] {
        let track = Track::new(src, &ctx).unwrap();
        assert!(track.element().error().is_some(), "{src}");
        assert!(matches!(
            track.play().into_result(),
            Err(SceneboxError::Transport(_))
        ));
    }
}
