//! Integration tests for mixer, channel and track behavior.

use crate::fixtures::{all_near, constant_element, constant_wav, Invert, TempDir, RATE};
use scenebox_audio::{
    AudioContext, ContextState, MediaStream, Mixer, Track, TransportState,
};
use scenebox_core::{EngineConfig, GraphError, SceneboxError};
use std::time::Duration;

fn mixer() -> Mixer {
    Mixer::new(AudioContext::new(RATE)).unwrap()
}

#[test]
fn input_play_pause_resume_scenario() {
    let dir = TempDir::new();
    let file = dir.write("track.wav", &constant_wav(RATE, 8000, 1.0));

    let mut mixer = mixer();
    let channel = mixer.add_channel(Some("main")).unwrap();
    let track = channel
        .input(file.to_string_lossy().into_owned())
        .unwrap()
        .into_track()
        .unwrap();
    assert_eq!(channel.tracks().count(), 1);

    channel.play(None).into_result().unwrap();
    assert!(track.playing());

    channel.pause();
    assert!(track.paused());
    assert_eq!(
        channel.transport_state(),
        &TransportState::PausedForResume(vec![track.clone()])
    );

    channel.play(None).into_result().unwrap();
    assert!(track.playing());
    assert_eq!(channel.transport_state(), &TransportState::Idle);
}

#[test]
fn resume_skips_tracks_paused_before() {
    let mut mixer = mixer();
    let channel = mixer.add_channel(None).unwrap();
    let a = channel.input(constant_element(0.1, 1.0)).unwrap().into_track().unwrap();
    let b = channel.input(constant_element(0.1, 1.0)).unwrap().into_track().unwrap();
    let c = channel.input(constant_element(0.1, 1.0)).unwrap().into_track().unwrap();
    a.play().into_result().unwrap();
    c.play().into_result().unwrap();

    channel.pause();
    assert!(channel.is_paused());

    channel.play(Some("ignored")).into_result().unwrap();
    assert!(a.playing());
    assert!(!b.playing());
    assert!(c.playing());
}

#[test]
fn duplicate_attach_keeps_one_entry() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let track = Track::new(constant_element(0.1, 1.0), &ctx).unwrap();
    track.output(channel).unwrap();
    track.output(channel).unwrap();
    channel.add_track(&track).unwrap();
    assert_eq!(channel.tracks().count(), 1);
    assert_eq!(track.node().receivers(), vec![channel.input_node().clone()]);
}

#[test]
fn remove_all_nodes_restores_direct_route() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let master = mixer.input_node().clone();
    let channel = mixer.add_channel(None).unwrap();
    let effect_a = ctx.create_gain();
    let effect_b = ctx.create_gain();
    channel.add_node(effect_a.clone()).unwrap();
    channel.add_node(effect_b.clone()).unwrap();
    assert_eq!(channel.output_node().receivers(), vec![effect_a.clone()]);

    channel.remove_all_nodes().unwrap();
    assert!(channel.custom_nodes().is_empty());
    assert_eq!(channel.output_node().receivers(), vec![master]);
    assert!(effect_a.receivers().is_empty());
    assert!(effect_b.receivers().is_empty());
}

#[test]
fn add_then_remove_node_is_a_round_trip() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let master = mixer.input_node().clone();
    let channel = mixer.add_channel(None).unwrap();
    let before = channel.output_node().receivers();

    let effect = ctx.create_gain();
    channel.add_node(effect.clone()).unwrap();
    channel.remove_node(&effect).unwrap();

    assert_eq!(channel.output_node().receivers(), before);
    assert_eq!(before, vec![master]);
    assert!(channel.custom_nodes().is_empty());
}

#[test]
fn failed_reconnect_falls_back_to_master() {
    let mut mixer = mixer();
    let master = mixer.input_node().clone();
    let channel = mixer.add_channel(None).unwrap();
    channel.set_volume(0.3);

    let foreign = AudioContext::new(RATE).create_gain();
    let err = channel.add_node(foreign.clone()).unwrap_err();
    assert!(matches!(
        err,
        SceneboxError::Graph(GraphError::ContextMismatch)
    ));
    assert_eq!(channel.output_node().receivers(), vec![master.clone()]);
    // The reconnect always leaves the volume stage at unity.
    assert_eq!(channel.volume(), 1.0);

    // Dropping the bad insert heals the channel.
    channel.remove_node(&foreign).unwrap();
    assert_eq!(channel.output_node().receivers(), vec![master]);
}

#[test]
fn remove_unknown_node_changes_nothing() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let effect = ctx.create_gain();
    channel.add_node(effect.clone()).unwrap();
    let routing = channel.output_node().receivers();

    let err = channel.remove_node(&ctx.create_gain()).unwrap_err();
    assert!(matches!(err, SceneboxError::NodeNotFound));
    assert_eq!(channel.custom_nodes(), &[effect]);
    assert_eq!(channel.output_node().receivers(), routing);
}

#[test]
fn channel_lookup_and_default_ids() {
    let mut mixer = mixer();
    assert_eq!(mixer.add_channel(None).unwrap().id(), "0");
    assert_eq!(mixer.add_channel(None).unwrap().id(), "1");
    assert!(mixer.get_channel("missing").is_none());
    assert!(mixer.get_channel("1").is_some());
    assert_eq!(mixer.channels().len(), 2);
}

#[test]
fn signal_flows_to_destination() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let track = channel.input(constant_element(0.5, 1.0)).unwrap().into_track().unwrap();
    track.play().into_result().unwrap();

    assert!(all_near(&ctx.render(128), 0.5));

    channel.set_volume(0.5);
    assert!(all_near(&ctx.render(128), 0.25));

    channel.set_muted(true);
    assert!(all_near(&ctx.render(128), 0.0));
    channel.set_muted(false);

    mixer.set_volume(0.0);
    assert!(all_near(&ctx.render(128), 0.0));
}

#[test]
fn hard_pan_moves_signal() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let track = channel.input(constant_element(0.5, 1.0)).unwrap().into_track().unwrap();
    track.play().into_result().unwrap();
    channel.set_pan(-1.0);

    let out = ctx.render(64);
    for frame in out.chunks_exact(2) {
        assert!((frame[0] - 1.0).abs() < 1e-3);
        assert!(frame[1].abs() < 1e-3);
    }
}

#[test]
fn insert_processes_signal() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let channel = mixer.add_channel(None).unwrap();
    let track = channel.input(constant_element(0.5, 1.0)).unwrap().into_track().unwrap();
    track.play().into_result().unwrap();

    channel.add_node(ctx.create_processor(Box::new(Invert))).unwrap();
    assert!(all_near(&ctx.render(64), -0.5));
}

#[test]
fn stream_source_feeds_channel() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let (stream, mut writer) = MediaStream::new(1024);
    let node = ctx.create_media_stream_source(&stream).unwrap();

    let channel = mixer.add_channel(Some("mic")).unwrap();
    let input = channel.input(node.clone()).unwrap();
    assert!(input.into_track().is_none());
    assert!(node.is_connected_to(channel.input_node()));
    assert_eq!(channel.tracks().count(), 0);

    writer.write_frames(&[0.25; 64], 1);
    let out = ctx.render(64);
    assert!(all_near(&out, 0.25));
    // Underrun reads as silence.
    assert!(all_near(&ctx.render(64), 0.0));
}

#[test]
fn connect_to_context_adds_direct_route() {
    let mut mixer = mixer();
    let ctx = mixer.context().clone();
    let master = mixer.input_node().clone();
    let channel = mixer.add_channel(None).unwrap();
    let returned = channel.connect_to_context().unwrap();
    assert_eq!(returned, ctx);
    assert!(channel.output_node().is_connected_to(&ctx.destination()));
    channel.disconnect_from_context().unwrap();
    assert!(!channel.output_node().is_connected_to(&ctx.destination()));
    assert!(channel.output_node().is_connected_to(&master));
}

#[test]
fn closing_mixer_cascades() {
    let ctx = AudioContext::new(RATE);
    let mut mixer = Mixer::new(ctx.clone()).unwrap();
    let track = mixer
        .add_channel(None)
        .unwrap()
        .input(constant_element(0.5, 1.0))
        .unwrap()
        .into_track()
        .unwrap();
    track.play().into_result().unwrap();

    mixer.close();
    assert!(track.node().receivers().is_empty());
    assert!(!track.node().is_alive());
    assert!(all_near(&ctx.render(64), 0.0));
    assert_eq!(ctx.state(), ContextState::Running);
    assert_eq!(ctx.node_count(), 1);

    assert!(mixer.channels().is_empty());
    assert!(mixer.get_channel("0").is_none());
}

#[test]
fn owned_context_starts_suspended() {
    let config = EngineConfig::default();
    let mut mixer = scenebox_audio::create_mixer(&config).unwrap();
    assert_eq!(mixer.resume_context(), ContextState::Suspended);
    assert_eq!(mixer.context().state(), ContextState::Suspended);
    mixer.context().render(config.block_size);
    assert_eq!(mixer.context().state(), ContextState::Running);
    mixer.close();
    assert_eq!(mixer.context().state(), ContextState::Closed);
}

#[tokio::test(start_paused = true)]
async fn fade_out_takes_about_fifty_ticks() {
    let mut mixer = mixer();
    let channel = mixer.add_channel(None).unwrap();
    let started = tokio::time::Instant::now();
    let fade = channel.fade_out(Some(Duration::from_millis(1000))).unwrap();
    assert!(fade.await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(96), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(110), "{elapsed:?}");
    assert_eq!(channel.input_gain(), 0.0);
    assert_eq!(channel.volume(), 1.0);
    assert!(!channel.muted());
}

#[tokio::test(start_paused = true)]
async fn fade_never_goes_negative() {
    let mut mixer = mixer();
    let channel = mixer.add_channel(None).unwrap();
    let input = channel.input_node().clone();
    let fade = channel.fade_out(Some(Duration::from_millis(10))).unwrap();
    while !fade.is_finished() {
        assert!(input.gain().value() >= 0.0);
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(fade.await);
    assert_eq!(channel.input_gain(), 0.0);
}
