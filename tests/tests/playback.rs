#![forbid(unsafe_code)]

//! Core load/transport scenarios.

use std::time::Duration;

use rstest::rstest;
use tessera_events::{Event, PlaybackEvent, QualityEvent};
use tessera_play::{PlaybackPhase, PlayerConfig, Preferences};
use tessera_tests::{Harness, RESOURCE, expect_event, wait_until};

#[tokio::test(start_paused = true)]
async fn initial_load_selects_default_rendition_below_ceiling() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    // `[1080p, 720p, 480p]` with no stored preference and the default 720
    // ceiling picks 720p, with exactly one decoder open.
    assert_eq!(
        harness.player.current_quality().unwrap().label(),
        "720p"
    );
    assert_eq!(harness.decoder.open_count(), 1);
    assert_eq!(harness.resolver.resolve_count(RESOURCE, "720p"), 1);
    assert!(harness.player.is_playing());
    assert!(harness.decoder.is_playing());

    let labels: Vec<String> = harness
        .player
        .qualities()
        .iter()
        .map(|q| q.label().to_owned())
        .collect();
    assert_eq!(labels, ["1080p", "720p", "480p"]);

    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Quality(QualityEvent::Applied { previous: None, quality }) if quality == "720p"
        )
    })
    .await;
}

#[rstest]
#[case(Some(480), "480p")]
#[case(Some(2160), "1080p")]
#[case(None, "1080p")]
#[tokio::test(start_paused = true)]
async fn ceiling_drives_default_selection(#[case] ceiling: Option<u32>, #[case] expected: &str) {
    let harness =
        Harness::with_config(PlayerConfig::default().with_default_quality_ceiling(ceiling));
    harness.start().await;
    assert_eq!(
        harness.player.current_quality().unwrap().label(),
        expected
    );
}

#[tokio::test(start_paused = true)]
async fn rate_changes_reach_the_decoder() {
    let harness = Harness::new();
    harness.start().await;
    harness.player.set_rate(1.5);
    let decoder = harness.decoder.clone();
    wait_until(move || (decoder.rate() - 1.5).abs() < f32::EPSILON).await;
}

#[tokio::test(start_paused = true)]
async fn stored_preference_beats_default_policy() {
    let harness = Harness::new();
    harness.prefs.set_preferred_quality("1080p");
    harness.start().await;
    assert_eq!(
        harness.player.current_quality().unwrap().label(),
        "1080p"
    );
}

#[tokio::test(start_paused = true)]
async fn position_ticks_drive_progress() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    harness.decoder.emit_position(Duration::from_secs(10));
    let player = harness.player.clone();
    wait_until(move || player.position() == Duration::from_secs(10)).await;

    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Playback(PlaybackEvent::Progress { position, .. })
                if *position == Duration::from_secs(10)
        )
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn zero_position_reports_are_never_trusted() {
    let harness = Harness::new();
    harness.start().await;

    harness.decoder.emit_position(Duration::from_secs(10));
    let player = harness.player.clone();
    wait_until(move || player.position() == Duration::from_secs(10)).await;

    harness.decoder.emit_position(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.player.position(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn completion_without_loop_ends_playback() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    harness.decoder.emit_completed();
    expect_event(&mut events, |e| {
        matches!(e, Event::Playback(PlaybackEvent::Ended))
    })
    .await;

    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Ended).await;
    assert!(!harness.player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn completion_with_loop_restarts_from_zero() {
    let harness = Harness::new();
    harness.start().await;

    harness.player.toggle_loop();
    let player = harness.player.clone();
    wait_until(move || player.loop_enabled()).await;
    assert!(harness.prefs.loop_enabled());

    harness.decoder.emit_position(Duration::from_secs(590));
    harness.decoder.emit_completed();

    let decoder = harness.decoder.clone();
    let player = harness.player.clone();
    wait_until(move || {
        decoder.seeks().contains(&Duration::ZERO) && player.is_playing()
    })
    .await;
    assert_ne!(harness.player.phase(), PlaybackPhase::Ended);
}

#[tokio::test(start_paused = true)]
async fn play_after_ended_restarts() {
    let harness = Harness::new();
    harness.start().await;

    harness.decoder.emit_completed();
    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Ended).await;

    harness.player.play();
    let decoder = harness.decoder.clone();
    let player = harness.player.clone();
    wait_until(move || {
        decoder.seeks().contains(&Duration::ZERO) && player.is_playing()
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn pause_and_play_round_trip() {
    let harness = Harness::new();
    harness.start().await;

    harness.player.pause();
    let player = harness.player.clone();
    wait_until(move || !player.is_playing()).await;
    assert!(!harness.decoder.is_playing());

    harness.player.play();
    let player = harness.player.clone();
    wait_until(move || player.is_playing()).await;
    assert!(harness.decoder.is_playing());
}

#[tokio::test(start_paused = true)]
async fn failed_listing_surfaces_retryable_error_and_retry_recovers() {
    let harness = Harness::new();
    harness.resolver.fail_listing(RESOURCE);
    let mut events = harness.player.events();
    harness.player.initialize(RESOURCE, None);

    expect_event(&mut events, |e| {
        matches!(e, Event::Playback(PlaybackEvent::Error { retryable: true, .. }))
    })
    .await;
    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Failed).await;
    assert!(harness.player.error_message().is_some());
    assert_eq!(harness.decoder.open_count(), 0);

    harness.resolver.allow_listing(RESOURCE);
    harness.player.retry();
    harness.ready().await;
    assert_eq!(harness.player.error_message(), None);
    assert_eq!(harness.decoder.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_initializations_commit_only_the_newest() {
    use std::sync::Arc;

    use tessera_play::PlayerConfig;
    use tessera_play::mock::{MockDecoder, MockResolver};
    use tessera_tests::LADDER;

    let resolver = Arc::new(
        MockResolver::new()
            .with_resource("first", &LADDER)
            .with_resource("second", &LADDER),
    );
    resolver.set_delay_for("first", Duration::from_millis(500));
    let harness = Harness::with_parts(
        Arc::new(MockDecoder::new()),
        resolver,
        PlayerConfig::default(),
    );

    harness.player.initialize("first", None);
    harness.player.initialize("second", None);
    harness.ready().await;

    assert_eq!(harness.decoder.open_count(), 1);
    let (media, _) = &harness.decoder.opens()[0];
    assert!(media.url().path().contains("second"));

    // Let the superseded load run to completion; it must not add an open.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.decoder.open_count(), 1);
}
