#![forbid(unsafe_code)]

//! Stall watchdog and tiered recovery.

use std::time::Duration;

use tessera_events::{Event, RecoveryEvent, RecoveryTier};
use tessera_play::PlaybackPhase;
use tessera_tests::{Harness, RESOURCE, expect_event, wait_until};

#[tokio::test(start_paused = true)]
async fn buffering_that_clears_in_time_never_recovers() {
    let harness = Harness::new();
    harness.start().await;

    harness.decoder.emit_buffering(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    harness.decoder.emit_buffering(false);
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(harness.decoder.open_count(), 1);
    assert!(harness.decoder.seeks().is_empty());
    assert_eq!(harness.player.error_message(), None);
    assert_eq!(harness.player.phase(), PlaybackPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn buffering_while_paused_does_not_arm_the_watchdog() {
    let harness = Harness::new();
    harness.start().await;

    harness.player.pause();
    let player = harness.player.clone();
    wait_until(move || !player.is_playing()).await;

    harness.decoder.emit_buffering(true);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.decoder.open_count(), 1);
    assert!(harness.decoder.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_stall_recovers_with_a_nudge_when_buffering_clears() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;
    harness.decoder.set_clear_buffering_on_seek(true);

    harness.decoder.emit_buffering(true);

    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Stalled { .. }))
    })
    .await;
    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Recovery(RecoveryEvent::Recovered { tier: RecoveryTier::Nudge })
        )
    })
    .await;

    // The nudge skipped forward on the existing decoder instance.
    assert_eq!(harness.decoder.open_count(), 1);
    assert_eq!(harness.decoder.seeks(), vec![Duration::from_secs(2)]);
    assert_eq!(harness.player.position(), Duration::from_secs(2));
    assert!(!harness.player.is_buffering());
}

#[tokio::test(start_paused = true)]
async fn failed_nudge_escalates_to_full_reload() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    harness.decoder.emit_position(Duration::from_secs(100));
    let player = harness.player.clone();
    wait_until(move || player.position() == Duration::from_secs(100)).await;

    // Buffering never clears on its own: nudge runs out its grace period,
    // then the reload tier rebuilds the pipeline.
    harness.decoder.emit_buffering(true);

    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Stalled { .. }))
    })
    .await;
    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Recovery(RecoveryEvent::Attempt { tier: RecoveryTier::Nudge, attempt: 1 })
        )
    })
    .await;
    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Recovery(RecoveryEvent::Attempt { tier: RecoveryTier::Reload, attempt: 1 })
        )
    })
    .await;
    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Recovery(RecoveryEvent::Recovered { tier: RecoveryTier::Reload })
        )
    })
    .await;

    // Exactly one nudge seek and one reload reseek, both at the nudged
    // intent, and exactly one extra open.
    let nudged = Duration::from_secs(102);
    assert_eq!(harness.decoder.seeks(), vec![nudged, nudged]);
    assert_eq!(harness.decoder.open_count(), 2);
    assert_eq!(harness.player.position(), nudged);
    assert!(harness.player.is_playing());
    assert_eq!(harness.player.error_message(), None);
}

#[tokio::test(start_paused = true)]
async fn repeat_stall_skips_the_nudge_tier() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    // First episode: nudge cannot clear buffering and the reload fails at
    // resolution, so the stall count stays at one.
    harness.resolver.fail_resolve("720p");
    harness.decoder.emit_buffering(true);

    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Failed { .. }))
    })
    .await;
    assert!(harness.player.error_message().is_some());
    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Stalled).await;

    // Second episode: the watchdog re-arms on the next buffering signal and
    // goes straight to reload.
    harness.resolver.allow_resolve("720p");
    harness.decoder.emit_buffering(true);

    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Stalled { .. }))
    })
    .await;
    let attempt = expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Attempt { .. }))
    })
    .await;
    assert!(matches!(
        attempt,
        Event::Recovery(RecoveryEvent::Attempt { tier: RecoveryTier::Reload, attempt: 2 })
    ));
    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Recovered { .. }))
    })
    .await;

    assert_eq!(harness.player.error_message(), None);
    assert_eq!(harness.player.phase(), PlaybackPhase::Ready);
    // Only the successful reload opened a new pipeline.
    assert_eq!(harness.decoder.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn connectivity_restored_retries_a_failed_load() {
    let harness = Harness::new();
    harness.resolver.fail_listing(RESOURCE);
    harness.player.initialize(RESOURCE, None);

    let player = harness.player.clone();
    wait_until(move || player.error_message().is_some()).await;

    harness.resolver.allow_listing(RESOURCE);
    harness.player.connectivity_restored();
    harness.ready().await;
    assert_eq!(harness.player.error_message(), None);
    assert_eq!(harness.player.current_quality().unwrap().label(), "720p");
}

#[tokio::test(start_paused = true)]
async fn connectivity_restored_without_an_error_is_ignored() {
    let harness = Harness::new();
    harness.start().await;

    harness.player.connectivity_restored();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.decoder.open_count(), 1);
    assert!(harness.decoder.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn seek_during_recovery_is_chased_after_the_reload() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    harness.decoder.emit_position(Duration::from_secs(50));
    let player = harness.player.clone();
    wait_until(move || player.position() == Duration::from_secs(50)).await;

    // Slow the reload's re-resolution down so a seek can land underneath.
    harness.resolver.set_delay_for(RESOURCE, Duration::from_millis(500));
    harness.decoder.emit_buffering(true);
    expect_event(&mut events, |e| {
        matches!(
            e,
            Event::Recovery(RecoveryEvent::Attempt { tier: RecoveryTier::Reload, .. })
        )
    })
    .await;

    let target = Duration::from_secs(200);
    harness.player.seek(target);

    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Recovered { .. }))
    })
    .await;
    let player = harness.player.clone();
    wait_until(move || {
        player.phase() == PlaybackPhase::Ready && player.position() == target
    })
    .await;
    assert_eq!(harness.decoder.last_seek(), Some(target));
    assert!(harness.player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn decoder_failure_routes_through_recovery() {
    let harness = Harness::new();
    let mut events = harness.player.events();
    harness.start().await;

    harness.decoder.emit_position(Duration::from_secs(40));
    let player = harness.player.clone();
    wait_until(move || player.position() == Duration::from_secs(40)).await;

    harness.decoder.emit_failed("bitstream corrupted");
    expect_event(&mut events, |e| {
        matches!(e, Event::Recovery(RecoveryEvent::Recovered { .. }))
    })
    .await;

    assert_eq!(harness.decoder.open_count(), 2);
    assert_eq!(harness.decoder.last_seek(), Some(Duration::from_secs(40)));
    assert!(harness.player.is_playing());
}
