#![forbid(unsafe_code)]

//! Position authority under seeks: immediate intent, tick filtering,
//! settle verification and mismatch recovery.

use std::time::Duration;

use tessera_play::{Decoder, PlaybackPhase};
use tessera_tests::{Harness, wait_until};

#[tokio::test(start_paused = true)]
async fn seek_moves_intent_before_the_decoder_settles() {
    let harness = Harness::new();
    harness.start().await;
    harness.decoder.set_seek_delay(Duration::from_millis(200));

    let target = Duration::from_secs(60);
    harness.player.seek(target);

    let player = harness.player.clone();
    wait_until(move || player.position() == target).await;
    // The decoder has not even accepted the seek yet.
    assert!(harness.decoder.seeks().is_empty() || harness.decoder.position() != target);
}

#[tokio::test(start_paused = true)]
async fn tick_arriving_mid_seek_cannot_regress_the_position() {
    let harness = Harness::new();
    harness.start().await;
    harness.decoder.set_seek_delay(Duration::from_millis(200));

    let target = Duration::from_secs(60);
    harness.player.seek(target);
    let player = harness.player.clone();
    wait_until(move || player.position() == target).await;

    // A stale pre-seek position report arrives while the seek is in flight.
    harness.decoder.emit_position(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.player.position(), target);

    // After the settle check the intent is unchanged.
    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Ready).await;
    assert_eq!(harness.player.position(), target);
}

#[tokio::test(start_paused = true)]
async fn settle_mismatch_triggers_reload_and_reseek() {
    let harness = Harness::new();
    harness.start().await;

    let target = Duration::from_secs(60);
    // The decoder lands far away from the target exactly once.
    harness.decoder.set_next_seek_lands_at(Duration::from_secs(120));
    harness.player.seek(target);

    // Full reload: a second open, then a reseek that lands in tolerance.
    let decoder = harness.decoder.clone();
    wait_until(move || decoder.open_count() == 2).await;
    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Ready).await;

    assert_eq!(harness.decoder.last_seek(), Some(target));
    assert_eq!(harness.decoder.position(), target);
    assert_eq!(harness.player.position(), target);
    assert_eq!(harness.player.error_message(), None);
    assert!(harness.player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn newest_of_overlapping_seeks_wins() {
    let harness = Harness::new();
    harness.start().await;
    harness.decoder.set_seek_delay(Duration::from_millis(100));

    harness.player.seek(Duration::from_secs(30));
    harness.player.seek(Duration::from_secs(90));

    let player = harness.player.clone();
    wait_until(move || player.phase() == PlaybackPhase::Ready).await;
    assert_eq!(harness.player.position(), Duration::from_secs(90));
}
