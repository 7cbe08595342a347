#![forbid(unsafe_code)]

//! Preload orchestration: produce-once handoff, supersession, player
//! adoption.

use std::sync::Arc;
use std::time::Duration;

use tessera_play::mock::{MockDecoder, MockResolver};
use tessera_play::{MemoryPreferences, Player, PlayerConfig, Preloader};
use tessera_tests::{Harness, LADDER, RESOURCE, init_tracing, wait_until};

fn preloader_parts() -> (Arc<MockResolver>, Arc<MemoryPreferences>) {
    init_tracing();
    let resolver = Arc::new(MockResolver::new().with_resource(RESOURCE, &LADDER));
    (resolver, Arc::new(MemoryPreferences::new()))
}

#[tokio::test(start_paused = true)]
async fn preload_hands_the_same_result_to_every_waiter() {
    let (resolver, prefs) = preloader_parts();
    let preloader = Preloader::new(Arc::clone(&resolver), prefs, PlayerConfig::default());

    preloader.preload(RESOURCE.into(), Some(Duration::from_secs(30)));

    let first = preloader.wait_for_media().await.unwrap();
    let second = preloader.wait_for_media().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(first.quality.label(), "720p");
    assert_eq!(first.initial_position, Some(Duration::from_secs(30)));
    // Adjacent renditions came along, resolved exactly once each.
    assert_eq!(first.prefetched.len(), 2);
    assert_eq!(resolver.list_count(RESOURCE), 1);
    assert_eq!(resolver.resolve_count(RESOURCE, "720p"), 1);
    assert_eq!(resolver.resolve_count(RESOURCE, "1080p"), 1);
    assert_eq!(resolver.resolve_count(RESOURCE, "480p"), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_preload_never_publishes() {
    init_tracing();
    let resolver = Arc::new(
        MockResolver::new()
            .with_resource("first", &LADDER)
            .with_resource("second", &LADDER),
    );
    resolver.set_delay_for("first", Duration::from_millis(500));
    let preloader = Preloader::new(
        Arc::clone(&resolver),
        Arc::new(MemoryPreferences::new()),
        PlayerConfig::default(),
    );

    preloader.preload("first".into(), None);
    preloader.preload("second".into(), None);

    let media = preloader.wait_for_media().await.unwrap();
    assert_eq!(media.resource_id.as_str(), "second");

    // Let the abandoned preload finish; the visible result must not change.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let media = preloader.wait_for_media().await.unwrap();
    assert_eq!(media.resource_id.as_str(), "second");
}

#[tokio::test(start_paused = true)]
async fn preload_failure_reaches_the_waiter() {
    let (resolver, prefs) = preloader_parts();
    resolver.fail_listing(RESOURCE);
    let preloader = Preloader::new(resolver, prefs, PlayerConfig::default());

    preloader.preload(RESOURCE.into(), None);
    let result = preloader.wait_for_media().await;
    assert!(result.is_err());
    assert!(result.unwrap_err().is_retryable());
}

#[tokio::test(start_paused = true)]
async fn adopting_a_preload_skips_re_resolution() {
    let (resolver, prefs) = preloader_parts();
    let preloader = Preloader::new(
        Arc::clone(&resolver),
        Arc::clone(&prefs),
        PlayerConfig::default(),
    );
    preloader.preload(RESOURCE.into(), Some(Duration::from_secs(30)));
    let media = preloader.wait_for_media().await.unwrap();

    let decoder = Arc::new(MockDecoder::new());
    let player = Player::spawn(
        Arc::clone(&decoder),
        Arc::clone(&resolver),
        prefs,
        PlayerConfig::default(),
    );
    player.initialize_with_preloaded(media);

    let probe = player.clone();
    wait_until(move || probe.phase() == tessera_play::PlaybackPhase::Ready).await;

    // One listing total: the player adopted the orchestrator's work,
    // including the adjacent prefetches.
    assert_eq!(resolver.list_count(RESOURCE), 1);
    assert_eq!(resolver.total_resolve_count(), 3);
    assert_eq!(decoder.open_count(), 1);
    assert_eq!(player.current_quality().unwrap().label(), "720p");
    assert_eq!(player.position(), Duration::from_secs(30));
    assert_eq!(decoder.last_seek(), Some(Duration::from_secs(30)));
}

#[tokio::test(start_paused = true)]
async fn hand_off_starts_playback_on_a_bound_player() {
    let (resolver, prefs) = preloader_parts();
    let preloader = Preloader::new(
        Arc::clone(&resolver),
        Arc::clone(&prefs),
        PlayerConfig::default(),
    );
    preloader.preload(RESOURCE.into(), None);

    let decoder = Arc::new(MockDecoder::new());
    let player = Player::spawn(
        Arc::clone(&decoder),
        Arc::clone(&resolver),
        prefs,
        PlayerConfig::default(),
    );
    preloader.hand_off_to(&player);

    let probe = player.clone();
    wait_until(move || probe.is_playing()).await;
    assert_eq!(resolver.list_count(RESOURCE), 1);
    assert_eq!(decoder.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn preload_then_quality_switch_uses_the_adopted_cache() {
    let harness = {
        let (resolver, prefs) = preloader_parts();
        let preloader = Preloader::new(
            Arc::clone(&resolver),
            Arc::clone(&prefs),
            PlayerConfig::default(),
        );
        preloader.preload(RESOURCE.into(), None);
        let media = preloader.wait_for_media().await.unwrap();

        let harness = Harness::with_parts(
            Arc::new(MockDecoder::new()),
            resolver,
            PlayerConfig::default(),
        );
        harness.player.initialize_with_preloaded(media);
        harness
    };
    harness.ready().await;

    harness.player.change_quality("1080p");
    let probe = harness.player.clone();
    wait_until(move || {
        probe.current_quality().map(|q| q.label().to_owned()) == Some("1080p".to_owned())
    })
    .await;

    // The adopted prefetch served the switch; 1080p was resolved once ever.
    assert_eq!(harness.resolver.resolve_count(RESOURCE, "1080p"), 1);
}
