//! Mock collaborators for engine tests.
//!
//! [`MockDecoder`] records every command and lets tests inject the decode
//! engine's asynchronous signals; [`MockResolver`] serves canned quality
//! ladders with per-resource delays and failure injection. Both are plain
//! hand-written fakes so tests can drive ordering precisely.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::sleep;
use url::Url;

use tessera_core::{MediaReference, Quality, ResourceId};
use tessera_events::DecoderEvent;

use crate::error::{PlayError, PlayResult};
use crate::traits::decoder::Decoder;
use crate::traits::resolver::Resolver;

pub use crate::traits::prefs::PreferencesMock;

const DEFAULT_ANNOUNCED_DURATION: Duration = Duration::from_secs(600);

#[derive(Debug)]
struct DecoderState {
    position: Duration,
    duration: Option<Duration>,
    announced_duration: Duration,
    buffering: bool,
    playing: bool,
    rate: f32,
    released: bool,
    opens: Vec<(MediaReference, bool)>,
    seeks: Vec<Duration>,
    open_delay: Duration,
    seek_delay: Duration,
    fail_next_open: Option<String>,
    next_seek_lands_at: Option<Duration>,
    clear_buffering_on_seek: bool,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            position: Duration::ZERO,
            duration: None,
            announced_duration: DEFAULT_ANNOUNCED_DURATION,
            buffering: false,
            playing: false,
            rate: 1.0,
            released: false,
            opens: Vec::new(),
            seeks: Vec::new(),
            open_delay: Duration::ZERO,
            seek_delay: Duration::ZERO,
            fail_next_open: None,
            next_seek_lands_at: None,
            clear_buffering_on_seek: false,
        }
    }
}

/// Scriptable decode engine.
#[derive(Debug)]
pub struct MockDecoder {
    state: Mutex<DecoderState>,
    events: broadcast::Sender<DecoderEvent>,
}

impl Default for MockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDecoder {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(DecoderState::default()),
            events,
        }
    }

    // -- scripting --

    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = delay;
    }

    pub fn set_seek_delay(&self, delay: Duration) {
        self.state.lock().seek_delay = delay;
    }

    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_open = Some(reason.into());
    }

    /// The next seek lands at `position` instead of its target. One-shot.
    pub fn set_next_seek_lands_at(&self, position: Duration) {
        self.state.lock().next_seek_lands_at = Some(position);
    }

    pub fn set_clear_buffering_on_seek(&self, clear: bool) {
        self.state.lock().clear_buffering_on_seek = clear;
    }

    pub fn set_announced_duration(&self, duration: Duration) {
        self.state.lock().announced_duration = duration;
    }

    // -- signal injection --

    pub fn emit_position(&self, position: Duration) {
        self.state.lock().position = position;
        let _ = self.events.send(DecoderEvent::PositionChanged { position });
    }

    pub fn emit_buffering(&self, buffering: bool) {
        self.state.lock().buffering = buffering;
        let _ = self.events.send(DecoderEvent::BufferingChanged { buffering });
    }

    pub fn emit_completed(&self) {
        self.state.lock().playing = false;
        let _ = self.events.send(DecoderEvent::Completed);
    }

    pub fn emit_failed(&self, error: impl Into<String>) {
        let _ = self.events.send(DecoderEvent::Failed {
            error: error.into(),
        });
    }

    // -- introspection --

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().opens.len()
    }

    #[must_use]
    pub fn opens(&self) -> Vec<(MediaReference, bool)> {
        self.state.lock().opens.clone()
    }

    #[must_use]
    pub fn seeks(&self) -> Vec<Duration> {
        self.state.lock().seeks.clone()
    }

    #[must_use]
    pub fn last_seek(&self) -> Option<Duration> {
        self.state.lock().seeks.last().copied()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    #[must_use]
    pub fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    #[must_use]
    pub fn released(&self) -> bool {
        self.state.lock().released
    }
}

#[async_trait]
impl Decoder for MockDecoder {
    async fn open(&self, media: &MediaReference, autoplay: bool) -> PlayResult<()> {
        let (delay, fail) = {
            let mut state = self.state.lock();
            (state.open_delay, state.fail_next_open.take())
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if let Some(reason) = fail {
            return Err(PlayError::Decoder { reason });
        }
        let duration = {
            let mut state = self.state.lock();
            state.opens.push((media.clone(), autoplay));
            state.position = Duration::ZERO;
            state.buffering = false;
            state.playing = autoplay;
            state.duration = Some(state.announced_duration);
            state.announced_duration
        };
        let _ = self.events.send(DecoderEvent::DurationKnown { duration });
        Ok(())
    }

    fn play(&self) {
        self.state.lock().playing = true;
    }

    fn pause(&self) {
        self.state.lock().playing = false;
    }

    async fn seek(&self, position: Duration) -> PlayResult<()> {
        let delay = self.state.lock().seek_delay;
        if !delay.is_zero() {
            sleep(delay).await;
        }
        let cleared = {
            let mut state = self.state.lock();
            state.seeks.push(position);
            state.position = state.next_seek_lands_at.take().unwrap_or(position);
            let cleared = state.clear_buffering_on_seek && state.buffering;
            if cleared {
                state.buffering = false;
            }
            cleared
        };
        if cleared {
            let _ = self
                .events
                .send(DecoderEvent::BufferingChanged { buffering: false });
        }
        Ok(())
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().rate = rate;
    }

    fn position(&self) -> Duration {
        self.state.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state.lock().duration
    }

    fn is_buffering(&self) -> bool {
        self.state.lock().buffering
    }

    fn subscribe(&self) -> broadcast::Receiver<DecoderEvent> {
        self.events.subscribe()
    }

    async fn release(&self) {
        self.state.lock().released = true;
    }
}

#[derive(Debug, Default)]
struct ResolverState {
    ladders: HashMap<String, Vec<Quality>>,
    delays: HashMap<String, Duration>,
    failing_labels: HashSet<String>,
    failing_listings: HashSet<String>,
    list_calls: Vec<String>,
    resolve_calls: Vec<(String, String)>,
}

/// Scriptable streaming-resource resolver.
#[derive(Debug, Default)]
pub struct MockResolver {
    state: Mutex<ResolverState>,
}

impl MockResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with the given rendition labels.
    #[must_use]
    pub fn with_resource(self, resource: &str, labels: &[&str]) -> Self {
        let ladder = labels
            .iter()
            .map(|label| Quality::parse(label).expect("test ladder label"))
            .collect();
        self.state.lock().ladders.insert(resource.to_owned(), ladder);
        self
    }

    /// Delay every call touching `resource`.
    pub fn set_delay_for(&self, resource: &str, delay: Duration) {
        self.state.lock().delays.insert(resource.to_owned(), delay);
    }

    /// Make resolution of one rendition label fail everywhere.
    pub fn fail_resolve(&self, label: &str) {
        self.state.lock().failing_labels.insert(label.to_owned());
    }

    pub fn fail_listing(&self, resource: &str) {
        self.state
            .lock()
            .failing_listings
            .insert(resource.to_owned());
    }

    /// Undo [`fail_resolve`](MockResolver::fail_resolve).
    pub fn allow_resolve(&self, label: &str) {
        self.state.lock().failing_labels.remove(label);
    }

    /// Undo [`fail_listing`](MockResolver::fail_listing).
    pub fn allow_listing(&self, resource: &str) {
        self.state.lock().failing_listings.remove(resource);
    }

    #[must_use]
    pub fn list_count(&self, resource: &str) -> usize {
        self.state
            .lock()
            .list_calls
            .iter()
            .filter(|r| r.as_str() == resource)
            .count()
    }

    #[must_use]
    pub fn resolve_count(&self, resource: &str, label: &str) -> usize {
        self.state
            .lock()
            .resolve_calls
            .iter()
            .filter(|(r, l)| r == resource && l == label)
            .count()
    }

    #[must_use]
    pub fn total_resolve_count(&self) -> usize {
        self.state.lock().resolve_calls.len()
    }

    fn delay_for(&self, resource: &ResourceId) -> Duration {
        self.state
            .lock()
            .delays
            .get(resource.as_str())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn list_qualities(&self, resource: &ResourceId) -> PlayResult<Vec<Quality>> {
        let delay = self.delay_for(resource);
        if !delay.is_zero() {
            sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.list_calls.push(resource.to_string());
        if state.failing_listings.contains(resource.as_str()) {
            return Err(PlayError::Internal("listing failed".to_owned()));
        }
        Ok(state
            .ladders
            .get(resource.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve(
        &self,
        resource: &ResourceId,
        quality: &Quality,
    ) -> PlayResult<MediaReference> {
        let delay = self.delay_for(resource);
        if !delay.is_zero() {
            sleep(delay).await;
        }
        let mut state = self.state.lock();
        state
            .resolve_calls
            .push((resource.to_string(), quality.label().to_owned()));
        if state.failing_labels.contains(quality.label()) {
            return Err(PlayError::ResolveFailed {
                quality: quality.label().to_owned(),
                reason: "injected failure".to_owned(),
            });
        }
        let url = Url::parse(&format!(
            "https://cdn.test/{resource}/{label}.m3u8",
            label = quality.label()
        ))
        .expect("mock media url");
        Ok(MediaReference::from_url(url))
    }
}
