//! Shared fakes for engine scenarios.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AudioSession, HistoryFilter, HistoryStore, PlayerEvent, PlayerItem, PlayerItemId,
    SequentialPlayer, SettingsStore, SwipeHistoryRecord, TransportStatus,
};
use core_catalog::{
    CatalogError, Destination, ExtendedMetadata, LibraryWriter, MetadataEnricher,
    SelectionContext, Track, TrackSource,
};
use core_playback::{ContextStore, PlaybackConfig, PlaybackEngine, QueueSnapshot};
use core_runtime::events::{CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;

pub const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Player
// ============================================================================

/// Queue player that behaves like a native one: the first item is current,
/// advancing or finishing removes it.
pub struct FakePlayer {
    state: Mutex<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
}

#[derive(Default)]
struct PlayerState {
    items: Vec<PlayerItem>,
    status: Option<TransportStatus>,
    time: Duration,
    duration: Option<Duration>,
    fail_inserts: bool,
    seeks: Vec<Duration>,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            state: Mutex::new(PlayerState::default()),
            events,
        })
    }

    pub fn locators(&self) -> Vec<String> {
        self.state
            .lock()
            .items
            .iter()
            .map(|item| item.locator.clone())
            .collect()
    }

    pub fn set_position(&self, time: Duration, duration: Option<Duration>) {
        let mut state = self.state.lock();
        state.time = time;
        state.duration = duration;
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.state.lock().fail_inserts = fail;
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.state.lock().seeks.clone()
    }

    /// Simulate the current item reaching its end.
    pub fn finish_current(&self) {
        let (finished, next) = {
            let mut state = self.state.lock();
            if state.items.is_empty() {
                return;
            }
            let finished = state.items.remove(0).id;
            state.time = Duration::ZERO;
            (finished, state.items.first().map(|item| item.id))
        };
        let _ = self.events.send(PlayerEvent::PlayedToEnd(finished));
        let _ = self.events.send(PlayerEvent::CurrentItemChanged(next));
    }

    fn current_changed(&self) {
        let current = self.current_item();
        let _ = self.events.send(PlayerEvent::CurrentItemChanged(current));
    }

    fn set_status(&self, status: TransportStatus) {
        self.state.lock().status = Some(status);
        let _ = self.events.send(PlayerEvent::TransportChanged(status));
    }
}

#[async_trait]
impl SequentialPlayer for FakePlayer {
    async fn insert_after_tail(&self, item: PlayerItem) -> BridgeResult<()> {
        let became_current = {
            let mut state = self.state.lock();
            if state.fail_inserts {
                return Err(BridgeError::PlayerRejected("insert refused".into()));
            }
            state.items.push(item);
            state.items.len() == 1
        };
        if became_current {
            self.current_changed();
        }
        Ok(())
    }

    async fn advance_to_next_item(&self) -> BridgeResult<()> {
        let advanced = {
            let mut state = self.state.lock();
            if state.items.is_empty() {
                false
            } else {
                state.items.remove(0);
                state.time = Duration::ZERO;
                true
            }
        };
        if advanced {
            self.current_changed();
        }
        Ok(())
    }

    async fn remove_all_items(&self) -> BridgeResult<()> {
        let had_items = {
            let mut state = self.state.lock();
            let had_items = !state.items.is_empty();
            state.items.clear();
            had_items
        };
        if had_items {
            self.current_changed();
        }
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.set_status(TransportStatus::Playing);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.set_status(TransportStatus::Paused);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.time = position;
        state.seeks.push(position);
        Ok(())
    }

    fn items(&self) -> Vec<PlayerItemId> {
        self.state.lock().items.iter().map(|item| item.id).collect()
    }

    fn current_item(&self) -> Option<PlayerItemId> {
        self.state.lock().items.first().map(|item| item.id)
    }

    fn current_time(&self) -> Duration {
        self.state.lock().time
    }

    fn current_duration(&self) -> Option<Duration> {
        self.state.lock().duration
    }

    fn transport_status(&self) -> TransportStatus {
        self.state.lock().status.unwrap_or(TransportStatus::WaitingToPlay)
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

pub struct FailingSession;

#[async_trait]
impl AudioSession for FailingSession {
    async fn activate_for_playback(&self) -> BridgeResult<()> {
        Err(BridgeError::NotAvailable("audio session".into()))
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Title {}", id), format!("Artist {}", id))
        .with_preview(format!("https://audio/{}.m4a", id))
}

/// Track source that serves scripted batches, then empty ones.
///
/// With a gate, every fetch waits for a permit.
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Result<Vec<Track>, CatalogError>>>,
    contexts: Mutex<Vec<SelectionContext>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<Track>>) -> Arc<Self> {
        Arc::new(Self::build(batches.into_iter().map(Ok).collect(), None))
    }

    pub fn gated(batches: Vec<Vec<Track>>) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let source = Self::build(batches.into_iter().map(Ok).collect(), Some(gate.clone()));
        (Arc::new(source), gate)
    }

    pub fn with_results(results: Vec<Result<Vec<Track>, CatalogError>>) -> Arc<Self> {
        Arc::new(Self::build(results.into_iter().collect(), None))
    }

    fn build(
        batches: VecDeque<Result<Vec<Track>, CatalogError>>,
        gate: Option<Arc<Semaphore>>,
    ) -> Self {
        Self {
            batches: Mutex::new(batches),
            contexts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<SelectionContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl TrackSource for ScriptedSource {
    async fn fetch_next_tracks(&self, context: &SelectionContext) -> core_catalog::Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            };
        }
        self.batches.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Enricher whose responses are held until released per track.
pub struct GatedEnricher {
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    open: bool,
}

impl GatedEnricher {
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gates: Mutex::new(HashMap::new()),
            open: false,
        })
    }

    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            gates: Mutex::new(HashMap::new()),
            open: true,
        })
    }

    pub fn release(&self, track_id: &str) {
        self.gate(track_id).add_permits(1);
    }

    fn gate(&self, track_id: &str) -> Arc<Semaphore> {
        self.gates
            .lock()
            .entry(track_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }
}

pub fn album_for(track_id: &str) -> String {
    format!("album-{}", track_id)
}

#[async_trait]
impl MetadataEnricher for GatedEnricher {
    async fn fetch_album_metadata(&self, track_id: &str) -> core_catalog::Result<ExtendedMetadata> {
        if !self.open {
            let gate = self.gate(track_id);
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            };
        }
        Ok(ExtendedMetadata {
            album_id: album_for(track_id),
            name: format!("Album of {}", track_id),
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct RecordingWriter {
    pub writes: Mutex<Vec<(String, Destination)>>,
    pub fail: bool,
}

#[async_trait]
impl LibraryWriter for RecordingWriter {
    async fn add_to_destination(
        &self,
        track_id: &str,
        destination: &Destination,
    ) -> core_catalog::Result<()> {
        if self.fail {
            return Err(CatalogError::Status {
                status: 500,
                body: "unavailable".into(),
            });
        }
        self.writes
            .lock()
            .push((track_id.to_string(), destination.clone()));
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.values.lock().get(key).and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    pub stored: Mutex<Vec<SwipeHistoryRecord>>,
    pub fail: bool,
}

impl MemoryHistory {
    pub fn records(&self) -> Vec<SwipeHistoryRecord> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, record: SwipeHistoryRecord) -> BridgeResult<()> {
        if self.fail {
            return Err(BridgeError::DatabaseError("disk full".into()));
        }
        self.stored.lock().push(record);
        Ok(())
    }

    async fn list(&self, filter: HistoryFilter) -> BridgeResult<Vec<SwipeHistoryRecord>> {
        let mut records: Vec<_> = self
            .stored
            .lock()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> BridgeResult<()> {
        self.stored.lock().retain(|r| r.id != id);
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        self.stored.lock().clear();
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: PlaybackEngine,
    pub player: Arc<FakePlayer>,
    pub settings: Arc<MemorySettings>,
    pub events: EventBus,
}

pub fn test_config() -> PlaybackConfig {
    PlaybackConfig::default().with_progress_interval(Duration::from_millis(20))
}

pub fn harness(source: Arc<dyn TrackSource>, enricher: Arc<dyn MetadataEnricher>) -> Harness {
    harness_with_session(source, enricher, Arc::new(bridge_traits::NoopAudioSession))
}

pub fn harness_with_session(
    source: Arc<dyn TrackSource>,
    enricher: Arc<dyn MetadataEnricher>,
    session: Arc<dyn AudioSession>,
) -> Harness {
    let player = FakePlayer::new();
    let settings = Arc::new(MemorySettings::default());
    let events = EventBus::new(256);
    let engine = PlaybackEngine::new(
        player.clone(),
        session,
        source,
        enricher,
        ContextStore::new(settings.clone()),
        events.clone(),
        test_config(),
    );
    Harness {
        engine,
        player,
        settings,
        events,
    }
}

/// Wait until the published snapshot satisfies `predicate`.
pub async fn wait_for_snapshot(
    engine: &PlaybackEngine,
    predicate: impl FnMut(&QueueSnapshot) -> bool,
) -> QueueSnapshot {
    let mut rx = engine.subscribe();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for queue snapshot")
        .expect("engine stopped")
        .clone();
    snapshot
}

pub async fn wait_for_count(engine: &PlaybackEngine, count: usize) -> QueueSnapshot {
    wait_for_snapshot(engine, |s| s.count == count).await
}

/// Wait for the next event matching `predicate`.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<CoreEvent>,
    mut predicate: impl FnMut(&CoreEvent) -> bool,
) -> CoreEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Assert the queue and the player list hold the same items in order.
pub async fn assert_in_step(harness: &Harness) {
    let entries = harness.engine.entries().await.unwrap();
    let entry_items: Vec<PlayerItemId> = entries.iter().map(|e| e.id().player_item_id()).collect();
    assert_eq!(entry_items, harness.player.items());
    assert_eq!(entries.len(), harness.engine.queue_count());
}
