//! # Playback Engine
//!
//! Single authority over queue order, transport and replenishment.
//!
//! ## Overview
//!
//! The engine runs as an actor: one task owns the ordered queue and the host
//! [`SequentialPlayer`]. [`PlaybackEngine`] is a cloneable handle that sends
//! commands to that task and awaits the replies, so every mutation is applied
//! in order and the queue never diverges from the player's item list.
//!
//! Network work never runs on the actor. Replenishment batches and metadata
//! enrichment are spawned tasks that hand their results back as commands:
//!
//! ```text
//! caller ──Skip──▶ actor ──advance──▶ player
//!                    │
//!                    ├─ queue below low-water mark ─▶ spawn replenish
//!                    │                                  │ fetch_next_tracks
//!                    │◀──────────── Append (per track) ─┤ resolve_preview_locator
//!                    │◀──────────── RefillFinished ─────┘
//!                    │
//!                    └─ per appended entry ─▶ spawn enrichment ─▶ Enriched
//! ```
//!
//! ## Invariants
//!
//! - Queue order equals player item order after every settled command.
//! - At most one replenishment per queue generation is in flight.
//! - `clear_queue` starts a new generation; appends from older generations are
//!   rejected and enrichment for removed entries is discarded by id.
//! - Each entry's observers are cancelled the moment it leaves the queue.

use crate::context::ContextStore;
use crate::entry::{EntryId, QueueEntry};
use crate::error::{PlaybackError, Result};
use crate::telemetry::spawn_observer;
use bridge_traits::{AudioSession, PlayerEvent, PlayerItem, PlayerItemId, SequentialPlayer};
use core_catalog::{
    Destination, ExtendedMetadata, MetadataEnricher, RecommendationMode, SelectionContext, Track,
    TrackSource,
};
use core_runtime::config::PlaybackConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent, RemovalReason};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

/// Settled view of the queue, republished after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Entry ids in playback order.
    pub entry_ids: Vec<EntryId>,
    pub count: usize,
    /// Queue head, when it is the player's current item.
    pub active: Option<EntryId>,
    pub generation: u64,
}

// ============================================================================
// Commands
// ============================================================================

type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum Command {
    Initialize {
        reply: Reply<()>,
    },
    Append {
        locator: String,
        track: Track,
        metadata: Option<ExtendedMetadata>,
        /// Set by replenishment; `None` for direct appends.
        generation: Option<u64>,
        reply: Reply<QueueEntry>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Skip {
        /// Only skip when this entry is still the head.
        expected: Option<EntryId>,
        reply: Reply<Option<QueueEntry>>,
    },
    Seek {
        entry_id: EntryId,
        seconds: f64,
        reply: Reply<()>,
    },
    Clear {
        reply: Reply<usize>,
    },
    UpdateContext {
        update: ContextUpdate,
        reply: Reply<()>,
    },
    Context {
        reply: oneshot::Sender<Option<SelectionContext>>,
    },
    Entries {
        reply: oneshot::Sender<Vec<QueueEntry>>,
    },
    ItemFinished {
        item: PlayerItemId,
    },
    CurrentItemChanged,
    Enriched {
        entry_id: EntryId,
        metadata: ExtendedMetadata,
    },
    RefillFinished {
        generation: u64,
        appended: usize,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) enum ContextUpdate {
    Mode(RecommendationMode),
    Destination(Destination),
}

// ============================================================================
// Handle
// ============================================================================

/// Handle to the queue engine.
///
/// Cloning is cheap; all clones talk to the same engine task.
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<QueueSnapshot>,
    command_timeout: Duration,
}

impl PlaybackEngine {
    /// Start the engine task. Must be called from within a Tokio runtime.
    ///
    /// The engine does nothing until [`initialize`](Self::initialize) loads
    /// the listening context.
    pub fn new(
        player: Arc<dyn SequentialPlayer>,
        session: Arc<dyn AudioSession>,
        source: Arc<dyn TrackSource>,
        enricher: Arc<dyn MetadataEnricher>,
        context_store: ContextStore,
        events: EventBus,
        config: PlaybackConfig,
    ) -> Self {
        let (commands, mailbox) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(QueueSnapshot::default());
        let command_timeout = config.command_timeout;

        let actor = EngineActor {
            player,
            session,
            source,
            enricher,
            context_store,
            events,
            config,
            commands: commands.downgrade(),
            snapshot: snapshot_tx,
            queue: VecDeque::new(),
            context: None,
            generation: 0,
            refill: None,
            player_listener: None,
            stopped: false,
        };
        tokio::spawn(actor.run(mailbox));

        Self {
            commands,
            snapshot,
            command_timeout,
        }
    }

    /// Activate the audio session, load the stored listening context, empty
    /// the queue and start listening to the player.
    ///
    /// An audio session failure is logged and reported as
    /// [`PlaybackEvent::SessionDegraded`]; it does not fail initialization.
    pub async fn initialize(&self) -> Result<()> {
        self.call(|reply| Command::Initialize { reply }).await
    }

    /// Insert a new entry after the player's tail and append it to the queue.
    ///
    /// Metadata passed here is attached immediately; otherwise enrichment is
    /// fetched in the background.
    pub async fn append_entry(
        &self,
        locator: impl Into<String>,
        track: Track,
        metadata: Option<ExtendedMetadata>,
    ) -> Result<QueueEntry> {
        let locator = locator.into();
        self.call(|reply| Command::Append {
            locator,
            track,
            metadata,
            generation: None,
            reply,
        })
        .await
    }

    pub async fn play(&self) -> Result<()> {
        self.call(|reply| Command::Play { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.call(|reply| Command::Pause { reply }).await
    }

    /// Advance the player and drop the queue head.
    ///
    /// Returns the removed entry, or `None` when the queue was empty.
    pub async fn skip(&self) -> Result<Option<QueueEntry>> {
        self.call(|reply| Command::Skip {
            expected: None,
            reply,
        })
        .await
    }

    /// Skip only if `entry_id` is still the queue head.
    ///
    /// Returns `None` without touching the player when the entry already left
    /// the queue, for example because it played to the end meanwhile.
    pub async fn skip_entry(&self, entry_id: EntryId) -> Result<Option<QueueEntry>> {
        self.call(|reply| Command::Skip {
            expected: Some(entry_id),
            reply,
        })
        .await
    }

    /// Reposition the player within the active entry.
    pub async fn seek(&self, entry_id: EntryId, seconds: f64) -> Result<()> {
        self.call(|reply| Command::Seek {
            entry_id,
            seconds,
            reply,
        })
        .await
    }

    /// Pause, remove every player item and empty the queue.
    ///
    /// Returns the number of entries removed.
    pub async fn clear_queue(&self) -> Result<usize> {
        self.call(|reply| Command::Clear { reply }).await
    }

    /// Persist a new recommendation mode and clear the queue.
    ///
    /// The queue is empty when this returns.
    pub async fn set_recommendation_mode(&self, mode: RecommendationMode) -> Result<()> {
        self.call(|reply| Command::UpdateContext {
            update: ContextUpdate::Mode(mode),
            reply,
        })
        .await
    }

    /// Persist a new destination for liked tracks and clear the queue.
    pub async fn set_destination(&self, destination: Destination) -> Result<()> {
        self.call(|reply| Command::UpdateContext {
            update: ContextUpdate::Destination(destination),
            reply,
        })
        .await
    }

    /// Current listening context; `None` before initialization.
    pub async fn context(&self) -> Result<Option<SelectionContext>> {
        self.request(|reply| Command::Context { reply }).await
    }

    /// Entries in playback order.
    pub async fn entries(&self) -> Result<Vec<QueueEntry>> {
        self.request(|reply| Command::Entries { reply }).await
    }

    /// The queue head.
    pub async fn current(&self) -> Result<Option<QueueEntry>> {
        Ok(self.entries().await?.into_iter().next())
    }

    /// Queue length as of the last settled mutation.
    pub fn queue_count(&self) -> usize {
        self.snapshot.borrow().count
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stop the engine, release every entry's observers and clear the player.
    ///
    /// Calling this on a stopped engine is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        match self.request(|reply| Command::Shutdown { reply }).await {
            Err(PlaybackError::EngineStopped) => Ok(()),
            other => other,
        }
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        self.request(make).await?
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| PlaybackError::EngineStopped)?;

        match tokio::time::timeout(self.command_timeout, response).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(PlaybackError::EngineStopped),
            Err(_) => Err(PlaybackError::Timeout),
        }
    }
}

// ============================================================================
// Actor
// ============================================================================

/// Queue position owning the entry's observer guard.
struct QueueSlot {
    entry: QueueEntry,
    _observers: DropGuard,
}

struct EngineActor {
    player: Arc<dyn SequentialPlayer>,
    session: Arc<dyn AudioSession>,
    source: Arc<dyn TrackSource>,
    enricher: Arc<dyn MetadataEnricher>,
    context_store: ContextStore,
    events: EventBus,
    config: PlaybackConfig,
    commands: mpsc::WeakUnboundedSender<Command>,
    snapshot: watch::Sender<QueueSnapshot>,
    queue: VecDeque<QueueSlot>,
    context: Option<SelectionContext>,
    generation: u64,
    /// Generation of the in-flight replenishment, if any.
    refill: Option<u64>,
    player_listener: Option<JoinHandle<()>>,
    stopped: bool,
}

impl EngineActor {
    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Command>) {
        debug!("Playback engine started");
        while let Some(command) = mailbox.recv().await {
            if !self.handle(command).await {
                return;
            }
        }
        // Every handle was dropped without an explicit shutdown.
        self.teardown().await;
    }

    /// Returns `false` once the engine should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Initialize { reply } => {
                let _ = reply.send(self.initialize().await);
            }
            Command::Append {
                locator,
                track,
                metadata,
                generation,
                reply,
            } => {
                let result = match generation {
                    Some(generation) if generation != self.generation => {
                        Err(PlaybackError::StaleGeneration)
                    }
                    _ => self.append(locator, track, metadata).await,
                };
                let _ = reply.send(result);
            }
            Command::Play { reply } => {
                let _ = reply.send(self.play().await);
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            Command::Skip { expected, reply } => {
                let _ = reply.send(self.skip(expected).await);
            }
            Command::Seek {
                entry_id,
                seconds,
                reply,
            } => {
                let _ = reply.send(self.seek(entry_id, seconds).await);
            }
            Command::Clear { reply } => {
                let _ = reply.send(self.clear().await);
            }
            Command::UpdateContext { update, reply } => {
                let _ = reply.send(self.update_context(update).await);
            }
            Command::Context { reply } => {
                let _ = reply.send(self.context.clone());
            }
            Command::Entries { reply } => {
                let _ = reply.send(self.queue.iter().map(|slot| slot.entry.clone()).collect());
            }
            Command::ItemFinished { item } => self.on_item_finished(item),
            Command::CurrentItemChanged => self.on_current_item_changed(),
            Command::Enriched { entry_id, metadata } => self.on_enriched(entry_id, metadata),
            Command::RefillFinished {
                generation,
                appended,
            } => self.on_refill_finished(generation, appended),
            Command::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn initialize(&mut self) -> Result<()> {
        if let Err(err) = self.session.activate_for_playback().await {
            warn!(error = %err, "Audio session activation failed, playback continues degraded");
            self.emit_playback(PlaybackEvent::SessionDegraded {
                message: err.to_string(),
            });
        }

        let context = self.context_store.load().await;
        info!(
            mode = %context.mode,
            destination = %context.destination,
            "Playback engine initialized"
        );
        self.context = Some(context);

        self.reset_queue().await?;
        if self.player_listener.is_none() {
            self.player_listener = Some(self.spawn_player_listener());
        }
        self.recompute();
        Ok(())
    }

    async fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(listener) = self.player_listener.take() {
            listener.abort();
        }
        let removed = self.queue.len();
        self.queue.clear();
        self.generation += 1;

        if let Err(err) = self.player.pause().await {
            warn!(error = %err, "Failed to pause player during shutdown");
        }
        if let Err(err) = self.player.remove_all_items().await {
            warn!(error = %err, "Failed to clear player during shutdown");
        }
        self.publish_snapshot();
        info!(removed, "Playback engine stopped");
    }

    fn spawn_player_listener(&self) -> JoinHandle<()> {
        let mut events = self.player.subscribe();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlayerEvent::CurrentItemChanged(_)) | Err(RecvError::Lagged(_)) => {
                        let Some(commands) = commands.upgrade() else {
                            break;
                        };
                        if commands.send(Command::CurrentItemChanged).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // ------------------------------------------------------------------------
    // Queue mutations
    // ------------------------------------------------------------------------

    #[instrument(skip(self, locator, track, metadata), fields(track_id = %track.id))]
    async fn append(
        &mut self,
        locator: String,
        track: Track,
        metadata: Option<ExtendedMetadata>,
    ) -> Result<QueueEntry> {
        let lifetime = CancellationToken::new();
        let entry = QueueEntry::new(locator, track, self.commands.clone(), lifetime.clone());
        let enriched = metadata.map_or(false, |m| entry.attach_metadata(m));

        let item = PlayerItem::new(entry.id().player_item_id(), entry.preview_locator());
        if let Err(err) = self.player.insert_after_tail(item).await {
            lifetime.cancel();
            return Err(PlaybackError::Player(err));
        }

        spawn_observer(
            entry.clone(),
            self.player.clone(),
            self.commands.clone(),
            self.config.progress_interval,
        );
        self.queue.push_back(QueueSlot {
            entry: entry.clone(),
            _observers: lifetime.drop_guard(),
        });

        debug!(entry_id = %entry.id(), queue_len = self.queue.len(), "Entry appended");
        self.emit_queue(QueueEvent::EntryAppended {
            entry_id: entry.id().to_string(),
            track_id: entry.track().id.clone(),
            queue_len: self.queue.len(),
        });

        if !enriched {
            self.spawn_enrichment(&entry);
        }
        self.recompute();
        Ok(entry)
    }

    async fn skip(&mut self, expected: Option<EntryId>) -> Result<Option<QueueEntry>> {
        if let Some(expected) = expected {
            if self.head_id() != Some(expected) {
                debug!(entry_id = %expected, "Skip target already left the queue");
                self.recompute();
                return Ok(None);
            }
        }

        // The player may already have moved past the head on its own while
        // the end-of-item notice is still in flight.
        if let Some(head) = self.head_id() {
            if self.player.current_item() != Some(head.player_item_id()) {
                debug!(entry_id = %head, "Head already finished; skipping without advancing");
                let removed = self.pop_head(RemovalReason::PlayedToEnd);
                self.recompute();
                return Ok(removed);
            }
        }

        self.player
            .advance_to_next_item()
            .await
            .map_err(PlaybackError::Player)?;
        let removed = self.pop_head(RemovalReason::Skipped);
        self.recompute();
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&mut self) -> Result<usize> {
        if let Err(err) = self.player.pause().await {
            warn!(error = %err, "Failed to pause before clearing queue");
        }
        let removed = self.reset_queue().await?;

        info!(removed, generation = self.generation, "Queue cleared");
        self.emit_queue(QueueEvent::Cleared { removed });
        self.recompute();
        Ok(removed)
    }

    /// Empty player and queue and start a new generation.
    async fn reset_queue(&mut self) -> Result<usize> {
        self.player
            .remove_all_items()
            .await
            .map_err(PlaybackError::Player)?;
        let removed = self.queue.len();
        self.queue.clear();
        self.generation += 1;
        Ok(removed)
    }

    fn pop_head(&mut self, reason: RemovalReason) -> Option<QueueEntry> {
        // Dropping the slot cancels the entry's observers.
        let entry = self.queue.pop_front()?.entry;

        debug!(entry_id = %entry.id(), ?reason, queue_len = self.queue.len(), "Entry removed");
        self.emit_queue(QueueEvent::EntryRemoved {
            entry_id: entry.id().to_string(),
            track_id: entry.track().id.clone(),
            reason,
        });
        Some(entry)
    }

    async fn update_context(&mut self, update: ContextUpdate) -> Result<()> {
        let mut context = self.context.clone().unwrap_or_default();
        match update {
            ContextUpdate::Mode(mode) => context.mode = mode,
            ContextUpdate::Destination(destination) => context.destination = destination,
        }

        self.context_store.save(&context).await?;
        info!(
            mode = %context.mode,
            destination = %context.destination,
            "Listening context changed"
        );
        self.context = Some(context);
        self.clear().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn play(&mut self) -> Result<()> {
        self.player.play().await.map_err(PlaybackError::Player)?;
        self.emit_playback(PlaybackEvent::Started {
            entry_id: self.head_id().map(|id| id.to_string()),
        });
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.player.pause().await.map_err(PlaybackError::Player)?;
        self.emit_playback(PlaybackEvent::Paused {
            entry_id: self.head_id().map(|id| id.to_string()),
        });
        Ok(())
    }

    async fn seek(&mut self, entry_id: EntryId, seconds: f64) -> Result<()> {
        if self.head_id() != Some(entry_id) {
            return Err(PlaybackError::EntryNotActive(entry_id.to_string()));
        }
        let position = Duration::try_from_secs_f64(seconds)
            .map_err(|e| PlaybackError::InvalidSeek(format!("{}: {}", seconds, e)))?;

        self.player
            .seek(position)
            .await
            .map_err(PlaybackError::Player)?;
        self.emit_playback(PlaybackEvent::Seeked {
            entry_id: entry_id.to_string(),
            position_ms: u64::try_from(position.as_millis()).unwrap_or(u64::MAX),
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Task results
    // ------------------------------------------------------------------------

    fn on_item_finished(&mut self, item: PlayerItemId) {
        if self.head_id().map(|id| id.player_item_id()) != Some(item) {
            debug!(item = %item, "Ignoring end of an item that is not the queue head");
            return;
        }
        self.pop_head(RemovalReason::PlayedToEnd);
        self.recompute();
    }

    fn on_current_item_changed(&mut self) {
        let before = self.snapshot.borrow().active;
        self.publish_snapshot();
        let active = self.snapshot.borrow().active;
        if active != before {
            self.emit_playback(PlaybackEvent::Advanced {
                entry_id: active.map(|id| id.to_string()),
            });
        }
    }

    fn on_enriched(&mut self, entry_id: EntryId, metadata: ExtendedMetadata) {
        let Some(slot) = self.queue.iter().find(|slot| slot.entry.id() == entry_id) else {
            debug!(entry_id = %entry_id, "Discarding metadata for an entry no longer queued");
            return;
        };
        if slot.entry.attach_metadata(metadata) {
            debug!(entry_id = %entry_id, "Entry enriched");
            self.emit_queue(QueueEvent::EntryEnriched {
                entry_id: entry_id.to_string(),
            });
        }
    }

    fn on_refill_finished(&mut self, generation: u64, appended: usize) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Ignoring superseded replenishment");
            return;
        }
        self.refill = None;
        info!(appended, queue_len = self.queue.len(), "Replenishment finished");
        self.emit_queue(QueueEvent::ReplenishCompleted { appended });

        // An empty batch waits for the next natural trigger.
        if appended > 0 {
            self.recompute();
        }
    }

    // ------------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------------

    /// Publish a snapshot and top the queue up if it fell below the mark.
    fn recompute(&mut self) {
        self.publish_snapshot();

        if self.stopped || self.queue.len() >= self.config.low_water_mark {
            return;
        }
        if self.refill == Some(self.generation) {
            return;
        }
        if let Some(context) = self.context.clone() {
            self.start_refill(context);
        }
    }

    fn publish_snapshot(&self) {
        let entry_ids: Vec<EntryId> = self.queue.iter().map(|slot| slot.entry.id()).collect();
        let current = self.player.current_item();
        let active = self
            .head_id()
            .filter(|id| Some(id.player_item_id()) == current);

        self.snapshot.send_replace(QueueSnapshot {
            count: entry_ids.len(),
            entry_ids,
            active,
            generation: self.generation,
        });
    }

    fn head_id(&self) -> Option<EntryId> {
        self.queue.front().map(|slot| slot.entry.id())
    }

    // ------------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------------

    fn start_refill(&mut self, context: SelectionContext) {
        let generation = self.generation;
        self.refill = Some(generation);

        info!(generation, queue_len = self.queue.len(), "Replenishing queue");
        self.emit_queue(QueueEvent::ReplenishStarted {
            generation,
            queue_len: self.queue.len(),
        });

        tokio::spawn(replenish(
            self.source.clone(),
            context,
            generation,
            self.commands.clone(),
            self.events.clone(),
        ));
    }

    fn spawn_enrichment(&self, entry: &QueueEntry) {
        let enricher = self.enricher.clone();
        let commands = self.commands.clone();
        let entry_id = entry.id();
        let track_id = entry.track().id.clone();

        tokio::spawn(async move {
            match enricher.fetch_album_metadata(&track_id).await {
                Ok(metadata) => {
                    if let Some(commands) = commands.upgrade() {
                        let _ = commands.send(Command::Enriched { entry_id, metadata });
                    }
                }
                Err(err) => {
                    warn!(track_id = %track_id, error = %err, "Metadata enrichment failed");
                }
            }
        });
    }

    fn emit_queue(&self, event: QueueEvent) {
        let _ = self.events.emit(CoreEvent::Queue(event));
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        let _ = self.events.emit(CoreEvent::Playback(event));
    }
}

/// Fetch one batch and append every track with a playable preview.
async fn replenish(
    source: Arc<dyn TrackSource>,
    context: SelectionContext,
    generation: u64,
    commands: mpsc::WeakUnboundedSender<Command>,
    events: EventBus,
) {
    let appended = match source.fetch_next_tracks(&context).await {
        Ok(tracks) => {
            debug!(generation, candidates = tracks.len(), "Fetched replenishment batch");
            append_batch(source.as_ref(), tracks, generation, &commands).await
        }
        Err(err) => {
            warn!(generation, error = %err, transient = err.is_transient(), "Replenishment fetch failed");
            let _ = events.emit(CoreEvent::Queue(QueueEvent::ReplenishFailed {
                message: err.to_string(),
            }));
            0
        }
    };

    if let Some(commands) = commands.upgrade() {
        let _ = commands.send(Command::RefillFinished {
            generation,
            appended,
        });
    }
}

async fn append_batch(
    source: &dyn TrackSource,
    tracks: Vec<Track>,
    generation: u64,
    commands: &mpsc::WeakUnboundedSender<Command>,
) -> usize {
    let mut appended = 0;

    for track in tracks {
        let Some(locator) = source.resolve_preview_locator(&track).await else {
            debug!(track_id = %track.id, "No preview available, skipping candidate");
            continue;
        };
        let Some(sender) = commands.upgrade() else {
            break;
        };

        let (reply, response) = oneshot::channel();
        let command = Command::Append {
            locator,
            track,
            metadata: None,
            generation: Some(generation),
            reply,
        };
        if sender.send(command).is_err() {
            break;
        }
        drop(sender);

        match response.await {
            Ok(Ok(_)) => appended += 1,
            Ok(Err(PlaybackError::StaleGeneration)) => {
                debug!(generation, "Queue cleared during replenishment, dropping batch");
                break;
            }
            Ok(Err(err)) => warn!(error = %err, "Failed to append replenished track"),
            Err(_) => break,
        }
    }
    appended
}
