//! Per-entry player observers.
//!
//! Each queued entry gets one observer task. While the entry's player item is
//! the current item, the task samples position on a fixed interval, mirrors
//! transport changes and reports natural end-of-item back to the engine. The
//! task ends when the entry's lifetime token is cancelled, which happens as
//! soon as the engine drops the entry from its queue.

use crate::engine::Command;
use crate::entry::QueueEntry;
use bridge_traits::{PlayerEvent, SequentialPlayer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub(crate) fn spawn_observer(
    entry: QueueEntry,
    player: Arc<dyn SequentialPlayer>,
    engine: mpsc::WeakUnboundedSender<Command>,
    interval: Duration,
) {
    // Subscribe before the task starts so no event after the insert is missed.
    let events = player.subscribe();
    tokio::spawn(observe(entry, player, events, engine, interval));
}

async fn observe(
    entry: QueueEntry,
    player: Arc<dyn SequentialPlayer>,
    mut events: broadcast::Receiver<PlayerEvent>,
    engine: mpsc::WeakUnboundedSender<Command>,
    interval: Duration,
) {
    let lifetime = entry.lifetime();
    let item = entry.id().player_item_id();

    let mut active = false;
    sync_active(&entry, player.as_ref(), &mut active);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = lifetime.cancelled() => break,
            _ = ticker.tick(), if active => sample(&entry, player.as_ref()),
            event = events.recv() => match event {
                Ok(PlayerEvent::CurrentItemChanged(_)) => {
                    sync_active(&entry, player.as_ref(), &mut active);
                }
                Ok(PlayerEvent::TransportChanged(status)) if active => {
                    entry.update_telemetry(|t| t.is_playing = status.as_playing_flag());
                }
                Ok(PlayerEvent::PlayedToEnd(finished)) if finished == item => {
                    debug!(entry_id = %entry.id(), "Entry played to end");
                    match engine.upgrade() {
                        Some(engine) => {
                            let _ = engine.send(Command::ItemFinished { item });
                        }
                        None => break,
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    trace!(entry_id = %entry.id(), skipped, "Observer lagged, resyncing");
                    sync_active(&entry, player.as_ref(), &mut active);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    entry.update_telemetry(|t| t.is_active = false);
    trace!(entry_id = %entry.id(), "Observer released");
}

fn sync_active(entry: &QueueEntry, player: &dyn SequentialPlayer, active: &mut bool) {
    let now_active = player.current_item() == Some(entry.id().player_item_id());
    if now_active == *active {
        return;
    }
    *active = now_active;

    if now_active {
        let playing = player.transport_status().as_playing_flag();
        entry.update_telemetry(|t| {
            t.is_active = true;
            t.is_playing = playing;
        });
        sample(entry, player);
    } else {
        entry.update_telemetry(|t| t.is_active = false);
    }
}

fn sample(entry: &QueueEntry, player: &dyn SequentialPlayer) {
    let progress = player.current_time();
    let duration = player.current_duration().or(entry.track().duration);
    entry.update_telemetry(|t| {
        t.progress = progress;
        t.duration = duration;
    });
}
