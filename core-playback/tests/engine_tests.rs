//! Queue engine scenarios against an in-memory player.

mod common;

use bridge_traits::SequentialPlayer;
use common::*;
use core_catalog::{Destination, ExtendedMetadata, RecommendationMode, SelectionContext};
use core_playback::context::{DESTINATION_KEY, MODE_KEY, PLAYLIST_ID_KEY};
use core_playback::PlaybackError;
use core_runtime::events::{CoreEvent, PlaybackEvent, QueueEvent, RemovalReason};
use std::time::Duration;

fn is_replenish_completed(event: &CoreEvent) -> bool {
    matches!(event, CoreEvent::Queue(QueueEvent::ReplenishCompleted { .. }))
}

// ============================================================================
// Positional invariant & FIFO
// ============================================================================

#[tokio::test]
async fn appends_mirror_player_order() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());

    for id in ["a", "b", "c", "d"] {
        h.engine.append_entry(format!("https://audio/{}", id), track(id), None).await.unwrap();
        assert_in_step(&h).await;
    }

    assert_eq!(h.engine.queue_count(), 4);
    assert_eq!(
        h.player.locators(),
        vec!["https://audio/a", "https://audio/b", "https://audio/c", "https://audio/d"]
    );
}

#[tokio::test]
async fn skips_remove_entries_in_append_order() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());

    let mut appended = Vec::new();
    for id in ["a", "b", "c", "d", "e"] {
        appended.push(h.engine.append_entry(format!("https://audio/{}", id), track(id), None).await.unwrap());
    }

    for expected in appended.iter().take(3) {
        let removed = h.engine.skip().await.unwrap().expect("queue not empty");
        assert_eq!(&removed, expected);
        assert!(!removed.is_queued());
        assert_in_step(&h).await;
    }

    let remaining: Vec<_> = h.engine.entries().await.unwrap();
    assert_eq!(remaining, appended[3..].to_vec());
}

#[tokio::test]
async fn skip_on_empty_queue_is_a_no_op() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());

    assert!(h.engine.skip().await.unwrap().is_none());
    assert_eq!(h.engine.queue_count(), 0);
    assert!(h.player.items().is_empty());
}

#[tokio::test]
async fn rejected_insert_leaves_queue_untouched() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();

    h.player.fail_inserts(true);
    let err = h.engine.append_entry("https://audio/b", track("b"), None).await.unwrap_err();

    assert!(matches!(err, PlaybackError::Player(_)));
    assert_eq!(h.engine.queue_count(), 1);
    assert_in_step(&h).await;
}

#[tokio::test]
async fn played_to_end_drops_the_head() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let mut events = h.events.subscribe();
    let first = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();
    let second = h.engine.append_entry("https://audio/b", track("b"), None).await.unwrap();

    h.player.finish_current();

    let removed = wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Queue(QueueEvent::EntryRemoved { .. }))
    })
    .await;
    assert_eq!(
        removed,
        CoreEvent::Queue(QueueEvent::EntryRemoved {
            entry_id: first.id().to_string(),
            track_id: "a".into(),
            reason: RemovalReason::PlayedToEnd,
        })
    );

    let snapshot = wait_for_snapshot(&h.engine, |s| s.active == Some(second.id())).await;
    assert_eq!(snapshot.entry_ids, vec![second.id()]);
    assert_in_step(&h).await;
}

#[tokio::test]
async fn skip_after_natural_end_does_not_advance_past_next() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let mut appended = Vec::new();
    for id in ["a", "b", "c"] {
        appended.push(h.engine.append_entry(format!("https://audio/{}", id), track(id), None).await.unwrap());
    }

    // The player has moved on to "b" before the engine hears about it.
    h.player.finish_current();
    let removed = h.engine.skip_entry(appended[0].id()).await.unwrap();

    if let Some(removed) = removed {
        assert_eq!(removed, appended[0]);
    }
    assert_in_step(&h).await;
    assert_eq!(h.player.locators(), vec!["https://audio/b", "https://audio/c"]);

    // The late end-of-item notice for "a" must not drop anything else.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.entries().await.unwrap(), appended[1..].to_vec());
    assert_in_step(&h).await;
}

// ============================================================================
// Replenishment
// ============================================================================

#[tokio::test]
async fn initialize_fills_queue_from_source() {
    let source = ScriptedSource::new(vec![vec![track("1"), track("2"), track("3")]]);
    let h = harness(source.clone(), GatedEnricher::open());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    wait_for_event(&mut events, is_replenish_completed).await;

    let snapshot = wait_for_count(&h.engine, 3).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(source.contexts(), vec![SelectionContext::default()]);
    assert!(snapshot.active.is_some());
    assert_in_step(&h).await;
}

#[tokio::test]
async fn no_replenishment_at_or_above_low_water_mark() {
    let source = ScriptedSource::new(vec![vec![track("1"), track("2"), track("3"), track("4")]]);
    let h = harness(source.clone(), GatedEnricher::open());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    wait_for_event(&mut events, is_replenish_completed).await;
    assert_eq!(h.engine.queue_count(), 4);

    // 4 -> 3 stays at the mark.
    h.engine.skip().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.calls(), 1);

    // 3 -> 2 drops below it.
    h.engine.skip().await.unwrap();
    wait_for_event(&mut events, is_replenish_completed).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn replenishment_is_single_flight() {
    let (source, gate) = ScriptedSource::gated(vec![vec![track("1"), track("2"), track("3")]]);
    let h = harness(source.clone(), GatedEnricher::open());

    h.engine.initialize().await.unwrap();
    for id in ["x", "y"] {
        h.engine.append_entry(format!("https://audio/{}", id), track(id), None).await.unwrap();
    }
    for _ in 0..2 {
        h.engine.skip().await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.calls(), 1);

    gate.add_permits(1);
    wait_for_count(&h.engine, 3).await;
    assert_in_step(&h).await;
}

#[tokio::test]
async fn tracks_without_preview_are_skipped() {
    let silent = core_catalog::Track::new("silent", "No Preview", "Nobody");
    let source = ScriptedSource::new(vec![vec![track("1"), silent, track("2")]]);
    let h = harness(source, GatedEnricher::open());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    let completed = wait_for_event(&mut events, is_replenish_completed).await;

    assert_eq!(
        completed,
        CoreEvent::Queue(QueueEvent::ReplenishCompleted { appended: 2 })
    );
    let ids: Vec<String> = h
        .engine
        .entries()
        .await
        .unwrap()
        .iter()
        .map(|e| e.track().id.clone())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn failed_fetch_is_swallowed_and_retried_on_next_trigger() {
    let source = ScriptedSource::with_results(vec![
        Err(core_catalog::CatalogError::Http("offline".into())),
        Ok(vec![track("1")]),
    ]);
    let h = harness(source.clone(), GatedEnricher::open());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Queue(QueueEvent::ReplenishFailed { .. }))
    })
    .await;
    wait_for_event(&mut events, is_replenish_completed).await;
    assert_eq!(h.engine.queue_count(), 0);
    assert_eq!(source.calls(), 1);

    // Skipping the empty queue is the next natural trigger.
    h.engine.skip().await.unwrap();
    wait_for_count(&h.engine, 1).await;
    assert!(source.calls() >= 2);
}

// ============================================================================
// Enrichment
// ============================================================================

#[tokio::test]
async fn enrichment_attaches_by_identity_out_of_order() {
    let enricher = GatedEnricher::gated();
    let source = ScriptedSource::new(vec![vec![track("T1"), track("T2"), track("T3")]]);
    let h = harness(source, enricher.clone());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    wait_for_count(&h.engine, 3).await;
    let entries = h.engine.entries().await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.track().id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "T2", "T3"]);
    assert!(entries.iter().all(|e| e.extended_metadata().is_none()));

    for (position, track_id) in [(1, "T2"), (2, "T3"), (0, "T1")] {
        enricher.release(track_id);
        let expected = entries[position].id().to_string();
        wait_for_event(&mut events, |e| {
            matches!(e, CoreEvent::Queue(QueueEvent::EntryEnriched { entry_id }) if *entry_id == expected)
        })
        .await;
    }

    for entry in &entries {
        let metadata = entry.extended_metadata().expect("enriched");
        assert_eq!(metadata.album_id, album_for(&entry.track().id));
    }
}

#[tokio::test]
async fn stale_enrichment_is_discarded_after_clear() {
    let enricher = GatedEnricher::gated();
    let h = harness(ScriptedSource::new(vec![]), enricher.clone());
    let mut events = h.events.subscribe();

    let stale = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();
    h.engine.clear_queue().await.unwrap();
    let fresh = h.engine.append_entry("https://audio/a2", track("a"), None).await.unwrap();

    // Releases the stale fetch; the fresh one waits for a second permit.
    enricher.release("a");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(stale.extended_metadata().is_none());

    // Whichever fetch took the permit, only the queued entry can be enriched.
    enricher.release("a");
    let expected = fresh.id().to_string();
    wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Queue(QueueEvent::EntryEnriched { entry_id }) if *entry_id == expected)
    })
    .await;
    assert!(stale.extended_metadata().is_none());
    assert!(fresh.extended_metadata().is_some());
}

#[tokio::test]
async fn provided_metadata_skips_enrichment() {
    let enricher = GatedEnricher::gated();
    let h = harness(ScriptedSource::new(vec![]), enricher);
    let metadata = ExtendedMetadata {
        album_id: "given".into(),
        ..Default::default()
    };

    let entry = h
        .engine
        .append_entry("https://audio/a", track("a"), Some(metadata))
        .await
        .unwrap();
    assert_eq!(entry.extended_metadata().map(|m| m.album_id.as_str()), Some("given"));
}

// ============================================================================
// Context changes
// ============================================================================

#[tokio::test]
async fn changing_mode_clears_queue_before_refill() {
    let (source, gate) = ScriptedSource::gated(vec![
        vec![track("1"), track("2"), track("3")],
        vec![track("p1"), track("p2"), track("p3")],
    ]);
    let h = harness(source.clone(), GatedEnricher::open());

    h.engine.initialize().await.unwrap();
    gate.add_permits(1);
    wait_for_count(&h.engine, 3).await;

    h.engine
        .set_recommendation_mode(RecommendationMode::Public)
        .await
        .unwrap();

    assert_eq!(h.engine.entries().await.unwrap().len(), 0);
    assert_eq!(h.engine.queue_count(), 0);
    assert!(h.player.items().is_empty());
    assert_eq!(h.settings.value(MODE_KEY).as_deref(), Some("publicMode"));

    gate.add_permits(1);
    wait_for_count(&h.engine, 3).await;
    let contexts = source.contexts();
    assert_eq!(contexts.last().map(|c| c.mode), Some(RecommendationMode::Public));
    assert_in_step(&h).await;
}

#[tokio::test]
async fn changing_destination_persists_and_clears() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    h.engine.initialize().await.unwrap();
    h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();

    h.engine
        .set_destination(Destination::playlist("p.9", "Keepers"))
        .await
        .unwrap();

    assert_eq!(h.engine.queue_count(), 0);
    assert!(h.player.items().is_empty());
    assert_eq!(h.settings.value(DESTINATION_KEY).as_deref(), Some("playlistMode"));
    assert_eq!(h.settings.value(PLAYLIST_ID_KEY).as_deref(), Some("p.9"));
    assert_eq!(
        h.engine.context().await.unwrap().map(|c| c.destination),
        Some(Destination::playlist("p.9", "Keepers"))
    );
}

#[tokio::test]
async fn appends_from_superseded_refill_are_dropped() {
    let (source, gate) = ScriptedSource::gated(vec![
        vec![track("old1"), track("old2")],
        vec![track("new1")],
    ]);
    let h = harness(source.clone(), GatedEnricher::open());
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.engine.clear_queue().await.unwrap();

    // Both fetches are now waiting. The superseded one is released first.
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.engine.queue_count(), 0);
    gate.add_permits(1);
    wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Queue(QueueEvent::ReplenishCompleted { appended: 1 }))
    })
    .await;

    let ids: Vec<String> = h
        .engine
        .entries()
        .await
        .unwrap()
        .iter()
        .map(|e| e.track().id.clone())
        .collect();
    assert_eq!(ids, vec!["new1"]);
    assert_in_step(&h).await;
}

// ============================================================================
// Transport, telemetry & lifecycle
// ============================================================================

#[tokio::test]
async fn active_entry_publishes_telemetry() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let first = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();
    let second = h.engine.append_entry("https://audio/b", track("b"), None).await.unwrap();

    h.player.set_position(Duration::from_secs(7), Some(Duration::from_secs(30)));
    h.engine.play().await.unwrap();

    let mut telemetry = first.telemetry();
    tokio::time::timeout(
        WAIT,
        telemetry.wait_for(|t| {
            t.is_active && t.is_playing == Some(true) && t.progress == Duration::from_secs(7)
        }),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(first.snapshot().duration_seconds(), Some(30.0));
    assert!(!second.snapshot().is_active);

    h.engine.pause().await.unwrap();
    tokio::time::timeout(WAIT, telemetry.wait_for(|t| t.is_playing == Some(false)))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn removed_entry_releases_observers() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let first = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();
    let second = h.engine.append_entry("https://audio/b", track("b"), None).await.unwrap();

    h.engine.skip().await.unwrap();
    assert!(!first.is_queued());
    assert!(second.is_queued());

    h.player.set_position(Duration::from_secs(3), None);
    let mut telemetry = second.telemetry();
    tokio::time::timeout(WAIT, telemetry.wait_for(|t| t.is_active && t.progress == Duration::from_secs(3)))
        .await
        .unwrap()
        .unwrap();

    let frozen = first.snapshot();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!first.snapshot().is_active);
    assert_eq!(first.snapshot().progress, frozen.progress);
}

#[tokio::test]
async fn seek_only_applies_to_active_entry() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let mut events = h.events.subscribe();
    let first = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();
    let second = h.engine.append_entry("https://audio/b", track("b"), None).await.unwrap();

    first.seek(12.5).await.unwrap();
    assert_eq!(h.player.seeks(), vec![Duration::from_millis(12_500)]);
    wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Playback(PlaybackEvent::Seeked { position_ms: 12_500, .. }))
    })
    .await;

    let err = second.seek(1.0).await.unwrap_err();
    assert!(matches!(err, PlaybackError::EntryNotActive(_)));

    let err = h.engine.seek(first.id(), -4.0).await.unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidSeek(_)));
    assert_eq!(h.player.seeks().len(), 1);
}

#[tokio::test]
async fn session_failure_degrades_instead_of_failing() {
    let h = harness_with_session(
        ScriptedSource::new(vec![]),
        GatedEnricher::open(),
        std::sync::Arc::new(FailingSession),
    );
    let mut events = h.events.subscribe();

    h.engine.initialize().await.unwrap();

    wait_for_event(&mut events, |e| {
        matches!(e, CoreEvent::Playback(PlaybackEvent::SessionDegraded { .. }))
    })
    .await;
    assert_eq!(h.engine.context().await.unwrap(), Some(SelectionContext::default()));
}

#[tokio::test]
async fn shutdown_releases_entries_and_player() {
    let h = harness(ScriptedSource::new(vec![]), GatedEnricher::open());
    let entry = h.engine.append_entry("https://audio/a", track("a"), None).await.unwrap();

    h.engine.shutdown().await.unwrap();

    assert!(!entry.is_queued());
    assert!(h.player.items().is_empty());
    assert!(matches!(h.engine.skip().await, Err(PlaybackError::EngineStopped)));
    assert!(matches!(entry.seek(1.0).await, Err(PlaybackError::EngineStopped)));
    h.engine.shutdown().await.unwrap();
}
