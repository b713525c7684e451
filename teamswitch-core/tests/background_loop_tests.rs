use std::sync::Arc;
use std::time::Duration;

use teamswitch_core::testing::{FakeRcon, player};
use teamswitch_core::{
    BackendRegistry, CoreError, FactionFilter, Settings, SwitchCoordinator, SwitchOutcome,
    SwitchRequest,
};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

const TICK: Duration = Duration::from_millis(20);

/// Helper to build a shared coordinator with a fast queue interval
fn setup(registry: BackendRegistry) -> Arc<SwitchCoordinator> {
    Arc::new(SwitchCoordinator::new(
        registry,
        Settings {
            queue_interval: TICK,
            ..Settings::default()
        },
    ))
}

/// Helper to wait for the next notice without hanging the test
async fn next_notice(notices: &mut UnboundedReceiver<SwitchOutcome>) -> SwitchOutcome {
    tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("no notice within 5s")
        .expect("notice channel closed")
}

// =============================================================================
// RUNNING LOOP
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_loop_drains_concurrent_requests_in_fifo_order_past_hung_backend() {
    // GIVEN: A hung backend registered first, and ten Allies players on a
    // second backend whose Axis side is full
    let hung = FakeRcon::new();
    hung.hang(true);
    let mut live = FakeRcon::new().with_counts(0, 50);
    for n in 0..10 {
        live = live.with_player(player(&format!("p{n}"), &format!("P{n}"), "allies"));
    }
    let registry = BackendRegistry::builder()
        .register(hung.backend("HUNG").with_timeout(Duration::from_millis(30)))
        .register(live.backend("LIVE"))
        .build()
        .unwrap();
    let coordinator = setup(registry);
    let (tx, mut notices) = unbounded_channel();
    let handle = coordinator.start_processor(tx).unwrap();

    // WHEN: Ten requests arrive at once while the loop is ticking
    let tasks: Vec<_> = (0..10)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .request_switch(SwitchRequest {
                        player_id: format!("p{n}"),
                        player_name: None,
                        requester: format!("user{n}"),
                    })
                    .await
            })
        })
        .collect();
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, SwitchOutcome::Queued { .. }), "{outcome:?}");
    }

    // THEN: All ten are queued and the loop holds them while Axis is full
    tokio::time::sleep(TICK * 3).await;
    let queued: Vec<String> = coordinator
        .queue_snapshot()
        .into_iter()
        .map(|q| q.player_name)
        .collect();
    assert_eq!(queued.len(), 10);
    assert!(live.switched().is_empty());

    // WHEN: Axis frees up
    live.set_counts(0, 0);

    // THEN: Every request is announced in the order it was queued
    let mut announced = Vec::new();
    for _ in 0..10 {
        match next_notice(&mut notices).await {
            SwitchOutcome::Switched { player } => announced.push(player),
            other => panic!("unexpected notice {other:?}"),
        }
    }
    assert_eq!(announced, queued);
    assert!(coordinator.queue_snapshot().is_empty());
    assert!(hung.roster_calls() >= 10);
    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_cycle_drops_only_its_head_and_loop_survives() {
    // GIVEN: Two queued requests and a backend whose next switch panics
    let fake = FakeRcon::new()
        .with_player(player("1", "One", "axis"))
        .with_player(player("2", "Two", "axis"))
        .with_counts(50, 0);
    let registry = BackendRegistry::builder()
        .register(fake.backend("A"))
        .build()
        .unwrap();
    let coordinator = setup(registry);
    for id in ["1", "2"] {
        coordinator
            .request_switch(SwitchRequest {
                player_id: id.to_string(),
                player_name: None,
                requester: "200".to_string(),
            })
            .await
            .unwrap();
    }
    fake.panic_next_switch();
    fake.set_counts(0, 0);

    // WHEN: The loop runs
    let (tx, mut notices) = unbounded_channel();
    let handle = coordinator.start_processor(tx).unwrap();

    // THEN: The first request is dropped silently, the second still goes through
    assert_eq!(
        next_notice(&mut notices).await,
        SwitchOutcome::Switched { player: "Two".into() }
    );
    assert_eq!(fake.switched(), vec!["2"]);
    assert!(coordinator.queue_snapshot().is_empty());
    assert!(!handle.is_finished());
    handle.abort();
}

// =============================================================================
// LISTING UNDER CONCURRENT REBUILDS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_switch_by_number_never_hits_another_player_during_rebuilds() {
    // GIVEN: Five players and someone else relisting while the roster shifts
    let mut fake = FakeRcon::new().with_counts(0, 0);
    for n in 1..=5 {
        fake = fake.with_player(player(&n.to_string(), &format!("P{n}"), "axis"));
    }
    let registry = BackendRegistry::builder()
        .register(fake.backend("A"))
        .build()
        .unwrap();
    let coordinator = setup(registry);

    let relister = {
        let coordinator = Arc::clone(&coordinator);
        let fake = fake.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                // Moving P1 to the end renumbers everyone.
                fake.remove_player("1");
                fake.add_player(player("1", "P1", "axis"));
                coordinator.list_players(FactionFilter::All, "other").await;
                tokio::task::yield_now().await;
            }
        })
    };

    // WHEN: A requester repeatedly lists and switches number 1
    for _ in 0..50 {
        let listing = coordinator.list_players(FactionFilter::All, "me").await;
        let seen = listing.sections[0].players.as_ref().unwrap()[0].1.clone();
        match coordinator.switch_by_number(1, None, "me".into()).await {
            // THEN: Either the player they saw at 1, or a refusal
            Ok(outcome) => assert_eq!(outcome.player(), seen),
            Err(CoreError::UnknownNumber(1)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    relister.await.unwrap();
}
