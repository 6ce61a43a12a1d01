//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple threads
//! - Walks through the build lifecycle the way the GUI drives it

use build_aosp_image::{StateChange, StateManager};
use camino::Utf8Path;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

#[tokio::test]
async fn test_build_lifecycle_events() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.set_factory_image_path(Some("/dl/factory.zip".into()));
    state.set_payload_paths(vec!["/img/boot.img".into(), "/img/vendor_boot.img".into()]);
    state.start_build();
    state.finish_build(Some(Utf8Path::new("/out/factory_20240309070501.zip")));

    assert_eq!(
        next_event(&mut rx).await,
        StateChange::InputsChanged { can_build: true }
    );
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::InputsChanged { can_build: true }
    );
    assert_eq!(next_event(&mut rx).await, StateChange::BuildStarted);
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::BuildFinished {
            artifact: Some("/out/factory_20240309070501.zip".into())
        }
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();

    state.start_build();

    assert_eq!(next_event(&mut rx1).await, StateChange::BuildStarted);
    assert_eq!(next_event(&mut rx2).await, StateChange::BuildStarted);
}

#[tokio::test]
async fn test_failed_build_reports_no_artifact() {
    let state = Arc::new(StateManager::new());
    state.set_factory_image_path(Some("/dl/factory.zip".into()));
    state.start_build();
    let mut rx = state.subscribe();

    state.finish_build(None);

    assert_eq!(
        next_event(&mut rx).await,
        StateChange::BuildFinished { artifact: None }
    );
    let snapshot = state.snapshot();
    assert!(!snapshot.is_building);
    assert!(snapshot.can_build());
}

#[test]
fn test_payload_field_round_trip() {
    let state = StateManager::new();
    state.set_payload_paths(vec!["/img/boot.img".into(), "/img/dtbo.img".into()]);

    assert_eq!(
        state.read(|s| s.joined_payload_paths()),
        "/img/boot.img;/img/dtbo.img"
    );
}

#[test]
fn test_concurrent_updates() {
    let state = Arc::new(StateManager::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for j in 0..50 {
                    state.update(|s| {
                        s.payload_paths.push(format!("/img/{i}-{j}.img").into());
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(state.read(|s| s.payload_paths.len()), 400);
}
