use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use ulid::Ulid;

use covers::clock::ManualClock;
use covers::engine::{Engine, EngineError, FileStore, StoreError};
use covers::model::*;
use covers::notify::NotifyHub;
use covers::request::{OrderForm, ReservationForm};

// ── Test infrastructure ──────────────────────────────────────

fn snapshot_path() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("covers_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("floor.snapshot")
}

async fn open(path: &PathBuf, clock: Arc<ManualClock>) -> Arc<Engine> {
    let engine = Engine::open(
        Arc::new(FileStore::new(path)),
        Arc::new(NotifyHub::new()),
        clock,
        120,
    )
    .await
    .unwrap();
    Arc::new(engine)
}

fn form(name: &str, party: &str, time: &str) -> ReservationForm {
    ReservationForm {
        name: Some(name.into()),
        phone: Some("555-0199".into()),
        party_size: Some(party.into()),
        time: Some(time.into()),
        ..Default::default()
    }
}

async fn next_event(rx: &mut broadcast::Receiver<FloorEvent>) -> FloorEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn evening_service_survives_restart() {
    let path = snapshot_path();
    let clock = Arc::new(ManualClock::new(parse_time("2024-08-08 17:00").unwrap()));

    let engine = open(&path, clock.clone()).await;
    assert!(engine.seed_if_empty(FloorState::sample()).await.unwrap());

    let booked = engine
        .create_reservation(form("Chen Li", "4", "2024-08-08 19:00").into_booking(false).unwrap())
        .await
        .unwrap();
    assert_eq!(booked.table_id, Some(3));

    let walk_in = engine
        .create_reservation(
            ReservationForm { time: None, ..form("Sam", "2", "") }
                .into_booking(true)
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(walk_in.status, ReservationStatus::Seated);

    let order = engine
        .record_order(
            OrderForm {
                reservation_id: Some(walk_in.id.to_string()),
                items: vec!["Garden Salad|2".into(), "Ribeye Steak|1".into()],
            }
            .into_order()
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(order.total, 850 * 2 + 3600);
    drop(engine);

    // Reopen from disk later in the evening.
    clock.set(parse_time("2024-08-08 19:30").unwrap());
    let engine = open(&path, clock.clone()).await;
    let reservations = engine.reservations().await;
    assert_eq!(reservations.len(), 2);
    assert_eq!(engine.orders().await, vec![order]);

    let tables = engine.tables().await;
    let status = |id| tables.iter().find(|t| t.id == id).unwrap().status;
    assert_eq!(status(3), TableStatus::Occupied);
    assert_eq!(status(walk_in.table_id.unwrap()), TableStatus::Occupied);
    assert_eq!(status(5), TableStatus::Free);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn subscribers_follow_a_reservation() {
    let path = snapshot_path();
    let clock = Arc::new(ManualClock::new(parse_time("2024-08-08 18:00").unwrap()));
    let engine = open(&path, clock.clone()).await;
    engine.seed_if_empty(FloorState::sample()).await.unwrap();

    let mut rx = engine.notify.subscribe(5);
    let other = engine.notify.subscribe(1);

    let r = engine
        .create_reservation(form("Patio party", "6", "2024-08-08 19:00").into_booking(false).unwrap())
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        FloorEvent::ReservationAssigned {
            reservation_id: r.id,
            table_id: 5,
        }
    );
    assert_eq!(
        next_event(&mut rx).await,
        FloorEvent::TableStatusChanged {
            table_id: 5,
            from: TableStatus::Free,
            to: TableStatus::Reserved,
        }
    );

    clock.set(parse_time("2024-08-08 19:05").unwrap());
    engine.update_status(r.id, ReservationStatus::Seated).await.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        FloorEvent::ReservationStatusChanged {
            reservation_id: r.id,
            table_id: 5,
            status: ReservationStatus::Seated,
        }
    );
    assert_eq!(
        next_event(&mut rx).await,
        FloorEvent::TableStatusChanged {
            table_id: 5,
            from: TableStatus::Reserved,
            to: TableStatus::Occupied,
        }
    );

    engine.update_status(r.id, ReservationStatus::Completed).await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        FloorEvent::ReservationStatusChanged {
            status: ReservationStatus::Completed,
            ..
        }
    ));
    assert_eq!(
        next_event(&mut rx).await,
        FloorEvent::TableStatusChanged {
            table_id: 5,
            from: TableStatus::Occupied,
            to: TableStatus::Free,
        }
    );

    assert!(other.is_empty());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn corrupt_snapshot_refuses_to_open() {
    let path = snapshot_path();
    std::fs::write(&path, b"definitely not a floor").unwrap();

    let result = Engine::open(
        Arc::new(FileStore::new(&path)),
        Arc::new(NotifyHub::new()),
        Arc::new(ManualClock::new(parse_time("2024-08-08 18:00").unwrap())),
        120,
    )
    .await;
    assert!(matches!(result, Err(EngineError::Store(StoreError::Corrupt(_)))));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
