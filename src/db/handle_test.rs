use std::sync::Arc;

use crate::db::DbError;
use crate::db::handle::HandleSlot;

#[test]
fn get_before_install_is_connection_error() {
    let slot: HandleSlot<u32> = HandleSlot::new("PostgreSQL");
    assert!(!slot.is_set());
    match slot.get() {
        Err(DbError::Connection { message }) => {
            assert_eq!(message, "PostgreSQL adapter is not connected")
        }
        other => panic!("Expected connection error, got {other:?}"),
    }
}

#[test]
fn second_install_is_rejected_and_handed_back() {
    let slot = HandleSlot::new("MySQL");
    assert_eq!(slot.install(1u32).unwrap(), None);
    assert_eq!(slot.install(2u32).unwrap(), Some(2));
    assert_eq!(slot.get().unwrap(), 1);
}

#[test]
fn take_empties_the_slot() {
    let slot = HandleSlot::new("MongoDB");
    slot.install(7u32).unwrap();
    assert_eq!(slot.take().unwrap(), Some(7));
    assert_eq!(slot.take().unwrap(), None);
    assert!(slot.get().is_err());

    // A fresh install works after a take.
    assert_eq!(slot.install(8u32).unwrap(), None);
    assert_eq!(slot.get().unwrap(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_installs_keep_exactly_one_handle() {
    let slot = Arc::new(HandleSlot::new("PostgreSQL"));

    let tasks: Vec<_> = (0..16u32)
        .map(|i| {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move { slot.install(i).unwrap() })
        })
        .collect();

    let mut rejected = Vec::new();
    for task in tasks {
        if let Some(handle) = task.await.unwrap() {
            rejected.push(handle);
        }
    }

    assert_eq!(rejected.len(), 15);
    let winner = slot.get().unwrap();
    assert!(!rejected.contains(&winner));
}
