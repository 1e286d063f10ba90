//! Concurrent readers against snapshot publication

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use streamrec_engine::{BuildSnapshot, EngineConfig, Event, Item, Snapshot, SnapshotStore};

fn items() -> Vec<Item> {
    (0..6)
        .map(|i| Item::new(format!("i{}", i), format!("Title {}", i), "movie", "drama"))
        .collect()
}

/// Every user watched `items_per_user` items, so each generation has a
/// recognisable shape readers can verify
fn generation(items_per_user: usize) -> Snapshot {
    let mut events = Vec::new();
    for user in 0..10 {
        for item in 0..items_per_user {
            events.push(Event::new(
                format!("u{}", user),
                format!("i{}", item),
                "play",
                100.0 + user as f64,
            ));
        }
    }
    BuildSnapshot::execute(&events, &[], &items(), &EngineConfig::default()).unwrap()
}

#[test]
fn test_readers_always_see_complete_snapshots() {
    let store = Arc::new(SnapshotStore::new(generation(1)));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let snapshot = store.current();
                    let history = snapshot.user_history("u3", usize::MAX).unwrap();
                    // Every user in a generation has the same history length
                    for user in ["u0", "u9"] {
                        assert_eq!(
                            snapshot.user_history(user, usize::MAX).unwrap().len(),
                            history.len()
                        );
                    }
                    let list = snapshot.recommend("u3", 6).unwrap();
                    assert_eq!(list.items.len(), 6 - history.len());
                }
            })
        })
        .collect();

    for items_per_user in 2..=5 {
        store.publish(generation(items_per_user));
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.generation(), 5);
    assert_eq!(
        store.current().user_history("u0", usize::MAX).unwrap().len(),
        5
    );
}

#[tokio::test]
async fn test_refresh_on_blocking_pool() {
    let store = Arc::new(SnapshotStore::new(generation(1)));

    let publication = {
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || store.refresh(|| Ok(generation(3))))
            .await
            .unwrap()
            .unwrap()
    };

    assert_eq!(publication.generation, 2);
    assert_eq!(publication.stats.users, 10);
    assert_eq!(
        store.current().user_history("u5", usize::MAX).unwrap().len(),
        3
    );
}
