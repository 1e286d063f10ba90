//! Atomic publication of snapshots
//!
//! Readers clone the active `Arc<Snapshot>` and query it without holding any
//! lock. A refresh builds the replacement off to the side and swaps the
//! pointer in one step, so a query never observes a half-built snapshot.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotStats};

/// Metadata of the currently published snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Publication {
    /// Starts at 1 for the initial snapshot, incremented on every publish
    pub generation: u64,
    pub published_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

struct Active {
    snapshot: Arc<Snapshot>,
    publication: Publication,
}

/// Holder of the active snapshot
pub struct SnapshotStore {
    active: RwLock<Active>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        let publication = Publication {
            generation: 1,
            published_at: Utc::now(),
            stats: initial.stats(),
        };

        Self {
            active: RwLock::new(Active {
                snapshot: Arc::new(initial),
                publication,
            }),
        }
    }

    /// The active snapshot; stays valid for the caller across later publishes
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.active.read().snapshot)
    }

    pub fn publication(&self) -> Publication {
        self.active.read().publication
    }

    pub fn generation(&self) -> u64 {
        self.active.read().publication.generation
    }

    /// Replace the active snapshot
    pub fn publish(&self, snapshot: Snapshot) -> Publication {
        let snapshot = Arc::new(snapshot);
        let mut active = self.active.write();

        let publication = Publication {
            generation: active.publication.generation + 1,
            published_at: Utc::now(),
            stats: snapshot.stats(),
        };
        active.snapshot = snapshot;
        active.publication = publication;
        drop(active);

        info!(
            generation = publication.generation,
            users = publication.stats.users,
            items = publication.stats.items,
            "Snapshot published"
        );
        publication
    }

    /// Build a replacement with `build` and publish it only if the build succeeds
    ///
    /// A failed build leaves the active snapshot untouched.
    pub fn refresh<F>(&self, build: F) -> Result<Publication>
    where
        F: FnOnce() -> Result<Snapshot>,
    {
        match build() {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(err) => {
                warn!(
                    error = %err,
                    generation = self.generation(),
                    "Snapshot rebuild failed, keeping active snapshot"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::snapshot::BuildSnapshot;
    use crate::types::{Event, Item};

    fn build(events: &[Event]) -> Result<Snapshot> {
        let items = vec![
            Item::new("i1", "A", "movie", "drama"),
            Item::new("i2", "B", "movie", "drama"),
        ];
        BuildSnapshot::execute(events, &[], &items, &EngineConfig::default())
    }

    #[test]
    fn test_publish_swaps_and_bumps_generation() {
        let store = SnapshotStore::new(build(&[]).unwrap());
        assert_eq!(store.generation(), 1);
        assert_eq!(store.current().stats().users, 0);

        let publication = store
            .publish(build(&[Event::new("u1", "i1", "play", 10.0)]).unwrap());
        assert_eq!(publication.generation, 2);
        assert_eq!(store.current().stats().users, 1);
    }

    #[test]
    fn test_reader_keeps_its_snapshot_across_publish() {
        let store = SnapshotStore::new(build(&[]).unwrap());
        let held = store.current();

        store.publish(build(&[Event::new("u1", "i1", "play", 10.0)]).unwrap());

        assert_eq!(held.stats().users, 0);
        assert_eq!(store.current().stats().users, 1);
    }

    #[test]
    fn test_failed_refresh_keeps_active_snapshot() {
        let store = SnapshotStore::new(build(&[Event::new("u1", "i1", "play", 10.0)]).unwrap());

        let result = store.refresh(|| Err(EngineError::Dataset("events.csv missing".into())));

        assert!(result.is_err());
        assert_eq!(store.generation(), 1);
        assert!(store.current().contains_user("u1"));
    }

    #[test]
    fn test_successful_refresh_publishes() {
        let store = SnapshotStore::new(build(&[]).unwrap());
        let publication = store
            .refresh(|| build(&[Event::new("u2", "i2", "like", 4.0)]))
            .unwrap();

        assert_eq!(publication.generation, 2);
        assert!(store.current().contains_user("u2"));
        assert!(store.publication().published_at >= publication.published_at);
    }
}
