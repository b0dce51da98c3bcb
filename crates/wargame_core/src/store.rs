//! Transactional access to the world.
//!
//! Every logical operation runs inside one [`WorldStore::transaction`]: it
//! sees a consistent world and either commits all of its changes or none.
//! Transactions on one store are serialized, so two attempts to resolve the
//! same turn cannot both succeed.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{GameError, Result};
use crate::world::World;

/// Storage backend for a [`World`].
pub trait WorldStore {
    /// Run `f` against a read-only view.
    fn read<R>(&self, f: impl FnOnce(&World) -> Result<R>) -> Result<R>;

    /// Run `f` atomically. Changes are kept only if `f` returns `Ok`.
    fn transaction<R>(&self, f: impl FnOnce(&mut World) -> Result<R>) -> Result<R>;
}

/// In-memory store guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    world: Mutex<World>,
}

impl MemoryStore {
    /// Create a store holding `world`.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            world: Mutex::new(world),
        }
    }

    /// Lock the world. A panic inside a transaction only ever touched the
    /// working copy, so a poisoned lock still guards the last committed world.
    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current world.
    pub fn snapshot(&self) -> Result<World> {
        Ok(self.lock().clone())
    }

    /// Consume the store and return its world.
    pub fn into_world(self) -> Result<World> {
        Ok(self.world.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    /// Write the world to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.lock().to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Storage(format!("Failed to write world file: {e}")))?;
        tracing::info!(path = %path.as_ref().display(), "Saved world");
        Ok(())
    }

    /// Read a world written by [`MemoryStore::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the read, deserialization or version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Storage(format!("Failed to read world file: {e}")))?;
        let world = World::from_bytes(&bytes)?;
        tracing::info!(path = %path.as_ref().display(), "Loaded world");
        Ok(Self::new(world))
    }
}

impl WorldStore for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&World) -> Result<R>) -> Result<R> {
        let guard = self.lock();
        f(&guard)
    }

    fn transaction<R>(&self, f: impl FnOnce(&mut World) -> Result<R>) -> Result<R> {
        let mut guard = self.lock();
        let mut working = guard.clone();
        let value = f(&mut working)?;

        #[cfg(feature = "debug-validation")]
        working.check_invariants()?;

        *guard = working;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::ids::MatchId;
    use crate::model::Match;

    fn sample_match() -> Match {
        Match {
            id: MatchId(0),
            name: "store".to_string(),
            max_players: 2,
            turn_length_seconds: 60,
            start_time: None,
            max_turn_override: None,
            world_seed: 7,
            chunk_size: 8,
            last_history_index: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = MemoryStore::default();
        let result: Result<()> = store.transaction(|world| {
            world.insert_match(sample_match());
            Err(GameError::validation("abort"))
        });

        assert!(result.is_err());
        let count = store.read(|world| Ok(world.matches().count())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_committed_transaction_persists() {
        let store = MemoryStore::default();
        let id = store
            .transaction(|world| Ok(world.insert_match(sample_match())))
            .unwrap();
        let seed = store
            .read(|world| Ok(world.match_record(id)?.world_seed))
            .unwrap();
        assert_eq!(seed, 7);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.bin");
        let store = MemoryStore::default();
        store
            .transaction(|world| Ok(world.insert_match(sample_match())))
            .unwrap();

        store.save(&path).unwrap();
        let loaded = MemoryStore::load(&path).unwrap();

        assert_eq!(
            loaded.snapshot().unwrap().state_hash(),
            store.snapshot().unwrap().state_hash()
        );
    }

    #[test]
    fn test_load_missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MemoryStore::load(dir.path().join("absent.bin"));
        assert!(matches!(result, Err(GameError::Storage(_))));
    }

    #[test]
    fn test_panicking_transaction_leaves_store_usable() {
        let store = MemoryStore::default();
        let id = store
            .transaction(|world| Ok(world.insert_match(sample_match())))
            .unwrap();

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = store.transaction(|world| {
                world.insert_match(sample_match());
                panic!("operation failed midway");
            });
        }));
        assert!(panicked.is_err());

        let count = store.read(|world| Ok(world.matches().count())).unwrap();
        assert_eq!(count, 1);
        store
            .transaction(|world| {
                world.match_mut(id)?.name = "renamed".to_string();
                Ok(())
            })
            .unwrap();
        let name = store
            .read(|world| Ok(world.match_record(id)?.name.clone()))
            .unwrap();
        assert_eq!(name, "renamed");
        assert_eq!(store.into_world().unwrap().matches().count(), 1);
    }
}
