use super::storage::{Storage, StorageError};
use log::error;

pub const FAVORITES_KEY: &str = "favoriteEvents";

/// Favorite event ids in the order they were marked.
pub struct FavoriteStore<S> {
    storage: S,
    ids: Vec<u64>,
}

impl<S: Storage> FavoriteStore<S> {
    pub fn load(storage: S) -> Self {
        let ids = match storage.get(FAVORITES_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
                error!("Failed to parse stored favorites: {}", err);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                error!("Failed to load favorites: {}", err);
                Vec::new()
            }
        };
        FavoriteStore { storage, ids }
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn is_favorite(&self, event_id: u64) -> bool {
        self.ids.contains(&event_id)
    }

    /// Returns whether the event is a favorite afterwards.
    pub fn toggle(&mut self, event_id: u64) -> Result<bool, StorageError> {
        let mut next = self.ids.clone();
        let favorite = match next.iter().position(|&id| id == event_id) {
            Some(index) => {
                next.remove(index);
                false
            }
            None => {
                next.push(event_id);
                true
            }
        };
        let json = serde_json::to_string(&next).unwrap_or_else(|_| "[]".to_owned());
        self.storage.set(FAVORITES_KEY, &json)?;
        self.ids = next;
        Ok(favorite)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
