use super::storage::{Storage, StorageError};
use crate::interest::{Interest, InterestSet};
use log::error;

pub const INTERESTS_KEY: &str = "userInterests";

/// The interest set, persisted through `S` after every change.
pub struct InterestStore<S> {
    storage: S,
    interests: InterestSet,
}

impl<S: Storage> InterestStore<S> {
    /// Missing or unreadable stored interests load as an empty set.
    pub fn load(storage: S) -> Self {
        let interests = match storage.get(INTERESTS_KEY) {
            Ok(Some(json)) => InterestSet::from_json(&json).unwrap_or_else(|err| {
                error!("Failed to parse stored interests: {}", err);
                InterestSet::new()
            }),
            Ok(None) => InterestSet::new(),
            Err(err) => {
                error!("Failed to load user interests: {}", err);
                InterestSet::new()
            }
        };
        InterestStore { storage, interests }
    }

    pub fn interests(&self) -> &InterestSet {
        &self.interests
    }

    /// Toggles and persists. On a storage failure the in-memory set is left
    /// unchanged.
    pub fn toggle(&mut self, interest: &Interest) -> Result<bool, StorageError> {
        let mut next = self.interests.clone();
        let selected = next.toggle(interest);
        self.storage.set(INTERESTS_KEY, &next.to_json())?;
        self.interests = next;
        Ok(selected)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
