use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("stored value for {0} is not valid UTF-8")]
    Encoding(String),
}

/// Key/value persistence for client state, mirroring browser local storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Storage backed by one sled tree, for native clients.
pub struct SledStorage {
    tree: sled::Tree,
}

impl SledStorage {
    pub fn open(db: &sled::Db, name: &str) -> Result<Self, StorageError> {
        Ok(SledStorage {
            tree: db.open_tree(name)?,
        })
    }
}

impl Storage for SledStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.tree.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|_| StorageError::Encoding(key.to_owned())),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }
}
