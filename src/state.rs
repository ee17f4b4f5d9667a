use crate::config::Config;
use crate::model::Event;
use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shared by every worker; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub db: sled::Db,
    pub config: Arc<Config>,
    pub events_cache: Arc<EventsCache>,
}

impl AppState {
    pub fn new(db: sled::Db, config: Config) -> Self {
        let events_cache = Arc::new(EventsCache::new(Duration::from_secs(config.events_cache_ttl)));
        AppState {
            db,
            config: Arc::new(config),
            events_cache,
        }
    }
}

/// Most distinct queries kept at once. Inserting past it evicts the oldest.
const MAX_CACHED_QUERIES: usize = 256;

/// Query results of `GET /api/events`, keyed by the normalized query.
pub struct EventsCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<Event>)>>,
}

impl EventsCache {
    pub fn new(ttl: Duration) -> Self {
        EventsCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<Event>> {
        if self.ttl == Duration::from_secs(0) {
            return None;
        }
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("events cache lock poisoned, bypassing cache");
                return None;
            }
        };
        match entries.get(key) {
            Some((stored, events)) if stored.elapsed() < self.ttl => Some(events.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, events: Vec<Event>) {
        if self.ttl == Duration::from_secs(0) {
            return;
        }
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return,
        };
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        if entries.len() >= MAX_CACHED_QUERIES && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (stored, _))| *stored)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (Instant::now(), events));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
