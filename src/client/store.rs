use super::api::{ApiClientError, EventsApi};
use super::interests::InterestStore;
use super::storage::{Storage, StorageError};
use crate::calendar::{self, CalendarError, MonthGrid};
use crate::filter;
use crate::interest::{Interest, InterestSet};
use crate::model::Event;
use chrono::NaiveDate;
use log::{debug, error, info};

pub const LOAD_ERROR: &str = "Failed to load events. Please try again later.";
pub const SAVE_INTERESTS_ERROR: &str = "Failed to save your interests. Please try again later.";

/// Fetched events plus the user's interests and search query.
///
/// Fetches are numbered. A result is applied only if no later fetch has been
/// applied already, so a slow response cannot overwrite a newer one.
pub struct EventStore<S> {
    events: Vec<Event>,
    interests: InterestStore<S>,
    search_query: String,
    is_loading: bool,
    error: Option<String>,
    latest_fetch: u64,
    applied_fetch: u64,
}

impl<S: Storage> EventStore<S> {
    pub fn new(storage: S) -> Self {
        EventStore {
            events: Vec::new(),
            interests: InterestStore::load(storage),
            search_query: String::new(),
            is_loading: false,
            error: None,
            latest_fetch: 0,
            applied_fetch: 0,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn interests(&self) -> &InterestSet {
        self.interests.interests()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_owned();
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn storage(&self) -> &S {
        self.interests.storage()
    }

    pub fn toggle_interest(&mut self, interest: &Interest) -> Result<bool, StorageError> {
        self.interests.toggle(interest).map_err(|err| {
            error!("Failed to update interests: {}", err);
            self.error = Some(SAVE_INTERESTS_ERROR.to_owned());
            err
        })
    }

    /// Starts a fetch and returns its sequence number.
    pub fn begin_fetch(&mut self) -> u64 {
        self.latest_fetch += 1;
        self.is_loading = true;
        self.error = None;
        self.latest_fetch
    }

    /// Applies the result of fetch `seq`. Returns false if it was stale.
    pub fn finish_fetch(&mut self, seq: u64, result: Result<Vec<Event>, ApiClientError>) -> bool {
        if seq <= self.applied_fetch {
            debug!("dropping stale fetch {} (applied {})", seq, self.applied_fetch);
            return false;
        }
        self.applied_fetch = seq;
        match result {
            Ok(events) => {
                info!("loaded {} events", events.len());
                self.events = events;
                self.error = None;
            }
            Err(err) => {
                error!("Failed to load events: {}", err);
                self.error = Some(LOAD_ERROR.to_owned());
            }
        }
        self.is_loading = seq < self.latest_fetch;
        true
    }

    pub async fn refresh<A: EventsApi>(&mut self, api: &A) {
        let seq = self.begin_fetch();
        let result = api.fetch_events().await;
        self.finish_fetch(seq, result);
    }

    /// Events matching the interests and the search query, by release date.
    pub fn visible_events(&self) -> Vec<&Event> {
        filter::filter_events(&self.events, self.interests(), &self.search_query)
    }

    pub fn month(&self, year: i32, month: u32) -> Result<MonthGrid<'_>, CalendarError> {
        calendar::month_grid(year, month, self.visible_events())
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.visible_events()
            .into_iter()
            .filter(|event| event.release_date.naive_utc().date() == date)
            .collect()
    }

    pub fn find(&self, id: u64) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }
}
