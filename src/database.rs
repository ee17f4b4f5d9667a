use crate::model::*;
use chrono::{DateTime, Duration, Utc};
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::convert::TryInto;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("corrupt index entry")]
    CorruptIndex,
}

pub type DbResult<T> = Result<T, DbError>;

// Big endian so that tree iteration follows id generation order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> DbResult<u64> {
    let bytes: [u8; 8] = id.as_ref().try_into().map_err(|_| DbError::CorruptIndex)?;
    Ok(u64::from_be_bytes(bytes))
}

fn pair_key(first: u64, second: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&serialize_id(first));
    key[8..].copy_from_slice(&serialize_id(second));
    key
}

fn storage_error(err: TransactionError<()>) -> DbError {
    match err {
        TransactionError::Storage(e) => DbError::Storage(e),
        TransactionError::Abort(()) => DbError::CorruptIndex,
    }
}

const USERS: &[u8] = b"users";
const USERS_EMAIL: &[u8] = b"users_email";
const SESSIONS: &[u8] = b"sessions";
const EVENTS: &[u8] = b"events";
const USER_EVENTS: &[u8] = b"user_events";
const USER_EVENTS_PAIR: &[u8] = b"user_events_pair";

pub trait UserDb {
    type Error;
    /// Returns `None` when the email is already registered.
    fn add_user(&self, email: &str, password_hash: &str) -> Result<Option<User>, Self::Error>;
    fn get_user(&self, id: u64) -> Result<Option<User>, Self::Error>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<(User, UserRecord)>, Self::Error>;
}

pub trait SessionDb {
    type Error;
    fn create_session(&self, user_id: u64, ttl: Duration) -> Result<Session, Self::Error>;
    /// Expired sessions are removed and reported as absent.
    fn get_session(&self, token: &str) -> Result<Option<Session>, Self::Error>;
    fn delete_session(&self, token: &str) -> Result<bool, Self::Error>;
    /// Removes every expired session. Returns how many were removed.
    fn purge_expired_sessions(&self) -> Result<usize, Self::Error>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventQuery {
    pub category: Option<Category>,
    pub subcategories: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if !self.subcategories.is_empty() {
            let selected: Vec<&str> = self.subcategories.iter().map(String::as_str).collect();
            if !event.has_subcategory_in(&selected) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if event.release_date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if event.release_date > end {
                return false;
            }
        }
        true
    }

    pub fn cache_key(&self) -> String {
        let fmt = |dt: Option<DateTime<Utc>>| dt.map_or_else(|| "all".to_owned(), |dt| dt.to_rfc3339());
        format!(
            "events-{}-{}-{}-{}",
            self.category.map_or("all", Category::as_str),
            if self.subcategories.is_empty() {
                "all".to_owned()
            } else {
                self.subcategories.join(",")
            },
            fmt(self.start),
            fmt(self.end),
        )
    }
}

pub trait EventDb {
    type Error;
    fn add_event(&self, event: NewEvent) -> Result<Event, Self::Error>;
    fn get_event(&self, id: u64) -> Result<Option<Event>, Self::Error>;
    /// Matching events sorted by release date, ties in insertion order.
    fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, Self::Error>;
    fn count_events(&self) -> Result<usize, Self::Error>;
}

pub trait UserEventDb {
    type Error;
    fn list_user_events(&self, user_id: u64) -> Result<Vec<UserEvent>, Self::Error>;
    /// Creates the record, or updates the flag of the existing one for this pair.
    fn put_user_event(
        &self,
        user_id: u64,
        event_id: u64,
        is_favorite: bool,
    ) -> Result<UserEvent, Self::Error>;
    /// Only removes records owned by `user_id`.
    fn delete_user_event(&self, user_id: u64, id: u64) -> Result<bool, Self::Error>;
}

impl UserDb for sled::Db {
    type Error = DbError;

    fn add_user(&self, email: &str, password_hash: &str) -> DbResult<Option<User>> {
        let users = self.open_tree(USERS)?;
        let users_email = self.open_tree(USERS_EMAIL)?;
        let id = self.generate_id()?;
        let record = UserRecord {
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        let value = bincode::serialize(&record)?;
        let email_key = email.to_lowercase();
        if let Err(err) = (&users, &users_email).transaction(|(users, users_email)| {
            users.insert(&serialize_id(id)[..], value.as_slice())?;
            if users_email
                .insert(email_key.as_bytes(), &serialize_id(id)[..])?
                .is_some()
            {
                sled::transaction::abort(())?;
            }
            Ok(())
        }) {
            match err {
                TransactionError::Storage(e) => return Err(e.into()),
                TransactionError::Abort(_) => return Ok(None),
            };
        }
        Ok(Some(User::from_record(id, &record)))
    }

    fn get_user(&self, id: u64) -> DbResult<Option<User>> {
        let users = self.open_tree(USERS)?;
        match users.get(serialize_id(id))? {
            Some(data) => {
                let record: UserRecord = bincode::deserialize(&data)?;
                Ok(Some(User::from_record(id, &record)))
            }
            None => Ok(None),
        }
    }

    fn get_user_by_email(&self, email: &str) -> DbResult<Option<(User, UserRecord)>> {
        let users_email = self.open_tree(USERS_EMAIL)?;
        let users = self.open_tree(USERS)?;
        if let Some(id) = users_email.get(email.to_lowercase().as_bytes())? {
            let data = users.get(&id)?.ok_or(DbError::CorruptIndex)?;
            let record: UserRecord = bincode::deserialize(&data)?;
            Ok(Some((User::from_record(deserialize_id(id)?, &record), record)))
        } else {
            Ok(None)
        }
    }
}

impl SessionDb for sled::Db {
    type Error = DbError;

    fn create_session(&self, user_id: u64, ttl: Duration) -> DbResult<Session> {
        self.purge_expired_sessions()?;
        let sessions = self.open_tree(SESSIONS)?;
        let session = Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            token_type: "bearer".to_owned(),
            user_id,
            expires_at: Utc::now() + ttl,
        };
        sessions.insert(session.access_token.as_bytes(), bincode::serialize(&session)?)?;
        Ok(session)
    }

    fn get_session(&self, token: &str) -> DbResult<Option<Session>> {
        let sessions = self.open_tree(SESSIONS)?;
        let session: Session = match sessions.get(token.as_bytes())? {
            Some(data) => bincode::deserialize(&data)?,
            None => return Ok(None),
        };
        if session.expires_at <= Utc::now() {
            sessions.remove(token.as_bytes())?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn delete_session(&self, token: &str) -> DbResult<bool> {
        let sessions = self.open_tree(SESSIONS)?;
        Ok(sessions.remove(token.as_bytes())?.is_some())
    }

    fn purge_expired_sessions(&self) -> DbResult<usize> {
        let sessions = self.open_tree(SESSIONS)?;
        let now = Utc::now();
        let mut purged = 0;
        for entry in sessions.iter() {
            let (token, data) = entry?;
            let session: Session = bincode::deserialize(&data)?;
            if session.expires_at <= now {
                sessions.remove(token)?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

impl EventDb for sled::Db {
    type Error = DbError;

    fn add_event(&self, event: NewEvent) -> DbResult<Event> {
        let events = self.open_tree(EVENTS)?;
        let event = event.with_id(self.generate_id()?);
        events.insert(serialize_id(event.id), bincode::serialize(&event)?)?;
        Ok(event)
    }

    fn get_event(&self, id: u64) -> DbResult<Option<Event>> {
        let events = self.open_tree(EVENTS)?;
        match events.get(serialize_id(id))? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn list_events(&self, query: &EventQuery) -> DbResult<Vec<Event>> {
        let events = self.open_tree(EVENTS)?;
        let mut ret = Vec::new();
        for entry in events.iter() {
            let (_id, data) = entry?;
            let event: Event = bincode::deserialize(&data)?;
            if query.matches(&event) {
                ret.push(event);
            }
        }
        ret.sort_by_key(|event| event.release_date);
        Ok(ret)
    }

    fn count_events(&self) -> DbResult<usize> {
        Ok(self.open_tree(EVENTS)?.len())
    }
}

impl UserEventDb for sled::Db {
    type Error = DbError;

    fn list_user_events(&self, user_id: u64) -> DbResult<Vec<UserEvent>> {
        let user_events = self.open_tree(USER_EVENTS)?;
        let pairs = self.open_tree(USER_EVENTS_PAIR)?;
        let mut ret = Vec::new();
        for entry in pairs.scan_prefix(serialize_id(user_id)) {
            let (_pair, id) = entry?;
            let data = user_events.get(&id)?.ok_or(DbError::CorruptIndex)?;
            ret.push(bincode::deserialize::<UserEvent>(&data)?);
        }
        ret.sort_by_key(|user_event| user_event.id);
        Ok(ret)
    }

    fn put_user_event(&self, user_id: u64, event_id: u64, is_favorite: bool) -> DbResult<UserEvent> {
        let user_events = self.open_tree(USER_EVENTS)?;
        let pairs = self.open_tree(USER_EVENTS_PAIR)?;
        let pair = pair_key(user_id, event_id);
        let created_at = Utc::now();
        (&user_events, &pairs)
            .transaction(|(user_events, pairs)| {
                let user_event = match pairs.get(&pair[..])? {
                    Some(id) => {
                        let data = user_events
                            .get(&id)?
                            .ok_or(ConflictableTransactionError::Abort(()))?;
                        let mut user_event: UserEvent = bincode::deserialize(&data)
                            .map_err(|_| ConflictableTransactionError::Abort(()))?;
                        user_event.is_favorite = is_favorite;
                        user_event
                    }
                    None => UserEvent {
                        id: user_events.generate_id()?,
                        user_id,
                        event_id,
                        is_favorite,
                        created_at,
                    },
                };
                let value = bincode::serialize(&user_event)
                    .map_err(|_| ConflictableTransactionError::Abort(()))?;
                user_events.insert(&serialize_id(user_event.id)[..], value)?;
                pairs.insert(&pair[..], &serialize_id(user_event.id)[..])?;
                Ok(user_event)
            })
            .map_err(storage_error)
    }

    fn delete_user_event(&self, user_id: u64, id: u64) -> DbResult<bool> {
        let user_events = self.open_tree(USER_EVENTS)?;
        let pairs = self.open_tree(USER_EVENTS_PAIR)?;
        let user_event: UserEvent = match user_events.get(serialize_id(id))? {
            Some(data) => bincode::deserialize(&data)?,
            None => return Ok(false),
        };
        if user_event.user_id != user_id {
            return Ok(false);
        }
        let pair = pair_key(user_id, user_event.event_id);
        (&user_events, &pairs)
            .transaction(|(user_events, pairs)| {
                user_events.remove(&serialize_id(id)[..])?;
                pairs.remove(&pair[..])?;
                Ok(())
            })
            .map_err(storage_error)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temporary() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn new_event(title: &str, day: u32, category: Category, sub: Option<&str>) -> NewEvent {
        NewEvent {
            title: title.to_owned(),
            description: String::new(),
            release_date: Utc.ymd(2025, 1, day).and_hms(12, 0, 0),
            category,
            subcategory1: sub.map(str::to_owned),
            subcategory2: None,
            link: None,
            image_url: None,
        }
    }

    #[test]
    fn users_are_unique_by_email() {
        let db = temporary();
        let user = db.add_user("a@example.com", "hash").unwrap().unwrap();
        assert!(db.add_user("A@example.com", "other").unwrap().is_none());
        let (found, record) = db.get_user_by_email("a@EXAMPLE.com").unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(record.password_hash, "hash");
        assert_eq!(db.get_user(user.id).unwrap(), Some(user));
    }

    #[test]
    fn sessions_expire() {
        let db = temporary();
        let live = db.create_session(1, Duration::hours(1)).unwrap();
        let expired = db.create_session(1, Duration::seconds(-1)).unwrap();
        assert_eq!(db.get_session(&live.access_token).unwrap(), Some(live.clone()));
        assert_eq!(db.get_session(&expired.access_token).unwrap(), None);
        assert!(db.delete_session(&live.access_token).unwrap());
        assert!(!db.delete_session(&live.access_token).unwrap());
    }

    #[test]
    fn new_sessions_sweep_expired_ones() {
        let db = temporary();
        let stale = db.create_session(1, Duration::seconds(-1)).unwrap();
        let sessions = db.open_tree(SESSIONS).unwrap();
        assert!(sessions.contains_key(stale.access_token.as_bytes()).unwrap());

        let fresh = db.create_session(2, Duration::hours(1)).unwrap();
        assert!(!sessions.contains_key(stale.access_token.as_bytes()).unwrap());
        assert!(sessions.contains_key(fresh.access_token.as_bytes()).unwrap());
        assert_eq!(db.purge_expired_sessions().unwrap(), 0);
    }

    #[test]
    fn list_events_filters_and_sorts() {
        let db = temporary();
        db.add_event(new_event("late", 20, Category::Movies, Some("Horror")))
            .unwrap();
        let early = db
            .add_event(new_event("early", 2, Category::Movies, Some("Action")))
            .unwrap();
        db.add_event(new_event("game", 10, Category::Games, Some("RPG")))
            .unwrap();

        let all = db.list_events(&EventQuery::default()).unwrap();
        let titles: Vec<_> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "game", "late"]);

        let query = EventQuery {
            category: Some(Category::Movies),
            subcategories: vec!["Action".to_owned(), "RPG".to_owned()],
            ..EventQuery::default()
        };
        assert_eq!(db.list_events(&query).unwrap(), vec![early]);

        let query = EventQuery {
            start: Some(Utc.ymd(2025, 1, 10).and_hms(0, 0, 0)),
            end: Some(Utc.ymd(2025, 1, 10).and_hms(23, 59, 59)),
            ..EventQuery::default()
        };
        let titles: Vec<_> = db
            .list_events(&query)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["game"]);
        assert_eq!(db.count_events().unwrap(), 3);
    }

    #[test]
    fn user_events_upsert_and_delete() {
        let db = temporary();
        let created = db.put_user_event(1, 10, true).unwrap();
        let updated = db.put_user_event(1, 10, false).unwrap();
        assert_eq!(created.id, updated.id);
        assert!(!updated.is_favorite);
        db.put_user_event(2, 10, true).unwrap();
        assert_eq!(db.list_user_events(1).unwrap(), vec![updated.clone()]);

        assert!(!db.delete_user_event(2, updated.id).unwrap());
        assert!(db.delete_user_event(1, updated.id).unwrap());
        assert!(!db.delete_user_event(1, updated.id).unwrap());
        assert!(db.list_user_events(1).unwrap().is_empty());
        assert_eq!(db.list_user_events(2).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_upserts_share_one_record() {
        let db = temporary();
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || db.put_user_event(1, 10, i % 2 == 0).unwrap())
            })
            .collect();
        let ids: Vec<u64> = workers
            .into_iter()
            .map(|worker| worker.join().unwrap().id)
            .collect();
        assert!(ids.iter().all(|&id| id == ids[0]));
        assert_eq!(db.open_tree(USER_EVENTS).unwrap().len(), 1);
        let listed = db.list_user_events(1).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ids[0]);
    }

    #[test]
    fn cache_keys_distinguish_queries() {
        let all = EventQuery::default();
        let movies = EventQuery {
            category: Some(Category::Movies),
            ..EventQuery::default()
        };
        assert_eq!(all.cache_key(), "events-all-all-all-all");
        assert_ne!(all.cache_key(), movies.cache_key());
    }
}
