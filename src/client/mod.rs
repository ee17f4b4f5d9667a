//! Client-side state: what a browser or native front end keeps between
//! requests, with persistence and the server behind injectable ports.

pub mod api;
pub mod favorites;
pub mod interests;
pub mod session;
pub mod storage;
pub mod store;

pub use api::{ApiClientError, AuthApi, EventsApi, HttpApi};
pub use favorites::FavoriteStore;
pub use interests::InterestStore;
pub use session::{Notification, SessionHolder, Variant};
pub use storage::{MemoryStorage, SledStorage, Storage, StorageError};
pub use store::EventStore;
