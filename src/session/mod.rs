//! Session state and lifecycle for the console client.
//! Keep the public surface thin and split implementation across sub-modules.

mod persist;
mod store;

pub use persist::{PersistError, StateFile, PREFS_STORAGE_KEY, SESSION_STORAGE_KEY};
pub use store::{SessionSnapshot, SessionStore, UserProfile};
