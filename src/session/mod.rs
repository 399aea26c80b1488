/// Session management module - Gateway

mod state;
mod store;

pub use state::{Session, SessionAction};
pub use store::{read_persisted_session, PersistSession, SessionStore};
