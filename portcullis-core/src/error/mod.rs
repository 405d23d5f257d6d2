use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Errors raised by a [`LockoutStore`](crate::repositories::LockoutStore) backend.
///
/// The in-memory store never fails; these variants exist for networked
/// backends (shared caches, databases) plugged in behind the same trait.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

/// Errors raised by a [`Broadcaster`](crate::events::Broadcaster) transport.
///
/// The fan-out swallows and logs these rather than surfacing them; the type
/// exists so transport implementations have something concrete to return.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Broadcast transport error: {0}")]
    Transport(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_event_error(&self) -> bool {
        matches!(self, Error::Event(_))
    }
}
