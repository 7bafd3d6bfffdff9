//! Chess game orchestration: a turn coordinator that lets humans and UCI
//! engine workers take turns on one authoritative game record.

pub mod config;
pub mod console;
pub mod persistence;
pub mod session;

pub use persistence::transcript::{LoadError, LoadFailure, LoadReport};
pub use persistence::{PersistenceError, TranscriptStore};
pub use session::{
    spawn_session, Mode, SearchSettings, SessionConfig, SessionError, SessionEvent,
    SessionHandle, SessionSnapshot, TurnState, WorkerStatus,
};
