//! Data models for trackdex.

mod message;
mod record;
mod scan;
mod track;

pub use message::{
    Chat, EntityType, FileInfo, InlineButton, Media, Message, MessageEntity, PhotoSize, Sender,
};
pub use record::{FileMetadata, FileRecord, FileType, MediaSource};
pub use scan::{IndexingSession, ScanCursorState, SessionPhase};
pub use track::{Candidate, CandidateSource, Platform, TrackMatch};
