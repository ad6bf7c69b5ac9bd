/// Error types shared by the sequencer, its collaborators and the MIDI output
use std::error::Error as StdError;

/// Boxed error produced by an external collaborator (input link, display, trigger).
pub type BoxError = Box<dyn StdError + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The hit stream reported a broken link or closed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Writing to the display sink failed.
    #[error("display error: {0}")]
    Display(#[source] BoxError),

    /// A track selection was attempted with a hit outside the meta row/column.
    #[error("hit ({x}, {y}) is not for track selection")]
    Protocol { x: u8, y: u8 },

    #[error("unrecognized resolution: {0}")]
    UnknownResolution(String),

    /// A registered trigger failed; playback and audio would drift apart.
    #[error("trigger failed: {0}")]
    Trigger(#[source] BoxError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MIDI error: {0}")]
    Midi(String),

    /// The engine is no longer running, so the request could not be delivered.
    #[error("sequencer stopped")]
    Stopped,
}

impl Error {
    /// Whether this error ends the dispatch loop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Protocol { .. })
    }
}
