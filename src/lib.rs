/// PADSEQ - A grid step sequencer engine
///
/// This library turns an 8x8 button/light matrix with a meta row and column
/// into a 64-track, 64-step pattern sequencer driven by an external clock:
/// - Grid geometry, colors and the owned sequencer state
/// - A single dispatch loop consuming hits, pulses and mode changes
/// - Display sink and trigger capabilities for the collaborators
/// - MIDI note output for production use

pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod trigger;

// Re-export commonly used types
pub use clock::{Pulse, Resolution};
pub use config::Config;
pub use display::{DisplaySink, Frame, SharedFrame};
pub use error::{BoxError, Error, Result};
pub use midi::{midi_note_name, MidiTrigger, NoteMap};
pub use sequencer::grid::{Color, Hit, Level, Palette, GRID_SIZE, GRID_X, GRID_Y};
pub use sequencer::playback::{hit_channel, Clock, Engine, Handle, HitEvent};
pub use sequencer::{Mode, Pattern, Sequencer};
pub use trigger::{Trig, Trigger};
