/// MIDI note output for sequencer triggers, using midir
///
/// Each firing track plays one note. Notes still sounding from the previous
/// step are released before the new ones start.
use crate::error::{BoxError, Error, Result};
use crate::sequencer::grid::GRID_SIZE;
use crate::trigger::{Trig, Trigger};
use tracing::debug;

#[cfg(feature = "midi")]
use midir::{MidiOutput, MidiOutputConnection};

#[cfg(feature = "midi")]
const CLIENT_NAME: &str = "padseq MIDI Output";

pub const NOTE_ON: u8 = 0x90;
pub const NOTE_OFF: u8 = 0x80;

/// Maps tracks onto notes of one MIDI channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMap {
    base: u8,
    channel: u8,
}

impl NoteMap {
    /// `channel` is zero-based (`0..16`).
    pub fn new(base: u8, channel: u8) -> Result<Self> {
        if channel > 15 {
            return Err(Error::Midi(format!("channel {channel} out of range")));
        }
        if base > 127 {
            return Err(Error::Midi(format!("base note {base} out of range")));
        }
        Ok(Self { base, channel })
    }

    /// Tracks past the top of the note range all land on 127.
    pub fn note(&self, track: u8) -> u8 {
        self.base.saturating_add(track).min(127)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl Default for NoteMap {
    // General MIDI percussion: kick on track 0.
    fn default() -> Self {
        Self {
            base: 36,
            channel: 9,
        }
    }
}

pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [NOTE_ON | (channel & 0x0f), note & 0x7f, velocity & 0x7f]
}

pub fn note_off(channel: u8, note: u8) -> [u8; 3] {
    [NOTE_OFF | (channel & 0x0f), note & 0x7f, 0]
}

pub struct MidiTrigger {
    map: NoteMap,
    sounding: Vec<u8>,
    #[cfg(feature = "midi")]
    connection: Option<MidiOutputConnection>,
}

impl MidiTrigger {
    pub fn new(map: NoteMap) -> Self {
        Self {
            map,
            sounding: Vec::with_capacity(GRID_SIZE),
            #[cfg(feature = "midi")]
            connection: None,
        }
    }

    pub fn note_map(&self) -> NoteMap {
        self.map
    }

    /// Messages for one step: note-offs for what is sounding, then note-ons.
    fn messages(&mut self, trigs: &[Trig]) -> Vec<[u8; 3]> {
        let channel = self.map.channel();
        let mut out: Vec<[u8; 3]> = self
            .sounding
            .drain(..)
            .map(|note| note_off(channel, note))
            .collect();
        for trig in trigs {
            let note = self.map.note(trig.track);
            out.push(note_on(channel, note, trig.value));
            if !self.sounding.contains(&note) {
                self.sounding.push(note);
            }
        }
        out
    }

    /// Note-offs for everything sounding.
    fn release(&mut self) -> Vec<[u8; 3]> {
        self.messages(&[])
    }
}

#[cfg(feature = "midi")]
impl MidiTrigger {
    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| Error::Midi(format!("failed to create MIDI output: {e}")))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| Error::Midi(format!("invalid port index {port_index}")))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "padseq")
            .map_err(|e| Error::Midi(format!("failed to connect: {e}")))?;

        debug!(port = %name, "MIDI output connected");
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Release sounding notes and drop the connection.
    pub fn disconnect(&mut self) {
        let release = self.release();
        if let Some(mut conn) = self.connection.take() {
            for msg in &release {
                let _ = conn.send(msg);
            }
        }
    }

    fn send(&mut self, messages: &[[u8; 3]]) -> std::result::Result<(), BoxError> {
        if let Some(ref mut conn) = self.connection {
            for msg in messages {
                conn.send(msg)?;
            }
        }
        Ok(())
    }
}

#[cfg(not(feature = "midi"))]
impl MidiTrigger {
    pub fn is_connected(&self) -> bool {
        false
    }

    pub fn disconnect(&mut self) {
        self.release();
    }

    fn send(&mut self, _messages: &[[u8; 3]]) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

impl Default for MidiTrigger {
    fn default() -> Self {
        Self::new(NoteMap::default())
    }
}

impl Trigger for MidiTrigger {
    fn trig(&mut self, _step: u8, trigs: &[Trig]) -> std::result::Result<(), BoxError> {
        let messages = self.messages(trigs);
        self.send(&messages)
    }

    fn track(&mut self, track: u8) -> std::result::Result<(), BoxError> {
        debug!(track, note = self.map.note(track), "MIDI track selected");
        Ok(())
    }
}

impl Drop for MidiTrigger {
    fn drop(&mut self) {
        self.disconnect();
    }
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
