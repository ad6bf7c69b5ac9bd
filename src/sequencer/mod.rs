/// Core sequencer state - pattern, mutes, playback cursor and selection
///
/// Everything here is a pure state transition. Drawing and trigger dispatch
/// happen in [`playback`], which owns the only `Sequencer` and is the only
/// code path that mutates it.
use crate::clock::Resolution;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::trigger::Trig;

pub mod grid;
pub mod playback;

use grid::{Hit, GRID_SIZE, GRID_X, GRID_Y};

/// What the playable 8x8 area shows and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Cells are the 64 steps of the current track.
    #[default]
    Pattern,
    /// Cells are the 64 tracks; hits toggle their mute flag.
    Mutes,
}

/// Velocity of every step of every track. Zero means off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tracks: [[u8; GRID_SIZE]; GRID_SIZE],
}

impl Pattern {
    pub fn new() -> Self {
        Self {
            tracks: [[0; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn get(&self, track: u8, step: u8) -> u8 {
        self.tracks
            .get(track as usize)
            .and_then(|steps| steps.get(step as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, track: u8, step: u8, value: u8) {
        if let Some(steps) = self.tracks.get_mut(track as usize) {
            if let Some(cell) = steps.get_mut(step as usize) {
                *cell = value;
            }
        }
    }

    /// Flip a step between off and `on_velocity`, returning the new value.
    pub fn toggle(&mut self, track: u8, step: u8, on_velocity: u8) -> u8 {
        let value = if self.get(track, step) == 0 {
            on_velocity
        } else {
            0
        };
        self.set(track, step, value);
        value
    }

    pub fn steps(&self, track: u8) -> &[u8; GRID_SIZE] {
        &self.tracks[track as usize % GRID_SIZE]
    }

    pub fn clear_track(&mut self, track: u8) {
        if let Some(steps) = self.tracks.get_mut(track as usize) {
            *steps = [0; GRID_SIZE];
        }
    }

    pub fn clear(&mut self) {
        for steps in &mut self.tracks {
            *steps = [0; GRID_SIZE];
        }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Sequencer {
    pattern: Pattern,
    mutes: [bool; GRID_SIZE],
    prev_step: u8,
    step: u8,
    step_skip: u32,
    track: u8,
    mode: Mode,
    on_velocity: u8,
}

impl Sequencer {
    /// Fresh sequencer: empty pattern, no mutes, track 0, pattern mode.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: &Config) -> Self {
        Self {
            pattern: Pattern::new(),
            mutes: [false; GRID_SIZE],
            prev_step: 0,
            step: 0,
            step_skip: config.resolution.divisor(),
            track: 0,
            mode: Mode::Pattern,
            on_velocity: config.on_velocity,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn velocity(&self, track: u8, step: u8) -> u8 {
        self.pattern.get(track, step)
    }

    pub fn is_muted(&self, track: u8) -> bool {
        self.mutes.get(track as usize).copied().unwrap_or(false)
    }

    pub fn mutes(&self) -> &[bool; GRID_SIZE] {
        &self.mutes
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn prev_step(&self) -> u8 {
        self.prev_step
    }

    pub fn track(&self) -> u8 {
        self.track
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn step_skip(&self) -> u32 {
        self.step_skip
    }

    pub fn on_velocity(&self) -> u8 {
        self.on_velocity
    }

    pub fn set_step_skip(&mut self, resolution: Resolution) {
        self.step_skip = resolution.divisor();
    }

    /// Set the resolution by name (`"16th"`, `"32nd"` or `"96th"`).
    /// Unknown names leave the divisor untouched.
    pub fn set_resolution(&mut self, name: &str) -> Result<()> {
        let resolution: Resolution = name.parse()?;
        self.set_step_skip(resolution);
        Ok(())
    }

    /// Move the playback cursor for a clock pulse.
    ///
    /// At the finest resolution the step is taken straight from the pulse
    /// count, so a dropped pulse corrects itself on the next one. Coarser
    /// resolutions count steps relative to the previous one, so changing
    /// resolution mid-bar keeps the phase.
    pub fn advance(&mut self, pulse_count: i32) -> bool {
        if self.step_skip <= 1 {
            self.prev_step = self.step;
            self.step = pulse_count.rem_euclid(GRID_SIZE as i32) as u8;
            return true;
        }
        if pulse_count.rem_euclid(self.step_skip as i32) != 0 {
            return false;
        }
        self.prev_step = self.step;
        self.step = (self.step + 1) % GRID_SIZE as u8;
        true
    }

    /// Change the current track from a meta button.
    ///
    /// The top row replaces the column component of the track index, the
    /// right column replaces the row component. Returns whether the track
    /// actually changed.
    pub fn select_track(&mut self, hit: Hit) -> Result<bool> {
        let col = self.track % GRID_X;
        let row = self.track / GRID_X;
        let track = match (hit.x, hit.y) {
            (x, y) if y == GRID_Y && x < GRID_X => row * GRID_X + x,
            (x, y) if x == GRID_X && y < GRID_Y => y * GRID_X + col,
            (x, y) => return Err(Error::Protocol { x, y }),
        };
        if track == self.track {
            return Ok(false);
        }
        self.track = track;
        Ok(true)
    }

    /// Toggle a step of the current track, returning its new velocity.
    pub fn toggle_step(&mut self, hit: Hit) -> Result<u8> {
        if !hit.is_playable() {
            return Err(Error::Protocol { x: hit.x, y: hit.y });
        }
        Ok(self
            .pattern
            .toggle(self.track, hit.to_step(), self.on_velocity))
    }

    /// Toggle the mute of the track shown at the hit cell, returning whether it is now muted.
    pub fn toggle_mute(&mut self, hit: Hit) -> Result<bool> {
        if !hit.is_playable() {
            return Err(Error::Protocol { x: hit.x, y: hit.y });
        }
        let muted = &mut self.mutes[hit.to_step() as usize];
        *muted = !*muted;
        Ok(*muted)
    }

    /// Tracks with a non-zero velocity at the current step, in track order.
    /// Mutes do not gate playback.
    pub fn firings(&self) -> Vec<Trig> {
        (0..GRID_SIZE as u8)
            .filter_map(|track| {
                let value = self.pattern.get(track, self.step);
                (value > 0).then_some(Trig { track, value })
            })
            .collect()
    }

    pub fn clear_track(&mut self) {
        self.pattern.clear_track(self.track);
    }

    pub fn clear(&mut self) {
        self.pattern.clear();
        self.mutes = [false; GRID_SIZE];
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
