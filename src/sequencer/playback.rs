/// Playback engine - the single dispatch loop that owns the sequencer
///
/// Hits, clock pulses and control requests arrive on crossbeam channels. The
/// loop takes exactly one event at a time and handles it to completion, so
/// pattern, mute, track and mode state never see concurrent mutation.
/// Pulses are handed over through a zero-capacity channel: while the engine
/// is busy the clock producer blocks instead of queueing.
use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::{debug, error, info, trace, warn};

use super::grid::{Color, Hit, Palette, GRID_SIZE, GRID_X, GRID_Y};
use super::{Mode, Sequencer};
use crate::clock::{Pulse, Resolution};
use crate::config::Config;
use crate::display::DisplaySink;
use crate::error::{BoxError, Error, Result};
use crate::trigger::{Trig, Trigger};

/// A hit from the input collaborator, or the error that broke its link.
pub type HitEvent = std::result::Result<Hit, BoxError>;

/// Rendezvous channel for feeding hits into an [`Engine`].
pub fn hit_channel() -> (Sender<HitEvent>, Receiver<HitEvent>) {
    bounded(0)
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Mode(Mode),
    Resolution(Resolution),
}

enum Event {
    Cancel,
    Hit(Hit),
    Pulse(Pulse),
    Control(Control),
    Fail(Error),
}

/// Sends clock pulses to the engine.
#[derive(Debug, Clone)]
pub struct Clock {
    tx: Sender<Pulse>,
}

impl Clock {
    /// Blocks until the engine takes the pulse.
    pub fn pulse(&self, pulse: Pulse) -> Result<()> {
        self.tx.send(pulse).map_err(|_| Error::Stopped)
    }
}

/// Out-of-band control of a running engine.
#[derive(Debug, Clone)]
pub struct Handle {
    control: Sender<Control>,
    cancel: Sender<()>,
}

impl Handle {
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.control
            .send(Control::Mode(mode))
            .map_err(|_| Error::Stopped)
    }

    /// Validate a resolution name and queue it for the engine.
    /// Unknown names are rejected here and never reach the engine.
    pub fn set_resolution(&self, name: &str) -> Result<Resolution> {
        let resolution: Resolution = name.parse()?;
        self.control
            .send(Control::Resolution(resolution))
            .map_err(|_| Error::Stopped)?;
        Ok(resolution)
    }

    /// Ask the loop to return. Repeated calls are harmless.
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }
}

pub struct Engine<D: DisplaySink> {
    seq: Sequencer,
    display: D,
    palette: Palette,
    triggers: Vec<Box<dyn Trigger>>,
    // Mutes-mode cells lit for the current step.
    flashed: Vec<u8>,
    hits: Receiver<HitEvent>,
    pulses: Receiver<Pulse>,
    pulse_tx: Sender<Pulse>,
    control: Receiver<Control>,
    control_tx: Sender<Control>,
    cancel: Receiver<()>,
    cancel_tx: Sender<()>,
}

impl<D: DisplaySink> Engine<D> {
    /// Fails with [`Error::Config`] when the config does not validate.
    pub fn new(display: D, hits: Receiver<HitEvent>, config: &Config) -> Result<Self> {
        let seq = Sequencer::new(config)?;
        let (pulse_tx, pulses) = bounded(0);
        let (control_tx, control) = bounded(1);
        let (cancel_tx, cancel) = bounded(1);

        Ok(Self {
            seq,
            display,
            palette: config.palette,
            triggers: Vec::new(),
            flashed: Vec::new(),
            hits,
            pulses,
            pulse_tx,
            control,
            control_tx,
            cancel,
            cancel_tx,
        })
    }

    /// Triggers are invoked in the order they were added.
    pub fn add_trigger<T: Trigger + 'static>(&mut self, trigger: T) {
        self.triggers.push(Box::new(trigger));
    }

    pub fn clock(&self) -> Clock {
        Clock {
            tx: self.pulse_tx.clone(),
        }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            control: self.control_tx.clone(),
            cancel: self.cancel_tx.clone(),
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.seq
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until cancelled or until a fatal error.
    ///
    /// Draws the initial mode, then blocks on the next event forever if no
    /// source produces one. Cancellation returns `Ok(())` without drawing.
    pub fn run(&mut self) -> Result<()> {
        info!(mode = ?self.seq.mode(), step_skip = self.seq.step_skip(), "sequencer started");
        if let Err(err) = self.enter_mode(self.seq.mode()) {
            error!(%err, "sequencer stopped");
            return Err(err);
        }

        loop {
            if self.cancel.try_recv().is_ok() {
                info!("sequencer cancelled");
                return Ok(());
            }

            // The engine keeps its own pulse and control senders, so only the
            // hit stream can disconnect; the other arms map it for completeness.
            let event = select! {
                recv(self.cancel) -> _msg => Event::Cancel,
                recv(self.hits) -> msg => match msg {
                    Ok(Ok(hit)) => Event::Hit(hit),
                    Ok(Err(err)) => Event::Fail(Error::Transport(err)),
                    Err(_) => Event::Fail(Error::Transport("hit stream closed".into())),
                },
                recv(self.pulses) -> msg => match msg {
                    Ok(pulse) => Event::Pulse(pulse),
                    Err(_) => Event::Fail(Error::Stopped),
                },
                recv(self.control) -> msg => match msg {
                    Ok(control) => Event::Control(control),
                    Err(_) => Event::Fail(Error::Stopped),
                },
            };

            let result = match event {
                Event::Cancel => {
                    info!("sequencer cancelled");
                    return Ok(());
                }
                Event::Hit(hit) => self.handle_hit(hit),
                Event::Pulse(pulse) => self.handle_pulse(pulse),
                Event::Control(Control::Mode(mode)) => self.enter_mode(mode),
                Event::Control(Control::Resolution(resolution)) => {
                    debug!(%resolution, "resolution changed");
                    self.seq.set_step_skip(resolution);
                    Ok(())
                }
                Event::Fail(err) => Err(err),
            };

            if let Err(err) = result {
                error!(%err, "sequencer stopped");
                return Err(err);
            }
        }
    }

    fn enter_mode(&mut self, mode: Mode) -> Result<()> {
        debug!(?mode, "entering mode");
        self.seq.set_mode(mode);
        self.redraw()
    }

    /// Clear the surface and draw the track marker plus the mode's cells.
    fn redraw(&mut self) -> Result<()> {
        self.flashed.clear();
        self.display.reset().map_err(Error::Display)?;
        self.light_current_track()?;
        match self.seq.mode() {
            Mode::Pattern => self.light_track_steps(),
            Mode::Mutes => self.light_mutes(),
        }
    }

    fn handle_hit(&mut self, hit: Hit) -> Result<()> {
        if hit.is_meta() {
            return self.select_track(hit);
        }
        if !hit.is_playable() {
            warn!(x = hit.x, y = hit.y, "hit outside the surface ignored");
            return Ok(());
        }
        match self.seq.mode() {
            Mode::Pattern => {
                let value = self.seq.toggle_step(hit)?;
                let color = self.step_color(value);
                self.light(hit, color)
            }
            Mode::Mutes => {
                let muted = self.seq.toggle_mute(hit)?;
                let color = self.mute_color(muted);
                self.light(hit, color)
            }
        }
    }

    fn select_track(&mut self, hit: Hit) -> Result<()> {
        match self.seq.select_track(hit) {
            Ok(false) => Ok(()),
            Ok(true) => {
                let track = self.seq.track();
                debug!(track, "track selected");
                for trigger in &mut self.triggers {
                    trigger.track(track).map_err(Error::Trigger)?;
                }
                self.redraw()
            }
            Err(err @ Error::Protocol { .. }) => {
                warn!(%err, "track selection ignored");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn handle_pulse(&mut self, pulse: Pulse) -> Result<()> {
        if !self.seq.advance(pulse.count) {
            return Ok(());
        }
        trace!(count = pulse.count, tempo = pulse.tempo, step = self.seq.step(), "step");

        let trigs = self.seq.firings();
        match self.seq.mode() {
            Mode::Pattern => self.advance_lights()?,
            Mode::Mutes => self.flash_triggers(&trigs)?,
        }
        self.invoke_triggers(&trigs)
    }

    /// Move the position light, restoring the cell it leaves.
    fn advance_lights(&mut self) -> Result<()> {
        let (prev, step) = (self.seq.prev_step(), self.seq.step());
        if prev == step {
            // First pulse of the sequence.
            return self.light(Hit::new(0, 0), self.palette.position);
        }
        self.light(Hit::from_step(step), self.palette.position)?;
        let value = self.seq.velocity(self.seq.track(), prev);
        let color = self.step_color(value);
        self.light(Hit::from_step(prev), color)
    }

    /// Light the unmuted tracks firing at this step, putting last step's back.
    fn flash_triggers(&mut self, trigs: &[Trig]) -> Result<()> {
        for track in std::mem::take(&mut self.flashed) {
            let color = self.mute_color(self.seq.is_muted(track));
            self.light(Hit::from_step(track), color)?;
        }
        for trig in trigs.iter().filter(|t| !self.seq.is_muted(t.track)) {
            self.display
                .light(
                    trig.track % GRID_X,
                    trig.track / GRID_X,
                    self.palette.position,
                )
                .map_err(Error::Display)?;
            self.flashed.push(trig.track);
        }
        Ok(())
    }

    fn invoke_triggers(&mut self, trigs: &[Trig]) -> Result<()> {
        let step = self.seq.step();
        for trigger in &mut self.triggers {
            trigger.trig(step, trigs).map_err(Error::Trigger)?;
        }
        Ok(())
    }

    fn light_current_track(&mut self) -> Result<()> {
        let track = self.seq.track();
        let color = self.palette.step;
        self.light(Hit::new(track % GRID_X, GRID_Y), color)?;
        self.light(Hit::new(GRID_X, track / GRID_X), color)
    }

    fn light_track_steps(&mut self) -> Result<()> {
        let track = self.seq.track();
        for step in 0..GRID_SIZE as u8 {
            let color = self.step_color(self.seq.velocity(track, step));
            self.light(Hit::from_step(step), color)?;
        }
        Ok(())
    }

    fn light_mutes(&mut self) -> Result<()> {
        for track in 0..GRID_SIZE as u8 {
            let color = self.mute_color(self.seq.is_muted(track));
            self.light(Hit::from_step(track), color)?;
        }
        Ok(())
    }

    fn light(&mut self, hit: Hit, color: Color) -> Result<()> {
        self.display
            .light(hit.x, hit.y, color)
            .map_err(Error::Display)
    }

    fn step_color(&self, value: u8) -> Color {
        if value > 0 {
            self.palette.step
        } else {
            Color::OFF
        }
    }

    fn mute_color(&self, muted: bool) -> Color {
        if muted {
            self.palette.step
        } else {
            Color::OFF
        }
    }
}
