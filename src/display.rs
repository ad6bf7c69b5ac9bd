/// Display sink - where the sequencer draws its lights
///
/// The hardware implementation lives outside this crate. [`Frame`] is an
/// in-memory model of the whole 9x9 surface, usable headless or as a test
/// double.
use crate::error::BoxError;
use crate::sequencer::grid::{Color, GRID_X, GRID_Y};
use std::sync::{Arc, Mutex, MutexGuard};

const SURFACE: usize = GRID_X as usize + 1;

pub trait DisplaySink {
    /// Light the button at `(x, y)`, both in `[0, 8]`.
    fn light(&mut self, x: u8, y: u8, color: Color) -> Result<(), BoxError>;

    /// Turn every light off.
    fn reset(&mut self) -> Result<(), BoxError>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for &mut D {
    fn light(&mut self, x: u8, y: u8, color: Color) -> Result<(), BoxError> {
        (**self).light(x, y, color)
    }

    fn reset(&mut self) -> Result<(), BoxError> {
        (**self).reset()
    }
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn light(&mut self, x: u8, y: u8, color: Color) -> Result<(), BoxError> {
        (**self).light(x, y, color)
    }

    fn reset(&mut self) -> Result<(), BoxError> {
        (**self).reset()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    cells: [[Color; SURFACE]; SURFACE],
    writes: usize,
    resets: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            cells: [[Color::OFF; SURFACE]; SURFACE],
            writes: 0,
            resets: 0,
        }
    }

    pub fn get(&self, x: u8, y: u8) -> Color {
        self.cells
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
            .unwrap_or(Color::OFF)
    }

    /// Every cell that is not off, row by row.
    pub fn lit(&self) -> impl Iterator<Item = (u8, u8, Color)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, color)| !color.is_off())
                .map(move |(x, color)| (x as u8, y as u8, *color))
        })
    }

    /// Number of `light` calls since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for Frame {
    fn light(&mut self, x: u8, y: u8, color: Color) -> Result<(), BoxError> {
        if x > GRID_X || y > GRID_Y {
            return Err(format!("light ({x}, {y}) is off the surface").into());
        }
        self.cells[y as usize][x as usize] = color;
        self.writes += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), BoxError> {
        self.cells = [[Color::OFF; SURFACE]; SURFACE];
        self.resets += 1;
        Ok(())
    }
}

/// A [`Frame`] that can be handed to the engine while another thread watches it.
#[derive(Debug, Clone, Default)]
pub struct SharedFrame {
    inner: Arc<Mutex<Frame>>,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Frame>, BoxError> {
        self.inner
            .lock()
            .map_err(|_| "display frame lock poisoned".into())
    }

    /// Copy of the current surface.
    pub fn snapshot(&self) -> Result<Frame, BoxError> {
        Ok(self.lock()?.clone())
    }
}

impl DisplaySink for SharedFrame {
    fn light(&mut self, x: u8, y: u8, color: Color) -> Result<(), BoxError> {
        self.lock()?.light(x, y, color)
    }

    fn reset(&mut self) -> Result<(), BoxError> {
        self.lock()?.reset()
    }
}
