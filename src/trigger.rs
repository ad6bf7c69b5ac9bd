/// Triggers - downstream listeners notified on every step advance
use crate::error::BoxError;

/// One firing track and its velocity at the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trig {
    pub track: u8,
    pub value: u8,
}

pub trait Trigger: Send {
    /// Called once per step advance with the firings in ascending track order.
    fn trig(&mut self, step: u8, trigs: &[Trig]) -> Result<(), BoxError>;

    /// Called whenever the current track changes.
    fn track(&mut self, _track: u8) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<F> Trigger for F
where
    F: FnMut(u8, &[Trig]) -> Result<(), BoxError> + Send,
{
    fn trig(&mut self, step: u8, trigs: &[Trig]) -> Result<(), BoxError> {
        self(step, trigs)
    }
}
