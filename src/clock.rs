/// Clock pulses and the musical resolutions that map them onto steps
use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// One tick from the external clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub count: i32,
    pub tempo: f32,
}

impl Pulse {
    pub fn new(count: i32, tempo: f32) -> Self {
        Self { count, tempo }
    }
}

/// Named step resolution. The clock ticks at 96 pulses per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    Sixteenth,
    ThirtySecond,
    #[default]
    NinetySixth,
}

impl Resolution {
    /// Number of pulses collapsed into one step.
    pub fn divisor(self) -> u32 {
        match self {
            Resolution::Sixteenth => 6,
            Resolution::ThirtySecond => 3,
            Resolution::NinetySixth => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Resolution::Sixteenth => "16th",
            Resolution::ThirtySecond => "32nd",
            Resolution::NinetySixth => "96th",
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16th" => Ok(Resolution::Sixteenth),
            "32nd" => Ok(Resolution::ThirtySecond),
            "96th" => Ok(Resolution::NinetySixth),
            other => Err(Error::UnknownResolution(other.to_string())),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(res: Resolution) -> Self {
        res.name().to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
