/// Button geometry of the 9x9 control surface and the light colors it accepts.
///
/// The playable area is the 8x8 block at `x < 8, y < 8`. The ninth column
/// (`x == 8`) and ninth row (`y == 8`) hold the meta buttons used for track
/// selection.

pub const GRID_X: u8 = 8;
pub const GRID_Y: u8 = 8;
pub const GRID_SIZE: usize = (GRID_X as usize) * (GRID_Y as usize);

/// A button press on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hit {
    pub x: u8,
    pub y: u8,
}

impl Hit {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Hit on the right column or the top row.
    pub fn is_meta(&self) -> bool {
        self.x == GRID_X || self.y == GRID_Y
    }

    pub fn is_playable(&self) -> bool {
        self.x < GRID_X && self.y < GRID_Y
    }

    /// Row-major index of a playable cell. Only meaningful when
    /// [`is_playable`](Self::is_playable) holds; other coordinates wrap
    /// into `[0, 63]` instead of overflowing.
    pub fn to_step(&self) -> u8 {
        let step = self.y as usize * GRID_X as usize + self.x as usize;
        (step % GRID_SIZE) as u8
    }

    pub fn from_step(step: u8) -> Self {
        let step = step % GRID_SIZE as u8;
        Self {
            x: step % GRID_X,
            y: step / GRID_X,
        }
    }
}

/// One of the four intensities a single LED channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Off,
    Low,
    Medium,
    Full,
}

/// Two-channel (red/green) light color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Color {
    pub red: Level,
    pub green: Level,
}

impl Color {
    pub const OFF: Color = Color {
        red: Level::Off,
        green: Level::Off,
    };

    pub const fn new(red: Level, green: Level) -> Self {
        Self { red, green }
    }

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

/// Colors used for the playback cursor and for steps that are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Palette {
    pub position: Color,
    pub step: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            position: Color::new(Level::Off, Level::Medium),
            step: Color::new(Level::Full, Level::Off),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_hit_bijection() {
        for step in 0..GRID_SIZE as u8 {
            let hit = Hit::from_step(step);
            assert!(hit.is_playable());
            assert_eq!(hit.to_step(), step);
        }
        assert_eq!(Hit::from_step(9), Hit::new(1, 1));
        assert_eq!(Hit::new(7, 7).to_step(), 63);
    }

    #[test]
    fn test_to_step_never_overflows() {
        assert_eq!(Hit::new(255, 255).to_step(), 55);
        assert_eq!(Hit::new(8, 8).to_step(), 8);
        assert!(Hit::new(0, 40).to_step() < GRID_SIZE as u8);
    }

    #[test]
    fn test_meta_buttons() {
        assert!(Hit::new(8, 3).is_meta());
        assert!(Hit::new(2, 8).is_meta());
        assert!(Hit::new(8, 8).is_meta());
        assert!(!Hit::new(7, 7).is_meta());
        assert!(!Hit::new(8, 0).is_playable());
    }

    #[test]
    fn test_default_palette() {
        let palette = Palette::default();
        assert_eq!(palette.position.green, Level::Medium);
        assert_eq!(palette.step.red, Level::Full);
        assert!(Color::default().is_off());
    }
}
