//! Document-wide render parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::ValueParseError;

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn max(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl FromStr for Resolution {
    type Err = ValueParseError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ValueParseError::property("resolution", s);
        let (w, h) = s.trim().split_once('x').ok_or_else(err)?;
        let width = w.trim().parse::<u32>().map_err(|_| err())?;
        let height = h.trim().parse::<u32>().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(err());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable root parameters threaded through style resolution and
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub resolution: Resolution,
    pub fps: f64,
}

impl RenderContext {
    pub fn new(resolution: Resolution, fps: f64) -> Self {
        Self { resolution, fps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        let res: Resolution = "1280x720".parse().unwrap();
        assert_eq!(res, Resolution::new(1280, 720));
        assert_eq!(res.min(), 720);
        assert_eq!(res.max(), 1280);
        assert_eq!(res.to_string(), "1280x720");
    }

    #[test]
    fn test_reject_bad_resolution() {
        assert!("1280".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }
}
