//! # Orientation
//!
//! The logical orientation seen by applications is kept apart from the
//! platform's lock constants, so a rotation code can never be handed to the
//! display as a constraint by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rotation code reported for display transforms that are not a plain
/// rotation, e.g. mirrored outputs.
pub const ROTATION_UNKNOWN: i32 = -1;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Zero degree rotation.
    Portrait,
    /// 180 degree rotation; screen is upside down.
    PortraitFlipped,
    /// 90 degree clockwise rotation.
    Landscape,
    /// 270 degree clockwise rotation.
    LandscapeFlipped,
    /// No rotation reading is available.
    Undefined,
}

/// Orientation constraint understood by the display.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScreenLock {
    Portrait,
    ReversePortrait,
    Landscape,
    ReverseLandscape,
    /// No constraint; the display keeps whatever rotation it has.
    Unspecified,
}

impl Orientation {
    pub const ALL: [Orientation; 5] = [
        Self::Portrait,
        Self::PortraitFlipped,
        Self::Landscape,
        Self::LandscapeFlipped,
        Self::Undefined,
    ];

    /// Convert a platform rotation code, in clockwise degrees.
    /// Only the four exact codes are known; everything else is `Undefined`.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees {
            0 => Self::Portrait,
            90 => Self::Landscape,
            180 => Self::PortraitFlipped,
            270 => Self::LandscapeFlipped,
            _ => Self::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Portrait => "portrait",
            Self::PortraitFlipped => "portrait-flipped",
            Self::Landscape => "landscape",
            Self::LandscapeFlipped => "landscape-flipped",
            Self::Undefined => "undefined",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Portrait,
            1 => Self::PortraitFlipped,
            2 => Self::Landscape,
            3 => Self::LandscapeFlipped,
            _ => Self::Undefined,
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Undefined
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidOrientation(s.to_owned()))
    }
}

impl ScreenLock {
    /// Clockwise degrees the display ends up at under this lock.
    pub fn rotation_degrees(&self) -> Option<i32> {
        match *self {
            Self::Portrait => Some(0),
            Self::Landscape => Some(90),
            Self::ReversePortrait => Some(180),
            Self::ReverseLandscape => Some(270),
            Self::Unspecified => None,
        }
    }
}

impl From<Orientation> for ScreenLock {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => ScreenLock::Portrait,
            Orientation::PortraitFlipped => ScreenLock::ReversePortrait,
            Orientation::Landscape => ScreenLock::Landscape,
            Orientation::LandscapeFlipped => ScreenLock::ReverseLandscape,
            Orientation::Undefined => ScreenLock::Unspecified,
        }
    }
}
