//! Display traits.
//!
//! A [`Rotator`] is the foreground display context: the output whose live
//! rotation we report, and which orientation locks are applied to.
//! Rotation is read through a chain of handles (display server, output
//! manager, target output), any of which can go missing at runtime.

pub mod dummy;
pub mod wlroots;
pub mod xrandr;

use std::fmt;

use crate::error::{Error, Result};
use crate::orientation::ScreenLock;

pub trait Rotator: Send + Sync {
    /// Live clockwise rotation of the target display, in degrees.
    ///
    /// Fails with [`Error::NoForeground`] when the display is not there right now.
    fn current_rotation(&self) -> Result<i32>;

    /// Constrain the display to `lock`. [`ScreenLock::Unspecified`] lifts the constraint.
    fn request_orientation(&self, lock: ScreenLock) -> Result<()>;

    /// Report which handles along the display chain are currently reachable.
    fn display_chain(&self) -> DisplayChain {
        match self.current_rotation() {
            Ok(rotation) => DisplayChain::complete(rotation),
            Err(Error::NoForeground) => DisplayChain::default(),
            Err(_) => DisplayChain {
                context: true,
                ..DisplayChain::default()
            },
        }
    }
}

/// Snapshot of the display chain, for diagnostics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayChain {
    pub context: bool,
    pub manager: bool,
    pub display: bool,
    pub rotation: Option<i32>,
}

impl DisplayChain {
    pub fn complete(rotation: i32) -> Self {
        DisplayChain {
            context: true,
            manager: true,
            display: true,
            rotation: Some(rotation),
        }
    }
}

fn availability(present: bool) -> &'static str {
    if present {
        "available"
    } else {
        "missing"
    }
}

impl fmt::Display for DisplayChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "context: {}, manager: {}, display: {}, rotation: ",
            availability(self.context),
            availability(self.manager),
            availability(self.display),
        )?;
        match self.rotation {
            Some(degrees) => write!(f, "{}", degrees),
            None => f.write_str("missing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_display() {
        assert_eq!(
            DisplayChain::complete(90).to_string(),
            "context: available, manager: available, display: available, rotation: 90"
        );
        let partial = DisplayChain {
            context: true,
            manager: true,
            ..DisplayChain::default()
        };
        assert_eq!(
            partial.to_string(),
            "context: available, manager: available, display: missing, rotation: missing"
        );
    }
}
