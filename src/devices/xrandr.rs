//! X11 displays, driven through the `xrandr` tool.

use std::io;
use std::process::Command;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use super::{DisplayChain, Rotator};
use crate::error::{Error, Result};
use crate::orientation::{ScreenLock, ROTATION_UNKNOWN};

pub struct XRandRRotator {
    output: String,
}

impl XRandRRotator {
    pub fn new(output: &str) -> Self {
        XRandRRotator {
            output: output.to_owned(),
        }
    }

    /// Like [`new`](Self::new), but first checks that `xrandr` is installed.
    pub fn connect(output: &str) -> Result<Self> {
        Command::new("xrandr")
            .arg("--version")
            .output()
            .map_err(spawn_error)?;
        Ok(Self::new(output))
    }

    /// Raw `xrandr --query` output. A failing `xrandr` means there is no
    /// X display to talk to.
    fn query(&self) -> Result<String> {
        let output = Command::new("xrandr")
            .arg("--query")
            .output()
            .map_err(spawn_error)?;
        if !output.status.success() {
            debug!(
                "xrandr query failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(Error::NoForeground);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A missing `xrandr` binary means this backend cannot work at all.
fn spawn_error(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::NoPlatform
    } else {
        Error::IOError(e)
    }
}

/// Rotation word used by xrandr for a lock, if the lock rotates at all.
fn rotate_arg(lock: ScreenLock) -> Option<&'static str> {
    match lock {
        ScreenLock::Portrait => Some("normal"),
        ScreenLock::Landscape => Some("right"),
        ScreenLock::ReversePortrait => Some("inverted"),
        ScreenLock::ReverseLandscape => Some("left"),
        ScreenLock::Unspecified => None,
    }
}

/// Find the clockwise rotation of `target` in `xrandr --query` output.
///
/// A missing or switched off output is no foreground display. Reflected
/// outputs are not a plain rotation and report [`ROTATION_UNKNOWN`].
pub fn parse_rotation(raw_xrandr: &str, target: &str) -> Result<i32> {
    lazy_static! {
        static ref XRANDR_OUTPUT: Regex = Regex::new(
            r"^(\S+) connected (?:primary )?(\d+x\d+\+\d+\+\d+ )?(?:(normal|left|inverted|right) )?(X axis |Y axis |X and Y axis )?\("
        )
        .expect("valid xrandr regex");
    }

    let captures = raw_xrandr
        .lines()
        .filter_map(|line| XRANDR_OUTPUT.captures(line))
        .find(|cap| &cap[1] == target)
        .ok_or(Error::NoForeground)?;

    if captures.get(2).is_none() {
        return Err(Error::NoForeground);
    }
    if captures.get(4).is_some() {
        return Ok(ROTATION_UNKNOWN);
    }
    Ok(match captures.get(3).map(|c| c.as_str()) {
        Some("right") => 90,
        Some("inverted") => 180,
        Some("left") => 270,
        _ => 0,
    })
}

impl Rotator for XRandRRotator {
    fn current_rotation(&self) -> Result<i32> {
        parse_rotation(&self.query()?, &self.output)
    }

    fn request_orientation(&self, lock: ScreenLock) -> Result<()> {
        // Confirms the output is there before touching it.
        self.current_rotation()?;
        let rotation = match rotate_arg(lock) {
            Some(rotation) => rotation,
            None => return Ok(()),
        };

        info!("xrandr: rotating {} to {}", self.output, rotation);
        let status = Command::new("xrandr")
            .arg("--output")
            .arg(&self.output)
            .arg("--rotate")
            .arg(rotation)
            .status()?;
        if !status.success() {
            return Err(Error::CommandFailed {
                command: format!("xrandr --output {} --rotate {}", self.output, rotation),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn display_chain(&self) -> DisplayChain {
        let raw = match self.query() {
            Ok(raw) => raw,
            Err(_) => return DisplayChain::default(),
        };
        let rotation = parse_rotation(&raw, &self.output).ok();
        DisplayChain {
            context: true,
            manager: true,
            display: rotation.is_some(),
            rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "\
Screen 0: minimum 8 x 8, current 3000 x 1920, maximum 32767 x 32767
eDP-1 connected primary 1080x1920+0+0 left (normal left inverted right x axis y axis) 309mm x 174mm
   1920x1080     60.02*+
HDMI-1 connected 1920x1080+1080+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+
DP-1 connected (normal left inverted right x axis y axis)
DP-2 disconnected (normal left inverted right x axis y axis)
";

    #[test]
    fn parse_outputs() -> Result<()> {
        assert_eq!(parse_rotation(QUERY, "eDP-1")?, 270);
        assert_eq!(parse_rotation(QUERY, "HDMI-1")?, 0);
        Ok(())
    }

    #[test]
    fn rotation_words() -> Result<()> {
        for (word, degrees) in [("normal", 0), ("right", 90), ("inverted", 180), ("left", 270)] {
            let line = format!(
                "eDP-1 connected 1920x1080+0+0 {} (normal left inverted right x axis y axis) 309mm x 174mm",
                word
            );
            assert_eq!(parse_rotation(&line, "eDP-1")?, degrees);
        }
        Ok(())
    }

    #[test]
    fn absent_outputs_are_not_foreground() {
        for target in ["DP-1", "DP-2", "VGA-1"] {
            assert!(matches!(
                parse_rotation(QUERY, target),
                Err(Error::NoForeground)
            ));
        }
    }

    #[test]
    fn reflected_outputs_are_unknown() -> Result<()> {
        for transform in ["left X axis", "X axis", "Y axis", "inverted X and Y axis"] {
            let line = format!(
                "eDP-1 connected 1920x1080+0+0 {} (normal left inverted right x axis y axis) 309mm x 174mm",
                transform
            );
            assert_eq!(parse_rotation(&line, "eDP-1")?, ROTATION_UNKNOWN);
        }
        Ok(())
    }

    #[test]
    fn missing_binary_is_no_platform() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "xrandr");
        assert!(matches!(spawn_error(missing), Error::NoPlatform));
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "xrandr");
        assert!(matches!(spawn_error(denied), Error::IOError(_)));
    }

    #[test]
    fn lock_arguments_match_parser() -> Result<()> {
        for lock in [
            ScreenLock::Portrait,
            ScreenLock::Landscape,
            ScreenLock::ReversePortrait,
            ScreenLock::ReverseLandscape,
        ] {
            let line = format!(
                "eDP-1 connected 1920x1080+0+0 {} (normal left inverted right x axis y axis)",
                rotate_arg(lock).unwrap()
            );
            assert_eq!(Some(parse_rotation(&line, "eDP-1")?), lock.rotation_degrees());
        }
        assert_eq!(rotate_arg(ScreenLock::Unspecified), None);
        Ok(())
    }
}
