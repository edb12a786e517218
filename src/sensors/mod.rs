//! Sensors
//!
//! This is the abstraction that represents something like an accelerometer or other source of
//! raw rotation signals. Signals are clockwise degrees, delivered on the sensor's own thread.

pub mod dummy;

#[cfg(target_os = "linux")]
pub mod linux_iio;

use std::sync::Arc;

use crate::error::Result;

pub type RawRotationHandler = Arc<dyn Fn(i32) + Send + Sync>;

pub trait Sensor: Send + Sync {
    /// Whether this device can report orientation at all.
    fn can_detect_orientation(&self) -> bool;

    /// Start delivering raw rotation signals to `handler`.
    fn enable(&self, handler: RawRotationHandler) -> Result<()>;

    /// Stop delivering signals. Safe to call when not enabled.
    fn disable(&self);

    /// Give back whatever the sensor holds from the OS.
    fn release(&self) {}
}

/// Stand-in for devices without an orientation sensor.
#[derive(Debug, Default)]
pub struct NoSensor;

impl Sensor for NoSensor {
    fn can_detect_orientation(&self) -> bool {
        false
    }

    fn enable(&self, _handler: RawRotationHandler) -> Result<()> {
        Ok(())
    }

    fn disable(&self) {}
}
