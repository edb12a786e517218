//! Screen orientation for Linux devices with a built-in accelerometer.
//!
//! [`OrientationService`] reports the live orientation of a display, lets
//! applications lock it, and multicasts a notification whenever it changes.
//! Raw sensor signals come from a [`sensors::Sensor`]; the display itself is a
//! [`devices::Rotator`]. [`platform::detect`] picks both for the running system.

pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod global;
pub mod listener;
pub mod orientation;
pub mod platform;
pub mod sensors;
pub mod service;

pub use error::{Error, Result};
pub use events::{LogEvent, OrientationChangedEvent, SubscriptionId};
pub use global::{default_service, notify_orientation_change, set_default_service};
pub use orientation::{Orientation, ScreenLock};
pub use service::OrientationService;
