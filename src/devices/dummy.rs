//! Dummy display.
//!
//! This is purely for testing or debugging.
//! It keeps the display state in memory and honours locks by rotating to them.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{DisplayChain, Rotator};
use crate::error::{Error, Result};
use crate::orientation::ScreenLock;

pub struct DummyRotator {
    foreground: AtomicBool,
    rotation: AtomicI32,
    missing_handle: Mutex<Option<&'static str>>,
    requested: Mutex<ScreenLock>,
}

impl DummyRotator {
    pub fn new(degrees: i32) -> Self {
        DummyRotator {
            foreground: AtomicBool::new(true),
            rotation: AtomicI32::new(degrees),
            missing_handle: Mutex::new(None),
            requested: Mutex::new(ScreenLock::Unspecified),
        }
    }

    /// Turn the display by hand, like the OS following the sensor would.
    pub fn set_rotation(&self, degrees: i32) {
        self.rotation.store(degrees, Ordering::SeqCst);
    }

    /// Simulate the application leaving / returning to the foreground.
    pub fn set_foreground(&self, present: bool) {
        self.foreground.store(present, Ordering::SeqCst);
    }

    /// Make reads fail as if the named handle in the display chain were gone.
    pub fn break_handle(&self, handle: Option<&'static str>) {
        *self
            .missing_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handle;
    }

    /// Last lock applied through [`Rotator::request_orientation`].
    pub fn requested(&self) -> ScreenLock {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing_handle(&self) -> Option<&'static str> {
        *self
            .missing_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DummyRotator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Rotator for DummyRotator {
    fn current_rotation(&self) -> Result<i32> {
        if !self.foreground.load(Ordering::SeqCst) {
            return Err(Error::NoForeground);
        }
        if let Some(handle) = self.missing_handle() {
            return Err(Error::MissingHandle(handle));
        }
        Ok(self.rotation.load(Ordering::SeqCst))
    }

    fn request_orientation(&self, lock: ScreenLock) -> Result<()> {
        if !self.foreground.load(Ordering::SeqCst) {
            return Err(Error::NoForeground);
        }
        debug!("dummy: requested {:?}", lock);
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner) = lock;
        if let Some(degrees) = lock.rotation_degrees() {
            self.set_rotation(degrees);
        }
        Ok(())
    }

    fn display_chain(&self) -> DisplayChain {
        let context = self.foreground.load(Ordering::SeqCst);
        let missing = self.missing_handle();
        let manager = context && missing != Some("manager");
        let display = manager && missing != Some("display");
        DisplayChain {
            context,
            manager,
            display,
            rotation: if display && missing.is_none() {
                Some(self.rotation.load(Ordering::SeqCst))
            } else {
                None
            },
        }
    }
}
