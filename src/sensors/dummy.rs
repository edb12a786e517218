//! Dummy sensor.
//!
//! This is purely for testing or debugging.
//! Signals are pushed in by hand with [`DummySensor::inject`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{RawRotationHandler, Sensor};
use crate::error::Result;

pub struct DummySensor {
    available: bool,
    handler: Mutex<Option<RawRotationHandler>>,
    enables: AtomicUsize,
    disables: AtomicUsize,
    releases: AtomicUsize,
}

impl DummySensor {
    pub fn new() -> Self {
        Self::with_capability(true)
    }

    /// A sensor that reports it cannot detect orientation.
    pub fn unavailable() -> Self {
        Self::with_capability(false)
    }

    fn with_capability(available: bool) -> Self {
        DummySensor {
            available,
            handler: Mutex::new(None),
            enables: AtomicUsize::new(0),
            disables: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Deliver a raw rotation signal, as the OS would. Dropped unless enabled.
    pub fn inject(&self, degrees: i32) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(degrees);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn enable_count(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn disable_count(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Default for DummySensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for DummySensor {
    fn can_detect_orientation(&self) -> bool {
        self.available
    }

    fn enable(&self, handler: RawRotationHandler) -> Result<()> {
        self.enables.fetch_add(1, Ordering::SeqCst);
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
        Ok(())
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
