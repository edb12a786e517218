//! Orientation listener.
//!
//! Sits between a [`Sensor`] and the service: every raw rotation signal is
//! only a hint that something may have turned. The listener then re-reads
//! the live display rotation and reports a change when it differs from the
//! last value it saw.
//!
//! The cached value is a plain atomic. Two signals racing each other can
//! produce a duplicate or skipped notification, which is harmless at the rate
//! people turn their screens.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use crate::devices::Rotator;
use crate::error::{Error, Result};
use crate::events::{LogEvent, OrientationChangedEvent};
use crate::orientation::Orientation;
use crate::sensors::{RawRotationHandler, Sensor};

pub type ChangeCallback = Box<dyn Fn(OrientationChangedEvent) + Send + Sync>;
pub type LogCallback = Box<dyn Fn(LogEvent) + Send + Sync>;

pub struct OrientationListener {
    sensor: Arc<dyn Sensor>,
    state: Arc<ListenerState>,
}

struct ListenerState {
    rotator: Arc<dyn Rotator>,
    cached: AtomicU8,
    enabled: AtomicBool,
    on_changed: ChangeCallback,
    on_log: LogCallback,
}

impl OrientationListener {
    /// Create a listener. Nothing is registered with the sensor until [`enable`](Self::enable).
    pub fn new(
        sensor: Arc<dyn Sensor>,
        rotator: Arc<dyn Rotator>,
        on_changed: ChangeCallback,
        on_log: LogCallback,
    ) -> Self {
        OrientationListener {
            sensor,
            state: Arc::new(ListenerState {
                rotator,
                cached: AtomicU8::new(Orientation::Undefined as u8),
                enabled: AtomicBool::new(false),
                on_changed,
                on_log,
            }),
        }
    }

    pub fn can_detect_orientation(&self) -> bool {
        self.sensor.can_detect_orientation()
    }

    /// Register with the sensor. A no-op when already enabled or when the
    /// device cannot detect orientation.
    pub fn enable(&self) -> Result<()> {
        if !self.sensor.can_detect_orientation() {
            debug!("orientation sensor unavailable, listener stays passive");
            return Ok(());
        }
        if self.state.enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let state: Weak<ListenerState> = Arc::downgrade(&self.state);
        let handler: RawRotationHandler = Arc::new(move |degrees: i32| {
            if let Some(state) = state.upgrade() {
                state.on_raw_rotation(degrees);
            }
        });
        if let Err(e) = self.sensor.enable(handler) {
            self.state.enabled.store(false, Ordering::SeqCst);
            return Err(e);
        }
        debug!("orientation listener enabled");
        Ok(())
    }

    /// Unregister from the sensor. Safe to call when never enabled.
    pub fn disable(&self) {
        if self.state.enabled.swap(false, Ordering::SeqCst) {
            self.sensor.disable();
            debug!("orientation listener disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    /// Last orientation the listener reported.
    pub fn cached(&self) -> Orientation {
        self.state.cached()
    }

    pub(crate) fn remember(&self, orientation: Orientation) {
        self.state.cached.store(orientation as u8, Ordering::SeqCst);
    }
}

impl ListenerState {
    fn cached(&self) -> Orientation {
        Orientation::from_u8(self.cached.load(Ordering::SeqCst))
    }

    fn on_raw_rotation(&self, degrees: i32) {
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }
        trace!("raw rotation signal: {}", degrees);

        let current = match self.rotator.current_rotation() {
            Ok(rotation) => Orientation::from_degrees(rotation),
            // Backgrounded; nothing to report until the display is back.
            Err(Error::NoForeground) => return,
            Err(e) => return self.report_fault(e),
        };

        if current != self.cached() {
            self.cached.store(current as u8, Ordering::SeqCst);
            debug!("orientation changed to {}", current);
            (self.on_changed)(OrientationChangedEvent {
                orientation: current,
            });
        }
    }

    fn report_fault(&self, error: Error) {
        let chain = self.rotator.display_chain();
        let message = format!(
            "{} while handling a rotation signal. {}. \
             Orientation changes will not be reported until the display can be read again. {}",
            error.kind(),
            chain,
            error
        );
        warn!("{}", message);
        (self.on_log)(LogEvent {
            message,
            fault: Some(Arc::new(error)),
        });
    }
}
