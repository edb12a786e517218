//! # Orientation service
//!
//! The one object applications talk to: live orientation reads, locking,
//! and the two event streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::devices::Rotator;
use crate::error::{Error, Result};
use crate::events::{LogEvent, OrientationChangedEvent, SubscriptionId, Subscribers};
use crate::listener::OrientationListener;
use crate::orientation::{Orientation, ScreenLock};
use crate::sensors::Sensor;

pub struct OrientationService {
    rotator: Arc<dyn Rotator>,
    sensor: Arc<dyn Sensor>,
    listener: OrientationListener,
    changed: Arc<Subscribers<OrientationChangedEvent>>,
    logs: Arc<Subscribers<LogEvent>>,
    disposed: AtomicBool,
}

impl OrientationService {
    /// Build the service and start listening if the sensor can detect orientation.
    pub fn new(sensor: Arc<dyn Sensor>, rotator: Arc<dyn Rotator>) -> Self {
        let changed: Arc<Subscribers<OrientationChangedEvent>> = Arc::new(Subscribers::new());
        let logs: Arc<Subscribers<LogEvent>> = Arc::new(Subscribers::new());
        let (on_changed, on_log) = (changed.clone(), logs.clone());
        let listener = OrientationListener::new(
            sensor.clone(),
            rotator.clone(),
            Box::new(move |event: OrientationChangedEvent| on_changed.publish(&event)),
            Box::new(move |event: LogEvent| on_log.publish(&event)),
        );

        if listener.can_detect_orientation() {
            if let Err(e) = listener.enable() {
                warn!("could not start orientation sensor: {}", e);
            }
        }

        OrientationService {
            rotator,
            sensor,
            listener,
            changed,
            logs,
            disposed: AtomicBool::new(false),
        }
    }

    /// Live orientation of the display, never cached. `Undefined` when it cannot be read.
    pub fn current_orientation(&self) -> Orientation {
        match self.try_current_orientation() {
            Ok(orientation) => orientation,
            Err(Error::NoForeground) => Orientation::Undefined,
            Err(e) => {
                debug!("could not read display rotation: {}", e);
                Orientation::Undefined
            }
        }
    }

    pub fn try_current_orientation(&self) -> Result<Orientation> {
        self.rotator
            .current_rotation()
            .map(Orientation::from_degrees)
    }

    /// Constrain the display to `orientation`. Does nothing while no
    /// display is in the foreground.
    pub fn lock_orientation(&self, orientation: Orientation) -> Result<()> {
        match self.rotator.request_orientation(ScreenLock::from(orientation)) {
            Err(Error::NoForeground) => {
                debug!("no foreground display, ignoring lock to {}", orientation);
                Ok(())
            }
            other => other,
        }
    }

    pub fn unlock_orientation(&self) -> Result<()> {
        self.lock_orientation(Orientation::Undefined)
    }

    /// Subscribe to orientation changes. Handlers run on the thread that
    /// observed the change, usually the sensor's.
    pub fn subscribe_orientation_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&OrientationChangedEvent) + Send + Sync + 'static,
    {
        self.changed.subscribe(handler)
    }

    pub fn unsubscribe_orientation_changed(&self, id: SubscriptionId) -> bool {
        self.changed.unsubscribe(id)
    }

    /// Subscribe to diagnostics. Handlers must not panic; they run inside
    /// the sensor callback.
    pub fn subscribe_log_events<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.logs.subscribe(handler)
    }

    pub fn unsubscribe_log_events(&self, id: SubscriptionId) -> bool {
        self.logs.unsubscribe(id)
    }

    /// Orientation changes as a channel. The subscription is dropped with
    /// the first change delivered after the receiver is gone.
    pub fn orientation_changes(&self) -> mpsc::Receiver<OrientationChangedEvent> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let list = Arc::downgrade(&self.changed);
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let slot = own_id.clone();
        let id = self.changed.subscribe(move |event| {
            let sent = tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .send(*event);
            if sent.is_err() {
                let id = *slot.lock().unwrap_or_else(PoisonError::into_inner);
                if let (Some(list), Some(id)) = (list.upgrade(), id) {
                    list.unsubscribe(id);
                }
            }
        });
        *own_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        rx
    }

    /// Switch the sensor listener on or off. Cannot be switched back on after [`dispose`](Self::dispose).
    pub fn set_listener_enabled(&self, enabled: bool) {
        if enabled && self.is_disposed() {
            debug!("service disposed, not re-enabling the orientation sensor");
            return;
        }
        if enabled {
            if let Err(e) = self.listener.enable() {
                warn!("could not re-enable orientation sensor: {}", e);
            }
        } else {
            self.listener.disable();
        }
    }

    pub fn is_listener_enabled(&self) -> bool {
        self.listener.is_enabled()
    }

    /// Reconcile a rotation observed by the host UI framework.
    ///
    /// While `framework_driven` the sensor listener is switched off, so the
    /// framework is the only source of notifications. One change event is
    /// always fired with the live orientation, or with `raw_degrees` when the
    /// display cannot be read.
    pub fn notify_orientation_change(&self, raw_degrees: i32, framework_driven: bool) {
        self.set_listener_enabled(!framework_driven);

        let orientation = match self.try_current_orientation() {
            Ok(orientation) => orientation,
            Err(e) => {
                debug!("display unreadable ({}), using reported rotation {}", e, raw_degrees);
                Orientation::from_degrees(raw_degrees)
            }
        };
        self.listener.remember(orientation);
        self.changed.publish(&OrientationChangedEvent { orientation });
    }

    /// Release the sensor. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.listener.disable();
        self.sensor.release();
        debug!("orientation service disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for OrientationService {
    fn drop(&mut self) {
        self.dispose();
        self.listener.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::dummy::DummyRotator;
    use crate::sensors::dummy::DummySensor;
    use std::time::Duration;

    fn service() -> (OrientationService, Arc<DummySensor>, Arc<DummyRotator>) {
        let sensor = Arc::new(DummySensor::new());
        let rotator = Arc::new(DummyRotator::default());
        (
            OrientationService::new(sensor.clone(), rotator.clone()),
            sensor,
            rotator,
        )
    }

    fn record_changes(service: &OrientationService) -> Arc<Mutex<Vec<Orientation>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        service.subscribe_orientation_changed(move |e| sink.lock().unwrap().push(e.orientation));
        seen
    }

    fn record_logs(service: &OrientationService) -> Arc<Mutex<Vec<LogEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        service.subscribe_log_events(move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[test]
    fn starts_listening_when_capable() {
        let (service, sensor, _) = service();
        assert!(service.is_listener_enabled());
        assert!(sensor.is_enabled());

        let passive = OrientationService::new(
            Arc::new(DummySensor::unavailable()),
            Arc::new(DummyRotator::new(90)),
        );
        assert!(!passive.is_listener_enabled());
        assert_eq!(passive.current_orientation(), Orientation::Landscape);
    }

    #[test]
    fn landscape_then_repeat() {
        let (service, sensor, rotator) = service();
        let changes = record_changes(&service);

        rotator.set_rotation(90);
        sensor.inject(90);
        assert_eq!(*changes.lock().unwrap(), [Orientation::Landscape]);
        assert_eq!(service.listener.cached(), Orientation::Landscape);

        sensor.inject(90);
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn current_orientation_is_live() {
        let (service, _, rotator) = service();
        assert_eq!(service.current_orientation(), Orientation::Portrait);

        rotator.set_rotation(270);
        assert_eq!(service.current_orientation(), Orientation::LandscapeFlipped);

        rotator.set_foreground(false);
        assert_eq!(service.current_orientation(), Orientation::Undefined);
        assert!(matches!(
            service.try_current_orientation(),
            Err(Error::NoForeground)
        ));

        rotator.set_foreground(true);
        rotator.break_handle(Some("display"));
        assert_eq!(service.current_orientation(), Orientation::Undefined);
    }

    #[test]
    fn lock_applies_platform_constant() -> Result<()> {
        let (service, _, rotator) = service();
        for orientation in Orientation::ALL {
            service.lock_orientation(orientation)?;
            assert_eq!(rotator.requested(), ScreenLock::from(orientation));
            if orientation != Orientation::Undefined {
                assert_eq!(service.current_orientation(), orientation);
            }
        }
        Ok(())
    }

    #[test]
    fn unlock_is_lock_undefined() -> Result<()> {
        let (service, _, rotator) = service();
        service.lock_orientation(Orientation::Landscape)?;
        service.unlock_orientation()?;
        let unlocked = rotator.requested();
        let rotation = service.current_orientation();

        service.lock_orientation(Orientation::Landscape)?;
        service.lock_orientation(Orientation::Undefined)?;
        assert_eq!(rotator.requested(), unlocked);
        assert_eq!(unlocked, ScreenLock::Unspecified);
        assert_eq!(service.current_orientation(), rotation);
        Ok(())
    }

    #[test]
    fn lock_without_foreground_is_a_no_op() -> Result<()> {
        let (service, _, rotator) = service();
        rotator.set_foreground(false);
        service.lock_orientation(Orientation::PortraitFlipped)?;
        assert_eq!(rotator.requested(), ScreenLock::Unspecified);
        Ok(())
    }

    #[test]
    fn disabled_listener_is_quiet_until_reenabled() {
        let (service, sensor, rotator) = service();
        let changes = record_changes(&service);

        service.set_listener_enabled(false);
        rotator.set_rotation(90);
        sensor.inject(90);
        assert!(changes.lock().unwrap().is_empty());

        service.set_listener_enabled(true);
        sensor.inject(90);
        assert_eq!(*changes.lock().unwrap(), [Orientation::Landscape]);
    }

    #[test]
    fn background_signal_is_silent() {
        let (service, sensor, rotator) = service();
        let changes = record_changes(&service);
        let logs = record_logs(&service);

        rotator.set_rotation(180);
        rotator.set_foreground(false);
        sensor.inject(180);

        assert!(changes.lock().unwrap().is_empty());
        assert!(logs.lock().unwrap().is_empty());
    }

    #[test]
    fn unexpected_fault_logs_once() {
        let (service, sensor, rotator) = service();
        let changes = record_changes(&service);
        let logs = record_logs(&service);

        rotator.break_handle(Some("display"));
        sensor.inject(90);

        assert!(changes.lock().unwrap().is_empty());
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].message.is_empty());
        assert!(logs[0].fault.is_some());
    }

    #[test]
    fn dispose_is_idempotent() {
        let (service, sensor, _) = service();
        service.dispose();
        service.dispose();
        assert!(service.is_disposed());
        assert_eq!(sensor.disable_count(), 1);
        assert_eq!(sensor.release_count(), 1);

        drop(service);
        assert_eq!(sensor.release_count(), 1);
    }

    #[test]
    fn disposed_service_stays_released() {
        let (service, sensor, _) = service();
        service.dispose();

        service.set_listener_enabled(true);
        service.notify_orientation_change(0, false);
        assert!(!service.is_listener_enabled());
        assert!(!sensor.is_enabled());

        drop(service);
        assert_eq!(sensor.enable_count(), 1);
        assert_eq!(sensor.disable_count(), 1);
        assert_eq!(sensor.release_count(), 1);
    }

    #[test]
    fn dropped_receiver_unsubscribes() {
        let (service, sensor, rotator) = service();
        let rx = service.orientation_changes();
        assert_eq!(service.changed.len(), 1);

        drop(rx);
        rotator.set_rotation(90);
        sensor.inject(90);

        assert_eq!(service.changed.len(), 0);
    }

    #[test]
    fn dispose_without_enable() {
        let sensor = Arc::new(DummySensor::unavailable());
        let service = OrientationService::new(sensor.clone(), Arc::new(DummyRotator::default()));
        service.dispose();
        assert_eq!(sensor.disable_count(), 0);
        assert_eq!(sensor.release_count(), 1);
    }

    #[test]
    fn framework_notifications_replace_the_sensor() {
        let (service, sensor, rotator) = service();
        let changes = record_changes(&service);

        rotator.set_rotation(90);
        service.notify_orientation_change(90, true);
        assert!(!service.is_listener_enabled());
        assert!(!sensor.is_enabled());

        // Forced even when nothing changed.
        service.notify_orientation_change(90, true);
        sensor.inject(180);
        assert_eq!(
            *changes.lock().unwrap(),
            [Orientation::Landscape, Orientation::Landscape]
        );

        service.notify_orientation_change(90, false);
        assert!(service.is_listener_enabled());
        rotator.set_rotation(180);
        sensor.inject(180);
        assert_eq!(
            changes.lock().unwrap().last(),
            Some(&Orientation::PortraitFlipped)
        );
    }

    #[test]
    fn framework_notification_falls_back_to_reported_rotation() {
        let (service, _, rotator) = service();
        let changes = record_changes(&service);
        rotator.set_foreground(false);

        service.notify_orientation_change(270, true);
        assert_eq!(*changes.lock().unwrap(), [Orientation::LandscapeFlipped]);
    }

    #[test]
    fn changes_channel() {
        let (service, sensor, rotator) = service();
        let rx = service.orientation_changes();

        rotator.set_rotation(270);
        sensor.inject(270);

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(event.orientation, Orientation::LandscapeFlipped);
    }

    #[test]
    fn delivery_from_another_thread() {
        let (service, sensor, rotator) = service();
        let rx = service.orientation_changes();
        rotator.set_rotation(180);

        std::thread::spawn(move || sensor.inject(180)).join().unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap().orientation,
            Orientation::PortraitFlipped
        );
    }
}
